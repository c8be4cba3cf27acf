pub mod analysis_service;
pub mod auth_service;
pub mod budget_service;
pub mod notification_service;
pub mod recalculator;
pub mod user_service;

pub use analysis_service::{AnalysisError, AnalysisService, AnalysisServiceImpl};
pub use auth_service::{AuthError, AuthService, AuthServiceImpl};
pub use budget_service::{BudgetError, BudgetService, BudgetServiceImpl};
pub use notification_service::{
    EntryEvent, NotificationError, NotificationService, NotificationServiceImpl, NotificationSink,
};
pub use recalculator::{RecalcError, Recalculator, UserLocks};
pub use user_service::{UserError, UserService, UserServiceImpl};
