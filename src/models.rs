pub mod analysis;
pub mod auth;
pub mod budget;
pub mod notification;
pub mod user;

pub use analysis::{AnalysisQuery, AnalysisWindow, BudgetAnalysis, BudgetSummary, DateWindow};
pub use auth::{AuthToken, Claims, LoginRequest, LoginResponse, SignupResponse};
pub use budget::{BudgetEntry, BudgetQuery, CreateBudgetEntryRequest, UpdateBudgetEntryRequest};
pub use notification::{MarkSeenResponse, Notification, NotificationKind};
pub use user::{Actor, AdminUpdateUserRequest, Role, SignupRequest, UpdateProfileRequest, User};
