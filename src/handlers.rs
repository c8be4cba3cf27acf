pub mod auth_handlers;
pub mod budget_handlers;
pub mod error;
pub mod notification_handlers;
pub mod user_handlers;

pub use error::ErrorResponse;
