pub mod auth_middleware;

pub use auth_middleware::{AuthenticatedUser, auth_middleware, require_admin};
