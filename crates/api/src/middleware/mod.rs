pub mod auth;
pub mod permissions;

pub use auth::{require_auth, AuthUser};
pub use permissions::require_permissions;
