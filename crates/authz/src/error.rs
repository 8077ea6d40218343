use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthzError>;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("User not authenticated")]
    NotAuthenticated,

    #[error("You are not a member of this organization")]
    NotAMember,

    #[error("Role not found: {0}")]
    RoleNotFound(i32),

    #[error("You do not have the required permissions: {}", .missing.join(", "))]
    InsufficientPermissions { missing: Vec<String> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] mero_database::DatabaseError),
}

/// Failure to append an audit entry. Never surfaces to callers of the guard.
#[derive(Debug, Error)]
#[error("Failed to write audit log: {0}")]
pub struct AuditWriteError(pub String);

impl From<mero_database::DatabaseError> for AuditWriteError {
    fn from(err: mero_database::DatabaseError) -> Self {
        AuditWriteError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_permissions_message_lists_missing() {
        let err = AuthzError::InsufficientPermissions {
            missing: vec!["boards.delete".to_string(), "boards.create".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "You do not have the required permissions: boards.delete, boards.create"
        );
    }
}
