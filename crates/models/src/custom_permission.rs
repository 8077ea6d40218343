use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Category assigned when a create request leaves it out
pub const DEFAULT_CATEGORY: &str = "custom";

/// Permission defined by one organization. Unlike the platform catalogue,
/// the owning tenant may rename or delete it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CustomPermission {
    pub id: i32,
    pub organization_id: Uuid,
    pub name: String,
    /// Lowercase, unique within the organization
    pub slug: String,
    pub description: Option<String>,
    pub category: String,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCustomPermission {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(min = 1, max = 100), custom(function = "validate_slug"))]
    pub slug: String,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,
}

impl CreateCustomPermission {
    /// Trim the name and fold the slug to lowercase
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            slug: self.slug.trim().to_lowercase(),
            ..self
        }
    }
}

/// Partial update. The slug is immutable once created.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateCustomPermission {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,

    pub is_active: Option<bool>,
}

/// `boards.archive`, `reports-export`: ASCII lowercase letters, digits, `.`, `_`, `-`,
/// starting with a letter
fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let starts_with_letter = slug.chars().next().is_some_and(|c| c.is_ascii_lowercase());
    let allowed = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'));

    if starts_with_letter && allowed {
        Ok(())
    } else {
        Err(ValidationError::new("slug"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(slug: &str) -> CreateCustomPermission {
        CreateCustomPermission {
            name: "  Archive boards ".to_string(),
            slug: slug.to_string(),
            description: None,
            category: None,
        }
    }

    #[test]
    fn test_normalized_folds_slug_case() {
        let req = create(" Boards.Archive ").normalized();
        assert_eq!(req.slug, "boards.archive");
        assert_eq!(req.name, "Archive boards");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_slug_format() {
        assert!(create("reports-export_v2").validate().is_ok());
        assert!(create("Boards.archive").validate().is_err());
        assert!(create("9lives").validate().is_err());
        assert!(create("boards archive").validate().is_err());
        assert!(create("").validate().is_err());
    }

    #[test]
    fn test_update_rejects_blank_name() {
        let update = UpdateCustomPermission {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
        assert!(UpdateCustomPermission::default().validate().is_ok());
    }
}
