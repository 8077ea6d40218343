pub mod connection;
pub mod error;
pub mod repositories;

pub use connection::{Database, DatabaseConfig};
pub use error::{DatabaseError, Result};
pub use repositories::{
    apps::{AppAccessRepository, AppRepository},
    audit::AuditRepository,
    custom_permissions::CustomPermissionRepository,
    organization_member::OrganizationMemberRepository,
    permissions::{NewTimeBasedPermission, PermissionRepository, TimeBasedPermissionRepository},
    roles::RoleRepository,
};
