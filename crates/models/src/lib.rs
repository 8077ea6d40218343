pub mod app;
pub mod audit;
pub mod custom_permission;
pub mod organization_member;
pub mod permission;
pub mod role;
pub mod time_based_permission;

pub use app::{App, UserAppAccess};
pub use audit::{AuditLog, AuditLogBuilder, AuditLogQuery, AuditSeverity, CreateAuditLog};
pub use custom_permission::{CreateCustomPermission, CustomPermission, UpdateCustomPermission};
pub use organization_member::{MemberStatus, MembershipWithRole, OrganizationMember};
pub use permission::Permission;
pub use role::Role;
pub use time_based_permission::{GrantTimeBasedPermission, TimeBasedPermission};
