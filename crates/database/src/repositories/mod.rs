pub mod apps;
pub mod audit;
pub mod custom_permissions;
pub mod organization_member;
pub mod permissions;
pub mod roles;
