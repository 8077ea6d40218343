pub mod audit;
pub mod context;
pub mod custom;
pub mod error;
pub mod grants;
pub mod guard;
pub mod permission_set;
pub mod store;
pub mod table;

pub use audit::{denial_entry, AuditDispatcher, AuditMode};
pub use context::{Principal, RequestContext, RequestMeta, ScopeSelector};
pub use custom::CustomPermissionService;
pub use error::{AuditWriteError, AuthzError, Result};
pub use grants::{validate_window, TimeBasedGrantService};
pub use guard::{Access, Decision, PermissionGuard};
pub use permission_set::PermissionSet;
pub use store::{
    AppAccessStore, AppRegistry, AuditSink, CustomPermissionStore, GrantStore, MembershipStore,
    PgCustomPermissionStore, PgGrantStore, RolePermissionStore,
};
pub use table::{PermissionTable, PermissionTableBuilder};
