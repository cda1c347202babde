mod invariant_guard;
mod organization_locks;
mod ownership_cache;
mod upstream_call;
mod user_manager_service;

pub use invariant_guard::*;
pub use organization_locks::*;
pub use ownership_cache::*;
pub use upstream_call::*;
pub use user_manager_service::*;
