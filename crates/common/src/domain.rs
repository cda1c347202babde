mod access_service;
mod directory_service;
mod result;
mod role;
mod role_registry;
mod user;

pub use access_service::*;
pub use directory_service::*;
pub use result::*;
pub use role::*;
pub use role_registry::*;
pub use user::*;
