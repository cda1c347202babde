pub mod domain;
pub mod garde;
pub mod memory;
pub mod telemetry;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use domain::MockAccessService;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockDirectoryService;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockRoleRegistry;
