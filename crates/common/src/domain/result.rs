use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Operation would leave organization {0} without an owner: {1}")]
    OwnerInvariantViolation(String, String),

    #[error("No owner roles found in organization {0}")]
    NoOwnerRolesFound(String),

    #[error("No owner users found in organization {0}")]
    NoOwnerUsersFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Role not found: {0}")]
    RoleNotFound(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Deadline exceeded calling {0}")]
    DeadlineExceeded(String),

    #[error("{operation} partially applied ({completed} succeeded): {source}")]
    PartialMutation {
        operation: String,
        completed: String,
        #[source]
        source: Box<DomainError>,
    },

    #[error("Upstream error: {0}")]
    UpstreamError(#[from] anyhow::Error),
}

/// Coarse classification of a [`DomainError`] for callers that need to
/// present policy rejections differently from infrastructure failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    PolicyRejected,
    OwnershipUnresolved,
    NotFound,
    AlreadyExists,
    Unauthenticated,
    Upstream,
    PartialMutation,
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::ValidationError(_) => ErrorKind::InvalidArgument,
            DomainError::OwnerInvariantViolation(_, _) => ErrorKind::PolicyRejected,
            DomainError::NoOwnerRolesFound(_) | DomainError::NoOwnerUsersFound(_) => {
                ErrorKind::OwnershipUnresolved
            }
            DomainError::UserNotFound(_) | DomainError::RoleNotFound(_) => ErrorKind::NotFound,
            DomainError::UserAlreadyExists(_) => ErrorKind::AlreadyExists,
            DomainError::InvalidCredentials => ErrorKind::Unauthenticated,
            DomainError::DeadlineExceeded(_) | DomainError::UpstreamError(_) => ErrorKind::Upstream,
            DomainError::PartialMutation { .. } => ErrorKind::PartialMutation,
        }
    }

    /// True for rejections decided by the ownership policy rather than by a
    /// collaborator or the transport.
    pub fn is_policy_rejection(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::PolicyRejected | ErrorKind::OwnershipUnresolved
        )
    }
}
