use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("catalog invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn bad_request(message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into(), correlation_id: correlation_id.into() }
    }

    pub fn not_found(message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::NotFound { message: message.into(), correlation_id: correlation_id.into() }
    }

    pub fn conflict(message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::Conflict { message: message.into(), correlation_id: correlation_id.into() }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "The requested catalog entry does not exist.",
            Self::Conflict { .. } => "A catalog entry with that name already exists.",
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::NotFound { message, .. }
            | Self::Conflict { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        match &mut self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => *correlation_id = id.into(),
        }
        self
    }
}

impl From<DomainError> for InterfaceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::InvariantViolation(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
