use thiserror::Error;

/// Failure raised by a service handler.
///
/// The two variants split the dispatch layer's logging policy: a
/// [`Service`](ServiceError::Service) error is an expected, user-facing
/// condition (validation failure, missing record) and is answered without
/// logging, while an [`Internal`](ServiceError::Internal) error indicates a
/// bug or infrastructure fault and is logged before being converted to an
/// error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Expected, user-facing failure. Not logged.
    #[error("{0}")]
    Service(String),
    /// Unexpected failure, logged at the dispatch boundary.
    #[error("{message}")]
    Internal {
        message: String,
        /// Runtime type name reported as `exceptionType` on the wire.
        type_name: String,
    },
}

impl ServiceError {
    /// An expected, user-facing failure.
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service(message.into())
    }

    /// An unexpected failure carrying the originating error's type name.
    pub fn internal(message: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            type_name: type_name.into(),
        }
    }

    /// Whether this failure is an expected condition that should not be
    /// logged.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::Service(_))
    }

    /// The type name reported as `exceptionType` on the wire.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Service(_) => "ServiceException",
            Self::Internal { type_name, .. } => type_name,
        }
    }

    /// The wire error message, never empty.
    #[must_use]
    pub fn wire_message(&self) -> String {
        let message = self.to_string();
        if message.is_empty() {
            String::from("Error")
        } else {
            message
        }
    }
}

/// Misuse detected while binding a service method to a route.
///
/// Registration errors are fatal at setup: they indicate a programming
/// error in the service definition, so they surface immediately instead of
/// being deferred to request time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// GET routes carry no body, so only zero-parameter methods may bind
    /// to them.
    #[error("GET routes cannot bind methods with parameters")]
    GetWithParameters,
    /// The path is already registered for this method.
    #[error("route already registered: {0}")]
    DuplicateRoute(String),
}

/// Request-time failure while unwrapping an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Parameter count does not match the bound method's arity.
    #[error("Invalid parameters")]
    InvalidParameters,
    /// A positional parameter failed to decode into its static type.
    #[error("{message}")]
    Decode { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_errors_are_only_the_service_kind() {
        assert!(ServiceError::service("no such user").is_expected());
        assert!(!ServiceError::internal("boom", "IoError").is_expected());
    }

    #[test]
    fn empty_messages_fall_back_to_the_error_literal() {
        assert_eq!(ServiceError::service("").wire_message(), "Error");
        assert_eq!(ServiceError::service("nope").wire_message(), "nope");
        assert_eq!(ServiceError::internal("", "IoError").wire_message(), "Error");
    }

    #[test]
    fn type_names_follow_the_variant() {
        assert_eq!(ServiceError::service("x").type_name(), "ServiceException");
        assert_eq!(ServiceError::internal("x", "TimeoutError").type_name(), "TimeoutError");
    }
}
