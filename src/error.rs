use std::collections::BTreeMap;

use warp::reject::Reject;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    AuthMissing(&'static str),
    #[error("invalid bearer token")]
    AuthInvalid {
        #[source]
        source: jsonwebtoken::errors::Error,
    },
    #[error("Username already exists!")]
    UsernameTaken,
    #[error("Invalid username or password")]
    CredentialMismatch,
    #[error("request body failed validation")]
    ValidationFailed(ValidationFailure),
    #[error("Invalid JSON body")]
    InvalidBody,
    #[error("error during database operation")]
    Database {
        #[from]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("error while hashing password: {0}")]
    Hashing(String),
    #[error("error while signing token")]
    TokenSigning {
        #[source]
        source: jsonwebtoken::errors::Error,
    },
}

impl Reject for AppError {}

/// What a failed validation reports back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    /// The first issue's message, from a single-field validator.
    Single(String),
    /// First path segment to message, from a multi-field validator.
    Many(BTreeMap<String, String>),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("JWT_SEC must be set to a non-empty signing secret")]
    MissingSecret,
    #[error("{name} has an invalid value {value:?}")]
    InvalidValue { name: &'static str, value: String },
}
