use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to load site configuration: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("failed to read content directory {path:?}: {source}")]
    ContentDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read content file {path:?}: {source}")]
    ReadContent {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("content file {path:?} does not have a valid UTF-8 name, cannot use it as an object key")]
    InvalidObjectKey { path: PathBuf },

    #[error("validation failed on resource '{resource}'\n{message}")]
    Validation { resource: String, message: String },

    #[error("resource {urn} was declared more than once")]
    DuplicateResource { urn: String },

    #[error("attribute '{attribute}' of resource '{resource}': {message}")]
    Attribute {
        resource: String,
        attribute: String,
        message: String,
    },

    #[error("failed to serialize: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn validation(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            resource: resource.into(),
            message: message.into(),
        }
    }
}

impl From<figment::Error> for Error {
    fn from(e: figment::Error) -> Self {
        Error::Config(Box::new(e))
    }
}
