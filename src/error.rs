//! Binding-layer errors
//!
//! Host calls return `anyhow` errors; everything that reaches a script
//! method is expressed as a [`BindingError`] and then raised into the engine
//! by [`crate::binding::bridge`].

use rhai::EvalAltResult;

#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    /// A remote call failed (network, auth, not found, ...)
    #[error("{0}")]
    HostApi(String),

    #[error("index {index} out of range for {class} with {length} items")]
    IndexOutOfRange {
        class: String,
        index: i64,
        length: usize,
    },

    #[error("undefined method '{method}' for {class}")]
    NoMethod { class: String, method: String },

    #[error("class {0} is not registered")]
    UnknownClass(String),

    #[error("wrong number of arguments for {class}.{method} (given {given}, expected {expected})")]
    Arity {
        class: String,
        method: String,
        given: usize,
        expected: String,
    },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{class}.{method} called on an object without {expected} data")]
    WrongReceiver {
        class: String,
        method: String,
        expected: &'static str,
    },

    #[error("{0} not found")]
    NotFound(String),

    /// An exception raised by script code, passed through untouched
    #[error("{0}")]
    Script(Box<EvalAltResult>),
}

impl From<anyhow::Error> for BindingError {
    fn from(err: anyhow::Error) -> Self {
        // Alternate form keeps the whole context chain
        BindingError::HostApi(format!("{:#}", err))
    }
}

impl From<Box<EvalAltResult>> for BindingError {
    fn from(err: Box<EvalAltResult>) -> Self {
        BindingError::Script(err)
    }
}

pub type BindingResult<T> = std::result::Result<T, BindingError>;
