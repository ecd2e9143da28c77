use thiserror::Error;

use crate::codegen::error::{BytecodeError, ClassReadError, ConstPoolError, DescriptorError};
use crate::common::output::OutputError;

/// Result type for expect-platform operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the class rewriter and the support class injector
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Class read error: {0}")]
    ClassRead(#[from] ClassReadError),

    #[error("Constant pool error: {0}")]
    ConstPool(#[from] ConstPoolError),

    #[error("Bad descriptor on {class}.{method}: {source}")]
    Descriptor {
        class: String,
        method: String,
        #[source]
        source: DescriptorError,
    },

    #[error("Bytecode error: {0}")]
    Bytecode(#[from] BytecodeError),

    #[error("Class {class} has version {major}, invokedynamic needs at least {required}")]
    UnsupportedClassVersion { class: String, major: u16, required: u16 },

    #[error("Archive error: {message}")]
    Archive { message: String },

    #[error("Output rejected class {name}: {source}")]
    Output {
        name: String,
        #[source]
        source: OutputError,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl Error {
    /// Create an archive error
    pub fn archive_error(message: impl Into<String>) -> Self {
        Self::Archive { message: message.into() }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }
}
