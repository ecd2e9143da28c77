//! Specific error types for class file reading and writing

use thiserror::Error;

/// Errors that can occur during constant pool operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstPoolError {
    #[error("Constant pool is out of space")]
    OutOfSpace,
    #[error("Invalid constant pool index: {0}")]
    InvalidIndex(u16),
    #[error("Constant pool entry {index} is not a {expected}")]
    UnexpectedEntry { index: u16, expected: &'static str },
    #[error("Utf8 constant {0} holds unpaired surrogates")]
    UnpairedSurrogate(u16),
}

/// Errors that can occur while decoding a class file
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassReadError {
    #[error("Unexpected end of class data at offset {offset} ({needed} more bytes needed)")]
    UnexpectedEof { offset: usize, needed: usize },
    #[error("Invalid magic number: 0x{0:08X}")]
    InvalidMagic(u32),
    #[error("Invalid constant pool tag {tag} at index {index}")]
    InvalidConstantTag { tag: u8, index: u16 },
    #[error("Invalid modified UTF-8 in constant pool entry {0}")]
    InvalidUtf8(u16),
    #[error("Constant pool error: {0}")]
    ConstPool(#[from] ConstPoolError),
    #[error("Malformed {attribute} attribute: {reason}")]
    MalformedAttribute { attribute: String, reason: String },
    #[error("{0} trailing bytes after end of class data")]
    TrailingBytes(usize),
}

/// Errors that can occur while parsing descriptors and signatures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("Invalid method descriptor '{descriptor}': {reason}")]
    InvalidMethodDescriptor { descriptor: String, reason: &'static str },
    #[error("Invalid type descriptor '{descriptor}': {reason}")]
    InvalidTypeDescriptor { descriptor: String, reason: &'static str },
    #[error("Invalid signature '{signature}'")]
    InvalidSignature { signature: String },
}

/// Errors that can occur during bytecode generation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BytecodeError {
    #[error("Stack underflow")]
    StackUnderflow,
    #[error("Stack overflow")]
    StackOverflow,
    #[error("Code length {0} exceeds the 65535 byte limit")]
    CodeTooLong(usize),
    #[error("Max stack can only be recomputed for synthesized instructions")]
    OpaqueRecompute,
}

/// Generic result type for constant pool operations
pub type ConstPoolResult<T> = Result<T, ConstPoolError>;

/// Generic result type for class file decoding
pub type ReadResult<T> = Result<T, ClassReadError>;

/// Generic result type for bytecode operations
pub type BytecodeResult<T> = Result<T, BytecodeError>;
