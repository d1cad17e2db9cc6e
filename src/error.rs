//! Everything related to errors.

use std::{error::Error as StdErr, sync::Arc};

use thiserror::Error;

use crate::native::HResult;

/// Alias that is used for most `Result`s in this crate.
pub type MarshalResult<T> = Result<T, Box<MarshalError>>;

/// A type has no supported marshaling strategy.
///
/// These errors are raised the first time a type is used and are cached by the registry, every
/// later request for the same type returns the same error. They indicate a usage error rather
/// than a runtime condition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("{type_name} is an array, arrays can only be marshaled at the top level of a call")]
    NestedArray { type_name: String },
    #[error("field {field} of {type_name} is an array, composites cannot contain arrays")]
    ArrayField { type_name: String, field: String },
    #[error("{type_name} has fields that need conversion but no native layout is registered")]
    MissingCounterpart { type_name: String },
    #[error("{type_name} is native-compatible but registers the distinct native layout {abi_name}")]
    UnexpectedCounterpart { type_name: String, abi_name: String },
    #[error("opaque handle {type_name} has a native form of {size} bytes, expected {expected}")]
    HandleWidth {
        type_name: String,
        size: usize,
        expected: usize,
    },
    #[error("field {field} of {type_name} can't be marshaled: {source}")]
    InvalidField {
        type_name: String,
        field: String,
        source: Box<ClassificationError>,
    },
}

/// Building a cache or an owned native-form value failed.
///
/// Everything that was built before the failing step has been released when this error is
/// returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("native call {operation} failed with {hr}")]
    Native {
        operation: &'static str,
        hr: HResult,
    },
    #[error("could not allocate {bytes} bytes")]
    OutOfMemory { bytes: usize },
    #[error("array of {len} elements is too large for the native boundary")]
    ArrayTooLong { len: usize },
    #[error("string of {len} bytes is too large for the native boundary")]
    StringTooLong { len: usize },
}

/// Native data could not be converted to its Rust representation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("invalid native string handle")]
    InvalidHandle,
    #[error("native string is not valid UTF-8")]
    InvalidUtf8,
    #[error("array of {len} elements has a null data pointer")]
    NullData { len: u32 },
    #[error("array of {len} elements exceeds the limit of {limit} elements")]
    ArrayTooLong { len: usize, limit: usize },
    #[error("{value:#04x} is not a valid bool")]
    InvalidBool { value: u8 },
    #[error("{value:#x} is not a valid char")]
    InvalidChar { value: u32 },
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("marshaling has already been configured")]
    AlreadyConfigured,
}

/// All different errors.
#[derive(Debug, Error, Clone)]
pub enum MarshalError {
    #[error("Other: {0}")]
    Other(Arc<dyn StdErr + 'static + Send + Sync>),
    #[error("Classification error: {0}")]
    ClassificationError(ClassificationError),
    #[error("Construction error: {0}")]
    ConstructionError(ConstructionError),
    #[error("Conversion error: {0}")]
    ConversionError(ConversionError),
    #[error("Config error: {0}")]
    ConfigError(ConfigError),
}

impl MarshalError {
    /// Convert an arbitrary error to `MarshalError::Other`.
    #[inline]
    pub fn other<E: StdErr + 'static + Send + Sync>(reason: E) -> Self {
        MarshalError::Other(Arc::new(reason))
    }

    /// Returns `true` if this is a classification error.
    #[inline]
    pub fn is_classification(&self) -> bool {
        matches!(self, MarshalError::ClassificationError(_))
    }

    /// Returns `true` if this is a construction error.
    #[inline]
    pub fn is_construction(&self) -> bool {
        matches!(self, MarshalError::ConstructionError(_))
    }

    /// Returns `true` if this is a conversion error.
    #[inline]
    pub fn is_conversion(&self) -> bool {
        matches!(self, MarshalError::ConversionError(_))
    }
}

macro_rules! impl_from {
    ($type:ident) => {
        impl From<$type> for MarshalError {
            #[inline]
            fn from(e: $type) -> Self {
                MarshalError::$type(e)
            }
        }

        impl From<$type> for Box<MarshalError> {
            #[inline]
            fn from(e: $type) -> Self {
                Box::new(MarshalError::from(e))
            }
        }
    };
}

impl_from!(ClassificationError);
impl_from!(ConstructionError);
impl_from!(ConversionError);
impl_from!(ConfigError);
