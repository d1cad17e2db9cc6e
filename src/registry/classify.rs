//! Classify a type into a strategy.
//!
//! The rules are applied in order:
//!
//! 1. An array is rejected, arrays are only marshaled at the top level of a call.
//! 2. A composite with an array field, or a nested composite with one, is rejected.
//! 3. Every field of a composite must be classifiable itself. A field that isn't is reported
//!    with its path.
//! 4. A native-compatible type is passed through, its native form must be the type itself.
//! 5. A composite that needs conversion is bound to its registered native layout, which must be
//!    a distinct type.
//! 6. `bool` and `char` are carried as integers that are validated when converted back.
//! 7. Text uses the string strategy.
//! 8. An opaque handle is passed through as a pointer-sized handle.

use std::mem;

use super::strategy::{ArrayStrategy, Strategy, StrategyKind};
use crate::{
    convert::marshal::Marshal,
    data::shape::{AbiInfo, TypeShape},
    error::ClassificationError,
};

/// Compute the strategy of `T`.
pub fn classify<T: Marshal>() -> Result<Strategy<T>, ClassificationError> {
    let info = AbiInfo::of::<T>();
    let kind = classify_kind(&info, &T::shape())?;

    let array = match kind {
        StrategyKind::PassThrough => ArrayStrategy::BlockCopy,
        _ => ArrayStrategy::PerElement,
    };

    Ok(Strategy::new(info.type_name, kind, array))
}

fn classify_kind(info: &AbiInfo, shape: &TypeShape) -> Result<StrategyKind, ClassificationError> {
    let name = info.type_name;

    let kind = match shape {
        TypeShape::Array(_) => Err(ClassificationError::NestedArray {
            type_name: name.into(),
        })?,
        TypeShape::Primitive(_) | TypeShape::Composite(_) => {
            if let Some(field) = shape.array_field() {
                Err(ClassificationError::ArrayField {
                    type_name: name.into(),
                    field,
                })?
            }

            if let TypeShape::Composite(composite) = shape {
                for field in composite.fields.iter() {
                    if let Err(e) = classify_kind(&field.abi, &field.shape) {
                        return Err(invalid_field(name, field.name, e));
                    }
                }
            }

            if shape.is_native_compatible() {
                if !info.is_own_abi {
                    Err(ClassificationError::UnexpectedCounterpart {
                        type_name: name.into(),
                        abi_name: info.abi_name.into(),
                    })?
                }

                StrategyKind::PassThrough
            } else {
                if info.is_own_abi {
                    Err(ClassificationError::MissingCounterpart {
                        type_name: name.into(),
                    })?
                }

                match shape {
                    TypeShape::Primitive(_) => StrategyKind::Validated,
                    _ => StrategyKind::BoundComposite,
                }
            }
        }
        TypeShape::Text => StrategyKind::String,
        TypeShape::OpaqueHandle => {
            let expected = mem::size_of::<usize>();
            if info.abi_size != expected {
                Err(ClassificationError::HandleWidth {
                    type_name: name.into(),
                    size: info.abi_size,
                    expected,
                })?
            }

            StrategyKind::OpaqueHandle
        }
    };

    Ok(kind)
}

// Nested field errors are flattened into a single dotted path.
fn invalid_field(
    type_name: &str,
    field: &str,
    error: ClassificationError,
) -> ClassificationError {
    match error {
        ClassificationError::InvalidField {
            field: path,
            source,
            ..
        } => ClassificationError::InvalidField {
            type_name: type_name.into(),
            field: format!("{}.{}", field, path),
            source,
        },
        error => ClassificationError::InvalidField {
            type_name: type_name.into(),
            field: field.into(),
            source: Box::new(error),
        },
    }
}
