//! The structure of marshalable types.
//!
//! A [`TypeShape`] is a closed description of a type: a primitive, a composite with named
//! fields, text, an array, or an opaque handle. Shapes are produced by [`Marshal::shape`] and
//! consumed once per type by the classifier.
//!
//! [`Marshal::shape`]: crate::convert::marshal::Marshal::shape

use std::{
    any::{TypeId, type_name},
    fmt::{Display, Formatter, Result as FmtResult},
    mem,
};

use crate::convert::marshal::Marshal;

/// The primitive types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
}

impl PrimitiveKind {
    /// Returns `true` if every bit pattern of the native form is a valid value.
    ///
    /// `bool` and `char` are carried as `u8` and `u32` and checked when converted back.
    pub fn is_native_compatible(self) -> bool {
        !matches!(self, PrimitiveKind::Bool | PrimitiveKind::Char)
    }
}

/// The structure of a type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeShape {
    Primitive(PrimitiveKind),
    Composite(CompositeShape),
    Text,
    Array(Box<TypeShape>),
    OpaqueHandle,
}

/// A composite type and its fields in declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositeShape {
    pub name: &'static str,
    pub fields: Vec<FieldShape>,
}

/// A named field of a composite type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldShape {
    pub name: &'static str,
    pub shape: TypeShape,
    pub abi: AbiInfo,
}

impl FieldShape {
    /// The shape of a field of type `F`.
    pub fn of<F: Marshal>(name: &'static str) -> Self {
        FieldShape {
            name,
            shape: F::shape(),
            abi: AbiInfo::of::<F>(),
        }
    }
}

/// How a type relates to its native form.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AbiInfo {
    pub type_name: &'static str,
    pub abi_name: &'static str,
    /// The type is its own native form.
    pub is_own_abi: bool,
    pub abi_size: usize,
}

impl AbiInfo {
    pub fn of<T: Marshal>() -> Self {
        AbiInfo {
            type_name: type_name::<T>(),
            abi_name: type_name::<T::Abi>(),
            is_own_abi: TypeId::of::<T>() == TypeId::of::<T::Abi>(),
            abi_size: mem::size_of::<T::Abi>(),
        }
    }
}

impl TypeShape {
    /// The shape of a composite type.
    pub fn composite(name: &'static str, fields: Vec<FieldShape>) -> Self {
        TypeShape::Composite(CompositeShape { name, fields })
    }

    /// Returns `true` if the native form of this type is the type itself.
    ///
    /// Primitives other than `bool` and `char` and opaque handles are native-compatible,
    /// composites are native-compatible if all their fields are.
    pub fn is_native_compatible(&self) -> bool {
        match self {
            TypeShape::Primitive(p) => p.is_native_compatible(),
            TypeShape::OpaqueHandle => true,
            TypeShape::Composite(c) => c.fields.iter().all(|f| f.shape.is_native_compatible()),
            TypeShape::Text | TypeShape::Array(_) => false,
        }
    }

    /// Returns the path of the first field that is an array, searching nested composites.
    pub fn array_field(&self) -> Option<String> {
        let TypeShape::Composite(c) = self else {
            return None;
        };

        for field in c.fields.iter() {
            match &field.shape {
                TypeShape::Array(_) => return Some(field.name.to_string()),
                nested @ TypeShape::Composite(_) => {
                    if let Some(path) = nested.array_field() {
                        return Some(format!("{}.{}", field.name, path));
                    }
                }
                _ => (),
            }
        }

        None
    }
}

impl Display for TypeShape {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TypeShape::Primitive(p) => write!(f, "{:?}", p),
            TypeShape::Composite(c) => write!(f, "{}", c.name),
            TypeShape::Text => f.write_str("Text"),
            TypeShape::Array(e) => write!(f, "[{}]", e),
            TypeShape::OpaqueHandle => f.write_str("OpaqueHandle"),
        }
    }
}
