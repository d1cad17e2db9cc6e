//! Reexports structs and traits you're likely to need.

pub use crate::{
    accessor::{Accessor, ArrayAccessor, CallShapes},
    convert::marshal::Marshal,
    data::layout::{
        array::ArrayAbi,
        handle::{ObjectHandle, OpaqueHandle, RawHandle},
    },
    error::{MarshalError, MarshalResult},
    impl_opaque_handle, marshal_composite, marshal_pass_through,
    marshaler::Marshaler,
    memory::{cache::Cache, ledger::ResourceLedger},
    native::string::HString,
};
