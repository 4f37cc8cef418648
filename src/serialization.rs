//! Serialization of fitted pipeline parameters.
//!
//! Fitted components expose their learned numbers as plain parameter structs
//! (`Vec<f64>`, category strings, scalars). This module gives every such struct
//! a byte encoding without tying the components to a particular file format.

use std::error::Error;

/// A parameter representation that can be serialized to and from bytes.
///
/// Implementors should contain only plain data, never live lookup tables or
/// matrices; those are rebuilt by the owning component's `from_params`.
pub trait SerializableParams: Sized {
    /// The error type returned during (de)serialization.
    type Error: Error + Send + Sync + 'static;

    /// Serialize the parameters into a byte buffer.
    fn to_bytes(&self) -> Result<Vec<u8>, Self::Error>;

    /// Deserialize the parameters from a byte buffer.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Self::Error>;
}

impl<T> SerializableParams for T
where
    T: serde::Serialize + for<'de> serde::Deserialize<'de>,
{
    type Error = bincode::Error;

    fn to_bytes(&self) -> Result<Vec<u8>, Self::Error> {
        bincode::serialize(self)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, Self::Error> {
        bincode::deserialize(bytes)
    }
}
