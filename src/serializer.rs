// The object-to-bytes collaborator. The queue itself never inspects the
// application type `T`; it only ever moves the bytes a `Serializer`
// produces.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::QueueError;

/// Turns application objects into bytes and back.
///
/// Default collaborator is [`BincodeSerializer`]; callers may substitute
/// their own (e.g. to match a wire format shared with a non-Rust peer).
pub trait Serializer<T> {
    fn dumps(&self, obj: &T) -> Result<Vec<u8>, QueueError>;
    fn loads(&self, bytes: &[u8]) -> Result<T, QueueError>;
}

/// Default serializer: `bincode` over `serde`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeSerializer;

impl<T> Serializer<T> for BincodeSerializer
where
    T: Serialize + DeserializeOwned,
{
    fn dumps(&self, obj: &T) -> Result<Vec<u8>, QueueError> {
        bincode::serialize(obj).map_err(|e| QueueError::Serialize(e.to_string()))
    }

    fn loads(&self, bytes: &[u8]) -> Result<T, QueueError> {
        bincode::deserialize(bytes).map_err(|e| QueueError::Deserialize(e.to_string()))
    }
}
