// Error taxonomy for the shared-memory queue.

use thiserror::Error;

/// Errors returned by [`crate::ShmQueue`] operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// No free block was available within the caller's patience.
    #[error("queue is full")]
    Full,

    /// No ready message was available within the caller's patience.
    #[error("queue is empty")]
    Empty,

    /// The message needs more chunks than the pool holds; rejected before
    /// any blocks were touched.
    #[error("message needs {needed} chunks but the pool only has {maxsize}")]
    CapacityExceeded { needed: usize, maxsize: usize },

    /// Checksum or total-length mismatch while consuming a message.
    #[error("integrity check failed: {0}")]
    IntegrityError(String),

    /// The serializer collaborator failed to encode a message.
    #[error("serialize error: {0}")]
    Serialize(String),

    /// The serializer collaborator failed to decode a message.
    #[error("deserialize error: {0}")]
    Deserialize(String),

    /// The queue does not support this operation (e.g. `qsize`/`empty`/`full`
    /// — these cannot be answered reliably under concurrent scanning).
    #[error("operation not supported by this queue")]
    NotSupported,

    /// Underlying shared-memory / mutex syscall failure not attributable to
    /// a timeout (segment creation, mapping, lock initialization, ...).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
