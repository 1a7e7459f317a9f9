use thiserror::Error;

/// Indexing failures raised by [`crate::growable::GrowableBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("index {index} is outside buffer capacity {capacity}")]
    IndexOutOfRange { index: usize, capacity: usize },
    #[error("cannot insert at {index}, buffer length is {len}")]
    InsertPastEnd { index: usize, len: usize },
}
