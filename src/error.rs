//! Error taxonomy for the wire codec, reader/writer states, and the type
//! model. See spec §7 for the full taxonomy this mirrors.

use std::fmt;

/// Distinguishes the two `UnconsumedBytes`-adjacent failures that spec §4.2
/// and §7 both call "Overrun": a sub-item whose declared length runs past
/// the bytes actually available in its parent, versus a sub-item that ended
/// with bytes still unread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrunContext {
    /// The length prefix claims more bytes than remain in the enclosing
    /// region.
    SubItemLength,
    /// `end_sub_item` was called while bytes remained in the region.
    UnconsumedBytes,
}

impl fmt::Display for OverrunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverrunContext::SubItemLength => write!(f, "sub-item length exceeds outer bounds"),
            OverrunContext::UnconsumedBytes => write!(f, "sub-item ended with bytes remaining"),
        }
    }
}

/// Every error the engine can produce. A reader or writer state that has
/// produced one of these is terminal and must be discarded (spec §7).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A malformed varint, an invalid wire type, mismatched group tags, or
    /// invalid UTF-8 in a string field.
    #[error("malformed input at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: &'static str },

    /// End of input reached while a value was still expected.
    #[error("truncated input: needed {needed} more byte(s) at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    /// A sub-item's bounds don't reconcile with its parent.
    #[error("{context} (tag {tag}, offset {offset})")]
    Overrun {
        tag: u32,
        offset: usize,
        context: OverrunContext,
    },

    /// The declared type has no registered serializer and
    /// `ModelOptions::auto_add_missing_types` is off.
    #[error("no serializer registered for this type")]
    UnknownType,

    /// A wire value for an enum field had no declared mapping and the enum
    /// is not configured to accept unknown values.
    #[error("enum wire value {value} has no declared mapping")]
    UnknownEnumValue { value: i64 },

    /// A field marked `required` on its `MessageDescriptor` never appeared
    /// while deserializing the enclosing message.
    #[error("required field {field} is missing")]
    MissingRequiredField { field: u32 },

    /// The reader's recursion guard (`ModelOptions::depth_limit`) tripped.
    #[error("message nesting exceeded the configured depth limit of {limit}")]
    DepthExceeded { limit: usize },

    /// The model itself is inconsistent: a duplicate tag within one message,
    /// a surrogate cycle, or a conflicting surrogate registration.
    #[error("type model misconfigured: {0}")]
    ConfigurationError(String),

    /// Propagated from flushing a `WriterState`'s staging buffer to its
    /// sink.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
