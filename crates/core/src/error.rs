use thiserror::Error;

/// Error kinds surfaced by the core. Bulk streams downgrade most of these to
/// diagnostics and keep going; point operations return them to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Raw bytes match none of the known payload formats.
    #[error("unknown encoding")]
    UnknownEncoding,

    /// No codec is registered for the decoded group/version/kind.
    #[error("no codec registered for {gvk}")]
    UnknownKind { gvk: String },

    /// A stored key does not match the canonical layout.
    #[error("key {key:?} does not match the registry layout")]
    InvalidKey { key: String },

    /// A point get returned zero pairs.
    #[error("resource not found")]
    ResourceNotFound,

    /// The requested watch revision lies below the compaction boundary.
    #[error("watch revision compacted (compact revision {compact_revision})")]
    WatchCompacted { compact_revision: i64 },

    /// The watch stream disconnected and could not be resumed.
    #[error("watch lost: {reason}")]
    WatchLost { reason: String },

    /// A timeline document failed to decode.
    #[error("malformed stream document: {reason}")]
    StreamMalformed { reason: String },

    /// A strategic merge patch failed to apply.
    #[error("patch conflict: {reason}")]
    PatchConflict { reason: String },
}
