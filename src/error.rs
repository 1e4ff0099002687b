//! Error Types
//!
//! The main error type [`EngineError`] covers every recoverable failure mode
//! of the registry layer: capacity exhaustion, dedup invariant violations,
//! payload type mismatches, pak archive I/O and decoding failures, and
//! entity/component misuse.
//!
//! Invalid or stale handles passed to `destroy_*` operations are *not*
//! errors: those calls log a warning and no-op, so render code can hold
//! handles without a use-after-free turning fatal.

use thiserror::Error;

use crate::hash::PathHash;
use crate::resources::ResourceKind;

/// The main error type for the registry layer.
#[derive(Error, Debug)]
pub enum EngineError {
    // ========================================================================
    // Registry errors
    // ========================================================================
    /// A fixed-capacity registry has no free slots left.
    #[error("{kind} registry is full (capacity {capacity})")]
    CapacityExhausted {
        /// Registry name
        kind: &'static str,
        /// Configured slot capacity
        capacity: usize,
    },

    /// An entry with the same hash is already indexed.
    ///
    /// Callers are expected to check `find` before inserting; hitting this
    /// indicates a logic error in the calling layer.
    #[error("duplicate hash {hash} in {kind} registry")]
    DuplicateEntry {
        /// Registry name
        kind: &'static str,
        /// The colliding key
        hash: PathHash,
    },

    /// A stale, retired or out-of-range handle was passed to an operation
    /// that requires a live object.
    #[error("stale or invalid {kind} handle")]
    InvalidHandle {
        /// Registry name
        kind: &'static str,
    },

    /// Two distinct paths hash to the same 32-bit key.
    #[error("path hash collision: \"{path}\" collides with resident \"{existing}\" ({hash})")]
    HashCollision {
        /// The path being created or loaded
        path: String,
        /// The already-resident path with the same hash
        existing: String,
        /// The shared hash value
        hash: PathHash,
    },

    // ========================================================================
    // Resource errors
    // ========================================================================
    /// A resource payload is not the variant the operation expects.
    #[error("resource \"{path}\" holds a {actual:?} payload, expected {expected:?}")]
    ResourceTypeMismatch {
        /// Virtual file path of the resource
        path: String,
        /// The kind the caller asked for
        expected: ResourceKind,
        /// The kind actually resident
        actual: ResourceKind,
    },

    /// A resource entry exists but carries no payload.
    #[error("resource \"{path}\" has no payload attached")]
    MissingPayload {
        /// Virtual file path of the resource
        path: String,
    },

    /// The path is not resident, not indexed in any loaded pak, and does not
    /// exist as a loose file.
    #[error("resource not found: \"{path}\"")]
    ResourceNotFound {
        /// Virtual file path of the resource
        path: String,
    },

    // ========================================================================
    // Pak archive errors
    // ========================================================================
    /// `load_pak` was called twice for the same path.
    #[error("pak already loaded: \"{path}\"")]
    PakAlreadyLoaded {
        /// Archive file path
        path: String,
    },

    /// `unload_pak` was called for a path that is not loaded.
    #[error("pak not loaded: \"{path}\"")]
    PakNotLoaded {
        /// Archive file path
        path: String,
    },

    /// The archive index or a payload record could not be decoded.
    #[error("malformed pak \"{path}\": {reason}")]
    MalformedPak {
        /// Archive file path
        path: String,
        /// What went wrong
        reason: String,
    },

    // ========================================================================
    // Serialization errors
    // ========================================================================
    /// A serialized record could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// An unknown discriminant tag was read from a serialized record.
    #[error("unknown tag {tag} for {what}")]
    UnknownTag {
        /// What was being decoded
        what: &'static str,
        /// The offending byte
        tag: u8,
    },

    // ========================================================================
    // Entity/component errors
    // ========================================================================
    /// Component type bits are limited to 0..32.
    #[error("component type bit {bit} out of range (0..32)")]
    InvalidComponentType {
        /// The offending bit index
        bit: u32,
    },

    /// The entity already carries a component of this type.
    #[error("component type bit {bit} already attached to entity")]
    ComponentAlreadyAttached {
        /// The duplicate bit index
        bit: u32,
    },

    // ========================================================================
    // External collaborators
    // ========================================================================
    /// The graphics backend rejected an object creation.
    #[error("graphics backend error: {0}")]
    Graphics(String),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias for `Result<T, EngineError>`.
pub type Result<T> = std::result::Result<T, EngineError>;
