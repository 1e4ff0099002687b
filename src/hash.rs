//! Content Hashing
//!
//! Virtual file paths (and material parameter names) are identified by a
//! 32-bit xxHash key. The hash is the deduplication key for every registry:
//! two loads of the same path resolve to the same slot.
//!
//! Hash equality is *not* trusted blindly: the resource store compares the
//! literal path string on a hash hit and reports a collision instead of
//! silently aliasing two distinct paths.

use std::fmt;

use xxhash_rust::xxh32::xxh32;

const HASH_SEED: u32 = 0;

/// Hashes an identifying name to its 32-bit key.
#[inline]
#[must_use]
pub fn hash_str(s: &str) -> u32 {
    xxh32(s.as_bytes(), HASH_SEED)
}

/// 32-bit content key derived from a virtual file path.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathHash(pub u32);

impl PathHash {
    /// Hashes a path string.
    #[inline]
    #[must_use]
    pub fn of(path: &str) -> Self {
        Self(hash_str(path))
    }
}

impl fmt::Display for PathHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}
