//! Common utilities for ixtract.
//!
//! This crate provides the foundational pieces shared by the texture and
//! archive decoders:
//!
//! - [`ByteCursor`] - Bounds-checked sequential/random-access reader over a byte slice
//! - [`Error::OutOfBounds`] - The failure mode of every cursor read

mod cursor;
mod error;

pub use cursor::ByteCursor;
pub use error::{Error, Result};

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Re-export memchr for sentinel and terminator searches
pub use memchr;
