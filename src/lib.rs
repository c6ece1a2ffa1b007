//! OpenSK manifest loading.
//!
//! This crate reads the JSON manifests that register OpenSK drivers and
//! layers, enumerates the modules they declare and binds their entry points
//! from dynamically loaded libraries.
//!
//! # Architecture
//!
//! - [`json`] - comment-tolerant JSON parser producing an owned value tree
//! - [`manifest`] - manifest model, parser, gated enumeration and binding
//! - [`platform`] - path helpers and the dynamic library loader
//! - [`alloc`] - allocator capability threaded through parsing
//! - [`api`] - entry-point function pointer types
//! - [`error`] - flat result codes
//!
//! # Example
//!
//! ```no_run
//! use opensk::manifest::{EnumerateFlags, Manifest};
//!
//! let manifest = Manifest::load("/etc/opensk/drivers.json")?;
//! let (count, _) = manifest.enumerate_driver_properties(EnumerateFlags::IMPLICIT, None);
//! let mut drivers = vec![Default::default(); count];
//! manifest.enumerate_driver_properties(EnumerateFlags::IMPLICIT, Some(&mut drivers[..]));
//! # Ok::<(), opensk::ErrorCode>(())
//! ```

// Library code reports every failure through ErrorCode.
// Tests are checked separately with `cargo test`.
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

pub mod alloc;
pub mod api;
pub mod error;
pub mod json;
pub mod manifest;
pub mod platform;

// Re-export commonly used types
pub use crate::alloc::{DebugAllocator, DefaultAllocator, HostAllocator};
pub use error::{ErrorCode, SkResult, SkStatus};
pub use json::{JsonObject, JsonType, JsonValue};
pub use manifest::{EnumerateFlags, Manifest, ManifestOptions};
pub use platform::{DynamicLoader, LibraryLoader, LoadedLibrary};
