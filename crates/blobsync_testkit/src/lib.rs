//! # blobsync Testkit
//!
//! Test utilities for blobsync.
//!
//! This crate provides:
//! - [`MemoryDavHost`], an in-memory WebDAV host with fault injection
//! - [`TestNetwork`] and [`TestClient`] for multi-installation scenarios
//! - [`CrashPoint`] to fail a push at a chosen step
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use blobsync_testkit::prelude::*;
//!
//! #[test]
//! fn round_trip() {
//!     let net = TestNetwork::new();
//!     let a = net.client("desk", b"bookings v1");
//!     let b = net.client("laptop", b"");
//!     assert!(a.push().success);
//!     assert!(b.pull().applied);
//!     assert_eq!(b.contents(), b"bookings v1");
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod dav_host;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::dav_host::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use crash::*;
pub use dav_host::*;
pub use fixtures::*;
pub use generators::*;
