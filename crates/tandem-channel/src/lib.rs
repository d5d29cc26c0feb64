//! Producer-to-consumer channels for Tandem plugin pairs.
//!
//! A producer half on a compute rank sends a byte payload stamped with
//! the step it was sampled on; the matching consumer half on the paired
//! postprocess rank receives it. Channels are keyed by plugin name, so
//! the two halves of a pair meet without any other coordination.
//!
//! # Architecture
//!
//! - [`Transport`] is the seam a real inter-process transport plugs into
//! - [`LocalTransport`] connects ranks emulated as threads of one process
//! - [`codec`] holds the little-endian payload encoding shared by the
//!   built-in plugins

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod local;
pub mod transport;

pub use local::LocalTransport;
pub use transport::{Frame, NullTransport, Transport};
