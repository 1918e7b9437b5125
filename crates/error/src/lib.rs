//! Failure type shared across the granite workspace.
//!
//! Lives in its own crate so every member reports errors through one enum
//! instead of growing per-crate error types and conversion glue. The
//! exported macros ([`errinput!`], [`assert_panics!`]) land at the crate
//! root via `macro_export`.
mod error;
mod macros;

pub use error::{Error, Result};
