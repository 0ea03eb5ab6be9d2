//! Hybrid memory management core for the Rubolt runtime: a tracing
//! mark-and-sweep garbage collector with size-segregated allocation pools,
//! and a reference-counting subsystem with deterministic destruction and a
//! tri-color cycle collector, sharing a common type-information registry.
//!
//! Parsing, interpretation, the REPL, the CLI, and stdlib bindings live
//! outside this crate; it is linked into whatever embeds it.

#![allow(dead_code)]

pub mod gc;
pub mod logging;
pub mod rc;
pub mod registry;

pub use gc::{GcConfig, GcHeap, GcStats};
pub use rc::{RcConfig, RcHeap, RcStats, Weak};
pub use registry::{FieldDescriptor, TypeDescriptor, TypeId, TypeRegistry};
