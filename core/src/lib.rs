//! Core component-tree capability for Ripplet.
//!
//! This crate defines the minimal surface the binding engine renders into:
//! an [`Element`] tree with ordered children, idempotent disposal with
//! disposal hooks, visibility toggling, transparent grouping containers,
//! and a deferred render queue modeling the host event loop's microtask
//! checkpoint. The concrete widget hierarchy (inputs, panels, forms) lives
//! outside this crate; everything here is the opaque capability it is
//! consumed through.

mod element;
mod input;
pub mod schedule;
mod unsubscribe;

pub use element::Element;
pub use input::Input;
pub use unsubscribe::Unsubscribe;
