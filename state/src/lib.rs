//! Reactive state for Ripplet: observable signals, the binding engine that
//! keeps component content tracking signal emissions, and the
//! shortest-edit-script differ used for list reconciliation.
//!
//! The binding engine is entirely client side and single-threaded. It
//! subscribes elements to [`Signal`] streams and re-renders dependent
//! content either by full replacement ([`Bind::bind`]) or by incremental
//! reconciliation of child lists ([`Bind::bind_each`]). Emission failures
//! are deliberately swallowed by every binding: a transient state
//! computation error must never tear down the UI.

mod bind;
pub mod diff;
mod signal;

pub use bind::{Bind, BindValue};
pub use signal::{MutableSignal, Signal, SignalError};
