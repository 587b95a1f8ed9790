//! JSON-RPC dispatch layer for Ripplet remote services.
//!
//! A [`ServiceManager`] maps one service type's methods to wire routes
//! under the fixed `/kv/` prefix, generically over parameter arities 0
//! through 6. Requests and responses travel in a small JSON envelope
//! ([`RpcRequest`] / [`RpcResponse`]); every matched request is answered
//! with a well-formed envelope, including malformed bodies, parameter
//! mismatches and handler failures.
//!
//! The layer is transport-agnostic: an HTTP server feeds
//! [`ServiceManager::dispatch`] with [`HttpRequest`] values, a WebSocket
//! framer feeds [`ServiceManager::dispatch_ws`] with per-connection text
//! frame channels, and neither adapter knows anything about envelopes or
//! service types.

mod data;
mod envelope;
mod error;
mod http;
mod manager;

pub use data::{RemoteData, RemoteFilter, RemoteOption, RemoteSorter};
pub use envelope::{RpcRequest, RpcResponse, decode_parameter};
pub use error::{RegistrationError, RemoteError, ServiceError};
pub use http::{HttpMethod, HttpRequest, WsSession};
pub use manager::{FixedResolver, FromParams, ServiceHandler, ServiceManager, ServiceResolver};
