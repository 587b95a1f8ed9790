#![doc = include_str!("../README.md")]
#![allow(clippy::multiple_crate_versions)]

#[doc(inline)]
pub use ripplet_core as core;
#[doc(inline)]
pub use ripplet_remote as remote;
#[doc(inline)]
pub use ripplet_state as state;

pub mod prelude {
    //! Commonly used traits and types for a single `use` statement.
    //!
    //! # Example
    //!
    //! ```rust
    //! use ripplet::prelude::*;
    //!
    //! let items = MutableSignal::new(vec![1, 2, 3]);
    //! let list = Element::panel();
    //! list.bind_each(&items.signal(), |item_slot, _item: &i32| {
    //!     item_slot.add(Element::panel());
    //! });
    //! ```

    pub use ripplet_core::{Element, Input, Unsubscribe};
    pub use ripplet_remote::{
        HttpMethod, HttpRequest, RemoteData, RemoteFilter, RemoteSorter, RpcRequest,
        RpcResponse, ServiceError, ServiceManager, ServiceResolver, WsSession,
    };
    pub use ripplet_state::{Bind, BindValue, MutableSignal, Signal, SignalError};
}
