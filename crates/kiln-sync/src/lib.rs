//! Fetch, push, pull, and clone composed over a [`Transport`] and a
//! [`kiln_layer_store::LayerStore`].
//!
//! This crate owns the synchronization algorithms of §4.6-§4.9; it knows
//! nothing about HTTP routing or the CLI, which `kiln-api` and `kiln-cli`
//! layer on top.

pub mod auth;
pub mod clone;
pub mod error;
pub mod fetch;
pub mod pack;
pub mod pull;
pub mod push;
pub mod transport;

pub use auth::{AllowAll, AuthContext};
pub use clone::{clone as clone_repository, CloneResult};
pub use error::Error;
pub use fetch::fetch;
pub use pull::{pull, PullResult};
pub use push::{push, PushResult};
pub use transport::{HttpTransport, InMemoryPayloadTransport, LocalStoreTransport, PackResponse, Transport};
