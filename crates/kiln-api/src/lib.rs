//! The Orchestrator: the external operations of spec §4.10
//! (`bundle`/`unbundle`/`pack`/`unpack`/`clone`/`fetch`/`push`/`pull`),
//! their JSON envelope, the pack-transfer and branch state machines, and an
//! `axum` router exposing them over HTTP.
//!
//! `kiln-sync` knows nothing of HTTP, JSON, or auth tokens; this crate is
//! where those concerns live.

pub mod auth;
pub mod bundle;
pub mod envelope;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod state;

pub use auth::{Capability, StaticAuthContext};
pub use envelope::{ApiStatus, Envelope};
pub use orchestrator::Orchestrator;
pub use state::{BranchState, PackTransferState};
