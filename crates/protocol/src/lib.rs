//! Wire types for the uiautomator agent protocol.
//!
//! This crate contains the serde-serializable types exchanged with the
//! on-device agent over JSON-RPC. These types represent the "protocol layer":
//! the shapes of data as they appear on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! - **Pure data**: No I/O, no connection state
//! - **1:1 with the agent**: Field names match the agent's JSON keys
//! - **Immutable queries**: [`Selector`] values are rebuilt, never patched
//!
//! Higher-level APIs are built on top of these types in `uia`.

pub mod jsonrpc;
pub mod keys;
pub mod orientation;
pub mod selector;
pub mod types;

pub use jsonrpc::*;
pub use keys::*;
pub use orientation::*;
pub use selector::*;
pub use types::*;
