//! uia runtime: device bridge, RPC channel, and agent session lifecycle.
//!
//! This crate provides the low-level infrastructure for driving the
//! on-device UI automation agent:
//!
//! - **Bridge**: `adb` port forwarding, file transfer, shell and process start
//! - **Channel**: blocking JSON-RPC calls over the forwarded port
//! - **Session manager**: bringing the agent up and keeping one session per device
//! - **Ports**: local port allocation for forwards
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │     uia     │  Device facade, UI objects
//! └──────┬──────┘
//!        │ ensure_ready(serial)
//! ┌──────▼──────┐
//! │ uia-runtime │  This crate
//! │  ┌────────┐ │
//! │  │Session │ │  Per-serial lifecycle
//! │  └────────┘ │
//! │  ┌────────┐ │
//! │  │Channel │ │  JSON-RPC over HTTP
//! │  └────────┘ │
//! │  ┌────────┐ │
//! │  │ Bridge │ │  adb
//! │  └────────┘ │
//! └─────────────┘
//! ```

pub mod agent;
pub mod bridge;
pub mod channel;
pub mod config;
pub mod error;
pub mod ports;
pub mod session;
pub mod testing;

pub use agent::AgentPackage;
pub use bridge::{Adb, Bridge, DeviceEntry, ForwardEntry, ForwardSpec, ProcessHandle, ShellOutput, resolve_serial};
pub use channel::{Endpoint, HttpTransport, RpcChannel, Transport, operation_timeout};
pub use config::{AgentConfig, Config, RetryPolicy};
pub use error::{Error, Result};
pub use ports::PortAllocator;
pub use session::{Liveness, SessionInfo, SessionManager};
