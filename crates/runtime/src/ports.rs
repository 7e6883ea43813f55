//! Local port allocation for device forwards.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::config::{LOCAL_PORT_BASE, LOCAL_PORT_CEILING};
use crate::error::{Error, Result};

type Probe = Box<dyn Fn(u16) -> bool + Send + Sync>;

/// Hands out local ports sequentially from a base, skipping ports that
/// already accept connections and wrapping back to the base after the
/// ceiling.
///
/// Each allocator keeps its own counter, so two allocators never share
/// state.
pub struct PortAllocator {
	base: u16,
	ceiling: u16,
	last: Mutex<Option<u16>>,
	in_use: Probe,
}

impl std::fmt::Debug for PortAllocator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PortAllocator")
			.field("base", &self.base)
			.field("ceiling", &self.ceiling)
			.field("last", &*self.last.lock())
			.finish()
	}
}

impl PortAllocator {
	/// Default range, probing `host` over TCP.
	pub fn new(host: impl Into<String>) -> Self {
		let host = host.into();
		Self::with_probe(LOCAL_PORT_BASE, LOCAL_PORT_CEILING, move |port| is_listening(&host, port))
	}

	/// Custom range and probe. `in_use(port)` returns true for taken ports.
	pub fn with_probe<F>(base: u16, ceiling: u16, in_use: F) -> Self
	where
		F: Fn(u16) -> bool + Send + Sync + 'static,
	{
		Self {
			base,
			ceiling: ceiling.max(base),
			last: Mutex::new(None),
			in_use: Box::new(in_use),
		}
	}

	pub fn range(&self) -> (u16, u16) {
		(self.base, self.ceiling)
	}

	fn advance(&self, port: Option<u16>) -> u16 {
		match port {
			Some(p) if p >= self.base && p < self.ceiling => p + 1,
			_ => self.base,
		}
	}

	/// Returns the next free port. Fails after one full cycle of the range.
	pub fn allocate(&self) -> Result<u16> {
		let mut last = self.last.lock();
		let span = u32::from(self.ceiling - self.base) + 1;
		for _ in 0..span {
			let candidate = self.advance(*last);
			*last = Some(candidate);
			if !(self.in_use)(candidate) {
				debug!(target = "uia", port = candidate, "allocated local port");
				return Ok(candidate);
			}
		}
		Err(Error::PortsExhausted {
			start: self.base,
			end: self.ceiling,
		})
	}
}

fn is_listening(host: &str, port: u16) -> bool {
	let addrs: Vec<SocketAddr> = match (host, port).to_socket_addrs() {
		Ok(addrs) => addrs.collect(),
		Err(_) => return false,
	};
	addrs
		.iter()
		.any(|addr| TcpStream::connect_timeout(addr, Duration::from_millis(200)).is_ok())
}
