//! Startup connectivity check.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::RemoteError;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Answers whether the network is usable before a run starts.
pub trait ConnectivityProbe {
    fn check(&self) -> Result<(), RemoteError>;
}

/// Opens (and immediately drops) a TCP connection to `host:port`.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: PROBE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn unreachable(&self, source: std::io::Error) -> RemoteError {
        RemoteError::Unreachable {
            addr: self.addr.clone(),
            source,
        }
    }
}

impl ConnectivityProbe for TcpProbe {
    fn check(&self) -> Result<(), RemoteError> {
        let addrs = self
            .addr
            .to_socket_addrs()
            .map_err(|e| self.unreachable(e))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(_) => return Ok(()),
                Err(err) => last_err = Some(err),
            }
        }
        Err(self.unreachable(last_err.unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "address resolved to nothing")
        })))
    }
}
