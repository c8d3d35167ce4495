//! A `std::net::UdpSocket`-backed [`Socket`], [`Clock`], and
//! [`MessageIdSource`], so the `demos/` binaries and the integration tests
//! have a concrete transport without dragging a host socket into the
//! `no_std` core. Gated on `feature = "std"`, the way the teacher gates its
//! `lru_time_cache`-backed observer bookkeeping.

use std::net::{SocketAddr, UdpSocket};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::socket::Socket;
use crate::time::{Clock, MessageIdSource};

/// A non-blocking `std::net::UdpSocket`.
pub struct StdUdpSocket {
    inner: UdpSocket,
}

impl StdUdpSocket {
    /// Binds a non-blocking UDP socket to `addr` (e.g. `"0.0.0.0:5683"`).
    pub fn bind(addr: &str) -> std::io::Result<Self> {
        let inner = UdpSocket::bind(addr)?;
        inner.set_nonblocking(true)?;
        Ok(StdUdpSocket { inner })
    }
}

impl Socket for StdUdpSocket {
    type Error = std::io::Error;

    fn bind(&mut self, port: u16) -> Result<(), Self::Error> {
        let inner = UdpSocket::bind(("0.0.0.0", port))?;
        inner.set_nonblocking(true)?;
        self.inner = inner;
        Ok(())
    }

    fn poll(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, Self::Error> {
        match self.inner.recv_from(buf) {
            Ok((len, from)) => Ok(Some((len, from))),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn send(&mut self, buf: &[u8], to: SocketAddr) -> Result<(), Self::Error> {
        self.inner.send_to(buf, to).map(|_| ())
    }
}

/// A [`Clock`] backed by [`std::time::Instant`], monotonic for the
/// lifetime of the process.
pub struct StdClock {
    start: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        StdClock { start: Instant::now() }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now_ms(&mut self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// A [`MessageIdSource`] seeded from wall-clock time at construction and
/// advanced with a small xorshift generator -- a stand-in for the host
/// entropy source the specification leaves external (see `SPEC_FULL.md`
/// §9's "message-id randomness" open question), not a cryptographic RNG.
pub struct XorshiftIds {
    state: u32,
}

impl XorshiftIds {
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0x9E3779B9);
        XorshiftIds { state: seed | 1 }
    }
}

impl Default for XorshiftIds {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageIdSource for XorshiftIds {
    fn next_id(&mut self) -> u16 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        (x & 0xFFFF) as u16
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn xorshift_ids_are_not_constant() {
        let mut ids = XorshiftIds::new();
        let a = ids.next_id();
        let b = ids.next_id();
        let c = ids.next_id();
        assert!(a != b || b != c);
    }
}
