//! The transport collaborator: anything that can send and receive UDP
//! datagrams. This crate only depends on this trait -- actual socket I/O
//! (or a `no_std` target's platform UDP stack) is supplied by the caller.

use core::net::SocketAddr;

/// A non-blocking UDP socket. `poll` returning `Ok(None)` means "no
/// datagram available right now", matching how [`crate::endpoint::Endpoint::poll`]
/// is meant to be driven from a cooperative loop rather than a blocking read.
pub trait Socket {
    type Error;

    /// Binds the socket to `port` on all interfaces.
    fn bind(&mut self, port: u16) -> Result<(), Self::Error>;

    /// Reads one datagram into `buf` if one is available, returning its
    /// length and the sender's address.
    fn poll(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, Self::Error>;

    /// Sends `buf` as a single datagram to `to`.
    fn send(&mut self, buf: &[u8], to: SocketAddr) -> Result<(), Self::Error>;
}
