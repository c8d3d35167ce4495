//! The Observe (RFC 7641) registry: a fixed-capacity table of observers
//! per path, evicted by lease rather than by unacknowledged-message count.
//!
//! The original's `ObserveEntry[COAP_MAX_OBSERVERS]` tracked an ack
//! counter (`unacknowledged_messages`) and dropped an observer once it
//! exceeded a threshold. This crate instead gives each observer a
//! time-based lease refreshed by re-registration, per the REDESIGN FLAG
//! in the specification this crate implements: ack bookkeeping requires
//! correlating notifications with incoming ACKs by Message-ID, which
//! couples the registry to the dispatch loop's retransmission state in a
//! way a lease does not.

use core::net::SocketAddr;

use heapless::{String as HString, Vec as HVec};

use crate::config::{COAP_MAX_OBSERVE_URL_LEN, COAP_MAX_OBSERVERS, COAP_OBSERVER_LEASE_MS};

struct ObserverEntry {
    addr: SocketAddr,
    token: [u8; 8],
    token_len: u8,
    path: HString<COAP_MAX_OBSERVE_URL_LEN>,
    seq: u32,
    last_seen_ms: u64,
}

impl ObserverEntry {
    fn token(&self) -> &[u8] {
        &self.token[..self.token_len as usize]
    }

    fn matches(&self, path: &str, addr: SocketAddr, token: &[u8]) -> bool {
        self.path == path && self.addr == addr && self.token() == token
    }

    fn expired(&self, lease_ms: u64, now_ms: u64) -> bool {
        lease_ms != 0 && now_ms.saturating_sub(self.last_seen_ms) > lease_ms
    }
}

/// A fixed-capacity table of observers, one entry per (path, peer
/// address, token) triple. Capacity is fixed at compile time via `N`
/// (default [`COAP_MAX_OBSERVERS`]).
pub struct ObserverRegistry<const N: usize = COAP_MAX_OBSERVERS> {
    entries: HVec<ObserverEntry, N>,
    lease_ms: u64,
}

impl<const N: usize> ObserverRegistry<N> {
    pub fn new() -> Self {
        ObserverRegistry {
            entries: HVec::new(),
            lease_ms: COAP_OBSERVER_LEASE_MS,
        }
    }

    /// Overrides the default lease. `0` disables expiry entirely.
    pub fn set_lease_ms(&mut self, lease_ms: u64) {
        self.lease_ms = lease_ms;
    }

    /// Registers `addr`/`token` as an observer of `path`, or refreshes an
    /// existing registration's lease if one already matches. Falls back
    /// to reclaiming the first lease-expired slot when the table is full,
    /// and fails only if no slot is free or reclaimable.
    pub fn add_observer(
        &mut self,
        path: &str,
        addr: SocketAddr,
        token: &[u8],
        now_ms: u64,
    ) -> bool {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.matches(path, addr, token))
        {
            entry.last_seen_ms = now_ms;
            return true;
        }

        let mut token_buf = [0u8; 8];
        let token_len = token.len().min(8);
        token_buf[..token_len].copy_from_slice(&token[..token_len]);
        let path = match HString::try_from(path) {
            Ok(p) => p,
            Err(_) => return false,
        };
        let new_entry = ObserverEntry {
            addr,
            token: token_buf,
            token_len: token_len as u8,
            path,
            seq: 0,
            last_seen_ms: now_ms,
        };

        if self.entries.push(new_entry).is_ok() {
            return true;
        }

        if let Some(slot) = self
            .entries
            .iter_mut()
            .find(|e| e.expired(self.lease_ms, now_ms))
        {
            let token_buf = {
                let mut t = [0u8; 8];
                t[..token_len].copy_from_slice(&token[..token_len]);
                t
            };
            slot.addr = addr;
            slot.token = token_buf;
            slot.token_len = token_len as u8;
            slot.path = match HString::try_from(path.as_str()) {
                Ok(p) => p,
                Err(_) => return false,
            };
            slot.seq = 0;
            slot.last_seen_ms = now_ms;
            return true;
        }

        false
    }

    /// Registers (or refreshes) `addr`/`token` as an observer of `path`,
    /// same as [`ObserverRegistry::add_observer`], but also advances the
    /// entry's sequence counter by one and returns the new value. The
    /// registration's piggy-backed ACK is itself the first notification
    /// in the Observe sequence (RFC 7641), so its advertised sequence
    /// number must come from the same counter `notify()` later
    /// increments, not a value decoupled from it -- otherwise the first
    /// `notify()` after registration repeats the number the ACK already
    /// used. Returns `None` if the table is full and `path`/`addr`/`token`
    /// isn't already registered.
    pub fn add_observer_and_seq(
        &mut self,
        path: &str,
        addr: SocketAddr,
        token: &[u8],
        now_ms: u64,
    ) -> Option<u32> {
        if !self.add_observer(path, addr, token, now_ms) {
            return None;
        }
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.matches(path, addr, token))?;
        entry.seq = entry.seq.wrapping_add(1);
        Some(entry.seq)
    }

    /// Removes a specific observer (Observe: 1, deregister).
    pub fn remove_observer(&mut self, path: &str, addr: SocketAddr, token: &[u8]) -> bool {
        let position = self.entries.iter().position(|e| e.matches(path, addr, token));
        match position {
            Some(idx) => {
                self.entries.swap_remove(idx);
                true
            }
            None => false,
        }
    }

    /// Notifies every non-expired observer of `path`, pruning expired
    /// ones first, and invoking `send` once per remaining observer with
    /// its address, token, and newly-incremented sequence number. The
    /// first notification after registration has sequence `1`.
    pub fn notify<F: FnMut(SocketAddr, &[u8], u32)>(
        &mut self,
        path: &str,
        now_ms: u64,
        mut send: F,
    ) {
        let lease_ms = self.lease_ms;
        self.entries.retain(|e| !e.expired(lease_ms, now_ms));

        for entry in self.entries.iter_mut().filter(|e| e.path == path) {
            entry.seq = entry.seq.wrapping_add(1);
            send(entry.addr, entry.token(), entry.seq);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<const N: usize> Default for ObserverRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use core::net::{IpAddr, Ipv4Addr};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
    }

    #[test]
    fn notify_sequence_starts_at_one_and_increments() {
        let mut registry: ObserverRegistry<4> = ObserverRegistry::new();
        registry.add_observer("sensors/temp", addr(1000), &[1, 2], 0);

        let mut seqs: heapless::Vec<u32, 4> = heapless::Vec::new();
        registry.notify("sensors/temp", 10, |_, _, seq| {
            let _ = seqs.push(seq);
        });
        registry.notify("sensors/temp", 20, |_, _, seq| {
            let _ = seqs.push(seq);
        });
        assert_eq!(seqs.as_slice(), &[1, 2]);
    }

    #[test]
    fn registration_seq_continues_into_first_notify() {
        let mut registry: ObserverRegistry<4> = ObserverRegistry::new();
        let registration_seq = registry.add_observer_and_seq("temp", addr(1000), &[0xAA, 0xBB], 0);
        assert_eq!(registration_seq, Some(1));

        let mut seqs: heapless::Vec<u32, 4> = heapless::Vec::new();
        for _ in 0..3 {
            registry.notify("temp", 10, |_, _, seq| {
                let _ = seqs.push(seq);
            });
        }
        assert_eq!(seqs.as_slice(), &[2, 3, 4]);
    }

    #[test]
    fn dedup_on_add_refreshes_lease_instead_of_new_entry() {
        let mut registry: ObserverRegistry<4> = ObserverRegistry::new();
        assert!(registry.add_observer("a", addr(1), &[9], 0));
        assert!(registry.add_observer("a", addr(1), &[9], 100));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn expired_observer_is_pruned_on_notify() {
        let mut registry: ObserverRegistry<4> = ObserverRegistry::new();
        registry.set_lease_ms(50);
        registry.add_observer("a", addr(1), &[1], 0);

        let mut called = 0;
        registry.notify("a", 1000, |_, _, _| called += 1);
        assert_eq!(called, 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn full_table_reclaims_expired_slot() {
        let mut registry: ObserverRegistry<1> = ObserverRegistry::new();
        registry.set_lease_ms(50);
        assert!(registry.add_observer("a", addr(1), &[1], 0));
        assert!(registry.add_observer("b", addr(2), &[2], 1000));
        assert_eq!(registry.len(), 1);
        assert!(registry.remove_observer("b", addr(2), &[2]));
    }

    #[test]
    fn remove_observer_is_exact_match() {
        let mut registry: ObserverRegistry<4> = ObserverRegistry::new();
        registry.add_observer("a", addr(1), &[1], 0);
        assert!(!registry.remove_observer("a", addr(1), &[2]));
        assert!(registry.remove_observer("a", addr(1), &[1]));
        assert!(registry.is_empty());
    }
}
