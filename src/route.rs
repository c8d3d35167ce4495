//! A fixed-capacity table mapping Uri-Path strings to request handlers,
//! the const-generic, no-alloc analogue of the original's `CoapUri`
//! (a pair of fixed arrays of `String`/`callback` searched linearly).

use heapless::Vec as HVec;

use crate::config::COAP_MAX_CALLBACK;
use crate::endpoint::Handler;
use crate::socket::Socket;

struct Route<S: Socket> {
    path: &'static str,
    handler: &'static dyn Handler<S>,
}

/// Registers handlers by path and looks them up by exact byte match, in
/// the order they were registered. Capacity is fixed at compile time via
/// `N` (default [`COAP_MAX_CALLBACK`]); registering past capacity is a
/// silent no-op, mirroring the original's fixed-size `u[]`/`c[]` arrays
/// (see `SPEC_FULL.md` §4.3 for the Open Question resolution).
pub struct RouteTable<S: Socket, const N: usize = COAP_MAX_CALLBACK> {
    routes: HVec<Route<S>, N>,
}

impl<S: Socket, const N: usize> RouteTable<S, N> {
    pub fn new() -> Self {
        RouteTable { routes: HVec::new() }
    }

    /// Registers `handler` for `path`. Re-registering an existing path
    /// replaces its handler in place, matching the original's `add()`
    /// find-or-append behavior. Returns `false` if the table is full and
    /// `path` is new.
    pub fn register(&mut self, path: &'static str, handler: &'static dyn Handler<S>) -> bool {
        for route in self.routes.iter_mut() {
            if route.path == path {
                route.handler = handler;
                return true;
            }
        }
        self.routes.push(Route { path, handler }).is_ok()
    }

    /// Looks up the handler registered for `path`, if any.
    pub fn find(&self, path: &str) -> Option<&'static dyn Handler<S>> {
        self.routes
            .iter()
            .find(|route| route.path == path)
            .map(|route| route.handler)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<S: Socket, const N: usize> Default for RouteTable<S, N> {
    fn default() -> Self {
        Self::new()
    }
}
