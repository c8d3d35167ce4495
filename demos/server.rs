//! Minimal CoAP server: serves `GET /sensors/temp` (with Observe support)
//! and notifies every registered observer once a second with a fake
//! reading, mirroring the shape of the teacher's own `examples/server.rs`
//! but wired through this crate's `Endpoint`/`Socket`/`Clock` collaborators
//! instead of talking to `std::net::UdpSocket` directly.

use std::thread::sleep;
use std::time::Duration;

use coap_lite_core::endpoint::{Request, ResponseWriter};
use coap_lite_core::error::HandlingError;
use coap_lite_core::{Endpoint, StdClock, StdUdpSocket, XorshiftIds};

fn sensors_temp(req: &Request, out: &mut ResponseWriter) -> Result<(), HandlingError> {
    println!(
        "GET sensors/temp from {} (observe: {})",
        req.source,
        req.wants_observe
    );
    out.write_payload(b"21.5")
}

fn main() -> std::io::Result<()> {
    let socket = StdUdpSocket::bind("127.0.0.1:5683")?;
    let mut endpoint: Endpoint<StdUdpSocket> = Endpoint::new(socket);
    endpoint.server("sensors/temp", &sensors_temp);

    let mut clock = StdClock::new();
    let mut ids = XorshiftIds::new();
    let mut last_notify_ms = 0u64;

    println!("listening on 127.0.0.1:5683");
    loop {
        endpoint.poll(&mut clock)?;

        let now_ms = clock.now_ms();
        if now_ms.saturating_sub(last_notify_ms) >= 1000 {
            last_notify_ms = now_ms;
            endpoint.notify(&mut ids, now_ms, "sensors/temp", b"21.6", Some(0));
        }

        sleep(Duration::from_millis(20));
    }
}
