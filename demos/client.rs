//! Minimal CoAP client: registers an Observe subscription on
//! `/sensors/temp` and prints whatever notifications arrive, mirroring the
//! teacher's own `examples/client.rs` but driven through this crate's
//! `Endpoint` instead of a bare `UdpSocket::send_to`.

use std::time::Duration;

use coap_lite_core::{Endpoint, StdClock, StdUdpSocket, XorshiftIds};

fn main() -> std::io::Result<()> {
    let socket = StdUdpSocket::bind("127.0.0.1:0")?;
    let mut endpoint: Endpoint<StdUdpSocket> = Endpoint::new(socket);
    let mut ids = XorshiftIds::new();
    let mut clock = StdClock::new();

    let token = [0xCA, 0xFE];
    endpoint
        .get_observe(&mut ids, "127.0.0.1", 5683, "sensors/temp", &token)
        .expect("failed to send observe registration");
    println!("sent observe registration for sensors/temp");

    loop {
        endpoint.poll(&mut clock)?;
        std::thread::sleep(Duration::from_millis(50));
    }
}
