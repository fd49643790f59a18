//! bev_listen - receive and print detection datagrams.
//!
//! Binds a UDP port, parses every datagram with the wire decoder and logs
//! the detections it carries. Useful for checking a `bevd` deployment
//! without the downstream consumer.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bev_relay::decode_detections;

/// Largest payload a UDP datagram can carry.
const MAX_DATAGRAM: usize = 65_507;

#[derive(Parser, Debug)]
#[command(author, version, about = "Receive and print detection datagrams")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BEV_LISTEN_ADDR", default_value = "0.0.0.0:8081")]
    bind: String,

    /// Exit after this many datagrams.
    #[arg(long)]
    count: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let socket = UdpSocket::bind(&args.bind)
        .with_context(|| format!("failed to bind {}", args.bind))?;
    socket.set_read_timeout(Some(Duration::from_millis(500)))?;
    log::info!("listening for detections on {}", socket.local_addr()?);

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    let mut buf = vec![0u8; MAX_DATAGRAM];
    let mut received = 0u64;
    while running.load(Ordering::SeqCst) {
        let (len, from) = match socket.recv_from(&mut buf) {
            Ok(r) => r,
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                continue
            }
            Err(e) => return Err(e).context("recv_from failed"),
        };
        received += 1;

        match decode_detections(&buf[..len]) {
            Ok(detections) => {
                log::info!(
                    "datagram {} from {}: {} detections",
                    received,
                    from,
                    detections.len()
                );
                for d in &detections {
                    log::info!(
                        "  class {} score {:.3} at ({:.2}, {:.2}, {:.2}) size {:.2}x{:.2}x{:.2} heading {:.3}",
                        d.class_id,
                        d.confidence,
                        d.position.x,
                        d.position.y,
                        d.position.z,
                        d.size.width,
                        d.size.length,
                        d.size.height,
                        d.heading
                    );
                }
            }
            Err(e) => log::warn!("datagram {} from {} rejected: {:#}", received, from, e),
        }

        if args.count.is_some_and(|limit| received >= limit) {
            break;
        }
    }
    log::info!("received {} datagrams", received);
    Ok(())
}
