use std::net::UdpSocket;
use std::time::Duration;

use anyhow::Result;

use bev_relay::{decode_detections, BoxSize, Detection, DetectionBroadcaster, Position, Velocity};

fn receiver() -> Result<UdpSocket> {
    let socket = UdpSocket::bind("127.0.0.1:0")?;
    socket.set_read_timeout(Some(Duration::from_secs(2)))?;
    Ok(socket)
}

fn detections() -> Vec<Detection> {
    vec![
        Detection {
            position: Position {
                x: 10.123456,
                y: -4.5,
                z: 0.25,
            },
            size: BoxSize {
                width: 1.8,
                length: 4.4,
                height: 1.6,
            },
            velocity: Velocity::default(),
            heading: 3.1415925,
            class_id: 0,
            confidence: 0.87654,
        },
        Detection {
            position: Position {
                x: -0.000012,
                y: 1e-3,
                z: -1.75,
            },
            size: BoxSize {
                width: 0.6,
                length: 0.6,
                height: 1.8,
            },
            velocity: Velocity::default(),
            heading: -0.7853982,
            class_id: 8,
            confidence: 0.31,
        },
    ]
}

fn assert_close(a: f32, b: f32) {
    assert!((a - b).abs() <= 1e-5, "{} vs {}", a, b);
}

#[test]
fn datagram_round_trips_every_field() -> Result<()> {
    let rx = receiver()?;
    let port = rx.local_addr()?.port();
    let mut tx = DetectionBroadcaster::configure(0)?;
    let sent = detections();

    assert!(tx.send(&sent, "127.0.0.1", port));

    let mut buf = [0u8; 2048];
    let (len, _) = rx.recv_from(&mut buf)?;
    let received = decode_detections(&buf[..len])?;

    assert_eq!(received.len(), sent.len());
    for (r, s) in received.iter().zip(&sent) {
        assert_close(r.position.x, s.position.x);
        assert_close(r.position.y, s.position.y);
        assert_close(r.position.z, s.position.z);
        assert_close(r.size.width, s.size.width);
        assert_close(r.size.length, s.size.length);
        assert_close(r.size.height, s.size.height);
        assert_close(r.heading, s.heading);
        assert_close(r.confidence, s.confidence);
        assert_eq!(r.class_id, s.class_id);
    }
    assert_eq!(tx.stats().bytes_sent, len as u64);
    Ok(())
}

#[test]
fn each_send_is_one_datagram() -> Result<()> {
    let rx = receiver()?;
    let port = rx.local_addr()?.port();
    let mut tx = DetectionBroadcaster::configure(0)?;
    let all = detections();

    assert!(tx.send(&all[..1], "127.0.0.1", port));
    assert!(tx.send(&all, "127.0.0.1", port));
    assert!(tx.send(&[], "127.0.0.1", port));

    let mut buf = [0u8; 2048];
    let mut counts = Vec::new();
    for _ in 0..3 {
        let (len, _) = rx.recv_from(&mut buf)?;
        counts.push(decode_detections(&buf[..len])?.len());
    }
    assert_eq!(counts, vec![1, 2, 0]);
    assert_eq!(tx.stats().datagrams_sent, 3);
    assert_eq!(tx.stats().send_errors, 0);
    Ok(())
}

#[test]
fn send_failures_do_not_close_the_transport() -> Result<()> {
    let rx = receiver()?;
    let port = rx.local_addr()?.port();
    let mut tx = DetectionBroadcaster::configure(0)?;

    assert!(!tx.send(&detections(), "256.0.0.1", port));
    assert!(tx.is_open());
    assert!(tx.send(&detections(), "127.0.0.1", port));

    let mut buf = [0u8; 2048];
    let (len, _) = rx.recv_from(&mut buf)?;
    assert_eq!(decode_detections(&buf[..len])?.len(), 2);
    assert_eq!(tx.stats().send_errors, 1);
    Ok(())
}
