use std::{num::NonZeroUsize, time::Duration};

use tokio::{
    io::{self, AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

use comms::{CommsErr, ConnectConfig, establish, handshake};

fn ndim(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

#[tokio::test]
async fn handshake_sends_big_endian_ndim_and_accepts_ok() {
    let (client, mut server) = io::duplex(1024);

    let server_task = async {
        let mut frame = [0u8; 8];
        server.read_exact(&mut frame).await.unwrap();
        assert_eq!(frame, 2i64.to_be_bytes());
        server.write_all(b"OK\n").await.unwrap();
        server
    };

    let (link, _server) = tokio::join!(handshake(client, ndim(2)), server_task);
    let link = link.unwrap();
    assert_eq!(link.ndim(), 2);
}

#[tokio::test]
async fn handshake_rejects_any_other_reply() {
    let (client, mut server) = io::duplex(1024);

    let server_task = async {
        let mut frame = [0u8; 8];
        server.read_exact(&mut frame).await.unwrap();
        // The explorer answers a dimensionality mismatch with its own ndim.
        server.write_all(b"3\n").await.unwrap();
        server
    };

    let (res, _server) = tokio::join!(handshake(client, ndim(2)), server_task);
    match res {
        Err(CommsErr::Handshake { reply }) => assert_eq!(reply, "3\n"),
        other => panic!("expected handshake error, got {other:?}"),
    }
}

#[tokio::test]
async fn frames_decode_bit_exact_in_arrival_order() {
    let (client, mut server) = io::duplex(1024);
    let points = [[1.5, -2.25], [0.0, f64::MIN_POSITIVE], [-1e300, 7.25]];

    let server_task = async {
        let mut frame = [0u8; 8];
        server.read_exact(&mut frame).await.unwrap();
        server.write_all(b"OK\n").await.unwrap();

        for point in &points {
            for value in point {
                server.write_all(&value.to_be_bytes()).await.unwrap();
            }
        }

        drop(server);
    };

    let client_task = async {
        let mut link = handshake(client, ndim(2)).await.unwrap();
        let mut received = Vec::new();
        while let Some(point) = link.recv_request().await.unwrap() {
            received.push(point);
        }
        received
    };

    let (_, received) = tokio::join!(server_task, client_task);
    assert_eq!(received.len(), points.len());
    for (got, expected) in received.iter().zip(&points) {
        assert_eq!(got.len(), 2);
        for (g, e) in got.iter().zip(expected) {
            assert_eq!(g.to_bits(), e.to_bits());
        }
    }
}

#[tokio::test]
async fn clean_close_at_frame_boundary_is_end_of_session() {
    let (client, mut server) = io::duplex(1024);

    let server_task = async {
        let mut frame = [0u8; 8];
        server.read_exact(&mut frame).await.unwrap();
        server.write_all(b"OK\n").await.unwrap();
        drop(server);
    };

    let client_task = async {
        let mut link = handshake(client, ndim(2)).await.unwrap();
        link.recv_request().await
    };

    let (_, res) = tokio::join!(server_task, client_task);
    assert!(matches!(res, Ok(None)));
}

#[tokio::test]
async fn partial_frame_is_a_protocol_violation() {
    let (client, mut server) = io::duplex(1024);

    let server_task = async {
        let mut frame = [0u8; 8];
        server.read_exact(&mut frame).await.unwrap();
        server.write_all(b"OK\n").await.unwrap();
        // Half a frame: one double where the agreed ndim requires two.
        server.write_all(&1.0f64.to_be_bytes()).await.unwrap();
        drop(server);
    };

    let client_task = async {
        let mut link = handshake(client, ndim(2)).await.unwrap();
        link.recv_request().await
    };

    let (_, res) = tokio::join!(server_task, client_task);
    match res {
        Err(CommsErr::TruncatedFrame { got, expected }) => {
            assert_eq!(got, 8);
            assert_eq!(expected, 16);
        }
        other => panic!("expected truncated frame, got {other:?}"),
    }
}

#[tokio::test]
async fn responses_encode_as_single_bytes() {
    let (client, mut server) = io::duplex(1024);

    let server_task = async {
        let mut frame = [0u8; 8];
        server.read_exact(&mut frame).await.unwrap();
        server.write_all(b"OK\n").await.unwrap();

        let mut bytes = [0u8; 2];
        server.read_exact(&mut bytes).await.unwrap();
        bytes
    };

    let client_task = async {
        let mut link = handshake(client, ndim(2)).await.unwrap();
        link.send_response(true).await.unwrap();
        link.send_response(false).await.unwrap();
    };

    let (bytes, ()) = tokio::join!(server_task, client_task);
    assert_eq!(bytes, [0x01, 0x00]);
}

/// The reference exchange: ndim 2, ack, one request, one valid response.
#[tokio::test]
async fn reference_exchange_round_trips() {
    let (client, mut server) = io::duplex(1024);

    let server_task = async {
        let mut frame = [0u8; 8];
        server.read_exact(&mut frame).await.unwrap();
        assert_eq!(frame, [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02]);
        server.write_all(b"OK\n").await.unwrap();

        server.write_all(&1.5f64.to_be_bytes()).await.unwrap();
        server.write_all(&(-2.25f64).to_be_bytes()).await.unwrap();

        let mut response = [0u8; 1];
        server.read_exact(&mut response).await.unwrap();
        assert_eq!(response, [0x01]);

        drop(server);
    };

    let client_task = async {
        let mut link = handshake(client, ndim(2)).await.unwrap();

        let point = link.recv_request().await.unwrap().unwrap();
        assert_eq!(point, vec![1.5, -2.25]);
        link.send_response(true).await.unwrap();

        // The next read observes the close as a normal end of session.
        assert!(link.recv_request().await.unwrap().is_none());
    };

    tokio::join!(server_task, client_task);
}

#[tokio::test]
async fn establish_connects_and_handshakes_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server_task = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut frame = [0u8; 8];
        stream.read_exact(&mut frame).await.unwrap();
        assert_eq!(frame, 2i64.to_be_bytes());
        stream.write_all(b"OK\n").await.unwrap();
    });

    let link = establish(addr, ndim(2), &ConnectConfig::default())
        .await
        .unwrap();
    assert_eq!(link.ndim(), 2);

    server_task.await.unwrap();
}

#[tokio::test]
async fn establish_fails_after_retry_budget() {
    // Bind and drop to get a loopback port nothing is listening on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ConnectConfig {
        max_attempts: NonZeroUsize::new(2),
        retry_delay: Duration::from_millis(1),
        fail_fast: false,
    };

    match establish(addr, ndim(2), &config).await {
        Err(CommsErr::Connect { attempts, .. }) => assert_eq!(attempts, 2),
        other => panic!("expected connect error, got {other:?}"),
    }
}

#[tokio::test]
async fn fail_fast_attempts_exactly_once() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ConnectConfig {
        max_attempts: NonZeroUsize::new(10),
        retry_delay: Duration::from_millis(1),
        fail_fast: true,
    };

    match establish(addr, ndim(2), &config).await {
        Err(CommsErr::Connect { attempts, .. }) => assert_eq!(attempts, 1),
        other => panic!("expected connect error, got {other:?}"),
    }
}
