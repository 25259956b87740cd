//! Integration tests for the wire-level behavior the session loop
//! relies on: Config handshake framing and peer-close detection, over
//! real loopback TCP connections.

use picturephone_protocol::{Accumulator, Packet};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn loopback_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr);
    let (server, client) = tokio::join!(listener.accept(), client);
    (server.unwrap().0, client.unwrap())
}

#[tokio::test]
async fn handshake_exchanges_one_config_each_way() {
    // S2: each side sends its own Config immediately on connection.
    let (mut server, mut client) = loopback_pair().await;

    server.write_all(&[b'C', 0x50, 0x28]).await.unwrap();
    client.write_all(&[b'C', 0x78, 0x1e]).await.unwrap();

    let mut server_buf = [0u8; 3];
    let mut client_buf = [0u8; 3];
    client.read_exact(&mut server_buf).await.unwrap();
    server.read_exact(&mut client_buf).await.unwrap();

    let mut acc = Accumulator::new();
    acc.extend(&server_buf);
    assert_eq!(
        acc.pop_packet(),
        Some(Packet::Config {
            width: 0x50,
            height: 0x28
        })
    );

    let mut acc = Accumulator::new();
    acc.extend(&client_buf);
    assert_eq!(
        acc.pop_packet(),
        Some(Packet::Config {
            width: 0x78,
            height: 0x1e
        })
    );
}

#[tokio::test]
async fn peer_close_reads_as_eof() {
    // S6: when the remote peer closes the socket, the next read
    // returns 0 rather than erroring.
    let (server, client) = loopback_pair().await;
    drop(server);

    let mut client = client;
    let mut buf = [0u8; 16];
    let n = client.read(&mut buf).await.unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn picture_packet_round_trips_over_the_wire() {
    // S3: a 4x2 Picture with known luminance bytes decodes intact.
    let (mut server, client) = loopback_pair().await;
    let payload = [0u8, 64, 128, 255, 32, 96, 160, 224];
    let mut packet = vec![b'P', 4, 2];
    packet.extend_from_slice(&payload);
    server.write_all(&packet).await.unwrap();

    let mut client = client;
    let mut buf = [0u8; 64];
    let n = client.read(&mut buf).await.unwrap();

    let mut acc = Accumulator::new();
    acc.extend(&buf[..n]);
    assert_eq!(
        acc.pop_packet(),
        Some(Packet::Picture {
            width: 4,
            height: 2,
            luma: payload.to_vec(),
        })
    );
}
