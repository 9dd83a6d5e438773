//! End-to-end tunnel test
//!
//! Two sessions (client-side initiator, device-side acceptor) are linked by an
//! in-memory relay pipe. Each session's local endpoint is bridged to a fake
//! application socket through a tunnel, then the client and device take turns
//! sending fixed-size random payloads through the whole chain.
//!
//! ```text
//! client app <-> tunnel <-> [initiator] <-relay-> [acceptor] <-> tunnel <-> device app
//! ```

use std::time::Duration;

use anyhow::{bail, Context};
use rand::Rng;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use e2elink_core::Address;
use e2elink_logging::init_logging;
use e2elink_session::E2eSession;
use e2elink_settings::{LogSettings, Settings};
use e2elink_tunnel::Tunnel;

const TUNNEL_SIZE: usize = 256;
const EXCHANGES: usize = 10;
const PIPE_CAPACITY: usize = 64 * 1024;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn random_data(total: usize, count: usize) -> Vec<Vec<u8>> {
    let mut rng = rand::thread_rng();
    (0..total)
        .map(|_| {
            (0..count)
                .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())])
                .collect()
        })
        .collect()
}

fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.session.idle_timeout_ms = 2_000;
    settings.tunnel.chunk_size = TUNNEL_SIZE;
    settings.tunnel.left_timeout_ms = 1_000;
    settings.tunnel.right_timeout_ms = 1_000;
    settings
}

fn test_peer() -> Address {
    "0x6a1c2b9f0e8d7c6b5a4938271605f4e3d2c1b0a9"
        .parse()
        .expect("valid test address")
}

#[tokio::test]
async fn test_e2e_tunnels() -> anyhow::Result<()> {
    init_logging(&LogSettings {
        debug: true,
        filter: None,
    });

    let settings = test_settings();
    let session_config = settings.session_config()?;
    let tunnel_config = settings.tunnel_config()?;
    let transport_data = random_data(EXCHANGES, TUNNEL_SIZE);

    // Relay network between the two sessions
    let (relay_client, relay_device) = tokio::io::duplex(PIPE_CAPACITY);
    let client_session = E2eSession::with_config(relay_client, test_peer(), session_config.clone())?;
    let device_session = E2eSession::with_config(relay_device, test_peer(), session_config)?;

    let (client_local, device_local) = tokio::join!(
        client_session.connect_as_initiator(),
        device_session.connect_as_acceptor()
    );
    let client_local = client_local.context("client connect")?;
    let device_local = device_local.context("device connect")?;

    // Fake proxy client: `fc` is the application, `fs` its socket
    let (mut fc, fs) = tokio::io::duplex(PIPE_CAPACITY);
    let _client_tunnel = Tunnel::from_config(client_local, fs, &tunnel_config)?.copy();

    // Fake device service: `dc` is the service, `ds` its listener socket
    let (mut dc, ds) = tokio::io::duplex(PIPE_CAPACITY);
    let _device_tunnel = Tunnel::from_config(device_local, ds, &tunnel_config)?.copy();

    let client_data = transport_data.clone();
    let client = tokio::spawn(async move {
        for i in (0..EXCHANGES).step_by(2) {
            fc.write_all(&client_data[i]).await.context("client write")?;

            let mut buf = vec![0u8; TUNNEL_SIZE];
            fc.read_exact(&mut buf).await.context("client read")?;
            if buf != client_data[i + 1] {
                bail!("data mismatch when reading from e2e in client (exchange {})", i);
            }
        }
        Ok::<_, anyhow::Error>(())
    });

    let device_data = transport_data;
    let device = tokio::spawn(async move {
        for i in (1..EXCHANGES).step_by(2) {
            let mut buf = vec![0u8; TUNNEL_SIZE];
            dc.read_exact(&mut buf).await.context("device read")?;
            if buf != device_data[i - 1] {
                bail!("data mismatch when reading from e2e in device (exchange {})", i);
            }

            dc.write_all(&device_data[i]).await.context("device write")?;
        }
        Ok::<_, anyhow::Error>(())
    });

    tokio::time::timeout(Duration::from_secs(10), client).await???;
    tokio::time::timeout(Duration::from_secs(10), device).await???;

    client_session.close();
    device_session.close();
    Ok(())
}

#[tokio::test]
async fn test_single_read_per_chunk_through_sessions() -> anyhow::Result<()> {
    let settings = test_settings();
    let session_config = settings.session_config()?;
    let tunnel_config = settings.tunnel_config()?;

    let (relay_client, relay_device) = tokio::io::duplex(PIPE_CAPACITY);
    let client_session = E2eSession::with_config(relay_client, test_peer(), session_config.clone())?;
    let device_session = E2eSession::with_config(relay_device, test_peer(), session_config)?;

    let (client_local, device_local) = tokio::join!(
        client_session.connect_as_initiator(),
        device_session.connect_as_acceptor()
    );

    let (mut app, socket) = tokio::io::duplex(PIPE_CAPACITY);
    let _tunnel = Tunnel::from_config(client_local?, socket, &tunnel_config)?.copy();
    let mut device_local = device_local?;

    // Payloads up to one chunk arrive whole in a single read
    for payload in random_data(4, TUNNEL_SIZE) {
        app.write_all(&payload).await?;
        let mut buf = vec![0u8; TUNNEL_SIZE];
        let n = tokio::time::timeout(Duration::from_secs(1), device_local.read(&mut buf)).await??;
        assert_eq!(&buf[..n], &payload[..]);
    }
    Ok(())
}
