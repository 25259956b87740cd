//! Session Loop: a single-threaded cooperative event loop, built on
//! `tokio::select!` in place of a raw `select(2)` call, driving one
//! TCP connection to a peer plus the local camera and terminal.

use std::net::Ipv4Addr;
use std::time::Duration;

use anyhow::{Context, Result};
use picturephone_capture::CaptureHandle;
use picturephone_protocol::{Accumulator, Packet, DEFAULT_PEER_HEIGHT, DEFAULT_PEER_WIDTH};
use picturephone_ramp::DensityRamp;
use picturephone_term::Presenter;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpSocket, TcpStream};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::{Role, View};
use crate::redraw::{self, PeerFrame};
use crate::status::StatusMessage;

const CTRL_C: u8 = 3;
const FRAME_PERIOD: Duration = Duration::from_millis(33);
const READ_CHUNK: usize = 4096;

/// What the peer has asked us to send: width/height in terminal
/// cells, clamped to [1, 255] the way a single dimension byte bounds it.
struct RenderRequest {
    width: u8,
    height: u8,
}

pub async fn run(
    role: Role,
    port: u16,
    peer_addr: Ipv4Addr,
    mut view: View,
    mut presenter: Presenter,
    capture: CaptureHandle,
    ramp: DensityRamp,
    mut stdin_rx: mpsc::Receiver<u8>,
) -> Result<()> {
    let mut socket = establish(role, port, peer_addr, &mut stdin_rx).await?;
    tracing::info!(?role, port, "session established");

    let mut status = StatusMessage::new("Connected.");

    let mut my_render = clamp_render(presenter.screen_cols(), presenter.screen_rows());
    send_config(&mut socket, &my_render).await?;

    let mut peer_render = RenderRequest {
        width: DEFAULT_PEER_WIDTH,
        height: DEFAULT_PEER_HEIGHT,
    };

    let mut accumulator = Accumulator::new();
    let mut last_peer: Option<PeerFrame> = None;
    let mut read_buf = vec![0u8; READ_CHUNK];
    let mut next_frame_deadline = Instant::now() + FRAME_PERIOD;

    loop {
        if presenter.refresh_if_resized().unwrap_or(false) {
            let resized = clamp_render(presenter.screen_cols(), presenter.screen_rows());
            if resized.width != my_render.width || resized.height != my_render.height {
                my_render = resized;
                send_config(&mut socket, &my_render).await?;
            }
        }

        tokio::select! {
            byte = stdin_rx.recv() => {
                match byte {
                    Some(CTRL_C) | None => {
                        tracing::info!("session exiting on Ctrl-C");
                        break;
                    }
                    Some(b'v') | Some(b'V') => {
                        view = view.toggled();
                        if last_peer.is_some() {
                            redraw_now(&mut presenter, &ramp, view, last_peer.as_ref(), &capture, &status)?;
                        }
                    }
                    Some(_) => {}
                }
            }

            read = socket.read(&mut read_buf) => {
                let n = read.context("socket read failed")?;
                if n == 0 {
                    status.set("Connection closed by peer.");
                    tracing::info!("peer closed the connection");
                    break;
                }
                accumulator.extend(&read_buf[..n]);
                for packet in accumulator.drain_packets() {
                    match packet {
                        Packet::Config { width, height } => {
                            if width != 0 && height != 0 {
                                peer_render = RenderRequest { width, height };
                            }
                        }
                        Packet::Picture { width, height, luma } => {
                            last_peer = Some(PeerFrame::from_picture(width, height, luma));
                            redraw_now(&mut presenter, &ramp, view, last_peer.as_ref(), &capture, &status)?;
                        }
                    }
                }
            }

            () = tokio::time::sleep_until(next_frame_deadline) => {
                if let Some(frame) = capture.latest_frame() {
                    let payload = picturephone_protocol::encode_picture(
                        &frame.pixels,
                        frame.width,
                        frame.height,
                        peer_render.width,
                        peer_render.height,
                    );
                    if let Err(e) = socket.try_write(&payload) {
                        if e.kind() != std::io::ErrorKind::WouldBlock {
                            tracing::warn!("dropping outgoing frame: {e}");
                        }
                    }
                }
                next_frame_deadline = Instant::now() + FRAME_PERIOD;
            }
        }
    }

    Ok(())
}

async fn establish(
    role: Role,
    port: u16,
    peer_addr: Ipv4Addr,
    stdin_rx: &mut mpsc::Receiver<u8>,
) -> Result<TcpStream> {
    match role {
        Role::Server => {
            let addr = std::net::SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
            let socket = TcpSocket::new_v4().context("failed to create server socket")?;
            socket
                .set_reuseaddr(true)
                .context("failed to set SO_REUSEADDR")?;
            socket
                .bind(addr)
                .with_context(|| format!("failed to bind port {port}"))?;
            let listener = socket
                .listen(3)
                .with_context(|| format!("failed to listen on port {port}"))?;
            tracing::info!(port, "listening for a peer");
            loop {
                tokio::select! {
                    accepted = listener.accept() => {
                        let (stream, addr) = accepted.context("accept failed")?;
                        tracing::info!(%addr, "peer connected");
                        return Ok(stream);
                    }
                    byte = stdin_rx.recv() => {
                        match byte {
                            Some(CTRL_C) | None => anyhow::bail!("aborted while waiting for a peer"),
                            Some(_) => continue,
                        }
                    }
                }
            }
        }
        Role::Client => {
            let mut connect = Box::pin(TcpStream::connect((peer_addr, port)));
            loop {
                tokio::select! {
                    connected = &mut connect => {
                        let stream = connected
                            .with_context(|| format!("failed to connect to {peer_addr}:{port}"))?;
                        tracing::info!(%peer_addr, port, "connected to peer");
                        return Ok(stream);
                    }
                    byte = stdin_rx.recv() => {
                        match byte {
                            Some(CTRL_C) | None => anyhow::bail!("aborted while connecting"),
                            Some(_) => continue,
                        }
                    }
                }
            }
        }
    }
}

async fn send_config(socket: &mut TcpStream, render: &RenderRequest) -> Result<()> {
    let header = [b'C', render.width, render.height];
    socket
        .write_all(&header)
        .await
        .context("failed to send Config packet")
}

fn clamp_render(cols: u16, rows: u16) -> RenderRequest {
    RenderRequest {
        width: cols.clamp(1, 255) as u8,
        height: rows.clamp(1, 255) as u8,
    }
}

fn redraw_now(
    presenter: &mut Presenter,
    ramp: &DensityRamp,
    view: View,
    peer: Option<&PeerFrame>,
    capture: &CaptureHandle,
    status: &StatusMessage,
) -> Result<()> {
    let local = capture.latest_frame();
    let buf = redraw::compose_session(
        ramp,
        view,
        peer,
        local.as_ref(),
        presenter.screen_cols(),
        presenter.screen_rows(),
        status,
    );
    presenter
        .write_batch(&buf)
        .context("failed to write frame to terminal")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_render_matches_resize_scenario() {
        // S5: 80x24 resizing to 120x30 (29 usable rows after reserving
        // the status line) clamps to bytes 0x78, 0x1d.
        let render = clamp_render(120, 29);
        assert_eq!((render.width, render.height), (0x78, 0x1d));
    }

    #[test]
    fn clamp_render_saturates_at_255() {
        let render = clamp_render(9000, 9000);
        assert_eq!((render.width, render.height), (255, 255));
    }

    #[test]
    fn clamp_render_floors_at_one() {
        let render = clamp_render(0, 0);
        assert_eq!((render.width, render.height), (1, 1));
    }
}
