use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::Parser;

use crate::config::{Config, Mode, Role, View};

/// Terminal webcam video chat: render a camera feed as density-art
/// glyphs, either mirrored locally or streamed to a single peer.
#[derive(Parser, Debug)]
#[command(name = "picturephone", version, about)]
pub struct Cli {
    /// Render mode: `mirror` shows only the local camera, `network`
    /// opens a two-peer session.
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// Layout used to compose the peer and local feeds in network mode.
    #[arg(long, value_enum)]
    pub view: Option<View>,

    /// Network role: `server` listens for a connection, `client`
    /// connects to `--peer`.
    #[arg(long, value_enum)]
    pub role: Option<Role>,

    /// TCP port to bind (server) or connect to (client).
    #[arg(long)]
    pub port: Option<u16>,

    /// Peer IPv4 address (client role only).
    #[arg(long)]
    pub peer: Option<Ipv4Addr>,

    /// Camera device id, or a `dummy-gradient`/`dummy-noise`/`dummy-bounce`
    /// synthetic source.
    #[arg(long)]
    pub camera: Option<String>,

    /// Density ramp: a literal glyph string, `ascii-default`, or
    /// `unicode-default`.
    #[arg(long)]
    pub density: Option<String>,

    /// Path to a TOML configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Print known camera identifiers and exit.
    #[arg(long)]
    pub list_cameras: bool,
}

impl Cli {
    /// Layer CLI flags over a file-loaded (or default) configuration:
    /// any flag that was actually passed overrides the corresponding
    /// field.
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(view) = self.view {
            config.view = view;
        }
        if let Some(role) = self.role {
            config.role = role;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(peer) = self.peer {
            config.peer = peer;
        }
        if let Some(camera) = &self.camera {
            config.camera = camera.clone();
        }
        if let Some(density) = &self.density {
            config.density = density.clone();
        }
        config
    }
}

/// The enumerator named as an out-of-scope external collaborator: a
/// minimal stub that reports only the built-in synthetic sources.
pub fn list_camera_ids() -> Vec<&'static str> {
    vec!["dummy-gradient", "dummy-noise", "dummy-bounce"]
}
