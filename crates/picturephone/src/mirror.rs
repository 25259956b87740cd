//! Mirror Loop: local camera only, no networking.

use std::time::Duration;

use picturephone_capture::CaptureHandle;
use picturephone_ramp::DensityRamp;
use picturephone_term::Presenter;
use tokio::sync::mpsc;

use crate::redraw;
use crate::status::StatusMessage;

const CTRL_C: u8 = 3;
const TICK: Duration = Duration::from_millis(33);

pub async fn run(
    mut presenter: Presenter,
    capture: CaptureHandle,
    ramp: DensityRamp,
    mut stdin_rx: mpsc::Receiver<u8>,
) -> anyhow::Result<()> {
    let mut status = StatusMessage::new("Mirror mode. Press Ctrl-C to exit.");
    let mut interval = tokio::time::interval(TICK);

    loop {
        tokio::select! {
            byte = stdin_rx.recv() => {
                match byte {
                    Some(CTRL_C) | None => break,
                    Some(_) => {}
                }
            }
            _ = interval.tick() => {
                presenter.refresh_if_resized().ok();
                let cols = presenter.screen_cols();
                let rows = presenter.screen_rows();
                if cols == 0 || rows == 0 {
                    continue;
                }
                if let Some(frame) = capture.latest_frame() {
                    let buf = redraw::compose_mirror(&ramp, &frame, cols, rows, &status);
                    if let Err(e) = presenter.write_batch(&buf) {
                        tracing::warn!("write to terminal failed: {e}");
                    }
                } else {
                    status.set("Waiting for camera...");
                }
            }
        }
    }

    tracing::info!("mirror loop exiting");
    Ok(())
}
