use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::operator::{interpret_line, OperatorInput};
use crate::session::{PersistFuture, StationController};

use super::source::FrameSource;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

type SharedSource = Arc<Mutex<Box<dyn FrameSource>>>;

/// Drive the station until cancelled or told to quit.
///
/// Everything that touches session state runs on this one task: ticks,
/// operator lines and save completions are serialized through `select!`.
/// A late capture simply delays the next tick. The source is released only
/// after the last tick has finished.
pub async fn station_loop(
    mut controller: StationController,
    source: Box<dyn FrameSource>,
    mut operator_lines: mpsc::Receiver<String>,
    cancel_token: CancellationToken,
    tick_interval: Duration,
) -> Result<()> {
    let source: SharedSource = Arc::new(Mutex::new(source));
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut persisting: Option<PersistFuture> = None;
    let mut operator_open = true;

    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                log_info!("station loop shutting down");
                break;
            }

            result = async {
                match persisting.as_mut() {
                    Some(pending) => pending.await,
                    None => std::future::pending().await,
                }
            }, if persisting.is_some() => {
                persisting = None;
                controller.finish_persistence(result);
            }

            line = operator_lines.recv(), if operator_open => {
                let Some(line) = line else {
                    log_warn!("operator input closed; station keeps running");
                    operator_open = false;
                    continue;
                };
                match interpret_line(controller.phase(), &line) {
                    Some(OperatorInput::Quit) => {
                        log_info!("operator requested shutdown");
                        cancel_token.cancel();
                    }
                    Some(input) => match controller.handle_input(input) {
                        Ok(Some(pending)) => persisting = Some(pending),
                        Ok(None) => {}
                        Err(err) => log_warn!("operator input rejected: {err:#}"),
                    },
                    None => log_debug!(
                        "ignoring operator line {:?} during {}",
                        line,
                        controller.phase().as_str()
                    ),
                }
            }

            _ = ticker.tick() => {
                if !controller.wants_frame() {
                    continue;
                }
                let frame = match capture_frame(&source).await {
                    Ok(Some(frame)) => Some(frame),
                    Ok(None) => {
                        log_warn!("camera returned no frame; skipping tick");
                        None
                    }
                    Err(err) => {
                        log_error!("frame capture failed: {err:#}; skipping tick");
                        None
                    }
                };
                controller.tick_with_frame(frame.as_ref());
            }
        }
    }

    if let Some(pending) = persisting.take() {
        log_info!("waiting for in-flight save before exit");
        controller.finish_persistence(pending.await);
    }
    controller.shutdown();

    match source.lock() {
        Ok(mut guard) => guard.release(),
        Err(poisoned) => poisoned.into_inner().release(),
    }
    log_info!("camera released");
    Ok(())
}

async fn capture_frame(source: &SharedSource) -> Result<Option<RgbImage>> {
    let source = Arc::clone(source);
    tokio::task::spawn_blocking(move || {
        let mut guard = source
            .lock()
            .map_err(|_| anyhow!("frame source lock poisoned"))?;
        guard.capture()
    })
    .await
    .context("capture worker join failed")?
}
