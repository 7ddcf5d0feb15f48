//! Pipeline coordinator.
//!
//! Capture events arrive over a channel and are drained by a single worker
//! thread, so at most one link insertion is ever in flight. Within one event
//! the three sub-image preprocessing jobs run concurrently (they are pure
//! functions over disjoint crops) and are joined before normalization. When
//! the coordinator is torn down mid-run, in-flight OCR completes but its
//! result is discarded rather than pushed.

use anyhow::{anyhow, Context, Result};
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::extract::{extract, Frame};
use crate::graph::{Corpus, Link, LinkStore};
use crate::notify::{Cue, Notifier};
use crate::preprocess::{preprocess, TimerColor};
use crate::recognize::{match_location, parse_duration, TextRecognizer};

pub struct Coordinator {
    sender: Option<Sender<Frame>>,
    handle: Option<JoinHandle<()>>,
    abort: Arc<AtomicBool>,
}

impl Coordinator {
    /// Spawns the worker thread that turns capture events into graph links.
    pub fn spawn(
        store: Arc<LinkStore>,
        recognizer: Arc<dyn TextRecognizer>,
        notifier: Arc<dyn Notifier>,
        match_threshold: f64,
    ) -> Self {
        let (sender, receiver) = channel::<Frame>();
        let abort = Arc::new(AtomicBool::new(false));

        let worker_abort = Arc::clone(&abort);
        let handle = thread::spawn(move || {
            for frame in receiver {
                if worker_abort.load(Ordering::SeqCst) {
                    break;
                }

                let link = match process_frame(
                    &frame,
                    recognizer.as_ref(),
                    store.corpus(),
                    match_threshold,
                ) {
                    Ok(link) => link,
                    Err(e) => {
                        notifier.notify(&format!("{:#}", e), Cue::Error);
                        continue;
                    }
                };

                // Torn down while recognizing: discard, never commit a
                // partial result.
                if worker_abort.load(Ordering::SeqCst) {
                    log::debug!(
                        "Discarding in-flight link {} > {}",
                        link.source,
                        link.target
                    );
                    break;
                }

                // The store reports duplicate/expired outcomes itself.
                if let Err(e) = store.push(link, true) {
                    log::debug!("Link rejected: {}", e);
                }
            }
        });

        Self {
            sender: Some(sender),
            handle: Some(handle),
            abort,
        }
    }

    /// Queues one capture event. Input boundary for the external capture
    /// collaborator.
    pub fn on_capture(&self, frame: Frame) -> Result<()> {
        self.sender
            .as_ref()
            .context("coordinator already shut down")?
            .send(frame)
            .map_err(|_| anyhow!("capture worker is gone"))
    }

    /// Drains queued events, then stops the worker.
    pub fn finish(mut self) {
        self.shutdown(false);
    }

    /// Stops immediately; queued and in-flight results are discarded.
    pub fn teardown(mut self) {
        self.shutdown(true);
    }

    fn shutdown(&mut self, abort: bool) {
        if abort {
            self.abort.store(true, Ordering::SeqCst);
        }
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.shutdown(true);
    }
}

/// Runs one frame through the full pipeline: region extraction, concurrent
/// preprocessing, recognition, and normalization into a discovered link.
pub fn process_frame(
    frame: &Frame,
    recognizer: &dyn TextRecognizer,
    corpus: &Corpus,
    match_threshold: f64,
) -> Result<Link> {
    let regions = extract(frame)?;

    let (zone_name, portal_name, portal_time) = thread::scope(|scope| {
        let zone = scope.spawn(|| preprocess(&regions.zone_name, false));
        let portal = scope.spawn(|| preprocess(&regions.portal_name, false));
        let timer = scope.spawn(|| preprocess(&regions.portal_time, true));
        (zone.join(), portal.join(), timer.join())
    });
    let zone_name = zone_name.map_err(|_| anyhow!("zone-name preprocessing panicked"))?;
    let portal_name = portal_name.map_err(|_| anyhow!("portal-name preprocessing panicked"))?;
    let portal_time = portal_time.map_err(|_| anyhow!("portal-time preprocessing panicked"))?;

    let source_text = recognizer
        .recognize(&zone_name.image, false)
        .context("zone-name recognition failed")?;
    let target_text = recognizer
        .recognize(&portal_name.image, false)
        .context("portal-name recognition failed")?;
    let time_text = recognizer
        .recognize(&portal_time.image, true)
        .context("portal-time recognition failed")?;

    let source = match_location(corpus, &source_text, match_threshold)?;
    let target = match_location(corpus, &target_text, match_threshold)?;
    let color = portal_time.timer_color.unwrap_or(TimerColor::Other);
    let remaining_ms = parse_duration(&time_text, color)?;

    Ok(Link::discovered(
        source,
        target,
        Utc::now() + Duration::milliseconds(remaining_ms),
    ))
}
