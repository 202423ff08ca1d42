use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::pipeline::attention_service::{AttentionService, TickOutcome};
use crate::pipeline::frame_broadcaster::FrameBroadcaster;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The frame source became unavailable.
    SourceEnded,
    /// [`ProducerHandle::stop`] was called.
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerReport {
    pub ticks: usize,
    pub frames: usize,
    pub dropped: usize,
    pub ended_by: EndReason,
}

/// Drives an [`AttentionService`] on a dedicated thread.
///
/// Layout: `producer [tick → publish] → broadcaster → N stream subscribers`
///
/// The loop keeps ticking whether or not anyone is subscribed so the status
/// stays current. On exit it releases the frame source once and closes the
/// broadcaster, which ends every open stream.
pub struct FrameProducer;

impl FrameProducer {
    pub fn spawn(
        service: AttentionService,
        broadcaster: Arc<FrameBroadcaster>,
    ) -> std::io::Result<ProducerHandle> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let handle = std::thread::Builder::new()
            .name("frame-producer".into())
            .spawn(move || run_loop(service, &broadcaster, &flag))?;
        Ok(ProducerHandle { cancelled, handle })
    }
}

fn run_loop(
    mut service: AttentionService,
    broadcaster: &FrameBroadcaster,
    cancelled: &AtomicBool,
) -> ProducerReport {
    let mut frames = 0;
    let mut dropped = 0;

    let ended_by = loop {
        if cancelled.load(Ordering::Relaxed) {
            break EndReason::Stopped;
        }
        match service.tick() {
            TickOutcome::Frame(out) => {
                broadcaster.publish(&out.frame);
                frames += 1;
            }
            TickOutcome::Dropped(_) => dropped += 1,
            TickOutcome::Ended => break EndReason::SourceEnded,
        }
    };

    service.release();
    broadcaster.close();
    service.summary();

    let report = ProducerReport {
        ticks: service.ticks(),
        frames,
        dropped,
        ended_by,
    };
    log::info!(
        "Producer stopped ({ended_by:?}) after {} ticks, {frames} frames published",
        report.ticks
    );
    report
}

pub struct ProducerHandle {
    cancelled: Arc<AtomicBool>,
    handle: JoinHandle<ProducerReport>,
}

impl ProducerHandle {
    /// Asks the loop to exit after the current tick. Does not wait.
    pub fn request_stop(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Requests a stop and waits for the loop to wind down.
    pub fn stop(self) -> Result<ProducerReport, Box<dyn std::error::Error>> {
        self.request_stop();
        self.join()
    }

    /// Waits for the loop to end on its own.
    pub fn join(self) -> Result<ProducerReport, Box<dyn std::error::Error>> {
        self.handle
            .join()
            .map_err(|_| "Producer thread panicked".into())
    }
}
