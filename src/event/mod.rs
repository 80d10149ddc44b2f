//! Input pipeline collaborator types
//!
//! The input pipeline is external to this crate: it captures pointer input,
//! assigns per-pointer monotonically increasing sequence numbers, and marks
//! events as platform-originated or synthetic. This module defines the two
//! shapes the presenter consumes from it:
//!
//! - [`PointerEvent`] - a delivered, trusted-or-not event the application
//!   passes back when acknowledging a rendered point
//! - [`RawSample`] - a not-yet-delivered raw position the pipeline pushes
//!   ahead of delivery so the delegated trail can run ahead of the app
//!
//! Raw samples travel over a bounded channel ([`sample_channel`]). The
//! presenter drains the channel once per rendering pass and never stores
//! samples across passes; a full channel drops the newest sample rather
//! than queuing unboundedly.

use crate::region::Point;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::time::Duration;
use tracing::trace;

/// Provenance of a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTrust {
    /// Generated by the platform input stack
    Platform,
    /// Created or replayed by script/automation
    Synthetic,
}

impl EventTrust {
    /// Whether the event may drive anchor updates
    pub fn is_trusted(&self) -> bool {
        matches!(self, EventTrust::Platform)
    }
}

/// A pointer event as delivered to the application
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Position in the presentation region's coordinate space
    pub position: Point,
    /// Monotonic capture timestamp
    pub timestamp: Duration,
    /// Pointer identity (pen, finger, mouse)
    pub pointer_id: u32,
    /// Per-pointer input pipeline sequence number
    pub sequence_id: u64,
    /// Platform-originated or synthetic
    pub trust: EventTrust,
}

impl PointerEvent {
    /// Create a platform-originated event
    pub fn platform(
        position: Point,
        timestamp: Duration,
        pointer_id: u32,
        sequence_id: u64,
    ) -> Self {
        Self {
            position,
            timestamp,
            pointer_id,
            sequence_id,
            trust: EventTrust::Platform,
        }
    }

    /// Create a synthetic event (rejected by anchor updates)
    pub fn synthetic(
        position: Point,
        timestamp: Duration,
        pointer_id: u32,
        sequence_id: u64,
    ) -> Self {
        Self {
            position,
            timestamp,
            pointer_id,
            sequence_id,
            trust: EventTrust::Synthetic,
        }
    }
}

/// A raw input sample not yet delivered to the application
///
/// Owned by the input pipeline; the presenter holds it only for the duration
/// of one rendering pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    /// Position in the presentation region's coordinate space
    pub position: Point,
    /// Monotonic capture timestamp
    pub timestamp: Duration,
    /// Per-pointer input pipeline sequence number
    pub sequence_id: u64,
}

impl RawSample {
    /// Create a raw sample
    pub fn new(position: Point, timestamp: Duration, sequence_id: u64) -> Self {
        Self {
            position,
            timestamp,
            sequence_id,
        }
    }
}

/// Push side of the raw sample stream, held by the input pipeline
#[derive(Debug, Clone)]
pub struct SampleSink {
    tx: Sender<RawSample>,
}

impl SampleSink {
    /// Push one sample toward the presenter
    ///
    /// Returns `false` when the sample was dropped because the channel is
    /// full or the presenter is gone. Dropping is the backpressure
    /// mechanism: the presenter must never accumulate unbounded backlog,
    /// and a sample missed here is rendered by the application's own path
    /// one frame later anyway.
    pub fn push(&self, sample: RawSample) -> bool {
        match self.tx.try_send(sample) {
            Ok(()) => true,
            Err(TrySendError::Full(s)) => {
                trace!("Raw sample {} dropped: channel full", s.sequence_id);
                false
            }
            Err(TrySendError::Disconnected(s)) => {
                trace!("Raw sample {} dropped: presenter gone", s.sequence_id);
                false
            }
        }
    }

    /// Push an ordered batch of samples
    ///
    /// Returns how many were accepted.
    pub fn push_batch<I: IntoIterator<Item = RawSample>>(&self, samples: I) -> usize {
        samples.into_iter().filter(|s| self.push(*s)).count()
    }
}

/// Create a bounded raw-sample channel
///
/// The receiver is drained by the presenter's rendering pass; the sender is
/// handed to the input pipeline as a [`SampleSink`].
pub fn sample_channel(capacity: usize) -> (SampleSink, Receiver<RawSample>) {
    let (tx, rx) = bounded(capacity);
    (SampleSink { tx }, rx)
}
