//! Delegated trail presenter
//!
//! The orchestrating state machine of the subsystem. Two execution contexts
//! touch a presenter and must never block each other:
//!
//! - the application turn calls [`TrailPresenter::set_last_rendered_point`]
//!   to acknowledge the last point its own renderer produced
//! - the compositor tick calls [`TrailPresenter::render_pass`] to obtain the
//!   provisional trail segments for this frame
//!
//! # State machine
//!
//! ```text
//!          set_last_rendered_point          dispose / teardown
//!   Idle ─────────────────────────▶ Tracking ─────────────────▶ Disposed
//!    │                               ▲    │                        ▲
//!    │                               └────┘                        │
//!    │                         anchor updates /                    │
//!    └──────────────────────── sample batches ─────────────────────┘
//! ```
//!
//! # Reconciliation
//!
//! Each rendering pass emits only samples newer than the watermark and
//! advances it, so a span is painted by the delegated path exactly once.
//! When the application acknowledges a point with input sequence `W`, the
//! next pass carries `retire_through = W`: the host must clear delegated
//! segments up to `W` in the same compositing tick it presents the
//! application's authoritative frame. One signal, one tick - the span is
//! never shown twice and never missing.

use crate::config::PresenterConfig;
use crate::estimator;
use crate::event::{sample_channel, PointerEvent, RawSample, SampleSink};
use crate::platform::{PlatformCapabilities, SurfaceLease};
use crate::region::{Point, PresentationRegion, RegionHandle};
use crate::style::{StyleError, TrailStyle};
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};
use uuid::Uuid;

/// Anchor update errors
///
/// None of these are fatal to the presenter: a failed update leaves every
/// piece of presenter state unchanged and delegated rendering simply does
/// not advance.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpdateError {
    /// The event was synthetic rather than platform-originated
    #[error("Untrusted input event rejected")]
    UntrustedInput,

    /// The style failed validation
    #[error("Invalid trail style: {0}")]
    InvalidStyle(#[from] StyleError),

    /// The presenter has been disposed
    #[error("Presenter is disposed")]
    Disposed,
}

/// Presenter lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailState {
    /// No anchor set yet; nothing to render
    Idle,
    /// Anchor set; rendering passes may emit trail segments
    Tracking,
    /// Terminal; all resources released, passes are no-ops
    Disposed,
}

/// The last point the application itself rendered
///
/// Exactly one current anchor exists per tracking presenter; updates replace
/// it atomically and superseded anchors are discarded, never queued.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorPoint {
    /// Position in region-local coordinates
    pub position: Point,
    /// Monotonic timestamp of the source input event
    pub source_timestamp: Duration,
    /// Style in effect when the application rendered this point
    pub style: TrailStyle,
    /// Presenter-assigned sequence id, strictly increasing per presenter
    pub sequence_id: u64,
    /// Input pipeline sequence id this anchor corresponds to; raw samples
    /// at or below this watermark are superseded
    pub input_watermark: u64,
}

/// One clipped trail segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailSegment {
    /// Segment start, clipped to the presentation region
    pub start: Point,
    /// Segment end, clipped to the presentation region
    pub end: Point,
    /// Input sequence id of the sample that produced the endpoint
    pub sequence_id: u64,
}

/// Output of one rendering pass
///
/// The host applies `retire_through` and `segments` atomically within the
/// tick: retirement first (clearing delegated content the application's
/// frame now covers), then the new segments. Applying them across tick
/// boundaries breaks the no-double-paint guarantee.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailFrame {
    /// Compositor tick this frame belongs to
    pub tick: u64,
    /// Presenter state observed by the pass
    pub state: TrailState,
    /// Clear delegated segments with sequence id at or below this value
    pub retire_through: Option<u64>,
    /// Style for every segment in this frame (the anchor's style)
    pub style: Option<TrailStyle>,
    /// New segments to paint, in increasing sequence order
    pub segments: Vec<TrailSegment>,
}

impl TrailFrame {
    fn inert(tick: u64, state: TrailState) -> Self {
        Self {
            tick,
            state,
            retire_through: None,
            style: None,
            segments: Vec::new(),
        }
    }

    /// Whether this frame changes anything on the delegated surface
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.retire_through.is_none()
    }
}

/// Counters for monitoring presenter behavior
#[derive(Debug, Clone, Default)]
pub struct TrailStats {
    /// Rendering passes executed
    pub passes: u64,
    /// Segments emitted across all passes
    pub segments_emitted: u64,
    /// Samples dropped because they were at or below the watermark
    pub samples_dropped_stale: u64,
    /// Samples dropped while idle or disposed
    pub samples_dropped_inactive: u64,
    /// Anchor updates accepted
    pub updates_accepted: u64,
    /// Anchor updates rejected (untrusted or invalid style)
    pub updates_rejected: u64,
}

struct Inner {
    state: TrailState,
    anchor: Option<AnchorPoint>,
    /// Next anchor sequence id; assignment here is what makes anchor
    /// sequence ids strictly increasing in presenter-observed order
    next_sequence: u64,
    /// Highest input sequence id already incorporated into a pass
    watermark: u64,
    /// Where the delegated polyline left off; `None` until a pass paints
    /// beyond the current anchor
    last_painted: Option<Point>,
    /// Highest retirement watermark already signalled to the host
    last_retired: u64,
    region: Arc<PresentationRegion>,
    caps: PlatformCapabilities,
    improvement: Duration,
    stats: TrailStats,
}

struct Shared {
    id: Uuid,
    inner: Mutex<Inner>,
    rx: Receiver<RawSample>,
    sink: SampleSink,
    lease: Mutex<Option<SurfaceLease>>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        trace!("Trail presenter {} dropped", self.id);
    }
}

/// Delegated trail presenter handle
///
/// Cheap to clone; all clones refer to the same presenter. The registry
/// keeps one clone per active slot for its replace-on-request policy.
#[derive(Clone)]
pub struct TrailPresenter {
    shared: Arc<Shared>,
}

impl TrailPresenter {
    /// Build a presenter over a resolved region and capability snapshot
    ///
    /// Called by the registry after capability negotiation succeeds; the
    /// surface lease is released when the presenter is disposed or dropped.
    pub(crate) fn new(
        region: PresentationRegion,
        caps: PlatformCapabilities,
        lease: SurfaceLease,
        config: &PresenterConfig,
    ) -> Self {
        let (sink, rx) = sample_channel(config.sample_capacity);
        let region = Arc::new(region);
        let improvement = estimator::estimate(&caps, &region);
        let id = Uuid::new_v4();
        debug!(
            "Trail presenter {} created (expected improvement {:?})",
            id, improvement
        );
        Self {
            shared: Arc::new(Shared {
                id,
                inner: Mutex::new(Inner {
                    state: TrailState::Idle,
                    anchor: None,
                    next_sequence: 0,
                    watermark: 0,
                    last_painted: None,
                    last_retired: 0,
                    region,
                    caps,
                    improvement,
                    stats: TrailStats::default(),
                }),
                rx,
                sink,
                lease: Mutex::new(Some(lease)),
            }),
        }
    }

    /// Presenter identity
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> TrailState {
        self.shared.inner.lock().state
    }

    /// Push side of the raw sample stream, for the input pipeline
    pub fn sample_sink(&self) -> SampleSink {
        self.shared.sink.clone()
    }

    /// Expected latency improvement of the delegated path
    ///
    /// Cached; recomputed only when the capability snapshot or the
    /// presentation area changes.
    pub fn expected_improvement(&self) -> Duration {
        self.shared.inner.lock().improvement
    }

    /// The region delegated rendering is clipped to
    pub fn presentation_area(&self) -> Arc<PresentationRegion> {
        self.shared.inner.lock().region.clone()
    }

    /// Replace the presentation area
    ///
    /// Re-resolves the region against the current viewport and installs the
    /// new snapshot; the improvement estimate is recomputed. In-flight
    /// passes finish against the snapshot they already read.
    pub fn set_presentation_area(&self, handle: Option<&RegionHandle>) {
        let mut inner = self.shared.inner.lock();
        if inner.state == TrailState::Disposed {
            return;
        }
        let region = Arc::new(PresentationRegion::resolve(handle, inner.caps.viewport));
        inner.improvement = estimator::estimate(&inner.caps, &region);
        inner.region = region;
        debug!("Presenter {}: presentation area replaced", self.shared.id);
    }

    /// Install a new capability snapshot (display or adapter change)
    pub fn update_capabilities(&self, caps: PlatformCapabilities) {
        let mut inner = self.shared.inner.lock();
        if inner.state == TrailState::Disposed {
            return;
        }
        inner.improvement = estimator::estimate(&caps, &inner.region);
        inner.caps = caps;
    }

    /// Acknowledge the last point the application's own renderer produced
    ///
    /// Atomically replaces the current anchor with one derived from `event`
    /// and `style`; a rendering pass concurrently reading the anchor sees
    /// the old or the new one whole, never a mix. The first accepted update
    /// moves the presenter from `Idle` to `Tracking`.
    ///
    /// Synthetic events fail with [`UpdateError::UntrustedInput`] and styles
    /// with a non-finite or non-positive diameter fail with
    /// [`UpdateError::InvalidStyle`]; both leave state untouched. Re-sending
    /// the already-acknowledged event is harmless: the anchor sequence id
    /// still advances, but the input watermark never regresses, so no span
    /// is rendered twice downstream. An event older than the current
    /// anchor's watermark is a bookkeeping-only no-op; the anchor's
    /// position and style are never rolled back to a superseded point.
    ///
    /// No rendering happens inside this call; it is cheap enough to invoke
    /// for every application-rendered point.
    pub fn set_last_rendered_point(
        &self,
        event: &PointerEvent,
        style: &TrailStyle,
    ) -> Result<(), UpdateError> {
        let mut inner = self.shared.inner.lock();
        if inner.state == TrailState::Disposed {
            return Err(UpdateError::Disposed);
        }
        if !event.trust.is_trusted() {
            inner.stats.updates_rejected += 1;
            trace!(
                "Presenter {}: untrusted event {} rejected",
                self.shared.id,
                event.sequence_id
            );
            return Err(UpdateError::UntrustedInput);
        }
        if let Err(e) = style.validate() {
            inner.stats.updates_rejected += 1;
            return Err(UpdateError::InvalidStyle(e));
        }

        let floor = inner
            .anchor
            .as_ref()
            .map(|a| a.input_watermark)
            .unwrap_or(0);
        // An acknowledgement older than the current anchor is superseded,
        // not merged: moving the anchor back would restart the polyline
        // over ground the application has already painted past.
        if inner.anchor.is_some() && event.sequence_id < floor {
            inner.next_sequence += 1;
            let seq = inner.next_sequence;
            if let Some(anchor) = inner.anchor.as_mut() {
                anchor.sequence_id = seq;
            }
            inner.stats.updates_accepted += 1;
            trace!(
                "Presenter {}: stale acknowledgement {} ignored (watermark {})",
                self.shared.id,
                event.sequence_id,
                floor
            );
            return Ok(());
        }

        inner.next_sequence += 1;
        let anchor = AnchorPoint {
            position: event.position,
            source_timestamp: event.timestamp,
            style: *style,
            sequence_id: inner.next_sequence,
            input_watermark: event.sequence_id.max(floor),
        };

        if inner.state == TrailState::Idle {
            inner.state = TrailState::Tracking;
            debug!("Presenter {}: Idle -> Tracking", self.shared.id);
        }
        inner.anchor = Some(anchor);
        inner.stats.updates_accepted += 1;
        Ok(())
    }

    /// Run one rendering pass for compositor tick `tick`
    ///
    /// Drains the pending raw samples, drops those already at or below the
    /// watermark, and extends the connected polyline through the remaining
    /// samples in increasing sequence order, starting from where the
    /// previous pass left off (or the anchor, for a fresh trail),
    /// clipped to the presentation region and styled with the anchor's
    /// style. The watermark advances to the highest sequence id processed.
    ///
    /// Safe to call concurrently with disposal: a pass that observes
    /// `Disposed` drains and discards its samples and returns an inert
    /// frame.
    pub fn render_pass(&self, tick: u64) -> TrailFrame {
        // Drain outside the lock; the channel is the only sample storage
        // and nothing persists past this pass.
        let mut batch: Vec<RawSample> = self.shared.rx.try_iter().collect();

        let mut inner = self.shared.inner.lock();
        inner.stats.passes += 1;

        let anchor = match (inner.state, inner.anchor.clone()) {
            (TrailState::Tracking, Some(anchor)) => anchor,
            (state, _) => {
                inner.stats.samples_dropped_inactive += batch.len() as u64;
                return TrailFrame::inert(tick, state);
            }
        };

        // Samples the application has caught up to are superseded, and so
        // is any delegated trail they produced: the polyline restarts from
        // the new anchor.
        if anchor.input_watermark > inner.watermark {
            inner.watermark = anchor.input_watermark;
            inner.last_painted = None;
        }

        // Signal retirement once per anchor advance, in the same tick the
        // authoritative content lands.
        let retire_through = if anchor.input_watermark > inner.last_retired {
            inner.last_retired = anchor.input_watermark;
            Some(anchor.input_watermark)
        } else {
            None
        };

        // The pipeline delivers in order per pointer, but batches from a
        // re-entrant push can interleave. Restore order, then dedup.
        batch.sort_unstable_by_key(|s| s.sequence_id);
        batch.dedup_by_key(|s| s.sequence_id);

        let mut segments = Vec::new();
        // Continue the polyline where the previous pass left off; only a
        // fresh anchor (handled above) resets it to the anchor position.
        let mut cursor = inner.last_painted.unwrap_or(anchor.position);
        let mut highest = inner.watermark;
        let mut stale = 0u64;

        for sample in &batch {
            if sample.sequence_id <= inner.watermark {
                stale += 1;
                continue;
            }
            if let Some((start, end)) = inner.region.clip_segment(cursor, sample.position) {
                segments.push(TrailSegment {
                    start,
                    end,
                    sequence_id: sample.sequence_id,
                });
            }
            // A fully clipped sample still extends the polyline and still
            // counts as processed.
            cursor = sample.position;
            highest = sample.sequence_id;
        }

        if highest > inner.watermark {
            inner.last_painted = Some(cursor);
        }
        inner.watermark = highest;
        inner.stats.samples_dropped_stale += stale;
        inner.stats.segments_emitted += segments.len() as u64;

        trace!(
            "Presenter {}: pass tick={} segments={} watermark={} retire={:?}",
            self.shared.id,
            tick,
            segments.len(),
            highest,
            retire_through
        );

        TrailFrame {
            tick,
            state: TrailState::Tracking,
            retire_through,
            style: Some(anchor.style),
            segments,
        }
    }

    /// Dispose the presenter, releasing the delegated surface
    ///
    /// Idempotent, and safe to race with a scheduled rendering pass: the
    /// pass observes `Disposed` and becomes a no-op.
    pub fn dispose(&self) {
        {
            let mut inner = self.shared.inner.lock();
            if inner.state == TrailState::Disposed {
                return;
            }
            inner.state = TrailState::Disposed;
            inner.anchor = None;
        }
        // Drop any backlog so the channel holds nothing after disposal.
        while self.shared.rx.try_recv().is_ok() {}
        if let Some(lease) = self.shared.lease.lock().take() {
            drop(lease);
        }
        debug!("Presenter {} disposed", self.shared.id);
    }

    /// Current anchor, if any
    pub fn anchor(&self) -> Option<AnchorPoint> {
        self.shared.inner.lock().anchor.clone()
    }

    /// Monitoring counters
    pub fn stats(&self) -> TrailStats {
        self.shared.inner.lock().stats.clone()
    }
}

impl std::fmt::Debug for TrailPresenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrailPresenter")
            .field("id", &self.shared.id)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{PlatformProbe, StaticProbe};
    use crate::region::Rect;
    use crate::style::Color;

    fn viewport() -> Rect {
        Rect::new(0.0, 0.0, 1000.0, 1000.0)
    }

    fn make_presenter() -> (TrailPresenter, StaticProbe) {
        let probe = StaticProbe::cooperative(viewport());
        let region = PresentationRegion::resolve(None, viewport());
        let lease = probe.allocate_surface(&region).unwrap();
        let presenter = TrailPresenter::new(
            region,
            probe.capabilities(),
            lease,
            &PresenterConfig::default(),
        );
        (presenter, probe)
    }

    fn event(seq: u64, x: f64, y: f64) -> PointerEvent {
        PointerEvent::platform(Point::new(x, y), Duration::from_millis(seq), 1, seq)
    }

    fn sample(seq: u64, x: f64, y: f64) -> RawSample {
        RawSample::new(Point::new(x, y), Duration::from_millis(seq), seq)
    }

    fn style() -> TrailStyle {
        TrailStyle::new(Color::BLACK, 2.0, 1.0).unwrap()
    }

    #[test]
    fn test_starts_idle() {
        let (presenter, _probe) = make_presenter();
        assert_eq!(presenter.state(), TrailState::Idle);
        assert!(presenter.anchor().is_none());
    }

    #[test]
    fn test_first_update_transitions_to_tracking() {
        let (presenter, _probe) = make_presenter();
        presenter
            .set_last_rendered_point(&event(5, 10.0, 10.0), &style())
            .unwrap();
        assert_eq!(presenter.state(), TrailState::Tracking);

        let anchor = presenter.anchor().unwrap();
        assert_eq!(anchor.position, Point::new(10.0, 10.0));
        assert_eq!(anchor.input_watermark, 5);
        assert_eq!(anchor.sequence_id, 1);
    }

    #[test]
    fn test_anchor_sequence_strictly_increases() {
        let (presenter, _probe) = make_presenter();
        let mut last = 0;
        for seq in 1..=10 {
            presenter
                .set_last_rendered_point(&event(seq, seq as f64, 0.0), &style())
                .unwrap();
            let anchor = presenter.anchor().unwrap();
            assert!(anchor.sequence_id > last);
            last = anchor.sequence_id;
        }
    }

    #[test]
    fn test_untrusted_event_leaves_state_unchanged() {
        let (presenter, _probe) = make_presenter();
        let synthetic = PointerEvent::synthetic(Point::new(1.0, 1.0), Duration::ZERO, 1, 1);

        let result = presenter.set_last_rendered_point(&synthetic, &style());
        assert_eq!(result, Err(UpdateError::UntrustedInput));
        assert_eq!(presenter.state(), TrailState::Idle);
        assert!(presenter.anchor().is_none());
        assert_eq!(presenter.stats().updates_rejected, 1);
    }

    #[test]
    fn test_invalid_style_rejected() {
        let (presenter, _probe) = make_presenter();
        let bad = TrailStyle {
            color: Color::BLACK,
            diameter: -1.0,
            opacity: 1.0,
        };
        let result = presenter.set_last_rendered_point(&event(1, 0.0, 0.0), &bad);
        assert!(matches!(result, Err(UpdateError::InvalidStyle(_))));
        assert_eq!(presenter.state(), TrailState::Idle);

        let zero = TrailStyle {
            color: Color::BLACK,
            diameter: 0.0,
            opacity: 1.0,
        };
        assert!(presenter
            .set_last_rendered_point(&event(1, 0.0, 0.0), &zero)
            .is_err());

        let ok = TrailStyle::new(Color::BLACK, 3.5, 1.0).unwrap();
        assert!(presenter
            .set_last_rendered_point(&event(1, 0.0, 0.0), &ok)
            .is_ok());
    }

    #[test]
    fn test_idempotent_update_content() {
        let (presenter, _probe) = make_presenter();
        let e = event(7, 42.0, 24.0);
        presenter.set_last_rendered_point(&e, &style()).unwrap();
        let first = presenter.anchor().unwrap();

        presenter.set_last_rendered_point(&e, &style()).unwrap();
        let second = presenter.anchor().unwrap();

        assert_eq!(first.position, second.position);
        assert_eq!(first.style, second.style);
        assert_eq!(first.input_watermark, second.input_watermark);
        assert!(second.sequence_id > first.sequence_id);
    }

    #[test]
    fn test_render_pass_idle_is_inert_and_drops_samples() {
        let (presenter, _probe) = make_presenter();
        let sink = presenter.sample_sink();
        sink.push(sample(1, 5.0, 5.0));

        let frame = presenter.render_pass(1);
        assert_eq!(frame.state, TrailState::Idle);
        assert!(frame.is_empty());
        assert_eq!(presenter.stats().samples_dropped_inactive, 1);
    }

    #[test]
    fn test_render_pass_emits_polyline_in_order() {
        let (presenter, _probe) = make_presenter();
        presenter
            .set_last_rendered_point(&event(2, 10.0, 10.0), &style())
            .unwrap();

        let sink = presenter.sample_sink();
        // Deliberately out of order; the pass restores sequence order.
        sink.push(sample(4, 30.0, 30.0));
        sink.push(sample(3, 20.0, 20.0));
        sink.push(sample(5, 40.0, 40.0));

        let frame = presenter.render_pass(1);
        assert_eq!(frame.segments.len(), 3);
        assert_eq!(frame.segments[0].start, Point::new(10.0, 10.0));
        assert_eq!(frame.segments[0].end, Point::new(20.0, 20.0));
        assert_eq!(frame.segments[1].end, Point::new(30.0, 30.0));
        assert_eq!(frame.segments[2].end, Point::new(40.0, 40.0));
        let seqs: Vec<u64> = frame.segments.iter().map(|s| s.sequence_id).collect();
        assert_eq!(seqs, vec![3, 4, 5]);
        assert_eq!(frame.style, Some(style()));
    }

    #[test]
    fn test_watermark_filters_superseded_samples() {
        let (presenter, _probe) = make_presenter();
        presenter
            .set_last_rendered_point(&event(3, 10.0, 10.0), &style())
            .unwrap();

        let sink = presenter.sample_sink();
        sink.push(sample(2, 1.0, 1.0)); // at/below watermark 3
        sink.push(sample(3, 2.0, 2.0));
        sink.push(sample(4, 20.0, 20.0));

        let frame = presenter.render_pass(1);
        assert_eq!(frame.segments.len(), 1);
        assert_eq!(frame.segments[0].sequence_id, 4);
        assert_eq!(presenter.stats().samples_dropped_stale, 2);
    }

    #[test]
    fn test_watermark_advances_across_passes() {
        let (presenter, _probe) = make_presenter();
        presenter
            .set_last_rendered_point(&event(1, 0.0, 0.0), &style())
            .unwrap();
        let sink = presenter.sample_sink();

        sink.push(sample(2, 10.0, 0.0));
        let frame = presenter.render_pass(1);
        assert_eq!(frame.segments.len(), 1);

        // Re-pushing an already-painted sample draws nothing.
        sink.push(sample(2, 10.0, 0.0));
        sink.push(sample(3, 20.0, 0.0));
        let frame = presenter.render_pass(2);
        assert_eq!(frame.segments.len(), 1);
        assert_eq!(frame.segments[0].sequence_id, 3);
        // Polyline continues from the last painted sample.
        assert_eq!(frame.segments[0].start, Point::new(10.0, 0.0));
    }

    #[test]
    fn test_polyline_continues_across_passes_from_same_anchor() {
        let (presenter, _probe) = make_presenter();
        presenter
            .set_last_rendered_point(&event(1, 0.0, 0.0), &style())
            .unwrap();
        let sink = presenter.sample_sink();

        sink.push(sample(2, 10.0, 0.0));
        let frame = presenter.render_pass(1);
        assert_eq!(frame.segments.len(), 1);
        assert_eq!(frame.segments[0].end, Point::new(10.0, 0.0));

        // An empty pass in between must not lose the paint position.
        let frame = presenter.render_pass(2);
        assert!(frame.segments.is_empty());

        // The next pass extends from the last painted sample, not the
        // anchor; restarting at the anchor would re-cover the span painted
        // at tick 1.
        sink.push(sample(3, 20.0, 0.0));
        let frame = presenter.render_pass(3);
        assert_eq!(frame.segments.len(), 1);
        assert_eq!(frame.segments[0].start, Point::new(10.0, 0.0));
        assert_eq!(frame.segments[0].end, Point::new(20.0, 0.0));

        // A fresh anchor beyond the painted watermark restarts the
        // polyline from its own position.
        presenter
            .set_last_rendered_point(&event(4, 25.0, 5.0), &style())
            .unwrap();
        sink.push(sample(5, 30.0, 5.0));
        let frame = presenter.render_pass(4);
        assert_eq!(frame.segments.len(), 1);
        assert_eq!(frame.segments[0].start, Point::new(25.0, 5.0));
    }

    #[test]
    fn test_stale_acknowledgement_does_not_move_anchor() {
        let (presenter, _probe) = make_presenter();
        presenter
            .set_last_rendered_point(&event(7, 42.0, 24.0), &style())
            .unwrap();
        let before = presenter.anchor().unwrap();

        // Sequence 3 was superseded by the acknowledgement of 7; accepting
        // it bumps sequence bookkeeping but must not roll the anchor back
        // to the older point.
        presenter
            .set_last_rendered_point(&event(3, 1.0, 1.0), &style())
            .unwrap();
        let after = presenter.anchor().unwrap();
        assert_eq!(after.position, before.position);
        assert_eq!(after.style, before.style);
        assert_eq!(after.input_watermark, before.input_watermark);
        assert_eq!(after.source_timestamp, before.source_timestamp);
        assert!(after.sequence_id > before.sequence_id);

        // Rendering still starts from the retained anchor.
        let sink = presenter.sample_sink();
        sink.push(sample(8, 50.0, 24.0));
        let frame = presenter.render_pass(1);
        assert_eq!(frame.segments.len(), 1);
        assert_eq!(frame.segments[0].start, Point::new(42.0, 24.0));

        // A genuinely newer acknowledgement still advances as usual.
        presenter
            .set_last_rendered_point(&event(9, 60.0, 24.0), &style())
            .unwrap();
        let newest = presenter.anchor().unwrap();
        assert_eq!(newest.position, Point::new(60.0, 24.0));
        assert!(newest.sequence_id > before.sequence_id);
    }

    #[test]
    fn test_reconciliation_no_double_paint() {
        let (presenter, _probe) = make_presenter();
        presenter
            .set_last_rendered_point(&event(1, 0.0, 0.0), &style())
            .unwrap();
        let sink = presenter.sample_sink();

        // Delegated path runs ahead through sample 5.
        for seq in 2..=5 {
            sink.push(sample(seq, seq as f64 * 10.0, 0.0));
        }
        let frame = presenter.render_pass(1);
        assert_eq!(frame.segments.len(), 4);

        // Application catches up: authoritative paint through sample 5
        // arrives at tick 2.
        presenter
            .set_last_rendered_point(&event(5, 40.0, 0.0), &style())
            .unwrap();
        let frame = presenter.render_pass(2);

        // The covered span is retired this tick and no segment of it is
        // re-rendered at tick 2 or later.
        assert_eq!(frame.retire_through, Some(5));
        assert!(frame.segments.is_empty());

        let frame = presenter.render_pass(3);
        assert_eq!(frame.retire_through, None);
        assert!(frame.segments.is_empty());
    }

    #[test]
    fn test_retire_signalled_once_per_anchor_advance() {
        let (presenter, _probe) = make_presenter();
        presenter
            .set_last_rendered_point(&event(4, 0.0, 0.0), &style())
            .unwrap();

        let frame = presenter.render_pass(1);
        assert_eq!(frame.retire_through, Some(4));
        let frame = presenter.render_pass(2);
        assert_eq!(frame.retire_through, None);

        // Duplicate acknowledgement does not re-signal.
        presenter
            .set_last_rendered_point(&event(4, 0.0, 0.0), &style())
            .unwrap();
        let frame = presenter.render_pass(3);
        assert_eq!(frame.retire_through, None);
    }

    #[test]
    fn test_out_of_bounds_samples_are_clipped() {
        let (presenter, _probe) = make_presenter();
        presenter
            .set_last_rendered_point(&event(1, 990.0, 500.0), &style())
            .unwrap();
        let sink = presenter.sample_sink();

        // Leaves the 1000x1000 viewport.
        sink.push(sample(2, 1100.0, 500.0));
        // Entirely outside.
        sink.push(sample(3, 1200.0, 500.0));

        let frame = presenter.render_pass(1);
        assert_eq!(frame.segments.len(), 1);
        assert_eq!(frame.segments[0].end, Point::new(1000.0, 500.0));
        // Clipped-out samples still advance the watermark.
        sink.push(sample(3, 1200.0, 500.0));
        let frame = presenter.render_pass(2);
        assert!(frame.segments.is_empty());
    }

    #[test]
    fn test_dispose_races_with_pass_as_noop() {
        let (presenter, probe) = make_presenter();
        presenter
            .set_last_rendered_point(&event(1, 0.0, 0.0), &style())
            .unwrap();
        let sink = presenter.sample_sink();
        sink.push(sample(2, 10.0, 0.0));

        presenter.dispose();
        assert_eq!(presenter.state(), TrailState::Disposed);
        assert_eq!(probe.active_surfaces(), 0);

        // A pass scheduled before disposal executes as a no-op, no fault.
        let frame = presenter.render_pass(1);
        assert_eq!(frame.state, TrailState::Disposed);
        assert!(frame.is_empty());

        // Further updates report disposal.
        let result = presenter.set_last_rendered_point(&event(3, 0.0, 0.0), &style());
        assert_eq!(result, Err(UpdateError::Disposed));

        // Dispose is idempotent.
        presenter.dispose();
    }

    #[test]
    fn test_dispose_from_idle() {
        let (presenter, probe) = make_presenter();
        presenter.dispose();
        assert_eq!(presenter.state(), TrailState::Disposed);
        assert_eq!(probe.active_surfaces(), 0);
    }

    #[test]
    fn test_concurrent_updates_and_passes() {
        let (presenter, _probe) = make_presenter();
        presenter
            .set_last_rendered_point(&event(1, 0.0, 0.0), &style())
            .unwrap();

        let writer = presenter.clone();
        let sink = presenter.sample_sink();
        let handle = std::thread::spawn(move || {
            for seq in 2..200u64 {
                sink.push(sample(seq, seq as f64, 0.0));
                if seq % 10 == 0 {
                    writer
                        .set_last_rendered_point(&event(seq, seq as f64, 0.0), &style())
                        .unwrap();
                }
            }
        });

        // Passes observe whole anchors only; every frame must be ordered.
        for tick in 0..50 {
            let frame = presenter.render_pass(tick);
            let mut last = 0;
            for seg in &frame.segments {
                assert!(seg.sequence_id > last);
                last = seg.sequence_id;
            }
        }
        handle.join().unwrap();
    }

    #[test]
    fn test_set_presentation_area_reclips() {
        let (presenter, _probe) = make_presenter();
        let small = RegionHandle::rect(0.0, 0.0, 50.0, 50.0);
        presenter.set_presentation_area(Some(&small));
        assert_eq!(presenter.presentation_area().source, Some(small.id()));

        presenter
            .set_last_rendered_point(&event(1, 10.0, 10.0), &style())
            .unwrap();
        let sink = presenter.sample_sink();
        sink.push(sample(2, 100.0, 10.0));

        let frame = presenter.render_pass(1);
        assert_eq!(frame.segments.len(), 1);
        assert_eq!(frame.segments[0].end, Point::new(50.0, 10.0));
    }

    #[test]
    fn test_expected_improvement_updates_with_capabilities() {
        let (presenter, probe) = make_presenter();
        let before = presenter.expected_improvement();
        assert!(before > Duration::ZERO);

        let mut caps = probe.capabilities();
        caps.pipeline_depth *= 2;
        presenter.update_capabilities(caps);
        assert!(presenter.expected_improvement() > before);
    }
}
