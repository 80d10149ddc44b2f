//! Latency improvement estimation
//!
//! Reports how much earlier a stroke segment reaches the glass when drawn by
//! the delegated path instead of waiting for the application's pipeline. The
//! estimate is a pure function of the capability snapshot and the resolved
//! region: deterministic for fixed inputs, no hidden state, recomputed only
//! when the snapshot is replaced (display or adapter change), never per
//! frame.
//!
//! The model is the one latency actually saved: the application's rendered
//! point trails raw input by the compositor pipeline depth, so delegation
//! recovers `pipeline_depth x refresh_interval`. A hardware overlay plane
//! skips composition entirely and recovers one further interval.

use crate::platform::{OverlaySupport, PlatformCapabilities};
use crate::region::PresentationRegion;
use std::time::Duration;
use tracing::debug;

/// Estimate the expected latency improvement of delegated presentation
///
/// Returns whole milliseconds, never negative. Zero when the host cannot
/// delegate at all or the region has no drawable area.
pub fn estimate(caps: &PlatformCapabilities, region: &PresentationRegion) -> Duration {
    if !caps.can_delegate() || region.area() <= 0.0 {
        return Duration::ZERO;
    }

    let mut improvement = caps.refresh_interval * caps.pipeline_depth;
    if caps.overlay == OverlaySupport::Hardware {
        improvement += caps.refresh_interval;
    }

    let millis = improvement.as_millis() as u64;
    debug!(
        "Improvement estimate: {}ms (depth={}, interval={:?}, overlay={})",
        millis, caps.pipeline_depth, caps.refresh_interval, caps.overlay
    );
    Duration::from_millis(millis)
}
