//! Host platform capability probing
//!
//! Delegated trail presentation only works when the host compositor
//! cooperates: it must expose a drawing surface the system can paint into
//! ahead of the application's frame, and it must guarantee paint ordering at
//! frame boundaries. This module captures that negotiation:
//!
//! - [`PlatformCapabilities`] - a frozen snapshot of what the host offers,
//!   re-probed only on display/adapter change, never per frame
//! - [`PlatformProbe`] - the async collaborator interface the registry
//!   queries while resolving a presenter request
//! - [`SurfaceLease`] - RAII registration of the delegated drawing surface;
//!   dropping the lease (including dropping an unresolved request future)
//!   releases the surface

use crate::region::{PresentationRegion, Rect};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tracing::{info, trace};
use uuid::Uuid;

/// Overlay plane support reported by the compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlaySupport {
    /// Dedicated hardware overlay plane; trail segments skip composition
    Hardware,
    /// Compositor paints the trail into the composited frame
    Composited,
    /// No mechanism to paint ahead of the application frame
    Unavailable,
}

impl fmt::Display for OverlaySupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardware => write!(f, "hardware overlay"),
            Self::Composited => write!(f, "composited"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Snapshot of host capability signals
///
/// Deterministic inputs for the improvement estimate: for a fixed snapshot
/// the estimate never changes, so it is computed once at presenter
/// construction and again only when the snapshot is replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformCapabilities {
    /// Overlay plane support
    pub overlay: OverlaySupport,
    /// Compositor pipeline depth in frames (capture -> glass)
    pub pipeline_depth: u32,
    /// Current refresh interval (e.g. ~16.6ms at 60Hz)
    pub refresh_interval: Duration,
    /// Whether the compositor implements the delegated ink protocol at all
    pub supports_delegated_ink: bool,
    /// Full viewport bounds in the shared coordinate space
    pub viewport: Rect,
}

impl PlatformCapabilities {
    /// Whether a presenter request can be satisfied on this host
    pub fn can_delegate(&self) -> bool {
        self.supports_delegated_ink && self.overlay != OverlaySupport::Unavailable
    }

    /// Log a summary of the probed capabilities
    pub fn log_summary(&self) {
        info!("Delegated ink capabilities:");
        info!("  Overlay: {}", self.overlay);
        info!("  Pipeline depth: {} frames", self.pipeline_depth);
        info!("  Refresh interval: {:?}", self.refresh_interval);
        info!("  Delegation supported: {}", self.supports_delegated_ink);
    }
}

/// Collaborator interface to the host compositor
///
/// Probing may require round-trips to the display server, so it is async;
/// the registry awaits it while resolving `request_presenter`. Surface
/// allocation happens after a successful probe and is synchronous.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlatformProbe: Send + Sync {
    /// Query the host for its current capability snapshot
    async fn probe(&self) -> anyhow::Result<PlatformCapabilities>;

    /// Register a delegated drawing surface scoped to `region`
    fn allocate_surface(&self, region: &PresentationRegion) -> anyhow::Result<SurfaceLease>;
}

/// RAII handle over a registered delegated drawing surface
///
/// Releasing is tied to drop so that cancelling an in-flight presenter
/// request (by discarding its future) releases any partially-allocated
/// surface without a separate cleanup path.
pub struct SurfaceLease {
    id: Uuid,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl SurfaceLease {
    /// Create a lease with no release hook
    pub fn new(id: Uuid) -> Self {
        Self { id, release: None }
    }

    /// Create a lease that runs `release` exactly once on drop
    pub fn with_release(id: Uuid, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id,
            release: Some(Box::new(release)),
        }
    }

    /// Surface identity
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl fmt::Debug for SurfaceLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceLease").field("id", &self.id).finish()
    }
}

impl Drop for SurfaceLease {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
        trace!("Surface lease {} released", self.id);
    }
}

/// Probe backed by a fixed capability snapshot
///
/// Used by embedders whose host capabilities are known up front, and by
/// tests. Tracks how many surfaces are currently leased so that release
/// behavior is observable.
#[derive(Debug, Clone)]
pub struct StaticProbe {
    caps: PlatformCapabilities,
    active_surfaces: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

impl StaticProbe {
    /// Create a probe that always reports `caps`
    pub fn new(caps: PlatformCapabilities) -> Self {
        Self {
            caps,
            active_surfaces: std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0)),
        }
    }

    /// A typical cooperative host: composited overlay, 2-frame pipeline, 60Hz
    pub fn cooperative(viewport: Rect) -> Self {
        Self::new(PlatformCapabilities {
            overlay: OverlaySupport::Composited,
            pipeline_depth: 2,
            refresh_interval: Duration::from_micros(16_667),
            supports_delegated_ink: true,
            viewport,
        })
    }

    /// A host with no delegation mechanism at all
    pub fn unavailable(viewport: Rect) -> Self {
        Self::new(PlatformCapabilities {
            overlay: OverlaySupport::Unavailable,
            pipeline_depth: 2,
            refresh_interval: Duration::from_micros(16_667),
            supports_delegated_ink: false,
            viewport,
        })
    }

    /// The fixed snapshot this probe reports
    pub fn capabilities(&self) -> PlatformCapabilities {
        self.caps.clone()
    }

    /// Number of surfaces currently leased through this probe
    pub fn active_surfaces(&self) -> usize {
        self.active_surfaces.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl PlatformProbe for StaticProbe {
    async fn probe(&self) -> anyhow::Result<PlatformCapabilities> {
        Ok(self.caps.clone())
    }

    fn allocate_surface(&self, region: &PresentationRegion) -> anyhow::Result<SurfaceLease> {
        let id = Uuid::new_v4();
        self.active_surfaces
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let counter = self.active_surfaces.clone();
        trace!("Allocated surface {} for region {:?}", id, region.source);
        Ok(SurfaceLease::with_release(id, move || {
            counter.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
        }))
    }
}
