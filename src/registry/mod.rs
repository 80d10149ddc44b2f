//! Presenter registry
//!
//! Process-wide factory and lifecycle manager for delegated trail
//! presenters. Requests are asynchronous - resolution awaits the host
//! capability probe - and cancellable: dropping the future before it
//! resolves releases any partially-allocated drawing surface through its
//! RAII lease.
//!
//! # Slot policy
//!
//! At most one presenter is active per (kind, region) pair. The policy is
//! replace-on-request: a request for an occupied slot disposes the previous
//! presenter and installs the new one. The disposed presenter's pending
//! rendering passes become no-ops, so replacement degrades as gracefully as
//! any other disposal.

use crate::config::InkConfig;
use crate::platform::PlatformProbe;
use crate::presenter::{TrailPresenter, TrailState};
use crate::region::{PresentationRegion, RegionHandle};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Presenter request errors
///
/// All recoverable: the expected caller response is falling back to
/// application-only rendering, the non-delegated baseline.
#[derive(Error, Debug)]
pub enum RequestError {
    /// The requested presenter kind string is not known
    #[error("Unsupported presenter kind: {0}")]
    UnsupportedKind(String),

    /// The host has no backing mechanism for delegated presentation
    #[error("Delegated presentation capability unavailable")]
    CapabilityUnavailable,

    /// The capability probe itself failed
    #[error("Capability probe failed: {0}")]
    Probe(#[source] anyhow::Error),

    /// The capability probe did not answer in time
    #[error("Capability probe timed out")]
    ProbeTimeout,

    /// Drawing surface allocation failed
    #[error("Surface allocation failed: {0}")]
    Surface(#[source] anyhow::Error),
}

/// Known presenter kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresenterKind {
    /// Provisional ink trail between input capture and application render
    DelegatedInkTrail,
}

impl PresenterKind {
    /// The request string for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DelegatedInkTrail => "delegated-ink-trail",
        }
    }
}

impl FromStr for PresenterKind {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delegated-ink-trail" => Ok(Self::DelegatedInkTrail),
            other => Err(RequestError::UnsupportedKind(other.to_string())),
        }
    }
}

impl std::fmt::Display for PresenterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

type SlotKey = (PresenterKind, Option<Uuid>);

/// Process-wide presenter factory and lifecycle manager
pub struct PresenterRegistry {
    probe: Arc<dyn PlatformProbe>,
    config: InkConfig,
    slots: Mutex<HashMap<SlotKey, TrailPresenter>>,
}

impl PresenterRegistry {
    /// Create a registry over a platform probe
    pub fn new(probe: Arc<dyn PlatformProbe>, config: InkConfig) -> Self {
        Self {
            probe,
            config,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Request a presenter of `kind`, optionally scoped to a region
    ///
    /// Resolution awaits the host capability probe and so completes off the
    /// caller's turn; dropping the returned future cancels the request and
    /// releases any surface already allocated for it.
    ///
    /// Without a region handle the presenter is bound to the full viewport.
    /// An occupied (kind, region) slot is replaced: the previous presenter
    /// is disposed before the new one is returned.
    pub async fn request_presenter(
        &self,
        kind: &str,
        region: Option<RegionHandle>,
    ) -> Result<TrailPresenter, RequestError> {
        let kind: PresenterKind = kind.parse()?;

        let timeout = self.config.presenter.probe_timeout();
        let caps = match tokio::time::timeout(timeout, self.probe.probe()).await {
            Ok(Ok(caps)) => caps,
            Ok(Err(e)) => {
                warn!("Capability probe failed: {e:#}");
                return Err(RequestError::Probe(e));
            }
            Err(_) => {
                warn!("Capability probe exceeded {timeout:?}");
                return Err(RequestError::ProbeTimeout);
            }
        };

        if !caps.can_delegate() {
            debug!("Presenter request rejected: host cannot delegate");
            return Err(RequestError::CapabilityUnavailable);
        }

        let resolved = PresentationRegion::resolve(region.as_ref(), caps.viewport);
        let lease = self
            .probe
            .allocate_surface(&resolved)
            .map_err(RequestError::Surface)?;

        let presenter = TrailPresenter::new(resolved, caps, lease, &self.config.presenter);

        let key = (kind, region.as_ref().map(|h| h.id()));
        let mut slots = self.slots.lock();
        if let Some(previous) = slots.insert(key, presenter.clone()) {
            if previous.state() != TrailState::Disposed {
                info!(
                    "Replacing active {} presenter {} with {}",
                    kind,
                    previous.id(),
                    presenter.id()
                );
                previous.dispose();
            }
        }

        Ok(presenter)
    }

    /// Number of slots holding a non-disposed presenter
    pub fn active_count(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|p| p.state() != TrailState::Disposed)
            .count()
    }

    /// Dispose every presenter (region or document teardown)
    pub fn dispose_all(&self) {
        let mut slots = self.slots.lock();
        for (_, presenter) in slots.drain() {
            presenter.dispose();
        }
    }
}

impl std::fmt::Debug for PresenterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenterRegistry")
            .field("active", &self.active_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{MockPlatformProbe, StaticProbe};
    use crate::region::Rect;

    fn viewport() -> Rect {
        Rect::new(0.0, 0.0, 1920.0, 1080.0)
    }

    fn registry(probe: StaticProbe) -> PresenterRegistry {
        PresenterRegistry::new(Arc::new(probe), InkConfig::default())
    }

    #[tokio::test]
    async fn test_unsupported_kind_rejected() {
        let reg = registry(StaticProbe::cooperative(viewport()));
        let result = reg.request_presenter("speculative-scroll", None).await;
        assert!(matches!(result, Err(RequestError::UnsupportedKind(_))));
    }

    #[tokio::test]
    async fn test_capability_unavailable() {
        let reg = registry(StaticProbe::unavailable(viewport()));
        let result = reg.request_presenter("delegated-ink-trail", None).await;
        assert!(matches!(result, Err(RequestError::CapabilityUnavailable)));
        assert_eq!(reg.active_count(), 0);
    }

    #[tokio::test]
    async fn test_successful_request_is_queryable() {
        let reg = registry(StaticProbe::cooperative(viewport()));
        let presenter = reg
            .request_presenter("delegated-ink-trail", None)
            .await
            .unwrap();
        assert!(presenter.expected_improvement() > std::time::Duration::ZERO);
        assert_eq!(reg.active_count(), 1);
    }

    #[tokio::test]
    async fn test_replace_on_request_same_slot() {
        let probe = StaticProbe::cooperative(viewport());
        let reg = registry(probe.clone());

        let first = reg
            .request_presenter("delegated-ink-trail", None)
            .await
            .unwrap();
        let second = reg
            .request_presenter("delegated-ink-trail", None)
            .await
            .unwrap();

        assert_eq!(first.state(), TrailState::Disposed);
        assert_ne!(second.state(), TrailState::Disposed);
        assert_eq!(reg.active_count(), 1);
        // The replaced presenter's surface was released.
        assert_eq!(probe.active_surfaces(), 1);
    }

    #[tokio::test]
    async fn test_distinct_regions_get_distinct_slots() {
        let reg = registry(StaticProbe::cooperative(viewport()));
        let a = RegionHandle::rect(0.0, 0.0, 100.0, 100.0);
        let b = RegionHandle::rect(200.0, 0.0, 100.0, 100.0);

        let first = reg
            .request_presenter("delegated-ink-trail", Some(a))
            .await
            .unwrap();
        let _second = reg
            .request_presenter("delegated-ink-trail", Some(b))
            .await
            .unwrap();

        assert_ne!(first.state(), TrailState::Disposed);
        assert_eq!(reg.active_count(), 2);
    }

    #[tokio::test]
    async fn test_dispose_all() {
        let probe = StaticProbe::cooperative(viewport());
        let reg = registry(probe.clone());
        let presenter = reg
            .request_presenter("delegated-ink-trail", None)
            .await
            .unwrap();

        reg.dispose_all();
        assert_eq!(presenter.state(), TrailState::Disposed);
        assert_eq!(reg.active_count(), 0);
        assert_eq!(probe.active_surfaces(), 0);
    }

    #[tokio::test]
    async fn test_probe_failure_surfaces_as_probe_error() {
        let mut mock = MockPlatformProbe::new();
        mock.expect_probe()
            .returning(|| Err(anyhow::anyhow!("display server gone")));

        let reg = PresenterRegistry::new(Arc::new(mock), InkConfig::default());
        let result = reg.request_presenter("delegated-ink-trail", None).await;
        assert!(matches!(result, Err(RequestError::Probe(_))));
    }

    /// Probe that never answers, for exercising the resolution timeout
    struct StalledProbe;

    #[async_trait::async_trait]
    impl PlatformProbe for StalledProbe {
        async fn probe(&self) -> anyhow::Result<crate::platform::PlatformCapabilities> {
            std::future::pending().await
        }

        fn allocate_surface(
            &self,
            _region: &PresentationRegion,
        ) -> anyhow::Result<crate::platform::SurfaceLease> {
            anyhow::bail!("never probed successfully")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_timeout() {
        let reg = PresenterRegistry::new(Arc::new(StalledProbe), InkConfig::default());
        let result = reg.request_presenter("delegated-ink-trail", None).await;
        assert!(matches!(result, Err(RequestError::ProbeTimeout)));
    }

    #[tokio::test]
    async fn test_cancelled_request_releases_surface() {
        let probe = StaticProbe::cooperative(viewport());
        let reg = registry(probe.clone());

        {
            let fut = reg.request_presenter("delegated-ink-trail", None);
            // Drop before polling to completion: nothing may leak.
            drop(fut);
        }
        assert_eq!(probe.active_surfaces(), 0);
        assert_eq!(reg.active_count(), 0);
    }
}
