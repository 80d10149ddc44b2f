//! # delegated-ink
//!
//! Low-latency "ink trail" presentation: lets a host compositor paint
//! provisional stroke segments on an application's behalf in the window
//! between input capture and the application's own rendered frame, then
//! cede control seamlessly once the application catches up.
//!
//! This crate implements the handoff and reconciliation protocol only.
//! Input capture, drawing primitives, and compositor internals are external
//! collaborators consumed through narrow interfaces.
//!
//! # Architecture
//!
//! ```text
//! application turn                          compositor tick
//! ────────────────                          ───────────────
//! set_last_rendered_point ──▶ AnchorPoint ◀── render_pass
//!                                 │                │
//! input pipeline ──▶ RawSamples ──┤                ▼
//!                                 │          TrailFrame
//!                                 ▼          (segments clipped to
//!                            watermark        PresentationRegion,
//!                                             retire_through signal)
//! ```
//!
//! # Data Flow
//!
//! **Request path:** application → [`PresenterRegistry::request_presenter`]
//! → capability probe → surface lease → [`TrailPresenter`]
//!
//! **Render path:** input pipeline → raw samples → per-tick
//! [`TrailPresenter::render_pass`] → [`TrailFrame`] → host surface
//!
//! **Reconciliation:** application acknowledges its rendered point →
//! anchor replaces → next frame retires the superseded span in the same
//! compositing tick the authoritative content appears.
//!
//! [`PresenterRegistry::request_presenter`]: registry::PresenterRegistry::request_presenter
//! [`TrailPresenter`]: presenter::TrailPresenter
//! [`TrailPresenter::render_pass`]: presenter::TrailPresenter::render_pass
//! [`TrailFrame`]: presenter::TrailFrame

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Configuration loading and validation
pub mod config;

/// Latency improvement estimation
pub mod estimator;

/// Input pipeline collaborator types (trusted events, raw samples)
pub mod event;

/// Tracing subscriber setup
pub mod logging;

/// Host platform capability probing and surface leases
pub mod platform;

/// The delegated trail presenter state machine
pub mod presenter;

/// Presentation region resolution and clipping
pub mod region;

/// Presenter factory and lifecycle management
pub mod registry;

/// Trail styling primitives
pub mod style;

// Re-export the public surface at crate level for convenience
pub use config::{InkConfig, LoggingConfig, PresenterConfig};
pub use event::{EventTrust, PointerEvent, RawSample, SampleSink};
pub use platform::{OverlaySupport, PlatformCapabilities, PlatformProbe, StaticProbe, SurfaceLease};
pub use presenter::{
    AnchorPoint, TrailFrame, TrailPresenter, TrailSegment, TrailState, TrailStats, UpdateError,
};
pub use region::{CoordinateSpace, Point, PresentationRegion, Rect, RegionBounds, RegionHandle};
pub use registry::{PresenterKind, PresenterRegistry, RequestError};
pub use style::{Color, StyleError, TrailStyle};
