// Rendering core
//
// This crate turns markup into PDF documents on pooled engine instances.
//
// Key design decisions:
// - Engines sit behind traits (RenderEngine, RenderContext); Chromium is one implementation
// - A RenderSession owns the per-job context and closes it on every exit path
// - The Printer pairs pool leases with sessions and decides release vs. retirement
// - Render options are validated before a worker is borrowed
// - Engine output shapes are normalized once, at the session boundary

pub mod artifact;
pub mod chromium;
pub mod engine;
pub mod error;
pub mod job;
pub mod options;
pub mod printer;
pub mod session;

// Telemetry (tracing subscriber + OpenTelemetry)
pub mod telemetry;

// Scripted engine for tests and local development
pub mod mock;

// Re-exports for convenience
pub use artifact::{Artifact, EngineOutput, PDF_SIGNATURE};
pub use chromium::{ChromiumBrowser, ChromiumConfig, ChromiumLauncher};
pub use engine::{RenderContext, RenderEngine};
pub use error::{EngineError, RenderError, TimeoutStage};
pub use job::RenderJob;
pub use options::{CssLength, Margin, OptionsError, PaperFormat, RenderOptions};
pub use printer::{ComponentHealth, HealthComponents, HealthReport, HealthStatus, Printer};
pub use session::{RenderSession, RenderSettings, SessionOutcome};
