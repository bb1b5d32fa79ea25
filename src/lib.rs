//! dualcam: toggle a capture session between the front and back cameras
//!
//! A capture session holds one camera input at a time. The sequencer queues
//! switch units on a serial worker; each unit swaps the input inside one
//! configuration transaction, waits for the sensor to settle and captures a
//! still photo. Photos come back asynchronously and are persisted by the
//! completion bridge on its own thread.
//!
//! # Usage
//! ```rust,ignore
//! use dualcam::{DualCamApp, DualCamConfig, NokhwaBackend};
//! use dualcam::library::DirectoryLibrary;
//! use dualcam::permissions::SystemAccess;
//! use std::sync::Arc;
//!
//! let config = DualCamConfig::load_or_default();
//! let library = DirectoryLibrary::new(&config.storage.output_directory, "dualcam");
//! let app = DualCamApp::launch(
//!     config,
//!     Arc::new(SystemAccess),
//!     Arc::new(library),
//!     || Ok(NokhwaBackend::new()),
//! )
//! .await?;
//! app.capture_pressed("3");
//! app.wait_idle();
//! ```
pub mod app;
pub mod completion;
pub mod config;
pub mod errors;
pub mod event_log;
pub mod invariant_ppt;
pub mod library;
pub mod permissions;
pub mod platform;
pub mod registry;
pub mod sequencer;
pub mod session;
pub mod timing;
pub mod types;

// Simulated backend and in-memory collaborators for tests and --simulate
pub mod testing;

// Re-exports for convenience
pub use app::DualCamApp;
pub use config::DualCamConfig;
pub use errors::CameraError;
pub use platform::{CaptureBackend, NokhwaBackend};
pub use session::{CaptureSession, SwitchOutcome};
pub use types::{ActiveRole, CameraPosition, CameraRole, CaptureDevice, SequencePlan};

/// Initialize logging for the camera system
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "dualcam=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        os: std::env::consts::OS.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub os: String,
}
