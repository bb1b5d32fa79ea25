use dualcam::library::{DirectoryLibrary, PhotoLibrary};
use dualcam::permissions::PermissionStatus;
use dualcam::testing::{MemoryLibrary, SimulatedBackend, StaticAccess};
use dualcam::types::ActiveRole;
use dualcam::{CameraError, DualCamApp, DualCamConfig};
use std::sync::Arc;

fn fast_config() -> DualCamConfig {
    let mut config = DualCamConfig::default();
    config.sequence.front_settle_ms = 1;
    config.sequence.back_settle_ms = 1;
    config
}

async fn launch_with(
    config: DualCamConfig,
    access: StaticAccess,
    library: Arc<dyn PhotoLibrary>,
    backend: SimulatedBackend,
) -> DualCamApp<SimulatedBackend> {
    DualCamApp::launch(config, Arc::new(access), library, move || Ok(backend))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_capture_sequence_writes_photos() {
    let dir = tempfile::tempdir().unwrap();
    let library = Arc::new(DirectoryLibrary::new(dir.path(), "app"));
    let app = launch_with(
        fast_config(),
        StaticAccess::granted(),
        library,
        SimulatedBackend::phone(),
    )
    .await;

    assert!(app.is_ready());
    assert_eq!(app.active_role(), ActiveRole::Back);

    let plan = app.capture_pressed("2");
    assert_eq!(plan.repeat_count, 2);
    assert_eq!(plan.units, 4);
    app.wait_idle();

    let stats = app.stats();
    assert_eq!(stats.processed, 4);
    assert_eq!(stats.saved, 4);
    assert_eq!(app.active_role(), ActiveRole::Back);

    let jpegs = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "jpg"))
        .count();
    assert_eq!(jpegs, 4);
}

#[tokio::test]
async fn test_denied_camera_builds_inert_app() {
    let library = MemoryLibrary::new();
    let backend = SimulatedBackend::phone();
    let app = launch_with(
        fast_config(),
        StaticAccess::camera_denied(),
        Arc::new(library.clone()),
        backend.clone(),
    )
    .await;

    assert!(!app.is_ready());
    assert_eq!(app.capture_pressed("3").units, 0);
    app.set_capture_enabled(false);
    app.wait_idle();

    assert!(backend.calls().is_empty());
    assert!(library.photos().is_empty());
    assert_eq!(app.active_role(), ActiveRole::None);
    assert!(app.log().contains("Authorization denied: camera access not granted"));
    assert!(app.log().contains("Camera unavailable: capture ignored"));
    assert!(app.log().contains("Camera unavailable: capture toggle ignored"));
}

#[tokio::test]
async fn test_backend_failure_builds_inert_app() {
    let app: DualCamApp<SimulatedBackend> = DualCamApp::launch(
        fast_config(),
        Arc::new(StaticAccess::granted()),
        Arc::new(MemoryLibrary::new()),
        || Err(CameraError::Initialization("no camera stack".to_string())),
    )
    .await
    .unwrap();

    assert!(!app.is_ready());
    assert!(app.log().contains("Camera setup failed"));
    assert!(app.with_session(|s| s.active_role()).is_err());
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let mut config = fast_config();
    config.storage.jpeg_quality = 0;
    let result: Result<DualCamApp<SimulatedBackend>, _> = DualCamApp::launch(
        config,
        Arc::new(StaticAccess::granted()),
        Arc::new(MemoryLibrary::new()),
        || Ok(SimulatedBackend::phone()),
    )
    .await;

    assert!(matches!(result, Err(CameraError::Config(_))));
}

#[tokio::test]
async fn test_denied_photo_library_drops_photos() {
    let library = MemoryLibrary::new();
    let backend = SimulatedBackend::phone();
    let app = launch_with(
        fast_config(),
        StaticAccess::photo_library(PermissionStatus::Denied),
        Arc::new(library.clone()),
        backend.clone(),
    )
    .await;

    assert!(app.is_ready());
    app.capture_pressed("1");
    app.wait_idle();

    assert_eq!(backend.capture_count(), 2);
    assert_eq!(app.stats().processed, 2);
    assert!(library.photos().is_empty());
    assert_eq!(app.stats().dropped, 2);
    assert_eq!(app.stats().saved, 0);
}

#[tokio::test]
async fn test_library_write_failure_is_logged() {
    let library = MemoryLibrary::new();
    library.fail_writes(true);
    let app = launch_with(
        fast_config(),
        StaticAccess::granted(),
        Arc::new(library.clone()),
        SimulatedBackend::phone(),
    )
    .await;

    app.capture_pressed("1");
    app.wait_idle();

    assert_eq!(
        app.log()
            .count_matching("Error occurred while saving photo to photo library"),
        2
    );
}

#[tokio::test]
async fn test_repeat_input_handling() {
    let backend = SimulatedBackend::phone();
    let app = launch_with(
        fast_config(),
        StaticAccess::granted(),
        Arc::new(MemoryLibrary::new()),
        backend.clone(),
    )
    .await;
    backend.clear_journal();

    assert!(!app.repeat_input_changed(""));
    assert!(app.repeat_input_changed("x"));

    let plan = app.capture_pressed("abc");
    assert_eq!(plan.units, 0);
    app.wait_idle();
    assert!(backend.calls().is_empty());
    assert_eq!(app.log().count_matching("Capture button pressed"), 1);
}

#[tokio::test]
async fn test_capture_press_is_logged_before_switching() {
    let app = launch_with(
        fast_config(),
        StaticAccess::granted(),
        Arc::new(MemoryLibrary::new()),
        SimulatedBackend::phone(),
    )
    .await;
    app.clear_log();

    app.capture_pressed("1");
    app.wait_idle();

    let lines = app.log_lines();
    let pressed = lines
        .iter()
        .position(|l| l.contains("Capture button pressed"))
        .unwrap();
    let changing = lines.iter().position(|l| l.contains("changing")).unwrap();
    assert!(pressed < changing);
}

#[tokio::test]
async fn test_capture_toggle_and_clear_log() {
    let backend = SimulatedBackend::phone();
    let app = launch_with(
        fast_config(),
        StaticAccess::granted(),
        Arc::new(MemoryLibrary::new()),
        backend.clone(),
    )
    .await;

    assert!(app.capture_enabled());
    app.set_capture_enabled(false);
    assert!(!app.capture_enabled());

    app.capture_pressed("1");
    app.wait_idle();
    assert_eq!(backend.capture_count(), 0);
    assert_eq!(app.stats().processed, 0);
    assert!(!app.log_lines().is_empty());

    app.clear_log();
    assert!(app.log_lines().is_empty());
}

#[tokio::test]
async fn test_role_snapshot_matches_session() {
    let app = launch_with(
        fast_config(),
        StaticAccess::granted(),
        Arc::new(MemoryLibrary::new()),
        SimulatedBackend::phone(),
    )
    .await;
    let mut roles = app.subscribe_role();

    app.set_capture_enabled(false);
    app.capture_pressed("1");
    app.wait_idle();

    // two switches: front and back again
    assert!(roles.has_changed().unwrap());
    assert_eq!(*roles.borrow_and_update(), ActiveRole::Back);
    let on_worker = app.with_session(|s| s.active_role()).unwrap();
    assert_eq!(on_worker, app.active_role());
}

#[tokio::test]
async fn test_front_initial_role_from_config() {
    let mut config = fast_config();
    config.camera.initial_role = dualcam::CameraRole::Front;
    let app = launch_with(
        config,
        StaticAccess::granted(),
        Arc::new(MemoryLibrary::new()),
        SimulatedBackend::phone(),
    )
    .await;

    assert_eq!(app.active_role(), ActiveRole::Front);
    app.set_capture_enabled(false);
    app.capture_pressed("1");
    app.wait_idle();
    assert_eq!(app.log().count_matching("changing front -> back"), 1);
}
