#[cfg(test)]
mod error_tests {
    use dualcam::errors::CameraError;
    use dualcam::permissions::AccessKind;
    use dualcam::types::CameraRole;
    use std::error::Error;

    #[test]
    fn test_device_not_found_names_role() {
        let error = CameraError::DeviceNotFound(CameraRole::Front);
        assert_eq!(error.to_string(), "No front camera device found");
    }

    #[test]
    fn test_input_rejected_matches_log_line() {
        let error = CameraError::InputAddRejected(CameraRole::Back);
        assert_eq!(error.to_string(), "Could not add input for back camera");
    }

    #[test]
    fn test_capture_processing_display() {
        let error = CameraError::CaptureProcessing("Display test".to_string());
        assert_eq!(format!("{}", error), "Capture processing error: Display test");
    }

    #[test]
    fn test_authorization_denied_display() {
        let error = CameraError::AuthorizationDenied(AccessKind::Camera);
        assert_eq!(
            error.to_string(),
            "Authorization denied: camera access not granted"
        );
    }

    #[test]
    fn test_camera_error_debug_format() {
        let error = CameraError::Initialization("Debug test".to_string());
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("Initialization"));
        assert!(debug_str.contains("Debug test"));
    }

    #[test]
    fn test_camera_error_implements_error_trait() {
        let error = CameraError::Storage("Error trait test".to_string());
        let _error_trait: &dyn Error = &error;
        assert!(error.source().is_none());
    }

    #[test]
    fn test_all_error_variants() {
        let errors = vec![
            CameraError::DeviceNotFound(CameraRole::Back),
            CameraError::InputAddRejected(CameraRole::Front),
            CameraError::CaptureProcessing("capture".to_string()),
            CameraError::AuthorizationDenied(AccessKind::PhotoLibrary),
            CameraError::Initialization("init".to_string()),
            CameraError::Session("session".to_string()),
            CameraError::Storage("storage".to_string()),
            CameraError::Config("config".to_string()),
        ];

        for error in &errors {
            assert!(!error.to_string().is_empty());
            assert_eq!(error.clone(), *error);
        }
    }

    #[test]
    fn test_errors_convert_to_anyhow() {
        fn fails() -> anyhow::Result<()> {
            Err(CameraError::Config("bad value".to_string()))?;
            Ok(())
        }
        let err = fails().unwrap_err();
        assert!(err.to_string().contains("Configuration error: bad value"));
        assert!(err.downcast_ref::<CameraError>().is_some());
    }
}
