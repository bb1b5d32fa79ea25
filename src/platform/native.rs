use super::{encode_jpeg, CaptureBackend};
use crate::completion::PhotoEventSender;
use crate::errors::CameraError;
use crate::types::{
    CameraPosition, CaptureDevice, CaptureRequest, DeviceInput, DeviceType, MediaType,
    PhotoOutputConfig, PhotoResult, SessionPreset,
};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::{query, Camera};
use std::collections::HashMap;

/// Desktop backend on top of nokhwa.
///
/// Desktop cameras rarely report a physical position, so it is inferred from
/// the device name ("FaceTime", "front", "rear", ...) unless an explicit
/// override is registered for the device id.
pub struct NokhwaBackend {
    overrides: HashMap<String, CameraPosition>,
    preset: SessionPreset,
    output: Option<PhotoOutputConfig>,
    attached: Option<(DeviceInput, Camera)>,
    running: bool,
    configuring: bool,
}

impl Default for NokhwaBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl NokhwaBackend {
    pub fn new() -> Self {
        Self {
            overrides: HashMap::new(),
            preset: SessionPreset::High,
            output: None,
            attached: None,
            running: false,
            configuring: false,
        }
    }

    /// Force the position reported for a device id.
    pub fn with_position(mut self, device_id: impl Into<String>, position: CameraPosition) -> Self {
        self.overrides.insert(device_id.into(), position);
        self
    }

    fn open_camera(&self, input: &DeviceInput) -> Result<Camera, CameraError> {
        let index = match input.id().parse::<u32>() {
            Ok(i) => CameraIndex::Index(i),
            Err(_) => CameraIndex::String(input.id().to_string()),
        };

        let requested = match self.preset {
            SessionPreset::Photo | SessionPreset::High => RequestedFormatType::AbsoluteHighestResolution,
            SessionPreset::Medium | SessionPreset::Low => RequestedFormatType::AbsoluteHighestFrameRate,
        };

        Camera::new(index, RequestedFormat::new::<RgbFormat>(requested)).map_err(|e| {
            CameraError::Initialization(format!("Failed to open camera {}: {}", input.id(), e))
        })
    }
}

/// Guess a camera position from its advertised name and description.
pub(crate) fn infer_position(name: &str, description: &str) -> CameraPosition {
    let haystack = format!("{} {}", name, description).to_lowercase();

    const FRONT: [&str; 5] = ["front", "facetime", "user", "selfie", "integrated"];
    const BACK: [&str; 4] = ["back", "rear", "environment", "world"];

    if BACK.iter().any(|k| haystack.contains(k)) {
        CameraPosition::Back
    } else if FRONT.iter().any(|k| haystack.contains(k)) {
        CameraPosition::Front
    } else {
        CameraPosition::Unspecified
    }
}

pub(crate) fn infer_device_type(name: &str, position: CameraPosition) -> DeviceType {
    let name = name.to_lowercase();
    if name.contains("truedepth") {
        DeviceType::BuiltInTrueDepth
    } else if name.contains("dual") {
        DeviceType::BuiltInDual
    } else if position == CameraPosition::Unspecified {
        DeviceType::External
    } else {
        DeviceType::BuiltInWideAngle
    }
}

impl CaptureBackend for NokhwaBackend {
    fn devices(&mut self) -> Result<Vec<CaptureDevice>, CameraError> {
        let cameras = query(ApiBackend::Auto)
            .map_err(|e| CameraError::Initialization(format!("Failed to query cameras: {}", e)))?;

        Ok(cameras
            .into_iter()
            .map(|info| {
                let id = info.index().to_string();
                let name = info.human_name();
                let position = self
                    .overrides
                    .get(&id)
                    .copied()
                    .unwrap_or_else(|| infer_position(&name, info.description()));
                let device_type = infer_device_type(&name, position);
                CaptureDevice::new(id, name, position)
                    .with_device_type(device_type)
                    .with_media_types(vec![MediaType::Video])
            })
            .collect())
    }

    fn begin_configuration(&mut self) {
        self.configuring = true;
    }

    fn commit_configuration(&mut self) -> Result<(), CameraError> {
        if !self.configuring {
            return Err(CameraError::Session(
                "commit without matching begin_configuration".to_string(),
            ));
        }
        self.configuring = false;
        Ok(())
    }

    fn set_preset(&mut self, preset: SessionPreset) -> Result<(), CameraError> {
        self.preset = preset;
        Ok(())
    }

    fn can_add_input(&self, _input: &DeviceInput) -> bool {
        // Only one camera can stream into the session at a time.
        self.attached.is_none()
    }

    fn add_input(&mut self, input: &DeviceInput) -> Result<(), CameraError> {
        if self.attached.is_some() {
            return Err(CameraError::Session("an input is already attached".to_string()));
        }

        let mut camera = self.open_camera(input)?;
        if self.running {
            camera.open_stream().map_err(|e| {
                CameraError::Initialization(format!("Failed to open stream for {}: {}", input.id(), e))
            })?;
        }

        log::debug!("Attached camera {} ({})", input.id(), input.device().name);
        self.attached = Some((input.clone(), camera));
        Ok(())
    }

    fn remove_input(&mut self, input: &DeviceInput) {
        let matches = self
            .attached
            .as_ref()
            .is_some_and(|(attached, _)| attached == input);
        if !matches {
            return;
        }

        if let Some((_, mut camera)) = self.attached.take() {
            if camera.is_stream_open() {
                if let Err(e) = camera.stop_stream() {
                    log::debug!("Failed to stop stream for {}: {}", input.id(), e);
                }
            }
        }
    }

    fn add_output(&mut self, output: PhotoOutputConfig) -> Result<(), CameraError> {
        if self.output.is_some() {
            return Err(CameraError::Session("photo output already attached".to_string()));
        }
        self.output = Some(output);
        Ok(())
    }

    fn start_running(&mut self) -> Result<(), CameraError> {
        if let Some((input, camera)) = self.attached.as_mut() {
            if !camera.is_stream_open() {
                camera.open_stream().map_err(|e| {
                    CameraError::Initialization(format!("Failed to open stream for {}: {}", input.id(), e))
                })?;
            }
        }
        self.running = true;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn capture_photo(
        &mut self,
        request: &CaptureRequest,
        events: &PhotoEventSender,
    ) -> Result<(), CameraError> {
        if self.output.is_none() {
            return Err(CameraError::Session("no photo output attached".to_string()));
        }
        let (_, camera) = self
            .attached
            .as_mut()
            .ok_or_else(|| CameraError::Session("no input attached".to_string()))?;

        if !camera.is_stream_open() {
            camera
                .open_stream()
                .map_err(|e| CameraError::Session(format!("Failed to open stream: {}", e)))?;
        }

        let encoded = camera
            .frame()
            .map_err(|e| CameraError::CaptureProcessing(format!("Failed to grab frame: {}", e)))
            .and_then(|buffer| {
                buffer
                    .decode_image::<RgbFormat>()
                    .map_err(|e| CameraError::CaptureProcessing(format!("Failed to decode frame: {}", e)))
            })
            .and_then(|decoded| {
                let (width, height) = (decoded.width(), decoded.height());
                encode_jpeg(width, height, decoded.into_raw(), request.settings.quality)
            });

        match encoded {
            Ok(bytes) => {
                events.processing_finished(PhotoResult::from_bytes(request.id, bytes));
                events.capture_finished(request.id, None);
            }
            Err(e) => {
                events.processing_finished(PhotoResult::failed(request.id, e.clone()));
                events.capture_finished(request.id, Some(e));
            }
        }
        Ok(())
    }
}

impl Drop for NokhwaBackend {
    fn drop(&mut self) {
        if let Some((_, mut camera)) = self.attached.take() {
            let _ = camera.stop_stream();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_position_from_names() {
        assert_eq!(infer_position("FaceTime HD Camera", ""), CameraPosition::Front);
        assert_eq!(infer_position("Rear Camera", "USB"), CameraPosition::Back);
        assert_eq!(infer_position("Logitech C920", "USB Video"), CameraPosition::Unspecified);
        assert_eq!(
            infer_position("Camera", "facing: environment"),
            CameraPosition::Back
        );
    }

    #[test]
    fn test_infer_device_type() {
        assert_eq!(
            infer_device_type("TrueDepth Camera", CameraPosition::Front),
            DeviceType::BuiltInTrueDepth
        );
        assert_eq!(
            infer_device_type("Back Dual Camera", CameraPosition::Back),
            DeviceType::BuiltInDual
        );
        assert_eq!(
            infer_device_type("Logitech C920", CameraPosition::Unspecified),
            DeviceType::External
        );
    }

    #[test]
    fn test_nothing_attached_before_configuration() {
        let backend = NokhwaBackend::new().with_position("0", CameraPosition::Front);
        assert!(!backend.is_running());
        let input = DeviceInput::new(CaptureDevice::new("0", "cam", CameraPosition::Front));
        assert!(backend.can_add_input(&input));
    }
}
