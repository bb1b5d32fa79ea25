//! Hardware seam: the operations a capture session needs from a camera stack.
//!
//! A backend is created and driven on the session worker thread only, so it
//! does not have to be `Send`. Photo results never come back as return values:
//! they are pushed onto the completion channel and handled elsewhere.

mod native;

pub use native::NokhwaBackend;

use crate::completion::PhotoEventSender;
use crate::errors::CameraError;
use crate::types::{CaptureDevice, CaptureRequest, DeviceInput, PhotoOutputConfig, SessionPreset};

pub trait CaptureBackend {
    /// Enumerate every capture device currently visible.
    fn devices(&mut self) -> Result<Vec<CaptureDevice>, CameraError>;

    fn begin_configuration(&mut self);

    fn commit_configuration(&mut self) -> Result<(), CameraError>;

    fn set_preset(&mut self, preset: SessionPreset) -> Result<(), CameraError>;

    /// Capability predicate checked before every `add_input`.
    fn can_add_input(&self, input: &DeviceInput) -> bool;

    fn add_input(&mut self, input: &DeviceInput) -> Result<(), CameraError>;

    fn remove_input(&mut self, input: &DeviceInput);

    fn add_output(&mut self, output: PhotoOutputConfig) -> Result<(), CameraError>;

    fn start_running(&mut self) -> Result<(), CameraError>;

    fn is_running(&self) -> bool;

    /// Start one still capture.
    ///
    /// The backend reports through `events`: first a processing-finished
    /// event with the bytes or the error, then a capture-finished event. An
    /// `Err` return means the request was not issued and no events follow.
    fn capture_photo(
        &mut self,
        request: &CaptureRequest,
        events: &PhotoEventSender,
    ) -> Result<(), CameraError>;
}

/// Encode packed RGB8 pixels as JPEG.
pub fn encode_jpeg(width: u32, height: u32, rgb: Vec<u8>, quality: u8) -> Result<Vec<u8>, CameraError> {
    let image = image::RgbImage::from_raw(width, height, rgb).ok_or_else(|| {
        CameraError::CaptureProcessing(format!(
            "pixel buffer does not match {}x{} RGB frame",
            width, height
        ))
    })?;

    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode_image(&image)
        .map_err(|e| CameraError::CaptureProcessing(format!("JPEG encoding failed: {}", e)))?;
    Ok(out)
}
