//! Core data types shared by the registry, session, sequencer and completion bridge.

use crate::errors::CameraError;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Raw physical position tag reported by a capture device.
///
/// `Unspecified` is what external or virtual cameras report; such a device can
/// never act as a front or back input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraPosition {
    Front,
    Back,
    Unspecified,
}

impl CameraPosition {
    /// Role for this position, `None` for anything that is not front or back.
    pub fn role(self) -> Option<CameraRole> {
        match self {
            CameraPosition::Front => Some(CameraRole::Front),
            CameraPosition::Back => Some(CameraRole::Back),
            CameraPosition::Unspecified => None,
        }
    }
}

/// One of the two cameras the switcher alternates between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraRole {
    Front,
    Back,
}

impl CameraRole {
    pub const ALL: [CameraRole; 2] = [CameraRole::Front, CameraRole::Back];

    pub fn opposite(self) -> Self {
        match self {
            CameraRole::Front => CameraRole::Back,
            CameraRole::Back => CameraRole::Front,
        }
    }

    pub fn position(self) -> CameraPosition {
        match self {
            CameraRole::Front => CameraPosition::Front,
            CameraRole::Back => CameraPosition::Back,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CameraRole::Front => "front",
            CameraRole::Back => "back",
        }
    }
}

impl fmt::Display for CameraRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which camera currently feeds the session.
///
/// `None` is a real state: it is where the session ends up when the target
/// input of a switch is rejected after the old one was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveRole {
    Front,
    Back,
    None,
}

impl ActiveRole {
    pub fn role(self) -> Option<CameraRole> {
        match self {
            ActiveRole::Front => Some(CameraRole::Front),
            ActiveRole::Back => Some(CameraRole::Back),
            ActiveRole::None => None,
        }
    }
}

impl From<Option<CameraRole>> for ActiveRole {
    fn from(role: Option<CameraRole>) -> Self {
        match role {
            Some(CameraRole::Front) => ActiveRole::Front,
            Some(CameraRole::Back) => ActiveRole::Back,
            None => ActiveRole::None,
        }
    }
}

impl fmt::Display for ActiveRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveRole::Front => f.write_str("front"),
            ActiveRole::Back => f.write_str("back"),
            ActiveRole::None => f.write_str("none"),
        }
    }
}

/// Hardware class of a capture device, used to filter discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    BuiltInWideAngle,
    BuiltInDual,
    BuiltInTrueDepth,
    External,
}

impl DeviceType {
    /// Device classes considered during role resolution.
    pub fn discovery_defaults() -> Vec<DeviceType> {
        vec![
            DeviceType::BuiltInWideAngle,
            DeviceType::BuiltInDual,
            DeviceType::BuiltInTrueDepth,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Video,
    Audio,
    Muxed,
}

/// A capture device as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureDevice {
    pub id: String,
    pub name: String,
    pub device_type: DeviceType,
    pub media_types: Vec<MediaType>,
    pub position: CameraPosition,
}

impl CaptureDevice {
    /// Create a built-in wide-angle video device at the given position.
    pub fn new(id: impl Into<String>, name: impl Into<String>, position: CameraPosition) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            device_type: DeviceType::BuiltInWideAngle,
            media_types: vec![MediaType::Video],
            position,
        }
    }

    pub fn with_device_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    pub fn with_media_types(mut self, media_types: Vec<MediaType>) -> Self {
        self.media_types = media_types;
        self
    }

    pub fn provides(&self, media: MediaType) -> bool {
        self.media_types.contains(&media)
    }
}

impl fmt::Display for CaptureDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({:?}, {:?})",
            self.id, self.name, self.device_type, self.position
        )
    }
}

/// Immutable handle to one physical camera, attachable to a session.
///
/// Cloning is cheap; two handles are equal when they refer to the same device id.
#[derive(Debug, Clone)]
pub struct DeviceInput {
    device: Arc<CaptureDevice>,
}

impl DeviceInput {
    pub fn new(device: CaptureDevice) -> Self {
        Self {
            device: Arc::new(device),
        }
    }

    pub fn device(&self) -> &CaptureDevice {
        &self.device
    }

    pub fn id(&self) -> &str {
        &self.device.id
    }

    pub fn position(&self) -> CameraPosition {
        self.device.position
    }
}

impl PartialEq for DeviceInput {
    fn eq(&self, other: &Self) -> bool {
        self.device.id == other.device.id
    }
}

impl Eq for DeviceInput {}

/// Quality preset applied to the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPreset {
    Photo,
    High,
    Medium,
    Low,
}

/// Photo output sink configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoOutputConfig {
    pub high_resolution_capture: bool,
}

impl Default for PhotoOutputConfig {
    fn default() -> Self {
        Self {
            high_resolution_capture: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoCodec {
    Jpeg,
}

/// Per-capture settings. `Default` is what the sequencer issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoSettings {
    pub codec: PhotoCodec,
    pub high_resolution: bool,
    pub quality: u8,
}

impl Default for PhotoSettings {
    fn default() -> Self {
        Self {
            codec: PhotoCodec::Jpeg,
            high_resolution: true,
            quality: 90,
        }
    }
}

/// One capture intent. Lives until its completion events are handled.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub id: Uuid,
    pub settings: PhotoSettings,
    pub role: CameraRole,
    pub issued_at: DateTime<Utc>,
}

impl CaptureRequest {
    pub fn new(role: CameraRole, settings: PhotoSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            settings,
            role,
            issued_at: Utc::now(),
        }
    }
}

/// Encoded photo bytes or the reason none were produced.
#[derive(Debug, Clone)]
pub struct PhotoResult {
    pub request_id: Uuid,
    pub data: Result<Bytes, CameraError>,
}

impl PhotoResult {
    /// Successful result. Empty buffers are turned into processing errors so a
    /// successful result always carries bytes.
    pub fn from_bytes(request_id: Uuid, data: impl Into<Bytes>) -> Self {
        let data: Bytes = data.into();
        if data.is_empty() {
            return Self::failed(
                request_id,
                CameraError::CaptureProcessing("backend returned an empty photo".to_string()),
            );
        }
        Self {
            request_id,
            data: Ok(data),
        }
    }

    pub fn failed(request_id: Uuid, error: CameraError) -> Self {
        Self {
            request_id,
            data: Err(error),
        }
    }

    pub fn bytes(&self) -> Option<&Bytes> {
        self.data.as_ref().ok()
    }

    pub fn into_bytes(self) -> Option<Bytes> {
        self.data.ok()
    }
}

/// Work derived from a user supplied repeat count.
///
/// Each repeat is a full round trip, so there are two switch units per repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SequencePlan {
    pub repeat_count: usize,
    pub units: usize,
}

impl SequencePlan {
    pub fn new(repeat_count: usize) -> Self {
        Self {
            repeat_count,
            units: repeat_count.saturating_mul(2),
        }
    }
}
