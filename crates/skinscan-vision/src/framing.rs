//! Face framing gate.
//!
//! Turns a frame plus whatever faces the detector reported into the single
//! "subject well-framed" signal the capture session consumes. A face passes
//! when it is centred within a tolerance and fills a sensible share of the
//! frame; dark frames never pass.

use crate::frame::{Frame, DEFAULT_DARK_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A detected face in pixel coordinates (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

impl FaceBox {
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingPolicy {
    /// Max distance of the face centre from the frame centre, as a share of the frame.
    pub center_tolerance: f32,
    /// Face extent bounds, as a share of the frame, per axis.
    pub min_face_ratio: f32,
    pub max_face_ratio: f32,
    /// Detections below this confidence are ignored.
    pub min_confidence: f32,
    /// Share of dark pixels above which the frame is rejected.
    pub dark_threshold: f32,
}

impl Default for FramingPolicy {
    fn default() -> Self {
        Self {
            center_tolerance: 0.2,
            min_face_ratio: 0.3,
            max_face_ratio: 0.7,
            min_confidence: 0.5,
            dark_threshold: DEFAULT_DARK_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingVerdict {
    WellFramed,
    NoFace,
    OffCenter,
    TooSmall,
    TooLarge,
    TooDark,
}

impl FramingVerdict {
    /// The boolean fed to the capture session's detection signal.
    pub fn is_well_framed(&self) -> bool {
        matches!(self, FramingVerdict::WellFramed)
    }

    /// Short guidance for the user.
    pub fn hint(&self) -> &'static str {
        match self {
            FramingVerdict::WellFramed => "Hold still",
            FramingVerdict::NoFace => "Position your face in the frame",
            FramingVerdict::OffCenter => "Center your face in the frame",
            FramingVerdict::TooSmall => "Move closer to the camera",
            FramingVerdict::TooLarge => "Move further from the camera",
            FramingVerdict::TooDark => "Find better lighting",
        }
    }
}

impl fmt::Display for FramingVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hint())
    }
}

impl FramingPolicy {
    /// Judge a frame and its detections. The most confident face is used.
    pub fn assess(&self, frame: &Frame, faces: &[FaceBox]) -> FramingVerdict {
        if frame.is_dark(self.dark_threshold) {
            return FramingVerdict::TooDark;
        }
        let best = faces
            .iter()
            .filter(|f| f.confidence >= self.min_confidence)
            .max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        match best {
            Some(face) => self.assess_face(face, frame.width, frame.height),
            None => FramingVerdict::NoFace,
        }
    }

    /// Exposure-only judgement, for sources that supply no face geometry.
    pub fn assess_exposure(&self, frame: &Frame) -> FramingVerdict {
        if frame.is_dark(self.dark_threshold) {
            FramingVerdict::TooDark
        } else {
            FramingVerdict::WellFramed
        }
    }

    /// Position and size checks for one face in a `width` x `height` frame.
    pub fn assess_face(&self, face: &FaceBox, width: u32, height: u32) -> FramingVerdict {
        if width == 0 || height == 0 {
            return FramingVerdict::NoFace;
        }
        let (w, h) = (width as f32, height as f32);
        let (cx, cy) = face.center();

        let offset_x = (cx - w / 2.0).abs() / w;
        let offset_y = (cy - h / 2.0).abs() / h;
        if offset_x >= self.center_tolerance || offset_y >= self.center_tolerance {
            return FramingVerdict::OffCenter;
        }

        let width_ratio = face.width / w;
        let height_ratio = face.height / h;
        if width_ratio < self.min_face_ratio || height_ratio < self.min_face_ratio {
            FramingVerdict::TooSmall
        } else if width_ratio > self.max_face_ratio || height_ratio > self.max_face_ratio {
            FramingVerdict::TooLarge
        } else {
            FramingVerdict::WellFramed
        }
    }
}
