//! Shared value types: analysis kinds, preview frames and detector results.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One of the independent per-frame analysis features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// Multi-format barcode scan over the scan area
    BarcodeScan,
    /// ML barcode detection, optionally on an inverted frame
    GoogleBarcode,
    Face,
    Text,
    Label,
    Object,
    Pose,
}

impl AnalysisKind {
    pub const COUNT: usize = 7;

    /// Order in which the dispatcher visits kinds on every frame.
    pub const DISPATCH_ORDER: [AnalysisKind; AnalysisKind::COUNT] = [
        AnalysisKind::BarcodeScan,
        AnalysisKind::Face,
        AnalysisKind::GoogleBarcode,
        AnalysisKind::Text,
        AnalysisKind::Label,
        AnalysisKind::Object,
        AnalysisKind::Pose,
    ];

    /// Dense index used by per-kind tables.
    pub fn index(self) -> usize {
        match self {
            AnalysisKind::BarcodeScan => 0,
            AnalysisKind::GoogleBarcode => 1,
            AnalysisKind::Face => 2,
            AnalysisKind::Text => 3,
            AnalysisKind::Label => 4,
            AnalysisKind::Object => 5,
            AnalysisKind::Pose => 6,
        }
    }

    pub fn all() -> impl Iterator<Item = AnalysisKind> {
        Self::DISPATCH_ORDER.into_iter()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisKind::BarcodeScan => "barcode_scan",
            AnalysisKind::GoogleBarcode => "google_barcode",
            AnalysisKind::Face => "face",
            AnalysisKind::Text => "text",
            AnalysisKind::Label => "label",
            AnalysisKind::Object => "object",
            AnalysisKind::Pose => "pose",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::all().find(|k| k.as_str() == s)
    }

    /// Barcode kinds may carry the source frame as a JPEG in their events.
    pub fn is_barcode(self) -> bool {
        matches!(self, AnalysisKind::BarcodeScan | AnalysisKind::GoogleBarcode)
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Small set of analysis kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KindSet(u8);

impl KindSet {
    pub const fn empty() -> Self {
        KindSet(0)
    }

    pub fn insert(&mut self, kind: AnalysisKind) {
        self.0 |= 1 << kind.index();
    }

    pub fn remove(&mut self, kind: AnalysisKind) {
        self.0 &= !(1 << kind.index());
    }

    pub fn contains(&self, kind: AnalysisKind) -> bool {
        self.0 & (1 << kind.index()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = AnalysisKind> + '_ {
        AnalysisKind::all().filter(move |k| self.contains(*k))
    }
}

impl FromIterator<AnalysisKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = AnalysisKind>>(iter: I) -> Self {
        let mut set = KindSet::empty();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

/// A preview frame in NV21 layout.
///
/// The buffer is shared between every task dispatched for the frame and is
/// never mutated; tasks that need different bytes get their own copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub rotation: i32,
}

impl Frame {
    pub fn new(data: impl Into<Bytes>, width: u32, height: u32, rotation: i32) -> Self {
        Self {
            data: data.into(),
            width,
            height,
            rotation,
        }
    }

    /// Smallest NV21 buffer for `width x height`, rounded up.
    pub fn min_nv21_len(width: u32, height: u32) -> usize {
        let pixels = width as u64 * height as u64;
        ((pixels * 3 + 1) / 2) as usize
    }

    /// `len >= 1.5 * width * height`, evaluated without floating point.
    pub fn is_valid(&self) -> bool {
        let pixels = self.width as u64 * self.height as u64;
        (self.data.len() as u64) * 2 >= pixels * 3
    }

    /// Private copy with every byte complemented.
    pub fn inverted(&self) -> Frame {
        let data: Vec<u8> = self.data.iter().map(|b| !b).collect();
        Frame {
            data: Bytes::from(data),
            width: self.width,
            height: self.height,
            rotation: self.rotation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    #[default]
    Back,
    Front,
}

/// Normalized rectangle of interest for the barcode scanner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanArea {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// View state sampled by the dispatcher on every frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewGeometry {
    pub density: f32,
    pub facing: Facing,
    pub view_width: u32,
    pub view_height: u32,
    pub padding_x: i32,
    pub padding_y: i32,
    pub aspect_ratio: f32,
    pub scan_area: Option<ScanArea>,
    pub camera_view_width: u32,
    pub camera_view_height: u32,
}

impl Default for ViewGeometry {
    fn default() -> Self {
        Self {
            density: 1.0,
            facing: Facing::Back,
            view_width: 0,
            view_height: 0,
            padding_x: 0,
            padding_y: 0,
            aspect_ratio: 4.0 / 3.0,
            scan_area: None,
            camera_view_width: 0,
            camera_view_height: 0,
        }
    }
}

/// Parameters handed to a detector alongside the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisParams {
    pub rotation: i32,
    pub density: f32,
    pub facing: Facing,
    pub view_width: u32,
    pub view_height: u32,
    pub padding_x: i32,
    pub padding_y: i32,
    /// Only set for `BarcodeScan`.
    pub scan: Option<ScanParams>,
    /// The frame bytes were complemented before analysis.
    pub inverted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanParams {
    pub area: Option<ScanArea>,
    pub camera_view_width: u32,
    pub camera_view_height: u32,
    pub aspect_ratio: f32,
}

impl AnalysisParams {
    pub fn for_kind(kind: AnalysisKind, frame: &Frame, view: &ViewGeometry) -> Self {
        let scan = (kind == AnalysisKind::BarcodeScan).then(|| ScanParams {
            area: view.scan_area,
            camera_view_width: view.camera_view_width,
            camera_view_height: view.camera_view_height,
            aspect_ratio: view.aspect_ratio,
        });
        Self {
            rotation: frame.rotation,
            density: view.density,
            facing: view.facing,
            view_width: view.view_width,
            view_height: view.view_height,
            padding_x: view.padding_x,
            padding_y: view.padding_y,
            scan,
            inverted: false,
        }
    }
}

/// A rectangular region within a frame, normalized to 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl FrameRegion {
    /// Normalize a pixel rectangle against a frame's dimensions.
    pub fn from_pixels(x: u32, y: u32, width: u32, height: u32, frame_width: u32, frame_height: u32) -> Self {
        let fw = frame_width.max(1) as f32;
        let fh = frame_height.max(1) as f32;
        Self {
            x: x as f32 / fw,
            y: y as f32 / fh,
            width: width as f32 / fw,
            height: height as f32 / fh,
        }
    }
}

/// One detected item: a barcode, a face, a text block, a label, ...
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Barcode format or object class
    pub format: Option<String>,
    /// Decoded payload or recognized text
    pub value: Option<String>,
    pub bounds: Option<FrameRegion>,
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl Detection {
    pub fn with_value(format: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            format: Some(format.into()),
            value: Some(value.into()),
            ..Default::default()
        }
    }
}

/// Output of a successful `analyze` call. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub detections: Vec<Detection>,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl DetectionResult {
    pub fn empty(frame: &Frame) -> Self {
        Self {
            detections: Vec::new(),
            frame_width: frame.width,
            frame_height: frame.height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_indices_are_dense() {
        let mut seen = [false; AnalysisKind::COUNT];
        for kind in AnalysisKind::all() {
            assert!(!seen[kind.index()]);
            seen[kind.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_kind_parse_roundtrip() {
        for kind in AnalysisKind::all() {
            assert_eq!(AnalysisKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(AnalysisKind::parse("gesture"), None);
    }

    #[test]
    fn test_kind_set_iterates_in_dispatch_order() {
        let set: KindSet = [AnalysisKind::Pose, AnalysisKind::BarcodeScan, AnalysisKind::GoogleBarcode]
            .into_iter()
            .collect();
        let order: Vec<_> = set.iter().collect();
        assert_eq!(
            order,
            vec![AnalysisKind::BarcodeScan, AnalysisKind::GoogleBarcode, AnalysisKind::Pose]
        );
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_frame_validity_boundary() {
        // 4x4 frame needs 24 bytes
        assert!(!Frame::new(vec![0u8; 23], 4, 4, 0).is_valid());
        assert!(Frame::new(vec![0u8; 24], 4, 4, 0).is_valid());
        assert_eq!(Frame::min_nv21_len(4, 4), 24);
        // odd pixel count rounds up: 3x3 -> 13.5 -> 14
        assert_eq!(Frame::min_nv21_len(3, 3), 14);
        assert!(!Frame::new(vec![0u8; 13], 3, 3, 0).is_valid());
        assert!(Frame::new(vec![0u8; 14], 3, 3, 0).is_valid());
    }

    #[test]
    fn test_inverted_is_private_copy() {
        let frame = Frame::new(vec![0x00u8, 0xff, 0x0f], 1, 1, 90);
        let inverted = frame.inverted();
        assert_eq!(&inverted.data[..], &[0xff, 0x00, 0xf0]);
        assert_eq!(&frame.data[..], &[0x00, 0xff, 0x0f]);
        assert_eq!(inverted.rotation, 90);
    }

    #[test]
    fn test_region_from_pixels_is_normalized() {
        let region = FrameRegion::from_pixels(160, 120, 320, 240, 640, 480);
        assert_eq!(
            region,
            FrameRegion {
                x: 0.25,
                y: 0.25,
                width: 0.5,
                height: 0.5
            }
        );
        assert_eq!(FrameRegion::from_pixels(1, 1, 1, 1, 0, 0).width, 1.0);
    }

    #[test]
    fn test_scan_params_only_for_barcode_scan() {
        let frame = Frame::new(vec![0u8; 6], 2, 2, 0);
        let view = ViewGeometry::default();
        assert!(AnalysisParams::for_kind(AnalysisKind::BarcodeScan, &frame, &view).scan.is_some());
        assert!(AnalysisParams::for_kind(AnalysisKind::Face, &frame, &view).scan.is_none());
    }
}
