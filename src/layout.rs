//! Letterboxing the camera preview inside its view.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn of(width: u32, height: u32) -> Self {
        if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

/// Size of the preview surface and its offset inside the view.
///
/// Padding is negative when the preview overflows the view on that axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewLayout {
    pub preview_width: i32,
    pub preview_height: i32,
    pub padding_x: i32,
    pub padding_y: i32,
}

impl PreviewLayout {
    /// `aspect_ratio` is the camera's long side over its short side.
    pub fn compute(view_width: u32, view_height: u32, aspect_ratio: f32, orientation: Orientation) -> Self {
        let w = view_width as f32;
        let h = view_height as f32;
        let ratio = if aspect_ratio > 0.0 { aspect_ratio } else { 1.0 };

        let (pw, ph) = match orientation {
            Orientation::Landscape => {
                if ratio * h < w {
                    (w, w / ratio)
                } else {
                    (h * ratio, h)
                }
            }
            Orientation::Portrait => {
                if ratio * w > h {
                    (w, w * ratio)
                } else {
                    (h / ratio, h)
                }
            }
        };

        let preview_width = pw.round() as i32;
        let preview_height = ph.round() as i32;
        Self {
            preview_width,
            preview_height,
            padding_x: (view_width as i32 - preview_width) / 2,
            padding_y: (view_height as i32 - preview_height) / 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portrait_fills_width() {
        // 4:3 sensor in a 300x600 view: 300 * 4/3 = 400 < 600, so fill height
        let layout = PreviewLayout::compute(300, 600, 4.0 / 3.0, Orientation::Portrait);
        assert_eq!(layout.preview_height, 600);
        assert_eq!(layout.preview_width, 450);
        assert_eq!(layout.padding_x, -75);
        assert_eq!(layout.padding_y, 0);
    }

    #[test]
    fn test_portrait_overflows_height() {
        let layout = PreviewLayout::compute(600, 700, 4.0 / 3.0, Orientation::Portrait);
        assert_eq!((layout.preview_width, layout.preview_height), (600, 800));
        assert_eq!(layout.padding_y, -50);
    }

    #[test]
    fn test_landscape() {
        let layout = PreviewLayout::compute(800, 400, 16.0 / 9.0, Orientation::Landscape);
        // 16/9 * 400 = 711 < 800, so fill width
        assert_eq!(layout.preview_width, 800);
        assert_eq!(layout.preview_height, 450);
        assert_eq!(layout.padding_y, -25);

        let layout = PreviewLayout::compute(600, 400, 16.0 / 9.0, Orientation::Landscape);
        assert_eq!(layout.preview_height, 400);
        assert_eq!(layout.preview_width, 711);
    }

    #[test]
    fn test_orientation_of() {
        assert_eq!(Orientation::of(10, 5), Orientation::Landscape);
        assert_eq!(Orientation::of(5, 5), Orientation::Portrait);
    }
}
