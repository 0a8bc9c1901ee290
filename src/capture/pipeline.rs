//! Decode/save pipeline for delivered still pictures.

use super::request::{CaptureOptions, PictureResult};
use crate::errors::CaptureError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::fs::{self, File};
use image::RgbImage;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Turns the raw bytes the camera delivered into a saved picture.
///
/// Runs on a blocking worker; implementations may do file I/O.
pub trait PicturePipeline: Send + Sync {
    fn process(
        &self,
        raw: &[u8],
        device_orientation: i32,
        options: &CaptureOptions,
        destination: &Path,
    ) -> Result<PictureResult, CaptureError>;
}

/// Decodes any format `image` understands and writes
/// `destination/<uuid>.jpg`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegFilePipeline;

impl JpegFilePipeline {
    pub fn new() -> Self {
        Self
    }

    fn transform(img: DynamicImage, device_orientation: i32, options: &CaptureOptions) -> DynamicImage {
        let mut img = if options.fix_orientation {
            rotate(img, device_orientation)
        } else {
            img
        };

        if options.mirror_image {
            img = img.fliph();
        }

        match options.width {
            Some(width) if width > 0 && width < img.width() => {
                let height = ((img.height() as u64 * width as u64) / img.width() as u64).max(1) as u32;
                img.resize_exact(width, height, FilterType::Triangle)
            }
            _ => img,
        }
    }
}

/// Encode `rgb` into `out`. Errors from the final flush are reported, not
/// left to `BufWriter`'s drop.
fn write_jpeg<W: Write>(rgb: &RgbImage, quality: u8, out: W) -> Result<(), CaptureError> {
    let mut writer = BufWriter::new(out);
    JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100))
        .encode_image(rgb)
        .map_err(|e| CaptureError::Pipeline(format!("JPEG encode failed: {}", e)))?;
    writer
        .flush()
        .map_err(|e| CaptureError::Pipeline(format!("JPEG write failed: {}", e)))
}

fn rotate(img: DynamicImage, degrees: i32) -> DynamicImage {
    match degrees.rem_euclid(360) {
        90 => img.rotate90(),
        180 => img.rotate180(),
        270 => img.rotate270(),
        _ => img,
    }
}

impl PicturePipeline for JpegFilePipeline {
    fn process(
        &self,
        raw: &[u8],
        device_orientation: i32,
        options: &CaptureOptions,
        destination: &Path,
    ) -> Result<PictureResult, CaptureError> {
        let decoded = image::load_from_memory(raw)
            .map_err(|e| CaptureError::Pipeline(format!("failed to decode picture: {}", e)))?;
        let img = Self::transform(decoded, device_orientation, options);

        fs::create_dir_all(destination).map_err(|e| {
            CaptureError::Pipeline(format!("failed to create {}: {}", destination.display(), e))
        })?;
        let path = destination.join(format!("{}.jpg", uuid::Uuid::new_v4()));
        let file = File::create(&path)
            .map_err(|e| CaptureError::Pipeline(format!("failed to create {}: {}", path.display(), e)))?;

        let rgb = img.to_rgb8();
        if let Err(e) = write_jpeg(&rgb, options.quality, file) {
            if let Err(remove) = fs::remove_file(&path) {
                log::warn!("could not remove partial picture {}: {}", path.display(), remove);
            }
            return Err(e);
        }

        log::info!("Picture saved to {}", path.display());
        Ok(PictureResult {
            uri: format!("file://{}", path.display()),
            width: rgb.width(),
            height: rgb.height(),
            device_orientation,
            picture_orientation: if options.fix_orientation { 0 } else { device_orientation },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use std::io::{self, Cursor};

    /// Accepts `room` bytes, then fails like a full disk.
    struct FullDisk {
        room: usize,
        written: usize,
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let left = self.room - self.written;
            if left == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "No space left on device"));
            }
            let n = buf.len().min(left);
            self.written += n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([200, 10, 10]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_writes_jpeg_into_destination() {
        let dir = tempfile::tempdir().unwrap();
        let result = JpegFilePipeline::new()
            .process(&png(8, 4), 0, &CaptureOptions::default(), dir.path())
            .unwrap();
        assert_eq!((result.width, result.height), (8, 4));
        assert!(result.uri.starts_with("file://"));
        assert!(result.uri.ends_with(".jpg"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_fix_orientation_rotates() {
        let dir = tempfile::tempdir().unwrap();
        let options = CaptureOptions {
            fix_orientation: true,
            ..Default::default()
        };
        let result = JpegFilePipeline::new()
            .process(&png(8, 4), 90, &options, dir.path())
            .unwrap();
        assert_eq!((result.width, result.height), (4, 8));
        assert_eq!(result.device_orientation, 90);
        assert_eq!(result.picture_orientation, 0);
    }

    #[test]
    fn test_width_scales_down_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = CaptureOptions {
            width: Some(4),
            ..Default::default()
        };
        let result = JpegFilePipeline::new()
            .process(&png(8, 6), 0, &options, dir.path())
            .unwrap();
        assert_eq!((result.width, result.height), (4, 3));

        options.width = Some(100);
        let result = JpegFilePipeline::new()
            .process(&png(8, 6), 0, &options, dir.path())
            .unwrap();
        assert_eq!(result.width, 8);
    }

    #[test]
    fn test_write_that_runs_out_of_space_fails() {
        let rgb = RgbImage::from_fn(64, 64, |x, y| image::Rgb([(x * 4) as u8, (y * 4) as u8, 90]));
        let mut encoded = Vec::new();
        write_jpeg(&rgb, 90, &mut encoded).unwrap();

        // the tail of the picture only reaches the disk on the final flush
        let disk = FullDisk {
            room: encoded.len() - 1,
            written: 0,
        };
        let err = write_jpeg(&rgb, 90, disk).unwrap_err();
        assert_eq!(err.code(), "E_PICTURE_PIPELINE");
        assert!(err.to_string().contains("No space left"));
    }

    #[test]
    fn test_garbage_bytes_fail() {
        let dir = tempfile::tempdir().unwrap();
        let err = JpegFilePipeline::new()
            .process(b"not an image", 0, &CaptureOptions::default(), dir.path())
            .unwrap_err();
        assert_eq!(err.code(), "E_PICTURE_PIPELINE");
    }
}
