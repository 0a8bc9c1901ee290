//! Configuration management for CrabScan
//!
//! Provides loading, saving and validation of the analysis feature flags,
//! barcode and face detector options, still-capture defaults and the size
//! of the analysis worker pool.

use crate::analysis::{DetectorSettings, FaceMode, InversionMode};
use crate::capture::CaptureOptions;
use crate::errors::CameraError;
use crate::types::AnalysisKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub analysis: AnalysisConfig,
    pub barcode: BarcodeConfig,
    pub face: FaceConfig,
    pub capture: CaptureConfig,
    pub runtime: RuntimeConfig,
}

/// Which analysis kinds run on preview frames
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub barcode_scan: bool,
    pub google_barcode: bool,
    pub face: bool,
    pub text: bool,
    pub label: bool,
    pub object: bool,
    pub pose: bool,
}

impl AnalysisConfig {
    pub fn is_enabled(&self, kind: AnalysisKind) -> bool {
        match kind {
            AnalysisKind::BarcodeScan => self.barcode_scan,
            AnalysisKind::GoogleBarcode => self.google_barcode,
            AnalysisKind::Face => self.face,
            AnalysisKind::Text => self.text,
            AnalysisKind::Label => self.label,
            AnalysisKind::Object => self.object,
            AnalysisKind::Pose => self.pose,
        }
    }

    pub fn set(&mut self, kind: AnalysisKind, enabled: bool) {
        let flag = match kind {
            AnalysisKind::BarcodeScan => &mut self.barcode_scan,
            AnalysisKind::GoogleBarcode => &mut self.google_barcode,
            AnalysisKind::Face => &mut self.face,
            AnalysisKind::Text => &mut self.text,
            AnalysisKind::Label => &mut self.label,
            AnalysisKind::Object => &mut self.object,
            AnalysisKind::Pose => &mut self.pose,
        };
        *flag = enabled;
    }
}

/// Barcode scanning options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarcodeConfig {
    /// Allowed formats for scanned barcodes; unset accepts all
    pub types: Option<Vec<String>>,
    /// Inversion of frames given to the ML barcode detector
    pub inversion_mode: InversionMode,
    /// Format bitmask for the ML barcode detector (0 = all)
    pub detector_formats: u32,
    /// Attach a JPEG of the analysed frame to barcode events
    pub detected_image_in_event: bool,
}

/// Face detector options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceConfig {
    pub mode: FaceMode,
    pub landmarks: bool,
    pub classifications: bool,
    pub tracking: bool,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            mode: FaceMode::Fast,
            landmarks: false,
            classifications: false,
            tracking: true,
        }
    }
}

/// Still capture defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Where pictures and videos go when the caller does not say
    pub output_directory: String,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    pub fast_mode: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            output_directory: "./captures".to_string(),
            jpeg_quality: 95,
            fast_mode: false,
        }
    }
}

impl CaptureConfig {
    pub fn default_options(&self) -> CaptureOptions {
        CaptureOptions {
            fast_mode: self.fast_mode,
            quality: self.jpeg_quality,
            ..CaptureOptions::default()
        }
    }
}

/// Analysis worker pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Blocking threads available to detectors. The picture pipeline runs
    /// on a separate pool.
    pub worker_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: AnalysisKind::COUNT,
        }
    }
}

impl ScanConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CameraError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: ScanConfig = toml::from_str(&contents)
            .map_err(|e| CameraError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CameraError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| CameraError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| CameraError::ConfigError(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("crabscan.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.capture.jpeg_quality == 0 || self.capture.jpeg_quality > 100 {
            return Err("JPEG quality must be between 1 and 100".to_string());
        }
        if self.capture.output_directory.trim().is_empty() {
            return Err("Output directory must not be empty".to_string());
        }
        if self.runtime.worker_threads == 0 || self.runtime.worker_threads > 512 {
            return Err("Worker threads must be between 1 and 512".to_string());
        }
        if let Some(types) = &self.barcode.types {
            if types.iter().any(|t| t.trim().is_empty()) {
                return Err("Barcode types must not contain empty names".to_string());
            }
        }
        Ok(())
    }

    pub fn enabled_kinds(&self) -> Vec<AnalysisKind> {
        AnalysisKind::all()
            .filter(|k| self.analysis.is_enabled(*k))
            .collect()
    }

    pub fn detector_settings(&self) -> DetectorSettings {
        DetectorSettings {
            face_mode: self.face.mode,
            face_landmarks: self.face.landmarks,
            face_classifications: self.face.classifications,
            face_tracking: self.face.tracking,
            barcode_formats: self.barcode.detector_formats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert!(config.enabled_kinds().is_empty());
        assert_eq!(config.capture.jpeg_quality, 95);
        assert_eq!(config.barcode.inversion_mode, InversionMode::Normal);
        assert!(config.face.tracking);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut bad_quality = ScanConfig::default();
        bad_quality.capture.jpeg_quality = 0;
        assert!(bad_quality.validate().is_err());

        let mut bad_threads = ScanConfig::default();
        bad_threads.runtime.worker_threads = 0;
        assert!(bad_threads.validate().is_err());

        let mut bad_types = ScanConfig::default();
        bad_types.barcode.types = Some(vec!["QR_CODE".into(), " ".into()]);
        assert!(bad_types.validate().is_err());
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("nested").join("crabscan.toml");

        let mut config = ScanConfig::default();
        config.analysis.set(AnalysisKind::Face, true);
        config.barcode.inversion_mode = InversionMode::Alternate;
        config.barcode.types = Some(vec!["QR_CODE".to_string()]);
        config.save_to_file(&config_path).unwrap();

        let loaded = ScanConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.enabled_kinds(), vec![AnalysisKind::Face]);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ScanConfig = toml::from_str(
            r#"
            [analysis]
            google_barcode = true

            [barcode]
            inversion_mode = "inverted"
            "#,
        )
        .unwrap();
        assert!(config.analysis.google_barcode);
        assert!(!config.analysis.face);
        assert_eq!(config.barcode.inversion_mode, InversionMode::Inverted);
        assert_eq!(config.capture, CaptureConfig::default());
    }

    #[test]
    fn test_config_toml_format() {
        let toml_string = toml::to_string_pretty(&ScanConfig::default()).unwrap();
        assert!(toml_string.contains("[analysis]"));
        assert!(toml_string.contains("[barcode]"));
        assert!(toml_string.contains("[face]"));
        assert!(toml_string.contains("[capture]"));
        assert!(toml_string.contains("[runtime]"));
        assert!(toml_string.contains("inversion_mode"));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ScanConfig::load_from_file("nonexistent_file.toml");
        assert_eq!(result.unwrap(), ScanConfig::default());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[capture\njpeg_quality = ").unwrap();
        assert!(matches!(
            ScanConfig::load_from_file(&path),
            Err(CameraError::ConfigError(_))
        ));
    }

    #[test]
    fn test_detector_settings_from_config() {
        let mut config = ScanConfig::default();
        config.face.mode = FaceMode::Accurate;
        config.barcode.detector_formats = 256;
        let settings = config.detector_settings();
        assert_eq!(settings.face_mode, FaceMode::Accurate);
        assert_eq!(settings.barcode_formats, 256);
    }
}
