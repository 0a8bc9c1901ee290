#[cfg(test)]
mod error_tests {
    use crabscan::errors::{CameraError, CaptureError, DetectorError, RecordingError};
    use crabscan::AnalysisKind;
    use std::error::Error;

    #[test]
    fn test_camera_error_variants_display() {
        let errors = vec![
            (CameraError::InitializationError("a".into()), "Camera initialization error: a"),
            (CameraError::CaptureError("b".into()), "Capture error: b"),
            (CameraError::RecordingError("c".into()), "Recording error: c"),
            (CameraError::ConfigError("e".into()), "Configuration error: e"),
            (CameraError::IoError("f".into()), "IO error: f"),
        ];

        for (error, expected) in errors {
            assert_eq!(error.to_string(), expected);
            assert!(error.source().is_none());
        }
    }

    #[test]
    fn test_detector_error_names_its_kind() {
        for kind in AnalysisKind::all() {
            let failed = DetectorError::failed(kind, "boom");
            let panicked = DetectorError::Panicked {
                kind,
                message: "boom".into(),
            };

            for error in [failed, panicked] {
                assert_eq!(error.kind(), kind);
                assert!(error.to_string().contains(kind.as_str()));
            }
        }
    }

    #[test]
    fn test_every_capture_error_has_a_code() {
        let errors = [
            CaptureError::QueueDesynchronization,
            CaptureError::CaptureStartFailure("Take picture failed: busy".into()),
            CaptureError::Cancelled,
            CaptureError::Pipeline("decode".into()),
        ];
        let codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(
            codes,
            ["E_QUEUE_DESYNC", "E_TAKE_PICTURE_FAILED", "E_CANCELLED", "E_PICTURE_PIPELINE"]
        );
        assert_eq!(errors[1].to_string(), "Take picture failed: busy");
    }

    #[test]
    fn test_recording_error_messages() {
        assert_eq!(
            RecordingError::NotRecording.to_string(),
            "Couldn't stop recording - there is none in progress"
        );
        assert_eq!(RecordingError::Cancelled.code(), CaptureError::Cancelled.code());
    }

    #[test]
    fn test_errors_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<CameraError>();
        assert_send_sync::<CaptureError>();
        assert_send_sync::<DetectorError>();
        assert_send_sync::<RecordingError>();
    }

    #[test]
    fn test_errors_convert_to_anyhow() {
        let result: anyhow::Result<()> = Err(CaptureError::QueueDesynchronization.into());
        let error = result.unwrap_err();
        assert!(error.downcast_ref::<CaptureError>().is_some());
    }
}

#[cfg(test)]
mod event_serialization_tests {
    use crabscan::errors::DetectorError;
    use crabscan::types::Detection;
    use crabscan::{AnalysisKind, CameraEvent, DetectionResult};

    #[test]
    fn test_analysis_event_json_shape() {
        let event = CameraEvent::Analysis {
            kind: AnalysisKind::BarcodeScan,
            result: DetectionResult {
                detections: vec![Detection::with_value("QR_CODE", "hello")],
                frame_width: 640,
                frame_height: 480,
            },
            image: None,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "analysis");
        assert_eq!(json["result"]["frame_width"], 640);
        assert!(json.get("image").is_none());
        assert_eq!(event.name(), "onBarCodeRead");
    }

    #[test]
    fn test_error_event_carries_message() {
        let error = DetectorError::failed(AnalysisKind::Pose, "out of memory");
        let event = CameraEvent::AnalysisError {
            kind: error.kind(),
            message: error.to_string(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "analysis_error");
        assert!(json["message"].as_str().unwrap().contains("out of memory"));
        assert_eq!(event.name(), "onPoseDetectionError");
    }
}
