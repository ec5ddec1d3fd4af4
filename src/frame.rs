//! Detection frame model.
//!
//! A `Frame` is one complete snapshot pushed by the detector pipeline: an
//! ordered list of per-detector results. Frames are built only through
//! validation, so a `Frame` value always satisfies:
//!
//! - every confidence lies in `[0, 1]`
//! - every coordinate and extent is finite
//!
//! A single bad detection rejects the entire message. There is no partial
//! acceptance of the detectors that did validate.

use serde::{Deserialize, Serialize};

use crate::error::FrameError;

/// 3D point reported alongside a detection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Axis-aligned box in surface coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_offset: f64,
    pub y_offset: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x_offset: f64, y_offset: f64, width: f64, height: f64) -> Self {
        Self {
            x_offset,
            y_offset,
            width,
            height,
        }
    }

    /// True when the box covers no area.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }
}

/// One recognised object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label (person, car, ...).
    pub cls: String,
    /// Detector confidence (0.0-1.0).
    pub confidence: f64,
    pub point: Point,
    pub bounding_box: BoundingBox,
}

/// One named detector's detections within a frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectorResult {
    pub detector_name: String,
    pub detections: Vec<Detection>,
}

/// Complete, validated snapshot of every detector's output.
///
/// Immutable once constructed; consumers only ever see it by shared reference.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Frame {
    results: Vec<DetectorResult>,
}

impl Frame {
    /// Validate and wrap detector results.
    pub fn new(results: Vec<DetectorResult>) -> Result<Self, FrameError> {
        for result in &results {
            validate_result(result)?;
        }
        Ok(Self { results })
    }

    /// The sentinel frame: no detector results at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse one stream message body.
    ///
    /// The wire format is a JSON array of detector results. Unknown fields
    /// are ignored; missing fields are errors.
    pub fn parse(payload: &str) -> Result<Self, FrameError> {
        let results: Vec<DetectorResult> = serde_json::from_str(payload)?;
        Self::new(results)
    }

    pub fn results(&self) -> &[DetectorResult] {
        &self.results
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Total detections across all detectors.
    pub fn detection_count(&self) -> usize {
        self.results.iter().map(|r| r.detections.len()).sum()
    }

    /// Every detection in frame order, paired with its detector.
    pub fn detections(&self) -> impl Iterator<Item = (&DetectorResult, &Detection)> + '_ {
        self.results
            .iter()
            .flat_map(|result| result.detections.iter().map(move |d| (result, d)))
    }
}

fn validate_result(result: &DetectorResult) -> Result<(), FrameError> {
    for (index, detection) in result.detections.iter().enumerate() {
        let non_finite = |field: &'static str| FrameError::NonFinite {
            detector: result.detector_name.clone(),
            index,
            field,
        };

        if !detection.confidence.is_finite() {
            return Err(non_finite("confidence"));
        }
        if !(0.0..=1.0).contains(&detection.confidence) {
            return Err(FrameError::ConfidenceOutOfRange {
                detector: result.detector_name.clone(),
                index,
                value: detection.confidence,
            });
        }

        let Point { x, y, z } = detection.point;
        for (field, value) in [("point.x", x), ("point.y", y), ("point.z", z)] {
            if !value.is_finite() {
                return Err(non_finite(field));
            }
        }

        let bbox = detection.bounding_box;
        for (field, value) in [
            ("bounding_box.x_offset", bbox.x_offset),
            ("bounding_box.y_offset", bbox.y_offset),
            ("bounding_box.width", bbox.width),
            ("bounding_box.height", bbox.height),
        ] {
            if !value.is_finite() {
                return Err(non_finite(field));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_DETECTORS: &str = r#"[
        {
            "detector_name": "yolo",
            "detections": [
                {
                    "cls": "person",
                    "confidence": 0.8765,
                    "point": {"x": 1.0, "y": 2.0, "z": 3.5},
                    "bounding_box": {"x_offset": 10, "y_offset": 20, "width": 30, "height": 40}
                },
                {
                    "cls": "dog",
                    "confidence": 0.5,
                    "point": {"x": 0, "y": 0, "z": 0},
                    "bounding_box": {"x_offset": 100, "y_offset": 120, "width": 15, "height": 10},
                    "track_id": 7
                }
            ]
        },
        {
            "detector_name": "depth",
            "detections": []
        }
    ]"#;

    #[test]
    fn parse_wire_frame_succeeds() {
        let frame = Frame::parse(TWO_DETECTORS).unwrap();
        assert_eq!(frame.results().len(), 2);
        assert_eq!(frame.detection_count(), 2);
        assert_eq!(frame.results()[0].detector_name, "yolo");
        assert_eq!(frame.results()[1].detector_name, "depth");

        let first = &frame.results()[0].detections[0];
        assert_eq!(first.cls, "person");
        assert_eq!(first.point.z, 3.5);
        assert_eq!(first.bounding_box, BoundingBox::new(10.0, 20.0, 30.0, 40.0));
    }

    #[test]
    fn detections_iterate_in_frame_order() {
        let frame = Frame::parse(TWO_DETECTORS).unwrap();
        let classes: Vec<&str> = frame.detections().map(|(_, d)| d.cls.as_str()).collect();
        assert_eq!(classes, vec!["person", "dog"]);
    }

    #[test]
    fn empty_array_is_a_valid_empty_frame() {
        let frame = Frame::parse("[]").unwrap();
        assert!(frame.is_empty());
        assert_eq!(frame, Frame::empty());
    }

    #[test]
    fn confidence_out_of_range_rejects_whole_frame() {
        let payload = r#"[
            {"detector_name": "ok", "detections": []},
            {"detector_name": "bad", "detections": [
                {"cls": "car", "confidence": 1.2,
                 "point": {"x": 0, "y": 0, "z": 0},
                 "bounding_box": {"x_offset": 0, "y_offset": 0, "width": 1, "height": 1}}
            ]}
        ]"#;
        let err = Frame::parse(payload).unwrap_err();
        match err {
            FrameError::ConfidenceOutOfRange {
                detector,
                index,
                value,
            } => {
                assert_eq!(detector, "bad");
                assert_eq!(index, 0);
                assert!((value - 1.2).abs() < f64::EPSILON);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn confidence_bounds_are_inclusive() {
        for confidence in [0.0, 1.0] {
            let payload = format!(
                r#"[{{"detector_name": "d", "detections": [
                    {{"cls": "x", "confidence": {confidence},
                      "point": {{"x": 0, "y": 0, "z": 0}},
                      "bounding_box": {{"x_offset": 0, "y_offset": 0, "width": 0, "height": 0}}}}
                ]}}]"#
            );
            assert!(Frame::parse(&payload).is_ok(), "confidence {confidence}");
        }
    }

    #[test]
    fn missing_field_is_rejected() {
        let payload = r#"[{"detector_name": "d", "detections": [
            {"cls": "x", "confidence": 0.3, "point": {"x": 0, "y": 0, "z": 0}}
        ]}]"#;
        assert!(matches!(Frame::parse(payload), Err(FrameError::Json(_))));
    }

    #[test]
    fn missing_detections_is_rejected() {
        let payload = r#"[
            {"detector_name": "ok", "detections": []},
            {"detector_name": "no-list"}
        ]"#;
        let err = Frame::parse(payload).unwrap_err();
        assert!(matches!(err, FrameError::Json(_)));
        assert!(err.to_string().contains("detections"));
    }

    #[test]
    fn degenerate_box_has_no_area() {
        assert!(BoundingBox::new(5.0, 5.0, 0.0, 10.0).is_degenerate());
        assert!(BoundingBox::new(5.0, 5.0, 10.0, 0.0).is_degenerate());
        assert!(!BoundingBox::new(5.0, 5.0, -3.0, 2.0).is_degenerate());
    }

    #[test]
    fn non_array_payload_is_rejected() {
        assert!(Frame::parse(r#"{"detector_name": "d"}"#).is_err());
        assert!(Frame::parse("not json").is_err());
    }

    #[test]
    fn non_finite_geometry_is_rejected() {
        let result = DetectorResult {
            detector_name: "synthetic".to_string(),
            detections: vec![Detection {
                cls: "x".to_string(),
                confidence: 0.5,
                point: Point::default(),
                bounding_box: BoundingBox::new(0.0, f64::NAN, 1.0, 1.0),
            }],
        };
        let err = Frame::new(vec![result]).unwrap_err();
        assert!(err.to_string().contains("bounding_box.y_offset"));
    }

    #[test]
    fn frame_serializes_back_to_wire_shape() {
        let frame = Frame::parse(TWO_DETECTORS).unwrap();
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.starts_with('['));
        assert_eq!(Frame::parse(&json).unwrap(), frame);
    }
}
