//! Plain-text listing of a frame for operators.

use crate::frame::Frame;
use crate::render::percent;

pub const NO_FRAME: &str = "No detections yet...";
pub const NO_DETECTIONS: &str = "No detections available.";

/// One line per detector heading and per detection.
pub fn describe(frame: &Frame) -> Vec<String> {
    if frame.is_empty() {
        return vec![NO_FRAME.to_string()];
    }

    let mut lines = Vec::new();
    for result in frame.results() {
        lines.push(format!("[{}]", result.detector_name));
        if result.detections.is_empty() {
            lines.push(format!("  {NO_DETECTIONS}"));
            continue;
        }
        for d in &result.detections {
            let p = d.point;
            let b = d.bounding_box;
            lines.push(format!(
                "  class={} confidence={}% position=({}, {}, {}) box=(x: {}, y: {}, w: {}, h: {})",
                d.cls,
                percent(d.confidence, 2),
                p.x,
                p.y,
                p.z,
                b.x_offset,
                b.y_offset,
                b.width,
                b.height
            ));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_frame_says_nothing_yet() {
        assert_eq!(describe(&Frame::empty()), vec![NO_FRAME]);
    }

    #[test]
    fn lists_detectors_and_detections() {
        let frame = Frame::parse(
            r#"[
                {"detector_name": "yolo", "detections": [
                    {"cls": "person", "confidence": 0.8765,
                     "point": {"x": 1.5, "y": 2, "z": -3},
                     "bounding_box": {"x_offset": 10, "y_offset": 20, "width": 30, "height": 40}}
                ]},
                {"detector_name": "idle", "detections": []}
            ]"#,
        )
        .unwrap();
        assert_eq!(
            describe(&frame),
            vec![
                "[yolo]".to_string(),
                "  class=person confidence=87.65% position=(1.5, 2, -3) box=(x: 10, y: 20, w: 30, h: 40)"
                    .to_string(),
                "[idle]".to_string(),
                format!("  {NO_DETECTIONS}"),
            ]
        );
    }
}
