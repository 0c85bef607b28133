/*!
 * Presentation adapter: slide -> shape -> text frame paragraph.
 */

use serde::{Deserialize, Serialize};

use super::text::Paragraph;
use super::{FormatAdapter, decode_json, encode_json};
use crate::document::{FormatKind, Segment, SegmentLocation, SegmentStatus};
use crate::errors::{ExtractionError, ReassemblyError};

/// Logical presentation snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PresentationBody {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub encrypted: bool,

    /// Slide size and theme, carried unchanged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,

    #[serde(default)]
    pub slides: Vec<Slide>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Slide {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,

    #[serde(default)]
    pub shapes: Vec<Shape>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Text {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        geometry: Option<serde_json::Value>,
        #[serde(default)]
        paragraphs: Vec<Paragraph>,
    },
    Picture {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        geometry: Option<serde_json::Value>,
    },
}

/// Adapter for presentations
#[derive(Debug, Clone, Copy, Default)]
pub struct PresentationAdapter;

impl FormatAdapter for PresentationAdapter {
    type Body = PresentationBody;

    fn kind(&self) -> FormatKind {
        FormatKind::Presentation
    }

    fn decode(&self, bytes: &[u8]) -> Result<PresentationBody, ExtractionError> {
        decode_json(self.kind(), bytes)
    }

    fn encode(&self, body: &PresentationBody) -> Result<Vec<u8>, ReassemblyError> {
        encode_json(body)
    }

    fn extract(&self, body: &PresentationBody) -> Vec<Segment> {
        let mut segments = Vec::new();

        for (slide_index, slide) in body.slides.iter().enumerate() {
            for (shape_index, shape) in slide.shapes.iter().enumerate() {
                match shape {
                    Shape::Text { paragraphs, .. } => {
                        for (paragraph_index, paragraph) in paragraphs.iter().enumerate() {
                            let text = paragraph.text();
                            if text.trim().is_empty() {
                                continue;
                            }
                            let location = SegmentLocation::SlideText {
                                slide: slide_index,
                                shape: shape_index,
                                paragraph: paragraph_index,
                            };
                            segments.push(Segment::pending(segments.len(), location, text));
                        }
                    }
                    Shape::Picture { name, .. } => {
                        let location = SegmentLocation::SlidePicture {
                            slide: slide_index,
                            shape: shape_index,
                        };
                        segments.push(Segment::skipped(segments.len(), location, name.clone()));
                    }
                }
            }
        }

        segments
    }

    fn apply(&self, body: &PresentationBody, segments: &[Segment]) -> Result<PresentationBody, ReassemblyError> {
        let mut output = body.clone();

        for segment in segments.iter().filter(|s| s.status() == SegmentStatus::Translated) {
            let missing = || ReassemblyError::MissingPosition {
                index: segment.index,
                location: segment.location.to_string(),
            };

            let SegmentLocation::SlideText { slide, shape, paragraph } = segment.location else {
                return Err(missing());
            };

            let target = match output.slides.get_mut(slide).and_then(|s| s.shapes.get_mut(shape)) {
                Some(Shape::Text { paragraphs, .. }) => paragraphs.get_mut(paragraph),
                _ => None,
            };
            target.ok_or_else(missing)?.set_text(&segment.output_text());
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::text::Run;

    fn deck() -> PresentationBody {
        PresentationBody {
            encrypted: false,
            properties: None,
            slides: vec![
                Slide {
                    layout: Some("Title".to_string()),
                    shapes: vec![Shape::Text {
                        name: "Title 1".to_string(),
                        geometry: Some(serde_json::json!({"x": 10, "y": 10})),
                        paragraphs: vec![Paragraph::from_runs(vec![Run::bold("Welcome")])],
                    }],
                },
                Slide {
                    layout: None,
                    shapes: vec![
                        Shape::Picture {
                            name: "logo.png".to_string(),
                            geometry: None,
                        },
                        Shape::Text {
                            name: "Body".to_string(),
                            geometry: None,
                            paragraphs: vec![
                                Paragraph::from_runs(vec![Run::plain("First point")]),
                                Paragraph::default(),
                                Paragraph::from_runs(vec![Run::plain("Second point")]),
                            ],
                        },
                    ],
                },
            ],
        }
    }

    #[test]
    fn test_extract_shouldWalkSlidesShapesParagraphs() {
        let segments = PresentationAdapter.extract(&deck());

        let texts: Vec<_> = segments.iter().map(|s| s.original.as_str()).collect();
        assert_eq!(texts, vec!["Welcome", "logo.png", "First point", "Second point"]);
        assert_eq!(segments[1].status(), SegmentStatus::Skipped);
        assert_eq!(
            segments[3].location,
            SegmentLocation::SlideText { slide: 1, shape: 1, paragraph: 2 }
        );
    }

    #[test]
    fn test_reassemble_shouldWriteTranslatedParagraphs() {
        let body = deck();
        let mut segments = PresentationAdapter.extract(&body);
        segments[0].mark_translated("환영합니다").unwrap();
        segments[2].mark_translated("첫 번째").unwrap();
        segments[3].mark_failed("quota exhausted").unwrap();

        let bytes = PresentationAdapter.reassemble(&body, &segments).unwrap();
        let output = PresentationAdapter.decode(&bytes).unwrap();

        match &output.slides[0].shapes[0] {
            Shape::Text { paragraphs, geometry, .. } => {
                assert_eq!(paragraphs[0].text(), "환영합니다");
                assert!(paragraphs[0].runs[0].bold);
                assert_eq!(geometry, &Some(serde_json::json!({"x": 10, "y": 10})));
            }
            other => panic!("unexpected shape {:?}", other),
        }
        match &output.slides[1].shapes[1] {
            Shape::Text { paragraphs, .. } => {
                assert_eq!(paragraphs[0].text(), "첫 번째");
                assert_eq!(paragraphs[2].text(), "Second point");
            }
            other => panic!("unexpected shape {:?}", other),
        }
        assert_eq!(output.slides[1].shapes[0], body.slides[1].shapes[0]);
    }
}
