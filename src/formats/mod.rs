/*!
 * Format adapters.
 *
 * Each document kind has an adapter that decodes a logical snapshot of its container,
 * extracts an ordered list of segments and writes translated segments back:
 *
 * - `spreadsheet`: workbooks of sheets and cells
 * - `word`: word-processor bodies of paragraphs, tables and images
 * - `presentation`: slides of text and picture shapes
 * - `pdf_text`: text extracted from PDF pages
 *
 * `LoadedDocument` is the single place where a `FormatKind` is mapped to an adapter.
 */

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::document::{FormatKind, OutputMode, Segment};
use crate::errors::{ExtractionError, ReassemblyError};

pub mod pdf_text;
pub mod presentation;
pub mod spreadsheet;
pub mod summary;
pub mod text;
pub mod word;

pub use self::pdf_text::{PdfTextAdapter, PdfTextBody};
pub use self::presentation::{PresentationAdapter, PresentationBody};
pub use self::spreadsheet::{SpreadsheetAdapter, Workbook};
pub use self::word::{WordAdapter, WordDocument};

/// Extraction and reinsertion for one document kind
pub trait FormatAdapter: Send + Sync {
    /// Logical structure of the container
    type Body: Clone + Send + Sync;

    fn kind(&self) -> FormatKind;

    /// Parse the container bytes
    fn decode(&self, bytes: &[u8]) -> Result<Self::Body, ExtractionError>;

    /// Serialize the container; must be deterministic
    fn encode(&self, body: &Self::Body) -> Result<Vec<u8>, ReassemblyError>;

    /// Ordered segments, translatable units Pending and carried-through content Skipped
    fn extract(&self, body: &Self::Body) -> Vec<Segment>;

    /// Copy of `body` with every non-Skipped segment's final text at its position
    fn apply(&self, body: &Self::Body, segments: &[Segment]) -> Result<Self::Body, ReassemblyError>;

    /// Pure function of (structure, final segments) producing the output bytes
    fn reassemble(&self, body: &Self::Body, segments: &[Segment]) -> Result<Vec<u8>, ReassemblyError> {
        verify_segments(&self.extract(body), segments)?;
        let translated = self.apply(body, segments)?;
        self.encode(&translated)
    }
}

/// Check that `segments` is the segment list extracted from this document
pub fn verify_segments(expected: &[Segment], actual: &[Segment]) -> Result<(), ReassemblyError> {
    if expected.len() != actual.len() {
        return Err(ReassemblyError::SegmentMismatch {
            expected: expected.len(),
            actual: actual.len(),
        });
    }

    for (position, (want, got)) in expected.iter().zip(actual).enumerate() {
        if got.index != position || want.location != got.location {
            return Err(ReassemblyError::MissingPosition {
                index: got.index,
                location: got.location.to_string(),
            });
        }
    }

    Ok(())
}

#[derive(Deserialize)]
struct EncryptionProbe {
    #[serde(default)]
    encrypted: bool,
}

/// Decode a JSON snapshot, rejecting encrypted containers before looking at their structure
pub(crate) fn decode_json<T: DeserializeOwned>(kind: FormatKind, bytes: &[u8]) -> Result<T, ExtractionError> {
    let probe: EncryptionProbe = serde_json::from_slice(bytes).map_err(|e| ExtractionError::Corrupt {
        kind: kind.to_string(),
        message: e.to_string(),
    })?;
    if probe.encrypted {
        return Err(ExtractionError::Encrypted);
    }

    serde_json::from_slice(bytes).map_err(|e| ExtractionError::Corrupt {
        kind: kind.to_string(),
        message: e.to_string(),
    })
}

pub(crate) fn encode_json<T: serde::Serialize>(body: &T) -> Result<Vec<u8>, ReassemblyError> {
    let mut bytes = serde_json::to_vec_pretty(body).map_err(|e| ReassemblyError::Encode(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Bytes of a reassembled document together with their container kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub kind: FormatKind,
    pub bytes: Vec<u8>,
}

impl OutputArtifact {
    pub fn extension(&self) -> &'static str {
        self.kind.snapshot_extension()
    }
}

/// A decoded document of any supported kind
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedDocument {
    Spreadsheet(Workbook),
    WordProcessor(WordDocument),
    Presentation(PresentationBody),
    PdfText(PdfTextBody),
}

impl LoadedDocument {
    pub fn decode(kind: FormatKind, bytes: &[u8]) -> Result<Self, ExtractionError> {
        Ok(match kind {
            FormatKind::Spreadsheet => Self::Spreadsheet(SpreadsheetAdapter.decode(bytes)?),
            FormatKind::WordProcessor => Self::WordProcessor(WordAdapter.decode(bytes)?),
            FormatKind::Presentation => Self::Presentation(PresentationAdapter.decode(bytes)?),
            FormatKind::PdfText => Self::PdfText(PdfTextAdapter.decode(bytes)?),
        })
    }

    pub fn kind(&self) -> FormatKind {
        match self {
            Self::Spreadsheet(_) => FormatKind::Spreadsheet,
            Self::WordProcessor(_) => FormatKind::WordProcessor,
            Self::Presentation(_) => FormatKind::Presentation,
            Self::PdfText(_) => FormatKind::PdfText,
        }
    }

    pub fn extract(&self) -> Vec<Segment> {
        match self {
            Self::Spreadsheet(body) => SpreadsheetAdapter.extract(body),
            Self::WordProcessor(body) => WordAdapter.extract(body),
            Self::Presentation(body) => PresentationAdapter.extract(body),
            Self::PdfText(body) => PdfTextAdapter.extract(body),
        }
    }

    /// Produce the output artifact for `mode` from the final segment list
    pub fn reassemble(&self, segments: &[Segment], mode: OutputMode, title: &str) -> Result<OutputArtifact, ReassemblyError> {
        let kind = mode.output_kind(self.kind());

        let bytes = match mode {
            OutputMode::KeepOriginal => match self {
                Self::Spreadsheet(body) => SpreadsheetAdapter.reassemble(body, segments)?,
                Self::WordProcessor(body) => WordAdapter.reassemble(body, segments)?,
                Self::Presentation(body) => PresentationAdapter.reassemble(body, segments)?,
                Self::PdfText(body) => PdfTextAdapter.reassemble(body, segments)?,
            },
            OutputMode::Pdf => {
                verify_segments(&self.extract(), segments)?;
                summary::render_pdf(title, segments).into_bytes()
            }
            OutputMode::SpreadsheetSummary => {
                verify_segments(&self.extract(), segments)?;
                SpreadsheetAdapter.encode(&summary::render_spreadsheet_summary(segments))?
            }
            OutputMode::DocumentSummary => {
                verify_segments(&self.extract(), segments)?;
                WordAdapter.encode(&summary::render_document_summary(title, segments))?
            }
        };

        Ok(OutputArtifact { kind, bytes })
    }
}
