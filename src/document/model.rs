use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::ExtractionError;

/// Stable identifier of a document within a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of document container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    Spreadsheet,
    WordProcessor,
    Presentation,
    PdfText,
}

impl FormatKind {
    /// Detect the kind from a file name.
    ///
    /// Recognizes the logical snapshot names (`report.xlsx.json`, `notes.pdf.txt`)
    /// as well as plain `.txt` for PDF-extracted text.
    pub fn detect<P: AsRef<Path>>(path: P) -> Result<Self, ExtractionError> {
        let name = path
            .as_ref()
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let inner = name.strip_suffix(".json").unwrap_or(&name);
        let inner = inner.strip_suffix(".txt").map(|s| s.to_string()).unwrap_or_else(|| inner.to_string());

        if inner.ends_with(".xlsx") || inner.ends_with(".xls") {
            Ok(Self::Spreadsheet)
        } else if inner.ends_with(".docx") || inner.ends_with(".doc") {
            Ok(Self::WordProcessor)
        } else if inner.ends_with(".pptx") || inner.ends_with(".ppt") {
            Ok(Self::Presentation)
        } else if inner.ends_with(".pdf") || name.ends_with(".txt") {
            Ok(Self::PdfText)
        } else {
            Err(ExtractionError::UnsupportedFormat(name))
        }
    }

    /// File extension of the snapshot written for this kind
    pub fn snapshot_extension(&self) -> &'static str {
        match self {
            Self::Spreadsheet => "xlsx.json",
            Self::WordProcessor => "docx.json",
            Self::Presentation => "pptx.json",
            Self::PdfText => "pdf.txt",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Spreadsheet => "spreadsheet",
            Self::WordProcessor => "word processor",
            Self::Presentation => "presentation",
            Self::PdfText => "PDF text",
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Translation style bias sent to the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DomainProfile {
    #[default]
    General,
    Arts,
    Technical,
    Sports,
}

impl DomainProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Arts => "arts",
            Self::Technical => "technical",
            Self::Sports => "sports",
        }
    }
}

impl fmt::Display for DomainProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DomainProfile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "general" => Ok(Self::General),
            "arts" | "art" => Ok(Self::Arts),
            "technical" | "tech" => Ok(Self::Technical),
            "sports" | "sport" => Ok(Self::Sports),
            _ => Err(anyhow::anyhow!("Invalid domain profile: {}", s)),
        }
    }
}

/// How the translated document is written out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Same container kind as the source
    #[default]
    KeepOriginal,
    /// Paginated text rendering
    Pdf,
    /// One spreadsheet listing every translated unit
    SpreadsheetSummary,
    /// One word-processor document listing every translated unit
    DocumentSummary,
}

impl OutputMode {
    /// Container kind of the artifact produced for a source of `source_kind`
    pub fn output_kind(&self, source_kind: FormatKind) -> FormatKind {
        match self {
            Self::KeepOriginal => source_kind,
            Self::Pdf => FormatKind::PdfText,
            Self::SpreadsheetSummary => FormatKind::Spreadsheet,
            Self::DocumentSummary => FormatKind::WordProcessor,
        }
    }
}

impl FromStr for OutputMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "keep_original" | "original" => Ok(Self::KeepOriginal),
            "pdf" => Ok(Self::Pdf),
            "spreadsheet_summary" | "excel" | "spreadsheet" => Ok(Self::SpreadsheetSummary),
            "document_summary" | "word" | "document" => Ok(Self::DocumentSummary),
            _ => Err(anyhow::anyhow!("Invalid output mode: {}", s)),
        }
    }
}

/// A file submitted by the caller, before batch-wide settings are bound to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub kind: FormatKind,
    /// Source language code, or `auto`
    pub source_language: String,
}

impl SourceDocument {
    pub fn new(path: impl Into<PathBuf>, kind: FormatKind) -> Self {
        Self {
            path: path.into(),
            kind,
            source_language: "auto".to_string(),
        }
    }

    /// Build from a path, detecting the kind from its name
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, ExtractionError> {
        let path = path.into();
        let kind = FormatKind::detect(&path)?;
        Ok(Self::new(path, kind))
    }

    pub fn with_source_language(mut self, language: impl Into<String>) -> Self {
        self.source_language = language.into();
        self
    }
}

/// A document bound to its batch settings; immutable once its job starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    id: DocumentId,
    kind: FormatKind,
    source_path: PathBuf,
    source_language: String,
    target_language: String,
    domain: DomainProfile,
}

impl Document {
    pub fn new(source: SourceDocument, target_language: impl Into<String>, domain: DomainProfile) -> Self {
        Self {
            id: DocumentId::new(),
            kind: source.kind,
            source_path: source.path,
            source_language: source.source_language,
            target_language: target_language.into(),
            domain,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn kind(&self) -> FormatKind {
        self.kind
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn source_language(&self) -> &str {
        &self.source_language
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    pub fn domain(&self) -> DomainProfile {
        self.domain
    }

    /// File name used in logs and progress output
    pub fn display_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }
}
