use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::document::FormatKind;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// File name without the document and snapshot extensions
    /// (`report.xlsx.json` → `report`)
    pub fn document_stem<P: AsRef<Path>>(path: P) -> String {
        let name = path
            .as_ref()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut stem = name.as_str();
        for suffix in [".json", ".txt"] {
            if stem.len() > suffix.len() && stem.to_lowercase().ends_with(suffix) {
                stem = &stem[..stem.len() - suffix.len()];
                break;
            }
        }
        match stem.rfind('.') {
            Some(dot) if dot > 0 => stem[..dot].to_string(),
            _ => stem.to_string(),
        }
    }

    /// Expand `{name}`, `{lang}`, `{date}` and `{time}` in a naming rule
    pub fn render_naming_rule(rule: &str, name: &str, target_language: &str, now: DateTime<Local>) -> String {
        rule.replace("{name}", name)
            .replace("{lang}", target_language)
            .replace("{date}", &now.format("%Y%m%d").to_string())
            .replace("{time}", &now.format("%H%M%S").to_string())
    }

    // @generates: Output path for a translated document
    // @params: input_file, output_dir (source directory when unset), naming_rule, target_language, output kind
    pub fn generate_output_path<P: AsRef<Path>>(
        input_file: P,
        output_dir: Option<&Path>,
        naming_rule: &str,
        target_language: &str,
        kind: FormatKind,
    ) -> PathBuf {
        let input_file = input_file.as_ref();
        let directory = output_dir
            .map(Path::to_path_buf)
            .or_else(|| input_file.parent().map(Path::to_path_buf))
            .unwrap_or_default();

        let name = Self::render_naming_rule(naming_rule, &Self::document_stem(input_file), target_language, Local::now());
        directory.join(format!("{}.{}", name, kind.snapshot_extension()))
    }

    /// `out/report.pdf.txt` → `out/report_2.pdf.txt` for `number = 2`
    pub fn numbered_path<P: AsRef<Path>>(path: P, kind: FormatKind, number: usize) -> PathBuf {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = format!(".{}", kind.snapshot_extension());

        let numbered = match name.strip_suffix(&extension) {
            Some(stem) => format!("{}_{}{}", stem, number, extension),
            None => match (path.file_stem(), path.extension()) {
                (Some(stem), Some(ext)) => format!("{}_{}.{}", stem.to_string_lossy(), number, ext.to_string_lossy()),
                _ => format!("{}_{}", name, number),
            },
        };
        path.with_file_name(numbered)
    }

    /// Find every supported document under a directory, sorted by path
    pub fn find_documents<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() && FormatKind::detect(path).is_ok() {
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    /// Expand the CLI inputs: files are kept, directories are walked
    pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for input in inputs {
            if input.is_dir() {
                files.extend(Self::find_documents(input)?);
            } else if input.is_file() {
                files.push(input.clone());
            } else {
                return Err(anyhow::anyhow!("Input does not exist: {:?}", input));
            }
        }
        Ok(files)
    }

    /// Write through a temporary file in the target directory, then rename.
    ///
    /// Readers never observe a partially written output.
    pub fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> std::io::Result<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let mut file = tempfile::NamedTempFile::new_in(&parent)?;
        file.write_all(bytes)?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Append content to a log file with timestamp
    pub fn append_to_log_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {:?}", path.as_ref()))?;

        writeln!(file, "[{}] {}", timestamp, content)
            .with_context(|| format!("Failed to write to log file: {:?}", path.as_ref()))?;

        Ok(())
    }
}
