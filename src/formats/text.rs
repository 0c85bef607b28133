/*!
 * Rich-text building blocks shared by the word-processor and presentation adapters.
 */

use serde::{Deserialize, Serialize};

/// A span of text with uniform formatting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Run {
    pub text: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
            ..Default::default()
        }
    }
}

/// A paragraph made of formatted runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Paragraph {
    /// Named paragraph style, e.g. `Heading1`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<String>,

    #[serde(default)]
    pub runs: Vec<Run>,
}

impl Paragraph {
    pub fn from_runs(runs: Vec<Run>) -> Self {
        Self {
            runs,
            ..Default::default()
        }
    }

    pub fn styled(style: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            style: Some(style.into()),
            runs: vec![Run::plain(text)],
            ..Default::default()
        }
    }

    /// Text of the paragraph, runs concatenated
    pub fn text(&self) -> String {
        runs_text(&self.runs)
    }

    pub fn set_text(&mut self, text: &str) {
        write_runs(&mut self.runs, text);
    }
}

pub fn runs_text(runs: &[Run]) -> String {
    runs.iter().map(|r| r.text.as_str()).collect()
}

/// Write `text` back into `runs` without touching their formatting.
///
/// The whole text goes into the first non-empty run and the later runs are emptied,
/// so that the run list (and every run's style) survives the translation.
pub fn write_runs(runs: &mut Vec<Run>, text: &str) {
    if runs.is_empty() {
        runs.push(Run::plain(text));
        return;
    }

    let target = runs.iter().position(|r| !r.text.is_empty()).unwrap_or(0);
    for (i, run) in runs.iter_mut().enumerate() {
        if i == target {
            run.text = text.to_string();
        } else {
            run.text.clear();
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}
