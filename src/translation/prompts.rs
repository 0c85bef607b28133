/*!
 * Prompt construction for LLM providers.
 *
 * The domain profile only changes the instructions sent with a request.
 * Several segments travel in one request as a marker-delimited block:
 *
 * ```text
 * <<ENTRY_0>>
 * first text
 * <<ENTRY_1>>
 * second text
 * <<END>>
 * ```
 */

use crate::document::DomainProfile;
use crate::language_utils;

/// Marker closing a batch block
pub const END_MARKER: &str = "<<END>>";

fn entry_marker(index: usize) -> String {
    format!("<<ENTRY_{}>>", index)
}

/// Extra instructions for each domain profile
pub fn domain_instructions(domain: DomainProfile) -> &'static str {
    match domain {
        DomainProfile::General => "Use a neutral, natural register suitable for general readers.",
        DomainProfile::Arts => {
            "The text comes from the arts and culture domain. Keep titles of works, artist names and stylistic nuance; prefer expressive wording over literal wording."
        }
        DomainProfile::Technical => {
            "The text is technical documentation. Use established technical terminology, keep product names, identifiers, units and numbers exactly as written."
        }
        DomainProfile::Sports => {
            "The text is about sports. Use the standard terminology of the sport, keep team and athlete names and all scores or statistics unchanged."
        }
    }
}

/// Render the system prompt template for one request
pub fn render_system_prompt(template: &str, source_language: &str, target_language: &str, domain: DomainProfile) -> String {
    template
        .replace("{source_language}", &language_utils::display_name(source_language))
        .replace("{target_language}", &language_utils::display_name(target_language))
        .replace("{domain_instructions}", domain_instructions(domain))
}

/// Instruction prepended to a batch block
pub fn batch_instructions(count: usize) -> String {
    format!(
        "Translate each of the {} entries below. Keep every <<ENTRY_n>> marker and the final {} marker exactly as they are, and put each translation right after its marker.",
        count, END_MARKER
    )
}

/// Join texts into a marker-delimited block
pub fn encode_batch<S: AsRef<str>>(texts: &[S]) -> String {
    let mut combined = String::new();
    for (idx, text) in texts.iter().enumerate() {
        combined.push_str(&entry_marker(idx));
        combined.push('\n');
        combined.push_str(text.as_ref());
        combined.push('\n');
    }
    combined.push_str(END_MARKER);
    combined
}

/// Split a translated block back into `expected` texts.
///
/// Returns `None` when a marker is missing, which callers treat as a malformed response.
pub fn decode_batch(response: &str, expected: usize) -> Option<Vec<String>> {
    let mut texts = Vec::with_capacity(expected);
    let mut cursor = 0;

    for idx in 0..expected {
        let start_marker = entry_marker(idx);
        let end_marker = if idx + 1 == expected {
            END_MARKER.to_string()
        } else {
            entry_marker(idx + 1)
        };

        let start = response[cursor..].find(&start_marker)? + cursor + start_marker.len();
        let end = match response[start..].find(&end_marker) {
            Some(pos) => start + pos,
            // Models sometimes drop the closing marker of the last entry
            None if idx + 1 == expected => response.len(),
            None => return None,
        };

        texts.push(clean_response(&response[start..end]));
        cursor = end;
    }

    Some(texts)
}

/// Trim a model answer and strip quotes the model wrapped it in
pub fn clean_response(text: &str) -> String {
    let trimmed = text.trim();
    for (open, close) in [('"', '"'), ('\u{201c}', '\u{201d}'), ('\'', '\''), ('«', '»'), ('「', '」')] {
        if trimmed.chars().count() >= 2 && trimmed.starts_with(open) && trimmed.ends_with(close) {
            let inner = &trimmed[open.len_utf8()..trimmed.len() - close.len_utf8()];
            // Only strip when the quotes are not part of the content
            if !inner.contains(open) && !inner.contains(close) {
                return inner.trim().to_string();
            }
        }
    }
    trimmed.to_string()
}
