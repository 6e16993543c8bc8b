use crate::error::IngestError;
use crate::models::ChunkingOptions;
use regex::Regex;
use std::sync::OnceLock;

/// A maximal run of extracted text between two page/slide markers, tagged
/// with the reference the opening marker carried (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub page_ref: Option<String>,
    pub text: String,
}

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"(?i)^---\s*(page|slide)\s+(\d+)\s*---$").expect("marker pattern is valid")
    })
}

fn blank_run_regex() -> &'static Regex {
    static BLANK_RUNS: OnceLock<Regex> = OnceLock::new();
    BLANK_RUNS.get_or_init(|| Regex::new(r"\n{3,}").expect("blank-run pattern is valid"))
}

/// Recognizes a boundary line like `--- page 3 ---` or `--- Slide 12 ---`
/// (case-insensitive, surrounding whitespace ignored) and returns the
/// normalized reference, e.g. `"page 3"`.
pub fn parse_page_marker(line: &str) -> Option<String> {
    let captures = marker_regex().captures(line.trim())?;
    Some(format!(
        "{} {}",
        captures[1].to_lowercase(),
        &captures[2]
    ))
}

/// Splits extracted text on marker lines. The markers themselves are
/// discarded; lines before the first marker form a block with no reference.
/// Never returns zero blocks for non-empty input: when no marker is found,
/// or every block is blank after trimming, the untouched input becomes a
/// single unreferenced block.
pub fn split_page_markers(text: &str) -> Vec<TextBlock> {
    let mut blocks: Vec<(Option<String>, Vec<&str>)> = Vec::new();
    let mut current_ref: Option<String> = None;
    let mut current_lines: Vec<&str> = Vec::new();
    let mut found_any_marker = false;

    for line in text.lines() {
        if let Some(reference) = parse_page_marker(line) {
            found_any_marker = true;
            if !current_lines.is_empty() {
                blocks.push((current_ref.take(), std::mem::take(&mut current_lines)));
            }
            current_ref = Some(reference);
            continue;
        }
        current_lines.push(line);
    }

    if !current_lines.is_empty() {
        blocks.push((current_ref, current_lines));
    }

    if !found_any_marker {
        return vec![TextBlock {
            page_ref: None,
            text: text.to_string(),
        }];
    }

    let non_empty: Vec<TextBlock> = blocks
        .into_iter()
        .filter_map(|(page_ref, lines)| {
            let joined = lines.join("\n");
            let trimmed = joined.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(TextBlock {
                    page_ref,
                    text: trimmed.to_string(),
                })
            }
        })
        .collect();

    if non_empty.is_empty() {
        vec![TextBlock {
            page_ref: None,
            text: text.to_string(),
        }]
    } else {
        non_empty
    }
}

/// Offset of the last paragraph break (double newline) within `window`, or
/// `None` when the window holds no such break.
pub fn last_paragraph_break(window: &[char]) -> Option<usize> {
    if window.len() < 2 {
        return None;
    }
    (0..window.len() - 1).rev().find(|&index| window[index] == '\n' && window[index + 1] == '\n')
}

/// Splits one block's text into windows of at most `max_chars` characters,
/// preferring to cut at a paragraph break when one sits far enough into the
/// window, and carrying `overlap_chars` characters into the next window.
///
/// The cursor always advances: when backing up by the overlap would land at
/// or before the current window's start, the next window begins at the
/// window end instead.
pub fn chunk_text(text: &str, options: &ChunkingOptions) -> Result<Vec<String>, IngestError> {
    options.validate()?;

    let normalized = blank_run_regex().replace_all(text, "\n\n");
    let normalized = normalized.trim();
    if normalized.is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = normalized.chars().collect();
    let total = chars.len();
    let cut_threshold = options.paragraph_cut_ratio * options.max_chars as f64;

    let mut chunks = Vec::new();
    let mut cursor = 0usize;

    while cursor < total {
        let mut end = (cursor + options.max_chars).min(total);

        if end < total {
            if let Some(cut) = last_paragraph_break(&chars[cursor..end]) {
                if cut as f64 >= cut_threshold {
                    end = cursor + cut;
                }
            }
        }

        let window: String = chars[cursor..end].iter().collect();
        let trimmed = window.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if end >= total {
            break;
        }

        let stepped_back = end.saturating_sub(options.overlap_chars);
        cursor = if stepped_back > cursor { stepped_back } else { end };
    }

    Ok(chunks)
}

/// Full chunking pass over one resource's extracted text: marker split, then
/// length-bounded splitting per block. Returns `(page_ref, chunk_text)`
/// pairs in block order then chunk order. Empty input yields an empty list.
pub fn make_chunks(
    text: &str,
    options: &ChunkingOptions,
) -> Result<Vec<(Option<String>, String)>, IngestError> {
    options.validate()?;

    let mut out = Vec::new();
    for block in split_page_markers(text) {
        for piece in chunk_text(&block.text, options)? {
            out.push((block.page_ref.clone(), piece));
        }
    }
    Ok(out)
}
