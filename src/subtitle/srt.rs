use std::path::Path;

use anyhow::Context as _;

use crate::{foundation::error::SlidecastResult, subtitle::index::SubtitleCue};

const TIMING_SEPARATOR: &str = " --> ";

/// Parse SubRip text into cues, in file order.
///
/// Blocks are separated by a blank line (LF or CRLF). Each block is an integer id line, a timing
/// line `HH:MM:SS,mmm --> HH:MM:SS,mmm`, then zero or more text lines joined with a single space.
/// Malformed blocks are dropped; they never abort the parse.
pub fn parse_srt(content: &str) -> Vec<SubtitleCue> {
    let normalized = content.replace("\r\n", "\n");
    normalized
        .trim()
        .split("\n\n")
        .map(|block| block.trim_matches('\n'))
        .filter(|block| !block.trim().is_empty())
        .filter_map(|block| {
            let cue = parse_block(block);
            if cue.is_none() {
                tracing::debug!(block, "dropping malformed subtitle block");
            }
            cue
        })
        .collect()
}

fn parse_block(block: &str) -> Option<SubtitleCue> {
    let lines: Vec<&str> = block.split('\n').collect();
    if lines.len() < 2 {
        return None;
    }

    let id = lines[0].trim().parse::<u32>().ok()?;
    let (start, end) = lines[1].split_once(TIMING_SEPARATOR)?;
    // The end side may carry position hints (`X1:40 X2:600 ...`) after the timestamp.
    let start = parse_srt_timestamp(start.split_whitespace().next()?)?;
    let end = parse_srt_timestamp(end.split_whitespace().next()?)?;
    if end < start {
        return None;
    }

    Some(SubtitleCue {
        id,
        start,
        end,
        text: lines[2..].join(" "),
    })
}

/// Parse `HH:MM:SS,mmm` into seconds.
pub fn parse_srt_timestamp(s: &str) -> Option<f64> {
    let mut parts = s.trim().split(':');
    let h = parts.next()?.parse::<u64>().ok()?;
    let m = parts.next()?.parse::<u64>().ok()?;
    let sec_ms = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let (sec, ms) = sec_ms.split_once(',')?;
    let sec = sec.parse::<u64>().ok()?;
    let ms = ms.parse::<u64>().ok()?;

    Some((h * 3600 + m * 60 + sec) as f64 + (ms as f64) / 1000.0)
}

/// Read and parse a subtitle file. Invalid UTF-8 is replaced rather than rejected.
pub fn load_srt_file(path: &Path) -> SlidecastResult<Vec<SubtitleCue>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read subtitles '{}'", path.display()))?;
    let cues = parse_srt(&String::from_utf8_lossy(&bytes));
    tracing::debug!(path = %path.display(), cues = cues.len(), "parsed subtitle file");
    Ok(cues)
}

#[cfg(test)]
#[path = "../../tests/unit/subtitle/srt.rs"]
mod tests;
