/// One timed subtitle entry.
///
/// `start <= end` holds for cues produced by [`parse_srt`](crate::parse_srt).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SubtitleCue {
    /// Sequence number from the subtitle file.
    pub id: u32,
    /// Start time in seconds (inclusive).
    pub start: f64,
    /// End time in seconds (inclusive).
    pub end: f64,
    /// Cue text, multi-line cues joined with a single space.
    pub text: String,
}

impl SubtitleCue {
    /// Whether `t` falls inside `[start, end]`.
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Ordered list of cues with timestamp lookup.
///
/// Cues keep parse order. They may overlap and need not be sorted; lookup returns the first cue in
/// list order whose window contains the timestamp.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubtitleIndex {
    cues: Vec<SubtitleCue>,
}

impl SubtitleIndex {
    /// Build an index over `cues`, keeping their order.
    pub fn new(cues: Vec<SubtitleCue>) -> Self {
        Self { cues }
    }

    /// Text of the first cue active at `t`, or `""` when none is.
    pub fn active_cue_at(&self, t: f64) -> &str {
        self.active_cue(t).map(|c| c.text.as_str()).unwrap_or("")
    }

    /// First cue active at `t`.
    pub fn active_cue(&self, t: f64) -> Option<&SubtitleCue> {
        // Linear scan: cue lists are small and first-match must follow list order.
        self.cues.iter().find(|c| c.contains(t))
    }

    /// Borrow all cues in list order.
    pub fn cues(&self) -> &[SubtitleCue] {
        &self.cues
    }

    /// Number of cues.
    pub fn len(&self) -> usize {
        self.cues.len()
    }

    /// `true` when the index holds no cues.
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Drop every cue.
    pub fn clear(&mut self) {
        self.cues.clear();
    }
}

impl From<Vec<SubtitleCue>> for SubtitleIndex {
    fn from(cues: Vec<SubtitleCue>) -> Self {
        Self::new(cues)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/subtitle/index.rs"]
mod tests;
