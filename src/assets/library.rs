use std::{
    collections::BTreeSet,
    sync::{Arc, OnceLock},
};

use rayon::prelude::*;

use crate::{
    assets::{
        decode::{DecodedImage, ImageSource},
        media::AudioSource,
    },
    foundation::error::{SlidecastError, SlidecastResult},
    subtitle::index::{SubtitleCue, SubtitleIndex},
};

/// Identifier of one live media handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleId(u64);

/// Bookkeeping for handles derived from loaded assets.
///
/// Each loaded asset holds exactly one handle; it is released when the asset is replaced or the
/// library is cleared. Releasing twice is a no-op.
#[derive(Debug, Default)]
pub struct HandleLedger {
    next: u64,
    live: BTreeSet<HandleId>,
    released_total: u64,
}

impl HandleLedger {
    /// Acquire a fresh handle.
    pub fn acquire(&mut self) -> HandleId {
        let id = HandleId(self.next);
        self.next += 1;
        self.live.insert(id);
        id
    }

    /// Release `id`. Returns `false` if it was not live.
    pub fn release(&mut self, id: HandleId) -> bool {
        let removed = self.live.remove(&id);
        if removed {
            self.released_total += 1;
        }
        removed
    }

    /// Number of handles currently held.
    pub fn live(&self) -> usize {
        self.live.len()
    }

    /// Handles released over the ledger's lifetime.
    pub fn released_total(&self) -> u64 {
        self.released_total
    }
}

#[derive(Debug)]
struct ImageEntry {
    source: ImageSource,
    handle: HandleId,
    decoded: OnceLock<Arc<DecodedImage>>,
}

impl ImageEntry {
    fn decoded(&self) -> SlidecastResult<Arc<DecodedImage>> {
        if let Some(img) = self.decoded.get() {
            return Ok(img.clone());
        }
        let img = Arc::new(self.source.load()?);
        Ok(self.decoded.get_or_init(|| img).clone())
    }
}

#[derive(Debug)]
struct AudioEntry {
    source: AudioSource,
    handle: HandleId,
    duration: OnceLock<f64>,
}

impl AudioEntry {
    fn duration(&self) -> SlidecastResult<f64> {
        if let Some(d) = self.duration.get() {
            return Ok(*d);
        }
        let d = self.source.probe_duration()?;
        Ok(*self.duration.get_or_init(|| d))
    }
}

/// Assets of one slideshow session: slide images (selection order), narration, optional music and
/// the subtitle cue list.
#[derive(Debug, Default)]
pub struct MediaLibrary {
    images: Vec<ImageEntry>,
    narration: Option<AudioEntry>,
    music: Option<AudioEntry>,
    subtitles: SubtitleIndex,
    ledger: HandleLedger,
}

impl MediaLibrary {
    /// Empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the image list. Previous image handles are released.
    pub fn set_images(&mut self, images: Vec<ImageSource>) {
        for old in self.images.drain(..) {
            self.ledger.release(old.handle);
        }
        for source in images {
            let handle = self.ledger.acquire();
            self.images.push(ImageEntry {
                source,
                handle,
                decoded: OnceLock::new(),
            });
        }
        tracing::debug!(count = self.images.len(), "images loaded");
    }

    /// Replace the narration track.
    pub fn set_narration(&mut self, source: AudioSource) {
        let entry = self.audio_entry(source);
        if let Some(old) = self.narration.replace(entry) {
            self.ledger.release(old.handle);
        }
    }

    /// Replace or remove the background music track.
    pub fn set_music(&mut self, source: Option<AudioSource>) {
        let entry = source.map(|s| self.audio_entry(s));
        if let Some(old) = std::mem::replace(&mut self.music, entry) {
            self.ledger.release(old.handle);
        }
    }

    /// Replace the subtitle cues.
    pub fn set_subtitles(&mut self, cues: Vec<SubtitleCue>) {
        self.subtitles = SubtitleIndex::new(cues);
    }

    fn audio_entry(&mut self, source: AudioSource) -> AudioEntry {
        AudioEntry {
            source,
            handle: self.ledger.acquire(),
            duration: OnceLock::new(),
        }
    }

    /// Release every asset and handle.
    pub fn clear(&mut self) {
        self.set_images(Vec::new());
        if let Some(old) = self.narration.take() {
            self.ledger.release(old.handle);
        }
        self.set_music(None);
        self.subtitles.clear();
    }

    /// Narration loaded and at least one image selected.
    pub fn is_ready(&self) -> bool {
        self.narration.is_some() && !self.images.is_empty()
    }

    /// Number of selected images.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Image sources in selection order.
    pub fn image_sources(&self) -> Vec<ImageSource> {
        self.images.iter().map(|e| e.source.clone()).collect()
    }

    /// Narration source, if loaded.
    pub fn narration(&self) -> Option<&AudioSource> {
        self.narration.as_ref().map(|e| &e.source)
    }

    /// Music source, if loaded.
    pub fn music(&self) -> Option<&AudioSource> {
        self.music.as_ref().map(|e| &e.source)
    }

    /// Subtitle cue index.
    pub fn subtitles(&self) -> &SubtitleIndex {
        &self.subtitles
    }

    /// Narration length in seconds (probed once, then cached).
    pub fn narration_duration(&self) -> SlidecastResult<f64> {
        self.narration
            .as_ref()
            .ok_or_else(|| SlidecastError::not_ready("no narration loaded"))?
            .duration()
    }

    /// Music length in seconds, if music is loaded.
    pub fn music_duration(&self) -> SlidecastResult<Option<f64>> {
        self.music.as_ref().map(AudioEntry::duration).transpose()
    }

    /// Decode one image on demand; the result is cached for the entry's lifetime.
    pub fn decoded_image(&self, index: usize) -> SlidecastResult<Arc<DecodedImage>> {
        self.images
            .get(index)
            .ok_or_else(|| SlidecastError::validation(format!("no image at index {index}")))?
            .decoded()
    }

    /// Decode every image in parallel. The first failure aborts the whole batch.
    #[tracing::instrument(level = "debug", skip(self), fields(count = self.images.len()))]
    pub fn decode_all_images(&self) -> SlidecastResult<Vec<Arc<DecodedImage>>> {
        self.images.par_iter().map(ImageEntry::decoded).collect()
    }

    /// Number of live asset handles.
    pub fn live_handles(&self) -> usize {
        self.ledger.live()
    }

    /// Handle ledger for observability.
    pub fn ledger(&self) -> &HandleLedger {
        &self.ledger
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/library.rs"]
mod tests;
