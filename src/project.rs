use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use crate::{
    assets::{decode::ImageSource, media::AudioSource},
    foundation::error::{SlidecastError, SlidecastResult},
    studio::Studio,
    timeline::SlideshowConfig,
};

/// JSON project description: which media to use and how to show it.
///
/// ```json
/// {
///   "images": ["slides/01.jpg", "slides/02.jpg"],
///   "narration": "voice.mp3",
///   "music": "bed.mp3",
///   "subtitles": "voice.srt",
///   "settings": { "per_slide_duration_secs": 5, "effect": "pan", "music_volume": 0.3 },
///   "output": "out/slideshow.mp4"
/// }
/// ```
///
/// Relative paths are resolved against the directory containing the project file.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectFile {
    /// Slide images in display order.
    pub images: Vec<PathBuf>,
    /// Narration audio.
    pub narration: Option<PathBuf>,
    /// Background music.
    pub music: Option<PathBuf>,
    /// `.srt` subtitle file.
    pub subtitles: Option<PathBuf>,
    /// Slideshow settings.
    pub settings: SlideshowConfig,
    /// Output video path.
    pub output: Option<PathBuf>,
    /// Subtitle font file.
    pub font: Option<PathBuf>,
}

impl ProjectFile {
    /// Parse a project from a JSON reader. Paths are kept as written.
    pub fn from_reader<R: std::io::Read>(r: R) -> SlidecastResult<Self> {
        let project: ProjectFile = serde_json::from_reader(r)
            .map_err(|e| SlidecastError::serde(format!("parse project JSON: {e}")))?;
        project.settings.validate()?;
        Ok(project)
    }

    /// Load a project file and resolve its relative paths.
    pub fn load(path: impl AsRef<Path>) -> SlidecastResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            SlidecastError::validation(format!("open project file '{}': {e}", path.display()))
        })?;
        let project = Self::from_reader(BufReader::new(f))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(project.resolved_against(base))
    }

    /// Copy with every relative path joined onto `base`.
    pub fn resolved_against(mut self, base: &Path) -> Self {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.images.iter_mut().for_each(join);
        for p in [
            &mut self.narration,
            &mut self.music,
            &mut self.subtitles,
            &mut self.output,
            &mut self.font,
        ]
        .into_iter()
        .flatten()
        {
            join(p);
        }
        self
    }

    /// Load every referenced asset and the settings into `studio`.
    pub fn apply(&self, studio: &mut Studio) -> SlidecastResult<()> {
        studio.set_config(self.settings)?;
        studio.load_images(self.images.iter().cloned().map(ImageSource::File).collect())?;
        if let Some(narration) = &self.narration {
            studio.load_narration(AudioSource::File(narration.clone()))?;
        }
        studio.load_music(self.music.clone().map(AudioSource::File))?;
        match &self.subtitles {
            Some(srt) => {
                studio.load_subtitles_file(srt)?;
            }
            None => studio.load_subtitles(Vec::new())?,
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/project.rs"]
mod tests;
