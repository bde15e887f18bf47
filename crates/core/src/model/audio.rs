use url::Url;

use crate::model::ids::{PromptId, SampleId};
use crate::model::question::{ConfigError, QuestionConfig};

/// Tag used for the reference recording in audio filenames.
pub const PROMPT_TAG: &str = "prompt";

/// The audio belonging to one story page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AudioTrack {
    Prompt,
    Sample { index: usize, id: SampleId },
}

impl AudioTrack {
    /// Filename tag: `prompt` or the sample's model tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            AudioTrack::Prompt => PROMPT_TAG,
            AudioTrack::Sample { id, .. } => id.as_str(),
        }
    }

    /// Stable element-id stem, e.g. `prompt` or `sample-2`.
    #[must_use]
    pub fn element_key(&self) -> String {
        match self {
            AudioTrack::Prompt => PROMPT_TAG.to_string(),
            AudioTrack::Sample { index, .. } => format!("sample-{index}"),
        }
    }

    /// All tracks of a question in page order.
    #[must_use]
    pub fn all_for(config: &QuestionConfig) -> Vec<AudioTrack> {
        std::iter::once(AudioTrack::Prompt)
            .chain(
                config
                    .samples
                    .iter()
                    .enumerate()
                    .map(|(index, id)| AudioTrack::Sample {
                        index,
                        id: id.clone(),
                    }),
            )
            .collect()
    }
}

/// URL template for audio files.
///
/// Supports `{root}`, `{prompt}` and `{tag}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioUrlTemplate(String);

impl AudioUrlTemplate {
    pub const DEFAULT: &'static str = "/api/audio/{prompt}_{tag}.mp3";

    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fill the placeholders, leaving the result relative if the template is.
    #[must_use]
    pub fn render(&self, root: &str, prompt: &PromptId, tag: &str) -> String {
        self.0
            .replace("{root}", root.trim_end_matches('/'))
            .replace("{prompt}", prompt.as_str())
            .replace("{tag}", tag)
    }

    /// Render and resolve against `base`. Absolute templates ignore `base`;
    /// a leading `/` stays under the base path.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` when the result is not a valid URL.
    pub fn resolve(
        &self,
        base: &Url,
        root: &str,
        prompt: &PromptId,
        tag: &str,
    ) -> Result<Url, ConfigError> {
        let rendered = self.render(root, prompt, tag);
        base.join(rendered.trim_start_matches('/')).map_err(|err| ConfigError::InvalidUrl {
            raw: rendered,
            reason: err.to_string(),
        })
    }
}

impl Default for AudioUrlTemplate {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

/// Split an audio filename like `001_methodA.mp3` into prompt id and tag.
///
/// Only `.mp3` files whose stem has exactly two `_`-separated parts qualify.
#[must_use]
pub fn parse_audio_filename(filename: &str) -> Option<(PromptId, String)> {
    let name = filename.rsplit('/').next().unwrap_or(filename);
    let stem = name.strip_suffix(".mp3")?;
    let mut parts = stem.split('_');
    let (Some(prompt), Some(tag), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };
    if prompt.is_empty() || tag.is_empty() {
        return None;
    }
    Some((PromptId::new(prompt), tag.to_string()))
}

/// Sample tags available for `prompt` among `filenames`, in listing order.
#[must_use]
pub fn samples_from_filenames(prompt: &PromptId, filenames: &[String]) -> Vec<SampleId> {
    let mut samples: Vec<SampleId> = Vec::new();
    for name in filenames {
        let Some((file_prompt, tag)) = parse_audio_filename(name) else {
            continue;
        };
        if &file_prompt != prompt || tag == PROMPT_TAG {
            continue;
        }
        let sample = SampleId::new(tag);
        if !samples.contains(&sample) {
            samples.push(sample);
        }
    }
    samples
}
