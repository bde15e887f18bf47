mod answers;
mod audio;
mod ids;
mod metric;
mod playback;
mod question;

pub use ids::{PromptId, QuestionId, SampleId};

pub use answers::{AnswerLayout, AnswerMap};
pub use audio::{AudioTrack, AudioUrlTemplate, PROMPT_TAG, parse_audio_filename, samples_from_filenames};
pub use metric::{Metric, RatingError, RatingScale};
pub use playback::{PlaybackStatus, progress_percent, status_text};
pub use question::{
    ATTR_AUDIO_ROOT, ATTR_DEBUG_MODE, ATTR_IS_LAST, ATTR_METRICS, ATTR_MODELS, ATTR_NEXT_URL,
    ATTR_PREV_URL, ATTR_PROMPT_ID, ATTR_QUESTION_ID, ATTR_QUESTION_INDEX, AttributeMap,
    AttributeSource, ConfigError, DEFAULT_AUDIO_ROOT, DEFAULT_SAMPLES, QuestionConfig,
    parse_attribute_document,
};
