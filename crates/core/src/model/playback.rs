use crate::model::audio::AudioTrack;

/// Where a track's audio element currently stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Playing,
    Ended,
    /// Autoplay was refused; the next click anywhere retries.
    AwaitingGesture,
}

impl PlaybackStatus {
    /// Map the playback script's result string back to a status.
    #[must_use]
    pub fn from_script_result(raw: &str) -> Self {
        match raw {
            "playing" => Self::Playing,
            "ended" => Self::Ended,
            "blocked" => Self::AwaitingGesture,
            _ => Self::Idle,
        }
    }
}

/// Status line shown under a track's progress bar.
#[must_use]
pub fn status_text(track: &AudioTrack, status: PlaybackStatus) -> String {
    match (track, status) {
        (_, PlaybackStatus::AwaitingGesture) => "Click anywhere to play audio".to_string(),
        (AudioTrack::Prompt, PlaybackStatus::Idle) => "Reference audio".to_string(),
        (AudioTrack::Prompt, PlaybackStatus::Playing) => "Playing reference audio...".to_string(),
        (AudioTrack::Prompt, PlaybackStatus::Ended) => "Reference audio complete".to_string(),
        (AudioTrack::Sample { index, .. }, PlaybackStatus::Idle) => format!("Sample {}", index + 1),
        (AudioTrack::Sample { index, .. }, PlaybackStatus::Playing) => {
            format!("Playing sample {}...", index + 1)
        }
        (AudioTrack::Sample { index, .. }, PlaybackStatus::Ended) => {
            format!("Sample {} complete", index + 1)
        }
    }
}

/// Fill width for a progress bar, in percent.
///
/// Unknown or zero durations report 0.
#[must_use]
pub fn progress_percent(current_time: f64, duration: f64) -> f64 {
    if !duration.is_finite() || duration <= 0.0 || !current_time.is_finite() {
        return 0.0;
    }
    (current_time / duration * 100.0).clamp(0.0, 100.0)
}
