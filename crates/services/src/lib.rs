#![forbid(unsafe_code)]

pub mod api;
pub mod app_services;
pub mod audio;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod story;

pub use listening_core::Clock;

pub use api::{ApiResponse, HttpSurveyApi, SaveRequest, SurveyApi};
pub use app_services::AppServices;
pub use audio::{
    AudioFetcher, AudioLoader, FetchedAudio, LoadedAudio, PlaybackSource, PreloadFailure,
    PreloadReport, discover_samples,
};
pub use config::ClientConfig;
pub use error::{ApiError, AudioError, ServicesError, SubmitError, SubmitStage};
pub use heartbeat::{heartbeat_once, run_heartbeat, spawn_heartbeat};
pub use story::{
    NavOutcome, RateOutcome, SampleSummary, StoryOptions, StorySession, SubmitOutcome,
    submit_answers,
};
