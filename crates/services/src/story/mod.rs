mod session;
mod workflow;

// Public API of the story subsystem.
pub use crate::error::SubmitError;
pub use session::{NavOutcome, RateOutcome, SampleSummary, StoryOptions, StorySession};
pub use workflow::{SubmitOutcome, submit_answers};
