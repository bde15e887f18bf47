#![forbid(unsafe_code)]

pub mod model;
pub mod story;
pub mod time;

pub use time::{Clock, QuestionTimer};
