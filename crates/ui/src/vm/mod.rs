mod story_vm;

pub use story_vm::{StoryEffect, StoryIntent, StoryVm, TrackPlayback};
