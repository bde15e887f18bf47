mod components;
mod scripts;
mod view;

pub use view::QuestionView;
#[cfg(test)]
pub(crate) use view::StoryTestHandles;
