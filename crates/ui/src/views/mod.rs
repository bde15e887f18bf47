mod question;
mod state;
mod thankyou;

pub use question::QuestionView;
pub use state::{ViewError, ViewState, view_state_from_resource};
pub use thankyou::ThankYouView;

#[cfg(test)]
mod test_harness;
#[cfg(test)]
mod view_smoke;
