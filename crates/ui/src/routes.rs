use dioxus::prelude::*;
use dioxus_router::{Outlet, Routable};

use crate::context::AppContext;
use crate::views::{QuestionView, ThankYouView};

#[derive(Clone, Routable, PartialEq)]
#[rustfmt::skip]
pub enum Route {
    #[layout(Layout)]
        #[route("/", StartView)] Start {},
        #[route("/question/:index", QuestionView)] Question { index: usize },
        #[route("/thank-you?:result_file", ThankYouView)] ThankYou { result_file: String },
}

impl Route {
    /// Where to go after question `index` was saved.
    #[must_use]
    pub fn after_question(index: usize, question_count: usize) -> Self {
        if index + 1 < question_count {
            Route::Question { index: index + 1 }
        } else {
            Route::ThankYou {
                result_file: String::new(),
            }
        }
    }
}

#[component]
fn StartView() -> Element {
    rsx! { QuestionView { index: 0 } }
}

#[component]
fn Layout() -> Element {
    let ctx = use_context::<AppContext>();
    let total = ctx.question_count();
    rsx! {
        div { class: "app",
            header { class: "app-header",
                h1 { "Listening Test" }
                span { class: "app-header__count", "{total} questions" }
            }
            main { class: "content",
                Outlet::<Route> {}
            }
        }
    }
}
