use dioxus::prelude::*;

/// Shown once the last question was saved and the test finished.
#[component]
pub fn ThankYouView(result_file: String) -> Element {
    rsx! {
        div { class: "page thank-you",
            h2 { "Thank you" }
            p { "Your answers have been saved. You can close this window now." }
            if !result_file.is_empty() {
                p { class: "thank-you__result",
                    "Result file: "
                    code { "{result_file}" }
                }
            }
        }
    }
}
