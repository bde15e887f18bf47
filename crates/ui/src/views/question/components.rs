use dioxus::prelude::*;

use listening_core::model::{AudioTrack, Metric, SampleId};
use services::SampleSummary;

use super::scripts::audio_element_id;
use crate::vm::{StoryIntent, TrackPlayback};

/// Story progress bar. Visited segments jump back to their page.
#[component]
pub(super) fn ProgressSegments(
    segments: Vec<bool>,
    current: usize,
    on_intent: EventHandler<StoryIntent>,
) -> Element {
    let items = segments.into_iter().enumerate().map(|(index, active)| {
        let class = if active {
            "story-progress__segment story-progress__segment--active"
        } else {
            "story-progress__segment"
        };
        (index, class)
    });
    rsx! {
        div { class: "story-progress",
            for (index, class) in items {
                div {
                    key: "{index}",
                    class: "{class}",
                    onclick: move |evt: MouseEvent| {
                        evt.stop_propagation();
                        if index < current {
                            on_intent.call(StoryIntent::GoTo(index));
                        }
                    },
                }
            }
        }
    }
}

#[component]
pub(super) fn AudioPanel(
    track: AudioTrack,
    src: String,
    cached: bool,
    status: String,
    playback: TrackPlayback,
    on_intent: EventHandler<StoryIntent>,
) -> Element {
    let key = track.element_key();
    let element_id = audio_element_id(&key);
    let width = format!("width: {:.1}%;", playback.percent);
    let replay_track = track.clone();
    let cached = if cached { "true" } else { "false" };
    rsx! {
        div { class: "audio-panel",
            audio {
                class: "story-audio",
                id: "{element_id}",
                "data-key": "{key}",
                "data-cached": "{cached}",
                preload: "auto",
                src: "{src}",
            }
            div { class: "audio-panel__progress",
                div { class: "audio-panel__fill", style: "{width}" }
            }
            div { class: "audio-panel__controls",
                button {
                    class: "audio-panel__play",
                    r#type: "button",
                    onclick: move |evt| {
                        evt.stop_propagation();
                        on_intent.call(StoryIntent::Replay(replay_track.clone()));
                    },
                    "Play"
                }
                span { class: "audio-panel__status", "{status}" }
            }
        }
    }
}

#[component]
pub(super) fn RatingRow(
    sample: SampleId,
    metric: Metric,
    selected: Option<i64>,
    on_intent: EventHandler<StoryIntent>,
) -> Element {
    let name = metric.name().to_string();
    let buttons = metric.scale().values().into_iter().map(|value| {
        let class = if selected == Some(value) {
            "rating-btn selected"
        } else {
            "rating-btn"
        };
        (value, class)
    });
    rsx! {
        div { class: "rating-row",
            div { class: "rating-row__label",
                span { class: "rating-row__name", "{name}" }
                if let Some(description) = metric.description() {
                    span { class: "rating-row__hint", "{description}" }
                }
            }
            div { class: "rating-row__buttons",
                for (value, class) in buttons {
                    button {
                        key: "{value}",
                        class: "{class}",
                        r#type: "button",
                        "data-value": "{value}",
                        onclick: {
                            let sample = sample.clone();
                            let metric = name.clone();
                            move |evt: MouseEvent| {
                                evt.stop_propagation();
                                on_intent.call(StoryIntent::Rate {
                                    sample: sample.clone(),
                                    metric: metric.clone(),
                                    value,
                                });
                            }
                        },
                        "{value}"
                    }
                }
            }
        }
    }
}

#[component]
pub(super) fn RatingsSummary(rows: Vec<SampleSummary>) -> Element {
    rsx! {
        div { class: "ratings-summary",
            h3 { "Your ratings" }
            for row in rows {
                div { key: "{row.sample}", class: "ratings-summary__row",
                    span { class: "ratings-summary__label", "{row.label}" }
                    if row.ratings.is_empty() {
                        span { class: "ratings-summary__empty", "Not rated" }
                    }
                    for (metric, value) in row.ratings.iter() {
                        span { key: "{metric}", class: "ratings-summary__value", "{metric}: {value}" }
                    }
                }
            }
        }
    }
}

#[component]
pub(super) fn AlertModal(message: String, on_dismiss: EventHandler<()>) -> Element {
    rsx! {
        div { class: "story-alert",
            div {
                class: "story-alert__dialog",
                role: "alertdialog",
                aria_modal: "true",
                for line in message.lines().map(str::to_string) {
                    p { "{line}" }
                }
                button {
                    class: "btn btn-primary",
                    id: "story-alert-ok",
                    r#type: "button",
                    onclick: move |evt| {
                        evt.stop_propagation();
                        on_dismiss.call(());
                    },
                    "OK"
                }
            }
        }
    }
}

#[component]
pub(super) fn LoadingOverlay(label: String) -> Element {
    rsx! {
        div { class: "loading-overlay",
            div { class: "loading-overlay__spinner" }
            p { "{label}" }
        }
    }
}
