use std::time::Duration;

use dioxus::document::eval;
use dioxus::prelude::*;
use dioxus_router::{Navigator, use_navigator};

use listening_core::model::{AudioTrack, Metric, PlaybackStatus, SampleId};
use listening_core::story::{NavDirection, NavSource, swipe_direction};
use services::{PlaybackSource, SubmitOutcome, submit_answers};

use super::components::{
    AlertModal, AudioPanel, LoadingOverlay, ProgressSegments, RatingRow, RatingsSummary,
};
use super::scripts::{
    ProgressMessage, focus_story_script, gesture_retry_script, play_script, progress_watch_script,
};
use crate::context::AppContext;
use crate::routes::Route;
use crate::views::{ViewError, ViewState, view_state_from_resource};
use crate::vm::{StoryEffect, StoryIntent, StoryVm, TrackPlayback};

#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::rc::Rc;

type Sources = Vec<(AudioTrack, PlaybackSource)>;

/// One question of the test. Remounts when `index` changes.
#[component]
pub fn QuestionView(index: usize) -> Element {
    rsx! { QuestionStory { key: "{index}", index } }
}

#[component]
fn QuestionStory(index: usize) -> Element {
    let ctx = use_context::<AppContext>();
    let navigator = use_navigator();
    let question_count = ctx.question_count();

    let vm = use_signal(|| None::<StoryVm>);
    let loading = use_signal(|| (0_usize, 0_usize));
    let mut touch_start = use_signal(|| None::<f64>);
    let mut started = use_signal(|| false);

    let ctx_for_resource = ctx.clone();
    let resource = use_resource(move || {
        let ctx = ctx_for_resource.clone();
        let mut vm = vm;
        let mut loading = loading;
        async move {
            let session = ctx
                .start_session(index)
                .ok_or(ViewError::QuestionNotFound)?;
            let audio = ctx.audio();
            let config = session.config().clone();
            loading.set((0, config.total_pages()));

            let report = audio
                .preload(&config, |done, total| loading.set((done, total)))
                .await;
            for failure in &report.failures {
                log::warn!(
                    "track {} will stream directly: {}",
                    failure.track.tag(),
                    failure.error
                );
            }

            vm.set(Some(StoryVm::new(session)));
            Ok::<_, ViewError>(audio.sources_for(&config))
        }
    });
    let state = view_state_from_resource(resource);

    let submit = {
        let api = ctx.api();
        use_callback(move |()| {
            let mut vm = vm;
            let session = {
                let mut guard = vm.write();
                let Some(story) = guard.as_mut() else {
                    return;
                };
                if !story.begin_submit() {
                    return;
                }
                story.session().clone()
            };
            let api = api.clone();
            spawn(async move {
                let result = submit_answers(&session, api.as_ref()).await;
                if let Some(story) = vm.write().as_mut() {
                    story.finish_submit(&result);
                }
                match result {
                    Ok(SubmitOutcome::NextQuestion { next_url }) => {
                        log::debug!("server suggested next page {next_url:?}");
                        push_route(navigator, Route::after_question(index, question_count));
                    }
                    Ok(SubmitOutcome::Finished { result_file }) => {
                        push_route(
                            navigator,
                            Route::ThankYou {
                                result_file: result_file.unwrap_or_default(),
                            },
                        );
                    }
                    Err(err) => log::warn!("submit failed: {err}"),
                }
            });
        })
    };

    let dispatch_intent = use_callback(move |intent: StoryIntent| {
        let mut vm = vm;
        let effect = vm
            .write()
            .as_mut()
            .map_or(StoryEffect::None, |story| story.apply(intent));
        run_effect(effect, vm, submit);
    });

    #[cfg(test)]
    {
        let mut registered = use_signal(|| false);
        if !registered() {
            registered.set(true);
            if let Some(handles) = try_consume_context::<StoryTestHandles>() {
                handles.register(dispatch_intent, vm);
            }
        }
    }

    use_effect(move || {
        if started() || !matches!(&*resource.state().read(), UseResourceState::Ready) {
            return;
        }
        let Some(effect) = vm.read().as_ref().map(StoryVm::initial_effect) else {
            return;
        };
        started.set(true);
        let _ = eval(focus_story_script());
        spawn(watch_progress(vm));
        run_effect(effect, vm, submit);
    });

    let on_key = use_callback(move |evt: KeyboardEvent| {
        let has_alert = vm.read().as_ref().is_some_and(|story| story.alert().is_some());
        let key = evt.data.key();
        if has_alert {
            if matches!(key, Key::Enter | Key::Escape) {
                evt.prevent_default();
                dispatch_intent.call(StoryIntent::DismissAlert);
            }
            return;
        }
        let direction = match key {
            Key::ArrowRight => NavDirection::Forward,
            Key::ArrowLeft => NavDirection::Back,
            _ => return,
        };
        evt.prevent_default();
        dispatch_intent.call(StoryIntent::Navigate {
            direction,
            source: NavSource::Keyboard,
        });
    });

    let navigate = move |direction: NavDirection, source: NavSource| {
        dispatch_intent.call(StoryIntent::Navigate { direction, source });
    };

    let (done, total) = loading();

    rsx! {
        div {
            class: "page story-page",
            id: "story-root",
            tabindex: "0",
            onkeydown: on_key,
            ontouchstart: move |evt: TouchEvent| {
                let x = evt.data.touches().first().map(|touch| touch.client_coordinates().x);
                touch_start.set(x);
            },
            ontouchend: move |evt: TouchEvent| {
                let Some(start) = touch_start() else {
                    return;
                };
                touch_start.set(None);
                let Some(end) = evt.data.touches_changed().first().map(|touch| touch.client_coordinates().x) else {
                    return;
                };
                if let Some(direction) = swipe_direction(start, end) {
                    navigate(direction, NavSource::Swipe);
                }
            },
            match state {
                ViewState::Idle | ViewState::Loading => rsx! {
                    div { class: "story-loading",
                        p { "Loading audio... {done}/{total}" }
                    }
                },
                ViewState::Error(err) => rsx! {
                    div { class: "story-error",
                        p { "{err.message()}" }
                        button {
                            class: "btn btn-secondary",
                            r#type: "button",
                            onclick: move |_| {
                                let mut resource = resource;
                                resource.restart();
                            },
                            "Retry"
                        }
                    }
                },
                ViewState::Ready(sources) => rsx! {
                    StoryBody {
                        sources,
                        vm,
                        on_intent: dispatch_intent,
                    }
                },
            }
        }
    }
}

#[component]
fn StoryBody(
    sources: Sources,
    vm: Signal<Option<StoryVm>>,
    on_intent: EventHandler<StoryIntent>,
) -> Element {
    let guard = vm.read();
    let Some(story) = guard.as_ref() else {
        return rsx! {};
    };
    let config = story.config();
    let current = story.current_page();
    let total = story.total_pages();
    let is_last = story.is_last_page();
    let offset = format!("transform: translateX(-{}%);", current * 100);
    let right_zone = if story.forward_enabled() {
        "story-zone story-zone--right enabled"
    } else {
        "story-zone story-zone--right"
    };
    let next_label = if is_last { "Submit" } else { "Next" };
    let alert = story.alert().map(str::to_string);
    let submitting = story.submitting();
    let debug = story.session().debug();
    let summary = is_last.then(|| story.summary());

    let panels = sources
        .iter()
        .enumerate()
        .map(|(page, (track, source))| {
            let ratings = match track {
                AudioTrack::Prompt => Vec::new(),
                AudioTrack::Sample { id, .. } => config
                    .metrics
                    .iter()
                    .map(|metric| RatingData {
                        sample: id.clone(),
                        metric: metric.clone(),
                        selected: story.selected(id, metric.name()),
                    })
                    .collect(),
            };
            PanelData {
                page,
                active: page == current,
                track: track.clone(),
                src: source.src().to_string(),
                cached: source.is_cached(),
                status: story.status_line(track),
                playback: story.playback(track),
                ratings,
            }
        })
        .collect::<Vec<_>>();
    let segments = story.segments();
    drop(guard);

    rsx! {
        if debug {
            span { class: "story-debug", "Debug mode" }
        }
        ProgressSegments { segments, current, on_intent }
        div { class: "story-viewport",
            div {
                class: "story-zone story-zone--left",
                onclick: move |_| on_intent.call(StoryIntent::Navigate {
                    direction: NavDirection::Back,
                    source: NavSource::Click,
                }),
            }
            div { class: "story-track", style: "{offset}",
                for (page, panel) in panels.into_iter().map(|panel| (panel.page, panel)) {
                    StoryPanel { key: "{page}", panel, on_intent }
                }
            }
            div {
                class: "{right_zone}",
                onclick: move |_| on_intent.call(StoryIntent::Navigate {
                    direction: NavDirection::Forward,
                    source: NavSource::Click,
                }),
            }
        }
        if let Some(rows) = summary {
            RatingsSummary { rows }
        }
        div { class: "story-nav",
            button {
                class: "btn btn-secondary",
                id: "story-prev",
                r#type: "button",
                disabled: current == 0,
                onclick: move |_| on_intent.call(StoryIntent::Navigate {
                    direction: NavDirection::Back,
                    source: NavSource::Button,
                }),
                "Previous"
            }
            span { class: "story-nav__position", "{current + 1} / {total}" }
            button {
                class: "btn btn-primary",
                id: "story-next",
                r#type: "button",
                disabled: submitting,
                onclick: move |_| on_intent.call(StoryIntent::Navigate {
                    direction: NavDirection::Forward,
                    source: NavSource::Button,
                }),
                "{next_label}"
            }
        }
        if submitting {
            LoadingOverlay { label: "Saving...".to_string() }
        }
        if let Some(message) = alert {
            AlertModal {
                message,
                on_dismiss: move |()| on_intent.call(StoryIntent::DismissAlert),
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
struct RatingData {
    sample: SampleId,
    metric: Metric,
    selected: Option<i64>,
}

#[derive(Clone, Debug, PartialEq)]
struct PanelData {
    page: usize,
    active: bool,
    track: AudioTrack,
    src: String,
    cached: bool,
    status: String,
    playback: TrackPlayback,
    ratings: Vec<RatingData>,
}

#[component]
fn StoryPanel(panel: PanelData, on_intent: EventHandler<StoryIntent>) -> Element {
    let class = if panel.active {
        "story-page__panel active"
    } else {
        "story-page__panel"
    };
    let heading = match &panel.track {
        AudioTrack::Prompt => "Reference".to_string(),
        AudioTrack::Sample { index, .. } => format!("Sample {}", index + 1),
    };
    let PanelData {
        track,
        src,
        cached,
        status,
        playback,
        ratings,
        ..
    } = panel;
    let is_prompt = track == AudioTrack::Prompt;
    rsx! {
        section { class: "{class}",
            h2 { "{heading}" }
            if is_prompt {
                p { class: "story-hint", "Listen to the reference recording, then rate each sample." }
            }
            AudioPanel { track, src, cached, status, playback, on_intent }
            for rating in ratings {
                RatingRow {
                    key: "{rating.metric.name()}",
                    sample: rating.sample,
                    metric: rating.metric,
                    selected: rating.selected,
                    on_intent,
                }
            }
        }
    }
}

/// Carry out what the VM asked for after an intent.
fn push_route(navigator: Navigator, route: Route) {
    if let Some(failure) = navigator.push(route) {
        log::error!("navigation failed: {failure:?}");
    }
}

fn run_effect(effect: StoryEffect, vm: Signal<Option<StoryVm>>, submit: Callback<()>) {
    match effect {
        StoryEffect::None => {}
        StoryEffect::Play { track, delay } => {
            spawn(play_track(vm, track, delay));
        }
        StoryEffect::ScheduleAutoAdvance { page, delay } => {
            let mut vm = vm;
            spawn(async move {
                tokio::time::sleep(delay).await;
                let next = vm.write().as_mut().map_or(StoryEffect::None, |story| {
                    story.apply(StoryIntent::AutoAdvance {
                        scheduled_page: page,
                    })
                });
                run_effect(next, vm, submit);
            });
        }
        StoryEffect::Submit => submit.call(()),
    }
}

async fn play_track(mut vm: Signal<Option<StoryVm>>, track: AudioTrack, delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
        // Skip if the participant moved on while we waited.
        let still_current = vm
            .read()
            .as_ref()
            .is_some_and(|story| story.current_track().as_ref() == Some(&track));
        if !still_current {
            return;
        }
    }

    let key = track.element_key();
    let status = match eval(&play_script(&key)).join::<String>().await {
        Ok(raw) => PlaybackStatus::from_script_result(&raw),
        Err(err) => {
            log::warn!("playback of {key} failed: {err:?}");
            PlaybackStatus::Idle
        }
    };
    if let Some(story) = vm.write().as_mut() {
        story.set_status(&track, status);
    }
    if status != PlaybackStatus::AwaitingGesture {
        return;
    }

    log::info!("autoplay blocked for {key}, waiting for a click");
    let mut retry = eval(&gesture_retry_script(&key));
    match retry.recv::<String>().await {
        Ok(raw) => {
            if let Some(story) = vm.write().as_mut() {
                story.set_status(&track, PlaybackStatus::from_script_result(&raw));
            }
        }
        Err(err) => log::warn!("gesture retry for {key} failed: {err:?}"),
    }
}

async fn watch_progress(mut vm: Signal<Option<StoryVm>>) {
    let mut watcher = eval(progress_watch_script());
    while let Ok(message) = watcher.recv::<ProgressMessage>().await {
        let mut guard = vm.write();
        let Some(story) = guard.as_mut() else {
            continue;
        };
        let Some(track) = AudioTrack::all_for(story.config())
            .into_iter()
            .find(|track| track.element_key() == message.key)
        else {
            continue;
        };
        match message.event.as_str() {
            "play" => story.set_status(&track, PlaybackStatus::Playing),
            "ended" => story.set_status(&track, PlaybackStatus::Ended),
            _ => story.set_progress(&track, message.current, message.duration),
        }
    }
}

#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct StoryTestHandles {
    dispatch: Rc<RefCell<Option<Callback<StoryIntent>>>>,
    vm: Rc<RefCell<Option<Signal<Option<StoryVm>>>>>,
}

#[cfg(test)]
impl StoryTestHandles {
    pub(crate) fn register(&self, dispatch: Callback<StoryIntent>, vm: Signal<Option<StoryVm>>) {
        *self.dispatch.borrow_mut() = Some(dispatch);
        *self.vm.borrow_mut() = Some(vm);
    }

    pub(crate) fn dispatch(&self) -> Callback<StoryIntent> {
        (*self.dispatch.borrow()).expect("story dispatch registered")
    }

    pub(crate) fn vm(&self) -> Signal<Option<StoryVm>> {
        (*self.vm.borrow()).expect("story vm registered")
    }
}
