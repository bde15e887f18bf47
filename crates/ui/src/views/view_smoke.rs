use listening_core::model::SampleId;
use listening_core::story::{NavDirection, NavSource};

use super::test_harness::{ApiCall, ViewKind, question, setup_view_harness};
use crate::vm::StoryIntent;

fn forward() -> StoryIntent {
    StoryIntent::Navigate {
        direction: NavDirection::Forward,
        source: NavSource::Keyboard,
    }
}

fn rate(sample: &str, value: i64) -> StoryIntent {
    StoryIntent::Rate {
        sample: SampleId::new(sample),
        metric: "quality".to_string(),
        value,
    }
}

#[tokio::test(flavor = "current_thread")]
async fn question_view_renders_cached_audio_after_preload() {
    let mut harness = setup_view_harness(
        ViewKind::Question(0),
        vec![question("q1", &["gt", "methodA"], false)],
    );
    harness.rebuild();
    harness.settle().await;

    let html = harness.render();
    assert!(html.contains("Reference"), "missing prompt page in {html}");
    assert!(html.contains("Sample 2"), "missing sample page in {html}");
    assert!(
        html.contains("data:audio/mpeg;base64,AQID"),
        "missing cached source in {html}"
    );
    assert!(html.contains("1 / 3"), "missing position in {html}");
    assert_eq!(harness.fetcher.fetched().len(), 3);
}

#[tokio::test(flavor = "current_thread")]
async fn unrated_sample_blocks_forward_with_alert() {
    let mut harness = setup_view_harness(
        ViewKind::Question(0),
        vec![question("q1", &["gt", "methodA"], false)],
    );
    harness.rebuild();
    harness.settle().await;

    harness.dispatch(forward());
    harness.dispatch(forward());
    assert_eq!(harness.read_vm(|vm| vm.current_page()), 1);

    let html = harness.render();
    assert!(html.contains("Missing: quality"), "missing alert in {html}");

    harness.dispatch(StoryIntent::DismissAlert);
    let html = harness.render();
    assert!(!html.contains("Missing: quality"), "alert still shown in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn rating_marks_selection_and_enables_forward_zone() {
    let mut harness = setup_view_harness(
        ViewKind::Question(0),
        vec![question("q1", &["gt", "methodA"], false)],
    );
    harness.rebuild();
    harness.settle().await;

    harness.dispatch(forward());
    let html = harness.render();
    assert!(!html.contains("story-zone--right enabled"), "zone enabled early in {html}");

    harness.dispatch(rate("gt", 4));
    let html = harness.render();
    assert!(html.contains("rating-btn selected"), "missing selection in {html}");
    assert!(html.contains("story-zone--right enabled"), "zone not enabled in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn submitting_last_question_saves_then_finishes() {
    let mut harness = setup_view_harness(
        ViewKind::Question(0),
        vec![question("q1", &["gt"], true)],
    );
    harness.rebuild();
    harness.settle().await;

    harness.dispatch(forward());
    harness.dispatch(rate("gt", 5));
    let html = harness.render();
    assert!(html.contains("Submit"), "missing submit label in {html}");
    assert!(html.contains("Your ratings"), "missing summary in {html}");

    harness.dispatch(forward());
    harness.settle().await;

    assert_eq!(harness.api.calls(), vec![ApiCall::Save, ApiCall::Finish]);
}

#[tokio::test(flavor = "current_thread")]
async fn rejected_save_shows_server_reason() {
    let mut harness = setup_view_harness(
        ViewKind::Question(0),
        vec![question("q1", &["gt"], true)],
    );
    harness.api.reject_saves("disk full");
    harness.rebuild();
    harness.settle().await;

    harness.dispatch(forward());
    harness.dispatch(rate("gt", 3));
    harness.dispatch(forward());
    harness.settle().await;

    assert_eq!(harness.api.calls(), vec![ApiCall::Save]);
    assert!(!harness.read_vm(|vm| vm.submitting()));
    let html = harness.render();
    assert!(
        html.contains("Error saving answers: disk full"),
        "missing error alert in {html}"
    );
}

#[tokio::test(flavor = "current_thread")]
async fn unknown_question_renders_error() {
    let mut harness = setup_view_harness(
        ViewKind::Question(4),
        vec![question("q1", &["gt"], true)],
    );
    harness.rebuild();
    harness.settle().await;

    let html = harness.render();
    assert!(
        html.contains("This question could not be found."),
        "missing error in {html}"
    );
    assert!(html.contains("Retry"), "missing retry in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn thank_you_view_shows_result_file() {
    let mut harness =
        setup_view_harness(ViewKind::ThankYou("participant_1.json".to_string()), Vec::new());
    harness.rebuild();

    let html = harness.render();
    assert!(html.contains("Thank you"), "missing title in {html}");
    assert!(html.contains("participant_1.json"), "missing result file in {html}");
}
