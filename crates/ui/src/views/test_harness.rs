use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dioxus::core::NoOpMutations;
use dioxus::prelude::*;
use dioxus_router::{Routable, Router};
use listening_core::model::{Metric, PromptId, QuestionConfig, QuestionId, SampleId};
use listening_core::time::fixed_clock;
use services::{
    ApiError, ApiResponse, AppServices, AudioError, AudioFetcher, ClientConfig, FetchedAudio,
    SaveRequest, SurveyApi,
};
use url::Url;

use crate::context::{UiApp, build_app_context};
use crate::views::question::StoryTestHandles;
use crate::views::{QuestionView, ThankYouView};
use crate::vm::StoryIntent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Save,
    Finish,
}

/// Survey server double that records calls.
pub struct FakeApi {
    calls: Mutex<Vec<ApiCall>>,
    save_response: Mutex<ApiResponse>,
}

impl FakeApi {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            save_response: Mutex::new(ApiResponse::ok()),
        }
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reject_saves(&self, reason: &str) {
        *self.save_response.lock().unwrap() = ApiResponse::failed(reason);
    }
}

#[async_trait]
impl SurveyApi for FakeApi {
    async fn save(&self, _request: &SaveRequest) -> Result<ApiResponse, ApiError> {
        self.calls.lock().unwrap().push(ApiCall::Save);
        Ok(self.save_response.lock().unwrap().clone())
    }

    async fn finish(&self) -> Result<ApiResponse, ApiError> {
        self.calls.lock().unwrap().push(ApiCall::Finish);
        Ok(ApiResponse::ok().with_result_file("participant_1.json"))
    }

    async fn heartbeat(&self) -> Result<(), ApiError> {
        Ok(())
    }

    async fn list_audio(&self, _prompt: &PromptId) -> Result<Vec<String>, ApiError> {
        Ok(Vec::new())
    }
}

/// Serves three bytes for every URL.
#[derive(Default)]
pub struct FakeFetcher {
    fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioFetcher for FakeFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedAudio, AudioError> {
        self.fetched.lock().unwrap().push(url.to_string());
        Ok(FetchedAudio {
            bytes: vec![1, 2, 3],
            content_type: Some("audio/mpeg".to_string()),
        })
    }
}

struct TestApp {
    questions: Vec<QuestionConfig>,
    services: AppServices,
}

impl UiApp for TestApp {
    fn questions(&self) -> Vec<QuestionConfig> {
        self.questions.clone()
    }

    fn services(&self) -> AppServices {
        self.services.clone()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum ViewKind {
    Question(usize),
    ThankYou(String),
}

#[derive(Props, Clone)]
struct ViewHarnessProps {
    app: Arc<TestApp>,
    view: ViewKind,
    story_handles: StoryTestHandles,
}

impl PartialEq for ViewHarnessProps {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for ViewHarnessProps {}

#[component]
fn ViewRouterHarness(props: ViewHarnessProps) -> Element {
    let app: Arc<dyn UiApp> = props.app.clone();
    use_context_provider(|| build_app_context(&app));
    use_context_provider(|| props.view.clone());
    use_context_provider(|| props.story_handles.clone());
    rsx! { Router::<TestRoute> {} }
}

#[derive(Clone, Routable, PartialEq)]
#[rustfmt::skip]
enum TestRoute {
    #[route("/")]
    Root {},
}

#[component]
fn Root() -> Element {
    match use_context::<ViewKind>() {
        ViewKind::Question(index) => rsx! { QuestionView { index } },
        ViewKind::ThankYou(result_file) => rsx! { ThankYouView { result_file } },
    }
}

pub struct ViewHarness {
    pub dom: VirtualDom,
    pub api: Arc<FakeApi>,
    pub fetcher: Arc<FakeFetcher>,
    pub story_handles: StoryTestHandles,
}

impl ViewHarness {
    pub fn rebuild(&mut self) {
        self.dom.rebuild_in_place();
        drive_dom(&mut self.dom);
    }

    pub async fn drive_async(&mut self) {
        let _ = tokio::time::timeout(Duration::from_millis(50), self.dom.wait_for_work()).await;
        self.dom.render_immediate(&mut NoOpMutations);
        self.dom.process_events();
    }

    /// Let spawned work (preload, submit) run to completion.
    pub async fn settle(&mut self) {
        for _ in 0..6 {
            self.drive_async().await;
        }
    }

    pub fn dispatch(&mut self, intent: StoryIntent) {
        let dispatch = self.story_handles.dispatch();
        self.dom.in_runtime(|| dispatch.call(intent));
        drive_dom(&mut self.dom);
    }

    pub fn read_vm<T>(&self, read: impl FnOnce(&crate::vm::StoryVm) -> T) -> T {
        let vm = self.story_handles.vm();
        self.dom.in_runtime(|| {
            let guard = vm.read();
            read(guard.as_ref().expect("story vm loaded"))
        })
    }

    pub fn render(&self) -> String {
        dioxus_ssr::render(&self.dom)
    }
}

pub fn drive_dom(dom: &mut VirtualDom) {
    dom.process_events();
    dom.render_immediate(&mut NoOpMutations);
    dom.process_events();
}

/// `samples` sample pages rated on one `quality` metric.
pub fn question(id: &str, samples: &[&str], is_last: bool) -> QuestionConfig {
    QuestionConfig {
        question_id: QuestionId::new(id),
        question_index: Some(0),
        prompt_id: PromptId::new("001"),
        samples: samples.iter().map(|s| SampleId::new(*s)).collect(),
        metrics: vec![Metric::new("quality")],
        is_last,
        next_url: None,
        prev_url: None,
        audio_root: "static/audio".to_string(),
        debug: false,
        samples_defaulted: false,
    }
}

pub fn setup_view_harness(view: ViewKind, questions: Vec<QuestionConfig>) -> ViewHarness {
    let api = Arc::new(FakeApi::new());
    let fetcher = Arc::new(FakeFetcher::default());
    let services = AppServices::from_parts(
        ClientConfig::default(),
        api.clone(),
        fetcher.clone(),
        None,
        fixed_clock(),
    );
    let app = Arc::new(TestApp {
        questions,
        services,
    });
    let story_handles = StoryTestHandles::default();

    let dom = VirtualDom::new_with_props(
        ViewRouterHarness,
        ViewHarnessProps {
            app,
            view,
            story_handles: story_handles.clone(),
        },
    );

    ViewHarness {
        dom,
        api,
        fetcher,
        story_handles,
    }
}
