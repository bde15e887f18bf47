use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dioxus::LaunchBuilder;
use dioxus::desktop::{Config as DesktopConfig, WindowBuilder};
use listening_core::model::{QuestionConfig, parse_attribute_document};
use services::{AppServices, ClientConfig, Clock};
use ui::{App, UiApp, build_app_context};

const ENV_QUESTIONS: &str = "SURVEY_QUESTIONS";
const ENV_CACHE_URL: &str = "SURVEY_CACHE_URL";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidCacheUrl { raw: String },
    NoQuestions { path: PathBuf },
    PreloadIncomplete { failed: usize },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCacheUrl { raw } => write!(f, "invalid --cache value: {raw}"),
            ArgsError::NoQuestions { path } => {
                write!(f, "no questions found in {}", path.display())
            }
            ArgsError::PreloadIncomplete { failed } => {
                write!(f, "{failed} audio track(s) could not be preloaded")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

struct DesktopApp {
    questions: Vec<QuestionConfig>,
    services: AppServices,
}

impl UiApp for DesktopApp {
    fn questions(&self) -> Vec<QuestionConfig> {
        self.questions.clone()
    }

    fn services(&self) -> AppServices {
        self.services.clone()
    }
}

struct Args {
    server: Option<String>,
    questions: PathBuf,
    cache_url: Option<String>,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- ui      [--server <url>] [--questions <path>] [--cache <sqlite_url> | --no-cache]");
    eprintln!("  cargo run -p app -- preload [--server <url>] [--questions <path>] [--cache <sqlite_url> | --no-cache]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --server http://127.0.0.1:5000");
    eprintln!("  --questions questions.json");
    eprintln!("  --cache <user cache dir>/listening-survey/audio.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  SURVEY_BASE_URL, SURVEY_QUESTIONS, SURVEY_CACHE_URL, SURVEY_HEARTBEAT_SECS,");
    eprintln!("  SURVEY_AUDIO_TEMPLATE, SURVEY_AUTO_ADVANCE, SURVEY_ANSWER_LAYOUT, SURVEY_DEBUG");
    eprintln!("  RUST_LOG (default: info)");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Ui,
    Preload,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "ui" => Some(Self::Ui),
            "preload" => Some(Self::Preload),
            _ => None,
        }
    }
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut server = None;
        let mut questions = std::env::var(ENV_QUESTIONS)
            .ok()
            .map_or_else(|| PathBuf::from("questions.json"), PathBuf::from);
        let mut cache_url = Some(
            std::env::var(ENV_CACHE_URL)
                .ok()
                .map_or_else(default_cache_url, normalize_sqlite_url),
        );

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--server" => server = Some(require_value(args, "--server")?),
                "--questions" => questions = PathBuf::from(require_value(args, "--questions")?),
                "--cache" => {
                    let value = require_value(args, "--cache")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidCacheUrl { raw: value });
                    }
                    cache_url = Some(normalize_sqlite_url(value));
                }
                "--no-cache" => cache_url = None,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            server,
            questions,
            cache_url,
        })
    }
}

fn default_cache_url() -> String {
    let dir = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("listening-survey");
    format!("sqlite://{}", dir.join("audio.sqlite3").display())
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn load_questions(path: &Path) -> Result<Vec<QuestionConfig>, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let questions = parse_attribute_document(&raw)?
        .iter()
        .map(|attrs| QuestionConfig::from_attributes(attrs))
        .collect::<Result<Vec<_>, _>>()?;
    if questions.is_empty() {
        return Err(ArgsError::NoQuestions {
            path: path.to_path_buf(),
        }
        .into());
    }
    log::info!("loaded {} question(s) from {}", questions.len(), path.display());
    Ok(questions)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand launches the UI.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Ui,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Ui,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let mut config = ClientConfig::from_env();
    if let Some(server) = parsed.server.as_deref() {
        config = config.with_base_url(server)?;
    }
    log::info!("survey server: {}", config.base_url);

    if let Some(url) = parsed.cache_url.as_deref() {
        prepare_sqlite_file(url)?;
    }
    let services = AppServices::connect(config, parsed.cache_url.as_deref(), Clock::default()).await?;

    let mut questions = load_questions(&parsed.questions)?;
    for question in &mut questions {
        services.discover_defaulted_samples(question).await;
    }

    match cmd {
        Command::Ui => {
            let _heartbeat = services.spawn_heartbeat();
            let app: Arc<dyn UiApp> = Arc::new(DesktopApp {
                questions,
                services,
            });
            let context = build_app_context(&app);

            let desktop_cfg = DesktopConfig::new().with_window(
                WindowBuilder::new()
                    .with_title("Listening Test")
                    .with_always_on_top(false),
            );

            LaunchBuilder::desktop()
                .with_cfg(desktop_cfg)
                .with_context(context)
                .launch(App);
            Ok(())
        }
        Command::Preload => {
            let audio = services.audio();
            let mut failed = 0;
            for question in &questions {
                let report = audio
                    .preload(question, |done, total| {
                        log::debug!("{}: {done}/{total}", question.question_id);
                    })
                    .await;
                for failure in &report.failures {
                    eprintln!(
                        "{} {}: {}",
                        question.question_id,
                        failure.url.as_deref().unwrap_or(failure.track.tag()),
                        failure.error
                    );
                }
                println!(
                    "{}: {}/{} tracks cached",
                    question.question_id, report.loaded, report.total
                );
                failed += report.failures.len();
            }
            if failed > 0 {
                return Err(ArgsError::PreloadIncomplete { failed }.into());
            }
            Ok(())
        }
    }
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidCacheUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidCacheUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(err) = run().await {
        log::error!("{err}");
        eprintln!("{err}");
        std::process::exit(2);
    }
}
