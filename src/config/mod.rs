//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "pedium";
const DEFAULT_STORE_ENDPOINT: &str = "https://fra.cloud.appwrite.io/v1";
const DEFAULT_STORE_PROJECT: &str = "693821ff0038ccf96160";
const DEFAULT_STORE_DATABASE: &str = "pedium_db";
const DEFAULT_STORE_BUCKET: &str = "images";
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_AI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_AI_TEXT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_AI_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
const DEFAULT_STATE_DIR: &str = ".pedium";
const DEFAULT_REALTIME_POLL_SECS: u64 = 3;

/// Command-line arguments for the Pedium binary.
#[derive(Debug, Parser)]
#[command(name = "pedium", version, about = "Pedium publishing CLI")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PEDIUM_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// One variant per user-facing action; `pedium` with no subcommand shows the feed.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render a block document file to HTML on stdout.
    Render(RenderArgs),
    /// Extract plain or speech text from a block document file.
    Extract(ExtractArgs),
    /// Publish an article from a block document file.
    Publish(Box<PublishArgs>),
    /// Generate an article draft with the AI model.
    Draft(DraftArgs),
    /// Populate the store with the built-in sample articles.
    Seed(SeedArgs),
    /// Show the article feed.
    Feed(FeedArgs),
    /// Fetch one article and render it.
    Article(ArticleArgs),
    /// List authors, most followed first.
    Authors(AuthorsArgs),
    /// Stream new-story notices from followed authors.
    Watch(WatchArgs),
    /// Toggle a like on an article.
    Like(LikeArgs),
    /// Comment on an article.
    Comment(CommentArgs),
    /// Follow or unfollow an author.
    Follow(FollowArgs),
    /// List notifications for the signed-in account.
    Notifications(NotificationsArgs),
    /// Create an account and its profile.
    Signup(SignupArgs),
    /// Open a session and persist its token.
    Login(LoginArgs),
    /// Close the current session.
    Logout(LogoutArgs),
    /// Show the currently signed-in account.
    Whoami(WhoamiArgs),
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Path to a block document JSON file.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Emit speech text instead of plain text.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub speech: bool,

    /// Path to a block document JSON file.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct PublishArgs {
    #[command(flatten)]
    pub overrides: ClientOverrides,

    /// Article title. Defaults to the saved draft's title when publishing
    /// from the draft.
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Comma-separated topics; left empty, tags are generated.
    #[arg(long, value_name = "TOPICS")]
    pub topics: Option<String>,

    /// Use an already-hosted cover image instead of generating one.
    #[arg(long = "cover-url", value_name = "URL")]
    pub cover_url: Option<String>,

    /// Upload a local image as the cover instead of generating one.
    #[arg(long = "cover-file", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub cover_file: Option<PathBuf>,

    /// Path to a block document JSON file. Omitted, the saved draft is
    /// published.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct DraftArgs {
    #[command(flatten)]
    pub overrides: ClientOverrides,

    /// Topic to write about.
    #[arg(value_name = "TOPIC")]
    pub topic: String,

    /// Write the drafted block document to this file instead of stdout.
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Publish the draft immediately after generating it.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub publish: bool,
}

#[derive(Debug, Args, Clone)]
pub struct SeedArgs {
    #[command(flatten)]
    pub overrides: ClientOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct FeedArgs {
    #[command(flatten)]
    pub overrides: ClientOverrides,

    /// Filter articles by a search query.
    #[arg(long, value_name = "QUERY")]
    pub search: Option<String>,

    /// Abbreviated search: title and tags only, first five matches.
    #[arg(long, action = clap::ArgAction::SetTrue, requires = "search")]
    pub quick: bool,

    /// Order by view count instead of recency.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub trending: bool,

    /// Show one author's stories.
    #[arg(long, value_name = "USER_ID")]
    pub author: Option<String>,

    /// Show only articles by authors you follow.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub following: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ArticleArgs {
    #[command(flatten)]
    pub overrides: ClientOverrides,

    /// Emit speech text instead of rendered HTML.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub speech: bool,

    /// Article document id.
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Debug, Args, Clone)]
pub struct AuthorsArgs {
    #[command(flatten)]
    pub overrides: ClientOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct WatchArgs {
    #[command(flatten)]
    pub overrides: ClientOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct LikeArgs {
    #[command(flatten)]
    pub overrides: ClientOverrides,

    /// Article document id.
    #[arg(value_name = "ARTICLE_ID")]
    pub id: String,
}

#[derive(Debug, Args, Clone)]
pub struct CommentArgs {
    #[command(flatten)]
    pub overrides: ClientOverrides,

    /// Article document id.
    #[arg(value_name = "ARTICLE_ID")]
    pub id: String,

    /// Comment text.
    #[arg(value_name = "TEXT")]
    pub text: String,
}

#[derive(Debug, Args, Clone)]
pub struct FollowArgs {
    #[command(flatten)]
    pub overrides: ClientOverrides,

    /// User id of the author to follow or unfollow.
    #[arg(value_name = "USER_ID")]
    pub user_id: String,
}

#[derive(Debug, Args, Clone)]
pub struct NotificationsArgs {
    #[command(flatten)]
    pub overrides: ClientOverrides,

    /// Mark one notification read instead of listing.
    #[arg(long = "mark-read", value_name = "ID")]
    pub mark_read: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct SignupArgs {
    #[command(flatten)]
    pub overrides: ClientOverrides,

    /// Email address for the new account.
    #[arg(long, value_name = "EMAIL")]
    pub email: String,

    /// Password for the new account.
    #[arg(long, value_name = "PASSWORD")]
    pub password: String,

    /// Display name for the new account.
    #[arg(long, value_name = "NAME")]
    pub name: String,
}

#[derive(Debug, Args, Clone)]
pub struct LoginArgs {
    #[command(flatten)]
    pub overrides: ClientOverrides,

    /// Email address of the account.
    #[arg(long, value_name = "EMAIL")]
    pub email: String,

    /// Password of the account.
    #[arg(long, value_name = "PASSWORD")]
    pub password: String,
}

#[derive(Debug, Args, Clone)]
pub struct LogoutArgs {
    #[command(flatten)]
    pub overrides: ClientOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct WhoamiArgs {
    #[command(flatten)]
    pub overrides: ClientOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Emit log lines as JSON instead of the compact format.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct StoreOverrides {
    /// Override the document store endpoint URL.
    #[arg(long = "store-endpoint", value_name = "URL")]
    pub store_endpoint: Option<String>,

    /// Override the store project id.
    #[arg(long = "store-project", value_name = "ID")]
    pub store_project: Option<String>,

    /// Override the store API key.
    #[arg(long = "store-api-key", value_name = "KEY")]
    pub store_api_key: Option<String>,

    /// Override the database id.
    #[arg(long = "store-database", value_name = "ID")]
    pub store_database: Option<String>,

    /// Override the image bucket id.
    #[arg(long = "store-bucket", value_name = "ID")]
    pub store_bucket: Option<String>,

    /// Override the store request timeout.
    #[arg(long = "store-timeout-seconds", value_name = "SECONDS")]
    pub store_timeout_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct AiOverrides {
    /// Override the generative model endpoint URL.
    #[arg(long = "ai-endpoint", value_name = "URL")]
    pub ai_endpoint: Option<String>,

    /// Override the generative model API key.
    #[arg(long = "ai-api-key", value_name = "KEY")]
    pub ai_api_key: Option<String>,

    /// Override the text generation model id.
    #[arg(long = "ai-text-model", value_name = "MODEL")]
    pub ai_text_model: Option<String>,

    /// Override the image generation model id.
    #[arg(long = "ai-image-model", value_name = "MODEL")]
    pub ai_image_model: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ClientOverrides {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub store: StoreOverrides,

    #[command(flatten)]
    pub ai: AiOverrides,

    /// Override the local state directory.
    #[arg(long = "state-dir", value_name = "PATH")]
    pub state_dir: Option<PathBuf>,

    /// Override the realtime poll cadence.
    #[arg(long = "realtime-poll-seconds", value_name = "SECONDS")]
    pub realtime_poll_seconds: Option<u64>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub store: StoreSettings,
    pub ai: AiSettings,
    pub state: StateSettings,
    pub realtime: RealtimeSettings,
}

/// How diagnostics are written to stderr.
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

/// Encoding for stderr log lines.
#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub endpoint: Url,
    pub project: String,
    pub api_key: Option<String>,
    pub database: String,
    pub bucket: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AiSettings {
    pub endpoint: Url,
    pub api_key: Option<String>,
    pub text_model: String,
    pub image_model: String,
}

#[derive(Debug, Clone)]
pub struct StateSettings {
    pub directory: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RealtimeSettings {
    pub poll_interval: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("configuration sources could not be read: {0}")]
    Build(#[from] config::ConfigError),
    #[error("bad value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::Invalid { key, reason }
    }
}

/// Resolve settings, later sources winning: config files, then environment
/// variables, then command-line flags.
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = [DEFAULT_CONFIG_BASENAME, LOCAL_CONFIG_BASENAME]
        .into_iter()
        .fold(Config::builder(), |builder, basename| {
            builder.add_source(File::with_name(basename).required(false))
        });

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("PEDIUM").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Render(args)) => raw.apply_logging_overrides(&args.logging),
        Some(Command::Extract(args)) => raw.apply_logging_overrides(&args.logging),
        Some(Command::Publish(args)) => raw.apply_client_overrides(&args.overrides),
        Some(Command::Draft(args)) => raw.apply_client_overrides(&args.overrides),
        Some(Command::Seed(args)) => raw.apply_client_overrides(&args.overrides),
        Some(Command::Feed(args)) => raw.apply_client_overrides(&args.overrides),
        Some(Command::Article(args)) => raw.apply_client_overrides(&args.overrides),
        Some(Command::Authors(args)) => raw.apply_client_overrides(&args.overrides),
        Some(Command::Watch(args)) => raw.apply_client_overrides(&args.overrides),
        Some(Command::Like(args)) => raw.apply_client_overrides(&args.overrides),
        Some(Command::Comment(args)) => raw.apply_client_overrides(&args.overrides),
        Some(Command::Follow(args)) => raw.apply_client_overrides(&args.overrides),
        Some(Command::Notifications(args)) => raw.apply_client_overrides(&args.overrides),
        Some(Command::Signup(args)) => raw.apply_client_overrides(&args.overrides),
        Some(Command::Login(args)) => raw.apply_client_overrides(&args.overrides),
        Some(Command::Logout(args)) => raw.apply_client_overrides(&args.overrides),
        Some(Command::Whoami(args)) => raw.apply_client_overrides(&args.overrides),
        None => raw.apply_client_overrides(&ClientOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Mirror of the file format; every field is optional so partial files work.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    store: RawStoreSettings,
    ai: RawAiSettings,
    state: RawStateSettings,
    realtime: RawRealtimeSettings,
}

impl RawSettings {
    fn apply_client_overrides(&mut self, overrides: &ClientOverrides) {
        self.apply_logging_overrides(&overrides.logging);
        self.apply_store_overrides(&overrides.store);
        self.apply_ai_overrides(&overrides.ai);
        if let Some(directory) = overrides.state_dir.as_ref() {
            self.state.directory = Some(directory.clone());
        }
        if let Some(seconds) = overrides.realtime_poll_seconds {
            self.realtime.poll_seconds = Some(seconds);
        }
    }

    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_store_overrides(&mut self, overrides: &StoreOverrides) {
        if let Some(endpoint) = overrides.store_endpoint.as_ref() {
            self.store.endpoint = Some(endpoint.clone());
        }
        if let Some(project) = overrides.store_project.as_ref() {
            self.store.project = Some(project.clone());
        }
        if let Some(key) = overrides.store_api_key.as_ref() {
            self.store.api_key = Some(key.clone());
        }
        if let Some(database) = overrides.store_database.as_ref() {
            self.store.database = Some(database.clone());
        }
        if let Some(bucket) = overrides.store_bucket.as_ref() {
            self.store.bucket = Some(bucket.clone());
        }
        if let Some(seconds) = overrides.store_timeout_seconds {
            self.store.timeout_seconds = Some(seconds);
        }
    }

    fn apply_ai_overrides(&mut self, overrides: &AiOverrides) {
        if let Some(endpoint) = overrides.ai_endpoint.as_ref() {
            self.ai.endpoint = Some(endpoint.clone());
        }
        if let Some(key) = overrides.ai_api_key.as_ref() {
            self.ai.api_key = Some(key.clone());
        }
        if let Some(model) = overrides.ai_text_model.as_ref() {
            self.ai.text_model = Some(model.clone());
        }
        if let Some(model) = overrides.ai_image_model.as_ref() {
            self.ai.image_model = Some(model.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            store,
            ai,
            state,
            realtime,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let store = build_store_settings(store)?;
        let ai = build_ai_settings(ai)?;
        let state = build_state_settings(state)?;
        let realtime = build_realtime_settings(realtime)?;

        Ok(Self {
            logging,
            store,
            ai,
            state,
            realtime,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = logging
        .level
        .as_deref()
        .map(LevelFilter::from_str)
        .transpose()
        .map_err(|err| LoadError::invalid("logging.level", format!("unrecognized level: {err}")))?
        .unwrap_or(LevelFilter::INFO);

    let format = match logging.json {
        Some(true) => LogFormat::Json,
        _ => LogFormat::Compact,
    };

    Ok(LoggingSettings { level, format })
}

fn build_store_settings(store: RawStoreSettings) -> Result<StoreSettings, LoadError> {
    let endpoint = http_url(
        store
            .endpoint
            .unwrap_or_else(|| DEFAULT_STORE_ENDPOINT.to_string()),
        "store.endpoint",
    )?;

    let project = store
        .project
        .unwrap_or_else(|| DEFAULT_STORE_PROJECT.to_string());
    if project.trim().is_empty() {
        return Err(LoadError::invalid("store.project", "must not be empty"));
    }

    let api_key = store.api_key.and_then(normalize_secret);

    let database = store
        .database
        .unwrap_or_else(|| DEFAULT_STORE_DATABASE.to_string());
    if database.trim().is_empty() {
        return Err(LoadError::invalid("store.database", "must not be empty"));
    }

    let bucket = store
        .bucket
        .unwrap_or_else(|| DEFAULT_STORE_BUCKET.to_string());
    if bucket.trim().is_empty() {
        return Err(LoadError::invalid("store.bucket", "must not be empty"));
    }

    let timeout_seconds = store.timeout_seconds.unwrap_or(DEFAULT_STORE_TIMEOUT_SECS);
    let timeout_seconds = non_zero_u32(timeout_seconds, "store.timeout_seconds")?;

    Ok(StoreSettings {
        endpoint,
        project,
        api_key,
        database,
        bucket,
        timeout: Duration::from_secs(timeout_seconds.get().into()),
    })
}

fn build_ai_settings(ai: RawAiSettings) -> Result<AiSettings, LoadError> {
    let endpoint = http_url(
        ai.endpoint
            .unwrap_or_else(|| DEFAULT_AI_ENDPOINT.to_string()),
        "ai.endpoint",
    )?;

    let api_key = ai.api_key.and_then(normalize_secret);

    let text_model = ai
        .text_model
        .unwrap_or_else(|| DEFAULT_AI_TEXT_MODEL.to_string());
    if text_model.trim().is_empty() {
        return Err(LoadError::invalid("ai.text_model", "must not be empty"));
    }

    let image_model = ai
        .image_model
        .unwrap_or_else(|| DEFAULT_AI_IMAGE_MODEL.to_string());
    if image_model.trim().is_empty() {
        return Err(LoadError::invalid("ai.image_model", "must not be empty"));
    }

    Ok(AiSettings {
        endpoint,
        api_key,
        text_model,
        image_model,
    })
}

fn build_state_settings(state: RawStateSettings) -> Result<StateSettings, LoadError> {
    let directory = state
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "state.directory",
            "path must not be empty",
        ));
    }

    Ok(StateSettings { directory })
}

fn build_realtime_settings(realtime: RawRealtimeSettings) -> Result<RealtimeSettings, LoadError> {
    let poll_seconds = realtime.poll_seconds.unwrap_or(DEFAULT_REALTIME_POLL_SECS);
    let poll_seconds = non_zero_u32(poll_seconds, "realtime.poll_seconds")?;

    Ok(RealtimeSettings {
        poll_interval: Duration::from_secs(poll_seconds.get().into()),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    json: Option<bool>,
    level: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    endpoint: Option<String>,
    project: Option<String>,
    api_key: Option<String>,
    database: Option<String>,
    bucket: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAiSettings {
    endpoint: Option<String>,
    api_key: Option<String>,
    text_model: Option<String>,
    image_model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStateSettings {
    directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRealtimeSettings {
    poll_seconds: Option<u64>,
}

fn http_url(value: String, key: &'static str) -> Result<Url, LoadError> {
    let url = Url::parse(value.trim())
        .map_err(|err| LoadError::invalid(key, format!("invalid URL `{value}`: {err}")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(LoadError::invalid(key, "must be an http(s) URL"));
    }
    Ok(url)
}

fn normalize_secret(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    u32::try_from(value)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| LoadError::invalid(key, "must be a positive value that fits in u32"))
}

/// Parse the command line and resolve settings against it in one step.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    load(&args).map(|settings| (args, settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_values_win_over_file_values() {
        let mut raw = RawSettings::default();
        raw.store.endpoint = Some("https://file.example/v1".to_string());
        raw.logging.level = Some("info".to_string());

        let overrides = ClientOverrides {
            store: StoreOverrides {
                store_endpoint: Some("https://flag.example/v1".to_string()),
                ..Default::default()
            },
            logging: LoggingOverrides {
                log_level: Some("debug".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        raw.apply_client_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.store.endpoint.as_str(), "https://flag.example/v1");
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    }

    #[test]
    fn defaults_resolve_without_any_input() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

        assert_eq!(settings.store.endpoint.as_str(), DEFAULT_STORE_ENDPOINT);
        assert_eq!(settings.store.database, DEFAULT_STORE_DATABASE);
        assert_eq!(settings.store.bucket, DEFAULT_STORE_BUCKET);
        assert!(settings.store.api_key.is_none());
        assert_eq!(settings.ai.text_model, DEFAULT_AI_TEXT_MODEL);
        assert_eq!(settings.ai.image_model, DEFAULT_AI_IMAGE_MODEL);
        assert_eq!(settings.state.directory, PathBuf::from(DEFAULT_STATE_DIR));
        assert_eq!(settings.realtime.poll_interval, Duration::from_secs(3));
    }

    #[test]
    fn json_flag_switches_the_log_format() {
        let mut raw = RawSettings::default();
        let overrides = ClientOverrides {
            logging: LoggingOverrides {
                log_json: Some(true),
                ..Default::default()
            },
            ..Default::default()
        };

        raw.apply_client_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    fn blank_api_keys_collapse_to_none() {
        let mut raw = RawSettings::default();
        raw.store.api_key = Some("   ".to_string());
        raw.ai.api_key = Some("\t".to_string());

        let settings = Settings::from_raw(raw).expect("valid settings");

        assert!(settings.store.api_key.is_none());
        assert!(settings.ai.api_key.is_none());
    }

    #[test]
    fn malformed_endpoint_is_rejected() {
        let mut raw = RawSettings::default();
        raw.store.endpoint = Some("not a url".to_string());

        let err = Settings::from_raw(raw).expect_err("endpoint must fail validation");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "store.endpoint",
                ..
            }
        ));
    }

    #[test]
    fn zero_poll_cadence_is_rejected() {
        let mut raw = RawSettings::default();
        raw.realtime.poll_seconds = Some(0);

        let err = Settings::from_raw(raw).expect_err("poll cadence must fail validation");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "realtime.poll_seconds",
                ..
            }
        ));
    }

    #[test]
    fn default_to_feed_command() {
        let args = CliArgs::parse_from(["pedium"]);
        let command = args.command.unwrap_or(Command::Feed(FeedArgs::default()));
        assert!(matches!(command, Command::Feed(_)));
    }

    #[test]
    fn parse_publish_arguments() {
        let args = CliArgs::parse_from([
            "pedium",
            "publish",
            "--title",
            "On Borrowing",
            "--topics",
            "Programming, Rust",
            "article.json",
        ]);

        match args.command {
            Some(Command::Publish(publish)) => {
                assert_eq!(publish.title.as_deref(), Some("On Borrowing"));
                assert_eq!(publish.topics.as_deref(), Some("Programming, Rust"));
                assert!(publish.cover_url.is_none());
                assert_eq!(publish.file, Some(PathBuf::from("article.json")));
            }
            _ => panic!("wrong command parsed"),
        }
    }
}
