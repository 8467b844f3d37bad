use std::{collections::HashSet, fs, path::Path, process, sync::Arc, time::Duration};

use bytes::Bytes;
use futures::StreamExt;
use mime_guess::MimeGuess;
use pedium::{
    application::{
        articles::{ArticleService, ArticleView, PublishRequest},
        authoring::AuthoringService,
        collaborators::{
            Account, BlobStore, DocumentStore, GenerativeModel, IdentityError, IdentityProvider,
            RealtimeFeed,
        },
        curator::Curator,
        engagement::EngagementService,
        error::{AppError, ErrorReport},
        feed::FeedService,
        importer::DraftImporter,
        notices::NoticeService,
        profiles::ProfileService,
        render::block_renderer,
    },
    config,
    domain::{
        document::{BlockDocument, ParseError},
        entities::{ArticleRecord, ProfileRecord},
        extract,
    },
    util::html::strip_tags,
    infra::{
        ai::GeminiClient,
        client::PlatformClient,
        error::InfraError,
        identity::HttpIdentityProvider,
        realtime::PollingFeed,
        state::{DraftSnapshot, PersistedSession, StateStore},
        storage::HttpBlobStore,
        store::HttpDocumentStore,
        telemetry,
    },
};
use tokio::sync::watch;
use tracing::{Dispatch, Level, debug, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

/// Editor session holder for the local drafting flow.
const DRAFT_HOLDER: &str = "pedium-cli";
/// Quiet period before an editor change is autosaved.
const AUTOSAVE_DEBOUNCE: Duration = Duration::from_millis(1500);

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_fatal_error(&error);
        process::exit(1);
    }
}

fn report_fatal_error(error: &AppError) {
    let report = ErrorReport::from_error("cli", error);
    if dispatcher::has_been_set() {
        error!(detail = %report.chain(), "{}", error.user_message());
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(detail = %report.chain(), "{}", error.user_message());
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("configuration could not be resolved: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Feed(config::FeedArgs::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Render(args) => run_render(args),
        config::Command::Extract(args) => run_extract(args),
        config::Command::Publish(args) => run_publish(settings, *args).await,
        config::Command::Draft(args) => run_draft(settings, args).await,
        config::Command::Seed(_) => run_seed(settings).await,
        config::Command::Feed(args) => run_feed(settings, args).await,
        config::Command::Article(args) => run_article(settings, args).await,
        config::Command::Authors(_) => run_authors(settings).await,
        config::Command::Watch(_) => run_watch(settings).await,
        config::Command::Like(args) => run_like(settings, args).await,
        config::Command::Comment(args) => run_comment(settings, args).await,
        config::Command::Follow(args) => run_follow(settings, args).await,
        config::Command::Notifications(args) => run_notifications(settings, args).await,
        config::Command::Signup(args) => run_signup(settings, args).await,
        config::Command::Login(args) => run_login(settings, args).await,
        config::Command::Logout(_) => run_logout(settings).await,
        config::Command::Whoami(_) => run_whoami(settings).await,
    }
}

/// Whether to resume the on-disk session when building the client stack.
/// Login and signup start fresh; the platform client adopts at most one
/// session per process, and theirs must be the new one.
#[derive(Clone, Copy, PartialEq)]
enum SessionMode {
    Resume,
    Fresh,
}

/// The client stack behind every networked command.
struct ClientContext {
    profiles: Arc<ProfileService>,
    articles: Arc<ArticleService>,
    feed: Arc<FeedService>,
    engagement: Arc<EngagementService>,
    notices: Arc<NoticeService>,
    authoring: Arc<AuthoringService>,
    importer: Arc<DraftImporter>,
    identity: Arc<dyn IdentityProvider>,
    blobs: Arc<dyn BlobStore>,
    state: StateStore,
}

fn build_client_context(
    settings: &config::Settings,
    session: SessionMode,
) -> Result<ClientContext, AppError> {
    let platform = Arc::new(PlatformClient::new(&settings.store)?);
    let state = StateStore::new(&settings.state.directory)?;
    if session == SessionMode::Resume {
        if let Some(persisted) = state.load_session()? {
            debug!(session_id = %persisted.id, "resuming persisted session");
            platform.adopt_session(persisted.secret);
        }
    }

    let store: Arc<dyn DocumentStore> = Arc::new(HttpDocumentStore::new(
        platform.clone(),
        settings.store.database.clone(),
    ));
    let blobs: Arc<dyn BlobStore> = Arc::new(HttpBlobStore::new(
        platform.clone(),
        settings.store.bucket.clone(),
    ));
    let identity: Arc<dyn IdentityProvider> = Arc::new(HttpIdentityProvider::new(platform));
    let model: Arc<dyn GenerativeModel> = Arc::new(GeminiClient::new(&settings.ai)?);
    let realtime: Arc<dyn RealtimeFeed> = Arc::new(PollingFeed::new(
        store.clone(),
        settings.realtime.poll_interval,
    ));

    let curator = Arc::new(Curator::new(model));
    Ok(ClientContext {
        profiles: Arc::new(ProfileService::new(
            store.clone(),
            identity.clone(),
            blobs.clone(),
            curator.clone(),
        )),
        articles: Arc::new(ArticleService::new(
            store.clone(),
            blobs.clone(),
            curator.clone(),
        )),
        feed: Arc::new(FeedService::new(store.clone())),
        engagement: Arc::new(EngagementService::new(store.clone())),
        notices: Arc::new(NoticeService::new(store, realtime)),
        authoring: Arc::new(AuthoringService::new(blobs.clone())),
        importer: Arc::new(DraftImporter::new(curator, blobs.clone())),
        identity,
        blobs,
        state,
    })
}

/// The signed-in account, required by every command that writes.
async fn current_account(ctx: &ClientContext) -> Result<Account, AppError> {
    ctx.identity
        .current_account()
        .await?
        .ok_or(AppError::Identity(IdentityError::Unauthorized))
}

/// The signed-in account's profile, required by authoring commands.
async fn current_author(ctx: &ClientContext) -> Result<ProfileRecord, AppError> {
    let account = current_account(ctx).await?;
    Ok(ctx.profiles.require(&account.id).await?)
}

fn read_document(path: &Path) -> Result<BlockDocument, AppError> {
    let raw = fs::read_to_string(path).map_err(|err| AppError::from(InfraError::Io(err)))?;
    Ok(BlockDocument::parse(&raw)?)
}

fn run_render(args: config::RenderArgs) -> Result<(), AppError> {
    let document = read_document(&args.file)?;
    println!("{}", block_renderer().render_document(&document));
    Ok(())
}

fn run_extract(args: config::ExtractArgs) -> Result<(), AppError> {
    let document = read_document(&args.file)?;
    let text = if args.speech {
        extract::speech_text(&document.blocks)
    } else {
        extract::plain_text(&document.blocks)
    };
    println!("{text}");

    // Stats go to stderr so stdout stays the bare text.
    let words = extract::word_count(&strip_tags(&extract::plain_text(&document.blocks)));
    eprintln!(
        "{words} words, {} min read",
        extract::reading_time_minutes(words)
    );
    Ok(())
}

async fn run_publish(
    settings: config::Settings,
    args: config::PublishArgs,
) -> Result<(), AppError> {
    let ctx = build_client_context(&settings, SessionMode::Resume)?;
    let author = current_author(&ctx).await?;

    let from_draft = args.file.is_none();
    let (title, topics, document) = match args.file {
        Some(path) => (
            args.title.unwrap_or_default(),
            args.topics.unwrap_or_default(),
            read_document(&path)?,
        ),
        None => {
            let draft = ctx
                .state
                .load_draft()?
                .ok_or_else(|| AppError::validation("no saved draft to publish"))?;
            let document = BlockDocument::parse(&draft.content.to_string())?;
            (
                args.title.unwrap_or(draft.title),
                args.topics.unwrap_or(draft.tags),
                document,
            )
        }
    };

    let cover_url = match (args.cover_url, args.cover_file) {
        (Some(url), _) => Some(url),
        (None, Some(path)) => Some(upload_cover(&ctx, &path).await?),
        (None, None) => None,
    };

    let article = ctx
        .articles
        .publish(
            &author,
            PublishRequest {
                title,
                topics,
                cover_url,
                document,
            },
        )
        .await?;
    if from_draft {
        ctx.state.clear_draft()?;
    }
    println!("Published \"{}\" ({})", article.title, article.id);
    Ok(())
}

/// Upload a local cover image and hand back its hosted URL.
async fn upload_cover(ctx: &ClientContext, path: &Path) -> Result<String, AppError> {
    let payload = fs::read(path).map_err(|err| AppError::from(InfraError::Io(err)))?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("cover.png");
    let content_type = MimeGuess::from_path(path).first_or_octet_stream().to_string();
    let file = ctx
        .blobs
        .upload(Bytes::from(payload), filename, &content_type)
        .await?;
    Ok(file.url)
}

async fn run_draft(settings: config::Settings, args: config::DraftArgs) -> Result<(), AppError> {
    let ctx = build_client_context(&settings, SessionMode::Resume)?;
    let author = if args.publish {
        Some(current_author(&ctx).await?)
    } else {
        None
    };

    let restored = match ctx.state.load_draft()? {
        Some(saved) => match BlockDocument::parse(&saved.content.to_string()) {
            Ok(document) => {
                debug!(title = %saved.title, "restored saved draft into the session");
                Some(document)
            }
            Err(reason) => {
                warn!(%reason, "saved draft is unreadable, starting fresh");
                None
            }
        },
        None => None,
    };

    ctx.authoring.open_session(DRAFT_HOLDER, restored);
    let changes = ctx.authoring.changes(DRAFT_HOLDER)?;
    let autosave = spawn_autosave(changes, ctx.state.clone(), args.topic.clone());

    info!(topic = %args.topic, "drafting article");
    let document = ctx.importer.generate(&args.topic).await?;
    ctx.authoring.set_document(DRAFT_HOLDER, document)?;
    let snapshot = ctx.authoring.snapshot(DRAFT_HOLDER)?;

    let result = finish_draft(&ctx, &args, author.as_ref(), snapshot).await;

    ctx.authoring.close_session(DRAFT_HOLDER);
    autosave.abort();
    let _ = autosave.await;
    result
}

async fn finish_draft(
    ctx: &ClientContext,
    args: &config::DraftArgs,
    author: Option<&ProfileRecord>,
    document: BlockDocument,
) -> Result<(), AppError> {
    if let Some(path) = &args.output {
        let encoded = document
            .to_json()
            .map_err(|err| AppError::from(ParseError::Json(err)))?;
        fs::write(path, encoded).map_err(|err| AppError::from(InfraError::Io(err)))?;
        println!("Draft written to {}", path.display());
    }

    match author {
        Some(author) => {
            let article = ctx
                .articles
                .publish(
                    author,
                    PublishRequest {
                        title: args.topic.clone(),
                        topics: String::new(),
                        cover_url: None,
                        document,
                    },
                )
                .await?;
            ctx.state.clear_draft()?;
            println!("Published \"{}\" ({})", article.title, article.id);
        }
        None if args.output.is_none() => {
            persist_draft(&ctx.state, &args.topic, &document);
            println!(
                "Draft for \"{}\" saved. Publish it with `pedium publish`.",
                args.topic
            );
        }
        None => {}
    }
    Ok(())
}

/// Mirror editor changes into the saved draft after a quiet period.
fn spawn_autosave(
    mut changes: watch::Receiver<BlockDocument>,
    state: StateStore,
    topic: String,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            tokio::time::sleep(AUTOSAVE_DEBOUNCE).await;
            let document = changes.borrow_and_update().clone();
            persist_draft(&state, &topic, &document);
        }
    })
}

/// Save the current draft unless there is nothing worth keeping.
fn persist_draft(state: &StateStore, topic: &str, document: &BlockDocument) {
    let content = match serde_json::to_value(document) {
        Ok(content) => content,
        Err(reason) => {
            warn!(%reason, "draft could not be serialized for autosave");
            return;
        }
    };
    let snapshot = DraftSnapshot::new(topic.to_string(), String::new(), content);
    if snapshot.is_empty() {
        return;
    }
    if let Err(reason) = state.save_draft(&snapshot) {
        warn!(%reason, "draft autosave failed");
    }
}

async fn run_seed(settings: config::Settings) -> Result<(), AppError> {
    let ctx = build_client_context(&settings, SessionMode::Resume)?;
    let author = current_author(&ctx).await?;
    let published = ctx.articles.seed(&author).await?;
    println!("Seeded {} sample articles.", published.len());
    Ok(())
}

async fn run_feed(settings: config::Settings, args: config::FeedArgs) -> Result<(), AppError> {
    let ctx = build_client_context(&settings, SessionMode::Resume)?;
    let articles = if let Some(term) = &args.search {
        if args.quick {
            ctx.feed.quick_search(term).await?
        } else {
            ctx.feed.search(term).await?
        }
    } else if args.trending {
        ctx.feed.trending().await?
    } else if let Some(author_id) = &args.author {
        ctx.feed.by_author(author_id).await?
    } else if args.following {
        let author = current_author(&ctx).await?;
        let followed: HashSet<String> = ctx
            .engagement
            .following(&author.user_id)
            .await?
            .into_iter()
            .map(|follow| follow.following_id)
            .collect();
        ctx.feed.by_authors(&followed).await?
    } else {
        ctx.feed.latest().await?
    };

    if articles.is_empty() {
        println!("No stories yet.");
        return Ok(());
    }
    for article in &articles {
        print_feed_entry(article);
    }
    Ok(())
}

fn print_feed_entry(article: &ArticleRecord) {
    println!("{}  {}", article.id, article.title);
    let mut line = format!(
        "    by {}, {} views, {} likes",
        article.author_name, article.views, article.likes_count
    );
    if !article.tags.is_empty() {
        line.push_str(&format!("  [{}]", article.tags.join(", ")));
    }
    println!("{line}");
    if !article.excerpt.is_empty() {
        println!("    {}", article.excerpt);
    }
}

async fn run_article(
    settings: config::Settings,
    args: config::ArticleArgs,
) -> Result<(), AppError> {
    let ctx = build_client_context(&settings, SessionMode::Resume)?;
    let article = ctx.articles.fetch(&args.id).await?;
    let view = ctx.articles.view(article)?;

    if args.speech {
        println!("{}", view.speech_text);
    } else {
        print_article(&view);
        match ctx.engagement.comments(&args.id).await {
            Ok(comments) if !comments.is_empty() => {
                println!();
                println!("Comments ({}):", comments.len());
                for comment in &comments {
                    println!("  {}: {}", comment.user_name, comment.content);
                }
            }
            Ok(_) => {}
            Err(reason) => warn!(%reason, "comments could not be loaded"),
        }
    }

    match ctx.state.mark_viewed(&view.article.id) {
        Ok(true) => ctx.articles.record_view(&view.article).await,
        Ok(false) => debug!(article_id = %view.article.id, "view already counted"),
        Err(reason) => warn!(%reason, "view marker could not be written"),
    }
    Ok(())
}

fn print_article(view: &ArticleView) {
    let article = &view.article;
    println!("# {}", article.title);
    println!(
        "by {}, {} min read, {} words",
        article.author_name, view.reading_time_minutes, view.word_count
    );
    if !article.tags.is_empty() {
        println!("[{}]", article.tags.join(", "));
    }
    println!();
    println!("{}", view.html);
}

async fn run_authors(settings: config::Settings) -> Result<(), AppError> {
    let ctx = build_client_context(&settings, SessionMode::Resume)?;
    let authors = ctx.profiles.authors().await?;
    if authors.is_empty() {
        println!("No authors yet.");
        return Ok(());
    }
    for author in &authors {
        println!("{}  {} followers", author.name, author.followers_count);
        if let Some(bio) = author.bio.as_deref().filter(|bio| !bio.is_empty()) {
            println!("    {bio}");
        }
    }
    Ok(())
}

async fn run_watch(settings: config::Settings) -> Result<(), AppError> {
    let ctx = build_client_context(&settings, SessionMode::Resume)?;
    let author = current_author(&ctx).await?;
    let mut alerts = ctx.notices.alerts_for(&author.user_id).await?;

    println!("Watching for new stories from authors you follow. Press Ctrl-C to stop.");
    while let Some(alert) = alerts.next().await {
        info!(article_id = %alert.article_id, "new story alert");
        println!("{}  {}", alert.message, alert.link);
    }
    Ok(())
}

async fn run_like(settings: config::Settings, args: config::LikeArgs) -> Result<(), AppError> {
    let ctx = build_client_context(&settings, SessionMode::Resume)?;
    let account = current_account(&ctx).await?;
    let toggle = ctx.engagement.toggle_like(&args.id, &account.id).await?;
    if toggle.liked {
        println!("Liked ({} likes).", toggle.likes_count);
    } else {
        println!("Like removed ({} likes).", toggle.likes_count);
    }
    Ok(())
}

async fn run_comment(
    settings: config::Settings,
    args: config::CommentArgs,
) -> Result<(), AppError> {
    let ctx = build_client_context(&settings, SessionMode::Resume)?;
    let account = current_account(&ctx).await?;
    let comment = ctx
        .engagement
        .post_comment(&args.id, &account, &args.text)
        .await?;
    println!("Comment posted as {}.", comment.user_name);
    Ok(())
}

async fn run_follow(settings: config::Settings, args: config::FollowArgs) -> Result<(), AppError> {
    let ctx = build_client_context(&settings, SessionMode::Resume)?;
    let account = current_account(&ctx).await?;
    let following = ctx
        .engagement
        .toggle_follow(&account.id, &args.user_id)
        .await?;
    if following {
        println!("Following {}.", args.user_id);
    } else {
        println!("Unfollowed {}.", args.user_id);
    }
    Ok(())
}

async fn run_notifications(
    settings: config::Settings,
    args: config::NotificationsArgs,
) -> Result<(), AppError> {
    let ctx = build_client_context(&settings, SessionMode::Resume)?;

    if let Some(id) = &args.mark_read {
        if ctx.notices.mark_read(id).await {
            println!("Notification {id} marked read.");
        } else {
            println!("Notification {id} could not be marked read.");
        }
        return Ok(());
    }

    let account = current_account(&ctx).await?;
    let notifications = ctx.notices.notifications(&account.id).await;
    if notifications.is_empty() {
        println!("No notifications.");
        return Ok(());
    }
    let unread = notifications.iter().filter(|n| !n.read).count();
    for notification in &notifications {
        let marker = if notification.read { ' ' } else { '*' };
        println!("{marker} {}  {}", notification.id, notification.message);
    }
    println!("{unread} unread.");
    Ok(())
}

async fn run_signup(settings: config::Settings, args: config::SignupArgs) -> Result<(), AppError> {
    let ctx = build_client_context(&settings, SessionMode::Fresh)?;
    let registration = ctx
        .profiles
        .signup(&args.email, &args.password, &args.name)
        .await?;
    ctx.state.save_session(&PersistedSession {
        id: registration.session.id.clone(),
        secret: registration.session.secret.clone(),
    })?;
    println!("Welcome to Pedium, {}.", registration.profile.name);
    Ok(())
}

async fn run_login(settings: config::Settings, args: config::LoginArgs) -> Result<(), AppError> {
    let ctx = build_client_context(&settings, SessionMode::Fresh)?;
    let session = ctx
        .identity
        .create_session(&args.email, &args.password)
        .await?;
    ctx.state.save_session(&PersistedSession {
        id: session.id,
        secret: session.secret,
    })?;
    match ctx.identity.current_account().await {
        Ok(Some(account)) => println!("Logged in as {}.", account.name),
        _ => println!("Logged in."),
    }
    Ok(())
}

async fn run_logout(settings: config::Settings) -> Result<(), AppError> {
    let ctx = build_client_context(&settings, SessionMode::Resume)?;
    match ctx.identity.delete_session().await {
        Ok(()) => {}
        Err(IdentityError::Unauthorized) => {
            debug!("session already expired server-side");
        }
        Err(err) => return Err(AppError::from(err)),
    }
    ctx.state.clear_session()?;
    println!("Logged out.");
    Ok(())
}

async fn run_whoami(settings: config::Settings) -> Result<(), AppError> {
    let ctx = build_client_context(&settings, SessionMode::Resume)?;
    match ctx.identity.current_account().await? {
        Some(account) => match ctx.profiles.fetch(&account.id).await? {
            Some(profile) => println!(
                "{} <{}>, {} followers",
                profile.name, account.email, profile.followers_count
            ),
            None => println!("{} <{}>", account.name, account.email),
        },
        None => println!("Not logged in."),
    }
    Ok(())
}
