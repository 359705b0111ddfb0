use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use client::app::{App, Notifier};
use client::config::{ClientConfig, ConfigError, normalize_base_url};
use client::net::api::{article, tools, user};
use client::net::error::ApiError;
use client::net::types::{
    Article, ArticleQuery, ArticleStatus, ChangePasswordRequest, ChatMessage, ChatRequest, CreateArticleRequest,
    ImageKind, LoginRequest, PageResponse, RegisterRequest, ReviewAction, ReviewRequest, UpdateArticleRequest,
    UpdateAvatarRequest, UpdateUserRequest,
};
use client::router::guard::{Location, NavigationError};
use client::state::auth::{self, ProfileFetch};
use client::state::storage::FileStorage;
use serde_json::Value;


#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error("not logged in; run `inkwell login <username>` first")]
    NotLoggedIn,
    #[error("cannot read {path}: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "inkwell", about = "Inkwell blog platform client")]
struct Cli {
    #[arg(long, env = "INKWELL_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "INKWELL_SESSION_FILE")]
    session_file: Option<PathBuf>,

    /// Repeat for more log output (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and cache the token and profile.
    Login {
        username: String,
        #[arg(long, env = "INKWELL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register {
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "INKWELL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    /// Show the cached profile.
    Whoami {
        #[arg(long, default_value_t = false)]
        refresh: bool,
    },
    Passwd {
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
    },
    Profile {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
    },
    Avatar {
        url: String,
    },
    Article(ArticleCommand),
    Review(ReviewCommand),
    /// Upload an image and print its URL.
    Upload {
        file: PathBuf,
        #[arg(long, default_value_t = false)]
        cover: bool,
    },
    /// Ask the AI assistant.
    Chat {
        message: String,
        #[arg(long, default_value = "x1")]
        model: String,
    },
    Net(NetCommand),
    /// Resolve a page path through the router and auth guard.
    Open {
        path: String,
    },
}

#[derive(Args, Debug)]
struct ArticleCommand {
    #[command(subcommand)]
    command: ArticleSubcommand,
}

#[derive(Subcommand, Debug)]
enum ArticleSubcommand {
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        size: Option<u32>,
        #[arg(long)]
        status: Option<ArticleStatus>,
        #[arg(long)]
        author: Option<i64>,
        #[arg(long)]
        keyword: Option<String>,
    },
    Show {
        id: i64,
    },
    Mine {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        size: Option<u32>,
        #[arg(long)]
        status: Option<ArticleStatus>,
    },
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, conflicts_with = "content_file")]
        content: Option<String>,
        #[arg(long)]
        content_file: Option<PathBuf>,
        #[arg(long)]
        cover: Option<String>,
        #[arg(long)]
        status: Option<ArticleStatus>,
    },
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "content_file")]
        content: Option<String>,
        #[arg(long)]
        content_file: Option<PathBuf>,
        #[arg(long)]
        cover: Option<String>,
    },
    Delete {
        id: i64,
    },
    /// Submit a draft for review.
    Submit {
        id: i64,
    },
    Like {
        id: i64,
    },
    Unlike {
        id: i64,
    },
}

#[derive(Args, Debug)]
struct ReviewCommand {
    #[command(subcommand)]
    command: ReviewSubcommand,
}

#[derive(Subcommand, Debug)]
enum ReviewSubcommand {
    Pending {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        size: Option<u32>,
    },
    Approve {
        id: i64,
        #[arg(long, default_value = "")]
        comment: String,
    },
    Reject {
        id: i64,
        #[arg(long)]
        comment: String,
    },
}

#[derive(Args, Debug)]
struct NetCommand {
    #[command(subcommand)]
    command: NetSubcommand,
}

#[derive(Subcommand, Debug)]
enum NetSubcommand {
    Ip,
    Dns {
        domain: String,
    },
    Port {
        host: String,
        port: u16,
    },
    Download {
        #[arg(long, default_value_t = 1_048_576)]
        size: u64,
    },
    Upload {
        #[arg(long, default_value_t = 1_048_576)]
        bytes: usize,
    },
    Proxy {
        url: String,
        #[arg(long, default_value = "GET")]
        method: String,
    },
}

/// Prints every failed request to stderr, one line each.
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        // Request failures were already printed by the notifier.
        Err(CliError::Api(ApiError::Request(err))) => {
            if err.is_unauthorized() {
                eprintln!("session expired; run `inkwell login <username>`");
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config.base_url = normalize_base_url(base_url)?;
    }
    if let Some(path) = &cli.session_file {
        config.session_file.clone_from(path);
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = build_config(&cli)?;
    let storage = Arc::new(FileStorage::open(config.session_file.clone()));
    tracing::debug!(path = %storage.path().display(), "using session file");
    let app = App::start(config, storage, Arc::new(StderrNotifier))?;

    let result = dispatch(&app, cli.command).await;
    app.shutdown().await;
    result
}

/// Page a command belongs to. Commands with a page go through the auth guard first.
fn route_for(command: &Command) -> Option<String> {
    let path = match command {
        Command::Login { .. } | Command::Register { .. } | Command::Logout => return None,
        Command::Open { path } => path.clone(),
        Command::Whoami { .. } | Command::Passwd { .. } | Command::Profile { .. } | Command::Avatar { .. } => {
            "/home".to_owned()
        }
        Command::Article(cmd) => match &cmd.command {
            ArticleSubcommand::List { .. } => "/articles".to_owned(),
            ArticleSubcommand::Mine { .. } => "/articles/my".to_owned(),
            ArticleSubcommand::Create { .. } => "/articles/create".to_owned(),
            ArticleSubcommand::Edit { id, .. } => format!("/articles/edit/{id}"),
            ArticleSubcommand::Show { id }
            | ArticleSubcommand::Delete { id }
            | ArticleSubcommand::Submit { id }
            | ArticleSubcommand::Like { id }
            | ArticleSubcommand::Unlike { id } => format!("/articles/{id}"),
        },
        Command::Review(_) => "/admin/articles/review".to_owned(),
        Command::Upload { .. } => "/articles/create".to_owned(),
        Command::Chat { .. } => "/tools/sparkai".to_owned(),
        Command::Net(_) => "/tools/network".to_owned(),
    };
    Some(path)
}

fn enter(app: &App, path: &str) -> Result<Location, CliError> {
    let location = app.navigate(path)?;
    if location.guarded {
        return Err(CliError::NotLoggedIn);
    }
    Ok(location)
}

async fn dispatch(app: &App, command: Command) -> Result<(), CliError> {
    if let Some(path) = route_for(&command) {
        let location = enter(app, &path)?;
        if let Command::Open { .. } = command {
            print_location(&location);
            return Ok(());
        }
    }

    let client = app.client();
    match command {
        Command::Login { username, password } => {
            let outcome = auth::login(client, &LoginRequest { username: username.clone(), password }).await?;
            match outcome {
                ProfileFetch::Loaded(profile) => {
                    println!("logged in as {}", profile.username.as_deref().unwrap_or(&username));
                }
                ProfileFetch::Failed(message) => println!("logged in; profile unavailable: {message}"),
                ProfileFetch::Stale | ProfileFetch::Skipped => println!("logged in"),
            }
        }
        Command::Register { username, email, password } => {
            user::register(client, &RegisterRequest { username: username.clone(), password, email })
                .await
                .text()?;
            println!("registered {username}; run `inkwell login {username}`");
        }
        Command::Logout => {
            auth::logout(client);
            println!("logged out");
        }
        Command::Whoami { refresh } => {
            if refresh {
                auth::refresh_profile(client).await;
            }
            match app.session().profile() {
                Some(profile) => print_json(&serde_json::to_value(profile)?)?,
                None => println!("logged in; profile not loaded (try --refresh)"),
            }
        }
        Command::Passwd { old, new } => {
            let req = ChangePasswordRequest { old_password: old, new_password: new };
            user::change_password(client, &req).await.text()?;
            auth::logout(client);
            println!("password changed; log in again");
        }
        Command::Profile { username, email } => {
            user::update_info(client, &UpdateUserRequest { username, email }).await.text()?;
            auth::refresh_profile(client).await;
            println!("profile updated");
        }
        Command::Avatar { url } => {
            user::update_avatar(client, &UpdateAvatarRequest { avatar: url }).await.text()?;
            auth::refresh_profile(client).await;
            println!("avatar updated");
        }
        Command::Article(cmd) => run_article(app, cmd.command).await?,
        Command::Review(cmd) => run_review(app, cmd.command).await?,
        Command::Upload { file, cover } => {
            let bytes = read_file(&file)?;
            let name = file
                .file_name()
                .map_or_else(|| "image".to_owned(), |n| n.to_string_lossy().into_owned());
            let kind = if cover { ImageKind::Cover } else { ImageKind::Content };
            let data = article::upload_image(client, &name, bytes, kind).await.json::<Value>()?;
            print_json(&data)?;
        }
        Command::Chat { message, model } => {
            let req = ChatRequest { model, messages: vec![ChatMessage::user(message)] };
            let data = tools::spark_chat(client, &req).await.json::<Value>()?;
            match chat_reply(&data) {
                Some(reply) => println!("{reply}"),
                None => print_json(&data)?,
            }
        }
        Command::Net(cmd) => run_net(app, cmd.command).await?,
        Command::Open { .. } => {}
    }
    Ok(())
}

async fn run_article(app: &App, command: ArticleSubcommand) -> Result<(), CliError> {
    let client = app.client();
    match command {
        ArticleSubcommand::List { page, size, status, author, keyword } => {
            let query = ArticleQuery { page, size, status, author_id: author, keyword };
            let listing = article::list(client, &query).await.json::<PageResponse<Article>>()?;
            print_page(&listing);
        }
        ArticleSubcommand::Mine { page, size, status } => {
            let listing = article::my_articles(client, page, size, status)
                .await
                .json::<PageResponse<Article>>()?;
            print_page(&listing);
        }
        ArticleSubcommand::Show { id } => {
            // Opening an article counts as a view; a failed count is reported but not fatal.
            article::view(client, id).await;
            let data = article::detail(client, id).await.json::<Value>()?;
            print_json(&data)?;
        }
        ArticleSubcommand::Create { title, content, content_file, cover, status } => {
            let req = CreateArticleRequest {
                title,
                content: read_content(content, content_file.as_deref())?.unwrap_or_default(),
                cover_image: cover,
                images: Vec::new(),
                status,
            };
            let data = article::create(client, &req).await.json::<Value>()?;
            print_json(&data)?;
        }
        ArticleSubcommand::Edit { id, title, content, content_file, cover } => {
            let req = UpdateArticleRequest {
                title,
                content: read_content(content, content_file.as_deref())?,
                cover_image: cover,
                ..UpdateArticleRequest::default()
            };
            let data = article::update(client, id, &req).await.json::<Value>()?;
            print_json(&data)?;
        }
        ArticleSubcommand::Delete { id } => {
            article::delete(client, id).await.text()?;
            println!("deleted article {id}");
        }
        ArticleSubcommand::Submit { id } => {
            article::submit(client, id).await.text()?;
            println!("submitted article {id} for review");
        }
        ArticleSubcommand::Like { id } => {
            article::like(client, id).await.text()?;
            println!("liked article {id}");
        }
        ArticleSubcommand::Unlike { id } => {
            article::unlike(client, id).await.text()?;
            println!("unliked article {id}");
        }
    }
    Ok(())
}

async fn run_review(app: &App, command: ReviewSubcommand) -> Result<(), CliError> {
    let client = app.client();
    let (id, req) = match command {
        ReviewSubcommand::Pending { page, size } => {
            let listing = article::pending(client, page, size).await.json::<PageResponse<Article>>()?;
            print_page(&listing);
            return Ok(());
        }
        ReviewSubcommand::Approve { id, comment } => (id, ReviewRequest { action: ReviewAction::Approve, comment }),
        ReviewSubcommand::Reject { id, comment } => (id, ReviewRequest { action: ReviewAction::Reject, comment }),
    };
    article::review(client, id, &req).await.text()?;
    println!("article {id}: {:?}", req.action);
    Ok(())
}

async fn run_net(app: &App, command: NetSubcommand) -> Result<(), CliError> {
    let client = app.client();
    match command {
        NetSubcommand::Ip => print_json(&tools::public_ip(client).await.json::<Value>()?)?,
        NetSubcommand::Dns { domain } => print_json(&tools::dns_info(client, &domain).await.json::<Value>()?)?,
        NetSubcommand::Port { host, port } => {
            print_json(&tools::port_test(client, &host, port).await.json::<Value>()?)?;
        }
        NetSubcommand::Proxy { url, method } => {
            print_json(&tools::proxy(client, &url, &method).await.json::<Value>()?)?;
        }
        NetSubcommand::Download { size } => {
            let envelope = tools::speedtest_download(client, size).await;
            envelope.text()?;
            println!(
                "downloaded {} bytes in {:?} ({:.2} Mbit/s)",
                envelope.body_len,
                envelope.elapsed,
                mbps(envelope.body_len, envelope.elapsed)
            );
        }
        NetSubcommand::Upload { bytes } => {
            let envelope = tools::speedtest_upload(client, vec![0u8; bytes]).await;
            envelope.text()?;
            println!(
                "uploaded {bytes} bytes in {:?} ({:.2} Mbit/s)",
                envelope.elapsed,
                mbps(bytes, envelope.elapsed)
            );
        }
    }
    Ok(())
}

// =============================================================================
// OUTPUT
// =============================================================================

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

fn print_location(location: &Location) {
    println!("{} ({})", location.path, location.title.unwrap_or("untitled"));
    for (name, value) in &location.params {
        println!("  {name} = {value}");
    }
    if let Some(from) = &location.redirected_from {
        println!("  redirected from {from}");
    }
}

fn print_page(page: &PageResponse<Article>) {
    for article in &page.records {
        println!("{}", article_row(article));
    }
    println!("page {}/{} ({} total)", page.current, page.pages, page.total);
}

fn article_row(article: &Article) -> String {
    let status = article.status.map_or("-", ArticleStatus::as_str);
    format!(
        "{:>6}  {:<8}  {}  [{} views, {} likes]",
        article.id, status, article.title, article.view_count, article.like_count
    )
}

/// First reply text of an OpenAI-style chat completion.
fn chat_reply(data: &Value) -> Option<&str> {
    data.pointer("/choices/0/message/content").and_then(Value::as_str)
}

#[allow(clippy::cast_precision_loss)]
fn mbps(bytes: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    (bytes as f64 * 8.0) / secs / 1_000_000.0
}

// =============================================================================
// INPUT
// =============================================================================

fn read_file(path: &Path) -> Result<Vec<u8>, CliError> {
    std::fs::read(path).map_err(|source| CliError::ReadFile { path: path.to_owned(), source })
}

fn read_content(inline: Option<String>, file: Option<&Path>) -> Result<Option<String>, CliError> {
    match file {
        Some(path) => {
            let bytes = read_file(path)?;
            Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
        }
        None => Ok(inline),
    }
}
