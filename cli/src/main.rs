use std::io;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use time::Date;
use tracing::{Level, debug};

use blogsphere_client::net::types::{Credentials, PostSummary, Registration, SortDirection, SortField};
use blogsphere_client::state::criteria::{CriteriaUpdate, TagFilter, parse_date, popular_tag_filters};
use blogsphere_client::state::profile::load_profile;
use blogsphere_client::util::images::{DEFAULT_COVER, image_url_or, load_attachment};
use blogsphere_client::util::validation::PostDraft;
use blogsphere_client::{ApiError, ClientConfig, ClientContext, ConfigError, FetchStatus};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("[{code}] {0}", code = .0.error_code())]
    Api(#[from] ApiError),
    #[error("listing failed: {0}")]
    Listing(String),
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("not signed in; run `blogsphere login` first")]
    NotSignedIn,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "blogsphere", about = "Blogsphere blog client")]
struct Cli {
    /// Backend API base URL.
    #[arg(long, env = "BLOG_API_URL")]
    api_url: Option<String>,

    /// Directory holding the persisted session.
    #[arg(long, env = "BLOG_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Print full JSON instead of compact listings.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Log request activity to stderr.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "BLOG_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "BLOG_PASSWORD", hide_env_values = true)]
        password: String,
        /// Defaults to `--password`.
        #[arg(long)]
        confirm_password: Option<String>,
        #[arg(long)]
        avatar: Option<PathBuf>,
    },
    Logout,
    Whoami,
    Explore(ExploreArgs),
    /// List tag filters, `All` first.
    Tags,
    Show {
        id: String,
    },
    /// Show the signed-in user and their posts.
    Profile,
    Create(DraftArgs),
    Update {
        id: String,
        #[command(flatten)]
        draft: DraftArgs,
    },
    Delete {
        id: String,
    },
    /// Upload an image and print its URL.
    Upload {
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct ExploreArgs {
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    tag: Option<String>,
    /// createdAt | title | readTime | likes
    #[arg(long)]
    sort: Option<SortField>,
    /// asc | desc (defaults to the sort field's natural direction)
    #[arg(long)]
    order: Option<SortDirection>,
    #[arg(long, value_parser = parse_day)]
    from: Option<Date>,
    #[arg(long, value_parser = parse_day)]
    to: Option<Date>,
    /// Minimum read time in minutes.
    #[arg(long)]
    min_read: Option<u32>,
    /// Maximum read time in minutes.
    #[arg(long)]
    max_read: Option<u32>,
    /// Number of pages to load.
    #[arg(long, default_value_t = 1)]
    pages: u32,
}

#[derive(Args, Debug)]
struct DraftArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    description: String,
    #[arg(long, conflicts_with = "content_file")]
    content: Option<String>,
    #[arg(long)]
    content_file: Option<PathBuf>,
    /// Repeat for multiple tags.
    #[arg(long = "tag")]
    tags: Vec<String>,
    #[arg(long)]
    read_time: Option<u32>,
    #[arg(long)]
    image: Option<PathBuf>,
}

fn parse_day(raw: &str) -> Result<Date, String> {
    parse_date(raw).map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let mut config = ClientConfig::from_env()?;
    if let Some(api_url) = &cli.api_url {
        config = config.with_api_url(api_url);
    }
    if let Some(state_dir) = &cli.state_dir {
        config.state_dir.clone_from(state_dir);
    }
    debug!(api_url = %config.api_url, state_dir = %config.state_dir.display(), "client configured");
    let ctx = ClientContext::from_config(&config)?;

    match cli.command {
        Command::Login { email, password } => run_login(&ctx, email, password).await,
        Command::Signup { name, email, password, confirm_password, avatar } => {
            let avatar = avatar.as_deref().map(read_attachment).transpose()?;
            let registration = Registration {
                name,
                email,
                confirm_password: confirm_password.unwrap_or_else(|| password.clone()),
                password,
                avatar,
            };
            let user = ctx.session.signup(&registration).await?;
            println!("signed up as {} <{}>", user.name, user.email);
            Ok(())
        }
        Command::Logout => {
            ctx.session.logout().await;
            println!("signed out");
            Ok(())
        }
        Command::Whoami => {
            ctx.session.bootstrap().await;
            match ctx.session.current_user() {
                Some(user) if cli.json => print_json(&serde_json::to_value(user)?),
                Some(user) => {
                    println!("{} <{}> ({})", user.name, user.email, user.id);
                    Ok(())
                }
                None => Err(CliError::NotSignedIn),
            }
        }
        Command::Explore(args) => run_explore(&ctx, args, cli.json).await,
        Command::Tags => {
            for filter in popular_tag_filters(ctx.posts.as_ref()).await {
                println!("{}", filter.label());
            }
            Ok(())
        }
        Command::Show { id } => {
            let post = ctx.posts.get_post(&id).await?;
            print_json(&serde_json::to_value(post)?)
        }
        Command::Profile => {
            ctx.session.bootstrap().await;
            let profile = load_profile(&ctx.session, ctx.posts.as_ref()).await;
            let Some(user) = profile.user else {
                return Err(CliError::NotSignedIn);
            };
            println!("{} <{}>", user.name, user.email);
            if let Some(error) = profile.error {
                return Err(CliError::Listing(error));
            }
            print_posts(&ctx, &profile.posts, cli.json)
        }
        Command::Create(args) => {
            ctx.session.bootstrap().await;
            let draft = build_draft(args)?;
            let post = ctx.composer().publish(&draft).await?;
            println!("published {} ({})", post.title, post.id);
            Ok(())
        }
        Command::Update { id, draft } => {
            ctx.session.bootstrap().await;
            let draft = build_draft(draft)?;
            let post = ctx.composer().update(&id, &draft).await?;
            println!("updated {} ({})", post.title, post.id);
            Ok(())
        }
        Command::Delete { id } => {
            ctx.session.bootstrap().await;
            ctx.composer().delete(&id).await?;
            println!("deleted {id}");
            Ok(())
        }
        Command::Upload { path } => {
            ctx.session.bootstrap().await;
            let token = ctx.session.require_token()?;
            let attachment = read_attachment(&path)?;
            let uploaded = ctx.posts.upload_image(&token, &attachment).await?;
            println!("{}", image_url_or(&ctx.api_url, Some(&uploaded.image_url), DEFAULT_COVER));
            Ok(())
        }
    }
}

async fn run_login(ctx: &ClientContext, email: String, password: String) -> Result<(), CliError> {
    let user = ctx.session.login(&Credentials { email, password }).await?;
    println!("signed in as {} <{}>", user.name, user.email);
    Ok(())
}

async fn run_explore(ctx: &ClientContext, args: ExploreArgs, json: bool) -> Result<(), CliError> {
    let sort = match (args.sort, args.order) {
        (Some(field), Some(direction)) => Some((field, direction)),
        (Some(field), None) => Some((field, field.default_direction())),
        (None, Some(direction)) => Some((SortField::default(), direction)),
        (None, None) => None,
    };
    let update = CriteriaUpdate {
        search_text: args.search,
        tag: args.tag.as_deref().map(TagFilter::parse),
        sort,
        date_start: args.from.map(Some),
        date_end: args.to.map(Some),
        min_read_time: args.min_read.map(Some),
        max_read_time: args.max_read.map(Some),
    };

    let listing = ctx.listing();
    listing.set_criteria(update);
    let mut state = listing.settled().await;
    for _ in 1..args.pages.max(1) {
        if state.status == FetchStatus::Failed || !listing.load_more() {
            break;
        }
        state = listing.settled().await;
    }

    if state.status == FetchStatus::Failed {
        return Err(CliError::Listing(state.error.unwrap_or_default()));
    }
    print_posts(ctx, &state.items, json)?;
    if !json {
        let more = if state.has_more { ", more available" } else { "" };
        println!("-- {} of {} posts, page {}{more}", state.items.len(), state.total_count, state.page);
    }
    Ok(())
}

fn build_draft(args: DraftArgs) -> Result<PostDraft, CliError> {
    let content = match (&args.content, &args.content_file) {
        (_, Some(path)) => {
            std::fs::read_to_string(path).map_err(|source| CliError::ReadFile { path: path.clone(), source })?
        }
        (Some(content), None) => content.clone(),
        (None, None) => String::new(),
    };
    let image = args.image.as_deref().map(read_attachment).transpose()?;
    Ok(PostDraft {
        title: args.title,
        description: args.description,
        content,
        tags: args.tags,
        read_time: args.read_time,
        image,
    })
}

fn read_attachment(path: &Path) -> Result<blogsphere_client::net::types::Attachment, CliError> {
    load_attachment(path).map_err(|source| CliError::ReadFile { path: path.to_path_buf(), source })
}

fn print_posts(ctx: &ClientContext, posts: &[PostSummary], json: bool) -> Result<(), CliError> {
    if json {
        return print_json(&serde_json::to_value(posts)?);
    }
    for post in posts {
        let author = post.author.name.as_deref().unwrap_or("unknown");
        let read_time = post.read_time.map(|m| format!(" · {m} min")).unwrap_or_default();
        println!("{}  {}  by {author}{read_time}", post.id, post.title);
        if !post.tags.is_empty() {
            println!("    #{}", post.tags.join(" #"));
        }
        println!("    {}", image_url_or(&ctx.api_url, post.image.as_deref(), DEFAULT_COVER));
    }
    Ok(())
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
