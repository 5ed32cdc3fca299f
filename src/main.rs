//! fitcheck - Outfit feeds, likes, follows and saves from the terminal
#![allow(clippy::uninlined_format_args)]

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use fitcheck::api::{self, Client};
use fitcheck::feed::{FeedFetcher, FeedMode};
use fitcheck::models::ActivityKind;
use fitcheck::toggle::{Edge, EdgeToggle, SaveSelection};
use fitcheck::{Config, Database, Post, Session, collections, demo, posts, profiles};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load();

    // RUST_LOG wins over the configured level
    let level = config.as_ref().map_or("warn", |c| c.log_level.as_str());
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = config?;
    let (demo_mode, command) = parse_args()?;

    match command {
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Version => {
            print_version();
            Ok(())
        }
        Command::Session { handle } => select_session(&config, demo_mode, &handle).await,
        Command::Logout => logout(demo_mode),
        Command::Run(action) => {
            let ctx = Ctx::open(config, demo_mode)?;
            match action {
                Action::Whoami => {
                    whoami(&ctx);
                    Ok(())
                }
                Action::Feed { target, pages } => feed_cli(&ctx, target, pages).await,
                Action::Like { post_id } => like_cli(&ctx, post_id).await,
                Action::Follow { handle } => follow_cli(&ctx, &handle).await,
                Action::Save { post_id, to } => save_cli(&ctx, post_id, to).await,
                Action::Collections => collections_cli(&ctx).await,
            }
        }
    }
}

/// CLI commands
enum Command {
    Session { handle: String },
    Logout,
    Run(Action),
    Help,
    Version,
}

/// Commands that act as the selected session
enum Action {
    Whoami,
    Feed { target: FeedTarget, pages: usize },
    Like { post_id: Uuid },
    Follow { handle: String },
    Save { post_id: Uuid, to: Option<Vec<Uuid>> },
    Collections,
}

/// Feed selector as typed on the command line
enum FeedTarget {
    All,
    Following,
    User(String),
    Collection(Option<Uuid>),
}

fn parse_uuid(s: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(s).with_context(|| format!("Invalid {what}: {s}"))
}

fn parse_args() -> Result<(bool, Command)> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let demo_mode = args.iter().any(|a| a == "--demo");
    args.retain(|a| a != "--demo");

    let Some(first) = args.first() else {
        return Ok((demo_mode, Command::Help));
    };

    let command = match first.as_str() {
        "-h" | "--help" | "help" => Command::Help,
        "-v" | "--version" | "version" => Command::Version,

        "session" => {
            let handle = args
                .get(1)
                .ok_or_else(|| anyhow::anyhow!("Missing handle\nExample: fitcheck session mira"))?
                .clone();
            Command::Session { handle }
        }

        "logout" => Command::Logout,
        "whoami" => Command::Run(Action::Whoami),

        "feed" => {
            let pages = args
                .iter()
                .position(|a| a == "--pages" || a == "-p")
                .and_then(|i| args.get(i + 1))
                .map(|s| s.parse::<usize>())
                .transpose()
                .context("--pages expects a number")?
                .unwrap_or(1)
                .max(1);

            let target = match args.get(1).map(String::as_str) {
                None | Some("all" | "--pages" | "-p") => FeedTarget::All,
                Some("following") => FeedTarget::Following,
                Some("user") => {
                    let handle = args
                        .get(2)
                        .ok_or_else(|| anyhow::anyhow!("Missing handle for 'feed user'"))?;
                    FeedTarget::User(handle.clone())
                }
                Some("collection") => {
                    let id = args
                        .get(2)
                        .filter(|s| !s.starts_with('-'))
                        .map(|s| parse_uuid(s, "collection id"))
                        .transpose()?;
                    FeedTarget::Collection(id)
                }
                Some(other) => {
                    return Err(anyhow::anyhow!(
                        "Unknown feed: {other}\nExpected all, following, user <handle> or collection [id]"
                    ));
                }
            };
            Command::Run(Action::Feed { target, pages })
        }

        "like" => {
            let id = args
                .get(1)
                .ok_or_else(|| anyhow::anyhow!("Missing post id"))?;
            Command::Run(Action::Like {
                post_id: parse_uuid(id, "post id")?,
            })
        }

        "follow" => {
            let handle = args
                .get(1)
                .ok_or_else(|| anyhow::anyhow!("Missing handle"))?
                .clone();
            Command::Run(Action::Follow { handle })
        }

        "save" => {
            let id = args
                .get(1)
                .ok_or_else(|| anyhow::anyhow!("Missing post id"))?;
            let post_id = parse_uuid(id, "post id")?;

            // Parse --to flag
            let to = match args.iter().position(|a| a == "--to" || a == "-t") {
                Some(i) => {
                    let list = args
                        .get(i + 1)
                        .ok_or_else(|| anyhow::anyhow!("--to expects comma-separated collection ids"))?;
                    let ids = list
                        .split(',')
                        .filter(|s| !s.is_empty())
                        .map(|s| parse_uuid(s.trim(), "collection id"))
                        .collect::<Result<Vec<_>>>()?;
                    Some(ids)
                }
                None => None,
            };
            Command::Run(Action::Save { post_id, to })
        }

        "collections" => Command::Run(Action::Collections),

        other => {
            return Err(anyhow::anyhow!(
                "Unknown command: {other}\nRun 'fitcheck --help' for usage"
            ));
        }
    };

    Ok((demo_mode, command))
}

fn print_help() {
    let config_path = Config::default_path()
        .map_or_else(|_| "Unknown".to_string(), |p| p.display().to_string());

    println!(
        r#"{}
👗 fitcheck - Outfit feeds from the terminal

USAGE:
    fitcheck [--demo] <COMMAND>

COMMANDS:
    session <handle>                   Act as this profile from now on
    logout                             Forget the selected profile
    whoami                             Show the current profile

    feed [FEED] [OPTIONS]              Show a feed, newest first
      Feeds:
        all                            Every post (default)
        following                      Posts by profiles you follow
        user <handle>                  Posts by one profile
        collection [id]                Saved posts (default collection if no id)
      Options:
        -p, --pages <n>                Pages of 10 posts to load (default: 1)
      Examples:
        fitcheck feed following --pages 3
        fitcheck feed user sol

    like <post-id>                     Like or unlike a post
    follow <handle>                    Follow or unfollow a profile
    save <post-id> [OPTIONS]           Save or unsave a post
      Options:
        -t, --to <ids>                 Exact set of collections to save into
                                       (empty list unsaves everywhere)
    collections                        List your collections

OPTIONS:
    --demo                             Use built-in demo data, nothing is persisted
    -h, --help                         Show this help message
    -v, --version                      Show version information

CONFIG:
    {}
"#,
        fitcheck::LOGO,
        config_path
    );
}

fn print_version() {
    println!("fitcheck {}", fitcheck::VERSION);
}

/// Everything a command needs once a session is known
struct Ctx {
    client: Arc<Client>,
    session: Arc<Session>,
    config: Config,
    demo_mode: bool,
}

impl Ctx {
    fn open(config: Config, demo_mode: bool) -> Result<Self> {
        if demo_mode {
            return Ok(Self {
                client: Arc::new(Client::Memory(demo::demo_store()?)),
                session: Arc::new(demo::demo_session()),
                config,
                demo_mode,
            });
        }

        require_backend(&config)?;
        let db = Database::open()?;
        let session = db
            .load_session()?
            .ok_or_else(|| anyhow::anyhow!("No session selected. Run: fitcheck session <handle>"))?;
        db.touch_session()?;

        let client = api::get_client(&config, Some(&session))?;
        Ok(Self {
            client: Arc::new(client),
            session: Arc::new(session),
            config,
            demo_mode,
        })
    }

    fn source(&self) -> &Client {
        &self.client
    }
}

fn require_backend(config: &Config) -> Result<()> {
    if config.has_backend() {
        return Ok(());
    }
    let path = Config::default_path()
        .map_or_else(|_| "the config file".to_string(), |p| p.display().to_string());
    Err(anyhow::anyhow!(
        "No backend configured. Set backend_url and api_key in {path}, or pass --demo"
    ))
}

async fn select_session(config: &Config, demo_mode: bool, handle: &str) -> Result<()> {
    if demo_mode {
        let store = Client::Memory(demo::demo_store()?);
        let actor = profiles::find_by_handle(&store, handle).await?;
        println!("Demo profiles are fixed; {} is not saved.", actor.full_handle());
        return Ok(());
    }

    require_backend(config)?;
    let client = api::get_client(config, None)?;
    let actor = profiles::find_by_handle(&client, handle).await?;

    let db = Database::open()?;
    db.save_session(&Session::new(actor.clone()))?;
    println!("✓ Now acting as {} ({})", actor.full_handle(), actor.display_name);
    Ok(())
}

fn logout(demo_mode: bool) -> Result<()> {
    if demo_mode {
        println!("Demo mode has no saved session.");
        return Ok(());
    }

    let db = Database::open()?;
    match db.load_session()? {
        Some(session) => {
            db.clear_session()?;
            println!("✓ Stopped acting as {}", session.actor().full_handle());
        }
        None => println!("No session selected."),
    }
    Ok(())
}

fn whoami(ctx: &Ctx) {
    let actor = ctx.session.actor();
    println!("{} ({})", actor.full_handle(), actor.display_name);
    if let Some(bio) = &actor.bio {
        println!("{bio}");
    }
    println!("id: {}", actor.id);
    if ctx.demo_mode {
        println!("(demo mode)");
    }
}

async fn resolve_mode(ctx: &Ctx, target: FeedTarget) -> Result<FeedMode> {
    Ok(match target {
        FeedTarget::All => FeedMode::AllItems,
        FeedTarget::Following => FeedMode::FollowingItems,
        FeedTarget::User(handle) => {
            let actor = profiles::find_by_handle(ctx.source(), &handle).await?;
            FeedMode::ActorItems(actor.id)
        }
        FeedTarget::Collection(Some(id)) => FeedMode::CollectionItems(Some(id)),
        FeedTarget::Collection(None) => {
            let default = collections::ensure_default_collection(ctx.source(), &ctx.session).await?;
            FeedMode::CollectionItems(Some(default.id))
        }
    })
}

fn print_post(post: &Post) {
    println!("\n{} · {}   {}", post.author_label(), post.relative_time(), post.id);
    if let Some(caption) = &post.caption {
        println!("{caption}");
    }
    for piece in &post.pieces {
        match &piece.link {
            Some(link) => println!("  • {} ({}) {}", piece.name, piece.brand, link),
            None => println!("  • {} ({})", piece.name, piece.brand),
        }
    }
}

async fn feed_cli(ctx: &Ctx, target: FeedTarget, pages: usize) -> Result<()> {
    let mode = resolve_mode(ctx, target).await?;
    println!("{mode}");
    println!("{}", "─".repeat(60));

    let mut feed = FeedFetcher::new(Arc::clone(&ctx.client), Arc::clone(&ctx.session), mode)
        .with_has_more(ctx.config.has_more);
    feed.refresh().await?;
    for _ in 1..pages {
        if !feed.has_more() {
            break;
        }
        feed.load_more().await?;
    }

    if feed.posts().is_empty() {
        println!("\nNothing here yet.");
    }
    for post in feed.posts() {
        print_post(post);
    }

    if feed.has_more() {
        println!("\n… more with --pages {}", feed.page() + 1);
    }
    Ok(())
}

async fn like_cli(ctx: &Ctx, post_id: Uuid) -> Result<()> {
    let post = posts::get_post(ctx.source(), post_id).await?;
    let mut like = EdgeToggle::load(ctx.source(), &ctx.session, Edge::like(&post)).await?;

    let icon = like.edge().kind().emoji();
    if like.toggle(ctx.source()).await? {
        println!("{icon} Liked {}'s post", post.author_label());
    } else {
        println!("Unliked {}'s post", post.author_label());
    }
    Ok(())
}

async fn follow_cli(ctx: &Ctx, handle: &str) -> Result<()> {
    let target = profiles::find_by_handle(ctx.source(), handle).await?;
    if target.id == ctx.session.actor_id() {
        return Err(anyhow::anyhow!("You can't follow yourself"));
    }

    let mut follow = EdgeToggle::load(ctx.source(), &ctx.session, Edge::follow(target.id)).await?;
    let icon = follow.edge().kind().emoji();
    if follow.toggle(ctx.source()).await? {
        println!("{icon} Following {}", target.full_handle());
    } else {
        println!("✓ Unfollowed {}", target.full_handle());
    }
    Ok(())
}

async fn save_cli(ctx: &Ctx, post_id: Uuid, to: Option<Vec<Uuid>>) -> Result<()> {
    let post = posts::get_post(ctx.source(), post_id).await?;
    let mut selection = SaveSelection::load(ctx.source(), &ctx.session, &post).await?;

    // Without --to, flip between unsaved and the default collection
    let target: BTreeSet<Uuid> = match to {
        Some(ids) => ids.into_iter().collect(),
        None if selection.is_saved() => BTreeSet::new(),
        None => {
            let default = collections::ensure_default_collection(ctx.source(), &ctx.session).await?;
            BTreeSet::from([default.id])
        }
    };

    selection.apply(ctx.source(), target).await?;

    if selection.is_saved() {
        let names: Vec<String> = collections::list_collections(ctx.source(), &ctx.session)
            .await?
            .into_iter()
            .filter(|c| selection.saved().contains(&c.id))
            .map(|c| c.name)
            .collect();
        println!("{} Saved to {}", ActivityKind::Save.emoji(), names.join(", "));
    } else {
        println!("Removed from all collections");
    }
    Ok(())
}

async fn collections_cli(ctx: &Ctx) -> Result<()> {
    collections::ensure_default_collection(ctx.source(), &ctx.session).await?;
    let list = collections::list_collections(ctx.source(), &ctx.session).await?;

    println!("Collections:\n");
    for collection in list {
        let default_marker = if collection.is_default { " (default)" } else { "" };
        println!("  {}{}\n    {}", collection.name, default_marker, collection.id);
    }
    Ok(())
}
