mod logging;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use lockstep_core::config::Config;
use lockstep_core::extract::extract;
use lockstep_core::protocol::PlanResponse;
use lockstep_library::store::{sample_lesson, validate_lesson_id};
use lockstep_library::{Audience, Catalog, FileLessonStore, LessonOrigin, LessonStore, PublishPatch, import_lesson};

#[derive(Parser)]
#[command(
    name = "lockstep",
    about = "Presenter/follower focus synchronization for shared lessons",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve {
        /// Port to listen on (default: 5000)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the ordered targets of a stored lesson
    Plan { lesson_id: String },

    /// Render a marked-up file and print its targets
    Extract { file: PathBuf },

    /// Import a .txt or .md file as a new lesson
    Import {
        file: PathBuf,

        /// Lesson id (default: generated)
        #[arg(long)]
        id: Option<String>,

        /// Lesson title (default: derived from the file name)
        #[arg(long)]
        title: Option<String>,
    },

    /// Lesson catalog management
    Lessons {
        #[command(subcommand)]
        action: LessonsAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show system status
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum Role {
    Presenter,
    Follower,
}

impl From<Role> for Audience {
    fn from(role: Role) -> Self {
        match role {
            Role::Presenter => Audience::Presenter,
            Role::Follower => Audience::Follower,
        }
    }
}

#[derive(Subcommand)]
enum LessonsAction {
    /// List lessons visible to a role
    List {
        #[arg(long, value_enum, default_value = "presenter")]
        role: Role,

        /// Follower class filter
        #[arg(long)]
        class: Option<String>,

        /// Include unpublished lessons (presenter only)
        #[arg(long)]
        all: bool,
    },
    /// Update publish settings of a lesson
    Publish {
        id: String,

        #[arg(long)]
        published: Option<bool>,

        #[arg(long)]
        order: Option<i64>,

        /// Restrict to a class (repeatable)
        #[arg(long = "class")]
        classes: Vec<String>,
    },
    /// Register a lesson in the catalog, unpublished
    Register {
        id: String,

        #[arg(long)]
        title: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Get a specific config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config
    let config_path = cli.config.map(PathBuf::from).unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    logging::init(config.logging.as_ref(), cli.verbose);

    match cli.command {
        Commands::Serve { port } => serve(config, port).await?,
        Commands::Plan { lesson_id } => {
            let store = FileLessonStore::new(config.lessons_dir());
            let lesson = store.require(&lesson_id).await?;
            let targets = extract(&lesson.content_html).targets;
            let plan = PlanResponse { lesson_id, targets };
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Commands::Extract { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let extraction = extract(&raw);
            if extraction.literal_delimiters > 0 {
                tracing::warn!(
                    count = extraction.literal_delimiters,
                    "Unbalanced highlight delimiters kept as text"
                );
            }
            println!("{}", extraction.rendered);
            println!();
            for target in &extraction.targets {
                println!("{}\t{}", target.id, target.text);
            }
        }
        Commands::Import { file, id, title } => {
            let store = FileLessonStore::new(config.lessons_dir());
            let catalog = Catalog::new(config.index_path());
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let imported = import_lesson(&store, &catalog, &file_name(&file), &bytes, id, title).await?;
            println!("Imported '{}' as {}", imported.title, imported.lesson_id);
        }
        Commands::Lessons { action } => lessons(&config, action).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(&config)?;
                println!("{json}");
            }
            ConfigAction::Get { key } => match config.get_path(&key) {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => bail!("Config key '{key}' is not set"),
            },
            ConfigAction::Set { key, value } => {
                let mut config = config;
                // Accept JSON literals (numbers, booleans, arrays), else a plain string
                let value = serde_json::from_str(&value).unwrap_or(serde_json::Value::String(value));
                config.set_path(&key, value)?;
                let (warnings, errors) = config.validate();
                for w in &warnings {
                    tracing::warn!("{w}");
                }
                if !errors.is_empty() {
                    bail!("Invalid config: {}", errors.join("; "));
                }
                config.save(&config_path)?;
                println!("Set {key} in {}", config_path.display());
            }
        },
        Commands::Status => status(&config, &config_path).await,
    }

    Ok(())
}

async fn serve(config: Config, port: Option<u16>) -> anyhow::Result<()> {
    let (warnings, errors) = config.validate();
    for w in &warnings {
        tracing::warn!("Config: {w}");
    }
    if !errors.is_empty() {
        bail!("Invalid config: {}", errors.join("; "));
    }

    let port = port.unwrap_or_else(|| config.gateway_port());
    tracing::info!(
        lessons_dir = %config.lessons_dir().display(),
        tolerance = config.tolerance_seconds(),
        "Starting Lockstep gateway on port {port}"
    );

    let state = Arc::new(lockstep_gateway::GatewayState::from_config(config).await?);
    lockstep_gateway::start_gateway(state, port).await
}

async fn lessons(config: &Config, action: LessonsAction) -> anyhow::Result<()> {
    let store = FileLessonStore::new(config.lessons_dir());
    let catalog = Catalog::new(config.index_path());
    catalog.ensure_default(&sample_lesson()?.title).await?;

    match action {
        LessonsAction::List { role, class, all } => {
            let listed = catalog.merge(store.list().await?).await?;
            let visible: Vec<_> = listed
                .into_iter()
                .filter(|l| l.visible_to(role.into(), class.as_deref(), all))
                .collect();
            if visible.is_empty() {
                println!("No lessons.");
            }
            for l in visible {
                let origin = match l.source {
                    LessonOrigin::Builtin => "builtin",
                    LessonOrigin::Upload => "upload",
                };
                let state = if l.published { "published" } else { "draft" };
                let classes = if l.classes.is_empty() {
                    "all classes".to_string()
                } else {
                    l.classes.join(",")
                };
                println!("{:<20} {:<10} {:<8} {:>5}  {}  [{classes}]", l.id, state, origin, l.order, l.title);
            }
        }
        LessonsAction::Publish {
            id,
            published,
            order,
            classes,
        } => {
            validate_lesson_id(&id)?;
            let fallback_title = match store.load(&id).await? {
                Some(lesson) => lesson.title,
                None => id.clone(),
            };
            let patch = PublishPatch {
                published,
                classes: (!classes.is_empty()).then_some(classes),
                order,
            };
            let entry = catalog.publish(&id, &fallback_title, &patch).await?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        LessonsAction::Register { id, title } => {
            validate_lesson_id(&id)?;
            let entry = catalog.register(&id, title.as_deref().unwrap_or_default()).await?;
            println!("Registered {} ({})", entry.id, entry.title);
        }
    }
    Ok(())
}

async fn status(config: &Config, config_path: &Path) {
    println!("Lockstep v{}", env!("CARGO_PKG_VERSION"));
    println!("Config: {}", config_path.display());
    println!("Lessons: {}", config.lessons_dir().display());
    println!("Catalog: {}", config.index_path().display());
    println!("Gateway: {}:{}", config.gateway_bind(), config.gateway_port());
    println!("Tolerance: {}s", config.tolerance_seconds());

    let url = format!("http://127.0.0.1:{}/health", config.gateway_port());
    let health = match reqwest::Client::builder().timeout(Duration::from_secs(2)).build() {
        Ok(client) => match client.get(&url).send().await {
            Ok(resp) => resp.json::<serde_json::Value>().await.ok(),
            Err(_) => None,
        },
        Err(_) => None,
    };
    match health {
        Some(body) => println!(
            "Status: running (active lesson: {})",
            body["lesson_id"].as_str().unwrap_or("unknown")
        ),
        None => println!("Status: not running"),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
