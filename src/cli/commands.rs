use crate::config::ServerConfig;
use crate::descriptor::{load_descriptor, Application, LoadOptions};
use crate::hot_reload::watch_repository;
use crate::repository::{DirectoryStore, FileResolver, WebRepository};
use crate::logging::init_logging_with_config;
use crate::router::{PathSegment, Target};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Command-line interface for Servlex
///
/// Inspects descriptors and repositories: validation, routing tables and route resolution.
#[derive(Parser)]
#[command(name = "servlex")]
#[command(about = "Servlex CLI", long_about = None)]
pub struct Cli {
    /// Server configuration file
    #[arg(short, long, global = true, env = "SERVLEX_CONFIG")]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Load every webapp of a repository and report the result
    Check {
        /// Repository directory (overrides the configuration)
        #[arg(short, long)]
        repository: Option<PathBuf>,

        /// Keep running and reload the repository when it changes (also `hot-reload: true`)
        #[arg(long, default_value_t = false)]
        watch: bool,
    },
    /// Print the servlets and filters of a descriptor
    Routes {
        /// Path to the YAML descriptor
        #[arg(short, long)]
        descriptor: PathBuf,

        /// Context root, when the descriptor does not declare one
        #[arg(long)]
        context_root: Option<String>,
    },
    /// Resolve a path against a descriptor
    Resolve {
        #[arg(short, long)]
        descriptor: PathBuf,

        /// Path inside the webapp, e.g. `/greet/bob`
        #[arg(short, long)]
        path: String,

        #[arg(long)]
        context_root: Option<String>,
    },
    /// List the webapps deployed in a repository
    Webapps {
        #[arg(short, long)]
        repository: Option<PathBuf>,
    },
}

/// Parse the command line and run it.
///
/// # Errors
///
/// Returns an error if the configuration, a descriptor or the repository cannot be loaded,
/// or if a resolved path matches no servlet.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_logging_with_config(&config.log)?;
    execute(cli.command, &config)
}

/// Run a parsed command line, leaving logging as it is.
pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    execute(cli.command, &config)
}

/// The configuration file at `path` (defaults without one), overridden by the environment.
pub fn load_config(path: Option<&Path>) -> Result<ServerConfig> {
    let mut config = match path {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    config.apply_env();
    Ok(config)
}

fn execute(command: Commands, config: &ServerConfig) -> Result<()> {
    match command {
        Commands::Check { repository, watch } => {
            let dir = repository_dir(repository, config)?;
            let repo = Arc::new(open_repository(&dir)?);
            for app in repo.applications() {
                println!(
                    "[ok] {:<20} {} ({} servlets, {} filters)",
                    app.context_root(),
                    app.name(),
                    app.servlets().len(),
                    app.filters().len()
                );
            }
            if watch || config.hot_reload {
                let _watcher = watch_repository(&dir, Arc::clone(&repo), |roots| {
                    println!("[reload] {}", roots.join(", "));
                })?;
                println!("Watching {} (Ctrl-C to stop)", dir.display());
                loop {
                    std::thread::park();
                }
            }
            Ok(())
        }
        Commands::Routes {
            descriptor,
            context_root,
        } => {
            let app = load(&descriptor, context_root)?;
            println!("{} ({}) at /{}", app.title(), app.name(), app.context_root());
            app.router().dump_routes();
            Ok(())
        }
        Commands::Resolve {
            descriptor,
            path,
            context_root,
        } => {
            let app = load(&descriptor, context_root)?;
            let target = app
                .router()
                .target(&path)
                .map_err(|e| anyhow!("{}", e.message()))?;
            let route = match target {
                Target::Servlet(route) => route,
                Target::Resource(resource) => {
                    println!("resource: {} ({})", resource.target(&path), resource.media_type);
                    return Ok(());
                }
            };
            println!("servlet: {}", route.servlet.name);
            for (name, value) in &route.bindings {
                println!("  {name} = {value}");
            }
            for segment in &route.segments {
                match segment {
                    PathSegment::Literal(text) => println!("  part  {text:?}"),
                    PathSegment::Match { name, value } => println!(
                        "  match {value:?}{}",
                        name.as_ref().map(|n| format!(" ({n})")).unwrap_or_default()
                    ),
                }
            }
            let filters: Vec<&str> = route.filters.iter().map(|f| f.label()).collect();
            println!("filters: {}", filters.join(", "));
            Ok(())
        }
        Commands::Webapps { repository } => {
            let repo = open_repository(&repository_dir(repository, config)?)?;
            for root in repo.context_roots() {
                println!("{root}");
            }
            Ok(())
        }
    }
}

fn repository_dir(flag: Option<PathBuf>, config: &ServerConfig) -> Result<PathBuf> {
    flag.or_else(|| config.repository.clone())
        .ok_or_else(|| anyhow!("no repository: pass --repository or set SERVLEX_REPOSITORY"))
}

fn open_repository(dir: &Path) -> Result<WebRepository> {
    let store = DirectoryStore::open(dir)
        .with_context(|| format!("Failed to open repository {}", dir.display()))?;
    let repo = WebRepository::open(Arc::new(store))
        .with_context(|| format!("Failed to load the webapps of {}", dir.display()))?;
    Ok(repo)
}

fn load(descriptor: &Path, context_root: Option<String>) -> Result<Application> {
    let base = descriptor.parent().unwrap_or_else(|| Path::new("."));
    let mut options = LoadOptions::default().with_resolver(Arc::new(FileResolver::new(base)));
    options.context_root = context_root;
    load_descriptor(descriptor, options)
}
