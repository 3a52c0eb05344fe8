//! glimpse - Preview files through pluggable handlers.
//!
//! Usage:
//!   glimpse show FILE...               Render a preview
//!   glimpse handlers EXT               List handlers for an extension
//!   glimpse prefer EXT... --handler C  Store the preferred handler
//!   glimpse favorites list|add|...     Manage favorites
//!   glimpse archive FILE               List or extract archive entries
//!   glimpse ls [DIR]                   List previewable files
//!   glimpse --help                     Show help

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail, eyre};
use tracing_subscriber::EnvFilter;

use glimpse_core::{BrowserConfig, Extension, HandlerConfig, Preview, PreviewContent, TreeNode};
use glimpse_handlers::{builtin_catalog, format_size};
use glimpse_prefs::{FavoritesStore, PreferredHandlerStore};
use glimpse_preview::{ArchiveBrowser, DisplayOutcome, PreviewOrchestrator, list_directory};
use glimpse_registry::HandlerRegistry;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "GLIMPSE_LOG";

#[derive(Parser)]
#[command(
    name = "glimpse",
    version,
    about = "Preview files through pluggable handlers",
    long_about = "glimpse renders files with the handler you prefer for their extension.\n\n\
                  Preferences and favorites are stored in the configuration directory \
                  ($GLIMPSE_HOME or the platform config dir)."
)]
struct Cli {
    /// Configuration file (defaults to <config dir>/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a preview of one or more files
    Show {
        /// Files to preview; the first decides the handlers offered
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Switch to the handler at this index and remember it
        #[arg(short, long)]
        select: Option<usize>,

        /// Use the favorite with this name
        #[arg(short, long, conflicts_with = "select")]
        favorite: Option<String>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// List the handlers available for an extension
    Handlers {
        /// Extension, with or without the leading dot
        ext: String,

        /// List archive handlers instead of content handlers
        #[arg(short, long)]
        archive: bool,
    },

    /// Store the preferred handler for extensions
    Prefer {
        /// Extensions the preference applies to
        #[arg(required = true)]
        exts: Vec<String>,

        /// Handler configuration, e.g. "plain-text -tab-width 2"
        #[arg(long)]
        handler: String,

        /// Set the preferred archive handler
        #[arg(short, long)]
        archive: bool,
    },

    /// Manage named handler configurations
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },

    /// List, extract or preview the entries of an archive
    Archive {
        /// Archive file
        file: PathBuf,

        /// Entry to extract
        #[arg(short, long, requires = "to")]
        extract: Option<String>,

        /// Destination of the extracted entry
        #[arg(long)]
        to: Option<PathBuf>,

        /// Entries to preview
        #[arg(long, num_args = 1.., conflicts_with = "extract")]
        show: Vec<String>,
    },

    /// List the files of a directory
    Ls {
        /// Directory to list
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// List favorites, optionally for one extension
    List { ext: Option<String> },

    /// Add (or replace) a favorite
    Add {
        ext: String,
        name: String,
        /// Handler configuration
        config: String,
    },

    /// Remove the first favorite with this name
    Remove { name: String },

    /// Remove every favorite of an extension
    Clear { ext: String },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Everything a command needs, built from the configuration.
struct App {
    config: BrowserConfig,
    registry: Arc<HandlerRegistry>,
    preferred: Arc<PreferredHandlerStore>,
    favorites: Arc<FavoritesStore>,
}

impl App {
    fn load(path: Option<&Path>) -> Self {
        let config = match path {
            Some(path) => BrowserConfig::load_from(path),
            None => BrowserConfig::load(),
        };
        tracing::debug!(config_dir = %config.config_dir.display(), "configuration loaded");
        Self {
            registry: Arc::new(HandlerRegistry::new(builtin_catalog())),
            preferred: Arc::new(PreferredHandlerStore::new(config.preferred_handlers_path())),
            favorites: Arc::new(FavoritesStore::new(config.favorites_path(), config.autosave_favorites)),
            config,
        }
    }

    fn orchestrator(&self) -> PreviewOrchestrator {
        PreviewOrchestrator::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.preferred),
            Arc::clone(&self.favorites),
            &self.config,
        )
    }

    /// Persist favorites when they are not saved on every change.
    fn flush_favorites(&self) -> Result<()> {
        if !self.favorites.autosave() {
            self.favorites.save().context("Failed to save favorites")?;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_logging();

    let cli = Cli::parse();
    let ctx = App::load(cli.config.as_deref());

    match cli.command {
        Command::Show {
            files,
            select,
            favorite,
            format,
        } => run_show(&ctx, &files, select, favorite.as_deref(), format).await?,
        Command::Handlers { ext, archive } => run_handlers(&ctx, &ext, archive),
        Command::Prefer { exts, handler, archive } => run_prefer(&ctx, &exts, &handler, archive)?,
        Command::Favorites { action } => run_favorites(&ctx, action)?,
        Command::Archive {
            file,
            extract,
            to,
            show,
        } => run_archive(&ctx, file, extract, to, &show).await?,
        Command::Ls { dir } => run_ls(&ctx, &dir)?,
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Render a preview and print it.
async fn run_show(
    ctx: &App,
    files: &[PathBuf],
    select: Option<usize>,
    favorite: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let mut orchestrator = ctx.orchestrator();
    let outcome = orchestrator.display(files).context("Cannot preview")?;
    orchestrator.settle().await;

    if outcome != DisplayOutcome::NoHandler {
        if let Some(index) = select {
            orchestrator.select_handler(index)?;
            orchestrator.settle().await;
        } else if let Some(name) = favorite {
            let chosen = orchestrator
                .favorites()
                .into_iter()
                .find(|f| f.name() == name)
                .ok_or_else(|| eyre!("No favorite named '{name}' for this extension"))?;
            orchestrator.select_favorite(chosen)?;
            orchestrator.settle().await;
        }
    }

    for (i, candidate) in orchestrator.candidates().iter().enumerate() {
        let marker = if orchestrator.selected_index() == Some(i) { "*" } else { " " };
        eprintln!("{marker} [{i}] {candidate}");
    }
    if let Some(favorite) = orchestrator.current_favorite() {
        eprintln!("* favorite '{}': {}", favorite.name(), favorite.config());
    }
    eprintln!();

    print_preview(orchestrator.preview(), format)
}

fn print_preview(preview: &Preview, format: OutputFormat) -> Result<()> {
    if let OutputFormat::Json = format {
        let json = serde_json::to_string_pretty(preview.content()).context("Failed to serialize preview")?;
        println!("{json}");
        return Ok(());
    }

    match preview.content() {
        PreviewContent::Text { lines, total_lines } => {
            for line in lines {
                println!("{line}");
            }
            if *total_lines > lines.len() {
                println!("... ({} more lines)", total_lines - lines.len());
            }
        }
        PreviewContent::Hex { lines, total_bytes } => {
            for line in lines {
                println!("{line}");
            }
            println!("({})", format_size(*total_bytes));
        }
        PreviewContent::Tree { root } => print_tree(root, 0),
        PreviewContent::Table { columns, rows } => {
            println!("{}", columns.join("\t"));
            for row in rows {
                println!("{}", row.join("\t"));
            }
        }
        PreviewContent::Placeholder(placeholder) => eprintln!("{placeholder}"),
    }
    Ok(())
}

fn print_tree(node: &TreeNode, depth: usize) {
    println!("{}{}", "  ".repeat(depth), node.label);
    for child in &node.children {
        print_tree(child, depth + 1);
    }
}

fn run_handlers(ctx: &App, ext: &str, archive: bool) {
    let ext = Extension::new(ext);
    let (ids, preferred) = if archive {
        (ctx.registry.archives().resolve(&ext), ctx.preferred.get_archive(&ext))
    } else {
        (ctx.registry.files().resolve(&ext), ctx.preferred.get_content(&ext))
    };

    if ids.is_empty() {
        println!("No handlers for .{ext}");
        return;
    }
    for id in ids {
        match &preferred {
            Some(config) if config.id() == &id => println!("* {config}"),
            _ => println!("  {id}"),
        }
    }
}

fn run_prefer(ctx: &App, exts: &[String], handler: &str, archive: bool) -> Result<()> {
    let config = HandlerConfig::parse(handler)?;
    let exts: Vec<Extension> = exts.iter().map(Extension::new).collect();

    // Instantiating checks both the id and the options.
    if archive {
        ctx.registry.archives().instantiate(&config)?;
        ctx.preferred.set_archive(&exts, &config)?;
    } else {
        ctx.registry.files().instantiate(&config)?;
        ctx.preferred.set_content(&exts, &config)?;
    }
    println!("Preferred handler for {} extension(s): {config}", exts.len());
    Ok(())
}

fn run_favorites(ctx: &App, action: FavoritesAction) -> Result<()> {
    match action {
        FavoritesAction::List { ext } => {
            let exts = match ext {
                Some(ext) => vec![Extension::new(ext)],
                None => ctx.favorites.extensions(),
            };
            for ext in exts {
                for favorite in ctx.favorites.list(&ext) {
                    println!(".{ext}\t{}\t{}", favorite.name(), favorite.config());
                }
            }
        }
        FavoritesAction::Add { ext, name, config } => {
            let config = HandlerConfig::parse(&config)?;
            ctx.registry.files().instantiate(&config)?;
            let favorite = ctx.favorites.add(&Extension::new(ext), name, config)?;
            ctx.flush_favorites()?;
            println!("Added favorite '{}' for .{}", favorite.name(), favorite.extension());
        }
        FavoritesAction::Remove { name } => match ctx.favorites.remove(&name)? {
            Some(favorite) => {
                ctx.flush_favorites()?;
                println!("Removed favorite '{}' for .{}", favorite.name(), favorite.extension());
            }
            None => bail!("No favorite named '{name}'"),
        },
        FavoritesAction::Clear { ext } => {
            let removed = ctx.favorites.remove_all(&Extension::new(ext))?;
            ctx.flush_favorites()?;
            println!("Removed {} favorite(s)", removed.len());
        }
    }
    Ok(())
}

async fn run_archive(
    ctx: &App,
    file: PathBuf,
    extract: Option<String>,
    to: Option<PathBuf>,
    show: &[String],
) -> Result<()> {
    let browser = ArchiveBrowser::open(Arc::clone(&ctx.registry), Arc::clone(&ctx.preferred), file)
        .context("Cannot open archive")?;

    if let (Some(inner), Some(dest)) = (extract, to) {
        if !browser.extract(&inner, &dest)? {
            bail!("Extraction of '{inner}' did not complete");
        }
        println!("Extracted {inner} to {}", dest.display());
        return Ok(());
    }

    if !show.is_empty() {
        let mut orchestrator = ctx.orchestrator();
        let inners: Vec<&str> = show.iter().map(String::as_str).collect();
        browser.display_entries(&mut orchestrator, &inners)?;
        orchestrator.settle().await;
        return print_preview(orchestrator.preview(), OutputFormat::Text);
    }

    eprintln!(
        "{} ({})",
        browser.archive().display(),
        browser.candidates()[browser.selected_index()]
    );
    for entry in browser.entries() {
        println!("{entry}");
    }
    Ok(())
}

fn run_ls(ctx: &App, dir: &Path) -> Result<()> {
    for path in list_directory(dir, &ctx.config)? {
        let size = path.metadata().map(|m| format_size(m.len())).unwrap_or_default();
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        println!("{size:>12}  {name}");
    }
    Ok(())
}
