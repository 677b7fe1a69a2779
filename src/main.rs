//! Briefing CLI - compliance news briefing viewer
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments, printing views and handling top-level errors.

use briefing::config::LoggingConfig;
use briefing::filter::{self, FilterOption};
use briefing::render::{ArticleView, BodyView, Screen};
use briefing::{
    normalize, ui, Config, FeedLoader, Filters, RefreshController, Selection, View,
};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "briefing")]
#[command(author, version, about = "Terminal client for the compliance news briefing", long_about = None)]
struct Cli {
    /// Path to briefing.toml (defaults to ./briefing.toml or ~/.config/briefing/)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL the data locations are resolved against
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the briefing once and print it
    Show {
        /// Only show items for this vertical key
        #[arg(long)]
        vertical: Option<String>,
        /// Only show items for this compliance key
        #[arg(long)]
        compliance: Option<String>,
        /// Group items by vertical and compliance focus
        #[arg(long)]
        grouped: bool,
        /// Print the normalized items as JSON
        #[arg(long, conflicts_with = "grouped")]
        json: bool,
    },
    /// List the vertical and compliance filter values
    Filters,
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Show {
            vertical,
            compliance,
            grouped,
            json,
        }) => {
            let (config, loader) = setup(cli.config.as_deref(), cli.base_url)?;
            init_logging(&config.logging, false)?;

            let filters = Filters::new(
                Selection::from_arg(vertical.as_deref()),
                Selection::from_arg(compliance.as_deref()),
            );
            let view = if grouped { View::Grouped } else { config.display.view };

            let mut controller = RefreshController::new();
            controller.refresh(&loader).await;

            if json {
                if let Some(loaded) = controller.briefing() {
                    let items = filter::apply(normalize::normalize(&loaded.payload), &filters);
                    println!("{}", serde_json::to_string_pretty(&items)?);
                }
            } else {
                print_screen(&controller.screen(&filters, view));
            }

            if let Some(err) = controller.failure() {
                anyhow::bail!("unable to load the briefing: {}", err);
            }
        }
        Some(Commands::Filters) => {
            let (config, loader) = setup(cli.config.as_deref(), cli.base_url)?;
            init_logging(&config.logging, false)?;

            let mut controller = RefreshController::new();
            controller.refresh(&loader).await;
            if let Some(err) = controller.failure() {
                anyhow::bail!("unable to load the briefing: {}", err);
            }

            let options = controller.filter_options();
            print_options("Verticals", &options.verticals);
            print_options("Compliance", &options.compliance);
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "briefing", &mut std::io::stdout());
        }
        None => {
            // Default: Launch the TUI
            let (config, loader) = setup(cli.config.as_deref(), cli.base_url)?;
            init_logging(&config.logging, true)?;
            ui::run(Arc::new(loader), Filters::default(), config.display.view).await?;
        }
    }

    Ok(())
}

/// Load the configuration and build the feed loader from it
fn setup(path: Option<&Path>, base_url: Option<String>) -> anyhow::Result<(Config, FeedLoader)> {
    let mut config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(base_url) = base_url {
        config.source.base_url = Some(base_url);
    }

    let loader = FeedLoader::from_config(&config.source)?;
    Ok((config, loader))
}

/// Install the tracing subscriber; the TUI logs to a file to keep the screen clean
fn init_logging(logging: &LoggingConfig, to_file: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if to_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(logging.ui_log_file())?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
    } else {
        builder.with_writer(std::io::stderr).try_init()
    };

    if let Err(e) = installed {
        eprintln!("Warning: Failed to initialise logging: {}", e);
    }
    Ok(())
}

fn print_screen(screen: &Screen) {
    let header = &screen.header;

    if let Some(notice) = &header.notice {
        println!("{}\n", notice.yellow().bold());
    }
    println!("{}", header.generated_at.bold());
    println!(
        "{}: {}   {}: {}",
        header.total_label.dimmed(),
        header.total_items.bold(),
        header.source_count_label.dimmed(),
        header.source_count.bold()
    );
    println!("{}\n", header.sources);

    match &screen.body {
        BodyView::Loading(message) => println!("{}", message.italic()),
        BodyView::Failed(message) => println!("{}", message.red()),
        BodyView::Empty(message) => println!("{}", message),
        BodyView::Articles(articles) => {
            for article in articles {
                print_article(article);
            }
        }
        BodyView::Grouped(sections) => {
            for section in sections {
                println!("{}", format!("## {}", section.heading).magenta().bold());
                for segment in &section.segments {
                    println!("{}\n", format!("### {}", segment.heading).blue());
                    for article in &segment.articles {
                        print_article(article);
                    }
                }
            }
        }
    }
}

fn print_article(article: &ArticleView) {
    println!("📄 {}", article.title.cyan().bold());
    if !article.verticals.is_empty() {
        println!("   {}", article.verticals.join(" · ").magenta());
    }
    println!("   {}", article.meta.dimmed());
    if let Some(summary) = &article.summary {
        println!("   {}", summary);
    }
    if let Some(focus) = &article.compliance_focus {
        println!("   {}", focus.yellow());
    }
    if let Some(keywords) = &article.keywords {
        println!("   {}", keywords.dimmed());
    }
    println!("   {}\n", article.href.underline());
}

fn print_options(title: &str, options: &[FilterOption]) {
    println!("{}:", title.bold());
    if options.is_empty() {
        println!("  (none)\n");
        return;
    }
    for option in options {
        match option.count {
            Some(count) => println!("  {:<24} {} ({})", option.key, option.label, count),
            None => println!("  {:<24} {}", option.key, option.label),
        }
    }
    println!();
}
