use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use fedimark_common::telemetry::{self, TelemetryConfig};
use fedimark_common::{Config, FedimarkError};
use fedimark_renderer::element::to_html;
use fedimark_renderer::{Node, ParseOptions, TreeRenderer, UiTreeBuilder, parse_markdown, segment};
use miette::{IntoDiagnostic, Result};

#[derive(Parser)]
#[command(version, about = "Fedimark - markdown with @mentions to UI elements", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a KDL config file
    #[arg(long, global = true, env = "FEDIMARK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse, segment and render a markdown document
    Render {
        /// Markdown file, or `-` for stdin
        input: PathBuf,

        #[arg(long, value_enum, default_value_t = Format::Html)]
        format: Format,

        /// Origin whose links render as in-app navigation
        #[arg(long)]
        origin: Option<String>,

        /// Leave `@name` text alone
        #[arg(long)]
        no_mentions: bool,

        /// Do not look for mentions inside link labels
        #[arg(long)]
        opaque_links: bool,
    },
    /// Print the segmented node tree of a markdown document as mdast JSON
    Ast {
        /// Markdown file, or `-` for stdin
        input: PathBuf,

        /// Leave `@name` text alone
        #[arg(long)]
        no_mentions: bool,

        #[arg(long)]
        pretty: bool,
    },
    /// Segment an mdast JSON tree produced by another parser
    Segment {
        /// JSON file, or `-` for stdin
        input: PathBuf,

        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Html,
    Json,
}

fn main() -> Result<()> {
    init_miette();
    telemetry::init(TelemetryConfig::from_env("fedimark"));

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Render {
            input,
            format,
            origin,
            no_mentions,
            opaque_links,
        } => {
            if origin.is_some() {
                config.origin = origin;
            }
            config.skip_mention_parsing |= no_mentions;
            config.link_children_opaque |= opaque_links;
            render_document(&input, format, &config)?;
        }
        Commands::Ast {
            input,
            no_mentions,
            pretty,
        } => {
            config.skip_mention_parsing |= no_mentions;
            let tree = parse_markdown(&read_input(&input)?, &parse_options(&config))
                .map_err(FedimarkError::from)?;
            print_json(&tree, pretty)?;
        }
        Commands::Segment { input, pretty } => {
            let mut tree: Node =
                serde_json::from_str(&read_input(&input)?).map_err(FedimarkError::from)?;
            segment(&mut tree, &config.mention_options()).map_err(FedimarkError::from)?;
            print_json(&tree, pretty)?;
        }
    }

    Ok(())
}

fn render_document(input: &Path, format: Format, config: &Config) -> Result<()> {
    let source = read_input(input)?;
    let tree = parse_markdown(&source, &parse_options(config)).map_err(FedimarkError::from)?;

    let renderer = TreeRenderer::new(UiTreeBuilder).with_options(config.render_options());
    let elements = renderer.render(&tree).map_err(FedimarkError::from)?;
    tracing::debug!(input = %input.display(), "rendered document");

    match format {
        Format::Html => println!("{}", to_html(&elements)),
        Format::Json => print_json(&elements, true)?,
    }
    Ok(())
}

fn parse_options(config: &Config) -> ParseOptions {
    ParseOptions::with_mentions(config.mention_options())
}

fn read_input(path: &Path) -> Result<String> {
    let mut content = String::new();
    if path == Path::new("-") {
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| FedimarkError::io("<stdin>", e))?;
    } else {
        content = std::fs::read_to_string(path)
            .map_err(|e| FedimarkError::io(path.display().to_string(), e))?;
    }
    Ok(content)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    println!("{}", json.into_diagnostic()?);
    Ok(())
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
