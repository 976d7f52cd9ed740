//! hn-tabular CLI: Hacker News search results as JSON tables.

use std::io::{Read, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use hn_tabular::config::FetcherConfig;
use hn_tabular::handler::{HandlerContext, HandlerDefinition, HandlerRegistry};
use hn_tabular::http::HttpClient;
use hn_tabular::params::ParamKind;

#[derive(Parser)]
#[command(
    name = "hn-tabular",
    version,
    about = "Hacker News search results as JSON tables"
)]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/hn-tabular/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Search API root, overriding the config file.
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a handler; its JSON argument array is read from stdin by default.
    Run {
        /// Handler name, e.g. hackernews-search-stories.
        handler: String,

        /// Read the argument array from a file.
        #[arg(long, conflicts_with = "args")]
        input: Option<PathBuf>,

        /// Argument array given inline, e.g. '["title,url", "rust"]'.
        #[arg(long)]
        args: Option<String>,
    },

    /// List the available handlers.
    List,

    /// Show a handler's parameters, properties and examples.
    Describe {
        /// Handler name.
        handler: String,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    // stdout carries the JSON table, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let registry = HandlerRegistry::with_defaults();

    match cli.command {
        Commands::Run {
            handler,
            input,
            args,
        } => {
            let mut config = FetcherConfig::resolve(cli.config.as_deref())?;
            if let Some(base_url) = cli.base_url {
                config.base_url = base_url;
            }
            let api_root = config.api_root()?;
            let client = HttpClient::new(&config);

            let input = match (input, args) {
                (_, Some(args)) => args,
                (Some(path), None) => std::fs::read_to_string(&path).into_diagnostic()?,
                (None, None) => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf).into_diagnostic()?;
                    buf
                }
            };

            let ctx = HandlerContext {
                transport: &client,
                api_root: &api_root,
            };
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            registry.run(&handler, &ctx, &input, &mut out)?;
            writeln!(out).into_diagnostic()?;
        }

        Commands::List => {
            for def in registry.definitions() {
                println!("{:<28} {}", def.name, def.title);
            }
        }

        Commands::Describe { handler } => {
            let def = registry.get(&handler)?.definition();
            print_definition(def);
        }
    }

    Ok(())
}

fn print_definition(def: &HandlerDefinition) {
    println!("{} ({})", def.title, def.name);
    println!("  {}", def.description);
    println!(
        "  endpoint: /{}  tags: {}",
        def.endpoint.path(),
        def.tag.as_str()
    );

    println!("\nParameters (positional):");
    for (i, param) in def.params().iter().enumerate() {
        let kind = match param.kind {
            ParamKind::Text => "string",
            ParamKind::Properties => "string|array",
        };
        let status = if param.required { "required" } else { "optional" };
        println!(
            "  {}. {} ({kind}, {status}): {}",
            i + 1,
            param.name,
            param.description
        );
    }

    println!("\nProperties:");
    for property in def.properties.properties() {
        println!("  {:<14} {}", property.name, property.description);
    }

    if !def.examples.is_empty() {
        println!("\nExamples:");
        for example in def.examples {
            println!("  hn-tabular run {} --args '{example}'", def.name);
        }
    }
}
