use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};

use dbclassgen::catalog;
use dbclassgen::config::GeneratorConfig;
use dbclassgen::logging::{Verbosity, init_tracing};
use dbclassgen::pipeline;
use dbclassgen::writer::Writer;

#[derive(Parser)]
#[command(author, version, about = "Generate entity classes from a database catalog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the catalog and write generated and starter classes
    Generate {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output root, overrides `output.root`
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the inferred relationship graph
    Inspect {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            config,
            out,
            dry_run,
        } => {
            let cfg = load_config(config)?;
            init_tracing(&cfg.logging.rust_log, Verbosity::Normal);

            let root = out.unwrap_or_else(|| cfg.output.root.clone());
            let writer = Writer::new(root).dry_run(dry_run);
            let report = pipeline::run(&cfg, &writer).context("generation failed")?;

            print!("{}", report.render());
            for module in &report.unregistered {
                println!("not in starter index: {module}");
            }
            if !report.success {
                for failed in report.failed() {
                    tracing::error!(table = %failed.table, "{}", failed.status.label());
                }
                process::exit(1);
            }
        }
        Commands::Inspect { config } => {
            let cfg = load_config(config)?;
            // the listing is the output; keep progress logs off the terminal
            init_tracing(&cfg.logging.rust_log, Verbosity::Quiet);

            let mut catalog = catalog::connect_all(&cfg)?;
            let databases = catalog.database_names();
            let (schema, report) = pipeline::extract_schema(&mut catalog, &databases, &cfg)?;

            print!("{}", pipeline::describe_relationships(&schema));
            for table in &schema.join_tables {
                println!("join table: {table}");
            }
            for fk in &report.unresolved {
                println!(
                    "unresolved: {} ({}) -> {}",
                    fk.local,
                    fk.local_columns.join(", "),
                    fk.referenced
                );
            }
            for ambiguous in &report.ambiguous {
                let candidates: Vec<String> =
                    ambiguous.candidates.iter().map(|t| t.to_string()).collect();
                println!(
                    "ambiguous: {}.{} matches {}",
                    ambiguous.table,
                    ambiguous.column,
                    candidates.join(", ")
                );
            }
        }
    }
    Ok(())
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<GeneratorConfig> {
    let cfg = GeneratorConfig::load(path.as_deref())
        .with_context(|| match &path {
            Some(p) => format!("failed to load config from {}", p.display()),
            None => "failed to load config".to_string(),
        })?;
    if cfg.databases.is_empty() {
        anyhow::bail!("no databases configured; add a [databases.<name>] section with a dsn");
    }
    Ok(cfg)
}
