//! gql-probe CLI: schema-driven GraphQL exploration.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use miette::Result;

use gql_probe::config::ProbeConfig;
use gql_probe::explore::Explorer;
use gql_probe::schema::TypeKind;
use gql_probe::sink::{DirectorySink, LogSink, OutcomeSink};
use gql_probe::transport::HttpTransport;

#[derive(Parser)]
#[command(name = "gql-probe", version, about = "Schema-driven GraphQL explorer and fuzzer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Explore the API and write one report per request.
    Run {
        #[command(flatten)]
        target: TargetArgs,

        /// Number of requests to send.
        #[arg(long)]
        count: Option<usize>,

        /// Seed for a reproducible run.
        #[arg(long)]
        seed: Option<u64>,

        /// Stop at the first failed request.
        #[arg(long)]
        exit: bool,

        /// Output directory (cleared first if it holds an earlier run).
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// JSON file with seed values for memory.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Log results only; write nothing to disk.
        #[arg(long)]
        dry: bool,
    },

    /// List root endpoints with their guessability and rank.
    Endpoints {
        #[command(flatten)]
        target: TargetArgs,

        /// JSON file with seed values for memory.
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Summarize the loaded schema.
    Schema {
        #[command(flatten)]
        target: TargetArgs,
    },
}

/// Where the API and its schema come from.
#[derive(Args)]
struct TargetArgs {
    /// TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// GraphQL endpoint URL.
    #[arg(long)]
    url: Option<String>,

    /// SDL or introspection JSON file to use instead of introspection.
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Extra request header as `Name: value`; repeatable.
    #[arg(long = "header", value_name = "K:V")]
    headers: Vec<String>,
}

impl TargetArgs {
    fn into_config(self) -> Result<ProbeConfig> {
        let mut config = match &self.config {
            Some(path) => ProbeConfig::load(path)?,
            None => ProbeConfig::default(),
        };
        if let Some(url) = self.url {
            config.url = url;
        }
        if let Some(schema) = self.schema {
            config.schema_file = Some(schema);
        }
        for header in &self.headers {
            let Some((name, value)) = header.split_once(':') else {
                miette::bail!("invalid header \"{header}\": expected `Name: value`");
            };
            config.headers.insert(name.trim().to_string(), value.trim().to_string());
        }
        Ok(config)
    }
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

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            target,
            count,
            seed,
            exit,
            out_dir,
            input,
            dry,
        } => {
            let mut config = target.into_config()?;
            if let Some(count) = count {
                config.count = count;
            }
            if seed.is_some() {
                config.seed = seed;
            }
            if exit {
                config.exit_on_failure = true;
            }
            if let Some(out_dir) = out_dir {
                config.out_dir = out_dir;
            }
            if let Some(input) = input {
                config.load_input(&input)?;
            }
            config.validate()?;
            if config.url.is_empty() {
                miette::bail!("`run` needs a URL to send requests to (--url or `url` in the config)");
            }

            let schema = config.load_schema()?;
            let transport = HttpTransport::new(&config.url, config.headers.clone(), config.timeout());
            let sink: Box<dyn OutcomeSink> = if dry {
                Box::new(LogSink)
            } else {
                Box::new(DirectorySink::create(&config.out_dir)?)
            };

            let mut explorer = Explorer::new(&config, schema, Box::new(transport), sink)?;
            let summary = explorer.run()?;

            println!(
                "{} requests, {} failed, {} endpoints, {} values remembered",
                summary.iterations, summary.failures, summary.endpoints, summary.remembered
            );
            println!(
                "coverage: {}/{} fields discovered, {} non-null ({:.1}%)",
                summary.coverage.discovered_fields,
                summary.coverage.total_fields,
                summary.coverage.non_null_fields,
                summary.coverage.ratio() * 100.0
            );
            println!("replay with --seed {}", explorer.seed());
            if !dry {
                println!("results written to {}", config.out_dir.display());
            }
        }

        Commands::Endpoints { target, input } => {
            let mut config = target.into_config()?;
            if let Some(input) = input {
                config.load_input(&input)?;
            }
            config.validate()?;

            let schema = config.load_schema()?;
            let transport = HttpTransport::new(&config.url, config.headers.clone(), config.timeout());
            let explorer = Explorer::new(&config, schema, Box::new(transport), Box::new(LogSink))?;

            println!("{:<40} {:>12} {:>8}", "endpoint", "guessability", "rank");
            for endpoint in explorer.ranked_endpoints()? {
                println!(
                    "{:<40} {:>12.3} {:>8.2}",
                    endpoint.id, endpoint.guessability, endpoint.rank
                );
            }
        }

        Commands::Schema { target } => {
            let config = target.into_config()?;
            config.validate()?;
            let schema = config.load_schema()?;

            let query = schema.query_type();
            println!("query type: {} ({} fields)", query.name, query.fields.len());
            for kind in [
                TypeKind::Object,
                TypeKind::Interface,
                TypeKind::Union,
                TypeKind::Enum,
                TypeKind::InputObject,
                TypeKind::Scalar,
            ] {
                let names: Vec<&str> = schema
                    .types()
                    .filter(|t| t.kind == kind && !t.name.starts_with("__"))
                    .map(|t| t.name.as_str())
                    .collect();
                if !names.is_empty() {
                    println!("{kind} ({}): {}", names.len(), names.join(", "));
                }
            }

            println!("root fields:");
            for field in &query.fields {
                let args: Vec<String> = field
                    .args
                    .iter()
                    .map(|a| format!("{}: {}", a.name, a.ty))
                    .collect();
                if args.is_empty() {
                    println!("  {}: {}", field.name, field.ty);
                } else {
                    println!("  {}({}): {}", field.name, args.join(", "), field.ty);
                }
            }
        }
    }

    Ok(())
}
