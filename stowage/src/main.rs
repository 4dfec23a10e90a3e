use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stowage::app::{self, AppConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "stowage", version, about = "Redis page cache and MongoDB helpers")]
struct Cli {
    /// YAML config file; defaults apply when omitted
    #[arg(short, long, global = true, env = "STOWAGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch a page through the counting, caching pipeline
    GetPage {
        url: String,
        /// Request the page this many times
        #[arg(short, long, default_value_t = 1)]
        repeat: u32,
    },
    /// Print Nginx log statistics
    LogStats {
        /// How many of the busiest IPs to list
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
        top: u32,
    },
    /// Print students ranked by average score
    TopStudents,
    /// Store values through the call recorder and replay its history.
    /// Flushes the configured redis database first.
    Record {
        #[arg(required = true)]
        values: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::GetPage { url, repeat } => {
            let page = app::get_page(&config, &url, repeat).await?;
            println!("{}", page);
        }
        Command::LogStats { top } => {
            let stats = app::log_stats(&config, i64::from(top)).await?;
            println!("{}", stats);
        }
        Command::TopStudents => {
            for student in app::top_students(&config).await? {
                println!("{}", student);
            }
        }
        Command::Record { values } => {
            let replay = app::record(&config, &values).await?;
            println!("{}", replay);
        }
    }

    Ok(())
}
