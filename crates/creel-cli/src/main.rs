//! `creel` command line: run one job and write its files to disk.

mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use creel_core::AppConfig;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "creel")]
#[command(about = "Gather and summarize fly-fishing reports and shop data")]
struct Cli {
    /// Directory attached job files are written to
    #[arg(long, global = true, default_value = ".")]
    out: PathBuf,

    /// Job database (defaults to the configured path)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl report sites and summarize recent reports
    FishTales {
        /// Sites table (url, keywords, junk-words, click-phrases, selector)
        #[arg(long)]
        sites: PathBuf,
        /// Distinct pages visited per site
        #[arg(long)]
        depth: Option<usize>,
        /// Drop reports older than this many days
        #[arg(long)]
        max_age_days: Option<i64>,
        /// Only keep reports mentioning one of these rivers
        #[arg(long, value_delimiter = ',')]
        rivers: Vec<String>,
        /// Estimated tokens per summarization chunk
        #[arg(long)]
        token_limit: Option<usize>,
        /// Completion model
        #[arg(long)]
        model: Option<String>,
        /// Also write the visited/to-visit listing
        #[arg(long)]
        site_list: bool,
        /// Completion provider API key
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Find shops near a location and enrich them from their websites
    ShopReel {
        /// Search query
        #[arg(long, default_value = "fly fishing shop")]
        query: String,
        #[arg(long, allow_hyphen_values = true, default_value_t = 0.0)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true, default_value_t = 0.0)]
        lng: f64,
        /// Cap on listings fetched
        #[arg(long)]
        max_results: Option<usize>,
        /// Previously exported shop cache; skips the search API
        #[arg(long)]
        cached: Option<PathBuf>,
        /// Listing search API key
        #[arg(long)]
        serp_api_key: Option<String>,
    },

    /// Add shops with report pages to a FishTales sites table
    SiteScout {
        /// ShopReel export
        #[arg(long)]
        shops: PathBuf,
        /// FishTales sites table
        #[arg(long)]
        sites: PathBuf,
    },

    /// Delete failed, canceled and old completed jobs
    Cleanup {
        /// Completed jobs kept per kind
        #[arg(long)]
        keep: Option<usize>,
    },
}

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,creel=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    info!("Starting Creel v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load_with_env().context("failed to load configuration")?;
    let database = match cli.database {
        Some(path) => path,
        None => config.database_path()?,
    };
    let runner = run::Runner::open(config, &database, cli.out).await?;

    match cli.command {
        Commands::FishTales {
            sites,
            depth,
            max_age_days,
            rivers,
            token_limit,
            model,
            site_list,
            api_key,
        } => {
            let options = run::FishTalesOptions {
                sites,
                depth,
                max_age_days,
                rivers,
                token_limit,
                model,
                site_list,
                api_key,
            };
            runner.fish_tales(options).await
        }
        Commands::ShopReel {
            query,
            lat,
            lng,
            max_results,
            cached,
            serp_api_key,
        } => {
            let options = run::ShopReelOptions {
                query,
                lat,
                lng,
                max_results,
                cached,
                serp_api_key,
            };
            runner.shop_reel(options).await
        }
        Commands::SiteScout { shops, sites } => runner.site_scout(&shops, &sites).await,
        Commands::Cleanup { keep } => runner.cleanup(keep).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fish_tales() {
        let cli = Cli::try_parse_from([
            "creel",
            "--out",
            "reports",
            "fish-tales",
            "--sites",
            "sites.csv",
            "--rivers",
            "Madison,Gallatin",
            "--site-list",
        ])
        .expect("parse");

        assert_eq!(cli.out, PathBuf::from("reports"));
        let Commands::FishTales {
            rivers, site_list, depth, ..
        } = cli.command
        else {
            panic!("expected fish-tales");
        };
        assert_eq!(rivers, vec!["Madison", "Gallatin"]);
        assert!(site_list);
        assert_eq!(depth, None);
    }

    #[test]
    fn test_parse_shop_reel_negative_longitude() {
        let cli = Cli::try_parse_from([
            "creel", "shop-reel", "--lat", "45.68", "--lng", "-111.04", "--max-results", "40",
        ])
        .expect("parse");

        let Commands::ShopReel {
            lat,
            lng,
            max_results,
            ..
        } = cli.command
        else {
            panic!("expected shop-reel");
        };
        assert!((lat - 45.68).abs() < f64::EPSILON);
        assert!((lng + 111.04).abs() < f64::EPSILON);
        assert_eq!(max_results, Some(40));
    }

    #[test]
    fn test_site_scout_requires_both_tables() {
        assert!(Cli::try_parse_from(["creel", "site-scout", "--shops", "shops.csv"]).is_err());
    }
}
