//! CLI entry point.
//!
//! Usage:
//!   clearance-scraper [URL] [--max-pages N] [--headful]
//!                     [--output-dir DIR] [--images-dir DIR] [--store ID]
//!
//! Progress goes to stderr via tracing; the process exits non-zero on any
//! session failure so upstream trigger scripts can detect it.

use clearance_scraper::{ScrapeConfig, scrape};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_START_URL: &str = "https://www.canadiantire.ca/en/promotions/clearance.html";

struct CliArgs {
    start_url: String,
    max_pages: usize,
    headful: bool,
    output_dir: String,
    images_dir: Option<String>,
    store: Option<String>,
}

fn print_usage() {
    eprintln!(
        "usage: clearance-scraper [URL] [--max-pages N] [--headful] \
         [--output-dir DIR] [--images-dir DIR] [--store ID]"
    );
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut parsed = CliArgs {
        start_url: DEFAULT_START_URL.to_string(),
        max_pages: 20,
        headful: false,
        output_dir: "./output".to_string(),
        images_dir: None,
        store: None,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--max-pages" => {
                let value = iter.next().ok_or("--max-pages requires a value")?;
                parsed.max_pages = value
                    .parse()
                    .map_err(|_| format!("invalid --max-pages value '{value}'"))?;
            }
            "--headful" => parsed.headful = true,
            "--output-dir" => {
                parsed.output_dir = iter
                    .next()
                    .ok_or("--output-dir requires a value")?
                    .clone();
            }
            "--images-dir" => {
                parsed.images_dir = Some(
                    iter.next()
                        .ok_or("--images-dir requires a value")?
                        .clone(),
                );
            }
            "--store" => {
                parsed.store = Some(iter.next().ok_or("--store requires a value")?.clone());
            }
            "--help" | "-h" => return Err(String::new()),
            other if other.starts_with("--") => {
                return Err(format!("unknown flag '{other}'"));
            }
            url => parsed.start_url = url.to_string(),
        }
    }

    // Store-specific listings are the same URL parameterized by store id
    if let Some(store) = &parsed.store {
        let mut url = url::Url::parse(&parsed.start_url)
            .map_err(|e| format!("invalid start URL '{}': {e}", parsed.start_url))?;
        url.query_pairs_mut().append_pair("store", store);
        parsed.start_url = url.into();
    }

    Ok(parsed)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("clearance_scraper=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(msg) => {
            if !msg.is_empty() {
                eprintln!("error: {msg}");
            }
            print_usage();
            std::process::exit(if msg.is_empty() { 0 } else { 2 });
        }
    };

    let mut builder = ScrapeConfig::builder()
        .start_url(&cli.start_url)
        .page_budget(cli.max_pages)
        .headless(!cli.headful)
        .output_dir(&cli.output_dir);
    if let Some(images_dir) = &cli.images_dir {
        builder = builder.image_dir(images_dir);
    }

    let config = match builder.build() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(2);
        }
    };

    info!(url = %cli.start_url, max_pages = cli.max_pages, "starting scrape");
    match scrape(config).await {
        Ok(records) => {
            info!(products = records.len(), "scrape finished");
        }
        Err(e) => {
            error!("scrape failed: {e:#}");
            std::process::exit(1);
        }
    }
}
