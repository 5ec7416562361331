// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Set up logging (tracing) on stderr
// 2. Parse command-line arguments using clap
// 3. Build the crawler and run one crawl; Ctrl+C interrupts it
// 4. Print the result and exit (0 = no errors, 1 = some URLs failed, 2 = error)
// =============================================================================

mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use level_crawler::{CancellationToken, CrawlResult, Crawler, HttpDownloader};

fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("level_crawler=info"));

    // Logs go to stderr so stdout only carries the crawl result
    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = every scheduled URL was processed
//   Ok(1) = some URLs ended up in the error map
//   Err   = the crawler could not run
async fn run() -> Result<i32> {
    let cli = Cli::parse();

    let downloader = HttpDownloader::new().context("Failed to create HTTP client")?;
    let crawler = Crawler::new(Arc::new(downloader), cli.crawler_config())
        .context("Invalid crawler configuration")?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl+C received - stopping crawl");
                cancel.cancel();
            }
        }
    });

    let result = crawler.crawl_with(cli.crawl_request(), cancel).await?;
    crawler.close();

    print_result(&result, cli.json)?;

    Ok(if result.is_clean() { 0 } else { 1 })
}

fn print_result(result: &CrawlResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print_table(result);
    }
    Ok(())
}

fn print_table(result: &CrawlResult) {
    for url in &result.downloaded {
        println!("{}", url);
    }

    if !result.errors.is_empty() {
        println!();
        println!("{:<60} {:<40}", "URL", "ERROR");
        println!("{}", "=".repeat(100));

        let mut errors: Vec<_> = result.errors.iter().collect();
        errors.sort_by(|a, b| a.0.cmp(b.0));
        for (url, error) in errors {
            // Truncate URL if too long for display
            let url_display = if url.chars().count() > 57 {
                format!("{}...", url.chars().take(57).collect::<String>())
            } else {
                url.clone()
            };
            println!("{:<60} {:<40}", url_display, error);
        }
    }

    println!();
    println!("📊 Summary:");
    println!("   ✅ Downloaded: {}", result.downloaded.len());
    println!("   ❌ Errors: {}", result.errors.len());
}
