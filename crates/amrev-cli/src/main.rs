//! Command line front end: download product reviews and reviewer profile
//! information from a review listing (or a single profile page) and emit
//! one JSON document.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use amrev_scraper::{ChromeEngine, PageCapture, Scraper};

#[derive(Debug, Parser)]
#[command(name = "amrev")]
#[command(about = "Download amazon product reviews and reviewer profile information")]
struct Cli {
    /// URL of the product review listing, e.g.
    /// `https://www.amazon.com/product-reviews/B01AMT0EYU/` (must end with
    /// a `/`), or of a profile page with `--profile-link`.
    link: String,

    /// Treat LINK as a reviewer profile page instead of a product listing.
    #[arg(long)]
    profile_link: bool,

    /// Skip downloading profile information for each review.
    #[arg(long)]
    no_profiles: bool,

    /// Listing page to start from.
    #[arg(short = 's', long, default_value_t = 0)]
    start_page: u32,

    /// Last listing page to download (inclusive). Unbounded when absent.
    #[arg(long)]
    stop_page: Option<u32>,

    /// Write the JSON result here instead of stdout.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Save every accessed html page to this file (useful for debugging
    /// selector drift).
    #[arg(short = 'p', long)]
    html_page: Option<PathBuf>,

    /// Run the browser in the background. Headless sessions are more easily
    /// detected as scrapers, so this is off by default.
    #[arg(long)]
    headless: bool,

    /// Log verbosity, e.g. `warn`, `info`, `amrev_scraper=debug`.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level)
        .map_err(|e| anyhow::anyhow!("invalid --log-level \"{}\": {e}", cli.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let engine = ChromeEngine::launch(cli.headless).await?;
    let mut scraper = Scraper::new(engine)?;
    if let Some(path) = &cli.html_page {
        scraper = scraper.with_capture(PageCapture::create(path)?);
    }

    let result = if cli.profile_link {
        scraper.run_profile(&cli.link).await
    } else {
        scraper
            .run(&cli.link, !cli.no_profiles, cli.start_page, cli.stop_page)
            .await
    };

    // Release the browser session before surfacing any scrape error.
    if let Err(error) = scraper.shutdown().await {
        tracing::warn!(%error, "failed to shut down the browser session cleanly");
    }
    let data = result?;

    let json = serde_json::to_string(&data)?;
    match &cli.output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_mode_defaults() {
        let cli = Cli::try_parse_from(["amrev", "https://example.com/product-reviews/X/"])
            .expect("expected valid cli args");
        assert!(!cli.profile_link);
        assert!(!cli.no_profiles);
        assert!(!cli.headless);
        assert_eq!(cli.start_page, 0);
        assert_eq!(cli.stop_page, None);
        assert_eq!(cli.log_level, "info");
        assert!(cli.output.is_none());
        assert!(cli.html_page.is_none());
    }

    #[test]
    fn page_bounds_parse() {
        let cli = Cli::try_parse_from([
            "amrev",
            "-s",
            "2",
            "--stop-page",
            "5",
            "https://example.com/product-reviews/X/",
        ])
        .expect("expected valid cli args");
        assert_eq!(cli.start_page, 2);
        assert_eq!(cli.stop_page, Some(5));
    }

    #[test]
    fn profile_mode_and_toggles() {
        let cli = Cli::try_parse_from([
            "amrev",
            "--profile-link",
            "--no-profiles",
            "--headless",
            "-p",
            "page.html",
            "https://example.com/gp/profile/p1/",
        ])
        .expect("expected valid cli args");
        assert!(cli.profile_link);
        assert!(cli.no_profiles);
        assert!(cli.headless);
        assert_eq!(cli.html_page.as_deref(), Some(std::path::Path::new("page.html")));
    }

    #[test]
    fn link_argument_is_required() {
        assert!(Cli::try_parse_from(["amrev"]).is_err());
    }
}
