//! Browse and stream an artist's releases.
//!
//! Demonstrates one browse page with metadata, then a full stream over every page.
//!
//! Run with: cargo run --example browse_stream -- <artist-mbid>

use entity_graph_client::paging::{browse_decoder, PageFetcher};
use entity_graph_client::protocol::QueryParams;
use entity_graph_client::{ClientConfig, QueryError, RequestDispatcher};
use futures::StreamExt;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct Release {
    id: String,
    title: String,
    date: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let artist = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "5b11f4ce-a62d-471e-81fc-a69a8278c7da".to_string());

    let mut config = ClientConfig::from_env()?;
    if config.application_name.is_none() {
        config.application_name = Some("browse-stream-demo".into());
        config.application_version = Some(env!("CARGO_PKG_VERSION").into());
    }
    let dispatcher = RequestDispatcher::new(config)?;

    let releases = PageFetcher::new(
        dispatcher.clone(),
        "release",
        QueryParams::new().with("artist", artist.as_str()),
        browse_decoder::<Release>("release"),
    );

    let first = match releases.browse(Some(5), None).await {
        Ok(page) => page,
        Err(QueryError::Structured(err)) => {
            eprintln!("service said: {}", err.message);
            if let Some(help) = &err.help {
                eprintln!("help: {}", help);
            }
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    println!("{} releases in total; first {}:", first.total(), first.count());
    for release in first.items() {
        println!("  {}  {}", release.id, release.title);
    }

    println!("\nAll releases:");
    let mut all = releases.stream(0, Some(100))?.into_stream();
    let mut seen = 0;
    while let Some(release) = all.next().await {
        let release = release?;
        seen += 1;
        println!("  {:>4}  {}  {}", seen, release.date.as_deref().unwrap_or("----"), release.title);
    }

    dispatcher.dispose();
    Ok(())
}
