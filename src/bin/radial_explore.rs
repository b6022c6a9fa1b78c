//! Radial Explore
//!
//! Headless driver for an exploration session against a live backend:
//! - Picks a root (explicitly, or the top search hit for the query)
//! - Fetches it, then follows a sequence of child selections
//! - Prints one JSON frame per step on stdout
//!
//! ## Configuration
//!
//! Environment variables:
//! - `NAVIGATOR_API_URL`: Backend base URL (default: http://127.0.0.1:5000)
//! - `NAVIGATOR_TIMEOUT_SECS`: Request timeout (default: 30)
//! - `NAVIGATOR_{SUMMARY,RELATED,SEARCH,STATUS}_ROUTE`: Route overrides
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: pretty)
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin radial_explore --features client -- "bone loss" --select PMC123 --select PMC456
//! ```

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use radial_navigator::{
    parse_search_results, ExplorationSession, Frame, GraphView, HttpBackend, KnowledgeBackend,
    Resolution, RootNode, Viewport,
};

#[derive(Debug, Parser)]
#[command(name = "radial_explore", version, about = "Walk a radial document graph from the command line")]
struct Args {
    /// Query the session explores.
    query: String,

    /// Initial root id. Defaults to the top search hit for the query.
    #[arg(long)]
    root_id: Option<String>,

    /// Initial root label (used with --root-id).
    #[arg(long, default_value = "")]
    root_label: String,

    /// Child ids to select, in order.
    #[arg(long = "select")]
    steps: Vec<String>,

    /// Container width.
    #[arg(long, default_value_t = 800.0)]
    width: f64,

    /// Container height.
    #[arg(long, default_value_t = 600.0)]
    height: f64,
}

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "radial_explore=info,radial_navigator=info".into());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

async fn initial_root(backend: &HttpBackend, args: &Args) -> Result<RootNode, Box<dyn std::error::Error>> {
    if let Some(id) = &args.root_id {
        return Ok(RootNode::new(id.clone(), args.root_label.clone()));
    }

    let raw = backend.search(&args.query).await?;
    let hits = parse_search_results(&raw)?;
    info!(hits = hits.len(), query = %args.query, "search completed");

    let top = hits.into_iter().next().ok_or("search returned no documents")?;
    Ok(RootNode::new(top.id, top.title))
}

fn print_frame(frame: &Frame) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string(frame)?);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let backend = Arc::new(HttpBackend::from_env()?);
    info!(base_url = %backend.base_url(), version = env!("CARGO_PKG_VERSION"), "Starting radial explore");

    match backend.status().await {
        Ok(status) => info!(status = %status, "Backend reachable"),
        Err(e) => {
            error!(error = %e, base_url = %backend.base_url(), "Backend status check failed");
            return Err(e.into());
        }
    }

    let root = initial_root(&backend, &args).await?;
    let session = ExplorationSession::new(Arc::clone(&backend), root, args.query.clone());
    let viewport = Viewport::new();
    viewport.resize(args.width, args.height);

    let mut view = GraphView::mount(&session, &viewport, |id: Option<&str>| {
        info!(node_id = ?id, "node clicked");
    });

    let mut resolution = session.start().await;
    print_frame(&view.frame())?;

    for step in &args.steps {
        if resolution != Resolution::Ready {
            warn!(step = %step, "stopping: previous step did not reach ready");
            break;
        }
        let pending = match session.select_child(step) {
            Ok(pending) => pending,
            Err(e) => {
                error!(error = %e, step = %step, "cannot select child");
                return Err(e.into());
            }
        };
        resolution = pending.await;
        print_frame(&view.frame())?;
    }

    info!(
        path = ?session.path().ids(),
        final_state = session.state().name(),
        "Radial explore finished"
    );
    Ok(())
}
