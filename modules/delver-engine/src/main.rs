use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use delver_common::{CancelToken, Config, RateGate};
use delver_engine::{run_research, Retriever};
use insight_client::{fallback, ClaudeInsight, InsightModel, UnavailableInsight};
use webscout_client::{EndpointPool, WebScoutClient};

#[derive(Parser, Debug)]
#[command(name = "delver", about = "Iterative, tree-structured web research")]
struct Args {
    /// Research query
    query: String,

    /// Sub-queries expanded at the top level
    #[arg(long, default_value_t = 4)]
    breadth: usize,

    /// Recursion levels
    #[arg(long, default_value_t = 2)]
    depth: usize,

    /// Requested parallel sub-queries per level (capped by the model policy)
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Restrict searches to these sites
    #[arg(long)]
    sites: Vec<String>,

    /// Report language
    #[arg(long, default_value = "English")]
    language: String,

    /// Print clarifying questions before researching
    #[arg(long)]
    clarify: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("delver_engine=info".parse()?))
        .init();

    info!("Delver starting...");

    let args = Args::parse();
    let config = Config::from_env();
    config.log_redacted();

    let pool = Arc::new(EndpointPool::new(config.webscout_endpoints.clone()));
    let gate = Arc::new(RateGate::new(
        config.rate_limit,
        Duration::from_secs(config.rate_window_secs),
    ));
    let retriever: Arc<dyn Retriever> =
        Arc::new(WebScoutClient::new(pool, gate, config.webscout_api_key.clone()));

    let insight: Arc<dyn InsightModel> = match config.anthropic_api_key.as_deref() {
        Some(key) => Arc::new(ClaudeInsight::new(key, &config.model)),
        None => {
            warn!("ANTHROPIC_API_KEY not set, insight extraction degraded to deterministic fallbacks");
            Arc::new(UnavailableInsight)
        }
    };

    if args.clarify {
        let feedback = match insight.generate_feedback_questions(&args.query, 3).await {
            Ok(feedback) => feedback,
            Err(e) => {
                warn!(error = %e, "Question generation failed, using generic questions");
                fallback::feedback_questions(&args.query, 3)
            }
        };
        println!("Consider clarifying ({}):", feedback.detected_language);
        for question in &feedback.questions {
            println!("  - {question}");
        }
        println!();
    }

    // Ctrl-C signals the shared token; the whole tree unwinds at its next
    // cancellation checkpoint.
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling research run");
                cancel.cancel();
            }
        });
    }

    let output = run_research(
        retriever,
        insight.clone(),
        &config.model,
        &args.query,
        args.breadth,
        args.depth,
        Vec::new(),
        args.concurrency,
        args.sites.clone(),
        cancel,
    )
    .await?;

    info!(
        learnings = output.learnings.len(),
        visited_urls = output.visited_urls.len(),
        top_urls = output.top_url_candidates.len(),
        "Research complete, writing report"
    );

    let digest = output
        .learnings
        .iter()
        .map(|l| l.insight.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let executive_summary = match insight.summarize(&digest).await {
        Ok(summary) => summary,
        Err(e) => {
            warn!(error = %e, "Summary failed, using extractive fallback");
            fallback::summary(&digest)
        }
    };

    let report = match insight
        .write_final_report(&args.query, &executive_summary, &output.learnings, &args.language)
        .await
    {
        Ok(report) => report,
        Err(e) => {
            warn!(error = %e, "Report writing failed, using bullet-list fallback");
            fallback::report(&args.query, &executive_summary, &output.learnings)
        }
    };

    println!("{report}");

    if !output.top_url_candidates.is_empty() {
        println!("\n## Recommended sources\n");
        for candidate in &output.top_url_candidates {
            println!("- {}: {}", candidate.url, candidate.description);
        }
    }

    Ok(())
}
