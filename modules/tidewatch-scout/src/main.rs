use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use scrapfly_client::ScrapflyClient;
use tidewatch_common::Config;
use tidewatch_scout::flatten::PostFlattener;
use tidewatch_scout::heartbeat::HeartbeatReporter;
use tidewatch_scout::keywords::KeywordStore;
use tidewatch_scout::scheduler::Orchestrator;
use tidewatch_scout::search::SearchClient;
use tidewatch_scout::sink::HttpIndexSink;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tidewatch=info".parse()?))
        .init();

    info!("Tidewatch scout starting...");

    let config = Config::from_env();
    config.log_redacted();

    // The keyword store connection lives for the whole process. Failing
    // to reach it at startup is the one fatal error.
    let store = KeywordStore::connect(&config.database_url).await?;

    let fetcher = Arc::new(ScrapflyClient::new(&config.scrapfly_api_key));
    let searcher = Arc::new(SearchClient::new(
        fetcher,
        &config.base_url,
        config.max_results,
        config.page_size,
    ));
    let sink = Arc::new(HttpIndexSink::new(&config.index_url, &config.index_name));
    let flattener = PostFlattener::new(
        &config.base_url,
        &config.crawl_source_code,
        &config.crawl_bot,
    );

    let orchestrator = Orchestrator::new(
        searcher,
        sink,
        flattener,
        config.org_ids.clone(),
        &config.keyword_status,
        Duration::from_secs(config.pacing_seconds),
    );

    // Liveness runs on its own cadence, sharing nothing mutable with the
    // scheduler.
    let reporter = HeartbeatReporter::new(
        &config.heartbeat_url,
        &config.bot_id,
        &config.bot_type,
        &config.server_ip,
        Duration::from_secs(config.heartbeat_interval_seconds),
    );
    let heartbeat = tokio::spawn(reporter.run());

    let run_interval = Duration::from_secs(config.run_interval_minutes * 60);
    let scheduler = async {
        let mut ticker = tokio::time::interval(run_interval);
        // A pass that overruns the interval delays the next one instead
        // of firing a burst.
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately: the first pass starts at
        // boot, not after one interval.
        loop {
            ticker.tick().await;
            let stats = orchestrator.run(&store).await;
            info!(%stats, "Waiting for next scheduled pass");
        }
    };

    tokio::select! {
        _ = scheduler => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, abandoning in-flight work");
        }
    }

    heartbeat.abort();
    store.close().await;
    Ok(())
}
