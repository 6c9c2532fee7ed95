//! Canvas → Discord announcement relay.
//! Loads configuration, connects to Discord, then polls Canvas once a minute
//! until Ctrl-C.

use anyhow::{anyhow, Context};
use canvas_relay::metrics::{self as relay_metrics, Metrics};
use canvas_relay::{
    logging, CanvasClient, DiscordTransport, Formatter, PollScheduler, RelayConfig, RelayEngine,
};
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let cfg = RelayConfig::load_default().context("loading configuration")?;
    let _log_guard = logging::init(cfg.log_file.as_deref())?;
    info!(?cfg, "initializing relay");

    if let Some(addr) = cfg.metrics_addr {
        let metrics = Metrics::install()?;
        let router = metrics.router();
        tokio::spawn(async move {
            if let Err(e) = relay_metrics::serve(router, addr).await {
                error!(error = ?e, "metrics endpoint stopped");
            }
        });
    }

    let canvas = CanvasClient::new(&cfg.canvas_url, &cfg.canvas_token);
    let discord = DiscordTransport::new(&cfg.discord_token);

    let me = discord.connect().await.context("connecting to Discord")?;
    info!(bot = %me.username, id = %me.id, "bot connected");

    let engine = RelayEngine::new(
        canvas,
        discord,
        cfg.registry(),
        Formatter::new(&cfg.mention, cfg.max_message_length),
    )
    .with_course_names(cfg.course_names());

    let (closed_tx, closed_rx) = watch::channel(false);
    let mut scheduler = PollScheduler::new(engine, closed_rx);
    let poll_loop = scheduler
        .on_ready()
        .ok_or_else(|| anyhow!("poll loop did not start"))?;

    tokio::signal::ctrl_c()
        .await
        .context("listening for shutdown signal")?;
    info!("shutdown requested");
    let _ = closed_tx.send(true);

    poll_loop.await.context("poll loop task failed")?;
    info!("bye");
    Ok(())
}
