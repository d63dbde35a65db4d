//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run
//! the batch pass and then the live monitor. No business logic here.

use dotenv::dotenv;
use std::sync::Arc;
use tg_relay::adapters::persistence::SqliteHistory;
use tg_relay::adapters::telegram::{connect_client, GrammersAuthAdapter, GrammersTgGateway};
use tg_relay::domain::{event_channel, EngineEvent, EventReceiver};
use tg_relay::ports::{AuthPort, HistoryPort, TgGateway};
use tg_relay::shared::{AppConfig, RateLimiter};
use tg_relay::usecases::{
    AuthService, BatchForwarder, ChannelResolver, DirectForwarder, GroupDispatcher, LiveMonitor,
    MediaPipeline, PairController,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    if let Ok(path) = &env_loaded {
        info!(path = %path.display(), "loaded .env");
    }

    let mut cfg = AppConfig::load().map_err(|e| anyhow::anyhow!("config: {}", e))?;
    cfg.validate().map_err(|e| anyhow::anyhow!("{}", e))?;
    if cfg.forward.pairs.is_empty() && cfg.monitor.pairs.is_empty() {
        anyhow::bail!("no forward or monitor pairs configured");
    }
    if let Some(proxy) = &cfg.general.proxy {
        // TODO: pass the proxy to SenderPool once grammers exposes
        // connection parameters on the pool constructor.
        warn!(proxy = %proxy.url(), "proxy configured but not yet applied to the transport");
    }

    let api_hash = cfg
        .general
        .api_hash
        .clone()
        .or_else(|| std::env::var("TG_RELAY_API_HASH").ok())
        .unwrap_or_default();
    if api_hash.is_empty() {
        anyhow::bail!("Set TG_RELAY_API_HASH (env or config). Get it from https://my.telegram.org");
    }

    let api_id = cfg
        .general
        .api_id
        .or_else(|| {
            std::env::var("TG_RELAY_API_ID")
                .ok()
                .and_then(|s| s.parse().ok())
        })
        .unwrap_or(0);
    if api_id == 0 {
        anyhow::bail!(
            "Set TG_RELAY_API_ID (and TG_RELAY_API_HASH). Get them from https://my.telegram.org"
        );
    }

    let data_dir = cfg.data_dir();
    tokio::fs::create_dir_all(&data_dir).await?;

    // --- Telegram client (cloned for auth and gateway; same session) ---
    let tg_client = connect_client(api_id, &cfg.sessions_dir(), cfg.session_name())
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let auth_adapter: Arc<dyn AuthPort> = Arc::new(GrammersAuthAdapter::new(tg_client.clone()));
    let auth_service = AuthService::new(auth_adapter, api_hash);
    auth_service
        .run_auth_flow()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    // --- Engine plumbing: events, stop token, gateway, stores ---
    let (events, events_rx) = event_channel();
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("stop requested, finishing current group");
                cancel.cancel();
            }
        });
    }
    let logger = tokio::spawn(render_events(events_rx));

    let tg: Arc<dyn TgGateway> = Arc::new(GrammersTgGateway::new(
        tg_client,
        events.clone(),
        cancel.clone(),
    ));
    let history: Arc<dyn HistoryPort> = Arc::new(
        SqliteHistory::connect(&data_dir)
            .await
            .map_err(|e| anyhow::anyhow!("history store: {}", e))?,
    );
    let resolver = Arc::new(ChannelResolver::new(Arc::clone(&tg)));

    let tmp_path = cfg.tmp_path();
    tokio::fs::create_dir_all(&tmp_path).await?;
    MediaPipeline::sweep_scratch(&tmp_path).await;

    let pipeline = Arc::new(
        MediaPipeline::new(
            Arc::clone(&tg),
            Arc::clone(&history),
            events.clone(),
            cancel.clone(),
            tmp_path,
        )
        .with_send_delay(cfg.forward.delay()),
    );
    let make_dispatcher = || {
        GroupDispatcher::new(
            Arc::clone(&history),
            Arc::clone(&resolver),
            DirectForwarder::new(
                Arc::clone(&tg),
                RateLimiter::new(events.clone(), cancel.clone()),
            ),
            Arc::clone(&pipeline),
            events.clone(),
        )
    };

    let (controller, pairs_rx) = PairController::new(Arc::clone(&resolver), events.clone());

    // --- Batch pass ---
    if !cfg.forward.pairs.is_empty() {
        let pairs = controller.build_pairs(&cfg.forward.pairs).await;
        info!(pairs = pairs.len(), "starting batch forward");
        let batch = BatchForwarder::new(
            Arc::clone(&tg),
            Arc::clone(&history),
            Arc::clone(&resolver),
            make_dispatcher(),
            Arc::clone(&pipeline),
            events.clone(),
            cancel.clone(),
            cfg.forward.delay(),
        );
        if let Err(e) = batch.run(&pairs).await {
            error!(error = %e, "batch forward stopped");
        }
    }

    // --- Live monitor ---
    if !cfg.monitor.pairs.is_empty() && !cancel.is_cancelled() {
        let pairs = controller.build_pairs(&cfg.monitor.pairs).await;
        controller.apply(pairs).await;
        let monitor = LiveMonitor::new(
            Arc::clone(&tg),
            Arc::clone(&resolver),
            make_dispatcher(),
            events.clone(),
            cancel.clone(),
            cfg.monitor.stop_date().map_err(|e| anyhow::anyhow!("{}", e))?,
        );
        info!("starting live monitor (ctrl-c to stop)");
        if let Err(e) = monitor.run(pairs_rx).await {
            error!(error = %e, "live monitor stopped");
        }
    }

    drop(events);
    let _ = logger.await;
    info!("done");
    Ok(())
}

/// Host-side rendering of engine events: progress bars for long
/// operations, structured logs for everything else.
async fn render_events(mut rx: EventReceiver) {
    let mut bar: Option<indicatif::ProgressBar> = None;
    while let Some(event) = rx.recv().await {
        match event {
            EngineEvent::Progress {
                op,
                current,
                total,
                description,
            } => {
                let pb = bar.get_or_insert_with(|| {
                    let pb = indicatif::ProgressBar::new(total);
                    pb.set_style(
                        indicatif::ProgressStyle::with_template(
                            "{msg} [{bar:30}] {pos}/{len}",
                        )
                        .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar()),
                    );
                    pb
                });
                pb.set_length(total);
                pb.set_position(current);
                pb.set_message(format!("{}: {}", op, description));
            }
            EngineEvent::CollectionStarted { total } => {
                info!(total, "collecting messages");
            }
            EngineEvent::CollectionProgress { fetched, total } => {
                info!(fetched, total, "collection progress");
            }
            EngineEvent::CollectionCompleted { fetched } => {
                if let Some(pb) = bar.take() {
                    pb.finish_and_clear();
                }
                info!(fetched, "collection complete");
            }
            EngineEvent::MessageForwarded {
                message_id,
                target_label,
            } => info!(message_id, target = %target_label, "message forwarded"),
            EngineEvent::MediaGroupForwarded {
                message_ids,
                target_label,
                count,
                ..
            } => info!(?message_ids, count, target = %target_label, "media group forwarded"),
            EngineEvent::MessageFiltered {
                message_id,
                filter_type,
                reason,
            } => info!(message_id, filter = filter_type.as_str(), reason, "message filtered"),
            EngineEvent::TextReplacementApplied { scope, .. } => {
                info!(scope, "text replacement applied");
            }
            EngineEvent::FloodWaitDetected { seconds, operation } => {
                warn!(seconds, operation, "rate limited by Telegram");
            }
            EngineEvent::PairAdded { source } => info!(source, "pair added"),
            EngineEvent::PairRemoved { source } => info!(source, "pair removed"),
            EngineEvent::PairModified { source } => info!(source, "pair modified"),
            EngineEvent::ConnectionLost => warn!("connection lost, retrying"),
            EngineEvent::ConnectionRestored => info!("connection restored"),
            EngineEvent::TimeSyncError => {
                error!(
                    "system clock disagrees with Telegram; sync your clock and restart"
                );
            }
        }
    }
}
