mod rest;

use homecare_core::{
    CoreConfig, NotificationDispatcher, RecordStore, ReminderConfig, ReminderEvaluator,
    config::flag_from_env_value, constants::DEFAULT_DATA_DIR,
};
use homecare_messaging::{LogDispatcher, TwilioConfig, TwilioDispatcher};
use homecare_scheduler::ReminderScheduler;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the homecare service
///
/// Runs the minutely reminder scheduler and the ops REST server side by side until Ctrl-C.
///
/// # Environment Variables
/// - `HOMECARE_DATA_DIR`: Record store root (default: "homecare_data")
/// - `HOMECARE_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `REMINDER_TOLERANCE_MINUTES`, `REMINDER_MESSAGE_TEMPLATE`, `REMINDER_COUNTRY_CODE`,
///   `REMINDER_MIDNIGHT_POLICY`: reminder evaluator settings
/// - `REMINDER_DRY_RUN`: log reminders instead of sending them
/// - `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`, `TWILIO_FROM_NUMBER`, `TWILIO_CHANNEL`,
///   `TWILIO_API_BASE`: messaging gateway settings (credentials required unless dry run)
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("homecare_run=info".parse()?)
                .add_directive("homecare_core=info".parse()?)
                .add_directive("homecare_messaging=info".parse()?)
                .add_directive("homecare_scheduler=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("HOMECARE_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_dir = std::env::var("HOMECARE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));

    let store = RecordStore::new(Arc::new(CoreConfig::new(data_dir)?));
    let reminder_cfg = ReminderConfig::from_env_values(
        std::env::var("REMINDER_TOLERANCE_MINUTES").ok(),
        std::env::var("REMINDER_MESSAGE_TEMPLATE").ok(),
        std::env::var("REMINDER_COUNTRY_CODE").ok(),
        std::env::var("REMINDER_MIDNIGHT_POLICY").ok(),
    )?;

    let dispatcher: Arc<dyn NotificationDispatcher> =
        if flag_from_env_value(std::env::var("REMINDER_DRY_RUN").ok())? {
            tracing::warn!("REMINDER_DRY_RUN is set, reminders will be logged, not sent");
            Arc::new(LogDispatcher)
        } else {
            let twilio = TwilioConfig::from_env_values(
                std::env::var("TWILIO_ACCOUNT_SID").ok(),
                std::env::var("TWILIO_AUTH_TOKEN").ok(),
                std::env::var("TWILIO_FROM_NUMBER").ok(),
                std::env::var("TWILIO_CHANNEL").ok(),
                std::env::var("TWILIO_API_BASE").ok(),
            )?;
            tracing::info!(channel = %twilio.channel(), "sending reminders via Twilio");
            Arc::new(TwilioDispatcher::new(twilio)?)
        };

    tracing::info!(
        data_dir = %store.config().data_dir().display(),
        tolerance_seconds = reminder_cfg.tolerance().num_seconds(),
        midnight_policy = %reminder_cfg.midnight_policy(),
        "reminder evaluator configured"
    );
    let evaluator = Arc::new(ReminderEvaluator::new(
        Arc::new(store),
        dispatcher,
        reminder_cfg,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start the minutely reminder scheduler
    let scheduler = tokio::spawn(
        ReminderScheduler::new(evaluator.clone()).run(wait_for_shutdown(shutdown_rx.clone())),
    );

    // Start REST server
    tracing::info!("++ Starting homecare REST on {}", rest_addr);
    let rest_app = rest::router(rest::AppState { evaluator });
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    let rest_server = tokio::spawn(async move {
        axum::serve(listener, rest_app)
            .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
            .await
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    let _ = shutdown_tx.send(true);

    let (scheduler_result, rest_result) = tokio::join!(scheduler, rest_server);
    scheduler_result?;
    rest_result??;

    Ok(())
}

/// Resolves once the shutdown flag is set or its sender is dropped.
async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            break;
        }
    }
}
