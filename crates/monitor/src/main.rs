use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use volguard_core::ingest::client::{DashboardSource, VolGuardClient};
use volguard_core::poll::{DashboardState, Poller};

mod render;

#[derive(Debug, Parser)]
#[command(name = "volguard_monitor")]
struct Args {
    /// Analytics backend base URL. Overrides VOLGUARD_BASE_URL.
    #[arg(long)]
    base_url: Option<String>,

    /// Seconds between dashboard refreshes.
    #[arg(long, default_value_t = 30)]
    interval_secs: u64,

    /// Seconds between veto-countdown re-renders.
    #[arg(long, default_value_t = 60)]
    countdown_secs: u64,

    /// Broker session token to arm the backend with. Overrides VOLGUARD_API_TOKEN.
    #[arg(long)]
    token: Option<String>,

    /// Fetch and render a single snapshot, then exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut settings = volguard_core::config::Settings::from_env()?;
    if let Some(url) = args.base_url.clone() {
        settings.base_url = Some(url);
    }
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let client = VolGuardClient::from_settings(&settings)?;

    if let Some(token) = args.token.clone().or_else(|| settings.api_token.clone()) {
        // Arming the session is best-effort at startup; the client re-sends
        // the token transparently if the backend rejects a later fetch.
        if let Err(err) = client
            .set_token(&token)
            .await
            .context("failed to arm backend session")
        {
            sentry_anyhow::capture_anyhow(&err);
            tracing::warn!(error = %err, "continuing without an armed session");
        }
    }

    let source: Arc<dyn DashboardSource> = Arc::new(client);

    if args.once {
        return run_once(source).await;
    }

    run_loop(
        source,
        Duration::from_secs(args.interval_secs.max(1)),
        Duration::from_secs(args.countdown_secs.max(1)),
    )
    .await
}

async fn run_once(source: Arc<dyn DashboardSource>) -> anyhow::Result<()> {
    let result = source.fetch_dashboard().await;
    let state =
        volguard_core::poll::apply_fetch_result(&DashboardState::default(), result, chrono::Utc::now());

    print!("{}", render::render_state(&state));
    if let Some(snapshot) = &state.snapshot {
        if let Some(line) =
            render::render_countdown(&snapshot.external_metrics.veto_events, chrono::Utc::now())
        {
            println!("{line}");
        }
    }

    if let Some(err) = &state.error {
        anyhow::bail!("dashboard fetch failed: {err}");
    }
    Ok(())
}

async fn run_loop(
    source: Arc<dyn DashboardSource>,
    poll_interval: Duration,
    countdown_interval: Duration,
) -> anyhow::Result<()> {
    let handle = Poller::spawn(source, poll_interval);
    let mut rx = handle.subscribe();

    // The countdown re-renders on its own cadence so the remaining time
    // stays fresh between polls.
    let mut countdown_tick = tokio::time::interval(countdown_interval);
    countdown_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    countdown_tick.tick().await;

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow().clone();
                print!("{}", render::render_state(&state));
                render_countdown_line(&state);
            }
            _ = countdown_tick.tick() => {
                render_countdown_line(&handle.current());
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                handle.stop();
                break;
            }
        }
    }

    Ok(())
}

fn render_countdown_line(state: &DashboardState) {
    let Some(snapshot) = &state.snapshot else {
        return;
    };
    if let Some(line) =
        render::render_countdown(&snapshot.external_metrics.veto_events, chrono::Utc::now())
    {
        println!("{line}");
    }
}

fn init_sentry(settings: &volguard_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
