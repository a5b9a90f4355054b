use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::info;

use trailboard::clock::{Clock, SystemClock};
use trailboard::config::{ConfigError, EngineConfig};
use trailboard::engine::{PointerKind, PointerSample, RenderSnapshot};
use trailboard::participant::{CursorState, ParticipantId, Point};
use trailboard::relay;
use trailboard::session::{Session, SessionError, SessionHandle};
use trailboard::transport::{MemoryHub, Transport, TransportError, WsTransport};

/// Pointer sampling cadence of a scripted participant.
const WALK_TICK: Duration = Duration::from_millis(16);
/// Interval between logged snapshot summaries.
const REPORT_EVERY: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    #[error("session: {0}")]
    Session(#[from] SessionError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Parser, Debug)]
#[command(name = "trailboard", about = "Presence and fading-trail sync relay and tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the websocket relay.
    Relay {
        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
    },
    /// Run scripted participants over an in-process hub.
    Simulate {
        #[arg(long, default_value_t = 3)]
        bots: usize,
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
    /// Connect one scripted participant to a relay.
    Bot {
        #[arg(long, env = "TRAIL_RELAY_URL", default_value = "ws://127.0.0.1:3000/ws")]
        url: String,
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Relay { port } => run_relay(port).await,
        Command::Simulate { bots, seconds } => run_simulate(bots, Duration::from_secs(seconds)).await,
        Command::Bot { url, seconds } => run_bot(&url, Duration::from_secs(seconds)).await,
    }
}

async fn run_relay(port: u16) -> Result<(), CliError> {
    let app = relay::app(relay::RelayState::new());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    info!(%port, "trailboard relay listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_simulate(bots: usize, run_for: Duration) -> Result<(), CliError> {
    let config = EngineConfig::from_env()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let hub = MemoryHub::new();

    let mut handles = Vec::with_capacity(bots);
    let mut tasks = Vec::with_capacity(bots);
    for _ in 0..bots {
        let (handle, task) = start(&config, &clock, Arc::new(hub.clone()));
        tasks.push(task);
        tokio::spawn(random_walk(handle.clone(), Arc::clone(&clock), run_for));
        handles.push(handle);
    }
    info!(bots, seconds = run_for.as_secs(), "simulate: started");

    if let Some(observer) = handles.first() {
        report(observer, run_for).await?;
    }
    for handle in &handles {
        handle.shutdown().await?;
    }
    for task in tasks {
        task.await??;
    }
    info!(rows = hub.rows().len(), "simulate: finished");
    Ok(())
}

async fn run_bot(url: &str, run_for: Duration) -> Result<(), CliError> {
    let config = EngineConfig::from_env()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let transport = WsTransport::connect(url).await?;

    let (handle, task) = start(&config, &clock, Arc::new(transport));
    tokio::spawn(random_walk(handle.clone(), Arc::clone(&clock), run_for));
    report(&handle, run_for).await?;
    handle.shutdown().await?;
    task.await??;
    Ok(())
}

fn start(
    config: &EngineConfig,
    clock: &Arc<dyn Clock>,
    transport: Arc<dyn Transport>,
) -> (SessionHandle, tokio::task::JoinHandle<Result<(), SessionError>>) {
    let local = CursorState::new(ParticipantId::random(), Point::new(0.5, 0.5), clock.now());
    Session::new(config, local, Arc::clone(clock), transport).spawn()
}

/// Log a one-line summary of `handle`'s view every [`REPORT_EVERY`].
async fn report(handle: &SessionHandle, run_for: Duration) -> Result<(), CliError> {
    let until = Instant::now() + run_for;
    let mut ticker = tokio::time::interval(REPORT_EVERY);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    while Instant::now() < until {
        ticker.tick().await;
        log_summary(&handle.snapshot().await?);
    }
    Ok(())
}

fn log_summary(snapshot: &RenderSnapshot) {
    let drawing = snapshot.cursors.iter().filter(|c| c.drawing).count();
    let faded = snapshot.segments.iter().filter(|v| v.alpha < 0.5).count();
    info!(
        local = %snapshot.local_id,
        cursors = snapshot.cursors.len(),
        drawing,
        segments = snapshot.segments.len(),
        faded,
        "snapshot"
    );
}

/// Drift the pointer around the surface, lifting and lowering the pen at
/// random. Stops when the session goes away or `run_for` elapses.
async fn random_walk(handle: SessionHandle, clock: Arc<dyn Clock>, run_for: Duration) {
    let mut rng = StdRng::from_os_rng();
    let mut ticker = tokio::time::interval(WALK_TICK);
    let until = Instant::now() + run_for;
    let mut pos = Point::new(rng.random_range(0.1..0.9), rng.random_range(0.1..0.9));
    let mut pen_down = false;

    while Instant::now() < until {
        ticker.tick().await;
        pos = Point::new(
            (pos.x + rng.random_range(-0.02..0.02)).clamp(0.0, 1.0),
            (pos.y + rng.random_range(-0.02..0.02)).clamp(0.0, 1.0),
        );
        let kind = if rng.random_bool(0.03) {
            pen_down = !pen_down;
            if pen_down { PointerKind::Down } else { PointerKind::Up }
        } else {
            PointerKind::Move
        };
        let sample = PointerSample::new(kind, pos.x, pos.y, clock.now());
        if handle.pointer(sample).await.is_err() {
            return;
        }
    }
}
