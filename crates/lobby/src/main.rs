mod palette;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossbeam::channel::Receiver;
use session::prelude::*;
use session::transport::LoopbackTransport;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use crate::palette::PlayerColorAssigner;

type Peer = SessionController<LoopbackTransport>;

#[derive(Parser)]
#[command(name = "lobby")]
#[command(about = "Simulates one host and several clients joining it over an in-memory network")]
struct Args {
    /// Number of clients joining the host
    #[arg(short = 'n', long, default_value_t = 3)]
    clients: usize,

    /// Session configuration file (RON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port the host listens on
    #[arg(short, long)]
    port: Option<u16>,

    /// Maximum number of clients the host accepts
    #[arg(long)]
    max_players: Option<usize>,

    /// Address the clients dial
    #[arg(short, long, default_value = "127.0.0.1")]
    address: String,

    /// Seconds to wait until every registry is complete
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Poll interval of each peer in milliseconds
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SessionConfig::from_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(max_players) = args.max_players {
        config.max_players = max_players;
    }

    let network = LoopbackNetwork::new();
    let mut host = Peer::new(network.endpoint(), config.clone());
    let host_events = host.subscribe();
    host.create_server().context("Failed to create server")?;

    let expected = 1 + args.clients.min(config.max_players);
    let tick = Duration::from_millis(args.tick_ms.max(1));
    println!("🚀 Lobby open on port {} ({} clients joining)", config.port, args.clients);
    info!(expected, max_players = config.max_players, "waiting for registries");

    let mut tasks: Vec<(String, JoinHandle<Result<Option<Peer>>>)> = Vec::new();
    tasks.push((
        "host".to_string(),
        tokio::spawn(run_peer(host, host_events, expected, tick)),
    ));

    let mut colors = PlayerColorAssigner::new();
    for index in 1..=args.clients {
        let mut client_config = config.clone();
        client_config.client_player = PlayerProfile::new(
            format!("{}{index}", config.client_player.name),
            colors.next_color(),
        );

        let mut peer = Peer::new(network.endpoint(), client_config);
        let events = peer.subscribe();
        let address = args.address.clone();
        let port = config.port;
        tasks.push((
            format!("client {index}"),
            tokio::spawn(async move {
                peer.join_server(&address, port)?;
                run_peer(peer, events, expected, tick).await
            }),
        ));
    }

    let joined = async {
        let mut peers = Vec::new();
        for (label, task) in tasks {
            match task.await?? {
                Some(peer) => peers.push((label, peer)),
                None => warn!("{label} did not join"),
            }
        }
        Ok::<_, anyhow::Error>(peers)
    };
    let peers = tokio::time::timeout(Duration::from_secs(args.timeout), joined)
        .await
        .context("Registries did not converge in time")??;

    let mut reference: Option<Vec<PlayerRecord>> = None;
    for (label, peer) in &peers {
        let records: Vec<PlayerRecord> = peer
            .players()
            .map(|players| players.all().cloned().collect())
            .unwrap_or_default();

        match peer.session().and_then(|session| session.local_id()) {
            Some(local) => println!("{label} (peer {local}):"),
            None => println!("{label}:"),
        }
        for record in &records {
            println!("  {record}");
        }

        match &reference {
            None => reference = Some(records),
            Some(first) if *first != records => bail!("registry of {label} diverged"),
            Some(_) => {}
        }
    }

    println!("✅ {} peers agree on {expected} players", peers.len());
    Ok(())
}

/// Pumps one peer until its registry holds `expected` players.
///
/// Returns `None` when the peer could not join.
async fn run_peer(
    mut peer: Peer,
    events: Receiver<SessionEvent>,
    expected: usize,
    tick: Duration,
) -> Result<Option<Peer>> {
    let mut ticker = tokio::time::interval(tick);
    loop {
        ticker.tick().await;
        peer.update(Instant::now());

        for event in events.try_iter() {
            match event {
                SessionEvent::JoinFailed(failure) => {
                    warn!(%failure, "join failed");
                    return Ok(None);
                }
                SessionEvent::SessionEnded(reason) => bail!("session ended: {reason}"),
                _ => {}
            }
        }

        if peer.players().is_some_and(|players| players.len() >= expected) {
            return Ok(Some(peer));
        }
    }
}
