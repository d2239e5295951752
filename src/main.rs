use std::time::Duration;

use ascii_whisper::{
    init_logging, video, video::FrameSource, Coordinator, DisconnectReason, GameConfig, Link,
    Notice, Role, Session, SessionConfig, SessionEvent, UserInfo, DEFAULT_PORT,
};
use clap::Parser;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

#[derive(Parser)]
#[command(author, version, about = "Peer-to-peer text video chat with Battleship", long_about = None)]
struct Cli {
    /// Wait for the peer to connect.
    #[arg(long, conflicts_with = "connect", required_unless_present = "connect")]
    host: bool,
    /// Connect to a hosting peer (`host` or `host:port`).
    #[arg(long, value_name = "ADDR")]
    connect: Option<String>,
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Interface to listen on in host mode.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,
    #[arg(long, default_value = "anonymous")]
    name: String,
    #[arg(long, default_value = "white")]
    chat_color: String,
    #[arg(long, default_value = "default")]
    theme_color: String,
    #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
    seed: Option<u64>,
    /// Pause before each computer move.
    #[arg(long, default_value_t = 1000)]
    ai_delay_ms: u64,
    /// Outgoing video frames per second; 0 disables video.
    #[arg(long, default_value_t = 5)]
    fps: u32,
    #[arg(long, default_value_t = 5)]
    heartbeat_secs: u64,
    /// Print incoming video frames to the terminal.
    #[arg(long)]
    show_video: bool,
}

impl Cli {
    fn role(&self) -> Role {
        if self.host {
            Role::Host
        } else {
            Role::Client
        }
    }
}

fn print(notices: &[Notice]) -> bool {
    let mut exit = false;
    for n in notices {
        println!("{n}");
        exit |= matches!(n, Notice::Exit);
    }
    exit
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let link = match &cli.connect {
        Some(addr) => {
            let addr = if addr.contains(':') {
                addr.clone()
            } else {
                format!("{addr}:{}", cli.port)
            };
            println!("Connecting to {addr}...");
            Link::dial(&addr).await?
        }
        None => {
            let addr = format!("{}:{}", cli.bind, cli.port);
            println!("Waiting for a peer on {addr}...");
            Link::listen(&addr).await?
        }
    };

    let session_config = SessionConfig {
        heartbeat_interval: Duration::from_secs(cli.heartbeat_secs.max(1)),
        ..SessionConfig::default()
    };
    let local = UserInfo {
        name: cli.name.clone(),
        chat_color: cli.chat_color.clone(),
        theme_color: cli.theme_color.clone(),
    };
    let (session, mut events) = Session::establish(link, local, session_config).await?;
    println!(
        "Connected to {}. Type /help for commands.",
        session.peer().name
    );

    let rng = match cli.seed {
        Some(s) => {
            println!("Using fixed seed: {} (games will be reproducible)", s);
            SmallRng::seed_from_u64(s)
        }
        None => SmallRng::from_rng(&mut rand::rng()),
    };
    let game_config = GameConfig {
        ai_delay: Duration::from_millis(cli.ai_delay_ms),
    };
    let mut coordinator = Coordinator::new(cli.role(), Some(session.clone()), game_config, rng);

    let mut source = video::PlaceholderSource::new(cli.name.clone(), 32, 8);
    let mut frame_ticker = tokio::time::interval(Duration::from_millis(
        1000 / u64::from(cli.fps.max(1)),
    ));
    let mut incoming_video = events.video_watch();
    let mut video_open = true;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut failure = None;

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    let notices = coordinator.handle_input(&line).await;
                    if print(&notices) {
                        break;
                    }
                }
                None => break,
            },
            event = events.recv() => match event {
                Some(event) => {
                    let reason = match &event {
                        SessionEvent::Disconnected(reason) => Some(reason.clone()),
                        _ => None,
                    };
                    print(&coordinator.handle_event(event));
                    if let Some(reason) = reason {
                        if !reason.is_clean() {
                            failure = Some(reason);
                        }
                        break;
                    }
                }
                None => break,
            },
            _ = frame_ticker.tick(), if cli.fps > 0 => {
                if let Some(frame) = source.next_frame() {
                    if session.send_video(video::compress(&frame)).is_err() {
                        debug!("video frame not sent");
                    }
                }
            },
            changed = incoming_video.changed(), if video_open => {
                if changed.is_err() {
                    video_open = false;
                    continue;
                }
                let data = incoming_video.borrow_and_update().clone();
                match data.map(|d| video::decompress(&d)) {
                    Some(Ok(frame)) if cli.show_video => println!("{}", frame.rows.join("\n")),
                    Some(Ok(frame)) => debug!(width = frame.width(), height = frame.height(), "video frame"),
                    Some(Err(e)) => debug!(error = %e, "bad video frame"),
                    None => {}
                }
            },
        }
    }

    session.shutdown().await;
    if let Some(DisconnectReason::Failed(e)) = failure {
        anyhow::bail!("connection lost: {e}");
    }
    info!("bye");
    Ok(())
}
