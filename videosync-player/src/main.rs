//! MQTT Sync Player - headless demo
//!
//! Runs the sync relay against a broker with a simulated media engine in
//! place of a real video stack.
//!
//! Usage:
//!   videosync-player server [--host H] [--port P] [--topic T] [--id I]
//!   videosync-player client [--host H] [--port P] [--topic T] [--id I] [--offset MS]
//!
//! The server reads transport commands from stdin, one per line:
//!   p toggle play/pause, s stop, > / < change rate, n / b step one frame,
//!   g FRACTION seek, q quit.

mod player;

use std::io::BufRead;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tracing::{info, warn};
use videosync_core::{
    ChannelConfig, ConnectionState, Receiver, ReceiverSession, RelayQueue, Sender, SenderSession,
    StepDirection,
};

use player::SimulatedPlayer;

/// Apply tick for the client role
const CLIENT_TICK: Duration = Duration::from_millis(10);

/// Heartbeat tick for the server role
const SERVER_TICK: Duration = Duration::from_millis(200);

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(role) = args.first().cloned() else {
        eprintln!(
            "usage: videosync-player <server|client> [--host H] [--port P] [--topic T] [--id I] [--offset MS]"
        );
        std::process::exit(2);
    };

    let host = flag(&args, "--host").unwrap_or_else(|| "localhost".to_string());
    let port = flag(&args, "--port")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1883);
    let topic = flag(&args, "--topic").unwrap_or_else(|| "videosync".to_string());
    let client_id = flag(&args, "--id").unwrap_or_else(|| {
        // Unique per instance so two players can share one broker
        format!("videosync-{}-{:04x}", role, rand::thread_rng().gen::<u16>())
    });
    let offset_ms = flag(&args, "--offset")
        .and_then(|o| o.parse().ok())
        .unwrap_or(0);

    let config = ChannelConfig {
        client_id,
        host,
        port,
        topic,
    };

    match role.as_str() {
        "server" => run_server(config),
        "client" => run_client(config, offset_ms),
        other => {
            eprintln!("unknown role {:?}, expected server or client", other);
            std::process::exit(2);
        }
    }
}

fn flag(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1).cloned())
}

fn run_server(config: ChannelConfig) {
    let player = Arc::new(SimulatedPlayer::new());
    let queue = RelayQueue::new();
    let session = Arc::new(Mutex::new(SenderSession::new(player, queue.clone())));
    let mut sender = Sender::connect(&config, queue);
    info!("Server publishing to {}", config.publish_topic());

    // Heartbeat pump, standing in for the periodic UI tick of a real player
    let tick_session = Arc::clone(&session);
    thread::spawn(move || loop {
        tick_session.lock().tick();
        thread::sleep(SERVER_TICK);
    });

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            break;
        };
        let command = line.trim();
        if command == "q" {
            break;
        }
        let mut session = session.lock();
        match command {
            "" => {}
            "p" => session.toggle_play(),
            "s" => session.stop(),
            ">" => session.rate_up(),
            "<" => session.rate_down(),
            "n" => session.step_frame(StepDirection::Forward),
            "b" => session.step_frame(StepDirection::Backward),
            other => {
                if let Some(fraction) = other
                    .strip_prefix("g ")
                    .and_then(|v| v.parse::<f32>().ok())
                {
                    session.seek_to_position(fraction);
                } else {
                    warn!("Unknown command {:?}", other);
                }
            }
        }
    }

    sender.disconnect();
}

fn run_client(config: ChannelConfig, offset_ms: i64) {
    let player = Arc::new(SimulatedPlayer::new());
    let mut session = ReceiverSession::new(player);
    session.set_offset_ms(offset_ms);

    let receiver = match Receiver::connect(&config, session.backlog().clone()) {
        Ok(receiver) => receiver,
        Err(e) => {
            warn!("Failed to start receiver: {}", e);
            std::process::exit(1);
        }
    };
    info!("Client subscribed to {}", config.subscribe_filter());

    loop {
        if receiver.state() == ConnectionState::Disconnected {
            info!("Connection closed, exiting");
            break;
        }
        match session.apply_next() {
            Ok(Some(event)) => info!("Applied {:?}", event),
            Ok(None) => {}
            Err(e) => warn!("{}", e),
        }
        thread::sleep(CLIENT_TICK);
    }
}
