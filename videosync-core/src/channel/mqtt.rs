//! Publishing and subscribing roles over rumqttc
//!
//! Each role owns a dedicated thread driving the broker event loop; the
//! sender owns a second thread that drains the relay queue. Errors are
//! logged and end the role: there is no automatic reconnect, the
//! controlling application builds a fresh role instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use rumqttc::{Client, Event, MqttOptions, Packet, QoS};
use tracing::{debug, info, warn};

use super::{ChannelConfig, ConnectionState};
use crate::error::SyncError;
use crate::event::TransportEvent;
use crate::queue::RelayQueue;
use crate::session::ingest_payload;

/// Broker keep-alive, matching the reference client
const KEEP_ALIVE: Duration = Duration::from_secs(300);

/// How long the publish loop sleeps while waiting for the CONNACK
const CONNECT_POLL: Duration = Duration::from_millis(50);

/// Blocking-pop timeout so the publish loop notices shutdown promptly
const POP_TIMEOUT: Duration = Duration::from_millis(250);

fn mqtt_options(config: &ChannelConfig) -> MqttOptions {
    let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
    options.set_keep_alive(KEEP_ALIVE);
    options.set_clean_session(true);
    options
}

/// State shared between a role and its loop threads
struct Shared {
    state: Mutex<ConnectionState>,
    shutdown: AtomicBool,
}

impl Shared {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ConnectionState::Connecting),
            shutdown: AtomicBool::new(false),
        })
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }

    fn shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

/// Close the connection and join the role's loop threads. Idempotent.
fn disconnect_role(client: &Client, shared: &Shared, threads: &mut Vec<JoinHandle<()>>) {
    if shared.shutdown.swap(true, Ordering::Relaxed) {
        return;
    }
    if let Err(e) = client.disconnect() {
        debug!("Disconnect request failed: {}", e);
    }
    for handle in threads.drain(..) {
        let _ = handle.join();
    }
    shared.set_state(ConnectionState::Disconnected);
}

/// Publishing role: drains the relay queue onto the topic
pub struct Sender {
    client: Client,
    shared: Arc<Shared>,
    threads: Vec<JoinHandle<()>>,
}

impl Sender {
    /// Connect to the broker and start relaying queued events.
    ///
    /// Publishing only starts once the broker acknowledges the
    /// connection; until then queued events wait.
    pub fn connect(config: &ChannelConfig, queue: RelayQueue<TransportEvent>) -> Self {
        let (client, mut connection) = Client::new(mqtt_options(config), 10);
        let shared = Shared::new();
        let topic = config.publish_topic();
        info!("Sender connecting to {}:{}", config.host, config.port);

        let conn_shared = Arc::clone(&shared);
        let conn_thread = thread::spawn(move || {
            for event in connection.iter() {
                if conn_shared.shutting_down() {
                    break;
                }
                match event {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        info!("Broker acknowledged connection: {:?}", ack.code);
                        conn_shared.set_state(ConnectionState::Connected);
                    }
                    Ok(event) => debug!("Channel event: {:?}", event),
                    Err(e) => {
                        if !conn_shared.shutting_down() {
                            warn!("Channel connection failed: {}", e);
                        }
                        break;
                    }
                }
            }
            conn_shared.set_state(ConnectionState::Disconnected);
        });

        let publish_client = client.clone();
        let publish_shared = Arc::clone(&shared);
        let publish_thread = thread::spawn(move || loop {
            if publish_shared.shutting_down() {
                break;
            }
            match publish_shared.state() {
                ConnectionState::Connected => {}
                ConnectionState::Connecting => {
                    thread::sleep(CONNECT_POLL);
                    continue;
                }
                ConnectionState::Disconnected => break,
            }
            let Some(event) = queue.pop_timeout(POP_TIMEOUT) else {
                continue;
            };
            let payload = event.encode_payload();
            debug!("Publishing {:?} as {:?}", event, payload);
            // Fire and forget: no acknowledgment, no retry
            if let Err(e) = publish_client.publish(topic.as_str(), QoS::AtMostOnce, false, payload)
            {
                warn!("Publish failed: {}", e);
            }
        });

        Self {
            client,
            shared,
            threads: vec![conn_thread, publish_thread],
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Close the connection and join both loop threads
    pub fn disconnect(&mut self) {
        disconnect_role(&self.client, &self.shared, &mut self.threads);
    }
}

impl Drop for Sender {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Subscribing role: feeds inbound payloads into the receiver backlog
pub struct Receiver {
    client: Client,
    shared: Arc<Shared>,
    threads: Vec<JoinHandle<()>>,
}

impl Receiver {
    /// Connect to the broker, subscribe to the topic wildcard, and buffer
    /// every inbound publish through the ingest stage.
    pub fn connect(
        config: &ChannelConfig,
        backlog: RelayQueue<String>,
    ) -> Result<Self, SyncError> {
        let (client, mut connection) = Client::new(mqtt_options(config), 10);
        let shared = Shared::new();
        let filter = config.subscribe_filter();
        info!(
            "Receiver connecting to {}:{}, filter {}",
            config.host, config.port, filter
        );
        client.subscribe(filter, QoS::AtMostOnce)?;

        let conn_shared = Arc::clone(&shared);
        let conn_thread = thread::spawn(move || {
            for event in connection.iter() {
                if conn_shared.shutting_down() {
                    break;
                }
                match event {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        info!("Broker acknowledged connection: {:?}", ack.code);
                        conn_shared.set_state(ConnectionState::Connected);
                    }
                    Ok(Event::Incoming(Packet::SubAck(ack))) => {
                        debug!("Subscribed: {:?}", ack.return_codes);
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        debug!(
                            "Received {} bytes on {}",
                            publish.payload.len(),
                            publish.topic
                        );
                        ingest_payload(&backlog, &publish.payload);
                    }
                    Ok(event) => debug!("Channel event: {:?}", event),
                    Err(e) => {
                        if !conn_shared.shutting_down() {
                            warn!("Channel connection failed: {}", e);
                        }
                        break;
                    }
                }
            }
            conn_shared.set_state(ConnectionState::Disconnected);
        });

        Ok(Self {
            client,
            shared,
            threads: vec![conn_thread],
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Close the connection and join the loop thread
    pub fn disconnect(&mut self) {
        disconnect_role(&self.client, &self.shared, &mut self.threads);
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        self.disconnect();
    }
}
