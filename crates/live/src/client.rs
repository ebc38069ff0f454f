use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use crate::client::stats::Stats;
use crate::types;

mod config;
mod consts;
mod stats;
mod utils;

pub use config::Config;

pub type ClientTx = tokio::sync::mpsc::Sender<types::ClientMessage>;
type ServerTx = tokio::sync::broadcast::Sender<types::ServerMessage>;
pub type ServerRx = tokio::sync::broadcast::Receiver<types::ServerMessage>;

const CHANNEL_CAPACITY: usize = 1024;

struct Connection {
    send_handle: tokio::task::JoinHandle<()>,
    recv_handle: tokio::task::JoinHandle<()>,
}

/// Handle to one live bidirectional session. Frames go out through an mpsc
/// fed send pump; server messages fan out through a broadcast channel.
/// There is no reconnect: once the connection drops, the handle is done.
pub struct Client {
    capacity: usize,
    config: Config,
    c_tx: Option<ClientTx>,
    s_tx: Option<ServerTx>,
    stats: Arc<Mutex<Stats>>,
    connection: Option<Connection>,
}

/// Opens a live session and returns the connected client.
pub async fn connect(config: Config) -> Result<Client> {
    let mut client = Client::new(CHANNEL_CAPACITY, config);
    client.open().await?;
    Ok(client)
}

impl Client {
    fn new(capacity: usize, config: Config) -> Self {
        Self {
            capacity,
            config,
            c_tx: None,
            s_tx: None,
            stats: Arc::new(Mutex::new(Stats::new())),
            connection: None,
        }
    }

    async fn open(&mut self) -> Result<()> {
        if self.c_tx.is_some() {
            bail!("already connected");
        }

        let request = utils::build_request(&self.config)?;
        let (ws_stream, _) = tokio_tungstenite::connect_async(request)
            .await
            .context("failed to open live session")?;
        tracing::info!("live session socket open");

        let (mut write, mut read) = ws_stream.split();

        let (c_tx, mut c_rx) = tokio::sync::mpsc::channel(self.capacity);
        let (s_tx, _) = tokio::sync::broadcast::channel(self.capacity);

        self.c_tx = Some(c_tx);
        self.s_tx = Some(s_tx.clone());

        let send_handle = tokio::spawn(async move {
            while let Some(message) = c_rx.recv().await {
                match serde_json::to_string(&message) {
                    Ok(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            tracing::error!("failed to send message: {e}");
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("failed to serialize message: {e}");
                    }
                }
            }
            if let Err(e) = write.close().await {
                tracing::debug!("socket close: {e}");
            }
        });

        let stats = Arc::clone(&self.stats);
        let recv_handle = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let message = match message {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::error!("failed to read message: {e}");
                        break;
                    }
                };
                // The server sends JSON in both text and binary frames.
                let parsed = match &message {
                    Message::Text(text) => serde_json::from_str::<types::ServerMessage>(text)
                        .map_err(anyhow::Error::from),
                    Message::Binary(bytes) => {
                        serde_json::from_slice::<types::ServerMessage>(bytes)
                            .map_err(anyhow::Error::from)
                    }
                    Message::Close(reason) => {
                        tracing::info!("live session closed: {reason:?}");
                        break;
                    }
                    _ => continue,
                };

                match parsed {
                    Ok(event) => {
                        if let Ok(mut stats) = stats.lock() {
                            stats.record(&event);
                        }
                        if event.go_away.is_some() {
                            tracing::warn!("server is going away");
                        }
                        if s_tx.send(event).is_err() {
                            tracing::debug!("no live subscribers remain");
                        }
                    }
                    Err(e) => {
                        tracing::error!("failed to deserialize server message: {e}");
                    }
                }
            }
        });

        self.connection = Some(Connection {
            send_handle,
            recv_handle,
        });
        Ok(())
    }

    /// Subscribes to the server message stream.
    pub fn server_events(&self) -> Result<ServerRx> {
        match self.s_tx {
            Some(ref tx) => Ok(tx.subscribe()),
            None => bail!("not connected yet"),
        }
    }

    /// Sends the session configuration. Must be the first message after
    /// connecting.
    pub async fn setup(&self, setup: types::Setup) -> Result<()> {
        self.send(types::ClientMessage::Setup(setup)).await
    }

    /// Streams one captured microphone frame.
    pub async fn send_audio(&self, chunk: types::Blob) -> Result<()> {
        self.send(types::ClientMessage::RealtimeInput(types::RealtimeInput {
            media_chunks: vec![chunk],
        }))
        .await
    }

    async fn send(&self, message: types::ClientMessage) -> Result<()> {
        match self.c_tx {
            Some(ref tx) => tx
                .send(message)
                .await
                .context("live session send pump is gone"),
            None => bail!("not connected yet"),
        }
    }

    /// A cloneable handle into the send pump, for capture callbacks that
    /// outlive this borrow.
    pub fn sender(&self) -> Result<ClientTx> {
        match self.c_tx {
            Some(ref tx) => Ok(tx.clone()),
            None => bail!("not connected yet"),
        }
    }

    pub fn stats(&self) -> Stats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Tears the connection down: the send pump drains and closes the
    /// socket, the receive pump is aborted. Safe to call more than once.
    pub fn close(&mut self) {
        self.c_tx = None;
        self.s_tx = None;
        if let Some(connection) = self.connection.take() {
            connection.recv_handle.abort();
            // Dropping c_tx above lets the send pump finish its queue and
            // close the socket; aborting it would cut frames still queued.
            drop(connection.send_handle);
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.close();
    }
}
