/// Push channel client: newline-delimited JSON envelopes over TCP
use crate::error::{ChatError, Result};
use crate::session::AppEvent;
use crate::types::{ChannelEvent, OutgoingMessage};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Emitting side of the push channel
pub trait PushSink: Clone + Send + Sync + 'static {
    fn emit(&self, msg: OutgoingMessage) -> impl Future<Output = Result<()>> + Send;
}

/// Write half of a connected channel, or nothing if the connection failed
#[derive(Clone)]
pub struct PushSender {
    writer: Option<Arc<Mutex<OwnedWriteHalf>>>,
}

impl PushSender {
    /// A sender whose emits always fail
    pub fn disconnected() -> Self {
        Self { writer: None }
    }

    pub fn is_connected(&self) -> bool {
        self.writer.is_some()
    }
}

impl PushSink for PushSender {
    async fn emit(&self, msg: OutgoingMessage) -> Result<()> {
        let writer = self
            .writer
            .as_ref()
            .ok_or_else(|| ChatError::Channel("not connected".to_string()))?;

        let mut line = serde_json::to_vec(&ChannelEvent::SendMessage(msg))?;
        line.push(b'\n');

        let mut writer = writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }
}

pub struct PushChannel;

impl PushChannel {
    /// Connect to the push channel. Incoming `new_message` events are forwarded
    /// to `events` as [`AppEvent::Push`]; [`AppEvent::ChannelClosed`] follows
    /// when the connection ends. Gives up after `connect_timeout`.
    pub async fn connect(
        addr: SocketAddr,
        connect_timeout: Duration,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Result<PushSender> {
        let stream = timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ChatError::Timeout(format!("connect {}", addr)))??;
        stream.set_nodelay(true)?;
        info!("Push channel connected to {}", addr);

        let (reader, writer) = stream.into_split();
        tokio::spawn(read_events(reader, events));

        Ok(PushSender {
            writer: Some(Arc::new(Mutex::new(writer))),
        })
    }
}

async fn read_events(reader: OwnedReadHalf, events: mpsc::UnboundedSender<AppEvent>) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<ChannelEvent>(trimmed) {
                    Ok(ChannelEvent::NewMessage(msg)) => {
                        if events.send(AppEvent::Push(msg)).is_err() {
                            debug!("Event loop gone, stopping push reader");
                            return;
                        }
                    }
                    Ok(ChannelEvent::SendMessage(_)) => {
                        debug!("Ignoring echoed send_message event");
                    }
                    Err(e) => debug!("Skipping push line: {}", e),
                }
            }
            Ok(None) => {
                info!("Push channel closed by peer");
                break;
            }
            Err(e) => {
                warn!("Push channel read error: {}", e);
                break;
            }
        }
    }
    let _ = events.send(AppEvent::ChannelClosed);
}
