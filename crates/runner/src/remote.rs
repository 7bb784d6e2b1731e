//! Session over the control port: newline-delimited JSON requests, one response per line.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, tcp::OwnedReadHalf, tcp::OwnedWriteHalf};
use tokio::sync::{Mutex, watch};

use tickbot_core::WorldSnapshot;
use tickbot_core::session::{
    BoxFuture, Command, CommandAck, CommandChannel, PathResult, SessionError, StateSource,
};

struct ControlConn {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

pub struct RemoteSession {
    conn: Mutex<ControlConn>,
    state: watch::Receiver<Option<Arc<WorldSnapshot>>>,
}

impl RemoteSession {
    /// Connects and starts polling state once per `poll_every`.
    pub async fn connect(addr: &str, poll_every: Duration) -> anyhow::Result<Arc<Self>> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("connect control port {addr}"))?;
        let (read, write) = stream.into_split();
        let (tx, rx) = watch::channel(None);
        let session = Arc::new(Self {
            conn: Mutex::new(ControlConn {
                reader: BufReader::new(read),
                writer: write,
            }),
            state: rx,
        });

        let poller = Arc::downgrade(&session);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_every);
            loop {
                interval.tick().await;
                let Some(session) = poller.upgrade() else {
                    break;
                };
                match session.poll_state().await {
                    Ok(Some(snap)) => {
                        let newer = tx
                            .borrow()
                            .as_ref()
                            .is_none_or(|old| snap.tick > old.tick);
                        if newer {
                            tx.send_replace(Some(Arc::new(snap)));
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        tracing::warn!(error = %format!("{err:#}"), "remote.poll_failed");
                        break;
                    }
                }
            }
            // Dropping `tx` wakes every waiter with a closed error.
        });

        Ok(session)
    }

    async fn request_json(&self, req: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let line = format!("{req}\n");
        let mut conn = self.conn.lock().await;
        conn.writer
            .write_all(line.as_bytes())
            .await
            .context("control write")?;
        conn.writer.flush().await.ok();

        let mut resp_line = String::new();
        let n = conn
            .reader
            .read_line(&mut resp_line)
            .await
            .context("control read")?;
        if n == 0 {
            anyhow::bail!("control connection closed");
        }
        let v: serde_json::Value =
            serde_json::from_str(resp_line.trim()).context("invalid control json response")?;
        if v.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            anyhow::bail!("control request failed: {v}");
        }
        Ok(v)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        req: serde_json::Value,
        key: &str,
    ) -> anyhow::Result<T> {
        let v = self.request_json(req).await?;
        decode_field(&v, key)
    }

    /// `None` while the game has not synced a player yet.
    async fn poll_state(&self) -> anyhow::Result<Option<WorldSnapshot>> {
        let v = self.request_json(json!({ "op": "state" })).await?;
        match v.get("state") {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(_) => decode_field(&v, "state").map(Some),
        }
    }
}

fn decode_field<T: DeserializeOwned>(v: &serde_json::Value, key: &str) -> anyhow::Result<T> {
    let field = v
        .get(key)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("missing {key} in response"))?;
    serde_json::from_value(field).with_context(|| format!("decode {key}"))
}

fn transport(err: anyhow::Error) -> SessionError {
    SessionError::Transport(format!("{err:#}"))
}

impl StateSource for RemoteSession {
    fn snapshot(&self) -> Option<Arc<WorldSnapshot>> {
        self.state.borrow().clone()
    }

    fn wait_for_state_change<'a>(
        &'a self,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<(), SessionError>> {
        let mut rx = self.state.clone();
        rx.mark_unchanged();
        Box::pin(async move {
            match tokio::time::timeout(timeout, rx.changed()).await {
                Ok(Ok(())) | Err(_) => Ok(()),
                Ok(Err(_)) => Err(SessionError::Closed),
            }
        })
    }
}

impl CommandChannel for RemoteSession {
    fn send<'a>(&'a self, command: Command) -> BoxFuture<'a, Result<CommandAck, SessionError>> {
        Box::pin(async move {
            self.request(json!({ "op": "command", "command": command }), "ack")
                .await
                .map_err(transport)
        })
    }

    fn find_path<'a>(
        &'a self,
        x: i32,
        z: i32,
        max_waypoints: u32,
    ) -> BoxFuture<'a, Result<PathResult, SessionError>> {
        Box::pin(async move {
            self.request(
                json!({ "op": "find_path", "x": x, "z": z, "max_waypoints": max_waypoints }),
                "path",
            )
            .await
            .map_err(transport)
        })
    }
}
