//! TCP session with the Lich proxy.
//!
//! One task owns the socket: reads are forwarded line by line over a
//! channel to the session loop, writes drain the command channel. Both
//! directions close when either side drops.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

#[derive(Debug, Clone)]
pub enum ServerMessage {
    Line(String),
    Connected,
    Disconnected,
}

pub struct GameConnection;

impl GameConnection {
    pub async fn start(
        host: &str,
        port: u16,
        server_tx: mpsc::UnboundedSender<ServerMessage>,
        mut command_rx: mpsc::UnboundedReceiver<String>,
    ) -> Result<()> {
        info!("connecting to {}:{}", host, port);

        let stream = TcpStream::connect(format!("{host}:{port}"))
            .await
            .with_context(|| format!("connecting to {host}:{port}"))?;

        info!("connected");
        let _ = server_tx.send(ServerMessage::Connected);

        let (reader, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);

        let reader_tx = server_tx.clone();
        let read_handle = tokio::spawn(async move {
            loop {
                let mut line = String::new();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        info!("connection closed by server");
                        let _ = reader_tx.send(ServerMessage::Disconnected);
                        break;
                    }
                    Ok(_) => {
                        // keep blank lines, they are prompt separators
                        let line = line.trim_end_matches(['\r', '\n']);
                        let _ = reader_tx.send(ServerMessage::Line(line.to_string()));
                    }
                    Err(e) => {
                        error!("read error: {}", e);
                        let _ = reader_tx.send(ServerMessage::Disconnected);
                        break;
                    }
                }
            }
        });

        while let Some(command) = command_rx.recv().await {
            debug!("sending: {}", command);
            let send = async {
                writer.write_all(command.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await
            };
            if let Err(e) = send.await {
                error!("write error: {}", e);
                break;
            }
        }

        let _ = read_handle.await;
        Ok(())
    }
}
