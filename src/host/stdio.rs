//! Stdin/stdout JSON bridge for the host command channel.
//!
//! Reads newline-delimited JSON `CommandEnvelope` messages from stdin,
//! dispatches them through the `HostCommandServer` router, and writes
//! `ResponseEnvelope` and `EventEnvelope` messages as newline-delimited
//! JSON to stdout.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::error::{MoodError, Result};
use crate::host::contract::{CommandEnvelope, CommandName, ResponseEnvelope};
use crate::host::router::{HostCommandClient, MoodFlowServices, command_channel};

/// Default request channel capacity for the stdio bridge.
const REQUEST_CAPACITY: usize = 64;

/// Default event broadcast channel capacity for the stdio bridge.
const EVENT_CAPACITY: usize = 128;

/// Run the bridge on the process's stdin and stdout until stdin closes or a
/// `runtime.stop` command is received.
pub async fn run_stdio_bridge(services: Arc<MoodFlowServices>) -> Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    let writer = Arc::new(Mutex::new(tokio::io::stdout()));
    run_bridge(services, reader, writer).await
}

/// Run the bridge over arbitrary line-oriented I/O.
///
/// Three concurrent tasks operate in parallel:
///
/// 1. **Reader** -- reads newline-delimited JSON, dispatches each
///    `CommandEnvelope` through the host command client, and writes the
///    resulting `ResponseEnvelope`.
/// 2. **Event forwarder** -- receives broadcast `EventEnvelope` messages
///    from the server and writes them as JSON lines.
/// 3. **Server** -- runs the `HostCommandServer` router loop.
///
/// The bridge exits when the reader finishes. Dropping the client causes
/// the server task to exit naturally.
pub async fn run_bridge<R, W>(
    services: Arc<MoodFlowServices>,
    reader: R,
    writer: Arc<Mutex<W>>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (client, server) = command_channel(REQUEST_CAPACITY, EVENT_CAPACITY, services);

    let server_handle = tokio::spawn(server.run());

    let event_writer = Arc::clone(&writer);
    let mut event_rx = client.subscribe_events();
    let event_handle = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event_envelope) => match serde_json::to_string(&event_envelope) {
                    Ok(json) => {
                        let mut w = event_writer.lock().await;
                        if let Err(e) = write_line(&mut *w, &json).await {
                            tracing::warn!(
                                error = %e,
                                "failed to write event envelope; stopping event forwarder"
                            );
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to serialize event envelope; skipping");
                    }
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "event forwarder lagged; some events were dropped");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    tracing::info!("event broadcast channel closed; stopping event forwarder");
                    break;
                }
            }
        }
    });

    let reader_result = run_reader(client, reader, Arc::clone(&writer)).await;

    event_handle.abort();
    let _ = event_handle.await;
    let _ = server_handle.await;

    reader_result
}

/// Read line-by-line, dispatch each command, and write responses.
async fn run_reader<R, W>(
    client: HostCommandClient,
    mut reader: R,
    writer: Arc<Mutex<W>>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| MoodError::Host(format!("failed to read command line: {e}")))?;

        if bytes_read == 0 {
            tracing::info!("input closed (EOF); shutting down host bridge");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let envelope: CommandEnvelope = match serde_json::from_str(trimmed) {
            Ok(env) => env,
            Err(e) => {
                // The raw line may carry user text; keep it out of normal logs.
                tracing::warn!(error = %e, "failed to parse command envelope");
                tracing::trace!(raw_line = %trimmed, "unparseable command line");
                let error_response = ResponseEnvelope::error(
                    "parse-error",
                    format!("failed to parse command envelope: {e}"),
                );
                write_response(&writer, &error_response).await?;
                continue;
            }
        };

        let is_stop = envelope.command == CommandName::RuntimeStop;
        let request_id = envelope.request_id.clone();

        let response = match client.send(envelope).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!(error = %e, "host command dispatch failed");
                ResponseEnvelope::error(request_id, format!("dispatch failed: {e}"))
            }
        };
        write_response(&writer, &response).await?;

        if is_stop {
            tracing::info!("runtime.stop received; shutting down host bridge");
            break;
        }
    }

    Ok(())
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &Mutex<W>,
    response: &ResponseEnvelope,
) -> Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| MoodError::Host(format!("failed to serialize response envelope: {e}")))?;
    let mut w = writer.lock().await;
    write_line(&mut *w, &json).await
}

/// Write a single JSON line and flush.
async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, json: &str) -> Result<()> {
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| MoodError::Host(format!("failed to write output: {e}")))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| MoodError::Host(format!("failed to write newline: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| MoodError::Host(format!("failed to flush output: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::config::MoodFlowConfig;
    use crate::host::router::ServiceParts;
    use crate::language::FixedLocale;

    fn services() -> Arc<MoodFlowServices> {
        let config = MoodFlowConfig::default();
        let mut parts = ServiceParts::in_memory(&config);
        parts.device = Arc::new(FixedLocale(None));
        Arc::new(MoodFlowServices::new(config, parts))
    }

    async fn run(input: &str) -> Vec<serde_json::Value> {
        let writer = Arc::new(Mutex::new(Vec::<u8>::new()));
        run_bridge(services(), input.as_bytes(), Arc::clone(&writer))
            .await
            .unwrap();
        let out = writer.lock().await.clone();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn responses(lines: &[serde_json::Value]) -> Vec<&serde_json::Value> {
        lines.iter().filter(|l| l.get("request_id").is_some()).collect()
    }

    #[tokio::test]
    async fn answers_each_line_and_stops_on_runtime_stop() {
        let input = concat!(
            r#"{"v":1,"request_id":"a","command":"host.ping","payload":{}}"#,
            "\n\n",
            "not json\n",
            r#"{"v":1,"request_id":"b","command":"runtime.stop","payload":{}}"#,
            "\n",
            r#"{"v":1,"request_id":"c","command":"host.ping","payload":{}}"#,
            "\n",
        );
        let lines = run(input).await;
        let responses = responses(&lines);
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["request_id"], "a");
        assert_eq!(responses[0]["payload"]["pong"], true);
        assert_eq!(responses[1]["request_id"], "parse-error");
        assert_eq!(responses[1]["ok"], false);
        assert_eq!(responses[2]["request_id"], "b");
        assert_eq!(responses[2]["payload"]["stopping"], true);
    }

    #[tokio::test]
    async fn invalid_envelope_keeps_request_id() {
        let input = concat!(
            r#"{"v":9,"request_id":"old","command":"host.ping","payload":{}}"#,
            "\n"
        );
        let lines = run(input).await;
        let responses = responses(&lines);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["request_id"], "old");
        assert!(
            responses[0]["error"]
                .as_str()
                .unwrap()
                .contains("unsupported contract version")
        );
    }

    #[tokio::test]
    async fn eof_without_commands_is_clean() {
        assert!(run("").await.is_empty());
    }
}
