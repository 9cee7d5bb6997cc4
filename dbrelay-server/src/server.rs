//! Line-delimited JSON-RPC over a byte stream.
//!
//! Each input line is one request. Requests run concurrently, one task each;
//! a single writer task serializes responses onto the output, one per line.
//! At end of input the server waits for every in-flight request, then closes
//! all database connections.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::dispatch::ToolDispatcher;
use crate::error::Result;
use crate::protocol::{JsonRpcRequest, JsonRpcResponse, RpcError};

const RESPONSE_QUEUE_DEPTH: usize = 64;

fn parse_line(line: &str) -> std::result::Result<JsonRpcRequest, JsonRpcResponse> {
    serde_json::from_str(line)
        .map_err(|e| JsonRpcResponse::error(None, RpcError::parse_error(e)))
}

async fn write_responses<W>(
    mut writer: W,
    mut responses: mpsc::Receiver<JsonRpcResponse>,
) -> Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = responses.recv().await {
        let mut line = serde_json::to_vec(&response)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
    }
    Ok(writer)
}

/// Serves requests from `reader` until end of input and returns the writer.
///
/// # Errors
/// Returns an error if reading input or writing a response fails.
pub async fn serve<R, W>(dispatcher: Arc<ToolDispatcher>, reader: R, writer: W) -> Result<W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (sender, receiver) = mpsc::channel::<JsonRpcResponse>(RESPONSE_QUEUE_DEPTH);
    let writer_task = tokio::spawn(write_responses(writer, receiver));
    let mut in_flight = JoinSet::new();
    let mut lines = BufReader::new(reader).lines();

    let read_result = loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(&line) {
            Ok(request) => {
                let dispatcher = Arc::clone(&dispatcher);
                let sender = sender.clone();
                in_flight.spawn(async move {
                    if let Some(response) = dispatcher.handle(request).await {
                        if sender.send(response).await.is_err() {
                            warn!("Response dropped: writer has stopped");
                        }
                    }
                });
            }
            Err(response) => {
                warn!("Discarding malformed request line");
                if sender.send(response).await.is_err() {
                    break Ok(());
                }
            }
        }

        while let Some(joined) = in_flight.try_join_next() {
            if let Err(e) = joined {
                error!("Request task failed: {}", e);
            }
        }
    };

    debug!("Input closed, waiting for {} request(s)", in_flight.len());
    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            error!("Request task failed: {}", e);
        }
    }
    drop(sender);

    let closed = dispatcher.actions().manager().disconnect_all().await;
    info!("Shut down, closed {} connection(s)", closed);

    let writer = match writer_task.await {
        Ok(result) => result?,
        Err(e) => return Err(std::io::Error::other(e).into()),
    };
    read_result?;
    Ok(writer)
}

/// Serves the process's stdin and stdout.
///
/// # Errors
/// Returns an error if stdin or stdout fails.
pub async fn serve_stdio(dispatcher: Arc<ToolDispatcher>) -> Result<()> {
    info!("dbrelay listening on stdio");
    serve(dispatcher, tokio::io::stdin(), tokio::io::stdout()).await?;
    Ok(())
}
