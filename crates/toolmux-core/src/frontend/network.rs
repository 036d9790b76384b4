//! Network front end
//!
//! Newline-delimited requests over TCP, one task per client. Each request
//! gets exactly one newline-terminated JSON response.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;

use super::payload::{parse_payload, Response};
use crate::logging::Logger;
use crate::{log_debug, log_info, log_warn};
use crate::orchestrator::QueryOrchestrator;
use crate::types::CancellationToken;

/// Largest accepted request line, newline included
pub const MAX_FRAME_BYTES: u64 = 64 * 1024;

pub struct NetworkFrontEnd {
    orchestrator: Arc<QueryOrchestrator>,
    logger: Arc<dyn Logger>,
}

impl NetworkFrontEnd {
    pub fn new(orchestrator: Arc<QueryOrchestrator>, logger: Arc<dyn Logger>) -> Self {
        Self { orchestrator, logger }
    }

    /// Accept clients until `cancel` fires, then wait for connected
    /// clients to finish the request they are serving
    pub async fn serve(self: Arc<Self>, listener: TcpListener, cancel: CancellationToken) -> io::Result<()> {
        if let Ok(addr) = listener.local_addr() {
            log_info!(self.logger, "[NetworkFrontEnd] Listening on {}", addr);
        }

        let mut clients = JoinSet::new();
        loop {
            let (stream, peer) = tokio::select! {
                _ = cancel.cancelled() => break,
                Some(_) = clients.join_next(), if !clients.is_empty() => continue,
                accepted = listener.accept() => accepted?,
            };

            log_debug!(self.logger, "[NetworkFrontEnd] Client connected: {}", peer);
            let front_end = Arc::clone(&self);
            let cancel = cancel.clone();
            clients.spawn(async move {
                if let Err(e) = front_end.handle_connection(stream, peer, cancel).await {
                    log_warn!(front_end.logger, "[NetworkFrontEnd] Client {} dropped: {}", peer, e);
                }
            });
        }

        if !clients.is_empty() {
            log_debug!(self.logger, "[NetworkFrontEnd] Waiting for {} clients", clients.len());
        }
        while clients.join_next().await.is_some() {}

        self.logger.info("[NetworkFrontEnd] Listener stopped");
        Ok(())
    }

    async fn handle_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        cancel: CancellationToken,
    ) -> io::Result<()> {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        let mut frame = Vec::new();

        loop {
            frame.clear();
            let mut limited = (&mut reader).take(MAX_FRAME_BYTES);
            let read = tokio::select! {
                _ = cancel.cancelled() => break,
                read = limited.read_until(b'\n', &mut frame) => read?,
            };
            if read == 0 {
                break;
            }

            if frame.last() != Some(&b'\n') && read as u64 == MAX_FRAME_BYTES {
                let response = Response::error(format!("Request exceeds {} bytes", MAX_FRAME_BYTES));
                writer.write_all(response.to_line()?.as_bytes()).await?;
                writer.flush().await?;
                Self::discard_line(&mut reader).await?;
                continue;
            }

            // Invalid UTF-8 is replaced, not fatal
            let line = String::from_utf8_lossy(&frame);
            if line.trim().is_empty() {
                continue;
            }

            let response = self.respond(&line, peer).await;
            writer.write_all(response.to_line()?.as_bytes()).await?;
            writer.flush().await?;
        }

        log_debug!(self.logger, "[NetworkFrontEnd] Client disconnected: {}", peer);
        Ok(())
    }

    /// Skip the rest of an oversized line
    async fn discard_line<R: tokio::io::AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<()> {
        let mut scratch = Vec::new();
        loop {
            scratch.clear();
            let read = (&mut *reader).take(MAX_FRAME_BYTES).read_until(b'\n', &mut scratch).await?;
            if read == 0 || scratch.last() == Some(&b'\n') {
                return Ok(());
            }
        }
    }

    /// Answer one payload from `peer`
    pub async fn respond(&self, payload: &str, peer: SocketAddr) -> Response {
        let request = match parse_payload(payload) {
            Ok(request) => request,
            Err(e) => return Response::error(e),
        };
        let conversation_id = request.session.unwrap_or_else(|| peer.to_string());

        match self
            .orchestrator
            .process_query(&conversation_id, &request.query, request.preferred_provider.as_deref())
            .await
        {
            Ok(answer) => Response::success(answer),
            Err(e) => Response::error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::ConversationStore;
    use crate::logging::NoOpLogger;
    use crate::reasoning::MockReasoner;
    use crate::registry::testing::FakeProvider;
    use crate::registry::ProviderRegistry;
    use crate::tools::ToolCatalog;
    use serde_json::Value;
    use std::time::Duration;

    fn front_end(with_provider: bool) -> Arc<NetworkFrontEnd> {
        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger);
        let registry = Arc::new(ProviderRegistry::new(logger.clone()));
        if with_provider {
            registry.register("p", Arc::new(FakeProvider::with_tools(&[]))).unwrap();
        }
        let orchestrator = Arc::new(QueryOrchestrator::new(
            Arc::new(ToolCatalog::new(registry, logger.clone())),
            Arc::new(ConversationStore::new(10)),
            Arc::new(MockReasoner::echo(logger.clone()).with_chunk_size(0)),
            logger.clone(),
        ));
        Arc::new(NetworkFrontEnd::new(orchestrator, logger))
    }

    async fn start(front_end: Arc<NetworkFrontEnd>) -> (SocketAddr, CancellationToken, tokio::task::JoinHandle<io::Result<()>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(front_end.serve(listener, cancel.clone()));
        (addr, cancel, handle)
    }

    #[tokio::test]
    async fn test_loopback_round_trip() {
        let (addr, cancel, handle) = start(front_end(true)).await;

        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        writer.write_all(b"QUERY: hello\n{\"query\": \"again\"}\n").await.unwrap();

        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let first: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(first["status"], "success");
        assert_eq!(first["data"], "Echo: hello");

        line.clear();
        reader.read_line(&mut line).await.unwrap();
        let second: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(second["data"], "Echo: again");

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_empty_registry_is_error_response() {
        let front_end = front_end(false);
        let peer: SocketAddr = "127.0.0.1:4000".parse().unwrap();

        match front_end.respond("hi", peer).await {
            Response::Error { error, .. } => assert_eq!(error, "No tool providers are registered"),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_query_is_error_response() {
        let front_end = front_end(true);
        let peer: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        assert!(matches!(front_end.respond("QUERY:  ", peer).await, Response::Error { .. }));
    }

    #[tokio::test]
    async fn test_session_token_selects_conversation() {
        let front_end = front_end(true);
        let peer: SocketAddr = "127.0.0.1:4000".parse().unwrap();

        front_end.respond(r#"{"query": "a", "session": "s1"}"#, peer).await;
        front_end.respond("b", peer).await;

        let conversations = front_end.orchestrator.conversations();
        assert_eq!(conversations.get("s1").await.len(), 2);
        assert_eq!(conversations.get("127.0.0.1:4000").await.len(), 2);
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let (addr, cancel, _handle) = start(front_end(true)).await;

        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let big = vec![b'x'; MAX_FRAME_BYTES as usize + 10];
        writer.write_all(&big).await.unwrap();

        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let response: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(response["status"], "error");

        cancel.cancel();
    }

    #[tokio::test]
    async fn test_invalid_utf8_keeps_connection() {
        let (addr, cancel, handle) = start(front_end(true)).await;

        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        writer.write_all(b"caf\xe9 please\nQUERY: second\n").await.unwrap();

        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let first: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(first["status"], "success");
        assert_eq!(first["data"], "Echo: caf\u{FFFD} please");

        line.clear();
        reader.read_line(&mut line).await.unwrap();
        let second: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(second["data"], "Echo: second");

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_cancel_closes_connected_clients() {
        let (addr, cancel, handle) = start(front_end(true)).await;

        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        writer.write_all(b"hello\n").await.unwrap();
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert!(line.contains("Echo: hello"));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("listener did not stop")
            .unwrap()
            .unwrap();

        line.clear();
        assert_eq!(reader.read_line(&mut line).await.unwrap(), 0);
    }
}
