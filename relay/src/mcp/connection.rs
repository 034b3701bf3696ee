//! Lifecycle of a single server connection
//!
//! Each connection owns exactly one transport and walks a small state
//! machine: Uninitialized → Initializing → Ready → Closing → Closed, with
//! Failed as the dead end for initialization errors. Failed and Closed are
//! terminal; a connection is never revived.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};

use crate::config::ServerConfig;
use crate::error::RelayError;

use super::transport::{DiscoveredTool, ToolTransport, TransportError, TransportFactory};

/// Default number of attempts for a recoverable tool-call failure.
pub const DEFAULT_RETRIES: u32 = 2;

/// Default wait between attempts.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// How long a spawned close task gets before it is abandoned.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Initializing,
    Ready,
    Closing,
    Closed,
    Failed,
}

/// One MCP server connection with bounded-retry dispatch.
pub struct ServerConnection {
    name: String,
    config: ServerConfig,
    factory: Arc<dyn TransportFactory>,
    transport: Mutex<Option<Arc<dyn ToolTransport>>>,
    state: RwLock<ConnectionState>,
    /// Makes concurrent/duplicate cleanup calls idempotent.
    cleanup_lock: Mutex<()>,
}

impl ServerConnection {
    pub fn new(name: &str, config: ServerConfig, factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            name: name.to_string(),
            config,
            factory,
            transport: Mutex::new(None),
            state: RwLock::new(ConnectionState::Uninitialized),
            cleanup_lock: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub async fn is_ready(&self) -> bool {
        self.state().await == ConnectionState::Ready
    }

    async fn set_state(&self, state: ConnectionState) {
        *self.state.write().await = state;
    }

    /// Open the transport. Idempotent: a Ready connection is left alone.
    ///
    /// A failed connect leaves nothing half-open (the factory only returns a
    /// transport once the session is fully established) and parks the
    /// connection in Failed for good.
    pub async fn initialize(&self) -> Result<(), RelayError> {
        match self.state().await {
            ConnectionState::Ready => return Ok(()),
            ConnectionState::Uninitialized => {}
            other => {
                return Err(RelayError::Unavailable {
                    server: self.name.clone(),
                    reason: format!("connection is {:?} and cannot be initialized", other),
                })
            }
        }

        self.set_state(ConnectionState::Initializing).await;

        match self.factory.connect(&self.name, &self.config).await {
            Ok(transport) => {
                *self.transport.lock().await = Some(transport);
                self.set_state(ConnectionState::Ready).await;
                tracing::debug!(server = %self.name, "connection ready");
                Ok(())
            }
            Err(e) => {
                self.set_state(ConnectionState::Failed).await;
                tracing::error!(server = %self.name, "initialization failed: {}", e);
                Err(RelayError::Connection {
                    server: self.name.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Query the server's tool list. Valid only in Ready state.
    pub async fn list_tools(&self) -> Result<Vec<DiscoveredTool>, RelayError> {
        if !self.is_ready().await {
            return Err(RelayError::NotInitialized {
                server: self.name.clone(),
            });
        }

        let transport = self.current_transport().await?;
        transport.list_tools().await.map_err(|e| match e {
            TransportError::Closed => RelayError::Unavailable {
                server: self.name.clone(),
                reason: "transport is closed".to_string(),
            },
            TransportError::Call(reason) => RelayError::Connection {
                server: self.name.clone(),
                reason,
            },
        })
    }

    /// Invoke a tool with the default retry policy.
    pub async fn execute_tool(&self, tool: &str, args: serde_json::Value) -> Result<String, RelayError> {
        self.execute_tool_with_policy(tool, args, DEFAULT_RETRIES, RETRY_DELAY)
            .await
    }

    /// Invoke a tool, retrying recoverable failures up to `retries` attempts
    /// total with `delay` between attempts.
    ///
    /// Unrecoverable failures (closed transport, torn-down connection)
    /// propagate immediately. The Ready check runs before every attempt so a
    /// teardown during the backoff wait stops the retry rather than hitting a
    /// dead transport again.
    pub async fn execute_tool_with_policy(
        &self,
        tool: &str,
        args: serde_json::Value,
        retries: u32,
        delay: Duration,
    ) -> Result<String, RelayError> {
        let max_attempts = retries.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            if !self.is_ready().await {
                return Err(RelayError::Unavailable {
                    server: self.name.clone(),
                    reason: format!("connection is {:?}", self.state().await),
                });
            }
            let transport = self.current_transport().await?;

            tracing::debug!(server = %self.name, tool, attempt, "executing tool");

            match transport.call_tool(tool, args.clone()).await {
                Ok(output) => return Ok(output),
                Err(TransportError::Closed) => {
                    return Err(RelayError::Unavailable {
                        server: self.name.clone(),
                        reason: "transport is closed".to_string(),
                    });
                }
                Err(TransportError::Call(reason)) => {
                    let err = RelayError::ToolCall {
                        server: self.name.clone(),
                        tool: tool.to_string(),
                        reason,
                    };
                    if attempt >= max_attempts {
                        tracing::error!(server = %self.name, tool, "max retries reached: {}", err);
                        return Err(err);
                    }
                    tracing::warn!(
                        server = %self.name,
                        tool,
                        "attempt {} of {} failed: {}; retrying in {:?}",
                        attempt,
                        max_attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn current_transport(&self) -> Result<Arc<dyn ToolTransport>, RelayError> {
        self.transport
            .lock()
            .await
            .clone()
            .ok_or_else(|| RelayError::Unavailable {
                server: self.name.clone(),
                reason: "connection has been torn down".to_string(),
            })
    }

    /// Tear the connection down. Safe to call concurrently or repeatedly; a
    /// call on an already-Closed connection is a no-op.
    ///
    /// The transport is taken out of its slot once and closed inside a
    /// spawned task with its own timeout, so teardown runs to completion (or
    /// times out) even when the caller is being cancelled. State ends up
    /// Closed on every path.
    pub async fn cleanup(&self) {
        let _guard = self.cleanup_lock.lock().await;

        if self.state().await == ConnectionState::Closed {
            return;
        }
        self.set_state(ConnectionState::Closing).await;

        if let Some(transport) = self.transport.lock().await.take() {
            let server = self.name.clone();
            let handle = tokio::spawn(async move { transport.close().await });
            let abort = handle.abort_handle();

            match tokio::time::timeout(CLOSE_TIMEOUT, handle).await {
                Ok(Ok(Ok(()))) => {
                    tracing::debug!(server = %self.name, "transport closed");
                }
                Ok(Ok(Err(TransportError::Closed))) => {
                    tracing::debug!(server = %self.name, "transport was already closed");
                }
                Ok(Ok(Err(e))) => {
                    tracing::warn!(server = %self.name, "error closing transport: {}", e);
                }
                Ok(Err(join_err)) if join_err.is_cancelled() => {
                    tracing::debug!(server = %self.name, "close task cancelled");
                }
                Ok(Err(join_err)) => {
                    tracing::warn!(server = %self.name, "close task failed: {}", join_err);
                }
                Err(_) => {
                    tracing::info!(server = %server, "transport close timed out");
                    abort.abort();
                }
            }
        }

        self.set_state(ConnectionState::Closed).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::testing::{failing_factory, MockFactory, MockTransport};
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn test_config() -> ServerConfig {
        ServerConfig {
            command: "mock".to_string(),
            args: Vec::new(),
            env: Default::default(),
        }
    }

    fn short_delay() -> Duration {
        Duration::from_millis(1)
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let transport = Arc::new(MockTransport::echo());
        let conn = ServerConnection::new(
            "calc",
            test_config(),
            MockFactory::single("calc", transport),
        );

        assert_eq!(conn.state().await, ConnectionState::Uninitialized);
        conn.initialize().await.unwrap();
        assert_eq!(conn.state().await, ConnectionState::Ready);
        // second call is a no-op
        conn.initialize().await.unwrap();
        assert_eq!(conn.state().await, ConnectionState::Ready);
    }

    #[tokio::test]
    async fn failed_initialize_is_terminal() {
        let conn = ServerConnection::new("calc", test_config(), failing_factory("spawn failed"));

        let err = conn.initialize().await.unwrap_err();
        assert!(matches!(err, RelayError::Connection { .. }));
        assert_eq!(conn.state().await, ConnectionState::Failed);

        // no revival from Failed
        assert!(conn.initialize().await.is_err());
        assert_eq!(conn.state().await, ConnectionState::Failed);
    }

    #[tokio::test]
    async fn list_tools_requires_ready() {
        let conn = ServerConnection::new(
            "calc",
            test_config(),
            MockFactory::single("calc", Arc::new(MockTransport::echo())),
        );

        let err = conn.list_tools().await.unwrap_err();
        assert!(matches!(err, RelayError::NotInitialized { .. }));
    }

    #[tokio::test]
    async fn recoverable_failure_retries_up_to_bound() {
        let transport = Arc::new(MockTransport::always_failing("boom"));
        let conn = ServerConnection::new(
            "calc",
            test_config(),
            MockFactory::single("calc", transport.clone()),
        );
        conn.initialize().await.unwrap();

        let err = conn
            .execute_tool_with_policy("add", json!({}), 2, short_delay())
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::ToolCall { .. }));
        assert!(err.is_recoverable());
        // exactly 2 attempts for retries=2
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unrecoverable_failure_is_not_retried() {
        let transport = Arc::new(MockTransport::closed_on_call());
        let conn = ServerConnection::new(
            "calc",
            test_config(),
            MockFactory::single("calc", transport.clone()),
        );
        conn.initialize().await.unwrap();

        let err = conn
            .execute_tool_with_policy("add", json!({}), 2, short_delay())
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Unavailable { .. }));
        assert!(!err.is_recoverable());
        // exactly one attempt, no retry
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_succeeds_after_transient_failure() {
        let transport = Arc::new(MockTransport::failing_then_ok(1, "42"));
        let conn = ServerConnection::new(
            "calc",
            test_config(),
            MockFactory::single("calc", transport.clone()),
        );
        conn.initialize().await.unwrap();

        let out = conn
            .execute_tool_with_policy("add", json!({}), 2, short_delay())
            .await
            .unwrap();

        assert_eq!(out, "42");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cleanup_is_idempotent_and_terminal() {
        let transport = Arc::new(MockTransport::echo());
        let conn = ServerConnection::new(
            "calc",
            test_config(),
            MockFactory::single("calc", transport.clone()),
        );
        conn.initialize().await.unwrap();

        conn.cleanup().await;
        assert_eq!(conn.state().await, ConnectionState::Closed);
        assert!(transport.closed.load(Ordering::SeqCst));

        // duplicate call: silent no-op
        conn.cleanup().await;
        assert_eq!(conn.state().await, ConnectionState::Closed);

        // no calls permitted after close
        let err = conn.execute_tool("add", json!({})).await.unwrap_err();
        assert!(matches!(err, RelayError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn cleanup_without_initialize_still_closes() {
        let conn = ServerConnection::new(
            "calc",
            test_config(),
            MockFactory::single("calc", Arc::new(MockTransport::echo())),
        );

        conn.cleanup().await;
        assert_eq!(conn.state().await, ConnectionState::Closed);
    }

    #[tokio::test]
    async fn concurrent_cleanups_are_safe() {
        let transport = Arc::new(MockTransport::echo());
        let conn = Arc::new(ServerConnection::new(
            "calc",
            test_config(),
            MockFactory::single("calc", transport),
        ));
        conn.initialize().await.unwrap();

        let a = {
            let conn = conn.clone();
            tokio::spawn(async move { conn.cleanup().await })
        };
        let b = {
            let conn = conn.clone();
            tokio::spawn(async move { conn.cleanup().await })
        };
        a.await.unwrap();
        b.await.unwrap();

        assert_eq!(conn.state().await, ConnectionState::Closed);
    }
}
