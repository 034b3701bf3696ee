//! Scripted transports for exercising connection and orchestration logic
//! without spawning subprocesses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::ServerConfig;

use super::transport::{DiscoveredTool, ToolTransport, TransportError, TransportFactory};

enum Behavior {
    Echo,
    Calc,
    AlwaysFail(String),
    FailThenOk { failures: usize, output: String },
    ClosedOnCall,
}

pub(crate) struct MockTransport {
    tools: Vec<DiscoveredTool>,
    behavior: Behavior,
    pub calls: AtomicUsize,
    pub closed: AtomicBool,
}

impl MockTransport {
    fn new(tools: Vec<DiscoveredTool>, behavior: Behavior) -> Self {
        Self {
            tools,
            behavior,
            calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Replies `tool:args` to every call.
    pub fn echo() -> Self {
        Self::new(
            vec![DiscoveredTool {
                name: "echo".to_string(),
                description: Some("Echo the arguments back".to_string()),
                input_schema: None,
            }],
            Behavior::Echo,
        )
    }

    /// Exposes `add` and actually adds.
    pub fn calc() -> Self {
        Self::new(
            vec![DiscoveredTool {
                name: "add".to_string(),
                description: Some("Add two numbers".to_string()),
                input_schema: Some(json!({
                    "type": "object",
                    "properties": {
                        "a": {"type": "number"},
                        "b": {"type": "number"}
                    },
                    "required": ["a", "b"]
                })),
            }],
            Behavior::Calc,
        )
    }

    /// Every call fails recoverably with `reason`.
    pub fn always_failing(reason: &str) -> Self {
        Self::new(
            vec![DiscoveredTool {
                name: "add".to_string(),
                description: None,
                input_schema: None,
            }],
            Behavior::AlwaysFail(reason.to_string()),
        )
    }

    /// The first `failures` calls fail recoverably, then calls return `output`.
    pub fn failing_then_ok(failures: usize, output: &str) -> Self {
        Self::new(
            vec![DiscoveredTool {
                name: "add".to_string(),
                description: None,
                input_schema: None,
            }],
            Behavior::FailThenOk {
                failures,
                output: output.to_string(),
            },
        )
    }

    /// Every call reports a closed transport.
    pub fn closed_on_call() -> Self {
        Self::new(
            vec![DiscoveredTool {
                name: "add".to_string(),
                description: None,
                input_schema: None,
            }],
            Behavior::ClosedOnCall,
        )
    }
}

#[async_trait]
impl ToolTransport for MockTransport {
    async fn list_tools(&self) -> Result<Vec<DiscoveredTool>, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        Ok(self.tools.clone())
    }

    async fn call_tool(&self, tool: &str, args: Value) -> Result<String, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        let call_index = self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            Behavior::Echo => Ok(format!("{}:{}", tool, args)),
            Behavior::Calc => {
                let a = args.get("a").and_then(Value::as_i64);
                let b = args.get("b").and_then(Value::as_i64);
                match (a, b) {
                    (Some(a), Some(b)) => Ok((a + b).to_string()),
                    _ => Err(TransportError::Call("expected numeric a and b".to_string())),
                }
            }
            Behavior::AlwaysFail(reason) => Err(TransportError::Call(reason.clone())),
            Behavior::FailThenOk { failures, output } => {
                if call_index < *failures {
                    Err(TransportError::Call("transient failure".to_string()))
                } else {
                    Ok(output.clone())
                }
            }
            Behavior::ClosedOnCall => Err(TransportError::Closed),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out pre-built transports by server name.
pub(crate) struct MockFactory {
    transports: Mutex<HashMap<String, Arc<dyn ToolTransport>>>,
}

impl MockFactory {
    pub fn single(server: &str, transport: Arc<dyn ToolTransport>) -> Arc<Self> {
        let mut map: HashMap<String, Arc<dyn ToolTransport>> = HashMap::new();
        map.insert(server.to_string(), transport);
        Arc::new(Self {
            transports: Mutex::new(map),
        })
    }

    pub fn with(entries: Vec<(&str, Arc<dyn ToolTransport>)>) -> Arc<Self> {
        let map = entries
            .into_iter()
            .map(|(name, t)| (name.to_string(), t))
            .collect();
        Arc::new(Self {
            transports: Mutex::new(map),
        })
    }
}

#[async_trait]
impl TransportFactory for MockFactory {
    async fn connect(
        &self,
        server: &str,
        _config: &ServerConfig,
    ) -> Result<Arc<dyn ToolTransport>, TransportError> {
        self.transports
            .lock()
            .expect("mock factory lock")
            .get(server)
            .cloned()
            .ok_or_else(|| TransportError::Call(format!("no mock transport for '{}'", server)))
    }
}

/// A factory whose every connect attempt fails.
pub(crate) fn failing_factory(reason: &str) -> Arc<dyn TransportFactory> {
    struct FailingFactory(String);

    #[async_trait]
    impl TransportFactory for FailingFactory {
        async fn connect(
            &self,
            _server: &str,
            _config: &ServerConfig,
        ) -> Result<Arc<dyn ToolTransport>, TransportError> {
            Err(TransportError::Call(self.0.clone()))
        }
    }

    Arc::new(FailingFactory(reason.to_string()))
}
