//! Event dispatch.
//!
//! The gateway hands every inbound frame to a [`Dispatch`] implementation,
//! keyed by its raw wire type. [`Dispatcher`] is the stock implementation: it
//! normalizes the wire type through the event table, parses the payload into
//! an [`Event`], and runs the one handler registered for that key.
//!
//! Dispatch is awaited inline by the receive loop, so a slow handler holds up
//! every frame behind it. Handlers that need to do long work should spawn it.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::RwLock;
use scatter_proto::{handler_key, parse_event, Event};
use serde_json::Value;
use tracing::debug;

use crate::error::ScatterError;

/// Boxed future returned by dispatch callbacks.
pub type DispatchFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ScatterError>> + Send + 'a>>;

/// Receiver of inbound gateway frames.
pub trait Dispatch: Send + Sync {
    /// Handle one frame. `event` is the raw wire type; `payload` is the full
    /// frame.
    fn dispatch<'a>(&'a self, event: &'a str, payload: Value) -> DispatchFuture<'a>;
}

impl<F, Fut> Dispatch for F
where
    F: Fn(String, Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ScatterError>> + Send + 'static,
{
    fn dispatch<'a>(&'a self, event: &'a str, payload: Value) -> DispatchFuture<'a> {
        Box::pin(self(event.to_owned(), payload))
    }
}

type Handler = Arc<dyn Fn(Event) -> DispatchFuture<'static> + Send + Sync>;

/// Routes events to handlers registered by normalized key
/// (`message`, `member_join`, `ready`, ...).
#[derive(Default)]
pub struct Dispatcher {
    handlers: RwLock<HashMap<String, Handler>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<String> = self.handlers.read().keys().cloned().collect();
        keys.sort_unstable();
        f.debug_struct("Dispatcher").field("handlers", &keys).finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for a key, replacing any previous one.
    pub fn on<F, Fut>(&self, key: impl Into<String>, handler: F)
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ScatterError>> + Send + 'static,
    {
        let key = key.into();
        let handler: Handler =
            Arc::new(move |event: Event| -> DispatchFuture<'static> { Box::pin(handler(event)) });
        if self.handlers.write().insert(key.clone(), handler).is_some() {
            debug!(key, "replaced event handler");
        }
    }

    /// Remove the handler for a key. Returns `false` if none was registered.
    pub fn remove(&self, key: &str) -> bool {
        self.handlers.write().remove(key).is_some()
    }

    /// Whether a handler is registered for a key.
    #[must_use]
    pub fn has_handler(&self, key: &str) -> bool {
        self.handlers.read().contains_key(key)
    }
}

impl Dispatch for Dispatcher {
    fn dispatch<'a>(&'a self, event: &'a str, payload: Value) -> DispatchFuture<'a> {
        let key = handler_key(event);
        let handler = self.handlers.read().get(key).cloned();

        Box::pin(async move {
            let Some(handler) = handler else {
                debug!(event, key, "no handler registered");
                return Ok(());
            };
            handler(parse_event(event, payload)).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_dispatch_normalizes_and_parses() {
        let dispatcher = Dispatcher::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatcher.on("message", move |event| {
            let tx = tx.clone();
            async move {
                tx.send(event)
                    .map_err(|e| ScatterError::Dispatch(e.to_string()))
            }
        });

        dispatcher
            .dispatch(
                "new_message",
                json!({
                    "type": "new_message",
                    "id": "m1",
                    "content": "hi",
                    "author": {"id": "u1"}
                }),
            )
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.as_message().map(|m| m.content.as_str()), Some("hi"));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_event_uses_raw_name() {
        let dispatcher = Dispatcher::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatcher.on("thread_created", move |event| {
            let tx = tx.clone();
            async move {
                tx.send(event)
                    .map_err(|e| ScatterError::Dispatch(e.to_string()))
            }
        });

        let payload = json!({"type": "thread_created", "id": "t1"});
        dispatcher.dispatch("thread_created", payload.clone()).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), Event::Raw(payload));
    }

    #[tokio::test]
    async fn test_dispatch_without_handler_is_ok() {
        let dispatcher = Dispatcher::new();
        let result = dispatcher.dispatch("typing", json!({"type": "typing"})).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_handler_error_is_returned() {
        let dispatcher = Dispatcher::new();
        dispatcher.on("error", |_| async { Err(ScatterError::Dispatch("nope".into())) });

        let result = dispatcher
            .dispatch("error", json!({"type": "error", "message": "rate limited"}))
            .await;
        assert!(matches!(result, Err(ScatterError::Dispatch(_))));
    }

    #[test]
    fn test_on_replaces_and_remove() {
        let dispatcher = Dispatcher::new();
        dispatcher.on("ready", |_| async { Ok(()) });
        dispatcher.on("ready", |_| async { Ok(()) });
        assert!(dispatcher.has_handler("ready"));
        assert!(format!("{dispatcher:?}").contains("ready"));

        assert!(dispatcher.remove("ready"));
        assert!(!dispatcher.remove("ready"));
        assert!(!dispatcher.has_handler("ready"));
    }

    #[tokio::test]
    async fn test_closure_dispatch() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatch = move |event: String, payload: Value| {
            let tx = tx.clone();
            async move {
                tx.send((event, payload))
                    .map_err(|e| ScatterError::Dispatch(e.to_string()))
            }
        };

        dispatch.dispatch("auth_ok", json!({"user_id": "u1"})).await.unwrap();
        let (event, payload) = rx.recv().await.unwrap();
        assert_eq!(event, "auth_ok");
        assert_eq!(payload["user_id"], "u1");
    }
}
