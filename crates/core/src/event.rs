//! Domain event system: decoupled observation of agent runs.
//!
//! The orchestrator publishes an event whenever it calls the model, runs a
//! tool, or rewrites a search query. Observers subscribe without coupling to
//! the run itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// The completion service was invoked
    LlmCalled {
        agent: String,
        model: String,
        /// 1-based index of this call within the run
        call_index: u32,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed
    ToolExecuted {
        tool_name: String,
        output_chars: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A search query was rewritten by the temporal enhancer
    QueryEnhanced {
        original: String,
        enhanced: String,
        timestamp: DateTime<Utc>,
    },

    /// A run ended, either by budget or because the model stopped calling tools
    RunFinished {
        agent: String,
        llm_calls: u32,
        tool_calls: u32,
        budget_exhausted: bool,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::QueryEnhanced {
            original: "news today".into(),
            enhanced: "news 2026-03-01".into(),
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::QueryEnhanced { original, enhanced, .. } => {
                assert_eq!(original, "news today");
                assert!(enhanced.contains("2026-03-01"));
            }
            _ => panic!("Expected QueryEnhanced event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(DomainEvent::RunFinished {
            agent: "test".into(),
            llm_calls: 1,
            tool_calls: 0,
            budget_exhausted: false,
            timestamp: Utc::now(),
        });
    }
}
