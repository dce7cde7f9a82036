//! Best-effort domain event publishing over NATS.

use tracing::{debug, warn};

use crate::domain::events::DomainEvent;

#[derive(Clone)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: async_nats::Client) -> Self { Self { nats: Some(nats) } }

    /// Publisher that drops every event.
    pub fn noop() -> Self { Self { nats: None } }

    pub async fn connect(url: &str) -> Self {
        match async_nats::connect(url).await {
            Ok(client) => Self::new(client),
            Err(e) => {
                warn!(error = %e, "failed to connect to NATS, continuing without event publishing");
                Self::noop()
            }
        }
    }

    /// Publishing failures are logged, never returned.
    pub async fn publish(&self, event: DomainEvent) {
        let Some(client) = &self.nats else {
            debug!(subject = event.subject(), "no NATS client, event dropped");
            return;
        };
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, subject = event.subject(), "failed to encode event");
                return;
            }
        };
        if let Err(e) = client.publish(event.subject().to_string(), payload.into()).await {
            warn!(error = %e, subject = event.subject(), "failed to publish event");
        }
    }

    pub async fn publish_all(&self, events: impl IntoIterator<Item = DomainEvent>) {
        for event in events {
            self.publish(event).await;
        }
    }
}
