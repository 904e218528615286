//! Domain event publisher.
//!
//! Events go to NATS when a client is configured. Delivery is best effort:
//! a failed publish is logged and never fails the request that caused it.

use crate::domain::events::DomainEvent;

#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    /// Publisher that drops every event.
    pub fn disabled() -> Self { Self::default() }

    pub fn is_enabled(&self) -> bool { self.nats.is_some() }

    pub async fn publish(&self, event: impl Into<DomainEvent>) {
        let event = event.into();
        let Some(client) = &self.nats else {
            tracing::trace!(subject = %event.subject(), "event bus disabled, dropping event");
            return;
        };
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(subject = %event.subject(), error = %e, "failed to encode event");
                return;
            }
        };
        if let Err(e) = client.publish(event.subject(), payload.into()).await {
            tracing::warn!(subject = %event.subject(), error = %e, "failed to publish event");
        }
    }
}

impl std::fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPublisher").field("enabled", &self.is_enabled()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::UserEvent;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_disabled_publisher_is_silent() {
        let publisher = EventPublisher::disabled();
        assert!(!publisher.is_enabled());
        publisher.publish(UserEvent::Unsuspended { user_id: Uuid::nil() }).await;
    }
}
