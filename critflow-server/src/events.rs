// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Event publication.
//!
//! Publication is fire-and-forget and at-most-once: it happens after the
//! store transaction commits, is never awaited by the caller's success path,
//! and a publish failure only logs. The shipped bus is an in-process
//! broadcast channel carrying routing-keyed JSON messages; an external relay
//! (e.g. an AMQP bridge) subscribes and forwards without producers changing.

use chrono::Utc;
use tokio::sync::broadcast;
use uuid::Uuid;

use critflow_core::{
    DependencyEvent, RecalcRequest, EXCHANGE_DEPENDENCIES, EXCHANGE_SYSTEM,
    ROUTING_KEY_RECALCULATE,
};

/// One message on the bus.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub exchange: &'static str,
    pub routing_key: String,
    pub payload: serde_json::Value,
}

/// Seam for the pub/sub fabric.
pub trait EventBus: Send + Sync {
    fn publish(&self, message: BusMessage);
}

/// In-process broadcast bus.
pub struct BroadcastBus {
    sender: broadcast::Sender<BusMessage>,
}

impl BroadcastBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.sender.subscribe()
    }
}

impl EventBus for BroadcastBus {
    fn publish(&self, message: BusMessage) {
        tracing::debug!(
            exchange = message.exchange,
            routing_key = %message.routing_key,
            "publishing event"
        );
        // No subscribers is fine; the bus is best-effort.
        let _ = self.sender.send(message);
    }
}

/// Bus that drops everything, for tests.
pub struct NullBus;

impl EventBus for NullBus {
    fn publish(&self, _message: BusMessage) {}
}

/// Publish a `dependency.{created,updated,deleted}` mutation event.
pub fn publish_dependency_event(bus: &dyn EventBus, event: &DependencyEvent) {
    match serde_json::to_value(event) {
        Ok(payload) => bus.publish(BusMessage {
            exchange: EXCHANGE_DEPENDENCIES,
            routing_key: event.routing_key().to_string(),
            payload,
        }),
        Err(e) => tracing::error!("failed to serialise dependency event: {}", e),
    }
}

/// Publish a recalc request for the tenant.
pub fn publish_recalc(bus: &dyn EventBus, tenant_id: Uuid) {
    let request = RecalcRequest {
        tenant_id,
        requested_at: Utc::now(),
    };
    match serde_json::to_value(&request) {
        Ok(payload) => bus.publish(BusMessage {
            exchange: EXCHANGE_SYSTEM,
            routing_key: ROUTING_KEY_RECALCULATE.to_string(),
            payload,
        }),
        Err(e) => tracing::error!("failed to serialise recalc request: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use critflow_core::{DependencyEdge, DependencyEventKind, DependencyType};

    fn edge() -> DependencyEdge {
        let now = Utc::now();
        DependencyEdge {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            from_id: Uuid::new_v4(),
            to_id: Uuid::new_v4(),
            dependency_type: DependencyType::FinishToStart,
            lag_days: 0,
            created_at: now,
            created_by: Uuid::new_v4(),
            updated_at: now,
            metadata: serde_json::json!({}),
        }
    }

    #[test]
    fn test_mutation_event_routing() {
        let bus = BroadcastBus::new(8);
        let mut receiver = bus.subscribe();

        let edge = edge();
        let event = DependencyEvent::created(&edge, edge.created_by, Utc::now());
        publish_dependency_event(&bus, &event);

        let message = receiver.try_recv().unwrap();
        assert_eq!(message.exchange, EXCHANGE_DEPENDENCIES);
        assert_eq!(message.routing_key, "dependency.created");
        assert_eq!(
            message.payload["kind"],
            serde_json::to_value(DependencyEventKind::Created).unwrap()
        );
    }

    #[test]
    fn test_recalc_routing() {
        let bus = BroadcastBus::new(8);
        let mut receiver = bus.subscribe();

        let tenant = Uuid::new_v4();
        publish_recalc(&bus, tenant);

        let message = receiver.try_recv().unwrap();
        assert_eq!(message.exchange, EXCHANGE_SYSTEM);
        assert_eq!(message.routing_key, ROUTING_KEY_RECALCULATE);
        assert_eq!(message.payload["tenant_id"], serde_json::json!(tenant));
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = BroadcastBus::new(8);
        publish_recalc(&bus, Uuid::new_v4());
    }
}
