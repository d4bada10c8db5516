//! Order notifications.
//!
//! Invoice generation and confirmation email delivery are handled by a
//! separate worker; this module only publishes the triggering events. Delivery
//! problems are logged and swallowed so they can never fail the order that
//! raised them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::model::Order;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderNotification {
    OrderConfirmation {
        order_uuid: Uuid,
        user_uuid: Uuid,
        total: Decimal,
        placed_at: DateTime<Utc>,
    },
    InvoiceRequested {
        order_uuid: Uuid,
        user_uuid: Uuid,
        total: Decimal,
    },
}

impl OrderNotification {
    pub fn confirmation(order: &Order) -> Self {
        Self::OrderConfirmation {
            order_uuid: order.order_uuid,
            user_uuid: order.user_uuid,
            total: order.total,
            placed_at: order.created_at,
        }
    }

    pub fn invoice(order: &Order) -> Self {
        Self::InvoiceRequested {
            order_uuid: order.order_uuid,
            user_uuid: order.user_uuid,
            total: order.total,
        }
    }

    fn subject_suffix(&self) -> &'static str {
        match self {
            Self::OrderConfirmation { .. } => "confirmation",
            Self::InvoiceRequested { .. } => "invoice",
        }
    }
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, notification: OrderNotification);
}

/// Publishes notifications as JSON events on NATS subjects
/// `orders.confirmation` / `orders.invoice`.
pub struct NatsNotifier {
    client: async_nats::Client,
}

impl NatsNotifier {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Notifier for NatsNotifier {
    async fn publish(&self, notification: OrderNotification) {
        let subject = format!("orders.{}", notification.subject_suffix());
        let payload = match serde_json::to_vec(&notification) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize notification");
                return;
            }
        };
        if let Err(e) = self.client.publish(subject.clone(), payload.into()).await {
            tracing::warn!(subject, error = %e, "notification publish failed");
        }
    }
}

/// Used when no NATS endpoint is configured, and by tests.
pub struct NoopNotifier;

#[async_trait::async_trait]
impl Notifier for NoopNotifier {
    async fn publish(&self, notification: OrderNotification) {
        tracing::debug!(?notification, "notification dropped (no transport configured)");
    }
}
