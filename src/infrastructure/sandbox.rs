use crate::domain::payment::{IntentStatus, NewPaymentIntent, PaymentIntent};
use crate::domain::ports::PaymentGateway;
use crate::error::{MarketplaceError, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-process stand-in for the payment processor. Intents live in memory
/// and only change status through [`SandboxGateway::settle`].
#[derive(Clone, Default)]
pub struct SandboxGateway {
    intents: Arc<RwLock<HashMap<String, PaymentIntent>>>,
    unavailable: Arc<AtomicBool>,
}

impl SandboxGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a processor outage: every call fails while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MarketplaceError::PaymentProviderError(
                "payment processor unavailable".to_string(),
            ));
        }
        Ok(())
    }

    /// Moves an intent to `status`, as if the customer had completed (or
    /// abandoned) checkout.
    pub async fn settle(&self, intent_id: &str, status: IntentStatus) -> Result<PaymentIntent> {
        let mut intents = self.intents.write().await;
        let intent = intents
            .get_mut(intent_id)
            .ok_or_else(|| unknown_intent(intent_id))?;
        intent.status = status;
        Ok(intent.clone())
    }

    pub async fn intent_count(&self) -> usize {
        self.intents.read().await.len()
    }

    /// Renders the webhook body the processor would send for `intent_id`.
    pub async fn event_payload(&self, kind: &str, intent_id: &str, created: i64) -> Result<Vec<u8>> {
        let intent = self.retrieve_intent(intent_id).await?;
        let event = json!({
            "id": format!("evt_{}", Uuid::new_v4().simple()),
            "object": "event",
            "type": kind,
            "created": created,
            "data": { "object": intent },
        });
        Ok(serde_json::to_vec(&event)?)
    }
}

fn unknown_intent(intent_id: &str) -> MarketplaceError {
    MarketplaceError::ValidationError(format!("No such payment intent: {intent_id}"))
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn create_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent> {
        self.ensure_available()?;
        if intent.amount <= 0 {
            return Err(MarketplaceError::PaymentProviderError(
                "Amount must be at least 1 minor unit".to_string(),
            ));
        }
        let id = format!("pi_{}", Uuid::new_v4().simple());
        let created = PaymentIntent {
            client_secret: Some(format!("{id}_secret_{}", Uuid::new_v4().simple())),
            id: id.clone(),
            amount: intent.amount,
            currency: intent.currency,
            status: IntentStatus::RequiresPaymentMethod,
            metadata: intent.metadata,
            created: Utc::now().timestamp(),
        };
        self.intents.write().await.insert(id, created.clone());
        Ok(created)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent> {
        self.ensure_available()?;
        self.intents
            .read()
            .await
            .get(intent_id)
            .cloned()
            .ok_or_else(|| unknown_intent(intent_id))
    }
}
