use std::{
    collections::HashMap,
    str::FromStr,
    sync::{Arc, Mutex},
    time::Duration,
};

use log::*;
use sf_common::Secret;
use uuid::Uuid;

use super::{CaptureInfo, GatewayError, PaymentGateway, PaymentRequest, PaymentResult};
use crate::db_types::{Money, OrderNumber};

/// How the [`SimulatedGateway`] answers the next payment request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SimulatedOutcome {
    #[default]
    Approve,
    Decline,
    /// The payment is captured, but the answer never arrives.
    Timeout,
}

impl FromStr for SimulatedOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(Self::Approve),
            "decline" => Ok(Self::Decline),
            "timeout" => Ok(Self::Timeout),
            other => Err(format!("'{other}' is not a simulated payment outcome. Use approve, decline or timeout")),
        }
    }
}

/// An in-process stand-in for a card gateway.
///
/// Captured payments are remembered so that [`PaymentGateway::verify`] gives consistent answers, including for
/// payments whose response was lost to a timeout.
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    outcome: Arc<Mutex<SimulatedOutcome>>,
    captures: Arc<Mutex<HashMap<String, CaptureInfo>>>,
    api_key: Secret<String>,
    hang_for: Duration,
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new(SimulatedOutcome::Approve)
    }
}

impl SimulatedGateway {
    pub fn new(outcome: SimulatedOutcome) -> Self {
        Self {
            outcome: Arc::new(Mutex::new(outcome)),
            captures: Arc::new(Mutex::new(HashMap::new())),
            api_key: Secret::default(),
            hang_for: Duration::from_secs(3600),
        }
    }

    pub fn with_api_key(mut self, api_key: Secret<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// How long a request hangs in [`SimulatedOutcome::Timeout`] mode.
    pub fn with_hang_time(mut self, hang_for: Duration) -> Self {
        self.hang_for = hang_for;
        self
    }

    /// Changes the outcome of future requests. All clones see the change.
    pub fn set_outcome(&self, outcome: SimulatedOutcome) {
        match self.outcome.lock() {
            Ok(mut o) => *o = outcome,
            Err(e) => error!("💳️ Simulated gateway state is poisoned. {e}"),
        }
    }

    pub fn outcome(&self) -> SimulatedOutcome {
        self.outcome.lock().map(|o| *o).unwrap_or_default()
    }

    /// The transaction id captured for `order_reference`, if any.
    pub fn transaction_for(&self, order_reference: &OrderNumber) -> Option<String> {
        let captures = self.captures.lock().ok()?;
        captures.iter().find(|(_, c)| &c.order_reference == order_reference).map(|(txid, _)| txid.clone())
    }

    pub fn captured_total(&self) -> Money {
        self.captures.lock().map(|c| c.values().map(|c| c.amount).sum()).unwrap_or_default()
    }

    fn capture(&self, request: &PaymentRequest) -> Result<String, GatewayError> {
        let txid = format!("SIM-{}", Uuid::new_v4().simple());
        let mut captures = self.captures.lock().map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        let capture = CaptureInfo {
            transaction_id: txid.clone(),
            order_reference: request.order_reference.clone(),
            amount: request.amount,
        };
        captures.insert(txid.clone(), capture);
        Ok(txid)
    }
}

impl PaymentGateway for SimulatedGateway {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn process(&self, request: PaymentRequest) -> Result<PaymentResult, GatewayError> {
        if request.amount.value() <= 0 {
            return Err(GatewayError::InvalidRequest(format!("Cannot charge {}", request.amount)));
        }
        trace!("💳️ Simulated gateway (key {}) processing {} for {}", self.api_key, request.amount, request.order_reference);
        match self.outcome() {
            SimulatedOutcome::Approve => {
                let txid = self.capture(&request)?;
                debug!("💳️ Simulated gateway approved {} as {txid}", request.order_reference);
                Ok(PaymentResult::approved(txid))
            },
            SimulatedOutcome::Decline => {
                debug!("💳️ Simulated gateway declined {}", request.order_reference);
                Ok(PaymentResult::declined("Card declined by issuer"))
            },
            SimulatedOutcome::Timeout => {
                let txid = self.capture(&request)?;
                debug!("💳️ Simulated gateway captured {} as {txid} but is not answering", request.order_reference);
                tokio::time::sleep(self.hang_for).await;
                Ok(PaymentResult::approved(txid))
            },
        }
    }

    async fn verify(&self, transaction_id: &str) -> Result<Option<CaptureInfo>, GatewayError> {
        let captures = self.captures.lock().map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        Ok(captures.get(transaction_id).cloned())
    }

    async fn find_capture(&self, order_reference: &OrderNumber) -> Result<Option<CaptureInfo>, GatewayError> {
        let captures = self.captures.lock().map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        Ok(captures.values().find(|c| &c.order_reference == order_reference).cloned())
    }
}
