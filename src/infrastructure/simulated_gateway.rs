use crate::application::verifier::compute_signature;
use crate::config::GatewaySecret;
use crate::domain::ports::{GatewayEvent, PaymentGateway, PaymentSheet};
use crate::domain::session::{
    GatewayPaymentId, GatewaySession, SessionId, SessionRequest, Signature, VerificationClaim,
};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, oneshot};
use uuid::Uuid;

/// How long an untouched payment sheet is kept before it is discarded.
pub const DEFAULT_SHEET_TTL: Duration = Duration::from_secs(900);

struct Sheet {
    tx: Option<oneshot::Sender<GatewayEvent>>,
    rx: Option<oneshot::Receiver<GatewayEvent>>,
    opened_at: Instant,
}

impl Sheet {
    fn is_spent(&self) -> bool {
        self.tx.is_none() && self.rx.is_none()
    }
}

/// An in-process gateway that issues sessions and signs callbacks with the
/// merchant secret, the way the hosted gateway does.
///
/// Each session gets a one-shot payment sheet: the buyer side is driven with
/// [`SimulatedGateway::pay`], [`SimulatedGateway::dismiss`] or
/// [`SimulatedGateway::decline`], and [`PaymentSheet::await_callback`] yields
/// the resulting event exactly once. A sheet is dropped as soon as both
/// sides have been used, and sheets nobody touched within the TTL are
/// discarded when the next session opens.
pub struct SimulatedGateway {
    secret: GatewaySecret,
    sheets: Mutex<HashMap<SessionId, Sheet>>,
    sheet_ttl: Duration,
    unreachable_budget: AtomicU32,
    sessions_opened: AtomicU32,
}

fn short_id(prefix: &str) -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &simple[..14])
}

impl SimulatedGateway {
    pub fn new(secret: GatewaySecret) -> Self {
        Self::with_sheet_ttl(secret, DEFAULT_SHEET_TTL)
    }

    pub fn with_sheet_ttl(secret: GatewaySecret, sheet_ttl: Duration) -> Self {
        Self {
            secret,
            sheets: Mutex::new(HashMap::new()),
            sheet_ttl,
            unreachable_budget: AtomicU32::new(0),
            sessions_opened: AtomicU32::new(0),
        }
    }

    /// Makes the next `count` session requests fail with `GatewayUnreachable`.
    pub fn fail_next_opens(&self, count: u32) {
        self.unreachable_budget.store(count, Ordering::SeqCst);
    }

    /// Number of sessions successfully issued so far.
    pub fn sessions_opened(&self) -> u32 {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    /// Number of payment sheets still held in memory.
    pub async fn pending_sheets(&self) -> usize {
        self.sheets.lock().await.len()
    }

    /// Produces a correctly signed claim for a payment on `session_id`.
    pub fn signed_claim(&self, session_id: &SessionId) -> VerificationClaim {
        let payment_id = GatewayPaymentId::new(short_id("pay"));
        let signature = compute_signature(self.secret.expose().as_bytes(), session_id, &payment_id);
        VerificationClaim::new(session_id.clone(), payment_id, Signature::new(signature))
    }

    /// Buyer completes the payment; the signed claim is delivered and returned.
    pub async fn pay(&self, session_id: &SessionId) -> Result<VerificationClaim> {
        let claim = self.signed_claim(session_id);
        self.deliver(session_id, GatewayEvent::Paid(claim.clone()))
            .await?;
        Ok(claim)
    }

    /// Delivers an arbitrary (possibly forged) claim through the sheet.
    pub async fn deliver_claim(&self, claim: VerificationClaim) -> Result<()> {
        let session_id = claim.session_id.clone();
        self.deliver(&session_id, GatewayEvent::Paid(claim)).await
    }

    /// Buyer closes the payment sheet.
    pub async fn dismiss(&self, session_id: &SessionId) -> Result<()> {
        self.deliver(session_id, GatewayEvent::Dismissed).await
    }

    /// The gateway reports a failed payment attempt.
    pub async fn decline(&self, session_id: &SessionId, description: &str) -> Result<()> {
        self.deliver(
            session_id,
            GatewayEvent::Failed {
                description: description.to_string(),
            },
        )
        .await
    }

    async fn deliver(&self, session_id: &SessionId, event: GatewayEvent) -> Result<()> {
        let mut sheets = self.sheets.lock().await;
        let tx = sheets
            .get_mut(session_id)
            .and_then(|sheet| sheet.tx.take())
            .ok_or_else(|| {
                PaymentError::Gateway(format!("no open payment sheet for session {}", session_id))
            })?;
        release_if_spent(&mut sheets, session_id);
        // The receiver may already be gone if nobody waits on the sheet.
        let _ = tx.send(event);
        Ok(())
    }
}

fn release_if_spent(sheets: &mut HashMap<SessionId, Sheet>, session_id: &SessionId) {
    if sheets.get(session_id).is_some_and(Sheet::is_spent) {
        sheets.remove(session_id);
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn open_session(&self, request: &SessionRequest) -> Result<SessionId> {
        let budget = self.unreachable_budget.load(Ordering::SeqCst);
        if budget > 0 {
            self.unreachable_budget.store(budget - 1, Ordering::SeqCst);
            return Err(PaymentError::GatewayUnreachable(
                "simulated network failure".to_string(),
            ));
        }

        let session_id = SessionId::new(short_id("order"));
        let (tx, rx) = oneshot::channel();
        {
            let mut sheets = self.sheets.lock().await;
            let ttl = self.sheet_ttl;
            sheets.retain(|_, sheet| sheet.opened_at.elapsed() < ttl);
            sheets.insert(
                session_id.clone(),
                Sheet {
                    tx: Some(tx),
                    rx: Some(rx),
                    opened_at: Instant::now(),
                },
            );
        }
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(
            session_id = %session_id,
            receipt = %request.receipt,
            amount = request.amount.minor_units(),
            "Simulated gateway session opened"
        );
        Ok(session_id)
    }
}

#[async_trait]
impl PaymentSheet for SimulatedGateway {
    async fn await_callback(&self, session: &GatewaySession) -> Result<GatewayEvent> {
        let rx = {
            let mut sheets = self.sheets.lock().await;
            let rx = sheets
                .get_mut(&session.session_id)
                .and_then(|sheet| sheet.rx.take())
                .ok_or_else(|| {
                    PaymentError::Gateway(format!(
                        "payment sheet for session {} is not awaitable",
                        session.session_id
                    ))
                })?;
            release_if_spent(&mut sheets, &session.session_id);
            rx
        };

        rx.await.map_err(|_| {
            PaymentError::Gateway("payment sheet closed without an event".to_string())
        })
    }
}
