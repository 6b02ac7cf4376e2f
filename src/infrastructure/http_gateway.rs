use crate::config::GatewayConfig;
use crate::domain::ports::PaymentGateway;
use crate::domain::session::{SessionId, SessionRequest};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct CreateSessionBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: String,
}

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    id: String,
}

/// Gateway client speaking the hosted-checkout "create order" API.
///
/// Authenticates with HTTP basic auth (`key_id:secret`). Connection failures,
/// timeouts and 5xx answers are reported as `GatewayUnreachable` so the intent
/// builder can retry them; any other non-success status is final.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    secret: String,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| PaymentError::InternalError(Box::new(e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            secret: config.secret.expose().to_string(),
        })
    }

    fn sessions_url(&self) -> String {
        format!("{}/orders", self.base_url)
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn open_session(&self, request: &SessionRequest) -> Result<SessionId> {
        let body = CreateSessionBody {
            amount: request.amount.minor_units(),
            currency: request.currency.code(),
            receipt: request.receipt.to_string(),
        };

        let response = self
            .client
            .post(self.sessions_url())
            .basic_auth(&self.key_id, Some(&self.secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::GatewayUnreachable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(PaymentError::GatewayUnreachable(format!(
                "gateway answered {}",
                status
            )));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PaymentError::Gateway(format!(
                "create session rejected with {}: {}",
                status, detail
            )));
        }

        let created: CreateSessionResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Gateway(format!("malformed session response: {}", e)))?;

        tracing::debug!(session_id = %created.id, receipt = %request.receipt, "Gateway session created");
        Ok(SessionId::new(created.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewaySecret;
    use crate::domain::intent::IntentId;
    use crate::domain::money::{Amount, Currency};

    fn config(base_url: &str) -> GatewayConfig {
        GatewayConfig {
            base_url: base_url.to_string(),
            key_id: "rzp_test_key".to_string(),
            secret: GatewaySecret::new("secret"),
            request_timeout_secs: 1,
            ..GatewayConfig::default()
        }
    }

    #[test]
    fn test_sessions_url_trims_trailing_slash() {
        let gateway = HttpGateway::new(&config("https://api.example.test/v1/")).unwrap();
        assert_eq!(gateway.sessions_url(), "https://api.example.test/v1/orders");
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_retryable() {
        // Port 9 (discard) on localhost refuses connections.
        let gateway = HttpGateway::new(&config("http://127.0.0.1:9")).unwrap();
        let request = SessionRequest {
            amount: Amount::new(49900).unwrap(),
            currency: Currency::inr(),
            receipt: IntentId::generate(),
        };

        let result = gateway.open_session(&request).await;
        assert!(matches!(result, Err(PaymentError::GatewayUnreachable(_))));
    }
}
