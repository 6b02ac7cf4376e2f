//! Buyer identity supplied by the upstream auth collaborator.
//!
//! The bearer credential is required but not inspected; the buyer id in
//! `X-Buyer-Id` is trusted as already authenticated upstream.

use super::error::ApiError;
use crate::domain::intent::BuyerId;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

pub const BUYER_ID_HEADER: &str = "x-buyer-id";

/// Extractor for routes that act on behalf of a buyer.
#[derive(Debug, Clone)]
pub struct AuthenticatedBuyer(pub BuyerId);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedBuyer
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());
        if bearer.is_none() {
            return Err(ApiError::Unauthorized("missing bearer credential".to_string()));
        }

        let buyer = parts
            .headers
            .get(BUYER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing buyer id".to_string()))?;

        BuyerId::new(buyer)
            .map(AuthenticatedBuyer)
            .map_err(|_| ApiError::Unauthorized("missing buyer id".to_string()))
    }
}

impl AuthenticatedBuyer {
    /// Resolves the `buyerId` query parameter against the caller.
    ///
    /// Absent means "me"; naming another buyer is refused.
    pub fn scope(&self, requested: Option<&str>) -> Result<BuyerId, ApiError> {
        match requested {
            None => Ok(self.0.clone()),
            Some(id) if id == self.0.as_str() => Ok(self.0.clone()),
            Some(_) => Err(ApiError::Forbidden(
                "orders of another buyer are not visible".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<AuthenticatedBuyer, ApiError> {
        let (mut parts, _) = request.into_parts();
        AuthenticatedBuyer::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_bearer_and_buyer_header_required() {
        let ok = Request::builder()
            .header(AUTHORIZATION, "Bearer token-1")
            .header(BUYER_ID_HEADER, "buyer-1")
            .body(())
            .unwrap();
        assert_eq!(extract(ok).await.unwrap().0.as_str(), "buyer-1");

        let no_token = Request::builder()
            .header(BUYER_ID_HEADER, "buyer-1")
            .body(())
            .unwrap();
        assert!(matches!(extract(no_token).await, Err(ApiError::Unauthorized(_))));

        let no_buyer = Request::builder()
            .header(AUTHORIZATION, "Bearer token-1")
            .body(())
            .unwrap();
        assert!(matches!(extract(no_buyer).await, Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_scope_refuses_other_buyers() {
        let caller = AuthenticatedBuyer(BuyerId::new("buyer-1").unwrap());
        assert_eq!(caller.scope(None).unwrap().as_str(), "buyer-1");
        assert_eq!(caller.scope(Some("buyer-1")).unwrap().as_str(), "buyer-1");
        assert!(matches!(caller.scope(Some("buyer-2")), Err(ApiError::Forbidden(_))));
    }
}
