//! The seam between the request gateway and whoever owns the session.

use async_trait::async_trait;

/// Source of the bearer token and sink for authentication rejections.
///
/// The client never writes session state. It reads the token before each
/// request and reports a 401 through [`SessionHandle::unauthorized_response`],
/// leaving the owner to decide what a rejection means.
#[async_trait]
pub trait SessionHandle: Send + Sync {
    /// Current bearer token, if any.
    async fn bearer_token(&self) -> Option<String>;

    /// Called once per rejected response, before the error reaches the caller.
    async fn unauthorized_response(&self);
}

/// A fixed token with no lifecycle behind it.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl SessionHandle for StaticToken {
    async fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone())
    }

    async fn unauthorized_response(&self) {
        tracing::debug!("Static token rejected by server");
    }
}
