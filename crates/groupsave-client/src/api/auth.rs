//! Sign-in, registration and account recovery.
//!
//! These endpoints are unauthenticated but still go through the gateway, so
//! a stale token is attached if one is held and a 401 is reported as usual.

use crate::client::GroupSaveClient;
use crate::error::Result;
use crate::types::{
    LoginRequest, LoginResponse, MessageResponse, OtpRequest, RegisterRequest,
    ResetPasswordRequest,
};

/// Auth API client.
pub struct AuthApi {
    client: GroupSaveClient,
}

impl AuthApi {
    pub(crate) fn new(client: GroupSaveClient) -> Self {
        Self { client }
    }

    /// Exchange credentials for a bearer token.
    ///
    /// This does not store anything; hand the response to the session owner.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.client.post("auth/login", &request).await
    }

    /// Create an account.
    pub async fn register(&self, request: &RegisterRequest) -> Result<MessageResponse> {
        self.client.post("auth/register", request).await
    }

    /// Confirm an email address with the code sent after registration.
    pub async fn verify_email(&self, email: &str, otp: &str) -> Result<MessageResponse> {
        let request = OtpRequest {
            email: email.to_string(),
            otp: otp.to_string(),
        };
        self.client.post("auth/verify-email", &request).await
    }

    /// Request a password reset code.
    pub async fn forgot_password(&self, email: &str) -> Result<MessageResponse> {
        self.client
            .post("auth/forgot-password", &serde_json::json!({ "email": email }))
            .await
    }

    /// Check a password reset code.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<MessageResponse> {
        let request = OtpRequest {
            email: email.to_string(),
            otp: otp.to_string(),
        };
        self.client.post("auth/verify-otp", &request).await
    }

    /// Set a new password using a verified reset code.
    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<MessageResponse> {
        self.client.post("auth/reset-password", request).await
    }
}
