//! HTTP client for the booking backend

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, Response, StatusCode};
use tider_core::{Profile, SessionService};
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};
use crate::types::{
    CreateAppointmentRequest, CreateAppointmentResponse, CreateProfileRequest,
    CreateProfileResponse, LoginRequest, LoginResponse, MessageResponse, ProfileResponse,
    RegisterEmailRequest, ResendVerificationRequest, SlotsResponse,
};

/// Source of the current bearer token.
///
/// Implemented by the session service; mocked in tests.
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Option<String>;
}

impl TokenSource for SessionService {
    fn token(&self) -> Option<String> {
        SessionService::token(self)
    }
}

/// Attaches the current bearer token to outgoing requests.
///
/// Attachment only; the server decides whether the token is acceptable
/// and answers 401 when it is not.
#[derive(Clone)]
pub struct RequestAuthenticator {
    source: Arc<dyn TokenSource>,
}

impl RequestAuthenticator {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self { source }
    }

    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.source.token() {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => builder,
        }
    }
}

/// API client for the booking backend
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    auth: RequestAuthenticator,
}

impl ApiClient {
    pub fn new(base_url: &str, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: Arc::from(base_url.trim_end_matches('/')),
            auth: RequestAuthenticator::new(tokens),
        }
    }

    /// Start email registration; returns the server's message
    #[instrument(skip(self, password))]
    pub async fn register_email(&self, email: &str, password: &str) -> Result<String> {
        let url = format!("{}/auth/register/email", self.base_url);
        let req = RegisterEmailRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let response = self.auth.apply(self.http.post(&url).json(&req)).send().await?;
        let body: MessageResponse = check(response).await?.json().await?;
        Ok(body.message)
    }

    /// Ask the server to resend the verification email
    #[instrument(skip(self))]
    pub async fn resend_verification(&self, email: &str) -> Result<String> {
        let url = format!("{}/auth/resend-verification", self.base_url);
        let req = ResendVerificationRequest {
            email: email.to_string(),
        };

        let response = self.auth.apply(self.http.post(&url).json(&req)).send().await?;
        let body: MessageResponse = check(response).await?.json().await?;
        Ok(body.message)
    }

    /// Redeem an email verification token
    #[instrument(skip(self, token))]
    pub async fn verify_email(&self, token: &str) -> Result<String> {
        let url = format!("{}/auth/verify-email/{}", self.base_url, token);

        let response = self.auth.apply(self.http.get(&url)).send().await?;
        let body: MessageResponse = check(response).await?.json().await?;
        Ok(body.message)
    }

    /// Exchange credentials for a bearer token
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let url = format!("{}/auth/login", self.base_url);
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let response = self.auth.apply(self.http.post(&url).json(&req)).send().await?;
        let body: LoginResponse = check(response).await?.json().await?;
        debug!(success = body.success, "Login response received");
        Ok(body)
    }

    /// Tell the server to end the session
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<String> {
        let url = format!("{}/auth/logout", self.base_url);

        let response = self.auth.apply(self.http.post(&url)).send().await?;
        let body: MessageResponse = check(response).await?.json().await?;
        Ok(body.message)
    }

    /// Create the user's profile
    #[instrument(skip(self, req))]
    pub async fn create_profile(&self, req: &CreateProfileRequest) -> Result<CreateProfileResponse> {
        let url = format!("{}/profile/create-profile", self.base_url);

        let response = self.auth.apply(self.http.post(&url).json(req)).send().await?;
        let body = check(response).await?.json().await?;
        Ok(body)
    }

    /// Fetch the current user's profile
    #[instrument(skip(self))]
    pub async fn fetch_profile(&self) -> Result<Profile> {
        let url = format!("{}/profile/get-profile", self.base_url);

        let response = self.auth.apply(self.http.get(&url)).send().await?;
        let body: ProfileResponse = check(response).await?.json().await?;
        Ok(body.user)
    }

    /// Fetch bookable slots for a calendar date.
    ///
    /// The response is a point-in-time snapshot; it goes stale the
    /// moment another user books or the clock advances.
    #[instrument(skip(self))]
    pub async fn fetch_slots(&self, date: NaiveDate) -> Result<Vec<DateTime<Utc>>> {
        let url = format!("{}/slots/getSlots/{}", self.base_url, date.format("%Y-%m-%d"));

        let response = self.auth.apply(self.http.get(&url)).send().await?;
        let body: SlotsResponse = check(response).await?.json().await?;
        debug!(date = %date, count = body.available_slots.len(), "Slots fetched");
        Ok(body.available_slots)
    }

    /// Submit a booking; returns the server's confirmation id, if any
    #[instrument(skip(self))]
    pub async fn create_appointment(
        &self,
        slot: DateTime<Utc>,
        user_id: &str,
    ) -> Result<Option<String>> {
        let url = format!("{}/appointment/create", self.base_url);
        let req = CreateAppointmentRequest {
            date_time: slot,
            user_id: user_id.to_string(),
        };

        let response = self.auth.apply(self.http.post(&url).json(&req)).send().await?;
        let body: CreateAppointmentResponse = check(response).await?.json().await?;
        if body.confirmation_id.is_none() {
            warn!("Server accepted booking without a confirmation id");
        }
        Ok(body.confirmation_id)
    }
}

/// Map response status to the error taxonomy.
///
/// 401 is a session-authority signal distinct from other rejections;
/// other non-2xx statuses surface the server's message verbatim.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::Unauthorized);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<MessageResponse>(&body)
            .map(|m| m.message)
            .unwrap_or(body);
        return Err(Error::Rejected {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedToken(Option<String>);

    impl TokenSource for FixedToken {
        fn token(&self) -> Option<String> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_authenticator_attaches_bearer_header() {
        let auth = RequestAuthenticator::new(Arc::new(FixedToken(Some("tok-1".to_string()))));
        let client = reqwest::Client::new();

        let request = auth
            .apply(client.get("http://localhost/profile"))
            .build()
            .unwrap();
        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "Bearer tok-1"
        );
    }

    #[tokio::test]
    async fn test_authenticator_skips_header_without_token() {
        let auth = RequestAuthenticator::new(Arc::new(FixedToken(None)));
        let client = reqwest::Client::new();

        let request = auth
            .apply(client.get("http://localhost/profile"))
            .build()
            .unwrap();
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }
}
