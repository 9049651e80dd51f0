//! Account flows
//!
//! Orchestrates registration, login, logout, and profile management
//! against the API and the shared application state.

use std::sync::Arc;

use tider_core::{AppState, Profile};
use tider_net::error as net;
use tider_net::types::{CreateProfileRequest, LoginResponse};
use tracing::{info, warn};

/// Failures surfaced to the caller of an account flow
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Session expired, sign in again")]
    SessionExpired,
    #[error("{0}")]
    Declined(String),
    #[error(transparent)]
    Api(net::Error),
    #[error(transparent)]
    State(#[from] tider_core::Error),
}

/// The slice of the API the account flows need. Mocked in tests.
pub trait AccountApi: Send + Sync {
    fn register_email(
        &self,
        email: &str,
        password: &str,
    ) -> impl std::future::Future<Output = net::Result<String>> + Send;

    fn resend_verification(
        &self,
        email: &str,
    ) -> impl std::future::Future<Output = net::Result<String>> + Send;

    fn verify_email(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = net::Result<String>> + Send;

    fn login(
        &self,
        email: &str,
        password: &str,
    ) -> impl std::future::Future<Output = net::Result<LoginResponse>> + Send;

    fn logout(&self) -> impl std::future::Future<Output = net::Result<String>> + Send;

    fn create_profile(
        &self,
        req: &CreateProfileRequest,
    ) -> impl std::future::Future<Output = net::Result<tider_net::types::CreateProfileResponse>> + Send;

    fn fetch_profile(&self) -> impl std::future::Future<Output = net::Result<Profile>> + Send;
}

impl AccountApi for tider_net::ApiClient {
    async fn register_email(&self, email: &str, password: &str) -> net::Result<String> {
        tider_net::ApiClient::register_email(self, email, password).await
    }

    async fn resend_verification(&self, email: &str) -> net::Result<String> {
        tider_net::ApiClient::resend_verification(self, email).await
    }

    async fn verify_email(&self, token: &str) -> net::Result<String> {
        tider_net::ApiClient::verify_email(self, token).await
    }

    async fn login(&self, email: &str, password: &str) -> net::Result<LoginResponse> {
        tider_net::ApiClient::login(self, email, password).await
    }

    async fn logout(&self) -> net::Result<String> {
        tider_net::ApiClient::logout(self).await
    }

    async fn create_profile(
        &self,
        req: &CreateProfileRequest,
    ) -> net::Result<tider_net::types::CreateProfileResponse> {
        tider_net::ApiClient::create_profile(self, req).await
    }

    async fn fetch_profile(&self) -> net::Result<Profile> {
        tider_net::ApiClient::fetch_profile(self).await
    }
}

/// Account orchestration bound to the shared app state
pub struct AccountFlows<A: AccountApi> {
    api: A,
    state: Arc<AppState>,
}

impl<A: AccountApi> AccountFlows<A> {
    pub fn new(api: A, state: Arc<AppState>) -> Self {
        Self { api, state }
    }

    /// Start email registration; returns the server's message
    pub async fn register(&self, email: &str, password: &str) -> Result<String, FlowError> {
        self.api
            .register_email(email, password)
            .await
            .map_err(|e| self.map_api_error(e))
    }

    /// Ask for the verification email to be sent again
    pub async fn resend_verification(&self, email: &str) -> Result<String, FlowError> {
        self.api
            .resend_verification(email)
            .await
            .map_err(|e| self.map_api_error(e))
    }

    /// Redeem an email verification token
    pub async fn verify_email(&self, token: &str) -> Result<String, FlowError> {
        self.api
            .verify_email(token)
            .await
            .map_err(|e| self.map_api_error(e))
    }

    /// Sign in. On success the token is stored and the session becomes
    /// whatever its claims say it is; a token that arrives already
    /// expired leaves the session signed out.
    pub async fn login(&self, email: &str, password: &str) -> Result<bool, FlowError> {
        let response = self
            .api
            .login(email, password)
            .await
            .map_err(|e| self.map_api_error(e))?;

        match (response.success, response.token) {
            (true, Some(token)) => {
                let valid = self.state.authenticate(&token)?;
                info!(valid, "Login completed");
                Ok(valid)
            }
            _ => {
                let message = response
                    .message
                    .unwrap_or_else(|| "Login failed".to_string());
                Err(FlowError::Declined(message))
            }
        }
    }

    /// Sign out. The server call is best-effort; local state is cleared
    /// regardless of whether the server answered.
    pub async fn logout(&self) -> Result<(), FlowError> {
        if let Err(e) = self.api.logout().await {
            warn!(error = %e, "Server logout failed, clearing local session anyway");
        }
        self.state.logout()?;
        Ok(())
    }

    /// Create the user's profile and record completion
    pub async fn create_profile(&self, req: &CreateProfileRequest) -> Result<(), FlowError> {
        let response = self
            .api
            .create_profile(req)
            .await
            .map_err(|e| self.map_api_error(e))?;

        if !response.success {
            let message = response
                .message
                .unwrap_or_else(|| "Profile creation failed".to_string());
            return Err(FlowError::Declined(message));
        }

        self.state.mark_profile_created()?;
        if let Some(profile) = response.user {
            self.state.set_profile(profile)?;
        }
        Ok(())
    }

    /// Fetch the profile from the server into the app state
    pub async fn load_profile(&self) -> Result<Profile, FlowError> {
        let profile = self
            .api
            .fetch_profile()
            .await
            .map_err(|e| self.map_api_error(e))?;
        self.state.set_profile(profile.clone())?;
        Ok(profile)
    }

    /// A 401 ends the session locally before surfacing the failure
    fn map_api_error(&self, error: net::Error) -> FlowError {
        if matches!(error, net::Error::Unauthorized) {
            warn!("Server rejected session, logging out");
            if let Err(e) = self.state.logout() {
                warn!(error = %e, "Logout after 401 failed");
            }
            return FlowError::SessionExpired;
        }
        FlowError::Api(error)
    }
}
