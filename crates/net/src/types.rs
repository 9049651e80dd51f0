//! Wire types for the booking backend
//!
//! Field names reproduce the server contract exactly; renames cover the
//! camelCase fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tider_core::Profile;

#[derive(Debug, Serialize)]
pub struct RegisterEmailRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct CreateProfileRequest {
    pub name: String,
    pub age: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profession: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProfileResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user: Option<Profile>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileResponse {
    pub user: Profile,
}

#[derive(Debug, Deserialize)]
pub struct SlotsResponse {
    #[serde(rename = "availableSlots")]
    pub available_slots: Vec<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CreateAppointmentRequest {
    #[serde(rename = "dateTimeF")]
    pub date_time: DateTime<Utc>,
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAppointmentResponse {
    #[serde(rename = "confirmationId", default)]
    pub confirmation_id: Option<String>,
}
