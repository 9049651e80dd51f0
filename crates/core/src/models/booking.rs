//! Confirmed booking model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A server-accepted appointment booking.
///
/// Created only after the server accepts a submission. The confirmation
/// id is server-assigned and authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// The booked slot start time
    pub slot: DateTime<Utc>,
    /// The user who booked it
    pub user_id: String,
    /// Server-assigned confirmation identifier
    pub confirmation_id: String,
}

impl Booking {
    pub fn new(slot: DateTime<Utc>, user_id: impl Into<String>, confirmation_id: impl Into<String>) -> Self {
        Self {
            slot,
            user_id: user_id.into(),
            confirmation_id: confirmation_id.into(),
        }
    }
}
