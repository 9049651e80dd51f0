//! User profile model

use serde::{Deserialize, Serialize};

/// Profile snapshot as returned by the server.
///
/// Everything beyond the id is optional; the server accepts sparse
/// profiles and fills fields in over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profession: Option<String>,
    #[serde(default)]
    pub interests: Option<Vec<String>>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl Profile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            age: None,
            email: None,
            profession: None,
            interests: None,
            avatar: None,
        }
    }
}
