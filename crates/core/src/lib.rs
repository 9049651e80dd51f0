//! Tider Core Library
//!
//! Models, durable storage, session validity, app state, and route
//! gating for the Tider appointment-booking client.

pub mod error;
pub mod models;
pub mod routes;
pub mod session;
pub mod state;
pub mod storage;

pub use error::{Error, Result};
pub use models::{Booking, Profile, TokenClaims};
pub use routes::{decide, Route, RouteDecision};
pub use session::SessionService;
pub use state::{AppState, StateSnapshot};
pub use storage::{Database, PersistedState, SnapshotStore, TokenStore};
