//! Data models shared across the client

mod booking;
mod claims;
mod profile;

pub use booking::Booking;
pub use claims::TokenClaims;
pub use profile::Profile;
