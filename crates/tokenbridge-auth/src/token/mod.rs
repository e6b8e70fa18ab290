//! Token issuance.
//!
//! - [`issuer`] - the [`TokenIssuer`] capability and the opaque token issuer
//! - [`lifetime`] - calendar-month lifetimes for refresh tokens

pub mod issuer;
pub mod lifetime;

pub use issuer::{MAX_GENERATION_ATTEMPTS, OpaqueTokenIssuer, TokenIssuer};
pub use lifetime::CalendarMonths;
