//! Inbound authorization requests, client metadata lookup, and PKCE helpers.

pub mod federation;
pub mod pkce;
pub mod request;

pub use federation::*;
pub use pkce::*;
pub use request::*;
