//! v1 API Data Transfer Objects.
//!
//! These types define the wire format for the v1 REST API. They are kept
//! separate from the domain models in `src/models/`.

pub mod chat;
pub mod restaurants;

pub use chat::*;
pub use restaurants::*;
