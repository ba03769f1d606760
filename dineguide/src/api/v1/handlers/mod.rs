pub mod chat;
pub(crate) mod health;
pub mod restaurants;

pub use health::health_check;
