mod message;
mod restaurant;
mod session;

pub use message::*;
pub use restaurant::*;
pub use session::*;
