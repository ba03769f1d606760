mod conversations;
mod restaurants;

pub use conversations::ConversationRepository;
pub use restaurants::RestaurantRepository;
