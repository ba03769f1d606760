mod catalog;
mod generator;
mod history;
mod reconciler;
mod retriever;
mod sessions;
mod turn;

pub use catalog::RestaurantCatalog;
pub use generator::{ChatPolicy, LlmResponseGenerator, ResponseGenerator};
pub use history::HistoryAssembler;
pub use reconciler::Reconciler;
pub use retriever::{
    format_retrieval_record, ContextRetriever, GracefulRetriever, RetrievalContext,
    VectorRetriever,
};
pub use sessions::{smallest_unused_id, ConversationQueryService, SessionAllocator};
pub use turn::{TurnOrchestrator, TurnRequest, TurnResponse, DEGRADED_NOTICE};
