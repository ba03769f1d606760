use std::sync::Arc;

use crate::config::{Config, RetrievalFailurePolicy};
use crate::db::DatabaseBackend;
use crate::embeddings::EmbeddingProvider;
use crate::llm::LlmProvider;
use crate::services::{
    ContextRetriever, ConversationQueryService, GracefulRetriever, LlmResponseGenerator,
    ResponseGenerator, RestaurantCatalog, SessionAllocator, TurnOrchestrator, VectorRetriever,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn DatabaseBackend>,
    pub embeddings: EmbeddingProvider,
    pub llm: LlmProvider,
    pub turns: TurnOrchestrator,
    pub conversations: ConversationQueryService,
    pub sessions: SessionAllocator,
    pub catalog: RestaurantCatalog,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Arc<dyn DatabaseBackend>,
        embeddings: EmbeddingProvider,
        llm: LlmProvider,
    ) -> Self {
        let vector = VectorRetriever::new(db.clone(), embeddings.clone(), config.chat.min_score);
        let retriever: Arc<dyn ContextRetriever> = match config.chat.retrieval_on_failure {
            RetrievalFailurePolicy::Fail => Arc::new(vector),
            RetrievalFailurePolicy::Degrade => Arc::new(GracefulRetriever::new(vector)),
        };
        let generator: Arc<dyn ResponseGenerator> =
            Arc::new(LlmResponseGenerator::new(llm.clone()));

        Self::with_pipeline(config, db, embeddings, llm, retriever, generator)
    }

    /// Wires the state around an explicit retriever and generator.
    pub fn with_pipeline(
        config: Config,
        db: Arc<dyn DatabaseBackend>,
        embeddings: EmbeddingProvider,
        llm: LlmProvider,
        retriever: Arc<dyn ContextRetriever>,
        generator: Arc<dyn ResponseGenerator>,
    ) -> Self {
        let config = Arc::new(config);
        let turns = TurnOrchestrator::new(db.clone(), retriever, generator, config.chat.clone());
        let conversations = ConversationQueryService::new(db.clone());
        let sessions = SessionAllocator::new(db.clone());
        let catalog = RestaurantCatalog::new(db.clone(), embeddings.clone());

        Self {
            config,
            db,
            embeddings,
            llm,
            turns,
            conversations,
            sessions,
            catalog,
        }
    }
}
