use std::sync::Arc;

use crate::config::ChatConfig;
use crate::db::DatabaseBackend;
use crate::error::{DineError, Result};
use crate::models::{Message, StructuredResponse};
use crate::services::{
    format_retrieval_record, ChatPolicy, ContextRetriever, HistoryAssembler, Reconciler,
    ResponseGenerator,
};

pub const DEGRADED_NOTICE: &str = "No fresh restaurant data available";

#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub user_id: String,
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnResponse {
    pub response: StructuredResponse,
    pub notice: Option<String>,
}

/// Runs one conversation turn end to end.
///
/// Steps run strictly in order and any failure aborts the rest. A retrieval
/// record written before a later failure is left in place.
#[derive(Clone)]
pub struct TurnOrchestrator {
    db: Arc<dyn DatabaseBackend>,
    retriever: Arc<dyn ContextRetriever>,
    history: HistoryAssembler,
    generator: Arc<dyn ResponseGenerator>,
    reconciler: Reconciler,
    chat: ChatConfig,
}

impl TurnOrchestrator {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        retriever: Arc<dyn ContextRetriever>,
        generator: Arc<dyn ResponseGenerator>,
        chat: ChatConfig,
    ) -> Self {
        Self {
            history: HistoryAssembler::new(Arc::clone(&db)),
            reconciler: Reconciler::new(chat.unmatched, chat.prefer_model_summaries),
            db,
            retriever,
            generator,
            chat,
        }
    }

    pub async fn send_message(&self, request: TurnRequest) -> Result<TurnResponse> {
        let TurnRequest {
            user_id,
            session_id,
            message,
        } = request;

        if user_id.trim().is_empty() || session_id.trim().is_empty() || message.trim().is_empty()
        {
            return Err(DineError::Validation(
                "Missing user_id, session_id, or message".to_string(),
            ));
        }

        let context = self.retriever.search(&message, self.chat.top_k).await?;

        if !context.degraded {
            let record = format_retrieval_record(&context.hits)?;
            self.db
                .append_message(&user_id, &session_id, &Message::RestaurantData(record))
                .await?;
        }

        let history = self
            .history
            .assemble(&user_id, &session_id, self.chat.history_window)
            .await?;

        let policy = ChatPolicy {
            metro_area: self.chat.metro_area.clone(),
            strictness: self.chat.policy,
        };
        let generated = self
            .generator
            .generate(&message, &history, &context, &policy)
            .await?;

        let response = self.reconciler.reconcile(generated, &context.hits);

        self.db
            .append_message(&user_id, &session_id, &Message::HumanMessageNoPrompt(message))
            .await?;
        self.db
            .append_message(&user_id, &session_id, &Message::AiMessage(response.clone()))
            .await?;

        tracing::info!(
            user_id = %user_id,
            session_id = %session_id,
            hits = context.hits.len(),
            recommendations = response.restaurants.len(),
            degraded = context.degraded,
            "Completed chat turn"
        );

        Ok(TurnResponse {
            response,
            notice: context.degraded.then(|| DEGRADED_NOTICE.to_string()),
        })
    }
}
