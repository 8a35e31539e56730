//! 服务模块

pub mod hyde;
pub mod intent_classifier;
pub mod orchestrator;
pub mod reranker;
pub mod strategies;

pub use hyde::HydeExpander;
pub use intent_classifier::{IntentClassifier, create_intent_classifier, fallback_classify};
pub use orchestrator::{SearchOrchestrator, SearchService, create_search_service};
pub use reranker::Reranker;
pub use strategies::{
    FeatureStrategy, GenreStrategy, HybridStrategy, SearchStrategy, SemanticStrategy,
    SimilarGamesStrategy,
};
