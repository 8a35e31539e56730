use gamescout::api::{self, app_state::AppState};
use gamescout::config::loader::ConfigLoader;
use gamescout::corpus::{CorpusService, StaticCorpusLoader, create_corpus_loader, sample_games};
use gamescout::index::create_embedding_model;
use gamescout::llm::create_text_generator;
use gamescout::observability::{ObservabilityState, create_observability_router};
use gamescout::services::{
    FeatureStrategy, GenreStrategy, HybridStrategy, HydeExpander, Reranker, SemanticStrategy,
    SimilarGamesStrategy, create_intent_classifier, create_search_service,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::load()?;
    ConfigLoader::validate(&config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Starting GameScout ({})...", config.environment);

    let embedder = create_embedding_model(&config.embedding)?;
    info!(
        "Embedding model initialized: {} (backend: {})",
        config.embedding.model_name, config.embedding.backend
    );

    let generator = create_text_generator(&config.llm)?;
    info!(
        "Text generator initialized: {} (backend: {})",
        config.llm.model_name, config.llm.backend
    );

    let corpus = if config.corpus.backend == "http" {
        Arc::new(CorpusService::new(create_corpus_loader(&config.corpus)?))
    } else {
        // 开发环境：内置样例目录在启动时编码
        let mut games = sample_games();
        for game in &mut games {
            game.embedding = Some(embedder.encode(&game.description).await?);
        }
        Arc::new(CorpusService::new(Arc::new(StaticCorpusLoader::new(games))))
    };
    info!("Corpus service initialized (backend: {})", config.corpus.backend);

    let classifier = create_intent_classifier(generator.clone());

    let hyde = config
        .search
        .hyde_enabled
        .then(|| Arc::new(HydeExpander::new(generator.clone(), embedder.clone())));
    let reranker = config
        .search
        .rerank_enabled
        .then(|| Arc::new(Reranker::new(generator.clone())));

    let semantic = Arc::new(SemanticStrategy::new(
        embedder.clone(),
        corpus.clone(),
        hyde,
        reranker,
    ));
    let similar = Arc::new(SimilarGamesStrategy::new(embedder.clone(), corpus.clone()));
    let genre = Arc::new(GenreStrategy::new(embedder.clone(), corpus.clone()));
    let feature = Arc::new(FeatureStrategy::new(embedder.clone(), corpus.clone()));
    let hybrid = Arc::new(HybridStrategy::new(
        semantic.clone(),
        similar.clone(),
        genre.clone(),
        feature.clone(),
    ));

    let search_service = create_search_service(
        classifier.clone(),
        semantic,
        similar,
        genre,
        feature,
        hybrid,
        corpus.clone(),
    );
    info!("Search orchestrator initialized");

    // 响应与分类缓存的周期清扫
    tokio::spawn(search_service.response_cache().sweep_task());
    tokio::spawn(classifier.intent_cache().sweep_task());

    let observability_state = Arc::new(ObservabilityState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        config.embedding.backend.clone(),
        config.corpus.backend.clone(),
    ));
    let metrics = observability_state.metrics.clone();

    let app_state = AppState::new(search_service, corpus, metrics);
    let router =
        create_observability_router(observability_state).merge(api::create_router(app_state));
    info!("API router created with observability endpoints");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
