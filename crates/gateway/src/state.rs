//! Shared application state

use axum::extract::FromRef;
use quickonboard_common::{
    auth::JwtManager,
    config::AppConfig,
    db::{DbPool, Repository},
    embeddings::create_embedder,
    errors::{AppError, Result},
    storage::create_blob_store,
    BlobStore, Embedder,
};
use quickonboard_context::{create_chat_model, AnswerGenerator, ChatModel};
use quickonboard_ingestion::{ChunkingConfig, DocumentProcessor};
use quickonboard_search::Retriever;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub repo: Repository,
    pub jwt: Arc<JwtManager>,
    pub blobs: Arc<dyn BlobStore>,
    pub processor: Arc<DocumentProcessor>,
    pub generator: Arc<AnswerGenerator>,
}

impl AppState {
    /// Build state with providers chosen by configuration
    pub fn from_config(config: Arc<AppConfig>, db: DbPool) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let chat_model = create_chat_model(&config.llm)?;
        let blobs = create_blob_store(&config.storage)?;
        Self::new(config, db, embedder, chat_model, blobs)
    }

    /// Build state from explicit providers
    pub fn new(
        config: Arc<AppConfig>,
        db: DbPool,
        embedder: Arc<dyn Embedder>,
        chat_model: Arc<dyn ChatModel>,
        blobs: Arc<dyn BlobStore>,
    ) -> Result<Self> {
        let secret = config
            .auth
            .jwt_secret
            .as_deref()
            .ok_or_else(|| AppError::Configuration {
                message: "auth.jwt_secret is required".to_string(),
            })?;

        let jwt = JwtManager::new(secret, config.auth.jwt_expiration_secs)
            .with_issuer(config.auth.jwt_issuer.clone())
            .with_cookie_name(config.auth.session_cookie.clone());

        let repo = Repository::new(db.clone());

        let chunking = ChunkingConfig::from_config(&config.ingestion)?;
        let processor = DocumentProcessor::new(
            Arc::new(repo.clone()),
            blobs.clone(),
            embedder.clone(),
            chunking,
            config.embedding.batch_size,
        );

        let retriever = Retriever::new(Arc::new(repo.clone()), embedder, config.retrieval.top_k);
        let generator = AnswerGenerator::new(Arc::new(retriever), chat_model);

        Ok(Self {
            config,
            db,
            repo,
            jwt: Arc::new(jwt),
            blobs,
            processor: Arc::new(processor),
            generator: Arc::new(generator),
        })
    }
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
