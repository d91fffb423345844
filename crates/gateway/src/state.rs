//! Shared application state

use axum::extract::FromRef;
use kca_portal_common::{
    auth::{JwtManager, StaffAccount},
    chat::{ChatService, ChatSessionStore},
    citations::SourceCorpus,
    config::AppConfig,
    contacts::ContactDirectory,
    errors::Result,
    llm::create_completer,
    notices::NoticeBoard,
};
use std::sync::Arc;
use tracing::info;

use crate::middleware::rate_limit::{create_rate_limiter, RateLimit};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub corpus: Arc<SourceCorpus>,
    pub chat: Arc<ChatService>,
    pub contacts: Arc<ContactDirectory>,
    pub notices: Arc<NoticeBoard>,
    pub jwt: Arc<JwtManager>,
    pub staff: StaffAccount,
    pub rate_limit: Option<RateLimit>,
}

impl AppState {
    /// Load fixtures, open the stores and wire the chat service
    pub async fn build(config: AppConfig) -> Result<Self> {
        let jwt = Arc::new(JwtManager::from_config(&config.auth, config.is_development())?);

        let corpus = Arc::new(SourceCorpus::load(&config.storage.sources_fixture).await?);

        let completer = create_completer(&config.llm)?;
        let sessions = Arc::new(ChatSessionStore::new(config.chat.session_ttl_minutes));
        let chat = Arc::new(ChatService::new(
            corpus.clone(),
            completer,
            sessions,
            config.chat.max_citations,
        ));

        let notices = Arc::new(NoticeBoard::open(config.notices_path()).await?);
        let contacts = Arc::new(
            ContactDirectory::open(config.contacts_path(), &config.storage.contacts_fixture).await?,
        );

        let rate_limit = if config.rate_limit.enabled {
            Some(create_rate_limiter(
                config.rate_limit.requests_per_second,
                config.rate_limit.burst,
            )?)
        } else {
            None
        };

        info!(
            sources = corpus.sources().len(),
            snippets = corpus.snippet_count(),
            model = chat.model_name(),
            data_dir = %config.storage.data_dir.display(),
            "Application state ready"
        );

        Ok(Self {
            jwt,
            staff: StaffAccount::from_config(&config.auth),
            config: Arc::new(config),
            corpus,
            chat,
            contacts,
            notices,
            rate_limit,
        })
    }
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}
