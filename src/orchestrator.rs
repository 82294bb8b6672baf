//! RAG session for Trailguide.
//!
//! A [`Session`] owns one retrieval index and one chat history. Its
//! lifecycle is a small state machine:
//!
//! ```text
//! idle → initializing → ready ⇄ querying
//!              ↓
//!            error   (retry by calling initialize again)
//! ```
//!
//! The current [`SessionStatus`] is published on a watch channel so a
//! presentation layer can render progress without keeping its own copy.

use crate::config::{Prompts, Settings};
use crate::embedding::{create_embedder, Embedder};
use crate::error::{GuideError, Result};
use crate::generation::{GenerationRequest, Generator, OpenAIGenerator};
use crate::index::{HybridParams, KnowledgeIndex, SearchHit, SearchQuery};
use crate::knowledge::{ChatMessage, KnowledgeBase};
use crate::rag::{collect_sources, format_context_for_prompt, RagAnswer};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Initializing,
    Ready,
    Querying,
    Error,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Initializing => "initializing",
            SessionState::Ready => "ready",
            SessionState::Querying => "querying",
            SessionState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Snapshot published to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    /// 0-100.
    pub progress: u8,
    pub message: String,
}

impl SessionStatus {
    fn new(state: SessionState, progress: u8, message: impl Into<String>) -> Self {
        Self {
            state,
            progress,
            message: message.into(),
        }
    }
}

/// Query-time tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub top_k: usize,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub hybrid: HybridParams,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            temperature: 0.7,
            max_output_tokens: 512,
            hybrid: HybridParams::default(),
        }
    }
}

impl From<&Settings> for SessionConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            top_k: settings.retrieval.top_k,
            temperature: settings.generation.temperature,
            max_output_tokens: settings.generation.max_output_tokens,
            hybrid: HybridParams::from(&settings.retrieval),
        }
    }
}

/// Returns the session to `ready` if a query is abandoned mid-flight.
struct QueryGuard<'a> {
    status: &'a watch::Sender<SessionStatus>,
}

impl Drop for QueryGuard<'_> {
    fn drop(&mut self) {
        self.status.send_if_modified(|status| {
            if status.state == SessionState::Querying {
                *status = SessionStatus::new(SessionState::Ready, 100, "Ready");
                true
            } else {
                false
            }
        });
    }
}

/// Moves the session to `error` if initialization is abandoned mid-flight,
/// so a later `initialize` can retry.
struct InitGuard<'a> {
    status: &'a watch::Sender<SessionStatus>,
}

impl Drop for InitGuard<'_> {
    fn drop(&mut self) {
        self.status.send_if_modified(|status| {
            if status.state == SessionState::Initializing {
                *status = SessionStatus::new(SessionState::Error, 0, "Initialization interrupted");
                true
            } else {
                false
            }
        });
    }
}

/// A question-answering session over one knowledge base.
pub struct Session {
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    prompts: Prompts,
    config: SessionConfig,
    index: RwLock<Option<Arc<KnowledgeIndex>>>,
    history: Mutex<Vec<ChatMessage>>,
    status: watch::Sender<SessionStatus>,
}

impl Session {
    /// Create an idle session from explicit collaborators.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        prompts: Prompts,
        config: SessionConfig,
    ) -> Self {
        let (status, _) = watch::channel(SessionStatus::new(SessionState::Idle, 0, "Idle"));
        Self {
            embedder,
            generator,
            prompts,
            config,
            index: RwLock::new(None),
            history: Mutex::new(Vec::new()),
            status,
        }
    }

    /// Create an idle session with the embedder, generator and prompts
    /// described by the settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let embedder = create_embedder(&settings.embedding)?;
        let generator: Arc<dyn Generator> = Arc::new(OpenAIGenerator::with_config(
            &settings.generation.model,
            settings.generation.api_base.as_deref(),
            None,
        )?);

        Ok(Self::new(
            embedder,
            generator,
            prompts,
            SessionConfig::from(settings),
        ))
    }

    /// Current status snapshot.
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.status.borrow().state
    }

    /// Receive every status change from now on.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    /// Conversation so far, oldest first.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of indexed records, if initialized.
    pub fn record_count(&self) -> Option<usize> {
        self.current_index().map(|index| index.len())
    }

    fn current_index(&self) -> Option<Arc<KnowledgeIndex>> {
        self.index
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn publish(&self, state: SessionState, progress: u8, message: impl Into<String>) {
        let status = SessionStatus::new(state, progress, message);
        debug!("Session {} ({}%): {}", status.state, status.progress, status.message);
        self.status.send_replace(status);
    }

    fn fail(&self, stage: &str, err: &GuideError) {
        error!("Session initialization failed while {}: {}", stage, err);
        self.publish(SessionState::Error, 0, format!("Failed while {}", stage));
    }

    /// Load the embedder, build the index and prepare the generator.
    ///
    /// Allowed from `idle`, `ready` and `error`. Any stage failure leaves
    /// the session in `error` and returns that failure.
    #[instrument(skip(self, kb), fields(records = kb.record_count()))]
    pub async fn initialize(&self, kb: &KnowledgeBase) -> Result<()> {
        let mut rejected = None;
        self.status.send_if_modified(|status| match status.state {
            SessionState::Initializing | SessionState::Querying => {
                rejected = Some(status.state);
                false
            }
            _ => {
                *status =
                    SessionStatus::new(SessionState::Initializing, 0, "Loading embedding model");
                true
            }
        });
        if rejected.is_some() {
            return Err(GuideError::Busy);
        }
        let _guard = InitGuard {
            status: &self.status,
        };

        if let Err(e) = self.embedder.load().await {
            self.fail("loading the embedding model", &e);
            return Err(e);
        }
        self.publish(SessionState::Initializing, 40, "Embedding model loaded");

        if let Some(dims) = kb.embedding_dimensions() {
            if dims != self.embedder.dimensions() {
                warn!(
                    "Knowledge base embeddings have {} dimensions but {} produces {}; vector scores will be skipped",
                    dims,
                    self.embedder.model_name(),
                    self.embedder.dimensions()
                );
            }
        }

        let index = match KnowledgeIndex::from_knowledge_base(kb, self.config.hybrid) {
            Ok(index) => Arc::new(index),
            Err(e) => {
                self.fail("building the index", &e);
                return Err(e);
            }
        };
        let records = index.len();
        *self.index.write().unwrap_or_else(|e| e.into_inner()) = Some(index);
        self.publish(
            SessionState::Initializing,
            70,
            format!("Index built with {} records", records),
        );

        if let Err(e) = self.generator.load().await {
            self.fail("loading the generation engine", &e);
            return Err(e);
        }

        info!("Session ready with {} records", records);
        self.publish(SessionState::Ready, 100, "Ready");
        Ok(())
    }

    /// Answer a question.
    ///
    /// Only valid while `ready`; a concurrent call is rejected with
    /// [`GuideError::Busy`]. Pipeline failures never escape: they are logged
    /// and become [`RagAnswer::fallback`], and the session returns to
    /// `ready` either way.
    #[instrument(skip(self), fields(question = %question))]
    pub async fn query(&self, question: &str) -> Result<RagAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(GuideError::InvalidInput("Question is empty".to_string()));
        }

        let mut current = SessionState::Ready;
        let claimed = self.status.send_if_modified(|status| {
            current = status.state;
            if status.state == SessionState::Ready {
                *status = SessionStatus::new(SessionState::Querying, 100, "Thinking");
                true
            } else {
                false
            }
        });
        if !claimed {
            return Err(match current {
                SessionState::Querying => GuideError::Busy,
                other => GuideError::NotReady(other.to_string()),
            });
        }
        let _guard = QueryGuard {
            status: &self.status,
        };

        self.push_message(ChatMessage::user(question));

        let answer = match self.answer(question).await {
            Ok(answer) => answer,
            Err(e) => {
                error!("Query failed, answering with fallback: {}", e);
                RagAnswer::fallback()
            }
        };

        self.push_message(ChatMessage::assistant(
            answer.response.clone(),
            answer.sources.clone(),
        ));
        Ok(answer)
    }

    /// Retrieve the hits a question would use, without generating.
    pub async fn retrieve(&self, question: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let index = self
            .current_index()
            .ok_or_else(|| GuideError::NotReady(self.state().to_string()))?;
        let embedding = self.embedder.embed(question).await?;
        index.search(&SearchQuery {
            text: question,
            embedding: &embedding,
            limit,
        })
    }

    async fn answer(&self, question: &str) -> Result<RagAnswer> {
        let hits = self.retrieve(question, self.config.top_k).await?;
        if hits.is_empty() {
            warn!("No records matched the question");
            return Ok(RagAnswer::fallback());
        }

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), format_context_for_prompt(&hits));

        let system = self
            .prompts
            .render_with_custom(&self.prompts.rag.system, &HashMap::new());
        let user = self.prompts.render_with_custom(&self.prompts.rag.user, &vars);

        let request = GenerationRequest::new(system, user)
            .with_temperature(self.config.temperature)
            .with_max_output_tokens(self.config.max_output_tokens);

        let response = self.generator.generate(&request).await?;
        let response = response.trim();
        if response.is_empty() {
            return Err(GuideError::Generation("Empty response".to_string()));
        }

        debug!("Answered from {} hits", hits.len());
        Ok(RagAnswer {
            response: response.to_string(),
            sources: collect_sources(&hits),
            hits,
        })
    }

    fn push_message(&self, message: ChatMessage) {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message);
    }

    /// Drop the index and history and return to `idle`.
    ///
    /// Rejected with [`GuideError::Busy`] while initializing or querying.
    pub fn dispose(&self) -> Result<()> {
        let mut index = self.index.write().unwrap_or_else(|e| e.into_inner());
        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());

        let released = self.status.send_if_modified(|status| match status.state {
            SessionState::Initializing | SessionState::Querying => false,
            _ => {
                *status = SessionStatus::new(SessionState::Idle, 0, "Idle");
                true
            }
        });
        if !released {
            return Err(GuideError::Busy);
        }

        *index = None;
        history.clear();
        debug!("Session disposed");
        Ok(())
    }
}
