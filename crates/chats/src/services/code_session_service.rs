//! Shared code editing sessions.

use tracing::info;
use zoro_database::{CodeSession, CodeSessionRepository, NewCodeSession, SqlitePool, User};

use crate::types::{ChatError, ChatResult, CodeSessionView, CreateCodeSessionRequest};
use crate::utils::validation::MAX_NAME_CHARS;
use crate::utils::Validator;

#[derive(Clone)]
pub struct CodeSessionService {
    sessions: CodeSessionRepository,
}

impl CodeSessionService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            sessions: CodeSessionRepository::new(pool),
        }
    }

    async fn session(&self, public_id: &str) -> ChatResult<CodeSession> {
        self.sessions
            .find_by_public_id(public_id)
            .await?
            .ok_or_else(|| ChatError::not_found(format!("code session {public_id}")))
    }

    /// The session, provided `user` participates in it.
    pub async fn ensure_participant(&self, user: &User, session_id: &str) -> ChatResult<CodeSession> {
        let session = self.session(session_id).await?;
        if !self.sessions.is_participant(session.id, user.id).await? {
            return Err(ChatError::access_denied("not a participant of this session"));
        }
        Ok(session)
    }

    pub async fn create(
        &self,
        owner: &User,
        request: CreateCodeSessionRequest,
    ) -> ChatResult<CodeSessionView> {
        let title = Validator::sanitize_string(&request.title, "title", MAX_NAME_CHARS)?;
        let language = Validator::sanitize_string(&request.language, "language", 32)?;
        Validator::code_content(&request.content)?;

        let session = self
            .sessions
            .create(&NewCodeSession {
                owner_id: owner.id,
                title,
                language,
                content: request.content,
            })
            .await?;

        info!(session_id = %session.public_id, owner = %owner.public_id, "code session created");
        Ok(session.into())
    }

    pub async fn get(&self, user: &User, session_id: &str) -> ChatResult<CodeSessionView> {
        Ok(self.ensure_participant(user, session_id).await?.into())
    }

    pub async fn list(&self, user: &User) -> ChatResult<Vec<CodeSessionView>> {
        let sessions = self.sessions.list_for_user(user.id).await?;
        Ok(sessions.into_iter().map(CodeSessionView::from).collect())
    }

    /// Adds `user` as a participant; joining twice is a no-op.
    pub async fn join(&self, user: &User, session_id: &str) -> ChatResult<CodeSessionView> {
        let session = self.session(session_id).await?;
        self.sessions.add_participant(session.id, user.id).await?;
        info!(session_id, user = %user.public_id, "joined code session");
        Ok(session.into())
    }

    pub async fn update_content(
        &self,
        user: &User,
        session_id: &str,
        content: &str,
        language: Option<&str>,
    ) -> ChatResult<CodeSessionView> {
        Validator::code_content(content)?;
        let session = self.ensure_participant(user, session_id).await?;

        let language = language.map(str::trim).filter(|l| !l.is_empty());
        let updated = self
            .sessions
            .update_content(session.id, content, language)
            .await?;
        Ok(updated.into())
    }

    pub async fn delete(&self, user: &User, session_id: &str) -> ChatResult<()> {
        let session = self.session(session_id).await?;
        if session.owner_id != user.id {
            return Err(ChatError::permission_denied(
                "only the owner can delete a code session",
            ));
        }

        self.sessions.delete(session.id).await?;
        info!(session_id, "code session deleted");
        Ok(())
    }
}
