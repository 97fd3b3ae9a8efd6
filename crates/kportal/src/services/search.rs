use kportal_protocol::{ContentKind, ContentResult, ContentSearchRequest, ContentSearchResponse};
use kportal_session::{SessionClient, SessionError, TokenStore};
use kportal_transport::Transport;
use tracing::debug;

use crate::PortalError;

/// Semantic search over video transcripts.
pub struct ContentSearchService<'a, T, S> {
    session: &'a SessionClient<T, S>,
}

impl<'a, T: Transport, S: TokenStore> ContentSearchService<'a, T, S> {
    pub(crate) fn new(session: &'a SessionClient<T, S>) -> Self {
        Self { session }
    }

    /// Runs a query. Results come back in backend order.
    ///
    /// # Errors
    /// - [`PortalError::Validation`] for a blank query
    /// - [`SessionError::SessionExpired`] without a live session; nothing
    ///   is sent in either case
    pub async fn search(&self, query: &str) -> Result<Vec<ContentResult>, PortalError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PortalError::validation("query", "Please enter a search query"));
        }
        if !self.session.is_authenticated() {
            return Err(SessionError::SessionExpired.into());
        }

        let request = ContentSearchRequest {
            query: query.to_string(),
        };
        let response: ContentSearchResponse = self
            .session
            .post_json("/video-content-search/query", &request)
            .await?;
        debug!(hits = response.results.len(), "content search");
        Ok(response.results)
    }
}

/// The synthesized answer among `results`, if the backend produced one.
pub fn generated_answer(results: &[ContentResult]) -> Option<&ContentResult> {
    results
        .iter()
        .find(|r| r.kind == ContentKind::GeneratedAnswer)
}

/// Transcript hits without the generated answer, most similar first.
pub fn relevant_segments(results: &[ContentResult]) -> Vec<&ContentResult> {
    let mut segments: Vec<&ContentResult> = results
        .iter()
        .filter(|r| r.kind != ContentKind::GeneratedAnswer)
        .collect();
    segments.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    segments
}
