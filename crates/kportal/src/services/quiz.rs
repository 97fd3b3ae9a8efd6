use chrono::{SecondsFormat, Utc};
use kportal_protocol::{Quiz, QuizRequest, QuizResult, QuizSubmission};
use kportal_session::{SessionClient, TokenStore};
use kportal_transport::Transport;
use tracing::{debug, info};

use crate::PortalError;

/// Quiz retrieval, generation and submission.
pub struct QuizService<'a, T, S> {
    session: &'a SessionClient<T, S>,
}

impl<'a, T: Transport, S: TokenStore> QuizService<'a, T, S> {
    pub(crate) fn new(session: &'a SessionClient<T, S>) -> Self {
        Self { session }
    }

    pub async fn get(&self, quiz_id: &str) -> Result<Quiz, PortalError> {
        Ok(self.session.get_json(&format!("/quizzes/{quiz_id}")).await?)
    }

    /// Quizzes the current user can take.
    pub async fn available(&self) -> Result<Vec<Quiz>, PortalError> {
        let quizzes: Vec<Quiz> = self.session.get_json("/quizzes/available").await?;
        debug!(count = quizzes.len(), "available quizzes");
        Ok(quizzes)
    }

    /// Asks the backend to generate a quiz for a video.
    pub async fn generate(&self, request: &QuizRequest) -> Result<Quiz, PortalError> {
        if request.num_questions == 0 {
            return Err(PortalError::validation(
                "num_questions",
                "At least one question is required",
            ));
        }
        Ok(self.session.post_json("/quizzes/generate", request).await?)
    }

    /// Submits answers for grading. `submitted_at` is stamped with the
    /// current UTC time when the caller left it empty.
    ///
    /// # Errors
    /// [`PortalError::Validation`] for an empty answer list; nothing is sent.
    pub async fn submit(&self, submission: QuizSubmission) -> Result<QuizResult, PortalError> {
        if submission.answers.is_empty() {
            return Err(PortalError::validation(
                "answers",
                "Answer at least one question before submitting",
            ));
        }

        let submission = QuizSubmission {
            submitted_at: submission
                .submitted_at
                .or_else(|| Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))),
            ..submission
        };
        let result: QuizResult = self.session.post_json("/quizzes/submit", &submission).await?;
        info!(
            quiz_id = %submission.quiz_id,
            score = result.score,
            passed = result.passed,
            "quiz submitted"
        );
        Ok(result)
    }
}
