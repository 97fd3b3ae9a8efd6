use kportal_protocol::{
    LearningPath, LearningPathCreate, LearningPathProgress, LearningPathRequest, UserId,
    VideoCompletion,
};
use kportal_session::{SessionClient, TokenStore};
use kportal_transport::Transport;
use tracing::info;

use crate::PortalError;

/// Personalized learning paths.
pub struct LearningPathService<'a, T, S> {
    session: &'a SessionClient<T, S>,
}

impl<'a, T: Transport, S: TokenStore> LearningPathService<'a, T, S> {
    pub(crate) fn new(session: &'a SessionClient<T, S>) -> Self {
        Self { session }
    }

    /// Asks the backend for a path covering `skills` that fits in
    /// `minutes_available`. The backend takes whole hours, rounded up.
    pub async fn generate(
        &self,
        skills: &[String],
        minutes_available: u32,
        skill_level: &str,
    ) -> Result<LearningPath, PortalError> {
        if skills.is_empty() {
            return Err(PortalError::validation("skills", "Select at least one skill"));
        }

        let request = LearningPathRequest {
            skills: skills.to_vec(),
            difficulty_level: skill_level.to_lowercase(),
            max_duration_hours: hours_for(minutes_available),
        };
        let path: LearningPath = self
            .session
            .post_json("/learning-paths/generate", &request)
            .await?;
        info!(path_id = %path.id, videos = path.videos.len(), "learning path generated");
        Ok(path)
    }

    /// Saves a hand-assembled path. The title is required.
    pub async fn create(&self, path: &LearningPathCreate) -> Result<LearningPath, PortalError> {
        if path.title.trim().is_empty() {
            return Err(PortalError::validation("title", "Title is required"));
        }
        let created: LearningPath = self.session.post_json("/learning-paths", path).await?;
        info!(path_id = %created.id, "learning path created");
        Ok(created)
    }

    pub async fn list(&self, skip: u32, limit: u32) -> Result<Vec<LearningPath>, PortalError> {
        Ok(self
            .session
            .get_json(&format!("/learning-paths?skip={skip}&limit={limit}"))
            .await?)
    }

    pub async fn progress(
        &self,
        path_id: &str,
        user_id: UserId,
    ) -> Result<LearningPathProgress, PortalError> {
        Ok(self
            .session
            .get_json(&format!("/learning-paths/{path_id}/progress?user_id={user_id}"))
            .await?)
    }

    pub async fn mark_video_completed(
        &self,
        path_id: &str,
        video_id: &str,
        user_id: UserId,
    ) -> Result<(), PortalError> {
        self.session
            .post_no_content(
                &format!("/learning-paths/{path_id}/videos/{video_id}/complete"),
                &VideoCompletion { user_id },
            )
            .await?;
        info!(path_id, video_id, "video completed");
        Ok(())
    }
}

fn hours_for(minutes: u32) -> u32 {
    minutes.div_ceil(60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hours_for_rounds_up() {
        assert_eq!(hours_for(0), 0);
        assert_eq!(hours_for(1), 1);
        assert_eq!(hours_for(60), 1);
        assert_eq!(hours_for(61), 2);
        assert_eq!(hours_for(150), 3);
    }
}
