use kportal_protocol::{Video, VideoProgressUpdate};
use kportal_session::{SessionClient, TokenStore};
use kportal_transport::Transport;
use tracing::debug;

use crate::PortalError;

/// Video catalogue lookups and watch progress.
pub struct VideoService<'a, T, S> {
    session: &'a SessionClient<T, S>,
}

impl<'a, T: Transport, S: TokenStore> VideoService<'a, T, S> {
    pub(crate) fn new(session: &'a SessionClient<T, S>) -> Self {
        Self { session }
    }

    pub async fn get(&self, video_id: &str) -> Result<Video, PortalError> {
        Ok(self.session.get_json(&format!("/videos/{video_id}")).await?)
    }

    /// Picks based on the user's profile and history.
    pub async fn recommended(&self) -> Result<Vec<Video>, PortalError> {
        self.list("/videos/recommended").await
    }

    pub async fn trending(&self) -> Result<Vec<Video>, PortalError> {
        self.list("/videos/trending").await
    }

    pub async fn by_category(&self, category: &str) -> Result<Vec<Video>, PortalError> {
        if category.trim().is_empty() {
            return Err(PortalError::validation("category", "Category is required"));
        }
        self.list(&format!("/videos/category/{category}")).await
    }

    /// Records how far the user got, as a percentage.
    ///
    /// # Errors
    /// [`PortalError::Validation`] when `progress` is outside `0..=100`;
    /// nothing is sent.
    pub async fn update_progress(&self, video_id: &str, progress: f64) -> Result<(), PortalError> {
        if !(0.0..=100.0).contains(&progress) {
            return Err(PortalError::validation(
                "progress",
                "Progress must be between 0 and 100",
            ));
        }
        self.session
            .post_no_content(
                &format!("/videos/{video_id}/progress"),
                &VideoProgressUpdate { progress },
            )
            .await?;
        debug!(video_id, progress, "video progress saved");
        Ok(())
    }

    async fn list(&self, path: &str) -> Result<Vec<Video>, PortalError> {
        let videos: Vec<Video> = self.session.get_json(path).await?;
        debug!(path, count = videos.len(), "videos listed");
        Ok(videos)
    }
}
