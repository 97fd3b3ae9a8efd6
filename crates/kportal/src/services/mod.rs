//! Typed calls to the backend's feature endpoints.
//!
//! Each service borrows the [`SessionClient`](kportal_session::SessionClient)
//! and sends through its authorized path, so every call carries the bearer
//! header and gets the one refresh-and-retry on `401`. Grading, ranking and
//! path generation all happen on the backend.

mod learning_path;
mod profile;
mod quiz;
mod search;
mod video;

pub use learning_path::LearningPathService;
pub use profile::{ProfileService, validate_profile_update};
pub use quiz::QuizService;
pub use search::{ContentSearchService, generated_answer, relevant_segments};
pub use video::VideoService;
