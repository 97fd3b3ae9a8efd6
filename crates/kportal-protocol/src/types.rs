//! Core protocol types: the JSON bodies of every backend endpoint.
//!
//! Response types are deliberately tolerant (`#[serde(default)]` on fields
//! the backend may omit or send as `null`) but never untyped: a body that
//! does not fit is a decode error at the boundary, not a surprise deeper in.
//!
//! Types carrying secrets (passwords, tokens) implement `Debug` by hand so
//! they can be logged without leaking credentials.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Numeric account identifier assigned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The authoritative user record returned by `/auth/me` and profile calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
    /// One of `beginner`, `intermediate`, `advanced` when set.
    #[serde(default)]
    pub skill_level: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub interests: Vec<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Password login body. The backend uses the account email as `username`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Federated (Google) login body: the third-party ID token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedLoginRequest {
    pub token: String,
}

impl fmt::Debug for FederatedLoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FederatedLoginRequest")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Account registration body.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub username: String,
    pub full_name: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("username", &self.username)
            .field("full_name", &self.full_name)
            .finish()
    }
}

/// Successful login / federated login response.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("user", &self.user)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Body of `POST /auth/refresh`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub email: String,
    pub refresh_token: String,
}

impl fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshRequest")
            .field("email", &self.email)
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Response of `POST /auth/refresh`. A rotated refresh token is optional.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for RefreshResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshResponse")
            .field("access_token", &"<redacted>")
            .field("rotated", &self.refresh_token.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Skill levels the backend accepts, lowercase.
pub const SKILL_LEVELS: [&str; 3] = ["beginner", "intermediate", "advanced"];

/// Upper bound on a profile's interest list.
pub const MAX_INTERESTS: usize = 20;

/// Partial profile update. `None` fields are omitted from the body and
/// skipped by [`Validate`]. Lengths count characters, not bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100, message = "Full name must be between 1 and 100 characters"))]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(
        function = "known_skill_level",
        message = "Skill level must be one of: beginner, intermediate, advanced"
    ))]
    pub skill_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        length(max = 20, message = "Maximum 20 interests allowed"),
        custom(
            function = "interest_lengths",
            message = "Each interest must be between 1 and 50 characters"
        )
    )]
    pub interests: Option<Vec<String>>,
}

fn known_skill_level(level: &str) -> Result<(), ValidationError> {
    if SKILL_LEVELS.contains(&level) {
        Ok(())
    } else {
        Err(ValidationError::new("skill_level"))
    }
}

fn interest_lengths(interests: &[String]) -> Result<(), ValidationError> {
    if interests
        .iter()
        .all(|i| (1..=50).contains(&i.chars().count()))
    {
        Ok(())
    } else {
        Err(ValidationError::new("interest_length"))
    }
}

// ---------------------------------------------------------------------------
// Quizzes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
    /// Index into `options`; the backend may withhold it before submission.
    #[serde(default)]
    pub correct_answer: Option<u32>,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub difficulty_level: Option<String>,
    /// Listings may omit questions entirely; that reads as "none".
    #[serde(default, deserialize_with = "null_as_default")]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub passing_score: f64,
    /// Minutes; 0 means untimed.
    #[serde(default)]
    pub time_limit: u32,
}

/// Body of `POST /quizzes/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizRequest {
    pub video_id: String,
    pub difficulty_level: String,
    pub num_questions: u32,
}

/// Body of `POST /quizzes/submit`.
///
/// `answers[i]` is the chosen option index for question `i`; `-1` marks
/// an unanswered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSubmission {
    pub quiz_id: String,
    pub answers: Vec<i32>,
    pub user_id: String,
    /// RFC 3339 timestamp; filled in at submit time when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
}

/// Server-graded result of a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    #[serde(default)]
    pub quiz_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub score: f64,
    pub passed: bool,
    #[serde(default)]
    pub correct_answers: Vec<bool>,
    #[serde(default)]
    pub explanations: Vec<String>,
    pub submitted_at: String,
}

impl QuizResult {
    /// Number of questions answered correctly.
    pub fn correct_count(&self) -> usize {
        self.correct_answers.iter().filter(|c| **c).count()
    }
}

// ---------------------------------------------------------------------------
// Content search
// ---------------------------------------------------------------------------

/// Body of `POST /video-content-search/query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSearchRequest {
    pub query: String,
}

/// What a search hit is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Section,
    Segment,
    Summary,
    /// A synthesized answer rather than a transcript excerpt.
    GeneratedAnswer,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentResult {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub similarity: f64,
    pub text: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub speaker: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentSearchResponse {
    #[serde(default)]
    pub results: Vec<ContentResult>,
}

// ---------------------------------------------------------------------------
// Learning paths
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty_level: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub completed: bool,
}

/// Body of `POST /videos/{id}/progress`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoProgressUpdate {
    /// Percent watched, `0.0..=100.0`.
    pub progress: f64,
}

/// Body of `POST /learning-paths/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningPathRequest {
    pub skills: Vec<String>,
    pub difficulty_level: String,
    pub max_duration_hours: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPath {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub target_skills: Vec<String>,
    #[serde(default)]
    pub difficulty_level: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub videos: Vec<Video>,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub completed: bool,
}

/// Body of `POST /learning-paths`: a hand-assembled path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningPathCreate {
    pub title: String,
    pub description: String,
    pub target_skills: Vec<String>,
    /// Video ids, in viewing order.
    pub videos: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<String>,
}

/// Body of `POST /learning-paths/{id}/videos/{video_id}/complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoCompletion {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPathProgress {
    pub completed_videos: u32,
    pub total_videos: u32,
    pub progress_percentage: f64,
}

// ---------------------------------------------------------------------------
// Deserialization helpers
// ---------------------------------------------------------------------------

/// Accepts `"42"` or `42` for identifiers the backend is inconsistent about.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_tolerates_null_interests_and_missing_flags() {
        let json = r#"{"id":3,"email":"ada@example.com","username":"ada","full_name":null,"interests":null}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, UserId(3));
        assert!(user.is_active);
        assert!(!user.is_superuser);
        assert!(user.interests.is_empty());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials::new("ada@example.com", "hunter2");
        let printed = format!("{credentials:?}");
        assert!(printed.contains("ada@example.com"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn test_token_response_debug_redacts_tokens() {
        let response = TokenResponse {
            access_token: "secret-access".into(),
            token_type: "bearer".into(),
            user: None,
            refresh_token: Some("secret-refresh".into()),
        };
        let printed = format!("{response:?}");
        assert!(!printed.contains("secret-access"));
        assert!(!printed.contains("secret-refresh"));
    }

    #[test]
    fn test_profile_update_omits_unset_fields() {
        let update = ProfileUpdate {
            skill_level: Some("advanced".into()),
            ..ProfileUpdate::default()
        };
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"skill_level":"advanced"}"#);
    }

    #[test]
    fn test_profile_update_validate_skips_absent_fields() {
        assert!(ProfileUpdate::default().validate().is_ok());

        let update = ProfileUpdate {
            skill_level: Some("expert".into()),
            interests: Some(vec!["rust".into(); MAX_INTERESTS + 1]),
            ..ProfileUpdate::default()
        };
        let errors = update.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("skill_level"));
        assert!(fields.contains_key("interests"));
        assert!(!fields.contains_key("username"));
    }

    #[test]
    fn test_quiz_numeric_id_and_missing_questions() {
        let json = r#"{"id":12,"title":"Ownership","passing_score":70.0,"time_limit":10}"#;
        let quiz: Quiz = serde_json::from_str(json).unwrap();
        assert_eq!(quiz.id, "12");
        assert!(quiz.questions.is_empty());
    }

    #[test]
    fn test_quiz_submission_omits_missing_timestamp() {
        let submission = QuizSubmission {
            quiz_id: "q1".into(),
            answers: vec![0, 2, -1],
            user_id: "7".into(),
            submitted_at: None,
        };
        let json = serde_json::to_string(&submission).unwrap();
        assert_eq!(json, r#"{"quiz_id":"q1","answers":[0,2,-1],"user_id":"7"}"#);
    }

    #[test]
    fn test_quiz_result_correct_count() {
        let json = r#"{"score":66.7,"passed":false,"correct_answers":[true,false,true],"explanations":["a","b","c"],"submitted_at":"2026-10-16T10:00:00Z"}"#;
        let result: QuizResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.correct_count(), 2);
        assert!(!result.passed);
    }

    #[test]
    fn test_content_kind_parses_snake_case_and_unknown() {
        let json = r#"{"results":[
            {"id":"a","type":"generated_answer","similarity":1.0,"text":"x"},
            {"id":2,"type":"segment","similarity":0.8,"text":"y","start_time":"00:01:00","end_time":"00:01:30","speaker":"Host"},
            {"id":"c","type":"chapter","similarity":0.1,"text":"z"}
        ]}"#;
        let response: ContentSearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.results[0].kind, ContentKind::GeneratedAnswer);
        assert_eq!(response.results[1].kind, ContentKind::Segment);
        assert_eq!(response.results[1].id, "2");
        assert_eq!(response.results[2].kind, ContentKind::Other);
    }
}
