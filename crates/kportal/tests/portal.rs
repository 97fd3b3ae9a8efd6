//! End-to-end tests for the portal: builder → session → services, over a
//! scripted transport.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use kportal::prelude::*;
use kportal::transport::Method;
use kportal::transport::testing::ScriptedTransport;
use serde_json::Value;

// =========================================================================
// Helpers
// =========================================================================

fn make_token(sub: &str, expires_in: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + expires_in;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"{sub}","exp":{exp}}}"#));
    format!("{header}.{payload}.sig")
}

const USER: &str = r#"{"id":7,"email":"ada@example.com","username":"ada","full_name":"Ada Lovelace","skill_level":"beginner","interests":["rust"]}"#;

fn portal(transport: &ScriptedTransport) -> Portal<ScriptedTransport> {
    Portal::builder().build_with_transport(transport.clone(), MemoryStore::new())
}

/// A portal holding a live token pair and the cached user.
async fn logged_in(transport: &ScriptedTransport) -> Portal<ScriptedTransport> {
    let token = make_token("ada@example.com", 3600);
    transport
        .respond(
            Method::Post,
            "/auth/login",
            200,
            format!(
                r#"{{"access_token":"{token}","token_type":"bearer","refresh_token":"refresh-1"}}"#
            ),
        )
        .respond(Method::Get, "/auth/me", 200, USER);

    let portal = portal(transport);
    portal
        .session()
        .login(&Credentials::new("ada@example.com", "correct horse"))
        .await
        .unwrap();
    portal
}

fn last_body(transport: &ScriptedTransport, method: Method, path: &str) -> Value {
    let request = transport
        .requests()
        .into_iter()
        .rev()
        .find(|r| r.method == method && r.path == path)
        .expect("request was sent");
    serde_json::from_slice(request.body.as_deref().expect("request has a body")).unwrap()
}

// =========================================================================
// Session through the portal
// =========================================================================

#[tokio::test]
async fn test_login_then_guard_renders_cached_user() {
    let transport = ScriptedTransport::new();
    let portal = logged_in(&transport).await;

    let decision = portal.session().check_route("/dashboard").await;
    match decision {
        RouteDecision::Render(user) => assert_eq!(user.username, "ada"),
        other => panic!("expected render, got {other:?}"),
    }
    // The cached user answered; no second /auth/me.
    assert_eq!(transport.count(Method::Get, "/auth/me"), 1);
}

#[tokio::test]
async fn test_guard_without_session_records_return_path() {
    let transport = ScriptedTransport::new();
    let portal = portal(&transport);

    let decision = portal.session().check_route("/quizzes/42").await;
    assert_eq!(
        decision,
        RouteDecision::RedirectToLogin {
            login_path: "/login".into(),
            return_to: Some("/quizzes/42".into()),
        }
    );
    assert_eq!(portal.session().take_return_path().as_deref(), Some("/quizzes/42"));
    assert_eq!(portal.session().take_return_path(), None);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_invalid_credentials_user_message() {
    let transport = ScriptedTransport::new();
    transport.respond(
        Method::Post,
        "/auth/login",
        401,
        r#"{"detail":"Incorrect email or password"}"#,
    );
    let portal = portal(&transport);

    let err: PortalError = portal
        .session()
        .login(&Credentials::new("ada@example.com", "wrong"))
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.user_message(), "Invalid email or password");
    assert!(portal.session().get_token().is_none());
}

// =========================================================================
// Quizzes
// =========================================================================

#[tokio::test]
async fn test_available_quizzes_refreshes_once_on_401() {
    let transport = ScriptedTransport::new();
    let portal = logged_in(&transport).await;

    let renewed = make_token("ada@example.com", 7200);
    transport
        .respond(Method::Get, "/quizzes/available", 401, r#"{"detail":"expired"}"#)
        .respond(
            Method::Get,
            "/quizzes/available",
            200,
            r#"[{"id":1,"title":"Ownership","questions":null,"passing_score":70,"time_limit":600}]"#,
        )
        .respond(
            Method::Post,
            "/auth/refresh",
            200,
            format!(r#"{{"access_token":"{renewed}"}}"#),
        );

    let quizzes = portal.quizzes().available().await.unwrap();
    assert_eq!(quizzes.len(), 1);
    assert_eq!(quizzes[0].id, "1");
    assert!(quizzes[0].questions.is_empty());

    assert_eq!(transport.count(Method::Post, "/auth/refresh"), 1);
    assert_eq!(transport.count(Method::Get, "/quizzes/available"), 2);
    assert_eq!(portal.session().get_token(), Some(renewed.clone()));

    let refresh = last_body(&transport, Method::Post, "/auth/refresh");
    assert_eq!(refresh["email"], "ada@example.com");
    assert_eq!(refresh["refresh_token"], "refresh-1");

    let retried = transport.requests().pop().unwrap();
    assert_eq!(
        retried.header("Authorization"),
        Some(format!("Bearer {renewed}").as_str())
    );
}

#[tokio::test]
async fn test_submit_quiz_fills_timestamp() {
    let transport = ScriptedTransport::new();
    let portal = logged_in(&transport).await;
    transport.respond(
        Method::Post,
        "/quizzes/submit",
        200,
        r#"{"score":50.0,"passed":false,"correct_answers":[true,false],"explanations":["a","b"],"submitted_at":"2026-10-16T10:00:00Z"}"#,
    );

    let result = portal
        .quizzes()
        .submit(QuizSubmission {
            quiz_id: "q1".into(),
            answers: vec![0, 2],
            user_id: "7".into(),
            submitted_at: None,
        })
        .await
        .unwrap();
    assert_eq!(result.correct_count(), 1);

    let body = last_body(&transport, Method::Post, "/quizzes/submit");
    let stamp = body["submitted_at"].as_str().expect("timestamp was filled");
    assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok(), "{stamp}");
    assert_eq!(body["answers"], serde_json::json!([0, 2]));
}

#[tokio::test]
async fn test_submit_quiz_without_answers_sends_nothing() {
    let transport = ScriptedTransport::new();
    let portal = logged_in(&transport).await;

    let err = portal
        .quizzes()
        .submit(QuizSubmission {
            quiz_id: "q1".into(),
            answers: vec![],
            user_id: "7".into(),
            submitted_at: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Validation { field: "answers", .. }));
    assert_eq!(transport.count(Method::Post, "/quizzes/submit"), 0);
}

#[tokio::test]
async fn test_get_quiz_by_id() {
    let transport = ScriptedTransport::new();
    let portal = logged_in(&transport).await;
    transport.respond(
        Method::Get,
        "/quizzes/42",
        200,
        r#"{"id":42,"title":"Lifetimes","questions":[{"id":1,"text":"What is 'a?","options":["a","b"]}],"passing_score":70,"time_limit":300}"#,
    );

    let quiz = portal.quizzes().get("42").await.unwrap();
    assert_eq!(quiz.id, "42");
    assert_eq!(quiz.questions.len(), 1);
    assert_eq!(quiz.questions[0].options, ["a", "b"]);
}

#[tokio::test]
async fn test_generate_quiz_posts_request() {
    let transport = ScriptedTransport::new();
    let portal = logged_in(&transport).await;
    transport.respond(
        Method::Post,
        "/quizzes/generate",
        200,
        r#"{"id":"g1","title":"Generated","questions":[],"passing_score":70,"time_limit":600}"#,
    );

    let quiz = portal
        .quizzes()
        .generate(&QuizRequest {
            video_id: "v9".into(),
            difficulty_level: "beginner".into(),
            num_questions: 5,
        })
        .await
        .unwrap();
    assert_eq!(quiz.id, "g1");

    let body = last_body(&transport, Method::Post, "/quizzes/generate");
    assert_eq!(body["video_id"], "v9");
    assert_eq!(body["difficulty_level"], "beginner");
    assert_eq!(body["num_questions"], 5);
}

#[tokio::test]
async fn test_generate_quiz_zero_questions_sends_nothing() {
    let transport = ScriptedTransport::new();
    let portal = logged_in(&transport).await;

    let err = portal
        .quizzes()
        .generate(&QuizRequest {
            video_id: "v9".into(),
            difficulty_level: "beginner".into(),
            num_questions: 0,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Validation { field: "num_questions", .. }));
    assert_eq!(transport.count(Method::Post, "/quizzes/generate"), 0);
}

// =========================================================================
// Content search
// =========================================================================

#[tokio::test]
async fn test_search_splits_answer_and_orders_segments() {
    let transport = ScriptedTransport::new();
    let portal = logged_in(&transport).await;
    transport.respond(
        Method::Post,
        "/video-content-search/query",
        200,
        r#"{"results":[
            {"id":"s1","type":"segment","similarity":0.3,"text":"borrowing"},
            {"id":"ans","type":"generated_answer","similarity":1.0,"text":"**Ownership** means one owner."},
            {"id":"s2","type":"segment","similarity":0.8,"text":"ownership","speaker":"Ferris"}
        ]}"#,
    );

    let results = portal.search().search("  what is ownership? ").await.unwrap();
    let answer = generated_answer(&results).expect("answer present");
    assert_eq!(answer.id, "ans");

    let ids: Vec<&str> = relevant_segments(&results)
        .iter()
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(ids, ["s2", "s1"]);

    let body = last_body(&transport, Method::Post, "/video-content-search/query");
    assert_eq!(body["query"], "what is ownership?");
}

#[tokio::test]
async fn test_search_requires_session() {
    let transport = ScriptedTransport::new();
    let portal = portal(&transport);

    let err = portal.search().search("ownership").await.unwrap_err();
    assert!(matches!(err, PortalError::Session(SessionError::SessionExpired)));

    let err = portal.search().search("   ").await.unwrap_err();
    assert!(matches!(err, PortalError::Validation { field: "query", .. }));
    assert!(transport.requests().is_empty());
}

// =========================================================================
// Profiles
// =========================================================================

#[tokio::test]
async fn test_profile_update_invalid_sends_nothing() {
    let transport = ScriptedTransport::new();
    let portal = logged_in(&transport).await;
    let before = transport.requests().len();

    let err = portal
        .profiles()
        .update(
            UserId(7),
            ProfileUpdate {
                username: Some("ab".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Username must be between 3 and 50 characters");
    assert_eq!(transport.requests().len(), before);
}

#[tokio::test]
async fn test_profile_update_replaces_cached_user() {
    let transport = ScriptedTransport::new();
    let portal = logged_in(&transport).await;
    transport.respond(
        Method::Put,
        "/users/7/profile",
        200,
        r#"{"id":7,"email":"ada@example.com","username":"ada","skill_level":"advanced","interests":["rust","tokio"]}"#,
    );

    let user = portal
        .profiles()
        .update(
            UserId(7),
            ProfileUpdate {
                skill_level: Some("ADVANCED".into()),
                interests: Some(vec!["rust".into(), "tokio".into()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(user.skill_level.as_deref(), Some("advanced"));

    let body = last_body(&transport, Method::Put, "/users/7/profile");
    assert_eq!(body["skill_level"], "advanced");
    assert!(body.get("username").is_none(), "absent fields are not sent");

    let cached = portal.session().state().user().unwrap();
    assert_eq!(cached.interests, ["rust", "tokio"]);
}

#[tokio::test]
async fn test_profile_get_not_found() {
    let transport = ScriptedTransport::new();
    let portal = logged_in(&transport).await;

    let err = portal.profiles().get(UserId(99)).await.unwrap_err();
    assert!(matches!(err, PortalError::Session(SessionError::NotFound)));
}

// =========================================================================
// Learning paths
// =========================================================================

#[tokio::test]
async fn test_generate_learning_path_rounds_hours_up() {
    let transport = ScriptedTransport::new();
    let portal = logged_in(&transport).await;
    transport.respond(
        Method::Post,
        "/learning-paths/generate",
        200,
        r#"{"id":"p1","title":"Async Rust","target_skills":["async"],"videos":[{"id":"v1","title":"Futures","duration":600}]}"#,
    );

    let path = portal
        .learning_paths()
        .generate(&["async".to_string()], 90, "Intermediate")
        .await
        .unwrap();
    assert_eq!(path.videos.len(), 1);

    let body = last_body(&transport, Method::Post, "/learning-paths/generate");
    assert_eq!(body["max_duration_hours"], 2);
    assert_eq!(body["difficulty_level"], "intermediate");
}

#[tokio::test]
async fn test_learning_path_list_and_progress_paths() {
    let transport = ScriptedTransport::new();
    let portal = logged_in(&transport).await;
    transport
        .respond(Method::Get, "/learning-paths?skip=10&limit=5", 200, "[]")
        .respond(
            Method::Get,
            "/learning-paths/p1/progress?user_id=7",
            200,
            r#"{"completed_videos":2,"total_videos":4,"progress_percentage":50.0}"#,
        );

    assert!(portal.learning_paths().list(10, 5).await.unwrap().is_empty());
    let progress = portal
        .learning_paths()
        .progress("p1", UserId(7))
        .await
        .unwrap();
    assert_eq!(progress.completed_videos, 2);
    assert_eq!(progress.progress_percentage, 50.0);
}

#[tokio::test]
async fn test_generate_learning_path_empty_skills_sends_nothing() {
    let transport = ScriptedTransport::new();
    let portal = logged_in(&transport).await;

    let err = portal
        .learning_paths()
        .generate(&[], 120, "beginner")
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Validation { field: "skills", .. }));
    assert_eq!(transport.count(Method::Post, "/learning-paths/generate"), 0);
}

#[tokio::test]
async fn test_create_learning_path_posts_video_ids() {
    let transport = ScriptedTransport::new();
    let portal = logged_in(&transport).await;
    transport.respond(
        Method::Post,
        "/learning-paths",
        201,
        r#"{"id":12,"title":"Tokio basics","videos":[]}"#,
    );

    let path = portal
        .learning_paths()
        .create(&LearningPathCreate {
            title: "Tokio basics".into(),
            description: "Runtime, tasks, channels".into(),
            target_skills: vec!["async".into()],
            videos: vec!["v1".into(), "v2".into()],
            difficulty_level: None,
        })
        .await
        .unwrap();
    assert_eq!(path.id, "12");

    let body = last_body(&transport, Method::Post, "/learning-paths");
    assert_eq!(body["videos"], serde_json::json!(["v1", "v2"]));
    assert!(body.get("difficulty_level").is_none());
}

#[tokio::test]
async fn test_create_learning_path_blank_title_sends_nothing() {
    let transport = ScriptedTransport::new();
    let portal = logged_in(&transport).await;

    let err = portal
        .learning_paths()
        .create(&LearningPathCreate {
            title: "  ".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Validation { field: "title", .. }));
    assert_eq!(transport.count(Method::Post, "/learning-paths"), 0);
}

#[tokio::test]
async fn test_mark_video_completed_posts_user() {
    let transport = ScriptedTransport::new();
    let portal = logged_in(&transport).await;
    transport.respond(Method::Post, "/learning-paths/p1/videos/v2/complete", 204, "");

    portal
        .learning_paths()
        .mark_video_completed("p1", "v2", UserId(7))
        .await
        .unwrap();

    let body = last_body(&transport, Method::Post, "/learning-paths/p1/videos/v2/complete");
    assert_eq!(body["user_id"], 7);
}

// =========================================================================
// Videos
// =========================================================================

#[tokio::test]
async fn test_video_lookups_hit_catalogue_paths() {
    let transport = ScriptedTransport::new();
    let portal = logged_in(&transport).await;
    transport
        .respond(
            Method::Get,
            "/videos/v1",
            200,
            r#"{"id":1,"title":"Ownership","duration":540,"category":"rust","tags":null}"#,
        )
        .respond(
            Method::Get,
            "/videos/recommended",
            200,
            r#"[{"id":"v2","title":"Borrowing"}]"#,
        )
        .respond(Method::Get, "/videos/trending", 200, "[]")
        .respond(
            Method::Get,
            "/videos/category/rust",
            200,
            r#"[{"id":"v1","title":"Ownership"},{"id":"v2","title":"Borrowing"}]"#,
        );

    let video = portal.videos().get("v1").await.unwrap();
    assert_eq!(video.id, "1");
    assert_eq!(video.category.as_deref(), Some("rust"));
    assert!(video.tags.is_empty());

    assert_eq!(portal.videos().recommended().await.unwrap()[0].id, "v2");
    assert!(portal.videos().trending().await.unwrap().is_empty());
    assert_eq!(portal.videos().by_category("rust").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_video_progress_posts_percentage() {
    let transport = ScriptedTransport::new();
    let portal = logged_in(&transport).await;
    transport.respond(Method::Post, "/videos/v1/progress", 200, "null");

    portal.videos().update_progress("v1", 42.5).await.unwrap();
    let body = last_body(&transport, Method::Post, "/videos/v1/progress");
    assert_eq!(body["progress"], 42.5);

    let err = portal.videos().update_progress("v1", 120.0).await.unwrap_err();
    assert!(matches!(err, PortalError::Validation { field: "progress", .. }));
    assert_eq!(transport.count(Method::Post, "/videos/v1/progress"), 1);
}

#[tokio::test]
async fn test_video_progress_unknown_video_not_found() {
    let transport = ScriptedTransport::new();
    let portal = logged_in(&transport).await;

    let err = portal.videos().update_progress("nope", 10.0).await.unwrap_err();
    assert!(matches!(err, PortalError::Session(SessionError::NotFound)));
}
