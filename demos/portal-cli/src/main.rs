//! Command-line demo: log in, ask the content search a question, and type
//! the generated answer out character by character.
//!
//! ```text
//! KPORTAL_USER=ada@example.com KPORTAL_PASSWORD=... \
//!     cargo run -p portal-cli -- "what is ownership?"
//! ```
//!
//! Environment:
//! - `KPORTAL_API_URL`: backend base URL (default `http://localhost:8000/api/v1`)
//! - `KPORTAL_USER` / `KPORTAL_PASSWORD`: credentials, needed unless a
//!   saved session is still valid
//! - `KPORTAL_TOKEN_FILE`: where to keep the session between runs
//! - `RUST_LOG`: log filter (default `info`)
//!
//! Press Ctrl-C while the answer is being typed to show it all at once.

use std::io::Write;
use std::time::Duration;

use crossterm::cursor::{RestorePosition, SavePosition};
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use crossterm::{execute, queue};
use kportal::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let base_url =
        std::env::var("KPORTAL_API_URL").unwrap_or_else(|_| kportal::DEFAULT_BASE_URL.to_string());
    let token_file = std::env::var("KPORTAL_TOKEN_FILE")
        .unwrap_or_else(|_| ".kportal-session.json".to_string());
    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");

    let store = FileStore::open(&token_file)?;
    let portal = Portal::builder()
        .base_url(&base_url)
        .timeout(Duration::from_secs(30))
        .build_with_store(store)?;

    if let Err(err) = ensure_session(&portal).await {
        eprintln!("{}", err.user_message());
        std::process::exit(1);
    }

    if query.trim().is_empty() {
        list_quizzes(&portal).await;
        return Ok(());
    }

    let results = match portal.search().search(&query).await {
        Ok(results) => results,
        Err(err) => {
            eprintln!("{}", err.user_message());
            std::process::exit(1);
        }
    };

    match generated_answer(&results) {
        Some(answer) => type_out(&answer.text).await?,
        None => println!("No answer generated for that question."),
    }

    let segments = relevant_segments(&results);
    if !segments.is_empty() {
        println!("\nRelated moments:");
        for segment in segments.iter().take(5) {
            let at = segment.start_time.as_deref().unwrap_or("?");
            println!("  [{at}] ({:.0}%) {}", segment.similarity * 100.0, segment.text);
        }
    }
    Ok(())
}

/// Reuses a saved session when the guard accepts it, else logs in from
/// the environment.
async fn ensure_session<T: Transport, S: TokenStore>(
    portal: &Portal<T, S>,
) -> Result<(), PortalError> {
    if let RouteDecision::Render(user) = portal.session().check_route("/").await {
        info!(user = %user.username, "resumed saved session");
        return Ok(());
    }

    let (Ok(username), Ok(password)) = (
        std::env::var("KPORTAL_USER"),
        std::env::var("KPORTAL_PASSWORD"),
    ) else {
        return Err(SessionError::SessionExpired.into());
    };
    portal
        .session()
        .login(&Credentials::new(username, password))
        .await?;
    if let Some(user) = portal.session().state().user() {
        println!("Welcome, {}!", user.full_name.as_deref().unwrap_or(&user.username));
    }
    Ok(())
}

async fn list_quizzes<T: Transport, S: TokenStore>(portal: &Portal<T, S>) {
    match portal.quizzes().available().await {
        Ok(quizzes) if quizzes.is_empty() => println!("No quizzes available yet."),
        Ok(quizzes) => {
            println!("Available quizzes:");
            for quiz in quizzes {
                println!("  {} ({} questions)", quiz.title, quiz.questions.len());
            }
        }
        Err(err) => warn!(error = %err, "could not list quizzes"),
    }
}

/// Reveals `text` in place, redrawing the formatted prefix on every frame.
async fn type_out(text: &str) -> Result<(), Box<dyn std::error::Error>> {
    let handle = spawn_reveal(text, RevealConfig::default());
    let mut frames = handle.subscribe();

    // Each frame restores the saved cursor and redraws below it.
    execute!(std::io::stdout(), SavePosition)?;
    redraw(&frames.borrow_and_update().clone())?;
    while !handle.frame().complete {
        tokio::select! {
            changed = frames.changed() => {
                if changed.is_err() {
                    break;
                }
                let frame = frames.borrow_and_update().clone();
                redraw(&frame)?;
                if frame.complete {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                handle.skip().await?;
            }
        }
    }
    println!();
    handle.shutdown().await;
    Ok(())
}

fn redraw(frame: &RevealFrame) -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    queue!(
        out,
        RestorePosition,
        Clear(ClearType::FromCursorDown),
        Print(render_ansi(&format_spans(&frame.displayed))),
    )?;
    out.flush()
}
