//! Authenticated session management for kportal.
//!
//! This crate owns everything about "who is logged in":
//!
//! 1. **Tokens**: decoding expiry from the bearer token, failing closed
//!    on anything unreadable ([`token`])
//! 2. **Persistence**: the access/refresh token pair in a [`TokenStore`]
//! 3. **Renewal**: a single [`RefreshTimer`] firing ahead of expiry, and
//!    one refresh-and-retry on `401`
//! 4. **Gating**: the route guard ([`SessionClient::check_route`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Services (above)  ← quiz, search, profile, learning-path calls
//!     ↕
//! Session Layer (this crate)  ← token lifecycle, authorized requests
//!     ↕
//! Protocol + Transport (below)  ← typed bodies, HTTP
//! ```

mod client;
mod config;
mod error;
mod guard;
mod refresh;
mod state;
mod storage;
pub mod token;

pub use client::SessionClient;
pub use config::SessionConfig;
pub use error::SessionError;
pub use guard::RouteDecision;
pub use refresh::RefreshTimer;
pub use state::AppState;
pub use storage::{FileStore, MemoryStore, TokenStore};
