//! Scripted in-memory transport for tests.
//!
//! Responses are queued per `(method, path)`. Each request pops the front
//! of its queue; the last queued entry is sticky so a route answered once
//! keeps answering the same way. Unscripted routes answer `404`.
//! Every request is recorded for later assertions.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::{HttpRequest, HttpResponse, Method, Transport, TransportError};

#[derive(Debug, Clone)]
enum Scripted {
    Respond {
        delay: Duration,
        response: HttpResponse,
    },
    Fail(String),
}

#[derive(Debug, Default)]
struct Script {
    routes: HashMap<(Method, String), VecDeque<Scripted>>,
    log: Vec<HttpRequest>,
}

/// A cloneable handle to a shared script. Clone it before handing one copy
/// to the client so the test can keep inspecting the request log.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for `method path`.
    pub fn respond(&self, method: Method, path: &str, status: u16, body: impl Into<Vec<u8>>) -> &Self {
        self.respond_after(Duration::ZERO, method, path, status, body)
    }

    /// Queues a response that is delivered after `delay` (Tokio time).
    pub fn respond_after(
        &self,
        delay: Duration,
        method: Method,
        path: &str,
        status: u16,
        body: impl Into<Vec<u8>>,
    ) -> &Self {
        self.push(
            method,
            path,
            Scripted::Respond {
                delay,
                response: HttpResponse::new(status, body),
            },
        );
        self
    }

    /// Queues a transport-level failure (no response at all).
    pub fn fail(&self, method: Method, path: &str, message: &str) -> &Self {
        self.push(method, path, Scripted::Fail(message.to_string()));
        self
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().log.clone()
    }

    /// How many requests hit `method path`.
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.lock()
            .log
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    fn push(&self, method: Method, path: &str, entry: Scripted) {
        self.lock()
            .routes
            .entry((method, path.to_string()))
            .or_default()
            .push_back(entry);
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        // The guard must be released before the simulated delay.
        let next = {
            let mut script = self.lock();
            script.log.push(request.clone());
            script
                .routes
                .get_mut(&(request.method, request.path.clone()))
                .and_then(|queue| {
                    if queue.len() > 1 {
                        queue.pop_front()
                    } else {
                        queue.front().cloned()
                    }
                })
        };

        match next {
            Some(Scripted::Respond { delay, response }) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(response)
            }
            Some(Scripted::Fail(message)) => Err(TransportError::Network(message)),
            None => Ok(HttpResponse::new(404, r#"{"detail":"Not Found"}"#)),
        }
    }
}
