//! Scripted in-memory transport for unit tests.

use crate::ports::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, PortError, PortResult};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

pub const TEST_BASE_URL: &str = "http://backend.test/api/v1";

#[derive(Debug, Clone)]
pub struct Reply {
    status: u16,
    body: Bytes,
    failure: Option<String>,
    delay: Option<Duration>,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Bytes::from(serde_json::to_vec(&body).unwrap()),
            failure: None,
            delay: None,
        }
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            status,
            body: Bytes::from(body.to_string()),
            failure: None,
            delay: None,
        }
    }

    pub fn fail(reason: &str) -> Self {
        Self {
            status: 0,
            body: Bytes::new(),
            failure: Some(reason.to_string()),
            delay: None,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

struct Route {
    method: HttpMethod,
    url: String,
    replies: VecDeque<Reply>,
}

/// Replies are consumed in order per route; the last one is reused.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, method: HttpMethod, path: &str, reply: Reply) {
        self.on_url(method, &format!("{}{}", TEST_BASE_URL, path), reply);
    }

    pub fn on_url(&self, method: HttpMethod, url: &str, reply: Reply) {
        let mut routes = self.routes.lock().unwrap();
        match routes.iter_mut().find(|r| r.method == method && r.url == url) {
            Some(route) => route.replies.push_back(reply),
            None => routes.push(Route {
                method,
                url: url.to_string(),
                replies: VecDeque::from([reply]),
            }),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        let url = format!("{}{}", TEST_BASE_URL, path);
        self.requests().into_iter().filter(|r| r.url == url).collect()
    }

    fn next_reply(&self, request: &HttpRequest) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .iter_mut()
            .find(|r| r.method == request.method && r.url == request.url)?;
        if route.replies.len() > 1 {
            route.replies.pop_front()
        } else {
            route.replies.front().cloned()
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> PortResult<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .next_reply(&request)
            .unwrap_or_else(|| Reply::json(404, serde_json::json!({"detail": "Not Found"})));

        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = reply.failure {
            return Err(PortError::Unreachable(reason));
        }
        Ok(HttpResponse {
            status: reply.status,
            body: reply.body,
        })
    }
}
