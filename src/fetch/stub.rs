use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use super::client::HttpClient;

/// A request as the stub saw it, after any wrappers ran.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: HeaderMap,
}

#[derive(Default)]
struct State {
    responses: VecDeque<(u16, String)>,
    requests: Vec<RecordedRequest>,
}

/// Answers requests with queued canned responses (404 once the queue is empty)
/// and records what it was sent. Clones share state.
#[derive(Clone, Default)]
pub struct StubClient {
    state: Arc<Mutex<State>>,
}

impl StubClient {
    pub fn respond(&self, status: u16, body: &str) -> &Self {
        self.state.lock().unwrap().responses.push_back((status, body.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl HttpClient for StubClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let (status, body) = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(RecordedRequest {
                url: req.url().to_string(),
                headers: req.headers().clone(),
            });
            state.responses.pop_front().unwrap_or((404, String::new()))
        };

        let response = http::Response::builder().status(status).body(body).unwrap();
        Ok(reqwest::Response::from(response))
    }
}
