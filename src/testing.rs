//! In-memory transport for engine tests.

use std::{
    collections::VecDeque,
    future::Future,
    sync::{Arc, Mutex},
};

use http::{HeaderValue, StatusCode};
use url::Url;

use crate::{RequestTemplate, ResilientError, Result, Transport};

pub(crate) enum Scripted {
    Respond(http::Response<String>),
    Fail(&'static str),
    Hang,
}

#[derive(Default)]
struct ScriptState {
    script: VecDeque<Scripted>,
    requests: Vec<Url>,
}

/// Replays a fixed script of outcomes, one per `send`, and records the URLs
/// it was asked for. Runs out into `500` responses.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedTransport {
    pub(crate) fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                script: script.into_iter().collect(),
                requests: Vec::new(),
            })),
        }
    }

    pub(crate) fn respond(responses: impl IntoIterator<Item = http::Response<String>>) -> Self {
        Self::new(responses.into_iter().map(Scripted::Respond))
    }

    pub(crate) fn hits(&self) -> usize {
        self.state.lock().expect("script mutex").requests.len()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("script mutex")
            .requests
            .iter()
            .map(Url::to_string)
            .collect()
    }
}

impl Transport for ScriptedTransport {
    type Response = http::Response<String>;

    fn send(
        &self,
        url: &Url,
        _request: &RequestTemplate,
    ) -> impl Future<Output = Result<Self::Response>> + Send {
        let next = {
            let mut state = self.state.lock().expect("script mutex");
            state.requests.push(url.clone());
            state.script.pop_front()
        };

        async move {
            match next {
                Some(Scripted::Respond(response)) => Ok(response),
                Some(Scripted::Fail(message)) => Err(ResilientError::Transport(message.into())),
                Some(Scripted::Hang) => std::future::pending().await,
                None => Ok(response(500)),
            }
        }
    }
}

pub(crate) fn response(status: u16) -> http::Response<String> {
    response_with(status, &[])
}

pub(crate) fn response_with(status: u16, headers: &[(&'static str, &str)]) -> http::Response<String> {
    let mut response = http::Response::new(String::new());
    *response.status_mut() = StatusCode::from_u16(status).expect("valid status code");
    for (name, value) in headers {
        response
            .headers_mut()
            .append(*name, HeaderValue::from_str(value).expect("valid header value"));
    }
    response
}

pub(crate) fn url(input: &str) -> Url {
    Url::parse(input).expect("valid test url")
}
