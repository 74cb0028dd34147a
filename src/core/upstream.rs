use crate::core::classifier::{classify, classify_transport, ClassifiedError, ErrorKind};
use crate::core::retry::RetryPolicy;
use crate::utils::error::{GatewayError, Result};
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Placeholder substituted with the lookup key in not-found messages.
pub const ID_PLACEHOLDER: &str = "{id}";

type Fetched<T> = std::result::Result<T, ClassifiedError>;

/// Client for one JSON-over-HTTP upstream dependency.
///
/// Every call goes through [`classify`] and the configured [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    name: String,
    base_url: Url,
    client: Client,
    retry: RetryPolicy,
    request_timeout: Option<Duration>,
    not_found_message: Option<String>,
}

impl UpstreamClient {
    pub fn new(name: impl Into<String>, base_url: &str, retry: RetryPolicy) -> Result<Self> {
        Self::with_client(name, base_url, retry, Client::new())
    }

    /// `timeout` bounds each `fetch_*` call end to end. Feeds opened with
    /// [`UpstreamClient::stream`] only have it applied to connecting.
    pub fn with_timeout(
        name: impl Into<String>,
        base_url: &str,
        retry: RetryPolicy,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.connect_timeout(timeout);
        }
        let mut upstream = Self::with_client(name, base_url, retry, builder.build()?)?;
        upstream.request_timeout = timeout;
        Ok(upstream)
    }

    pub fn with_client(
        name: impl Into<String>,
        base_url: &str,
        retry: RetryPolicy,
        client: Client,
    ) -> Result<Self> {
        let name = name.into();
        let base_url = Url::parse(base_url).map_err(|e| GatewayError::InvalidConfigValueError {
            field: format!("{}.url", name),
            value: base_url.to_string(),
            reason: format!("Invalid URL format: {}", e),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::InvalidConfigValueError {
                field: format!("{}.url", name),
                value: base_url.to_string(),
                reason: "URL cannot be used as a base".to_string(),
            });
        }

        Ok(Self {
            name,
            base_url,
            client,
            retry,
            request_timeout: None,
            not_found_message: None,
        })
    }

    /// Replaces the default not-found message. `{id}` is substituted with the
    /// lookup key.
    pub fn with_not_found_message(mut self, template: impl Into<String>) -> Self {
        self.not_found_message = Some(template.into());
        self
    }

    /// `GET {base}/{key}`
    pub async fn fetch_one<T: DeserializeOwned>(&self, key: &str) -> Fetched<T> {
        let url = self.child_url(key);
        self.retry
            .execute(|| self.get_json(url.clone(), key))
            .await
            .map_err(|error| self.describe(error, key))
    }

    /// `GET {base}?{param}={key}`
    ///
    /// A 404 here means "no related records" and yields an empty list.
    pub async fn fetch_many<T: DeserializeOwned>(
        &self,
        param: &str,
        key: &str,
    ) -> Fetched<Vec<T>> {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair(param, key);

        match self.retry.execute(|| self.get_json(url.clone(), key)).await {
            Err(error) if error.kind() == ErrorKind::NotFound => {
                tracing::debug!(
                    "{}: nothing found for {}={}, returning empty list",
                    self.name,
                    param,
                    key
                );
                Ok(Vec::new())
            }
            other => other,
        }
    }

    /// Opens `GET {base}/{path}` as a newline-delimited JSON feed.
    ///
    /// Classification and retry cover establishing the connection. Once the
    /// feed is open, a decode or read failure is yielded as the final item.
    pub async fn stream<T>(
        &self,
        path: &str,
    ) -> Fetched<BoxStream<'static, Fetched<T>>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let url = self.child_url(path);
        let response = self
            .retry
            .execute(|| self.open(url.clone(), url.path(), None))
            .await?;

        Ok(decode_ndjson(self.name.clone(), response))
    }

    fn child_url(&self, segment: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(segment);
        }
        url
    }

    async fn open(&self, url: Url, key: &str, timeout: Option<Duration>) -> Fetched<Response> {
        tracing::debug!("{}: making API request to: {}", self.name, url);
        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .await
            .map_err(|e| classify_transport(&self.name, &e))?;

        let status = response.status();
        tracing::debug!("{}: API response status: {}", self.name, status);
        if status.is_success() {
            return Ok(response);
        }

        // An unreadable error body still classifies by status, with the reason phrase.
        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            tracing::info!("{}: status code {}", self.name, status.as_u16());
        }
        Err(classify(status, &body, key))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, key: &str) -> Fetched<T> {
        let response = self.open(url, key, self.request_timeout).await?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_transport(&self.name, &e))?;

        serde_json::from_slice(&bytes).map_err(|e| {
            ClassifiedError::server(
                Some(status.as_u16()),
                format!("upstream failure: invalid payload from {}: {}", self.name, e),
            )
        })
    }

    fn describe(&self, error: ClassifiedError, key: &str) -> ClassifiedError {
        match (&self.not_found_message, error.kind()) {
            (Some(template), ErrorKind::NotFound) => {
                error.with_message(template.replace(ID_PLACEHOLDER, key))
            }
            _ => error,
        }
    }
}

fn decode_ndjson<T>(upstream: String, response: Response) -> BoxStream<'static, Fetched<T>>
where
    T: DeserializeOwned + Send + 'static,
{
    let bytes = response
        .bytes_stream()
        .map(|chunk| chunk.map(|chunk| chunk.to_vec()))
        .boxed();
    let state = NdjsonState {
        upstream,
        bytes,
        buffer: Vec::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        let item = state.next_item::<T>().await?;
        Some((item, state))
    })
    .boxed()
}

struct NdjsonState {
    upstream: String,
    bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    buffer: Vec<u8>,
    finished: bool,
}

impl NdjsonState {
    async fn next_item<T: DeserializeOwned>(&mut self) -> Option<Fetched<T>> {
        loop {
            if let Some(position) = self.buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=position).collect();
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                return Some(self.decode(&line));
            }

            if self.finished {
                if self.buffer.iter().all(u8::is_ascii_whitespace) {
                    return None;
                }
                let line = std::mem::take(&mut self.buffer);
                return Some(self.decode(&line));
            }

            match self.bytes.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    self.finished = true;
                    self.buffer.clear();
                    return Some(Err(classify_transport(&self.upstream, &e)));
                }
                None => self.finished = true,
            }
        }
    }

    fn decode<T: DeserializeOwned>(&self, line: &[u8]) -> Fetched<T> {
        serde_json::from_slice(line).map_err(|e| {
            ClassifiedError::server(
                None,
                format!("upstream failure: invalid stream item from {}: {}", self.upstream, e),
            )
        })
    }
}
