use std::time::Duration;

use readbatch_core::TaskId;
use readbatch_logging::{batch_debug, batch_warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use serde_json::{json, Value};

use crate::{Book, ClientError, ProgressBatch, ProgressEntry, ProgressPayload, StartTask, StartedTask};

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Upper bound for a whole request, so a hung call cannot stall the batch.
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Which book list to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookQuery<'a> {
    Recommended,
    Indicated,
    Search(&'a str),
}

impl BookQuery<'_> {
    pub fn label(&self) -> &'static str {
        match self {
            BookQuery::Recommended => "recommended",
            BookQuery::Indicated => "indicated",
            BookQuery::Search(_) => "search",
        }
    }

    fn endpoint(&self) -> &'static str {
        match self {
            BookQuery::Recommended => "/books/recommended",
            BookQuery::Indicated => "/books/indicated",
            BookQuery::Search(_) => "/books/search",
        }
    }
}

/// The four remote operations the engine relies on.
#[async_trait::async_trait]
pub trait BookApi: Send + Sync {
    /// Returns the session token.
    async fn login(&self, login: &str, password: &str) -> Result<String, ClientError>;

    /// An empty list is not an error here; callers decide what it means.
    async fn find_books(&self, query: BookQuery<'_>, token: &str) -> Result<Vec<Book>, ClientError>;

    async fn start_task(&self, token: &str, request: &StartTask) -> Result<StartedTask, ClientError>;

    /// Empty `task_ids` returns an empty batch without touching the network.
    async fn fetch_progress(&self, task_ids: &[TaskId]) -> Result<ProgressBatch, ClientError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestBookApi {
    base_url: Url,
    client: reqwest::Client,
}

struct RawResponse {
    status: StatusCode,
    body: String,
}

impl ReqwestBookApi {
    pub fn new(settings: ClientSettings) -> Result<Self, ClientError> {
        let base_url = Url::parse(settings.base_url.trim())
            .map_err(|err| ClientError::InvalidUrl(format!("{}: {err}", settings.base_url)))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(map_reqwest_error)?;
        Ok(Self { base_url, client })
    }

    fn url(&self, endpoint: &str) -> Result<Url, ClientError> {
        let joined = format!(
            "{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            endpoint
        );
        Url::parse(&joined).map_err(|err| ClientError::InvalidUrl(format!("{joined}: {err}")))
    }

    async fn post(&self, endpoint: &str, payload: &Value) -> Result<RawResponse, ClientError> {
        let url = self.url(endpoint)?;
        batch_debug!("POST {}", url);
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_string());
        send(request, endpoint).await
    }

    /// Success body of a book endpoint as JSON; `Null` for 204.
    async fn post_api(&self, endpoint: &str, payload: &Value) -> Result<Value, ClientError> {
        let response = self.post(endpoint, payload).await?;
        api_json(response, endpoint)
    }
}

#[async_trait::async_trait]
impl BookApi for ReqwestBookApi {
    async fn login(&self, login: &str, password: &str) -> Result<String, ClientError> {
        let response = self
            .post("/login", &json!({ "login": login, "password": password }))
            .await?;

        if !response.status.is_success() {
            let message = extract_error_message(&response.body)
                .unwrap_or_else(|| format!("login failed ({})", response.status));
            return Err(ClientError::Auth {
                status: Some(response.status.as_u16()),
                message,
            });
        }

        let token = serde_json::from_str::<Value>(&response.body)
            .ok()
            .and_then(|body| body.get("token").and_then(Value::as_str).map(str::to_string))
            .filter(|token| !token.is_empty());
        token.ok_or_else(|| ClientError::Auth {
            status: Some(response.status.as_u16()),
            message: "token missing from login response".to_string(),
        })
    }

    async fn find_books(&self, query: BookQuery<'_>, token: &str) -> Result<Vec<Book>, ClientError> {
        let payload = match query {
            BookQuery::Search(term) => json!({ "token": token, "term": term }),
            BookQuery::Recommended | BookQuery::Indicated => json!({ "token": token }),
        };
        let body = self.post_api(query.endpoint(), &payload).await?;

        let Value::Array(items) = body else {
            batch_warn!("{} returned a non-list body; treating as empty", query.endpoint());
            return Ok(Vec::new());
        };
        let books = items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<Book>(item) {
                Ok(book) => Some(book),
                Err(err) => {
                    batch_warn!("skipping malformed book from {}: {}", query.endpoint(), err);
                    None
                }
            })
            .collect();
        Ok(books)
    }

    async fn start_task(&self, token: &str, request: &StartTask) -> Result<StartedTask, ClientError> {
        const ENDPOINT: &str = "/start_read_book_task";
        let payload = json!({
            "token": token,
            "refer_id": request.task_id.as_str(),
            "book_slug": request.book.slug,
            "book_name": request.book.name,
            "read_time_minutes": request.targets.read_time,
            "read_percentage": request.targets.read_percentage,
            "answer_questions": true,
            "max_answered_questions": request.targets.max_questions,
        });
        let body = self.post_api(ENDPOINT, &payload).await?;

        let echoed = body.get("refer_id").and_then(Value::as_str);
        if echoed != Some(request.task_id.as_str()) {
            return Err(contract_error(
                ENDPOINT,
                format!(
                    "echoed refer_id {:?} does not match {}",
                    echoed, request.task_id
                ),
            ));
        }

        let initial_status = body
            .get("initial_status")
            .filter(|status| status.is_object())
            .and_then(|status| serde_json::from_value::<ProgressEntry>(status.clone()).ok())
            .filter(|entry| entry.status.as_deref().is_some_and(|s| !s.is_empty()));

        Ok(StartedTask {
            task_id: request.task_id.clone(),
            initial_status,
        })
    }

    async fn fetch_progress(&self, task_ids: &[TaskId]) -> Result<ProgressBatch, ClientError> {
        const ENDPOINT: &str = "/get_progress";
        if task_ids.is_empty() {
            return Ok(ProgressBatch::new());
        }

        let mut url = self.url(ENDPOINT)?;
        {
            let mut pairs = url.query_pairs_mut();
            for id in task_ids {
                pairs.append_pair("refer_ids", id.as_str());
            }
        }
        batch_debug!("GET {} ({} ids)", ENDPOINT, task_ids.len());
        let response = send(self.client.get(url), ENDPOINT).await?;
        let body = api_json(response, ENDPOINT)?;

        let Value::Object(entries) = body else {
            return Err(contract_error(ENDPOINT, "progress body is not an object"));
        };
        Ok(entries
            .into_iter()
            .map(|(id, value)| (id, parse_progress(value)))
            .collect())
    }
}

fn parse_progress(value: Value) -> ProgressPayload {
    if !value.is_object() {
        return ProgressPayload::Malformed(value);
    }
    match serde_json::from_value::<ProgressEntry>(value.clone()) {
        Ok(entry) => ProgressPayload::Entry(entry),
        Err(_) => ProgressPayload::Malformed(value),
    }
}

async fn send(request: reqwest::RequestBuilder, endpoint: &str) -> Result<RawResponse, ClientError> {
    let response = request.send().await.map_err(map_reqwest_error)?;
    let status = response.status();
    batch_debug!("{} responded {}", endpoint, status.as_u16());
    let body = response.text().await.map_err(map_reqwest_error)?;
    Ok(RawResponse { status, body })
}

fn api_json(response: RawResponse, endpoint: &str) -> Result<Value, ClientError> {
    if !response.status.is_success() {
        let message = extract_error_message(&response.body).unwrap_or_else(|| {
            let text = response.body.trim();
            if text.is_empty() {
                response.status.to_string()
            } else {
                text.to_string()
            }
        });
        return Err(ClientError::Api {
            status: Some(response.status.as_u16()),
            endpoint: endpoint.to_string(),
            message,
        });
    }
    if response.status == StatusCode::NO_CONTENT {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body).map_err(|err| {
        batch_warn!("{} returned {} with invalid JSON: {}", endpoint, response.status, err);
        contract_error(endpoint, "invalid JSON response")
    })
}

fn contract_error(endpoint: &str, message: impl Into<String>) -> ClientError {
    ClientError::Api {
        status: None,
        endpoint: endpoint.to_string(),
        message: message.into(),
    }
}

/// Pulls a human message out of `{detail:{message}}`, `{detail:"..."}` or `{message}`.
fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail") {
        Some(Value::Object(detail)) => {
            if let Some(message) = detail.get("message").and_then(Value::as_str) {
                return Some(message.to_string());
            }
        }
        Some(Value::String(detail)) => return Some(detail.clone()),
        _ => {}
    }
    value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn map_reqwest_error(err: reqwest::Error) -> ClientError {
    ClientError::Network {
        timeout: err.is_timeout(),
        message: err.to_string(),
    }
}
