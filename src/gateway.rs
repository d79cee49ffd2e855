//! Remote issue gateway: the trait the board talks to, and its HTTP binding.

use async_trait::async_trait;
use boardsync_common::{Issue, IssuePatch, IssueStatus, IssueType, NewIssue, Priority};
use reqwest::{Method, RequestBuilder, StatusCode, Url, header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::errors::GatewayError;

/// Stop following pagination after this many pages.
const MAX_PAGES: u32 = 100;

/// Issue operations the board needs from the backend.
/// Real implementation: `HttpGateway`. Test double: `testing::MockGateway`.
#[async_trait]
pub trait IssueGateway: Send + Sync {
    async fn fetch_project_issues(&self, project_id: &str) -> Result<Vec<Issue>, GatewayError>;

    async fn update_issue_status(&self, id: &str, status: IssueStatus) -> Result<Issue, GatewayError>;

    async fn update_issue_fields(&self, id: &str, patch: &IssuePatch) -> Result<Issue, GatewayError>;

    async fn create_issue(&self, new: &NewIssue) -> Result<Issue, GatewayError>;

    async fn delete_issue(&self, id: &str) -> Result<(), GatewayError>;
}

// ── Wire envelopes ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct Page {
    data: Vec<serde_json::Value>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    #[serde(default)]
    has_next: bool,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

#[derive(Serialize)]
struct StatusBody {
    status: IssueStatus,
}

/// PATCH body for a partial update. Unset fields are omitted, cleared
/// nullable fields are sent as `null`.
#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct UpdateIssueBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a Option<String>>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    issue_type: Option<IssueType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<IssueStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assignee_id: Option<&'a Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    epic_id: Option<&'a Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label_ids: Option<Vec<&'a str>>,
    #[serde(rename = "estimate", skip_serializing_if = "Option::is_none")]
    story_points: Option<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_date: Option<&'a Option<String>>,
}

impl<'a> From<&'a IssuePatch> for UpdateIssueBody<'a> {
    fn from(patch: &'a IssuePatch) -> Self {
        Self {
            title: patch.title.as_deref(),
            description: patch.description.as_ref(),
            issue_type: patch.issue_type,
            status: patch.status,
            priority: patch.priority,
            assignee_id: patch.assignee_id.as_ref(),
            epic_id: patch.epic_id.as_ref(),
            label_ids: patch
                .labels
                .as_ref()
                .map(|labels| labels.iter().map(|l| l.id.as_str()).collect()),
            story_points: patch.story_points,
            due_date: patch.due_date.as_ref(),
        }
    }
}

/// Decode a page of raw issue records, skipping ones this client cannot
/// represent (for example a status it does not know).
pub(crate) fn decode_issues(values: Vec<serde_json::Value>) -> Vec<Issue> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Issue>(value) {
            Ok(issue) => Some(issue),
            Err(e) => {
                warn!(error = %e, "skipping undecodable issue record");
                None
            }
        })
        .collect()
}

// ── HTTP binding ──────────────────────────────────────────────────────

/// `IssueGateway` over the backend's JSON REST API.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
    page_size: u32,
    max_pages: u32,
}

impl HttpGateway {
    pub fn new(config: &ApiConfig) -> Result<Self, GatewayError> {
        let invalid = |reason: String| GatewayError::InvalidUrl {
            url: config.url.clone(),
            reason,
        };
        let base_url = Url::parse(&config.url).map_err(|e| invalid(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("not a base URL".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            base_url,
            token: config.token.clone(),
            page_size: config.page_size,
            max_pages: MAX_PAGES,
        })
    }

    /// Cap on pages followed by `fetch_project_issues`.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Base URL with `segments` appended. Each segment is percent-encoded,
    /// so ids containing `/`, `?` or `#` stay one path segment.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let builder = self
            .client
            .request(method, self.url(segments))
            .header(header::ACCEPT, "application/json");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and return the raw body of a successful response.
    async fn send_raw(&self, builder: RequestBuilder) -> Result<Vec<u8>, GatewayError> {
        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        debug!(status = status.as_u16(), len = body.len(), "gateway response");

        if status == StatusCode::UNAUTHORIZED {
            return Err(GatewayError::Unauthorized);
        }
        if !status.is_success() {
            return Err(match serde_json::from_slice::<ErrorEnvelope>(&body) {
                Ok(env) => GatewayError::rejected(status.as_u16(), env.error.code, env.error.message),
                Err(_) => GatewayError::rejected(
                    status.as_u16(),
                    "HTTP_ERROR",
                    status.canonical_reason().unwrap_or("request failed"),
                ),
            });
        }
        Ok(body.to_vec())
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, GatewayError> {
        let body = self.send_raw(builder).await?;
        serde_json::from_slice::<Envelope<T>>(&body)
            .map(|env| env.data)
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl IssueGateway for HttpGateway {
    async fn fetch_project_issues(&self, project_id: &str) -> Result<Vec<Issue>, GatewayError> {
        let mut issues = Vec::new();
        let mut page = 1;
        loop {
            let builder = self
                .request(Method::GET, &["projects", project_id, "issues"])
                .query(&[("page", page), ("limit", self.page_size)]);
            let body = self.send_raw(builder).await?;
            let page_data: Page = serde_json::from_slice(&body)
                .map_err(|e| GatewayError::Decode(e.to_string()))?;
            issues.extend(decode_issues(page_data.data));

            if !page_data.pagination.is_some_and(|p| p.has_next) {
                break;
            }
            if page >= self.max_pages {
                warn!(project_id, pages = page, count = issues.len(), "page limit reached; board is incomplete");
                break;
            }
            page += 1;
        }
        debug!(project_id, count = issues.len(), "fetched project issues");
        Ok(issues)
    }

    async fn update_issue_status(&self, id: &str, status: IssueStatus) -> Result<Issue, GatewayError> {
        let builder = self
            .request(Method::PATCH, &["issues", id, "status"])
            .json(&StatusBody { status });
        self.send(builder).await
    }

    async fn update_issue_fields(&self, id: &str, patch: &IssuePatch) -> Result<Issue, GatewayError> {
        let builder = self
            .request(Method::PATCH, &["issues", id])
            .json(&UpdateIssueBody::from(patch));
        self.send(builder).await
    }

    async fn create_issue(&self, new: &NewIssue) -> Result<Issue, GatewayError> {
        let builder = self.request(Method::POST, &["issues"]).json(new);
        self.send(builder).await
    }

    async fn delete_issue(&self, id: &str) -> Result<(), GatewayError> {
        let builder = self.request(Method::DELETE, &["issues", id]);
        self.send_raw(builder).await.map(|_| ())
    }
}
