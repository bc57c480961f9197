use crate::auth::{AppOnlyAuthenticator, RedditToken};
use crate::metrics::{ApiMetrics, MetricsCollector, RequestMetrics};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, Response, StatusCode};
use sentiscope_core::{CoreError, RedditApiError, ResolvedCredentials};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

const REDDIT_API_BASE: &str = "https://oauth.reddit.com";
const MAX_PAGE_SIZE: u32 = 100;
const COMMENT_FETCH_LIMIT: u32 = 100;
// Bounds reply nesting in the comment tree response.
const COMMENT_FETCH_DEPTH: u32 = 2;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub permalink: String,
    pub created_utc: f64,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub num_comments: u32,
}

/// A comment node's `replies` is either a nested listing or an empty string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CommentReplies {
    Thread(CommentListing),
    Empty(IgnoredAny),
}

impl Default for CommentReplies {
    fn default() -> Self {
        CommentReplies::Empty(IgnoredAny)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentListing {
    pub data: CommentListingData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentListingData {
    pub children: Vec<CommentNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum CommentNode {
    #[serde(rename = "t1")]
    Comment(RedditCommentData),
    /// Placeholder for comments Reddit did not include in the response.
    #[serde(rename = "more")]
    More(MoreCommentsData),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditCommentData {
    pub id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub author: String,
    pub created_utc: f64,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub replies: CommentReplies,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoreCommentsData {
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub children: Vec<String>,
}

/// A search hit reduced to what the collector needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

fn timestamp_from_epoch(created_utc: f64) -> Result<DateTime<Utc>, CoreError> {
    if !created_utc.is_finite() {
        return Err(invalid_response(format!("bad timestamp {}", created_utc)));
    }
    Utc.timestamp_opt(created_utc.trunc() as i64, 0)
        .single()
        .ok_or_else(|| invalid_response(format!("bad timestamp {}", created_utc)))
}

fn invalid_response(details: impl Into<String>) -> CoreError {
    CoreError::RedditApi(RedditApiError::InvalidResponse {
        details: details.into(),
        source: None,
    })
}

fn undecodable_response(details: impl Into<String>, source: reqwest::Error) -> CoreError {
    CoreError::RedditApi(RedditApiError::InvalidResponse {
        details: details.into(),
        source: Some(source),
    })
}

impl TryFrom<RedditPostData> for Submission {
    type Error = CoreError;

    fn try_from(post_data: RedditPostData) -> Result<Self, Self::Error> {
        Ok(Self {
            created_at: timestamp_from_epoch(post_data.created_utc)?,
            id: post_data.id,
            title: post_data.title,
        })
    }
}

impl TryFrom<RedditCommentData> for Comment {
    type Error = CoreError;

    fn try_from(comment_data: RedditCommentData) -> Result<Self, Self::Error> {
        Ok(Self {
            created_at: timestamp_from_epoch(comment_data.created_utc)?,
            id: comment_data.id,
            body: comment_data.body,
        })
    }
}

/// Flattens a comment tree breadth-first, so top-level comments come first in API order.
/// `more` placeholders are dropped rather than resolved.
pub fn flatten_comment_tree(nodes: Vec<CommentNode>) -> Vec<RedditCommentData> {
    let mut queue: VecDeque<CommentNode> = nodes.into();
    let mut flat = Vec::new();

    while let Some(node) = queue.pop_front() {
        match node {
            CommentNode::Comment(mut comment) => {
                if let CommentReplies::Thread(replies) = std::mem::take(&mut comment.replies) {
                    queue.extend(replies.data.children);
                }
                flat.push(comment);
            }
            CommentNode::More(more) => {
                debug!("Dropping placeholder for {} unloaded comments", more.count);
            }
        }
    }

    flat
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    api_base: Url,
    token_url: Option<String>,
    metrics: Arc<MetricsCollector>,
    user_agent: String,
    token: Option<RedditToken>,
}

impl RedditApiClient {
    pub fn new(user_agent: String) -> Result<Self, CoreError> {
        Self::with_timeout(user_agent, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(user_agent: String, timeout: Duration) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                error!("Failed to create HTTP client: {}", e);
                CoreError::RedditApi(RedditApiError::Transport { source: e })
            })?;

        let api_base = Url::parse(REDDIT_API_BASE)
            .map_err(|e| CoreError::invalid_input(format!("invalid API base: {}", e)))?;

        Ok(Self {
            http_client,
            api_base,
            token_url: None,
            metrics: Arc::new(MetricsCollector::new()),
            user_agent,
            token: None,
        })
    }

    /// Points the client at another API host, e.g. a local stand-in.
    pub fn with_api_base(mut self, api_base: Url) -> Self {
        self.api_base = api_base;
        self
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = Some(token_url.into());
        self
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn set_token(&mut self, token: RedditToken) {
        self.token = Some(token);
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.as_ref().is_some_and(|token| !token.is_expired())
    }

    /// Fetches an app-only token unless a valid one is already held.
    pub async fn authenticate(&mut self, credentials: &ResolvedCredentials) -> Result<(), CoreError> {
        if self.is_authenticated() {
            debug!("Reusing cached access token");
            return Ok(());
        }

        let authenticator = match &self.token_url {
            Some(token_url) => AppOnlyAuthenticator::with_token_url(credentials, token_url)?,
            None => AppOnlyAuthenticator::new(credentials)?,
        };

        let start_time = Instant::now();
        let result = authenticator.fetch_token().await;
        self.metrics
            .record_request(RequestMetrics {
                endpoint: "access_token".to_string(),
                status_code: None,
                response_time: start_time.elapsed(),
                success: result.is_ok(),
                rate_limited: false,
            })
            .await;

        self.token = Some(result?);
        info!("Authenticated against Reddit API");
        Ok(())
    }

    async fn make_request(
        &self,
        endpoint_name: &str,
        path: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Response, CoreError> {
        let access_token = match &self.token {
            Some(token) if !token.is_expired() => token.access_token.as_str(),
            _ => return Err(CoreError::RedditApi(RedditApiError::InvalidToken)),
        };

        let url = self.api_base.join(path).map_err(|e| {
            CoreError::invalid_input(format!("invalid request path {}: {}", path, e))
        })?;

        let start_time = Instant::now();
        info!("Making Reddit API request: GET {}", path);
        let outcome = self
            .http_client
            .get(url)
            .bearer_auth(access_token)
            .query(query_params)
            .send()
            .await;

        let (status_code, result) = match outcome {
            Ok(response) => {
                let status = response.status();
                debug!("Received {} for {}", status, path);
                (Some(status.as_u16()), check_status(response, path))
            }
            Err(e) => {
                error!("Network error for GET {}: {}", path, e);
                let error = if e.is_timeout() {
                    RedditApiError::RequestTimeout { source: e }
                } else {
                    RedditApiError::Transport { source: e }
                };
                (None, Err(CoreError::RedditApi(error)))
            }
        };

        self.metrics
            .record_request(RequestMetrics {
                endpoint: endpoint_name.to_string(),
                status_code,
                response_time: start_time.elapsed(),
                success: result.is_ok(),
                rate_limited: status_code == Some(StatusCode::TOO_MANY_REQUESTS.as_u16()),
            })
            .await;

        result
    }

    /// Searches one subreddit, newest first, following `after` cursors until
    /// `limit` distinct submissions are gathered or the listing runs out.
    pub async fn search_submissions(
        &self,
        subreddit: &str,
        term: &str,
        limit: u32,
    ) -> Result<Vec<RedditPostData>, CoreError> {
        let path = format!("/r/{}/search", subreddit);
        let mut posts = Vec::new();
        let mut seen = HashSet::new();
        let mut after: Option<String> = None;

        while (posts.len() as u32) < limit {
            let page_size = (limit - posts.len() as u32).min(MAX_PAGE_SIZE).to_string();
            let mut params = vec![
                ("q", term),
                ("restrict_sr", "1"),
                ("sort", "new"),
                ("limit", page_size.as_str()),
                ("raw_json", "1"),
            ];
            if let Some(cursor) = after.as_deref() {
                params.push(("after", cursor));
            }

            let response = self
                .make_request("search", &path, &params)
                .await
                .map_err(|e| match e {
                    CoreError::RedditApi(RedditApiError::NotFound { .. }) => {
                        CoreError::RedditApi(RedditApiError::SubredditNotFound {
                            subreddit: subreddit.to_string(),
                        })
                    }
                    other => other,
                })?;

            let listing: RedditListing<RedditPostData> = response.json().await.map_err(|e| {
                error!("Failed to parse search results: {}", e);
                undecodable_response(
                    format!("Failed to parse search results for r/{}", subreddit),
                    e,
                )
            })?;

            let page_len = listing.data.children.len();
            for child in listing.data.children {
                if (posts.len() as u32) >= limit {
                    break;
                }
                if seen.insert(child.data.id.clone()) {
                    posts.push(child.data);
                } else {
                    debug!("Skipping duplicate submission {}", child.data.id);
                }
            }

            after = listing.data.after;
            if page_len == 0 || after.is_none() {
                break;
            }
        }

        info!(
            "Retrieved {} submissions from r/{} for '{}'",
            posts.len(),
            subreddit,
            term
        );
        Ok(posts)
    }

    /// Fetches the already-loaded comment tree of a submission, flattened.
    pub async fn get_comments(&self, submission_id: &str) -> Result<Vec<RedditCommentData>, CoreError> {
        let path = format!("/comments/{}", submission_id);
        let limit = COMMENT_FETCH_LIMIT.to_string();
        let depth = COMMENT_FETCH_DEPTH.to_string();
        let params = [
            ("limit", limit.as_str()),
            ("depth", depth.as_str()),
            ("sort", "confidence"),
            ("raw_json", "1"),
        ];

        let response = self
            .make_request("comments", &path, &params)
            .await
            .map_err(|e| match e {
                CoreError::RedditApi(RedditApiError::NotFound { .. }) => {
                    CoreError::RedditApi(RedditApiError::PostNotFound {
                        post_id: submission_id.to_string(),
                    })
                }
                other => other,
            })?;

        let (_post, comments): (IgnoredAny, CommentListing) =
            response.json().await.map_err(|e| {
                error!("Failed to parse comments: {}", e);
                undecodable_response(format!("Failed to parse comments for {}", submission_id), e)
            })?;

        let flat = flatten_comment_tree(comments.data.children);
        debug!("Retrieved {} comments for {}", flat.len(), submission_id);
        Ok(flat)
    }

    pub async fn get_metrics(&self) -> ApiMetrics {
        self.metrics.get_metrics().await
    }

    pub async fn reset_metrics(&self) {
        self.metrics.reset_metrics().await;
    }
}

fn check_status(response: Response, path: &str) -> Result<Response, CoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    error!("Request failed with status: {} for {}", status, path);
    let error = match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<f64>().ok())
                .map(|seconds| seconds.ceil() as u64)
                .unwrap_or(60);
            warn!("Rate limited, retry after {} seconds", retry_after);
            RedditApiError::RateLimitExceeded { retry_after }
        }
        StatusCode::UNAUTHORIZED => RedditApiError::InvalidToken,
        StatusCode::FORBIDDEN => RedditApiError::Forbidden {
            resource: path.to_string(),
        },
        StatusCode::NOT_FOUND => RedditApiError::NotFound {
            resource: path.to_string(),
        },
        status if status.is_server_error() => RedditApiError::ServerError {
            status_code: status.as_u16(),
        },
        status => RedditApiError::UnexpectedStatus {
            status_code: status.as_u16(),
        },
    };
    Err(CoreError::RedditApi(error))
}
