use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, Scope, TokenResponse, TokenUrl};
use sentiscope_core::{CoreError, RedditApiError, ResolvedCredentials};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info};

const REDDIT_AUTHORIZE_URL: &str = "https://www.reddit.com/api/v1/authorize";
const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

// Reddit issues app-only tokens for one hour; used when the response omits expires_in.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);
// Refresh a little before the advertised expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
    pub scope: Vec<String>,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() + EXPIRY_MARGIN >= self.expires_at
    }
}

/// Application-only OAuth2 (`client_credentials` grant) for read access to public listings.
#[derive(Debug)]
pub struct AppOnlyAuthenticator {
    client: BasicClient,
    user_agent: String,
}

impl AppOnlyAuthenticator {
    pub fn new(credentials: &ResolvedCredentials) -> Result<Self, CoreError> {
        Self::with_token_url(credentials, REDDIT_TOKEN_URL)
    }

    pub fn with_token_url(
        credentials: &ResolvedCredentials,
        token_url: &str,
    ) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(REDDIT_AUTHORIZE_URL.to_string()).map_err(|e| {
            CoreError::invalid_input(format!("invalid authorize URL: {}", e))
        })?;
        let token_url = TokenUrl::new(token_url.to_string())
            .map_err(|e| CoreError::invalid_input(format!("invalid token URL: {}", e)))?;

        let client = BasicClient::new(
            ClientId::new(credentials.client_id.clone()),
            Some(ClientSecret::new(credentials.client_secret.clone())),
            auth_url,
            Some(token_url),
        );

        Ok(Self {
            client,
            user_agent: credentials.user_agent.clone(),
        })
    }

    pub async fn fetch_token(&self) -> Result<RedditToken, CoreError> {
        info!("Requesting app-only Reddit access token");
        let user_agent = self.user_agent.clone();

        let response = self
            .client
            .exchange_client_credentials()
            .add_scope(Scope::new("read".to_string()))
            .request_async(|request| send_with_user_agent(user_agent, request))
            .await
            .map_err(|e| {
                error!("Token request failed: {}", e);
                CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                    reason: e.to_string(),
                    source: Box::new(e),
                })
            })?;

        let lifetime = response.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let scope = response
            .scopes()
            .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default();

        debug!("Access token valid for {:?}", lifetime);
        Ok(RedditToken {
            access_token: response.access_token().secret().clone(),
            expires_at: SystemTime::now() + lifetime,
            scope,
        })
    }
}

/// oauth2's bundled reqwest client cannot set a user agent, which Reddit requires on every call.
async fn send_with_user_agent(
    user_agent: String,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(30))
        .build()?;

    let response = client
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}
