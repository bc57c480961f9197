use crate::error::{ConfigError, CoreError};
use crate::filters::DEFAULT_MAX_INPUT_CHARS;
use crate::types::Query;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const ENV_CLIENT_ID: &str = "REDDIT_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "REDDIT_CLIENT_SECRET";
pub const ENV_USER_AGENT: &str = "REDDIT_USER_AGENT";
pub const ENV_MODEL_DIR: &str = "SENTISCOPE_MODEL_DIR";

const MAX_WINDOW_DAYS: i64 = 3650;

pub const DEFAULT_QUERIES: [&str; 8] = [
    "Bolsonaro preso",
    "Bolsonaro inocente",
    "Julgamento do Bolsonaro",
    "Alexandre de Moraes",
    "Julgamento do Golpe",
    "STF",
    "Julgamento da cúpula militar",
    "Julgamento do 8 de janeiro",
];

/// Reddit script-app credentials as found in the config file or environment.
/// Any of them may be absent until [`RedditCredentials::validate`] is called.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub user_agent: Option<String>,
}

/// Credentials that passed validation. All three values are non-blank.
#[derive(Clone, PartialEq)]
pub struct ResolvedCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl RedditCredentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
            user_agent: Some(user_agent.into()),
        }
    }

    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Replaces each credential for which `lookup` yields a non-blank value.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(client_id) = non_blank(ENV_CLIENT_ID) {
            self.client_id = Some(client_id);
        }
        if let Some(client_secret) = non_blank(ENV_CLIENT_SECRET) {
            self.client_secret = Some(client_secret);
        }
        if let Some(user_agent) = non_blank(ENV_USER_AGENT) {
            self.user_agent = Some(user_agent);
        }
        self
    }

    pub fn validate(&self) -> Result<ResolvedCredentials, ConfigError> {
        Ok(ResolvedCredentials {
            client_id: require(&self.client_id, ENV_CLIENT_ID)?,
            client_secret: require(&self.client_secret, ENV_CLIENT_SECRET)?,
            user_agent: require(&self.user_agent, ENV_USER_AGENT)?,
        })
    }
}

fn require(value: &Option<String>, var_name: &str) -> Result<String, ConfigError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::MissingEnvironmentVariable {
            var_name: var_name.to_string(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub subreddit: String,
    pub result_limit: u32,
    pub window_days: i64,
    pub queries: Vec<String>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            subreddit: "brasil".to_string(),
            result_limit: 15,
            window_days: 7,
            queries: DEFAULT_QUERIES.iter().map(|q| q.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    pub model_dir: PathBuf,
    pub max_input_chars: usize,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models/sentiment"),
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub reddit: RedditCredentials,
    pub search: SearchSettings,
    pub classifier: ClassifierSettings,
}

impl AppConfig {
    /// Reads the optional TOML file and overlays the process environment.
    ///
    /// The result is not validated, so later overrides can still correct it.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound {
                        path: path.display().to_string(),
                    });
                }
                let contents =
                    std::fs::read_to_string(path).map_err(|e| ConfigError::InvalidValue {
                        field: "config_path".to_string(),
                        value: format!("{}: {}", path.display(), e),
                    })?;
                info!("Loaded configuration from {}", path.display());
                Self::from_toml_str(&contents)?
            }
            None => {
                debug!("No configuration file given, using defaults");
                Self::default()
            }
        };

        Ok(config.with_overrides(|name| std::env::var(name).ok()))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model_dir) = lookup(ENV_MODEL_DIR).filter(|dir| !dir.trim().is_empty()) {
            self.classifier.model_dir = PathBuf::from(model_dir);
        }
        self.reddit = self.reddit.with_overrides(lookup);
        self
    }

    /// Checks the search and classifier settings. Credentials are checked separately,
    /// right before they are needed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.subreddit.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "search.subreddit".to_string(),
                value: self.search.subreddit.clone(),
            });
        }
        if self.search.result_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "search.result_limit".to_string(),
                value: self.search.result_limit.to_string(),
            });
        }
        if self.search.window_days <= 0 || self.search.window_days > MAX_WINDOW_DAYS {
            return Err(ConfigError::InvalidValue {
                field: "search.window_days".to_string(),
                value: self.search.window_days.to_string(),
            });
        }
        if self.search.queries.iter().all(|q| q.trim().is_empty()) {
            return Err(ConfigError::ValidationFailed {
                reason: "at least one search query must be configured".to_string(),
            });
        }
        if self.classifier.max_input_chars == 0 {
            return Err(ConfigError::InvalidValue {
                field: "classifier.max_input_chars".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn window(&self) -> Duration {
        Duration::days(self.search.window_days)
    }

    /// The selectable search terms, in configured order, without blank entries.
    pub fn queries(&self) -> Vec<&str> {
        self.search
            .queries
            .iter()
            .map(|q| q.as_str())
            .filter(|q| !q.trim().is_empty())
            .collect()
    }

    /// Resolves a selection against [`AppConfig::queries`]: either a 1-based
    /// position or the exact term.
    pub fn select_query(&self, selection: &str) -> Result<&str, CoreError> {
        let selection = selection.trim();
        let queries = self.queries();

        if let Ok(position) = selection.parse::<usize>() {
            if position >= 1 && position <= queries.len() {
                return Ok(queries[position - 1]);
            }
        }

        queries
            .into_iter()
            .find(|q| *q == selection)
            .ok_or_else(|| {
                CoreError::invalid_input(format!(
                    "'{}' is not one of the configured search terms",
                    selection
                ))
            })
    }

    pub fn query_for(&self, term: &str) -> Result<Query, CoreError> {
        Query::new(
            term,
            self.search.subreddit.clone(),
            self.search.result_limit,
            self.window(),
        )
    }
}
