use clap::Parser;
use sentiscope_core::AppConfig;
use std::path::PathBuf;

/// Sentiment of recent Reddit posts and comments for one search term.
#[derive(Clone, Debug, Parser)]
#[command(name = "sentiscope", version)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Search term to analyze: a 1-based position in the query list or the exact term.
    /// Defaults to the first configured term.
    #[arg(short, long, value_name = "N|TERM")]
    pub query: Option<String>,

    /// Print the configured search terms and exit.
    #[arg(long)]
    pub list_queries: bool,

    /// Subreddit to search instead of the configured one.
    #[arg(long)]
    pub subreddit: Option<String>,

    /// Maximum number of submissions to request.
    #[arg(long, value_name = "N")]
    pub limit: Option<u32>,

    /// Only keep items created within this many days.
    #[arg(long, value_name = "DAYS")]
    pub window_days: Option<i64>,

    /// Directory holding config.json, tokenizer.json and model.safetensors.
    #[arg(long, value_name = "DIR")]
    pub model_dir: Option<PathBuf>,

    /// Print the full report as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Number of classified items shown in the sample table.
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub samples: usize,

    /// Debug logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Command-line values win over the file and the environment.
    pub fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(subreddit) = &self.subreddit {
            config.search.subreddit = subreddit.clone();
        }
        if let Some(limit) = self.limit {
            config.search.result_limit = limit;
        }
        if let Some(window_days) = self.window_days {
            config.search.window_days = window_days;
        }
        if let Some(model_dir) = &self.model_dir {
            config.classifier.model_dir = model_dir.clone();
        }
        config
    }

    pub fn selection(&self) -> &str {
        self.query.as_deref().unwrap_or("1")
    }
}
