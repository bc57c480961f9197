use clap::Parser;
use reddit_client::{RedditApiClient, RedditCollector};
use sentiment_engine::BertSentimentClassifier;
use sentiment_pipeline::{QueryOutcome, SentimentPipeline};
use sentiscope_core::{AppConfig, CoreError, ErrorCategory, ErrorExt, ErrorReporter};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;
mod report;

const DEFAULT_LOG_FILTER: &str =
    "sentiscope=info,reddit_client=info,sentiment_engine=info,sentiment_pipeline=info";
const VERBOSE_LOG_FILTER: &str =
    "sentiscope=debug,reddit_client=debug,sentiment_engine=debug,sentiment_pipeline=debug";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = cli::Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ErrorReporter::new().report_error(&e);
            eprintln!("sentiscope: {}", e.user_friendly_message());
            exit_code(&e)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &cli::Cli) -> Result<(), CoreError> {
    let config = cli.apply(AppConfig::load(cli.config.as_deref())?);
    config.validate()?;

    if cli.list_queries {
        print!("{}", report::render_query_list(&config.queries()));
        return Ok(());
    }

    let term = config.select_query(cli.selection())?.to_string();
    let query = config.query_for(&term)?;
    let credentials = config.reddit.validate()?;

    info!(
        "Loading sentiment model from {}",
        config.classifier.model_dir.display()
    );
    let classifier = BertSentimentClassifier::load(&config.classifier.model_dir)?;

    let api = RedditApiClient::new(credentials.user_agent.clone())?;
    let collector = RedditCollector::new(api, config.reddit.clone());
    let mut pipeline = SentimentPipeline::new(collector, &classifier)
        .with_max_input_chars(config.classifier.max_input_chars);

    let outcome = pipeline.run(&query).await;

    let metrics = pipeline.collector().api().get_metrics().await;
    info!(
        "Reddit API: {} requests ({} ok, {} failed, {} rate limited), avg {:?}",
        metrics.total_requests,
        metrics.successful_requests,
        metrics.failed_requests,
        metrics.rate_limited_requests,
        metrics.average_response_time()
    );

    match outcome? {
        QueryOutcome::NoResults => {
            if cli.json {
                println!("{}", serde_json::json!({
                    "term": query.term,
                    "subreddit": query.subreddit,
                    "items": [],
                }));
            } else {
                print!(
                    "{}",
                    report::render_no_results(&query.term, &query.subreddit)
                );
            }
        }
        QueryOutcome::Analyzed(query_report) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&query_report)?);
            } else {
                print!("{}", report::render_report(&query_report, cli.samples));
            }
        }
    }

    Ok(())
}

fn exit_code(error: &CoreError) -> ExitCode {
    match error.category() {
        ErrorCategory::Configuration => ExitCode::from(2),
        ErrorCategory::Retrieval => ExitCode::from(3),
        ErrorCategory::Classification => ExitCode::from(4),
        ErrorCategory::Input | ErrorCategory::Internal => ExitCode::FAILURE,
    }
}
