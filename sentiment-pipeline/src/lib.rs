use chrono::{DateTime, Utc};
use reddit_client::{RedditCollector, SearchApi};
use sentiment_engine::{aggregate, classify_items, SentimentClassifier, SentimentSummary};
use sentiscope_core::{ClassifiedItem, CoreError, Query, DEFAULT_MAX_INPUT_CHARS};
use serde::Serialize;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryReport {
    pub term: String,
    pub subreddit: String,
    pub items: Vec<ClassifiedItem>,
    pub summary: SentimentSummary,
}

/// Terminal state of one query. `NoResults` is a valid outcome, not a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    NoResults,
    Analyzed(QueryReport),
}

/// Runs collect, classify and aggregate for one query at a time.
///
/// The classifier is borrowed so one loaded model serves every query.
pub struct SentimentPipeline<'c, A, C: ?Sized> {
    collector: RedditCollector<A>,
    classifier: &'c C,
    max_input_chars: usize,
}

impl<'c, A, C> SentimentPipeline<'c, A, C>
where
    A: SearchApi,
    C: SentimentClassifier + ?Sized,
{
    pub fn new(collector: RedditCollector<A>, classifier: &'c C) -> Self {
        Self {
            collector,
            classifier,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }

    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    pub fn collector(&self) -> &RedditCollector<A> {
        &self.collector
    }

    pub async fn run(&mut self, query: &Query) -> Result<QueryOutcome, CoreError> {
        self.run_at(query, Utc::now()).await
    }

    pub async fn run_at(
        &mut self,
        query: &Query,
        now: DateTime<Utc>,
    ) -> Result<QueryOutcome, CoreError> {
        let started = Instant::now();
        info!("Running query '{}' on r/{}", query.term, query.subreddit);

        let items = self.collector.collect_at(query, now).await?;
        if items.is_empty() {
            info!("No posts or comments matched '{}'", query.term);
            return Ok(QueryOutcome::NoResults);
        }

        let classified = classify_items(self.classifier, items, self.max_input_chars)?;
        let summary = aggregate(&classified);

        info!(
            "Analyzed {} items for '{}' in {:?}",
            summary.total(),
            query.term,
            started.elapsed()
        );

        Ok(QueryOutcome::Analyzed(QueryReport {
            term: query.term.clone(),
            subreddit: query.subreddit.clone(),
            items: classified,
            summary,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};
    use reddit_client::{Comment, Submission};
    use sentiscope_core::{
        ClassifierError, ConfigError, RedditCredentials, ResolvedCredentials, Sentiment,
        SentimentLabel,
    };
    use std::cell::Cell;

    struct FixtureApi {
        submissions: Vec<Submission>,
        comments: Vec<Comment>,
        calls: usize,
    }

    impl SearchApi for FixtureApi {
        async fn authenticate(&mut self, _: &ResolvedCredentials) -> Result<(), CoreError> {
            self.calls += 1;
            Ok(())
        }

        async fn search(&mut self, _: &str, _: &str, _: u32) -> Result<Vec<Submission>, CoreError> {
            self.calls += 1;
            Ok(self.submissions.clone())
        }

        async fn comments(&mut self, _: &Submission) -> Result<Vec<Comment>, CoreError> {
            self.calls += 1;
            Ok(self.comments.clone())
        }
    }

    /// Replays a fixed list of verdicts.
    struct ScriptedClassifier {
        verdicts: Vec<Sentiment>,
        calls: Cell<usize>,
    }

    impl ScriptedClassifier {
        fn new(verdicts: Vec<Sentiment>) -> Self {
            Self {
                verdicts,
                calls: Cell::new(0),
            }
        }
    }

    impl SentimentClassifier for ScriptedClassifier {
        fn classify_batch(&self, texts: &[String]) -> Result<Vec<Sentiment>, CoreError> {
            self.calls.set(self.calls.get() + 1);
            if texts.len() > self.verdicts.len() {
                return Err(ClassifierError::InferenceFailed {
                    reason: "script exhausted".to_string(),
                }
                .into());
            }
            Ok(self.verdicts[..texts.len()].to_vec())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 20, 0, 0).unwrap()
    }

    fn query() -> Query {
        Query::new("STF", "brasil", 15, Duration::days(7)).unwrap()
    }

    fn credentials() -> RedditCredentials {
        RedditCredentials::new("id", "secret", "sentiscope/0.1 test")
    }

    fn fixture_api() -> FixtureApi {
        FixtureApi {
            submissions: vec![Submission {
                id: "s1".to_string(),
                title: "STF mantém decisão".to_string(),
                created_at: now() - Duration::hours(10),
            }],
            comments: vec![Comment {
                id: "c1".to_string(),
                body: "Péssima notícia".to_string(),
                created_at: now() - Duration::hours(2),
            }],
            calls: 0,
        }
    }

    #[tokio::test]
    async fn test_query_is_collected_classified_and_aggregated() {
        let classifier = ScriptedClassifier::new(vec![
            Sentiment::new(SentimentLabel::Positive, 0.91),
            Sentiment::new(SentimentLabel::Negative, 0.77),
        ]);
        let collector = RedditCollector::new(fixture_api(), credentials());
        let mut pipeline = SentimentPipeline::new(collector, &classifier);

        let outcome = pipeline.run_at(&query(), now()).await.unwrap();
        let report = match outcome {
            QueryOutcome::Analyzed(report) => report,
            QueryOutcome::NoResults => panic!("expected an analyzed report"),
        };

        let day = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        assert_eq!(report.items.len(), 2);
        assert_eq!(report.items[0].item.text(), "STF mantém decisão");
        assert_eq!(report.items[0].label, SentimentLabel::Positive);
        assert_eq!(report.items[1].confidence, 0.77);
        assert_eq!(report.summary.daily_count(day, &SentimentLabel::Positive), 1);
        assert_eq!(report.summary.daily_count(day, &SentimentLabel::Negative), 1);
        assert_eq!(report.summary.count(&SentimentLabel::Positive), 1);
        assert_eq!(classifier.calls.get(), 1);
    }

    #[tokio::test]
    async fn test_empty_collection_skips_classifier() {
        let classifier = ScriptedClassifier::new(Vec::new());
        let api = FixtureApi {
            submissions: Vec::new(),
            comments: Vec::new(),
            calls: 0,
        };
        let collector = RedditCollector::new(api, credentials());
        let mut pipeline = SentimentPipeline::new(collector, &classifier);

        let outcome = pipeline.run_at(&query(), now()).await.unwrap();

        assert_eq!(outcome, QueryOutcome::NoResults);
        assert_eq!(classifier.calls.get(), 0);
    }

    #[tokio::test]
    async fn test_configuration_error_stops_before_network() {
        let classifier = ScriptedClassifier::new(Vec::new());
        let incomplete = RedditCredentials {
            client_secret: None,
            ..credentials()
        };
        let mut pipeline =
            SentimentPipeline::new(RedditCollector::new(fixture_api(), incomplete), &classifier);

        let result = pipeline.run_at(&query(), now()).await;

        assert!(matches!(
            result,
            Err(CoreError::Config(ConfigError::MissingEnvironmentVariable { .. }))
        ));
        assert_eq!(pipeline.collector().api().calls, 0);
        assert_eq!(classifier.calls.get(), 0);
    }

    #[tokio::test]
    async fn test_classifier_failure_is_fatal() {
        let classifier =
            ScriptedClassifier::new(vec![Sentiment::new(SentimentLabel::Neutral, 0.5)]);
        let collector = RedditCollector::new(fixture_api(), credentials());
        let mut pipeline = SentimentPipeline::new(collector, &classifier);

        let result = pipeline.run_at(&query(), now()).await;
        assert!(matches!(result, Err(CoreError::Classifier(_))));
    }

    #[tokio::test]
    async fn test_inputs_are_bounded_before_classification() {
        struct LengthClassifier;

        impl SentimentClassifier for LengthClassifier {
            fn classify_batch(&self, texts: &[String]) -> Result<Vec<Sentiment>, CoreError> {
                assert!(texts.iter().all(|text| text.chars().count() <= 5));
                Ok(texts
                    .iter()
                    .map(|_| Sentiment::new(SentimentLabel::Neutral, 0.4))
                    .collect())
            }
        }

        let collector = RedditCollector::new(fixture_api(), credentials());
        let mut pipeline =
            SentimentPipeline::new(collector, &LengthClassifier).with_max_input_chars(5);

        let outcome = pipeline.run_at(&query(), now()).await.unwrap();
        assert!(matches!(outcome, QueryOutcome::Analyzed(_)));
    }

    #[test]
    fn test_report_serializes_to_json() {
        let report = QueryReport {
            term: "STF".to_string(),
            subreddit: "brasil".to_string(),
            items: Vec::new(),
            summary: SentimentSummary::default(),
        };

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"term\":\"STF\""));
        assert!(json.contains("overall_counts"));
    }
}
