use crate::api::{Comment, RedditApiClient, Submission};
use chrono::{DateTime, Utc};
use sentiscope_core::{
    in_window, is_acceptable, CoreError, Item, Query, RedditCredentials, ResolvedCredentials,
    SourceKind,
};
use std::collections::HashSet;
use tracing::{debug, info};

/// How many comments of each submission are inspected, in API order.
pub const COMMENTS_PER_SUBMISSION: usize = 10;

/// The slice of the Reddit API the collector depends on.
#[allow(async_fn_in_trait)]
pub trait SearchApi {
    async fn authenticate(&mut self, credentials: &ResolvedCredentials) -> Result<(), CoreError>;

    async fn search(
        &mut self,
        subreddit: &str,
        term: &str,
        limit: u32,
    ) -> Result<Vec<Submission>, CoreError>;

    /// Comments of a submission, flattened with unloaded placeholders removed.
    async fn comments(&mut self, submission: &Submission) -> Result<Vec<Comment>, CoreError>;
}

impl SearchApi for RedditApiClient {
    async fn authenticate(&mut self, credentials: &ResolvedCredentials) -> Result<(), CoreError> {
        RedditApiClient::authenticate(self, credentials).await
    }

    async fn search(
        &mut self,
        subreddit: &str,
        term: &str,
        limit: u32,
    ) -> Result<Vec<Submission>, CoreError> {
        self.search_submissions(subreddit, term, limit)
            .await?
            .into_iter()
            .map(Submission::try_from)
            .collect()
    }

    async fn comments(&mut self, submission: &Submission) -> Result<Vec<Comment>, CoreError> {
        self.get_comments(&submission.id)
            .await?
            .into_iter()
            .map(Comment::try_from)
            .collect()
    }
}

pub struct RedditCollector<A> {
    api: A,
    credentials: RedditCredentials,
    comments_per_submission: usize,
}

impl<A: SearchApi> RedditCollector<A> {
    pub fn new(api: A, credentials: RedditCredentials) -> Self {
        Self {
            api,
            credentials,
            comments_per_submission: COMMENTS_PER_SUBMISSION,
        }
    }

    pub fn with_comments_per_submission(mut self, comments_per_submission: usize) -> Self {
        self.comments_per_submission = comments_per_submission;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn collect(&mut self, query: &Query) -> Result<Vec<Item>, CoreError> {
        self.collect_at(query, Utc::now()).await
    }

    /// Gathers submission titles and their first comments that fall inside the
    /// query window ending at `now`.
    ///
    /// An empty vector means nothing survived filtering. Any API failure aborts
    /// the whole collection; nothing is retried.
    pub async fn collect_at(
        &mut self,
        query: &Query,
        now: DateTime<Utc>,
    ) -> Result<Vec<Item>, CoreError> {
        let credentials = self.credentials.validate()?;
        self.api.authenticate(&credentials).await?;

        let submissions = self
            .api
            .search(&query.subreddit, &query.term, query.result_limit)
            .await?;
        info!(
            "Inspecting {} submissions for '{}' in r/{}",
            submissions.len(),
            query.term,
            query.subreddit
        );

        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut skipped_submissions = 0usize;
        let mut rejected_comments = 0usize;

        for submission in submissions {
            if !seen.insert(submission.id.clone()) {
                debug!("Skipping duplicate submission {}", submission.id);
                continue;
            }
            if !in_window(submission.created_at, now, query.window) {
                debug!("Submission {} is outside the window", submission.id);
                skipped_submissions += 1;
                continue;
            }

            if submission.title.trim().is_empty() {
                debug!("Submission {} has a blank title", submission.id);
            } else {
                items.push(Item::new(
                    submission.title.clone(),
                    submission.created_at,
                    SourceKind::Post,
                )?);
            }

            let comments = self.api.comments(&submission).await?;
            for comment in comments.into_iter().take(self.comments_per_submission) {
                if !in_window(comment.created_at, now, query.window) {
                    rejected_comments += 1;
                    continue;
                }
                if !is_acceptable(&comment.body) {
                    debug!("Rejecting comment {}", comment.id);
                    rejected_comments += 1;
                    continue;
                }
                items.push(Item::new(comment.body, comment.created_at, SourceKind::Comment)?);
            }
        }

        info!(
            "Collected {} items ({} submissions outside window, {} comments rejected)",
            items.len(),
            skipped_submissions,
            rejected_comments
        );
        Ok(items)
    }
}
