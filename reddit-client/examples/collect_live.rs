use reddit_client::{RedditApiClient, RedditCollector};
use sentiscope_core::{Query, RedditCredentials};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("reddit_client=debug")
        .init();

    println!("=== Reddit Collector Live Test ===\n");

    let credentials = RedditCredentials::from_env();
    let user_agent = credentials
        .user_agent
        .clone()
        .unwrap_or_else(|| "sentiscope/0.1 live test".to_string());

    let term = std::env::args().nth(1).unwrap_or_else(|| "STF".to_string());
    let query = Query::new(term, "brasil", 5, chrono::Duration::days(7))?;

    let client = RedditApiClient::new(user_agent)?;
    let mut collector = RedditCollector::new(client, credentials);

    match collector.collect(&query).await {
        Ok(items) if items.is_empty() => {
            println!("No posts or comments found for '{}'.", query.term);
        }
        Ok(items) => {
            println!("Collected {} items:", items.len());
            for item in &items {
                let preview: String = item.text().chars().take(80).collect();
                println!(
                    "  [{:?}] {} {}",
                    item.source_kind(),
                    item.created_at().format("%Y-%m-%d %H:%M"),
                    preview
                );
            }
        }
        Err(e) => {
            println!("Collection failed: {}", e);
        }
    }

    let metrics = collector.api().get_metrics().await;
    println!(
        "\nRequests: {} total, {} failed, avg {:?}",
        metrics.total_requests,
        metrics.failed_requests,
        metrics.average_response_time()
    );

    Ok(())
}
