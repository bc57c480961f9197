pub mod aggregate;
pub mod bert;
pub mod classifier;

pub use aggregate::{aggregate, DailySentimentRow, SentimentSummary};
pub use bert::BertSentimentClassifier;
pub use classifier::{classify_items, SentimentClassifier};
