use sentiscope_core::{truncate, ClassifiedItem, ClassifierError, CoreError, Item, Sentiment};
use tracing::{debug, info};

/// Maps a batch of texts to one sentiment each, in input order.
pub trait SentimentClassifier {
    fn classify_batch(&self, texts: &[String]) -> Result<Vec<Sentiment>, CoreError>;
}

impl<C: SentimentClassifier + ?Sized> SentimentClassifier for &C {
    fn classify_batch(&self, texts: &[String]) -> Result<Vec<Sentiment>, CoreError> {
        (**self).classify_batch(texts)
    }
}

impl<C: SentimentClassifier + ?Sized> SentimentClassifier for Box<C> {
    fn classify_batch(&self, texts: &[String]) -> Result<Vec<Sentiment>, CoreError> {
        (**self).classify_batch(texts)
    }
}

/// Classifies every item in a single batch call and joins the verdicts back
/// onto the items, preserving order.
///
/// Texts are cut to `max_input_chars` before classification; the items keep
/// their full text.
pub fn classify_items<C>(
    classifier: &C,
    items: Vec<Item>,
    max_input_chars: usize,
) -> Result<Vec<ClassifiedItem>, CoreError>
where
    C: SentimentClassifier + ?Sized,
{
    if items.is_empty() {
        debug!("Nothing to classify");
        return Ok(Vec::new());
    }

    let inputs: Vec<String> = items
        .iter()
        .map(|item| truncate(item.text(), max_input_chars).to_string())
        .collect();

    info!("Classifying {} texts", inputs.len());
    let sentiments = classifier.classify_batch(&inputs)?;

    if sentiments.len() != items.len() {
        return Err(ClassifierError::OutputMismatch {
            expected: items.len(),
            actual: sentiments.len(),
        }
        .into());
    }

    Ok(items
        .into_iter()
        .zip(sentiments)
        .map(|(item, sentiment)| ClassifiedItem::new(item, sentiment))
        .collect())
}
