//! Sequence classification on top of candle's BERT encoder.
//!
//! Expects a local directory with the usual Hugging Face export of a
//! `BertForSequenceClassification` checkpoint: `config.json`,
//! `tokenizer.json` and `model.safetensors`.

use crate::classifier::SentimentClassifier;
use candle_core::{Device, IndexOp, Module, Tensor, D};
use candle_nn::{linear, Linear, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use sentiscope_core::{ClassifierError, CoreError, Sentiment, SentimentLabel};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

pub const CONFIG_FILE: &str = "config.json";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const WEIGHTS_FILE: &str = "model.safetensors";

/// Positional embedding limit of BERT-base checkpoints.
pub const MAX_SEQUENCE_TOKENS: usize = 512;

#[derive(Debug, Deserialize)]
struct HeadConfig {
    hidden_size: usize,
    #[serde(default)]
    model_type: Option<String>,
    #[serde(default)]
    id2label: HashMap<String, String>,
}

pub struct BertSentimentClassifier {
    model: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    labels: Vec<SentimentLabel>,
    device: Device,
}

impl BertSentimentClassifier {
    pub fn load(model_dir: &Path) -> Result<Self, CoreError> {
        let config_path = model_file(model_dir, CONFIG_FILE)?;
        let tokenizer_path = model_file(model_dir, TOKENIZER_FILE)?;
        let weights_path = model_file(model_dir, WEIGHTS_FILE)?;
        let load_failed = |reason: String| ClassifierError::ModelLoadingFailed {
            model_path: model_dir.display().to_string(),
            reason,
        };

        info!("Loading sentiment model from {}", model_dir.display());
        let config_json =
            std::fs::read_to_string(&config_path).map_err(|e| load_failed(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&config_json).map_err(|e| load_failed(e.to_string()))?;
        let head: HeadConfig =
            serde_json::from_str(&config_json).map_err(|e| load_failed(e.to_string()))?;
        let labels = ordered_labels(&head.id2label)?;

        let mut tokenizer =
            Tokenizer::from_file(&tokenizer_path).map_err(|e| load_failed(e.to_string()))?;
        tokenizer
            .with_padding(None)
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| load_failed(e.to_string()))?;

        let device = Device::Cpu;
        // SAFETY: the weights file is only read, and is not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device) }
            .map_err(|e| load_failed(e.to_string()))?;

        let prefix = head.model_type.as_deref().unwrap_or("bert");
        let model = BertModel::load(vb.clone(), &config).map_err(|e| load_failed(e.to_string()))?;
        let pooler = linear(
            head.hidden_size,
            head.hidden_size,
            vb.pp(prefix).pp("pooler").pp("dense"),
        )
        .map_err(|e| load_failed(e.to_string()))?;
        let classifier = linear(head.hidden_size, labels.len(), vb.pp("classifier"))
            .map_err(|e| load_failed(e.to_string()))?;

        info!("Sentiment model ready with labels {:?}", labels);
        Ok(Self {
            model,
            pooler,
            classifier,
            tokenizer,
            labels,
            device,
        })
    }

    pub fn labels(&self) -> &[SentimentLabel] {
        &self.labels
    }

    fn classify_one(&self, text: &str) -> Result<Sentiment, ClassifierError> {
        let encoding = self.tokenizer.encode(text, true).map_err(|e| {
            ClassifierError::TokenizationFailed {
                text_length: text.chars().count(),
                reason: e.to_string(),
            }
        })?;

        let probabilities = self
            .probabilities(encoding.get_ids(), encoding.get_type_ids())
            .map_err(|e| ClassifierError::InferenceFailed {
                reason: e.to_string(),
            })?;

        let (index, confidence) = probabilities
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .ok_or_else(|| ClassifierError::InferenceFailed {
                reason: "model produced no logits".to_string(),
            })?;

        let label = self
            .labels
            .get(index)
            .cloned()
            .ok_or_else(|| ClassifierError::InvalidLabelConfig {
                details: format!("no label for class index {}", index),
            })?;

        Ok(Sentiment::new(label, confidence))
    }

    fn probabilities(&self, ids: &[u32], type_ids: &[u32]) -> candle_core::Result<Vec<f32>> {
        let input_ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(type_ids, &self.device)?.unsqueeze(0)?;

        let hidden_states = self.model.forward(&input_ids, &token_type_ids)?;
        let cls = hidden_states.i((.., 0))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits = self.classifier.forward(&pooled)?;

        candle_nn::ops::softmax(&logits, D::Minus1)?
            .squeeze(0)?
            .to_vec1::<f32>()
    }
}

impl SentimentClassifier for BertSentimentClassifier {
    /// Sequences are run one at a time: the encoder takes no attention mask,
    /// so padded batches would skew the shorter texts.
    fn classify_batch(&self, texts: &[String]) -> Result<Vec<Sentiment>, CoreError> {
        let mut sentiments = Vec::with_capacity(texts.len());
        for (position, text) in texts.iter().enumerate() {
            let sentiment = self.classify_one(text)?;
            debug!(
                "Text {} classified as {} ({:.2})",
                position, sentiment.label, sentiment.confidence
            );
            sentiments.push(sentiment);
        }
        Ok(sentiments)
    }
}

fn model_file(model_dir: &Path, name: &str) -> Result<PathBuf, ClassifierError> {
    let path = model_dir.join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(ClassifierError::ModelNotFound {
            path: path.display().to_string(),
        })
    }
}

/// Orders `id2label` by class index. Indices must run from 0 without gaps.
fn ordered_labels(id2label: &HashMap<String, String>) -> Result<Vec<SentimentLabel>, ClassifierError> {
    if id2label.is_empty() {
        return Err(ClassifierError::InvalidLabelConfig {
            details: "id2label is missing or empty".to_string(),
        });
    }

    let mut indexed = Vec::with_capacity(id2label.len());
    for (id, label) in id2label {
        let index = id
            .trim()
            .parse::<usize>()
            .map_err(|_| ClassifierError::InvalidLabelConfig {
                details: format!("non-numeric class id '{}'", id),
            })?;
        indexed.push((index, label));
    }
    indexed.sort_by_key(|(index, _)| *index);

    indexed
        .into_iter()
        .enumerate()
        .map(|(expected, (index, label))| {
            if expected == index {
                Ok(SentimentLabel::from_model_label(label))
            } else {
                Err(ClassifierError::InvalidLabelConfig {
                    details: format!("class ids are not contiguous at {}", expected),
                })
            }
        })
        .collect()
}
