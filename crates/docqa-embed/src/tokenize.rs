use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

use docqa_core::EmbeddingError;

/// XLM-RoBERTa `<pad>`.
const PAD_ID: u32 = 1;

fn model_err(e: impl std::fmt::Display) -> EmbeddingError { EmbeddingError::Model(e.to_string()) }

/// Encode `texts` as one `[B, T]` batch of ids and attention mask, truncated
/// to `max_len` and right-padded to the longest sequence in the batch.
pub fn tokenize_batch(tokenizer: &Tokenizer, texts: &[String], max_len: usize, device: &Device) -> Result<(Tensor, Tensor), EmbeddingError> {
    let mut rows = Vec::with_capacity(texts.len());
    for text in texts {
        let enc = tokenizer.encode(text.as_str(), true).map_err(|e| EmbeddingError::Model(format!("Tokenization failed: {e}")))?;
        let mut ids = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        ids.truncate(max_len);
        mask.truncate(max_len);
        rows.push((ids, mask));
    }
    let width = rows.iter().map(|(ids, _)| ids.len()).max().unwrap_or(0).max(1);
    let (mut all_ids, mut all_mask) = (Vec::with_capacity(rows.len() * width), Vec::with_capacity(rows.len() * width));
    for (ids, mask) in rows {
        let pad = width - ids.len();
        all_ids.extend(ids.into_iter().chain(std::iter::repeat(PAD_ID).take(pad)));
        all_mask.extend(mask.into_iter().chain(std::iter::repeat(0).take(pad)));
    }
    let input_ids = Tensor::from_vec(all_ids, (texts.len(), width), device).map_err(model_err)?;
    let attention_mask = Tensor::from_vec(all_mask, (texts.len(), width), device).map_err(model_err)?;
    Ok((input_ids, attention_mask))
}
