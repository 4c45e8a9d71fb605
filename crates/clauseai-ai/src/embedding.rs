//! Text → vector seam, plus the pooling maths shared by sentence encoders.

use std::sync::Arc;

/// Maps clause text to a fixed-length vector. Deterministic for a frozen model.
///
/// Implementations are shared across concurrent requests, so `encode` takes
/// `&self`; encoders that need exclusive access internally lock.
pub trait TextEmbedder: Send + Sync {
    fn encode(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    /// Output dimensionality.
    fn dim(&self) -> usize;

    /// Name recorded alongside index artifacts built with this encoder.
    fn model_name(&self) -> &str {
        "unknown"
    }

    fn encode_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.encode(t)).collect()
    }
}

impl<T: TextEmbedder + ?Sized> TextEmbedder for Arc<T> {
    fn encode(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        (**self).encode(text)
    }

    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn encode_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        (**self).encode_batch(texts)
    }
}

/// Mean-pool token embeddings under an attention mask, then L2-normalise.
///
/// `tokens` is a row-major `[batch, seq_len, dim]` buffer. `mask` is
/// `[batch, mask_stride]`; only its first `seq_len` columns are read, so a
/// model that truncates its output sequence still pools correctly.
pub fn mean_pool(
    tokens: &[f32],
    mask: &[i64],
    batch: usize,
    seq_len: usize,
    mask_stride: usize,
    dim: usize,
) -> Vec<Vec<f32>> {
    let mut pooled_batch = Vec::with_capacity(batch);
    for i in 0..batch {
        let mut pooled = vec![0.0f32; dim];
        let mut weight = 0.0f32;

        for j in 0..seq_len.min(mask_stride) {
            let m = mask[i * mask_stride + j] as f32;
            if m <= 0.0 {
                continue;
            }
            let offset = (i * seq_len + j) * dim;
            for (p, t) in pooled.iter_mut().zip(&tokens[offset..offset + dim]) {
                *p += t * m;
            }
            weight += m;
        }

        if weight > 0.0 {
            pooled.iter_mut().for_each(|p| *p /= weight);
        }
        normalize(&mut pooled);
        pooled_batch.push(pooled);
    }
    pooled_batch
}

/// L2-normalise in place. Zero vectors are left as-is.
pub fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn normalize_zero_vector() {
        let mut v = vec![0.0; 4];
        normalize(&mut v);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn pooling_ignores_masked_tokens() {
        // batch=1, seq=3, dim=2; the padded third token would flip the direction.
        let tokens = [1.0, 0.0, 1.0, 0.0, -50.0, 50.0];
        let mask = [1, 1, 0];
        let out = mean_pool(&tokens, &mask, 1, 3, 3, 2);
        assert_eq!(out.len(), 1);
        assert!((out[0][0] - 1.0).abs() < 1e-6);
        assert!(out[0][1].abs() < 1e-6);
    }

    #[test]
    fn pooling_per_row() {
        // batch=2, seq=2, dim=2.
        let tokens = [2.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 3.0];
        let mask = [1, 0, 1, 1];
        let out = mean_pool(&tokens, &mask, 2, 2, 2, 2);
        assert_eq!(out[0], vec![1.0, 0.0]);
        assert_eq!(out[1], vec![0.0, 1.0]);
        assert!(out.iter().all(|v| (norm(v) - 1.0).abs() < 1e-6));
    }

    struct Fixed;

    impl TextEmbedder for Fixed {
        fn encode(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            Ok(vec![text.len() as f32])
        }
        fn dim(&self) -> usize {
            1
        }
    }

    #[test]
    fn default_batch_encodes_each_text() {
        let e: Arc<dyn TextEmbedder> = Arc::new(Fixed);
        let out = e.encode_batch(&["a", "abc"]).unwrap();
        assert_eq!(out, vec![vec![1.0], vec![3.0]]);
        assert_eq!(e.model_name(), "unknown");
    }
}
