//! ONNX Runtime sentence encoder (all-MiniLM-L6-v2, 384 dimensions).
//!
//! The model directory must contain `model.onnx` and `tokenizer.json`.

use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Encoding, PaddingParams, Tokenizer, TruncationParams};
use tracing::info;

use crate::embedding::{TextEmbedder, mean_pool};

const MAX_TOKENS: usize = 256;
const FALLBACK_DIM: usize = 384;

/// Sentence encoder over an ONNX Runtime session.
pub struct Embedder {
    session: Session,
    tokenizer: Tokenizer,
    dim: usize,
    name: String,
}

/// Flat `[batch, seq_len]` model inputs.
struct BatchInputs {
    batch: usize,
    seq_len: usize,
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
    token_type_ids: Vec<i64>,
}

impl BatchInputs {
    fn from_encodings(encodings: &[Encoding]) -> Self {
        let batch = encodings.len();
        let seq_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);
        let mut inputs = Self {
            batch,
            seq_len,
            input_ids: vec![0; batch * seq_len],
            attention_mask: vec![0; batch * seq_len],
            token_type_ids: vec![0; batch * seq_len],
        };
        for (i, enc) in encodings.iter().enumerate() {
            let row = i * seq_len;
            copy_row(&mut inputs.input_ids[row..], enc.get_ids());
            copy_row(&mut inputs.attention_mask[row..], enc.get_attention_mask());
            copy_row(&mut inputs.token_type_ids[row..], enc.get_type_ids());
        }
        inputs
    }

    fn shape(&self) -> [i64; 2] {
        [self.batch as i64, self.seq_len as i64]
    }
}

fn copy_row(dst: &mut [i64], src: &[u32]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = i64::from(s);
    }
}

impl Embedder {
    /// Load from a directory containing `model.onnx` and `tokenizer.json`.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {model_dir:?}"
        );

        let session = Session::builder()?
            .commit_from_file(&model_path)
            .with_context(|| format!("load {}", model_path.display()))?;
        let dim = infer_dim(session.outputs()[0].dtype()).unwrap_or(FALLBACK_DIM);

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;
        tokenizer.with_padding(Some(PaddingParams::default()));

        let name = model_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".into());

        info!(dim, model = %model_path.display(), "loaded embedding model");
        Ok(Self {
            session,
            tokenizer,
            dim,
            name,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Model directory name, e.g. `all-MiniLM-L6-v2`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn embed(&mut self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .pop()
            .context("encoder returned no vector")
    }

    /// One unit-length vector per input, in input order.
    pub fn embed_batch(&mut self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;
        let inputs = BatchInputs::from_encodings(&encodings);
        let shape = inputs.shape();

        let outputs = self.session.run(ort::inputs![
            "input_ids" => Tensor::from_array((shape, inputs.input_ids.into_boxed_slice()))?,
            "attention_mask" => Tensor::from_array((shape, inputs.attention_mask.clone().into_boxed_slice()))?,
            "token_type_ids" => Tensor::from_array((shape, inputs.token_type_ids.into_boxed_slice()))?,
        ])?;

        // [batch, seq_len, dim]
        let (out_shape, tokens) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = out_shape;
        anyhow::ensure!(
            dims.len() == 3 && dims[0] as usize == inputs.batch && dims[2] as usize == self.dim,
            "unexpected output shape: {dims:?}, expected [{}, {}, {}]",
            inputs.batch,
            inputs.seq_len,
            self.dim
        );

        Ok(mean_pool(
            tokens,
            &inputs.attention_mask,
            inputs.batch,
            dims[1] as usize,
            inputs.seq_len,
            self.dim,
        ))
    }
}

/// Last dimension of the model's first output, when static.
fn infer_dim(output_type: &ort::value::ValueType) -> Option<usize> {
    match output_type {
        ort::value::ValueType::Tensor { shape, .. } => shape
            .last()
            .and_then(|&d| if d > 0 { Some(d as usize) } else { None }),
        _ => None,
    }
}

/// [`Embedder`] behind a mutex so one session serves concurrent requests.
pub struct OnnxEmbedder {
    inner: Mutex<Embedder>,
    dim: usize,
    name: String,
}

impl OnnxEmbedder {
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let embedder = Embedder::load(model_dir)?;
        Ok(Self {
            dim: embedder.dim(),
            name: embedder.name().to_string(),
            inner: Mutex::new(embedder),
        })
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Embedder>> {
        self.inner
            .lock()
            .map_err(|_| anyhow::anyhow!("embedding session poisoned"))
    }
}

impl TextEmbedder for OnnxEmbedder {
    fn encode(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.lock()?.embed(text)
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn model_name(&self) -> &str {
        &self.name
    }

    fn encode_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.lock()?.embed_batch(texts)
    }
}
