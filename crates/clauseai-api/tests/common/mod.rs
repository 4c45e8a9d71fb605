#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use clauseai_ai::{GenerationError, Generator, TextEmbedder};
use clauseai_api::AppContext;
use clauseai_core::{ClauseRecord, Settings};
use clauseai_store::{ClauseStore, FlatL2Index};

pub const VOCAB: [&str; 5] = ["renew", "notice", "law", "assign", "liab"];

pub const RUBRIC: &str = "High risk: uncapped, one-sided, or automatic lock-in.";
pub const SCHEMA: &str = r#"{"type":"object","required":["clause_type","risk_level","risk_score","reasons","safer_rewrite"]}"#;

pub const VERDICT: &str = r#"Here is the result:
{"clause_type":"Renewal Term","risk_level":"Medium","risk_score":5,"reasons":["Auto-renewal with short notice window (E1)"],"safer_rewrite":"Renewal requires written agreement of both parties."}
Let me know if you need more."#;

/// Counts vocabulary stems; deterministic and dependency-free.
pub fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    VOCAB
        .iter()
        .map(|k| lower.matches(k).count() as f32)
        .collect()
}

#[derive(Default)]
pub struct KeywordEmbedder {
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextEmbedder for KeywordEmbedder {
    fn encode(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(keyword_vector(text))
    }

    fn dim(&self) -> usize {
        VOCAB.len()
    }
}

pub struct CannedGenerator {
    reply: Result<String, u16>,
    pub calls: AtomicUsize,
    pub last_prompt: Mutex<String>,
}

impl CannedGenerator {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(String::new()),
        }
    }

    /// Fails every call with the given HTTP status.
    pub fn failing(status: u16) -> Self {
        Self {
            reply: Err(status),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(String::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for CannedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = prompt.to_string();
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(GenerationError::Server {
                status: *status,
                body: "backend unavailable".into(),
            }),
        }
    }

    fn model(&self) -> &str {
        "canned"
    }
}

pub fn record(id: u64, clause_type: &str, text: &str, source: &str) -> ClauseRecord {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "clause_type": clause_type,
        "text": text,
        "notes": "Auto-renewal and strict notice windows can create lock-in.",
        "source": source,
        "cuad_id": format!("{source}__{clause_type}"),
    }))
    .unwrap()
}

pub fn renewal_record() -> ClauseRecord {
    record(
        1,
        "Renewal Term",
        "This agreement renews automatically for one-year terms unless either party provides 60 days notice.",
        "DocA",
    )
}

pub fn corpus() -> Vec<ClauseRecord> {
    vec![
        renewal_record(),
        record(
            2,
            "Governing Law",
            "This Agreement is governed by the law of the State of New York.",
            "DocB",
        ),
        record(
            3,
            "Anti-Assignment",
            "Neither party may assign this Agreement without prior written consent.",
            "DocC",
        ),
    ]
}

pub fn index_for(records: &[ClauseRecord]) -> FlatL2Index {
    let mut index = FlatL2Index::new(VOCAB.len()).with_model("keyword");
    for r in records {
        index.add(r.id as i64, &keyword_vector(&r.text)).unwrap();
    }
    index
}

pub struct Harness {
    pub ctx: Arc<AppContext>,
    pub embedder: Arc<KeywordEmbedder>,
    pub generator: Arc<CannedGenerator>,
}

pub fn harness(records: Vec<ClauseRecord>, top_k: usize, generator: CannedGenerator) -> Harness {
    let index = index_for(&records);
    let store = ClauseStore::from_parts(records, index).unwrap();
    let embedder = Arc::new(KeywordEmbedder::default());
    let generator = Arc::new(generator);
    let settings = Settings {
        top_k,
        llm_model: "canned".into(),
        ..Settings::default()
    };
    let ctx = AppContext::from_parts(
        settings,
        store,
        embedder.clone(),
        generator.clone(),
        RUBRIC.into(),
        SCHEMA.into(),
    )
    .unwrap();
    Harness {
        ctx: Arc::new(ctx),
        embedder,
        generator,
    }
}
