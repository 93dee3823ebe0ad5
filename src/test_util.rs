//! Test doubles shared by the module tests: deterministic fake providers,
//! an in-memory cosine index, and minimal PDF builders.

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::embeddings::openai::EmbeddingProvider;
use crate::llm::LlmProvider;
use crate::vector_store::{ScoredChunk, VectorEntry, VectorIndex};
use crate::{RagError, Result};

pub(crate) const FAKE_DIMENSION: u32 = 26;

/// Maps text to a normalized letter-frequency vector, so texts sharing
/// words get a high cosine similarity.
pub(crate) fn letter_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0f32; FAKE_DIMENSION as usize];
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() {
            v[(c as usize) - ('a' as usize)] += 1.0;
        }
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

pub(crate) struct FakeEmbedder;

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(letter_vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| letter_vector(t)).collect())
    }
}

pub(crate) struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::Embedding("simulated embedding failure".to_string()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(RagError::Embedding("simulated embedding failure".to_string()))
    }
}

/// Echoes the prompt back as the completion and counts invocations, so
/// tests can assert both on prompt contents and on whether the LLM was
/// called at all.
pub(crate) struct FakeLlm {
    pub calls: AtomicUsize,
}

impl FakeLlm {
    pub(crate) fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("Generated answer based on:\n{prompt}"))
    }
}

pub(crate) struct FailingLlm;

#[async_trait]
impl LlmProvider for FailingLlm {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(RagError::Llm("simulated completion failure".to_string()))
    }
}

/// In-memory stand-in for the remote vector index, ranking stored entries
/// by cosine similarity.
#[derive(Default)]
pub(crate) struct InMemoryIndex {
    entries: Mutex<Vec<VectorEntry>>,
}

impl InMemoryIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn stored(&self) -> Vec<VectorEntry> {
        self.entries.lock().expect("index lock").clone()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<usize> {
        let count = entries.len();
        let mut stored = self.entries.lock().expect("index lock");
        stored.extend(entries);
        Ok(count)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let stored = self.entries.lock().expect("index lock");
        let mut scored: Vec<ScoredChunk> = stored
            .iter()
            .map(|entry| ScoredChunk {
                score: cosine_similarity(vector, &entry.values),
                metadata: entry.metadata.clone(),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }
}

pub(crate) struct FailingIndex;

#[async_trait]
impl VectorIndex for FailingIndex {
    async fn upsert(&self, _entries: Vec<VectorEntry>) -> Result<usize> {
        Err(RagError::VectorStore("simulated store failure".to_string()))
    }

    async fn query(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<ScoredChunk>> {
        Err(RagError::VectorStore("simulated store failure".to_string()))
    }
}

/// Build a minimal PDF with one page per entry in `pages_text`.
pub(crate) fn pdf_with_pages(pages_text: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages_text {
        let operations = if text.is_empty() {
            Vec::new()
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode page content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let page_count = i64::try_from(kids.len()).expect("page count fits in i64");
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize pdf");
    bytes
}

/// A one-page PDF whose content stream draws no text, like a scanned
/// image-only document.
pub(crate) fn pdf_without_text() -> Vec<u8> {
    pdf_with_pages(&[""])
}
