use anyhow::Result;
use chrono::{DateTime, Utc};
use planner_llm::EmbeddingClient;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub namespace: String,
    pub embedding_model: String,
    pub dims: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            namespace: "marketing_memories".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            dims: 1536,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryItem {
    pub id: String,
    pub namespace: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredMemory {
    #[serde(flatten)]
    pub item: MemoryItem,
    pub score: f32,
}

/// Process-local memory store.
///
/// With an embedding client, items are ranked by cosine similarity; without
/// one (or when embedding fails) they are ranked by token overlap. The two
/// scores are not comparable, so embedded items always rank first.
pub struct MemoryStore {
    config: MemoryConfig,
    embedder: Option<Arc<dyn EmbeddingClient>>,
    items: RwLock<HashMap<String, MemoryItem>>,
}

impl MemoryStore {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            embedder: None,
            items: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingClient>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    async fn embed_one(&self, text: &str) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;
        match embedder
            .embed(&self.config.embedding_model, vec![text.to_string()])
            .await
        {
            Ok(mut vectors) if !vectors.is_empty() => {
                let vector = vectors.swap_remove(0);
                if vector.len() != self.config.dims {
                    tracing::warn!(
                        expected = self.config.dims,
                        actual = vector.len(),
                        "embedding dimension mismatch"
                    );
                }
                Some(vector)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "embedding failed, falling back to keyword ranking");
                None
            }
        }
    }

    pub async fn create(&self, content: &str) -> Result<MemoryItem> {
        let now = Utc::now();
        let item = MemoryItem {
            id: uuid::Uuid::new_v4().to_string(),
            namespace: self.config.namespace.clone(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
            embedding: self.embed_one(content).await,
        };

        self.items.write().await.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    pub async fn update(&self, id: &str, content: &str) -> Result<MemoryItem> {
        let embedding = self.embed_one(content).await;
        let mut items = self.items.write().await;
        let item = items
            .get_mut(id)
            .ok_or_else(|| anyhow::anyhow!("Memory '{}' not found", id))?;

        item.content = content.to_string();
        item.updated_at = Utc::now();
        item.embedding = embedding;
        Ok(item.clone())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.items
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| anyhow::anyhow!("Memory '{}' not found", id))
    }

    pub async fn get(&self, id: &str) -> Option<MemoryItem> {
        self.items.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    /// Embed items stored while the embedder was unavailable
    async fn backfill_embeddings(&self) {
        let Some(embedder) = self.embedder.as_ref() else {
            return;
        };
        let missing: Vec<(String, String)> = self
            .items
            .read()
            .await
            .values()
            .filter(|item| item.embedding.is_none())
            .map(|item| (item.id.clone(), item.content.clone()))
            .collect();
        if missing.is_empty() {
            return;
        }

        let inputs = missing.iter().map(|(_, content)| content.clone()).collect();
        match embedder.embed(&self.config.embedding_model, inputs).await {
            Ok(vectors) if vectors.len() == missing.len() => {
                let mut items = self.items.write().await;
                for ((id, content), vector) in missing.into_iter().zip(vectors) {
                    // skip items edited while the batch was in flight
                    if let Some(item) = items.get_mut(&id).filter(|item| item.content == content) {
                        item.embedding = Some(vector);
                    }
                }
            }
            Ok(vectors) => tracing::warn!(
                expected = missing.len(),
                actual = vectors.len(),
                "embedding backfill returned the wrong number of vectors"
            ),
            Err(e) => tracing::warn!(error = %e, pending = missing.len(), "embedding backfill failed"),
        }
    }

    /// Best matches first; items scoring zero are left out
    pub async fn search(&self, query: &str, limit: usize) -> Vec<ScoredMemory> {
        let query_embedding = self.embed_one(query).await;
        if query_embedding.is_some() {
            self.backfill_embeddings().await;
        }
        let items = self.items.read().await;

        let mut semantic = Vec::new();
        let mut keyword = Vec::new();
        for item in items.values() {
            let (score, group) = match (&query_embedding, &item.embedding) {
                (Some(q), Some(e)) => (cosine_similarity(q, e), &mut semantic),
                _ => (token_overlap(query, &item.content), &mut keyword),
            };
            if score > 0.0 {
                group.push(ScoredMemory {
                    item: item.clone(),
                    score,
                });
            }
        }

        sort_by_score(&mut semantic);
        sort_by_score(&mut keyword);
        let mut scored = semantic;
        scored.extend(keyword);
        scored.truncate(limit);
        scored
    }
}

fn sort_by_score(scored: &mut [ScoredMemory]) {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.item.updated_at.cmp(&a.item.updated_at))
    });
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(str::to_lowercase)
        .collect()
}

/// Fraction of query tokens present in the content
pub fn token_overlap(query: &str, content: &str) -> f32 {
    let query_tokens = tokens(query);
    if query_tokens.is_empty() {
        return 0.0;
    }
    let content_tokens = tokens(content);
    let hits = query_tokens.intersection(&content_tokens).count();
    hits as f32 / query_tokens.len() as f32
}
