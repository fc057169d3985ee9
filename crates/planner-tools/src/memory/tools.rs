use super::store::MemoryStore;
use crate::names;
use crate::tool::{required_str, Tool, ToolContext};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Create, update or delete a long-term memory
pub struct ManageMemory {
    store: Arc<MemoryStore>,
}

impl ManageMemory {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ManageMemory {
    fn name(&self) -> &str {
        names::MANAGE_MEMORY
    }

    fn description(&self) -> &str {
        "Create, update or delete a memory that persists across conversations. \
         Store only important marketing insights or user preferences. \
         Include the memory id when updating or deleting."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": { "type": "string", "description": "The memory content" },
                "action": {
                    "type": "string",
                    "enum": ["create", "update", "delete"],
                    "default": "create"
                },
                "id": { "type": "string", "description": "Id of the memory to update or delete" }
            }
        })
    }

    async fn call(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        let action = args.get("action").and_then(Value::as_str).unwrap_or("create");

        match action {
            "create" => {
                let content = required_str(&args, "content")?;
                let item = self.store.create(content).await?;
                tracing::info!(namespace = self.store.namespace(), id = %item.id, "memory created");
                Ok(format!("created memory {}", item.id))
            }
            "update" => {
                let id = required_str(&args, "id")?;
                let content = required_str(&args, "content")?;
                let item = self.store.update(id, content).await?;
                Ok(format!("updated memory {}", item.id))
            }
            "delete" => {
                let id = required_str(&args, "id")?;
                self.store.delete(id).await?;
                Ok(format!("deleted memory {}", id))
            }
            other => anyhow::bail!("Unknown memory action '{}'", other),
        }
    }
}

/// Search long-term memories
pub struct SearchMemory {
    store: Arc<MemoryStore>,
}

impl SearchMemory {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for SearchMemory {
    fn name(&self) -> &str {
        names::SEARCH_MEMORY
    }

    fn description(&self) -> &str {
        "Search previously stored marketing insights and user preferences."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "What to look for" },
                "limit": { "type": "integer", "default": DEFAULT_SEARCH_LIMIT }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        let query = required_str(&args, "query")?;
        let limit = args
            .get("limit")
            .and_then(Value::as_u64)
            .map(|l| l as usize)
            .unwrap_or(DEFAULT_SEARCH_LIMIT);

        let results = self.store.search(query, limit).await;
        Ok(serde_json::to_string(&results)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryConfig;

    fn ctx() -> ToolContext {
        ToolContext::new("openai/gpt-4o")
    }

    #[tokio::test]
    async fn test_manage_then_search() {
        let store = Arc::new(MemoryStore::new(MemoryConfig::default()));
        let manage = ManageMemory::new(store.clone());
        let search = SearchMemory::new(store.clone());

        let created = manage
            .call(json!({ "content": "User prefers LinkedIn for B2B leads" }), &ctx())
            .await
            .unwrap();
        assert!(created.starts_with("created memory "));

        let found = search
            .call(json!({ "query": "linkedin leads" }), &ctx())
            .await
            .unwrap();
        let found: Value = serde_json::from_str(&found).unwrap();
        assert_eq!(found.as_array().unwrap().len(), 1);
        assert_eq!(found[0]["namespace"], "marketing_memories");

        let id = created.trim_start_matches("created memory ");
        let deleted = manage
            .call(json!({ "action": "delete", "id": id }), &ctx())
            .await
            .unwrap();
        assert_eq!(deleted, format!("deleted memory {}", id));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_actions() {
        let manage = ManageMemory::new(Arc::new(MemoryStore::new(MemoryConfig::default())));

        assert!(manage.call(json!({ "action": "update", "content": "x" }), &ctx()).await.is_err());
        assert!(manage.call(json!({ "action": "purge" }), &ctx()).await.is_err());
        assert!(manage.call(json!({}), &ctx()).await.is_err());
    }
}
