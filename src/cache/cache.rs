use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};
use tracing::debug;

use crate::error::Result;
use crate::port::{QueryPort, Template};

/// Write-once memo of task templates keyed by template id.
///
/// Every key owns a `OnceCell`, so concurrent first lookups of the same id
/// share one upstream call. A failed lookup leaves the cell empty and the
/// next caller tries the upstream again. Entries are never evicted.
#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: RwLock<HashMap<String, Arc<OnceCell<Template>>>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        TemplateCache::default()
    }

    pub async fn get<P>(&self, template_id: &str, port: &P) -> Result<Template>
    where
        P: QueryPort + ?Sized,
    {
        let cell = self.cell(template_id).await;
        let template = cell
            .get_or_try_init(|| async move {
                debug!("[CACHE] miss for template {}", template_id);
                port.describe_template(template_id).await
            })
            .await?;
        Ok(template.clone())
    }

    /// Number of resolved templates.
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.values().filter(|cell| cell.initialized()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn cell(&self, template_id: &str) -> Arc<OnceCell<Template>> {
        // fast path: most lookups hit an existing cell
        if let Some(cell) = self.entries.read().await.get(template_id) {
            return cell.clone();
        }
        let mut entries = self.entries.write().await;
        entries.entry(template_id.to_string()).or_default().clone()
    }
}
