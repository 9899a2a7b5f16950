//! Process-wide cache of ledger clients.
//!
//! Contexts are built lazily on first use and replaced wholesale on
//! refresh. Every context carries a generation number so concurrent
//! refreshes of the same stale context collapse into a single rebuild.
//!
//! Clients are built outside the map lock. Builds for one key are
//! serialized by a per-key slot, so a slow provider only delays callers
//! of that key.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::info;

use atlas_common::{GatewayError, Result};

use crate::ports::{ChannelHandle, ClientProvider, LedgerClient};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextKey {
    pub org: String,
    pub user: Option<String>,
}

impl ContextKey {
    pub fn new(org: &str, user: Option<&str>) -> Self {
        Self { org: org.to_string(), user: user.map(str::to_string) }
    }
}

/// A ledger client for one (org, user), as of one generation.
pub struct GatewayContext {
    key: ContextKey,
    client: Arc<dyn LedgerClient>,
    generation: u64,
}

impl GatewayContext {
    pub fn key(&self) -> &ContextKey {
        &self.key
    }

    pub fn client(&self) -> &Arc<dyn LedgerClient> {
        &self.client
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn channel(&self, name: &str) -> Result<Arc<dyn ChannelHandle>> {
        self.client.channel(name).ok_or_else(|| {
            GatewayError::Configuration(format!("Channel {} was not defined in the connection profile", name))
        })
    }
}

pub struct ConnectionPool {
    provider: Arc<dyn ClientProvider>,
    contexts: RwLock<HashMap<ContextKey, Arc<GatewayContext>>>,
    build_slots: Mutex<HashMap<ContextKey, Arc<Mutex<()>>>>,
    generation: AtomicU64,
}

impl ConnectionPool {
    pub fn new(provider: Arc<dyn ClientProvider>) -> Self {
        Self {
            provider,
            contexts: RwLock::new(HashMap::new()),
            build_slots: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Cached context for `key`, built on first use.
    pub async fn context(&self, key: &ContextKey) -> Result<Arc<GatewayContext>> {
        if let Some(ctx) = self.cached(key).await {
            return Ok(ctx);
        }

        let slot = self.build_slot(key).await;
        let _building = slot.lock().await;
        // Another caller may have built it while we waited for the slot.
        if let Some(ctx) = self.cached(key).await {
            return Ok(ctx);
        }
        let ctx = self.build(key).await?;
        self.contexts.write().await.insert(key.clone(), Arc::clone(&ctx));
        Ok(ctx)
    }

    /// Replaces `stale` unless someone already replaced it, in which case
    /// the newer context is returned as is.
    pub async fn refresh(&self, stale: &GatewayContext) -> Result<Arc<GatewayContext>> {
        let slot = self.build_slot(stale.key()).await;
        let _building = slot.lock().await;
        if let Some(current) = self.cached(stale.key()).await {
            if current.generation() != stale.generation() {
                return Ok(current);
            }
        }

        let ctx = self.build(stale.key()).await?;
        info!(
            "refreshed ledger client for {} (generation {} -> {})",
            stale.key().org,
            stale.generation(),
            ctx.generation()
        );
        self.contexts.write().await.insert(stale.key().clone(), Arc::clone(&ctx));
        Ok(ctx)
    }

    pub async fn len(&self) -> usize {
        self.contexts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.contexts.read().await.is_empty()
    }

    async fn cached(&self, key: &ContextKey) -> Option<Arc<GatewayContext>> {
        self.contexts.read().await.get(key).cloned()
    }

    async fn build_slot(&self, key: &ContextKey) -> Arc<Mutex<()>> {
        let mut slots = self.build_slots.lock().await;
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    async fn build(&self, key: &ContextKey) -> Result<Arc<GatewayContext>> {
        let client = self
            .provider
            .client_for_org(&key.org, key.user.as_deref())
            .await
            .map_err(|e| GatewayError::Configuration(format!("failed to load client for org {}: {}", key.org, e)))?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Arc::new(GatewayContext { key: key.clone(), client, generation }))
    }
}
