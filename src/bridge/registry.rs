//! In-process registry of bridges keyed by identity tag.
//!
//! The registry is the embedding runtime's dispatch table: one shared,
//! read-only bridge instance per tag for the lifetime of a context. Tags are
//! validated on registration so lookups and emitted records never carry
//! malformed identities.

use crate::bridge::{CapabilityBridge, FoundationModels};
use crate::spec::BridgeTag;
use anyhow::{Result, bail};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Default, Clone)]
/// Dispatch table mapping identity tags to shared bridge instances.
pub struct BridgeRegistry {
    bridges: BTreeMap<BridgeTag, Arc<dyn CapabilityBridge>>,
}

impl BridgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the bridges this crate ships.
    pub fn with_defaults() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(FoundationModels::new()))?;
        Ok(registry)
    }

    /// Register a bridge under its own identity tag.
    ///
    /// Tags must be non-empty, match `^[A-Za-z0-9_.-]+$`, and be unique
    /// within the registry; collisions are registration bugs, not runtime
    /// conditions, so they fail loudly.
    pub fn register(&mut self, bridge: Arc<dyn CapabilityBridge>) -> Result<()> {
        let tag = BridgeTag(bridge.tag().to_string());
        validate_tag(&tag)?;
        if self.bridges.contains_key(&tag) {
            bail!("duplicate bridge tag {}", tag.0);
        }
        self.bridges.insert(tag, bridge);
        Ok(())
    }

    /// Resolve a bridge by tag, sharing the instance with the caller.
    pub fn get(&self, tag: &BridgeTag) -> Option<Arc<dyn CapabilityBridge>> {
        self.bridges.get(tag).cloned()
    }

    /// Iterates registered tags in stable order.
    pub fn tags(&self) -> impl Iterator<Item = &BridgeTag> {
        self.bridges.keys()
    }

    /// Iterates tag/bridge pairs in stable order.
    pub fn iter(&self) -> impl Iterator<Item = (&BridgeTag, &Arc<dyn CapabilityBridge>)> {
        self.bridges.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.bridges.is_empty()
    }
}

fn validate_tag(tag: &BridgeTag) -> Result<()> {
    if tag.0.is_empty() {
        bail!("bridge tag must not be empty");
    }
    if !tag
        .0
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        bail!("bridge tag must match ^[A-Za-z0-9_.-]+$, got {}", tag.0);
    }
    Ok(())
}
