//! Shared state of one module's deserialization.

use crate::finder::DescriptorFinder;
use crate::name_resolver::NameResolver;
use kite_types::FlexibleTypeCapabilities;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Weak};

/// Capabilities id of flexible types produced for platform values
/// (`readLine()` returns `String!`).
pub const PLATFORM_CAPABILITIES_ID: &str = "kite.platform";

/// Resolves the capabilities id stored in a flexible type proto.
#[derive(Debug, Clone)]
pub struct FlexibleCapabilitiesProvider {
    by_id: FxHashMap<String, Arc<FlexibleTypeCapabilities>>,
}

impl Default for FlexibleCapabilitiesProvider {
    fn default() -> Self {
        let mut provider = FlexibleCapabilitiesProvider {
            by_id: FxHashMap::default(),
        };
        provider.register(PLATFORM_CAPABILITIES_ID);
        provider
    }
}

impl FlexibleCapabilitiesProvider {
    pub fn register(&mut self, id: &str) -> Arc<FlexibleTypeCapabilities> {
        self.by_id
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(FlexibleTypeCapabilities { id: id.to_string() }))
            .clone()
    }

    pub fn get(&self, id: &str) -> Option<Arc<FlexibleTypeCapabilities>> {
        self.by_id.get(id).cloned()
    }
}

/// Everything a type or member deserializer of one module needs.
pub struct DeserializationContext {
    pub module_name: String,
    pub resolver: Arc<NameResolver>,
    pub capabilities: Arc<FlexibleCapabilitiesProvider>,
    /// Held weakly: the finder owns every class this context produces.
    pub finder: Weak<DescriptorFinder>,
}

impl std::fmt::Debug for DeserializationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeserializationContext")
            .field("module_name", &self.module_name)
            .finish_non_exhaustive()
    }
}
