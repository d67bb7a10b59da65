use std::{collections::HashMap, sync::Arc};

use dashmap::DashMap;

use crate::model::ExtensionId;

/// Extensions declared in one file, keyed by the full name of the extended message.
///
/// The aggregated view over a file's imports is computed by
/// [`ProtoContext::extensions_for`](super::ProtoContext::extensions_for) and cached here. The cache
/// is shared behind `&self`, so lookups on a finished module may run on several threads.
#[derive(Debug, Default)]
pub(crate) struct ExtensionRegistry {
    local: HashMap<String, Vec<ExtensionId>>,
    cache: DashMap<String, Arc<[ExtensionId]>>,
}

impl ExtensionRegistry {
    pub fn register(&mut self, extendee: &str, id: ExtensionId) {
        self.local.entry(extendee.to_owned()).or_default().push(id);
        self.cache.remove(extendee);
    }

    pub fn local(&self, extendee: &str) -> &[ExtensionId] {
        self.local.get(extendee).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cached(&self, extendee: &str) -> Option<Arc<[ExtensionId]>> {
        self.cache.get(extendee).map(|entry| Arc::clone(entry.value()))
    }

    pub fn store(&self, extendee: &str, extensions: Arc<[ExtensionId]>) {
        self.cache.insert(extendee.to_owned(), extensions);
    }

    pub fn is_cached(&self, extendee: &str) -> bool {
        self.cache.contains_key(extendee)
    }
}
