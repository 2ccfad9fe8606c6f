//! Per-call reference store for schema generation.

use std::collections::{HashSet, VecDeque};

use fieldspec_core::SchemaId;
use serde_json::{json, Map, Value};

/// Tracks referenced registries during one `generate` call.
///
/// Created at entry and dropped at exit; nothing outlives the call, so
/// concurrent generation against one registry needs no coordination.
#[derive(Debug)]
pub(crate) struct RefContext {
    key: String,
    pending: VecDeque<SchemaId>,
    seen: HashSet<SchemaId>,
    definitions: Map<String, Value>,
}

impl RefContext {
    pub fn new(definitions_key: &str) -> Self {
        Self {
            key: definitions_key.to_string(),
            pending: VecDeque::new(),
            seen: HashSet::new(),
            definitions: Map::new(),
        }
    }

    /// Pointer to `target`, queueing it for generation on first use.
    pub fn reference(&mut self, target: &SchemaId) -> Value {
        if self.seen.insert(target.clone()) {
            self.pending.push_back(target.clone());
        }
        json!({ "$ref": local_pointer(&self.key, target.as_str()) })
    }

    pub fn next_pending(&mut self) -> Option<SchemaId> {
        self.pending.pop_front()
    }

    pub fn define(&mut self, target: &SchemaId, schema: Value) {
        self.definitions.insert(target.to_string(), schema);
    }

    /// The definitions key and the collected definitions.
    pub fn finish(self) -> (String, Map<String, Value>) {
        (self.key, self.definitions)
    }
}

/// `#/<section>/<name>` with both tokens escaped per RFC 6901.
pub(crate) fn local_pointer(section: &str, name: &str) -> String {
    format!("#/{}/{}", escape_token(section), escape_token(name))
}

fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}
