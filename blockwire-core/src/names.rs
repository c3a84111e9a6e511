//! Fresh-name generation.
//!
//! Each pass owns its generators; nothing here is global. Labels are
//! namespaced by the function they belong to so they stay unique when
//! function bodies are later spliced into one another.

use std::collections::HashMap;

use crate::symbols::{Label, Variable};
use crate::types::Type;

#[derive(Debug, Clone)]
pub struct LabelGenerator {
    scope: String,
    counters: HashMap<String, u32>,
}

impl LabelGenerator {
    pub fn new(scope: impl Into<String>) -> Self {
        LabelGenerator {
            scope: scope.into(),
            counters: HashMap::new(),
        }
    }

    /// `scope.kindN`, with `N` counting per `kind` from 1.
    pub fn fresh(&mut self, kind: &str) -> Label {
        let counter = self.counters.entry(kind.to_string()).or_insert(0);
        *counter += 1;
        Label::new(format!("{}.{}{}", self.scope, kind, counter))
    }
}

/// Monotonic generator of compiler-reserved temporaries.
#[derive(Debug, Clone)]
pub struct NameGenerator {
    prefix: String,
    next: u32,
}

impl NameGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        NameGenerator {
            prefix: prefix.into(),
            next: 0,
        }
    }

    pub fn fresh_name(&mut self) -> String {
        let name = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        name
    }

    pub fn fresh(&mut self, ty: Type) -> Variable {
        Variable::temporary(self.fresh_name(), ty)
    }

    pub fn issued(&self) -> u32 {
        self.next
    }
}
