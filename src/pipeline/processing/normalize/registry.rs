use std::collections::BTreeMap;

use super::rules::{Canonicalizer, RuleTable};
use crate::config::NormalizeConfig;
use crate::domain::Field;
use crate::error::Result;

/// Registry of per-field canonicalization strategies
pub struct CanonicalizerRegistry {
    canonicalizers: BTreeMap<Field, Box<dyn Canonicalizer>>,
}

impl CanonicalizerRegistry {
    /// Compile the configured rule tables for industry, location and country
    pub fn from_config(config: &NormalizeConfig) -> Result<Self> {
        let mut registry = Self {
            canonicalizers: BTreeMap::new(),
        };

        for (field, rules) in config.by_field() {
            registry.register(field, Box::new(RuleTable::compile(rules)?));
        }

        Ok(registry)
    }

    /// Register (or replace) the canonicalizer for a field
    pub fn register(&mut self, field: Field, canonicalizer: Box<dyn Canonicalizer>) {
        self.canonicalizers.insert(field, canonicalizer);
    }

    pub fn get(&self, field: Field) -> Option<&dyn Canonicalizer> {
        self.canonicalizers.get(&field).map(|c| c.as_ref())
    }

    /// Fields with a registered canonicalizer, in schema order
    pub fn fields(&self) -> Vec<Field> {
        self.canonicalizers.keys().copied().collect()
    }
}
