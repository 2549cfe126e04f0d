use std::collections::BTreeMap;

use thiserror::Error;

use crate::builtin::builtin_fields;
use crate::record::accessor_for;
use crate::spec::FieldSpec;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("field path is not addressable: {path}")]
    UnknownPath { path: String },
    #[error("duplicate field key: {key}")]
    DuplicateKey { key: String },
}

/// Immutable field table, validated at load time.
///
/// Every declared key must resolve to a typed accessor on the canonical
/// record so bad paths surface at startup, not per request.
#[derive(Clone, Debug)]
pub struct FieldRegistry {
    fields: Vec<FieldSpec>,
    by_key: BTreeMap<String, usize>,
}

impl FieldRegistry {
    pub fn load(fields: Vec<FieldSpec>) -> Result<Self, RegistryError> {
        let mut by_key = BTreeMap::new();
        for (idx, spec) in fields.iter().enumerate() {
            if accessor_for(&spec.key).is_none() {
                return Err(RegistryError::UnknownPath {
                    path: spec.key.clone(),
                });
            }
            if by_key.insert(spec.key.clone(), idx).is_some() {
                return Err(RegistryError::DuplicateKey {
                    key: spec.key.clone(),
                });
            }
        }
        Ok(Self { fields, by_key })
    }

    pub fn builtin() -> Result<Self, RegistryError> {
        Self::load(builtin_fields())
    }

    pub fn get(&self, key: &str) -> Option<&FieldSpec> {
        self.by_key.get(key).map(|&idx| &self.fields[idx])
    }

    pub fn label_for<'a>(&'a self, key: &'a str) -> &'a str {
        self.get(key).map(|s| s.label.as_str()).unwrap_or(key)
    }

    /// All fields in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    /// Fields included in the deterministic validation sweep.
    pub fn iter_validation(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|s| s.validate)
    }

    /// Fields with an autofill mapping, in fill order.
    pub fn iter_autofill(&self) -> Vec<&FieldSpec> {
        let mut targets: Vec<&FieldSpec> =
            self.fields.iter().filter(|s| s.autofill.is_some()).collect();
        targets.sort_by_key(|s| s.autofill.as_ref().map(|a| a.order).unwrap_or(0));
        targets
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
