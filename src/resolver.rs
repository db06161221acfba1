// src/resolver.rs

//! Dependency resolution: turning a constructor/property slot's requirement
//! into the name of the definition that will satisfy it.
//!
//! The resolver is a pure name-selection step. It never creates instances and
//! never detects creation cycles; both belong to the creation engine.

use tracing::trace;

use crate::definition::TypeKey;
use crate::error::{BeanError, Result};
use crate::registry::DefinitionRegistry;

/// What a dependency slot requires.
#[derive(Debug, Clone, PartialEq)]
pub enum DependencySpec {
  /// An explicit bean name.
  Named(String),
  /// A capability query arising from an autowired slot.
  Typed(TypedQuery),
}

/// A type-based capability query.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedQuery {
  pub type_key: TypeKey,
  /// Narrows candidates to those matching by name, alias, or a `"qualifier"`
  /// string attribute.
  pub qualifier: Option<String>,
  /// The requesting slot's parameter/property name, used as a final
  /// tie-break among multiple candidates.
  pub name_hint: Option<String>,
  /// When `false`, zero candidates resolves to `None` instead of failing.
  pub required: bool,
}

impl TypedQuery {
  pub fn new(type_key: TypeKey) -> Self {
    Self {
      type_key,
      qualifier: None,
      name_hint: None,
      required: true,
    }
  }
}

/// Selects definition names from a registry for dependency slots.
pub struct DependencyResolver<'r> {
  registry: &'r DefinitionRegistry,
}

impl<'r> DependencyResolver<'r> {
  pub fn new(registry: &'r DefinitionRegistry) -> Self {
    Self { registry }
  }

  /// Resolves `spec` to a definition name, or `None` for an absent optional
  /// typed query.
  pub fn resolve(&self, spec: &DependencySpec) -> Result<Option<String>> {
    match spec {
      DependencySpec::Named(name) => self.resolve_named(name).map(Some),
      DependencySpec::Typed(query) => self.resolve_typed(query),
    }
  }

  fn resolve_named(&self, name: &str) -> Result<String> {
    let canonical = self.registry.canonical_name(name);
    let merged = self
      .registry
      .get_merged(&canonical)
      .map_err(|err| match err {
        BeanError::NoSuchDefinition(n) => BeanError::NoSuchBean(n),
        other => other,
      })?;
    if merged.abstract_flag {
      return Err(BeanError::NoSuchBean(canonical));
    }
    Ok(canonical)
  }

  fn resolve_typed(&self, query: &TypedQuery) -> Result<Option<String>> {
    let mut candidates: Vec<String> = Vec::new();
    for name in self.registry.names_by_type(|key| *key == query.type_key) {
      let merged = self.registry.get_merged(&name)?;
      if !merged.is_autowire_candidate() {
        continue;
      }
      if let Some(qualifier) = &query.qualifier {
        if !self.matches_qualifier(&name, &merged.attributes, qualifier) {
          continue;
        }
      }
      candidates.push(name);
    }
    trace!(
      type_key = %query.type_key,
      candidates = ?candidates,
      "typed dependency candidates"
    );

    match candidates.len() {
      0 => {
        if query.required {
          Err(BeanError::NoSuchBean(query.type_key.to_string()))
        } else {
          Ok(None)
        }
      }
      1 => Ok(Some(candidates.remove(0))),
      _ => self.break_tie(query, candidates).map(Some),
    }
  }

  fn matches_qualifier(
    &self,
    name: &str,
    attributes: &crate::definition::Attributes,
    qualifier: &str,
  ) -> bool {
    if name == qualifier {
      return true;
    }
    if self.registry.aliases_of(name).iter().any(|a| a == qualifier) {
      return true;
    }
    attributes
      .get::<String>("qualifier")
      .is_some_and(|value| *value == qualifier)
  }

  /// Tie-break among multiple candidates: a single `primary` wins, then an
  /// exact match against the slot's name hint; otherwise ambiguity is a
  /// hard failure listing every candidate.
  fn break_tie(&self, query: &TypedQuery, candidates: Vec<String>) -> Result<String> {
    let mut primaries = Vec::new();
    for name in &candidates {
      if self.registry.get_merged(name)?.is_primary() {
        primaries.push(name.clone());
      }
    }
    if primaries.len() == 1 {
      return Ok(primaries.remove(0));
    }

    if let Some(hint) = &query.name_hint {
      if let Some(hit) = candidates.iter().find(|name| *name == hint) {
        return Ok(hit.clone());
      }
    }

    Err(BeanError::AmbiguousDependency {
      query: query.type_key.to_string(),
      candidates,
    })
  }
}
