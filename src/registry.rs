// src/registry.rs

//! The definition registry: name -> definition storage, aliasing, parent
//! chain merging, and the two-phase configuration/resolution lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::definition::{BeanDefinition, TypeKey};
use crate::error::{BeanError, Result};

/// Thread-safe storage for bean definitions.
///
/// The registry has an explicit two-phase lifecycle: an open configuration
/// phase during which `register`/`register_alias`/`remove` are accepted,
/// ended by [`freeze`](Self::freeze), after which writes fail with
/// [`BeanError::RegistryFrozen`] until [`reopen`](Self::reopen). Reads are
/// lock-free and safe from any number of threads in either phase.
pub struct DefinitionRegistry {
  definitions: DashMap<String, Arc<BeanDefinition>>,
  /// Registration order, for deterministic enumeration and eager
  /// pre-instantiation.
  ordered_names: Mutex<Vec<String>>,
  aliases: DashMap<String, String>,
  /// Memoized results of `get_merged`, cleared wholesale on any write.
  merged: DashMap<String, Arc<BeanDefinition>>,
  frozen: AtomicBool,
  allow_overriding: bool,
}

impl Default for DefinitionRegistry {
  fn default() -> Self {
    Self::new()
  }
}

impl DefinitionRegistry {
  /// A registry that rejects re-registration of an existing name.
  pub fn new() -> Self {
    Self::with_overriding(false)
  }

  /// A registry that allows a later `register` to replace an earlier one.
  pub fn with_overriding(allow_overriding: bool) -> Self {
    Self {
      definitions: DashMap::new(),
      ordered_names: Mutex::new(Vec::new()),
      aliases: DashMap::new(),
      merged: DashMap::new(),
      frozen: AtomicBool::new(false),
      allow_overriding,
    }
  }

  // --- Phase control ---

  /// Ends the configuration phase; subsequent writes are rejected.
  pub fn freeze(&self) {
    self.frozen.store(true, Ordering::SeqCst);
    debug!("definition registry frozen for resolution");
  }

  /// Re-opens the configuration phase.
  pub fn reopen(&self) {
    self.frozen.store(false, Ordering::SeqCst);
    debug!("definition registry reopened for configuration");
  }

  pub fn is_frozen(&self) -> bool {
    self.frozen.load(Ordering::SeqCst)
  }

  fn check_open(&self, name: &str) -> Result<()> {
    if self.is_frozen() {
      warn!(name, "write attempted against a frozen registry");
      return Err(BeanError::RegistryFrozen(name.to_owned()));
    }
    Ok(())
  }

  // --- Registration ---

  /// Registers `definition` under `name`.
  pub fn register(&self, name: impl Into<String>, definition: BeanDefinition) -> Result<()> {
    let name = name.into();
    self.check_open(&name)?;
    if !self.allow_overriding && self.definitions.contains_key(&name) {
      return Err(BeanError::DuplicateDefinition(name));
    }
    // An alias under this name would keep redirecting lookups away from the
    // new record; it either blocks the registration or gives way to it.
    if self.aliases.contains_key(&name) {
      if !self.allow_overriding {
        return Err(BeanError::DuplicateDefinition(name));
      }
      self.aliases.remove(&name);
    }
    let replaced = self
      .definitions
      .insert(name.clone(), Arc::new(definition))
      .is_some();
    if !replaced {
      self.ordered_names.lock().push(name.clone());
    }
    // Any chain may pass through the new record.
    self.merged.clear();
    debug!(name, replaced, "registered bean definition");
    Ok(())
  }

  /// Registers `alias` as another name for `target`.
  ///
  /// An alias equal to its target is dropped silently. A chain that would
  /// loop back to `alias` is rejected with the offending path.
  pub fn register_alias(
    &self,
    alias: impl Into<String>,
    target: impl Into<String>,
  ) -> Result<()> {
    let alias = alias.into();
    let target = target.into();
    self.check_open(&alias)?;
    if alias == target {
      return Ok(());
    }
    if self.definitions.contains_key(&alias) {
      return Err(BeanError::DuplicateDefinition(alias));
    }
    if !self.allow_overriding {
      if let Some(existing) = self.aliases.get(&alias) {
        if *existing.value() != target {
          return Err(BeanError::DuplicateDefinition(alias));
        }
      }
    }
    // Walk the prospective chain before committing it.
    let mut path = vec![alias.clone(), target.clone()];
    let mut cursor = target.clone();
    while let Some(next) = self.aliases.get(&cursor) {
      cursor = next.value().clone();
      path.push(cursor.clone());
      if cursor == alias {
        return Err(BeanError::CyclicInheritance { path });
      }
    }
    self.aliases.insert(alias, target);
    Ok(())
  }

  /// Removes the definition registered under `name`.
  pub fn remove(&self, name: &str) -> Result<()> {
    self.check_open(name)?;
    if self.definitions.remove(name).is_none() {
      return Err(BeanError::NoSuchDefinition(name.to_owned()));
    }
    self.ordered_names.lock().retain(|n| n != name);
    self.merged.clear();
    debug!(name, "removed bean definition");
    Ok(())
  }

  // --- Lookup ---

  /// Follows alias links to the underlying definition name.
  pub fn canonical_name(&self, name: &str) -> String {
    let mut cursor = name.to_owned();
    while let Some(next) = self.aliases.get(&cursor) {
      cursor = next.value().clone();
    }
    cursor
  }

  pub fn contains(&self, name: &str) -> bool {
    self.definitions.contains_key(&self.canonical_name(name))
  }

  /// The raw (unmerged) definition, if present.
  pub fn get(&self, name: &str) -> Option<Arc<BeanDefinition>> {
    self
      .definitions
      .get(&self.canonical_name(name))
      .map(|entry| Arc::clone(entry.value()))
  }

  /// Resolves the full `parent_name` chain for `name` and returns the merged
  /// definition.
  ///
  /// Fails with [`BeanError::NoSuchDefinition`] when any link is missing and
  /// [`BeanError::CyclicInheritance`] (carrying the full path) when the chain
  /// loops, including the self-parent case. Results are memoized until the
  /// next registry write.
  pub fn get_merged(&self, name: &str) -> Result<Arc<BeanDefinition>> {
    let canonical = self.canonical_name(name);
    if let Some(hit) = self.merged.get(&canonical) {
      return Ok(Arc::clone(hit.value()));
    }

    // Collect the chain child-first, watching for loops.
    let mut chain: Vec<Arc<BeanDefinition>> = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut cursor = canonical.clone();
    loop {
      if path.contains(&cursor) {
        path.push(cursor);
        return Err(BeanError::CyclicInheritance { path });
      }
      let def = self
        .definitions
        .get(&cursor)
        .map(|entry| Arc::clone(entry.value()))
        .ok_or_else(|| BeanError::NoSuchDefinition(cursor.clone()))?;
      path.push(cursor.clone());
      let parent = def.parent_name.clone();
      chain.push(def);
      match parent {
        Some(parent_name) => cursor = self.canonical_name(&parent_name),
        None => break,
      }
    }

    // Fold root-down so each child overrides its ancestors.
    let merged = match chain.len() {
      1 => {
        let mut only = (*chain[0]).clone();
        only.parent_name = None;
        only
      }
      _ => {
        let mut iter = chain.iter().rev();
        let root = (**iter.next().unwrap()).clone();
        iter.fold(root, |acc, child| child.merged_onto(&acc))
      }
    };

    let merged = Arc::new(merged);
    self.merged.insert(canonical, Arc::clone(&merged));
    Ok(merged)
  }

  /// All definition names in registration order.
  pub fn names(&self) -> Vec<String> {
    self.ordered_names.lock().clone()
  }

  /// Names of non-abstract definitions whose merged type satisfies
  /// `predicate`. Definitions whose chain cannot be merged are skipped.
  pub fn names_by_type(&self, predicate: impl Fn(&TypeKey) -> bool) -> Vec<String> {
    self
      .names()
      .into_iter()
      .filter(|name| {
        self
          .get_merged(name)
          .map(|def| {
            !def.abstract_flag
              && def
                .type_identifier
                .as_ref()
                .is_some_and(|key| predicate(key))
          })
          .unwrap_or(false)
      })
      .collect()
  }

  /// All aliases pointing (directly) at `name`.
  pub fn aliases_of(&self, name: &str) -> Vec<String> {
    self
      .aliases
      .iter()
      .filter(|entry| entry.value() == name)
      .map(|entry| entry.key().clone())
      .collect()
  }
}
