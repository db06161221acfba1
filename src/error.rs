// src/error.rs

//! The error taxonomy for the container core.

use thiserror::Error;

/// The main error type for `armature`.
///
/// Every variant carries the name of the bean (or definition, or query) it
/// concerns; cycle and ambiguity variants carry the full path or candidate
/// list so a failure is diagnosable without re-running the resolution.
#[derive(Debug, Error)]
pub enum BeanError {
  /// A definition with this name already exists and overriding is disabled.
  #[error("a definition named '{0}' is already registered and overriding is disabled")]
  DuplicateDefinition(String),

  /// No definition is registered under this name.
  #[error("no definition named '{0}' is registered")]
  NoSuchDefinition(String),

  /// A `parent_name` chain (or an alias chain) loops back on itself.
  #[error("definition inheritance cycle: {}", path.join(" -> "))]
  CyclicInheritance { path: Vec<String> },

  /// No bean can be produced for a name or typed query.
  #[error("no bean available for '{0}'")]
  NoSuchBean(String),

  /// A typed query matched more than one candidate and no tie-break applied.
  #[error("dependency '{query}' is ambiguous; candidates: {}", candidates.join(", "))]
  AmbiguousDependency {
    query: String,
    candidates: Vec<String>,
  },

  /// A creation recursed into a bean already being created, and the cycle is
  /// not resolvable with an early singleton reference.
  #[error("circular dependency: {}", path.join(" -> "))]
  CircularDependency { path: Vec<String> },

  /// A literal value could not be coerced to the requested slot type.
  #[error("cannot convert value '{value}' to '{target}'")]
  TypeConversion { value: String, target: String },

  /// The instantiation capability failed to produce the bean.
  #[error("instantiation of bean '{bean}' failed: {source}")]
  Instantiation {
    bean: String,
    #[source]
    source: Box<BeanError>,
  },

  /// The declared init callback failed; the partially-built instance was
  /// discarded and the cache entry evicted.
  #[error("initialization of bean '{bean}' failed: {source}")]
  Initialization {
    bean: String,
    #[source]
    source: Box<BeanError>,
  },

  /// A single destroy callback failed during scope teardown.
  #[error("destruction of bean '{bean}' failed: {reason}")]
  Destruction { bean: String, reason: String },

  /// A write was attempted against a registry that has been frozen for the
  /// resolution phase.
  #[error("registry is frozen; '{0}' cannot be registered or removed")]
  RegistryFrozen(String),

  /// A declarative definition source could not be parsed or validated.
  #[error("invalid definition source: {0}")]
  Configuration(String),

  /// Catch-all used by instantiation capability implementations for host
  /// failures that have no more precise kind.
  #[error("{0}")]
  Capability(String),
}

impl BeanError {
  /// Wraps `self` as the cause of a failed instantiation of `bean`.
  pub(crate) fn into_instantiation(self, bean: &str) -> BeanError {
    BeanError::Instantiation {
      bean: bean.to_owned(),
      source: Box::new(self),
    }
  }

  /// Wraps `self` as the cause of a failed init callback on `bean`.
  pub(crate) fn into_initialization(self, bean: &str) -> BeanError {
    BeanError::Initialization {
      bean: bean.to_owned(),
      source: Box::new(self),
    }
  }
}

/// Aggregated report from a scope teardown: every destroy action is attempted
/// and the individual failures are collected rather than aborting the sweep.
#[derive(Debug, Error)]
#[error("{} destruction action(s) failed", failures.len())]
pub struct DestructionErrors {
  pub failures: Vec<BeanError>,
}

/// A specialized `Result` type for `armature` operations.
pub type Result<T, E = BeanError> = std::result::Result<T, E>;
