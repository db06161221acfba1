// src/definition.rs

//! The definition record data model: everything the container knows about a
//! bean before it exists.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// An opaque key identifying a host type.
///
/// The core never inspects types itself; a `TypeKey` is only meaningful to
/// the [`Instantiator`](crate::Instantiator) and
/// [`ValueCoercer`](crate::ValueCoercer) capabilities that bind keys to real
/// construction code. `TypeKey::of::<T>()` derives a key from the Rust type
/// name, which is the convention the shipped closure-table bindings use.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeKey(String);

impl TypeKey {
  pub fn new(key: impl Into<String>) -> Self {
    TypeKey(key.into())
  }

  /// Derives a key from a Rust type via `std::any::type_name`.
  pub fn of<T: Any>() -> Self {
    TypeKey(std::any::type_name::<T>().to_owned())
  }

  /// Whether this key names the Rust type `T`.
  pub fn is<T: Any>(&self) -> bool {
    self.0 == std::any::type_name::<T>()
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for TypeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl fmt::Debug for TypeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "TypeKey({})", self.0)
  }
}

impl From<&str> for TypeKey {
  fn from(s: &str) -> Self {
    TypeKey(s.to_owned())
  }
}

/// The lifetime/sharing policy of a bean.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Scope {
  /// One shared instance per container.
  #[default]
  Singleton,
  /// A fresh instance on every request; never cached, never destroyed by the
  /// container.
  Prototype,
  /// A delegated policy identified by name (for example per-session). Cached
  /// and torn down like a singleton, under its own scope id.
  Custom(String),
}

impl Scope {
  pub const SINGLETON_ID: &'static str = "singleton";

  /// The cache/teardown identifier for this scope.
  pub fn id(&self) -> &str {
    match self {
      Scope::Singleton => Self::SINGLETON_ID,
      Scope::Prototype => "prototype",
      Scope::Custom(name) => name,
    }
  }

  pub fn is_singleton(&self) -> bool {
    matches!(self, Scope::Singleton)
  }

  pub fn is_prototype(&self) -> bool {
    matches!(self, Scope::Prototype)
  }
}

/// Role hint for tooling and diagnostics. Never affects resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
  /// A user-defined bean, the main part of the application.
  #[default]
  Application,
  /// A supporting bean of some larger configuration unit.
  Support,
  /// Entirely internal to the container's own workings.
  Infrastructure,
}

/// A literal scalar appearing in a definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
  Bool(bool),
  Int(i64),
  Float(f64),
  Str(String),
}

impl fmt::Display for Literal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Literal::Bool(v) => write!(f, "{}", v),
      Literal::Int(v) => write!(f, "{}", v),
      Literal::Float(v) => write!(f, "{}", v),
      Literal::Str(v) => f.write_str(v),
    }
  }
}

impl From<bool> for Literal {
  fn from(v: bool) -> Self {
    Literal::Bool(v)
  }
}
impl From<i64> for Literal {
  fn from(v: i64) -> Self {
    Literal::Int(v)
  }
}
impl From<f64> for Literal {
  fn from(v: f64) -> Self {
    Literal::Float(v)
  }
}
impl From<&str> for Literal {
  fn from(v: &str) -> Self {
    Literal::Str(v.to_owned())
  }
}
impl From<String> for Literal {
  fn from(v: String) -> Self {
    Literal::Str(v)
  }
}

/// What fills one constructor or property slot: a literal value, an explicit
/// reference to another bean, or an implicit type-based query.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSpec {
  Literal(Literal),
  Ref(String),
  Autowire {
    type_key: TypeKey,
    qualifier: Option<String>,
    /// When `false`, zero candidates resolves to absent instead of failing.
    required: bool,
  },
}

impl ValueSpec {
  pub fn lit(value: impl Into<Literal>) -> Self {
    ValueSpec::Literal(value.into())
  }

  pub fn reference(name: impl Into<String>) -> Self {
    ValueSpec::Ref(name.into())
  }

  /// A required type-based query for the Rust type `T`.
  pub fn by_type<T: Any>() -> Self {
    ValueSpec::Autowire {
      type_key: TypeKey::of::<T>(),
      qualifier: None,
      required: true,
    }
  }

  pub fn by_type_key(type_key: TypeKey) -> Self {
    ValueSpec::Autowire {
      type_key,
      qualifier: None,
      required: true,
    }
  }

  pub fn optional(self) -> Self {
    match self {
      ValueSpec::Autowire {
        type_key, qualifier, ..
      } => ValueSpec::Autowire {
        type_key,
        qualifier,
        required: false,
      },
      other => other,
    }
  }

  pub fn qualified(self, qualifier: impl Into<String>) -> Self {
    match self {
      ValueSpec::Autowire {
        type_key, required, ..
      } => ValueSpec::Autowire {
        type_key,
        qualifier: Some(qualifier.into()),
        required,
      },
      other => other,
    }
  }
}

/// One positional constructor argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorArg {
  pub value: ValueSpec,
  /// Coercion target for literal values; ignored for references.
  pub type_hint: Option<TypeKey>,
}

/// One named property slot. Population order is declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValue {
  pub name: String,
  pub value: ValueSpec,
  pub type_hint: Option<TypeKey>,
}

/// An opaque per-definition metadata side-channel: string key to any value.
///
/// `compute_if_absent` takes `&mut self` and is therefore not subject to
/// concurrent first-computation at all; merged definitions are immutable, so
/// attribute mutation belongs to the configuration phase.
#[derive(Clone, Default)]
pub struct Attributes {
  map: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Attributes {
  pub fn set(&mut self, key: impl Into<String>, value: impl Any + Send + Sync) {
    self.map.insert(key.into(), Arc::new(value));
  }

  pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
    self
      .map
      .get(key)
      .and_then(|v| Arc::clone(v).downcast::<T>().ok())
  }

  pub fn remove(&mut self, key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
    self.map.remove(key)
  }

  pub fn contains(&self, key: &str) -> bool {
    self.map.contains_key(key)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.map.keys().map(String::as_str)
  }

  /// Returns the attribute under `key`, computing and storing it first when
  /// absent.
  pub fn compute_if_absent<T: Any + Send + Sync>(
    &mut self,
    key: &str,
    compute: impl FnOnce() -> T,
  ) -> Arc<T> {
    if let Some(existing) = self.get::<T>(key) {
      return existing;
    }
    let value = Arc::new(compute());
    self
      .map
      .insert(key.to_owned(), Arc::clone(&value) as Arc<dyn Any + Send + Sync>);
    value
  }

  fn merge_from(&mut self, parent: &Attributes) {
    for (k, v) in &parent.map {
      self.map.entry(k.clone()).or_insert_with(|| Arc::clone(v));
    }
  }
}

impl fmt::Debug for Attributes {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_set().entries(self.map.keys()).finish()
  }
}

/// The declarative description from which a bean is created.
///
/// Scalar fields that participate in parent/child merging are `Option` so the
/// merge can distinguish "explicitly set" from "inherit"; accessors apply the
/// documented defaults.
#[derive(Debug, Clone, Default)]
pub struct BeanDefinition {
  pub parent_name: Option<String>,
  pub type_identifier: Option<TypeKey>,
  pub scope: Option<Scope>,
  pub lazy_init: Option<bool>,
  pub depends_on: Vec<String>,
  pub primary: Option<bool>,
  pub autowire_candidate: Option<bool>,
  pub constructor_args: Vec<ConstructorArg>,
  pub property_values: Vec<PropertyValue>,
  pub factory_bean_name: Option<String>,
  pub factory_method_name: Option<String>,
  pub init_method_name: Option<String>,
  pub destroy_method_name: Option<String>,
  pub role: Option<Role>,
  /// Abstract definitions exist only to be inherited. Not itself inherited:
  /// the child of an abstract parent is concrete unless it says otherwise.
  pub abstract_flag: bool,
  /// Opaque provenance (file, line, tool) for diagnostics only.
  pub source: Option<String>,
  pub attributes: Attributes,
}

impl BeanDefinition {
  pub fn new() -> Self {
    Self::default()
  }

  /// A definition for the Rust type `T`, keyed by its type name.
  pub fn of<T: Any>() -> Self {
    Self {
      type_identifier: Some(TypeKey::of::<T>()),
      ..Self::default()
    }
  }

  pub fn with_type(type_key: impl Into<TypeKey>) -> Self {
    Self {
      type_identifier: Some(type_key.into()),
      ..Self::default()
    }
  }

  // --- Fluent configuration ---

  pub fn parent(mut self, name: impl Into<String>) -> Self {
    self.parent_name = Some(name.into());
    self
  }

  pub fn scoped(mut self, scope: Scope) -> Self {
    self.scope = Some(scope);
    self
  }

  pub fn lazy(mut self, lazy: bool) -> Self {
    self.lazy_init = Some(lazy);
    self
  }

  pub fn depends_on(mut self, name: impl Into<String>) -> Self {
    self.depends_on.push(name.into());
    self
  }

  pub fn primary(mut self, primary: bool) -> Self {
    self.primary = Some(primary);
    self
  }

  pub fn autowire_candidate(mut self, candidate: bool) -> Self {
    self.autowire_candidate = Some(candidate);
    self
  }

  pub fn ctor_arg(mut self, value: ValueSpec) -> Self {
    self.constructor_args.push(ConstructorArg {
      value,
      type_hint: None,
    });
    self
  }

  pub fn ctor_arg_typed(mut self, value: ValueSpec, type_hint: TypeKey) -> Self {
    self.constructor_args.push(ConstructorArg {
      value,
      type_hint: Some(type_hint),
    });
    self
  }

  pub fn property(mut self, name: impl Into<String>, value: ValueSpec) -> Self {
    self.property_values.push(PropertyValue {
      name: name.into(),
      value,
      type_hint: None,
    });
    self
  }

  pub fn property_typed(
    mut self,
    name: impl Into<String>,
    value: ValueSpec,
    type_hint: TypeKey,
  ) -> Self {
    self.property_values.push(PropertyValue {
      name: name.into(),
      value,
      type_hint: Some(type_hint),
    });
    self
  }

  /// Produce this bean by invoking `method` on the bean named `factory`.
  pub fn factory(mut self, factory: impl Into<String>, method: impl Into<String>) -> Self {
    self.factory_bean_name = Some(factory.into());
    self.factory_method_name = Some(method.into());
    self
  }

  /// Produce this bean by invoking the static `method` hosted by this
  /// definition's `type_identifier`.
  pub fn static_factory(mut self, method: impl Into<String>) -> Self {
    self.factory_method_name = Some(method.into());
    self
  }

  pub fn init_method(mut self, name: impl Into<String>) -> Self {
    self.init_method_name = Some(name.into());
    self
  }

  pub fn destroy_method(mut self, name: impl Into<String>) -> Self {
    self.destroy_method_name = Some(name.into());
    self
  }

  pub fn abstract_def(mut self, is_abstract: bool) -> Self {
    self.abstract_flag = is_abstract;
    self
  }

  pub fn role(mut self, role: Role) -> Self {
    self.role = Some(role);
    self
  }

  pub fn provenance(mut self, source: impl Into<String>) -> Self {
    self.source = Some(source.into());
    self
  }

  // --- Defaulted accessors ---

  pub fn resolved_scope(&self) -> Scope {
    self.scope.clone().unwrap_or_default()
  }

  pub fn is_lazy_init(&self) -> bool {
    self.lazy_init.unwrap_or(false)
  }

  pub fn is_primary(&self) -> bool {
    self.primary.unwrap_or(false)
  }

  pub fn is_autowire_candidate(&self) -> bool {
    self.autowire_candidate.unwrap_or(true)
  }

  pub fn resolved_role(&self) -> Role {
    self.role.unwrap_or_default()
  }

  /// Merges this (child) definition onto `parent`, producing a standalone
  /// record with no remaining `parent_name`.
  ///
  /// Explicitly-set child scalars win; collections are unioned with child
  /// precedence (constructor arguments by position, properties by name,
  /// depends-on preserving parent order, attributes by key).
  pub fn merged_onto(&self, parent: &BeanDefinition) -> BeanDefinition {
    let mut merged = parent.clone();
    merged.parent_name = None;

    if self.type_identifier.is_some() {
      merged.type_identifier = self.type_identifier.clone();
    }
    if self.scope.is_some() {
      merged.scope = self.scope.clone();
    }
    if self.lazy_init.is_some() {
      merged.lazy_init = self.lazy_init;
    }
    if self.primary.is_some() {
      merged.primary = self.primary;
    }
    if self.autowire_candidate.is_some() {
      merged.autowire_candidate = self.autowire_candidate;
    }
    if self.factory_bean_name.is_some() {
      merged.factory_bean_name = self.factory_bean_name.clone();
    }
    if self.factory_method_name.is_some() {
      merged.factory_method_name = self.factory_method_name.clone();
    }
    if self.init_method_name.is_some() {
      merged.init_method_name = self.init_method_name.clone();
    }
    if self.destroy_method_name.is_some() {
      merged.destroy_method_name = self.destroy_method_name.clone();
    }
    if self.role.is_some() {
      merged.role = self.role;
    }
    if self.source.is_some() {
      merged.source = self.source.clone();
    }
    // The abstract flag is the child's own, never inherited.
    merged.abstract_flag = self.abstract_flag;

    // Constructor arguments: positional override, child may extend.
    for (index, arg) in self.constructor_args.iter().enumerate() {
      if index < merged.constructor_args.len() {
        merged.constructor_args[index] = arg.clone();
      } else {
        merged.constructor_args.push(arg.clone());
      }
    }

    // Properties: replace by name, append new ones after the parent's.
    for pv in &self.property_values {
      match merged
        .property_values
        .iter_mut()
        .find(|existing| existing.name == pv.name)
      {
        Some(slot) => *slot = pv.clone(),
        None => merged.property_values.push(pv.clone()),
      }
    }

    // Depends-on: ordered union, parent entries first.
    for dep in &self.depends_on {
      if !merged.depends_on.contains(dep) {
        merged.depends_on.push(dep.clone());
      }
    }

    let mut attributes = self.attributes.clone();
    attributes.merge_from(&merged.attributes);
    merged.attributes = attributes;

    merged
  }
}
