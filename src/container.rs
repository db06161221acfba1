// src/container.rs

//! The `Container`: the public facade and the creation engine driving one
//! get-or-create request from definition to ready instance.

use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, trace};

use crate::coerce::{StandardCoercer, ValueCoercer};
use crate::config::DefinitionSource;
use crate::definition::{BeanDefinition, Scope, TypeKey, ValueSpec};
use crate::error::{BeanError, DestructionErrors, Result};
use crate::instantiate::{Absent, BeanHandle, Instantiation, Instantiator};
use crate::lifecycle::LifecycleCoordinator;
use crate::registry::DefinitionRegistry;
use crate::resolver::{DependencyResolver, DependencySpec, TypedQuery};
use crate::singleton::{self, Begin, InstanceCache, PathGuard};

/// The IoC container: definition registry, creation engine, scoped instance
/// caches, and lifecycle coordination behind one thread-safe facade.
///
/// A container is built around two injected capabilities: an
/// [`Instantiator`] that performs host-side construction and a
/// [`ValueCoercer`] for literal values (the standard scalar coercer by
/// default).
pub struct Container {
  registry: DefinitionRegistry,
  instantiator: Arc<dyn Instantiator>,
  coercer: Arc<dyn ValueCoercer>,
  scopes: DashMap<String, Arc<InstanceCache>>,
  lifecycle: LifecycleCoordinator,
}

impl Container {
  /// A container over `instantiator` with a fresh registry and the standard
  /// scalar coercer.
  pub fn new(instantiator: Arc<dyn Instantiator>) -> Self {
    Self::with_parts(
      DefinitionRegistry::new(),
      instantiator,
      Arc::new(StandardCoercer),
    )
  }

  /// Full control over the registry and both capabilities.
  pub fn with_parts(
    registry: DefinitionRegistry,
    instantiator: Arc<dyn Instantiator>,
    coercer: Arc<dyn ValueCoercer>,
  ) -> Self {
    Self {
      registry,
      instantiator,
      coercer,
      scopes: DashMap::new(),
      lifecycle: LifecycleCoordinator::new(),
    }
  }

  pub fn registry(&self) -> &DefinitionRegistry {
    &self.registry
  }

  pub fn lifecycle(&self) -> &LifecycleCoordinator {
    &self.lifecycle
  }

  /// Registers `definition` under `name` (configuration-phase convenience
  /// for `registry().register`).
  pub fn register(&self, name: impl Into<String>, definition: BeanDefinition) -> Result<()> {
    self.registry.register(name, definition)
  }

  /// Registers every definition (and alias) produced by `source`.
  pub fn load(&self, source: &dyn DefinitionSource) -> Result<()> {
    for (name, definition) in source.definitions()? {
      self.registry.register(name, definition)?;
    }
    for (alias, target) in source.aliases()? {
      self.registry.register_alias(alias, target)?;
    }
    Ok(())
  }

  // --- Resolution ---

  /// Returns the bean registered under `name`, creating it (and its
  /// dependency closure) first when needed.
  pub fn get(&self, name: &str) -> Result<BeanHandle> {
    self.get_or_create(name)
  }

  /// [`get`](Self::get) plus a downcast to the expected concrete type.
  pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
    let handle = self.get_or_create(name)?;
    handle
      .downcast::<T>()
      .map_err(|_| BeanError::TypeConversion {
        value: name.to_owned(),
        target: TypeKey::of::<T>().to_string(),
      })
  }

  /// Resolves a unique bean for `query` and creates it.
  pub fn get_one_by_type(&self, query: TypedQuery) -> Result<BeanHandle> {
    let resolver = DependencyResolver::new(&self.registry);
    match resolver.resolve(&DependencySpec::Typed(query.clone()))? {
      Some(name) => self.get_or_create(&name),
      None => Err(BeanError::NoSuchBean(query.type_key.to_string())),
    }
  }

  /// Typed-query convenience for the Rust type `T`.
  pub fn get_typed<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
    let handle = self.get_one_by_type(TypedQuery::new(TypeKey::of::<T>()))?;
    handle
      .downcast::<T>()
      .map_err(|_| BeanError::TypeConversion {
        value: TypeKey::of::<T>().to_string(),
        target: TypeKey::of::<T>().to_string(),
      })
  }

  /// Creates every non-lazy singleton in registration order, failing fast on
  /// the first error. Freezes the registry: eager instantiation marks the
  /// end of the configuration phase.
  pub fn pre_instantiate_singletons(&self) -> Result<()> {
    self.registry.freeze();
    let names = self.registry.names();
    info!(count = names.len(), "pre-instantiating singletons");
    for name in names {
      let merged = self.registry.get_merged(&name)?;
      if merged.abstract_flag || merged.is_lazy_init() || !merged.resolved_scope().is_singleton()
      {
        continue;
      }
      self.get_or_create(&name)?;
    }
    info!("eager singleton pre-instantiation complete");
    Ok(())
  }

  // --- Teardown ---

  /// Runs the destroy callbacks registered for `scope_id` in reverse
  /// creation order, then drops the scope's cached instances. Individual
  /// callback failures are aggregated, never fatal to the sweep.
  pub fn destroy_scope(&self, scope_id: &str) -> Result<(), DestructionErrors> {
    let outcome = self.lifecycle.destroy_scope(scope_id);
    if let Some(cache) = self.scopes.get(scope_id) {
      cache.clear();
    }
    debug!(scope = scope_id, "scope destroyed");
    outcome
  }

  /// Destroys the singleton scope (container shutdown).
  pub fn close(&self) -> Result<(), DestructionErrors> {
    self.destroy_scope(Scope::SINGLETON_ID)
  }

  // --- Creation engine ---

  fn scope_cache(&self, scope_id: &str) -> Arc<InstanceCache> {
    self
      .scopes
      .entry(scope_id.to_owned())
      .or_insert_with(|| Arc::new(InstanceCache::new()))
      .clone()
  }

  fn get_or_create(&self, name: &str) -> Result<BeanHandle> {
    let canonical = self.registry.canonical_name(name);
    let merged = self.registry.get_merged(&canonical).map_err(|err| match err {
      BeanError::NoSuchDefinition(n) => BeanError::NoSuchBean(n),
      other => other,
    })?;
    if merged.abstract_flag {
      return Err(BeanError::NoSuchBean(canonical));
    }
    self.validate_constructable(&canonical, &merged)?;

    let scope = merged.resolved_scope();
    if scope.is_prototype() {
      if singleton::on_current_path(&canonical) {
        return Err(BeanError::CircularDependency {
          path: singleton::cycle_path(&canonical),
        });
      }
      let _guard = PathGuard::enter(&canonical);
      trace!(name = %canonical, "creating prototype instance");
      return self.create_instance(&canonical, &merged, None);
    }

    let cache = self.scope_cache(scope.id());
    if let Some(ready) = cache.get_ready(&canonical) {
      return Ok(ready);
    }

    if singleton::on_current_path(&canonical) {
      // This creation recursed into itself. A singleton whose instance
      // already exists (properties pending) resolves through the early
      // reference, but only for a property-phase back-edge; a cycle with a
      // constructor-argument edge anywhere in it is a hard error.
      if scope.is_singleton() && !singleton::resolving_constructor() {
        if let Some(early) = cache.get_early(&canonical) {
          trace!(name = %canonical, "cycle closed via early reference");
          return Ok(early);
        }
      }
      return Err(BeanError::CircularDependency {
        path: singleton::cycle_path(&canonical),
      });
    }

    match cache.begin(&canonical)? {
      Begin::Ready(handle) => Ok(handle),
      Begin::Started => {
        let _guard = PathGuard::enter(&canonical);
        debug!(name = %canonical, scope = scope.id(), "creating instance");
        let early_cache = scope.is_singleton().then_some(&*cache);
        match self.create_instance(&canonical, &merged, early_cache) {
          Ok(handle) => {
            if let Some(destroy) = merged.destroy_method_name.clone() {
              self.register_disposal(&canonical, &merged, &scope, destroy, handle.clone());
            }
            cache.complete(&canonical, handle.clone());
            Ok(handle)
          }
          Err(err) => {
            cache.fail(&canonical);
            Err(err)
          }
        }
      }
    }
  }

  /// The merged-record invariant: something must be able to produce an
  /// instance.
  fn validate_constructable(&self, name: &str, def: &BeanDefinition) -> Result<()> {
    if def.abstract_flag {
      return Ok(());
    }
    let has_factory = def.factory_method_name.is_some();
    if def.type_identifier.is_none() && !has_factory {
      return Err(
        BeanError::Capability(
          "definition declares neither a type identifier nor a factory method".to_owned(),
        )
        .into_instantiation(name),
      );
    }
    if def.factory_bean_name.is_some() && def.factory_method_name.is_none() {
      return Err(
        BeanError::Capability("factory bean declared without a factory method".to_owned())
          .into_instantiation(name),
      );
    }
    Ok(())
  }

  fn create_instance(
    &self,
    name: &str,
    def: &BeanDefinition,
    early_cache: Option<&InstanceCache>,
  ) -> Result<BeanHandle> {
    // Explicit ordering dependencies come first, fully created.
    for dep in &def.depends_on {
      self.get_or_create(dep)?;
    }

    // Constructor arguments in declared order; absent optionals keep their
    // slot with a marker so positions stay stable.
    let mut args = Vec::with_capacity(def.constructor_args.len());
    for ctor_arg in &def.constructor_args {
      let resolved = self.resolve_value(&ctor_arg.value, ctor_arg.type_hint.as_ref(), None)?;
      args.push(resolved.unwrap_or_else(|| Arc::new(Absent) as BeanHandle));
    }

    let handle = self.instantiate(name, def, args)?;

    // From here the instance exists; a singleton exposes it to setter-side
    // cycles before its own properties are populated.
    singleton::enter_property_phase();
    if let Some(cache) = early_cache {
      cache.publish_early(name, handle.clone());
    }

    if !def.property_values.is_empty()
      || def.init_method_name.is_some()
      || def.destroy_method_name.is_some()
    {
      // Property and callback dispatch need the bean's type key.
      let type_key = def.type_identifier.as_ref().ok_or_else(|| {
        BeanError::Capability(
          "properties or lifecycle callbacks require a type identifier".to_owned(),
        )
        .into_instantiation(name)
      })?;

      for pv in &def.property_values {
        match self.resolve_value(&pv.value, pv.type_hint.as_ref(), Some(&pv.name))? {
          Some(value) => self
            .instantiator
            .set_property(type_key, &handle, &pv.name, value)
            .map_err(|err| err.into_instantiation(name))?,
          None => trace!(name, property = %pv.name, "optional dependency absent, property skipped"),
        }
      }

      if let Some(init) = &def.init_method_name {
        self
          .instantiator
          .invoke_callback(type_key, &handle, init)
          .map_err(|err| err.into_initialization(name))?;
      }
    }

    Ok(handle)
  }

  fn instantiate(
    &self,
    name: &str,
    def: &BeanDefinition,
    args: Vec<BeanHandle>,
  ) -> Result<BeanHandle> {
    if let Some(factory_bean) = &def.factory_bean_name {
      let method = def.factory_method_name.as_deref().unwrap_or_default();
      // Failures resolving the factory bean itself are ordinary dependency
      // failures and keep their own kind.
      let factory = self.get_or_create(factory_bean)?;
      let factory_def = self.registry.get_merged(factory_bean)?;
      let factory_type = factory_def.type_identifier.as_ref().ok_or_else(|| {
        BeanError::Capability(format!(
          "factory bean '{}' has no type identifier",
          factory_bean
        ))
        .into_instantiation(name)
      })?;
      return self
        .instantiator
        .instantiate(
          Instantiation::InstanceFactory {
            factory: &factory,
            factory_type,
            method,
          },
          args,
        )
        .map_err(|err| err.into_instantiation(name));
    }

    // `validate_constructable` guarantees a type identifier below.
    let type_key = def.type_identifier.as_ref().expect("validated definition");
    let outcome = match &def.factory_method_name {
      Some(method) => self
        .instantiator
        .instantiate(Instantiation::StaticFactory { type_key, method }, args),
      None => self
        .instantiator
        .instantiate(Instantiation::Constructor { type_key }, args),
    };
    outcome.map_err(|err| err.into_instantiation(name))
  }

  /// Resolves one value-or-reference slot. `Ok(None)` means an optional
  /// dependency resolved to absent.
  fn resolve_value(
    &self,
    spec: &ValueSpec,
    type_hint: Option<&TypeKey>,
    slot_name: Option<&str>,
  ) -> Result<Option<BeanHandle>> {
    match spec {
      ValueSpec::Literal(literal) => self.coercer.coerce(literal, type_hint).map(Some),
      ValueSpec::Ref(target) => self.get_or_create(target).map(Some),
      ValueSpec::Autowire {
        type_key,
        qualifier,
        required,
      } => {
        let resolver = DependencyResolver::new(&self.registry);
        let query = TypedQuery {
          type_key: type_key.clone(),
          qualifier: qualifier.clone(),
          name_hint: slot_name.map(str::to_owned),
          required: *required,
        };
        match resolver.resolve(&DependencySpec::Typed(query))? {
          Some(target) => self.get_or_create(&target).map(Some),
          None => Ok(None),
        }
      }
    }
  }

  fn register_disposal(
    &self,
    name: &str,
    def: &BeanDefinition,
    scope: &Scope,
    destroy_method: String,
    handle: BeanHandle,
  ) {
    // Callers reach this only for non-prototype scopes; the type key was
    // validated when the callback was declared.
    let Some(type_key) = def.type_identifier.clone() else {
      return;
    };
    let instantiator = Arc::clone(&self.instantiator);
    self.lifecycle.register(scope.id(), name, move || {
      instantiator.invoke_callback(&type_key, &handle, &destroy_method)
    });
  }
}
