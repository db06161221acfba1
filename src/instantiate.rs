// src/instantiate.rs

//! The instantiation capability: the seam between the resolution engine and
//! whatever actually constructs host objects.
//!
//! The core never reflects over types. It hands an [`Instantiation`] request
//! plus fully-resolved arguments to an [`Instantiator`] and receives an
//! opaque [`BeanHandle`] back. [`TypeBindings`] is the shipped
//! implementation: a closure table binding [`TypeKey`]s to constructors,
//! factory methods, property setters, and lifecycle callbacks.

use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;

use crate::definition::TypeKey;
use crate::error::{BeanError, Result};

/// A managed instance. Consumers downcast to the concrete type they expect.
pub type BeanHandle = Arc<dyn Any + Send + Sync>;

/// Marker stored in a constructor slot when an optional dependency resolved
/// to absent. Binding code reads it through [`arg_opt`].
pub struct Absent;

/// How a bean is to be produced.
pub enum Instantiation<'a> {
  /// Direct construction of `type_key`.
  Constructor { type_key: &'a TypeKey },
  /// A static factory method hosted by `type_key`.
  StaticFactory { type_key: &'a TypeKey, method: &'a str },
  /// A method on an already-created factory bean.
  InstanceFactory {
    factory: &'a BeanHandle,
    factory_type: &'a TypeKey,
    method: &'a str,
  },
}

/// Host-side construction, population, and callback invocation.
///
/// All methods are synchronous; errors are surfaced to the creation engine,
/// which wraps them with the bean name being created.
pub trait Instantiator: Send + Sync {
  /// Produces an instance from `request` and resolved `args` (declared
  /// order; absent optionals hold an [`Absent`] marker).
  fn instantiate(&self, request: Instantiation<'_>, args: Vec<BeanHandle>) -> Result<BeanHandle>;

  /// Applies one resolved property value to `bean`.
  fn set_property(
    &self,
    type_key: &TypeKey,
    bean: &BeanHandle,
    property: &str,
    value: BeanHandle,
  ) -> Result<()>;

  /// Invokes a declared init/destroy callback on `bean`.
  fn invoke_callback(&self, type_key: &TypeKey, bean: &BeanHandle, method: &str) -> Result<()>;
}

/// Downcasts the constructor argument at `index` to `T`.
pub fn arg<T: Any + Send + Sync>(args: &[BeanHandle], index: usize) -> Result<Arc<T>> {
  let handle = args
    .get(index)
    .ok_or_else(|| BeanError::Capability(format!("missing constructor argument {}", index)))?;
  Arc::clone(handle).downcast::<T>().map_err(|_| {
    BeanError::TypeConversion {
      value: format!("constructor argument {}", index),
      target: TypeKey::of::<T>().to_string(),
    }
  })
}

/// Like [`arg`], but maps an [`Absent`] optional slot to `None`.
pub fn arg_opt<T: Any + Send + Sync>(args: &[BeanHandle], index: usize) -> Result<Option<Arc<T>>> {
  let handle = args
    .get(index)
    .ok_or_else(|| BeanError::Capability(format!("missing constructor argument {}", index)))?;
  if handle.is::<Absent>() {
    return Ok(None);
  }
  arg::<T>(args, index).map(Some)
}

/// Downcasts a property/factory value handle to `T`.
pub fn value_as<T: Any + Send + Sync>(value: &BeanHandle) -> Result<Arc<T>> {
  Arc::clone(value).downcast::<T>().map_err(|_| {
    BeanError::TypeConversion {
      value: "injected value".to_owned(),
      target: TypeKey::of::<T>().to_string(),
    }
  })
}

type CtorFn = Box<dyn Fn(Vec<BeanHandle>) -> Result<BeanHandle> + Send + Sync>;
type FactoryFn = Box<dyn Fn(&BeanHandle, Vec<BeanHandle>) -> Result<BeanHandle> + Send + Sync>;
type SetterFn = Box<dyn Fn(&BeanHandle, BeanHandle) -> Result<()> + Send + Sync>;
type CallbackFn = Box<dyn Fn(&BeanHandle) -> Result<()> + Send + Sync>;

/// A closure-table [`Instantiator`].
///
/// Each binding is keyed by the [`TypeKey`] the definitions use. The typed
/// `bind_*` helpers wrap user closures with the downcasts, so binding code
/// works with concrete types:
///
/// ```
/// use armature::{arg, TypeBindings};
///
/// struct Engine { cylinders: i64 }
///
/// let bindings = TypeBindings::new();
/// bindings.bind_constructor::<Engine>(|args| {
///   Ok(Engine { cylinders: *arg::<i64>(&args, 0)? })
/// });
/// ```
#[derive(Default)]
pub struct TypeBindings {
  constructors: DashMap<TypeKey, CtorFn>,
  static_factories: DashMap<(TypeKey, String), CtorFn>,
  factory_methods: DashMap<(TypeKey, String), FactoryFn>,
  setters: DashMap<(TypeKey, String), SetterFn>,
  callbacks: DashMap<(TypeKey, String), CallbackFn>,
}

impl TypeBindings {
  pub fn new() -> Self {
    Self::default()
  }

  /// Binds the constructor for `T` under `TypeKey::of::<T>()`.
  pub fn bind_constructor<T: Any + Send + Sync>(
    &self,
    ctor: impl Fn(Vec<BeanHandle>) -> Result<T> + Send + Sync + 'static,
  ) {
    self.constructors.insert(
      TypeKey::of::<T>(),
      Box::new(move |args| Ok(Arc::new(ctor(args)?) as BeanHandle)),
    );
  }

  /// Binds a static factory `method` hosted by the type key of `H`,
  /// producing values of type `T`.
  pub fn bind_static_factory<H: Any, T: Any + Send + Sync>(
    &self,
    method: &str,
    factory: impl Fn(Vec<BeanHandle>) -> Result<T> + Send + Sync + 'static,
  ) {
    self.static_factories.insert(
      (TypeKey::of::<H>(), method.to_owned()),
      Box::new(move |args| Ok(Arc::new(factory(args)?) as BeanHandle)),
    );
  }

  /// Binds `method` on factory beans of type `F`, producing values of `T`.
  pub fn bind_factory_method<F: Any + Send + Sync, T: Any + Send + Sync>(
    &self,
    method: &str,
    factory: impl Fn(&F, Vec<BeanHandle>) -> Result<T> + Send + Sync + 'static,
  ) {
    self.factory_methods.insert(
      (TypeKey::of::<F>(), method.to_owned()),
      Box::new(move |host, args| {
        let host = value_as::<F>(host)?;
        Ok(Arc::new(factory(&host, args)?) as BeanHandle)
      }),
    );
  }

  /// Binds the setter for `property` on beans of type `T` taking values of
  /// type `V`. The target typically stores the value through interior
  /// mutability, which is what permits setter-injected cycles.
  pub fn bind_setter<T: Any + Send + Sync, V: Any + Send + Sync>(
    &self,
    property: &str,
    setter: impl Fn(&T, Arc<V>) + Send + Sync + 'static,
  ) {
    self.setters.insert(
      (TypeKey::of::<T>(), property.to_owned()),
      Box::new(move |bean, value| {
        let bean = value_as::<T>(bean)?;
        let value = value_as::<V>(&value)?;
        setter(&bean, value);
        Ok(())
      }),
    );
  }

  /// Binds a lifecycle callback `method` on beans of type `T`.
  pub fn bind_callback<T: Any + Send + Sync>(
    &self,
    method: &str,
    callback: impl Fn(&T) -> Result<()> + Send + Sync + 'static,
  ) {
    self.callbacks.insert(
      (TypeKey::of::<T>(), method.to_owned()),
      Box::new(move |bean| {
        let bean = value_as::<T>(bean)?;
        callback(&bean)
      }),
    );
  }

  fn missing(kind: &str, key: &TypeKey, detail: &str) -> BeanError {
    BeanError::Capability(format!("no {} bound for {}{}", kind, key, detail))
  }
}

impl Instantiator for TypeBindings {
  fn instantiate(&self, request: Instantiation<'_>, args: Vec<BeanHandle>) -> Result<BeanHandle> {
    match request {
      Instantiation::Constructor { type_key } => {
        let ctor = self
          .constructors
          .get(type_key)
          .ok_or_else(|| Self::missing("constructor", type_key, ""))?;
        ctor.value()(args)
      }
      Instantiation::StaticFactory { type_key, method } => {
        let factory = self
          .static_factories
          .get(&(type_key.clone(), method.to_owned()))
          .ok_or_else(|| Self::missing("static factory", type_key, &format!("::{}", method)))?;
        factory.value()(args)
      }
      Instantiation::InstanceFactory {
        factory,
        factory_type,
        method,
      } => {
        let bound = self
          .factory_methods
          .get(&(factory_type.clone(), method.to_owned()))
          .ok_or_else(|| {
            Self::missing("factory method", factory_type, &format!("::{}", method))
          })?;
        bound.value()(factory, args)
      }
    }
  }

  fn set_property(
    &self,
    type_key: &TypeKey,
    bean: &BeanHandle,
    property: &str,
    value: BeanHandle,
  ) -> Result<()> {
    let setter = self
      .setters
      .get(&(type_key.clone(), property.to_owned()))
      .ok_or_else(|| Self::missing("setter", type_key, &format!(".{}", property)))?;
    setter.value()(bean, value)
  }

  fn invoke_callback(&self, type_key: &TypeKey, bean: &BeanHandle, method: &str) -> Result<()> {
    let callback = self
      .callbacks
      .get(&(type_key.clone(), method.to_owned()))
      .ok_or_else(|| Self::missing("callback", type_key, &format!("::{}", method)))?;
    callback.value()(bean)
  }
}
