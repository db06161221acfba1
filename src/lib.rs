//! # Armature
//!
//! A declarative, thread-safe Inversion of Control (IoC) container core for
//! Rust.
//!
//! Armature manages a graph of runtime objects ("beans") described by
//! [`BeanDefinition`] records: it resolves each definition's constructor and
//! property dependencies, invokes construction through an injected
//! [`Instantiator`] capability, enforces scoping rules, and tears scopes
//! down in reverse creation order.
//!
//! ## Core Concepts
//!
//! - **Definition**: a [`BeanDefinition`] describing how to build one bean,
//!   including parent/child inheritance via definition merging.
//! - **Registry**: the [`DefinitionRegistry`] holding definitions, with an
//!   explicit configuration phase ended by `freeze()`.
//! - **Resolution**: dependencies are satisfied by explicit name or by
//!   type-based autowiring with `primary`/name tie-breaks.
//! - **Scopes**: one shared instance per container (`Singleton`), one per
//!   request (`Prototype`), or a named custom scope with its own teardown.
//! - **Capabilities**: host-side construction is abstracted behind
//!   [`Instantiator`] (the closure-table [`TypeBindings`] ships with the
//!   crate) and literal conversion behind [`ValueCoercer`].
//!
//! ## Quick Start
//!
//! ```
//! use armature::{arg, BeanDefinition, Container, TypeBindings, ValueSpec};
//! use std::sync::Arc;
//!
//! struct Greeter {
//!   message: String,
//! }
//!
//! fn main() {
//!   // Bind the host-side constructor for `Greeter`.
//!   let bindings = Arc::new(TypeBindings::new());
//!   bindings.bind_constructor::<Greeter>(|args| {
//!     Ok(Greeter {
//!       message: (*arg::<String>(&args, 0)?).clone(),
//!     })
//!   });
//!
//!   // Describe the bean declaratively and let the container wire it.
//!   let container = Container::new(bindings);
//!   container
//!     .register(
//!       "greeter",
//!       BeanDefinition::of::<Greeter>().ctor_arg(ValueSpec::lit("Hello, World!")),
//!     )
//!     .unwrap();
//!
//!   let greeter = container.get_as::<Greeter>("greeter").unwrap();
//!   assert_eq!(greeter.message, "Hello, World!");
//! }
//! ```

pub mod coerce;
pub mod config;
pub mod container;
pub mod definition;
pub mod error;
pub mod instantiate;
pub mod lifecycle;
pub mod registry;
pub mod resolver;
mod singleton;

pub use coerce::{StandardCoercer, ValueCoercer};
pub use config::{DefinitionSource, YamlDefinitions};
pub use container::Container;
pub use definition::{
  Attributes, BeanDefinition, ConstructorArg, Literal, PropertyValue, Role, Scope, TypeKey,
  ValueSpec,
};
pub use error::{BeanError, DestructionErrors, Result};
pub use instantiate::{arg, arg_opt, value_as, Absent, BeanHandle, Instantiation, Instantiator, TypeBindings};
pub use lifecycle::LifecycleCoordinator;
pub use registry::DefinitionRegistry;
pub use resolver::{DependencyResolver, DependencySpec, TypedQuery};
