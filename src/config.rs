// src/config.rs

//! Declarative definition sources.
//!
//! The container core consumes already-validated [`BeanDefinition`]s; this
//! module is the shipped adapter that produces them from a YAML document.
//! Raw serde records are deserialized first and then validated into the real
//! data model, so malformed input fails with a [`BeanError::Configuration`]
//! naming the offending definition instead of a panic deep in resolution.

use std::path::Path;

use serde::Deserialize;

use crate::definition::{BeanDefinition, Literal, Role, Scope, TypeKey, ValueSpec};
use crate::error::{BeanError, Result};

/// Produces `(name, definition)` pairs for the configuration phase.
pub trait DefinitionSource {
  fn definitions(&self) -> Result<Vec<(String, BeanDefinition)>>;

  /// Alias pairs `(alias, target)` to register alongside the definitions.
  fn aliases(&self) -> Result<Vec<(String, String)>> {
    Ok(Vec::new())
  }
}

// --- Raw serde model ---

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDocument {
  #[serde(default)]
  beans: Vec<RawDefinition>,
  #[serde(default)]
  aliases: Vec<RawAlias>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAlias {
  alias: String,
  target: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDefinition {
  name: String,
  parent: Option<String>,
  #[serde(rename = "type")]
  type_identifier: Option<String>,
  scope: Option<String>,
  lazy_init: Option<bool>,
  #[serde(default)]
  depends_on: Vec<String>,
  primary: Option<bool>,
  autowire_candidate: Option<bool>,
  #[serde(default)]
  constructor: Vec<RawValue>,
  #[serde(default)]
  properties: Vec<RawProperty>,
  factory_bean: Option<String>,
  factory_method: Option<String>,
  init_method: Option<String>,
  destroy_method: Option<String>,
  #[serde(rename = "abstract", default)]
  abstract_flag: bool,
  role: Option<String>,
  /// Stored as the `"qualifier"` attribute consulted by typed resolution.
  qualifier: Option<String>,
}

/// One value-or-reference slot; exactly one of `value`, `ref`, `autowire`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawValue {
  value: Option<Literal>,
  #[serde(rename = "ref")]
  reference: Option<String>,
  autowire: Option<String>,
  qualifier: Option<String>,
  required: Option<bool>,
  type_hint: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProperty {
  name: String,
  #[serde(flatten)]
  value: RawValue,
}

impl RawValue {
  fn into_spec(self, context: &str) -> Result<(ValueSpec, Option<TypeKey>)> {
    let type_hint = self.type_hint.map(TypeKey::new);
    let spec = match (self.value, self.reference, self.autowire) {
      (Some(literal), None, None) => ValueSpec::Literal(literal),
      (None, Some(name), None) => ValueSpec::Ref(name),
      (None, None, Some(type_key)) => ValueSpec::Autowire {
        type_key: TypeKey::new(type_key),
        qualifier: self.qualifier,
        required: self.required.unwrap_or(true),
      },
      _ => {
        return Err(BeanError::Configuration(format!(
          "{}: exactly one of 'value', 'ref', 'autowire' is required",
          context
        )))
      }
    };
    Ok((spec, type_hint))
  }
}

fn parse_scope(raw: &str) -> Scope {
  match raw {
    "singleton" => Scope::Singleton,
    "prototype" => Scope::Prototype,
    other => Scope::Custom(other.to_owned()),
  }
}

fn parse_role(raw: &str, name: &str) -> Result<Role> {
  match raw {
    "application" => Ok(Role::Application),
    "support" => Ok(Role::Support),
    "infrastructure" => Ok(Role::Infrastructure),
    other => Err(BeanError::Configuration(format!(
      "bean '{}': unknown role '{}'",
      name, other
    ))),
  }
}

impl RawDefinition {
  fn into_definition(self, origin: &str) -> Result<(String, BeanDefinition)> {
    let name = self.name;
    let mut def = BeanDefinition::new();
    def.parent_name = self.parent;
    def.type_identifier = self.type_identifier.map(TypeKey::new);
    def.scope = self.scope.as_deref().map(parse_scope);
    def.lazy_init = self.lazy_init;
    def.depends_on = self.depends_on;
    def.primary = self.primary;
    def.autowire_candidate = self.autowire_candidate;
    def.factory_bean_name = self.factory_bean;
    def.factory_method_name = self.factory_method;
    def.init_method_name = self.init_method;
    def.destroy_method_name = self.destroy_method;
    def.abstract_flag = self.abstract_flag;
    def.role = self.role.as_deref().map(|r| parse_role(r, &name)).transpose()?;
    def.source = Some(origin.to_owned());
    if let Some(qualifier) = self.qualifier {
      def.attributes.set("qualifier", qualifier);
    }

    for (index, raw) in self.constructor.into_iter().enumerate() {
      let context = format!("bean '{}', constructor argument {}", name, index);
      let (value, type_hint) = raw.into_spec(&context)?;
      def = match type_hint {
        Some(hint) => def.ctor_arg_typed(value, hint),
        None => def.ctor_arg(value),
      };
    }
    for raw in self.properties {
      let context = format!("bean '{}', property '{}'", name, raw.name);
      let (value, type_hint) = raw.value.into_spec(&context)?;
      def = match type_hint {
        Some(hint) => def.property_typed(raw.name, value, hint),
        None => def.property(raw.name, value),
      };
    }

    if def.factory_bean_name.is_some() && def.factory_method_name.is_none() {
      return Err(BeanError::Configuration(format!(
        "bean '{}': 'factory_bean' requires 'factory_method'",
        name
      )));
    }

    Ok((name, def))
  }
}

/// A YAML definition document.
///
/// ```yaml
/// beans:
///   - name: engine
///     type: demo::Engine
///     constructor:
///       - value: 4
///         type_hint: i64
///       - ref: crankshaft
///     init_method: start
/// aliases:
///   - { alias: motor, target: engine }
/// ```
#[derive(Debug)]
pub struct YamlDefinitions {
  origin: String,
  text: String,
}

impl YamlDefinitions {
  pub fn from_str(text: impl Into<String>) -> Self {
    Self {
      origin: "<inline>".to_owned(),
      text: text.into(),
    }
  }

  pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
      .map_err(|err| BeanError::Configuration(format!("{}: {}", path.display(), err)))?;
    Ok(Self {
      origin: path.display().to_string(),
      text,
    })
  }

  fn parse(&self) -> Result<RawDocument> {
    serde_yaml::from_str(&self.text)
      .map_err(|err| BeanError::Configuration(format!("{}: {}", self.origin, err)))
  }
}

impl DefinitionSource for YamlDefinitions {
  fn definitions(&self) -> Result<Vec<(String, BeanDefinition)>> {
    self
      .parse()?
      .beans
      .into_iter()
      .map(|raw| raw.into_definition(&self.origin))
      .collect()
  }

  fn aliases(&self) -> Result<Vec<(String, String)>> {
    Ok(
      self
        .parse()?
        .aliases
        .into_iter()
        .map(|raw| (raw.alias, raw.target))
        .collect(),
    )
  }
}
