use armature::{BeanDefinition, BeanError, DefinitionRegistry, Scope, TypeKey, ValueSpec};
use pretty_assertions::assert_eq;

// --- Registration ---

#[test]
fn test_duplicate_registration_is_rejected_by_default() {
  // Arrange
  let registry = DefinitionRegistry::new();
  registry
    .register("service", BeanDefinition::with_type("demo::Service"))
    .unwrap();

  // Act
  let err = registry
    .register("service", BeanDefinition::with_type("demo::Other"))
    .unwrap_err();

  // Assert
  assert!(matches!(err, BeanError::DuplicateDefinition(name) if name == "service"));
}

#[test]
fn test_overriding_registry_replaces_existing_definitions() {
  // Arrange
  let registry = DefinitionRegistry::with_overriding(true);
  registry
    .register("service", BeanDefinition::with_type("demo::Service"))
    .unwrap();

  // Act
  registry
    .register("service", BeanDefinition::with_type("demo::Replacement"))
    .unwrap();

  // Assert
  let merged = registry.get_merged("service").unwrap();
  assert_eq!(
    merged.type_identifier,
    Some(TypeKey::new("demo::Replacement"))
  );
  // Replacement keeps a single slot in registration order.
  assert_eq!(registry.names(), vec!["service".to_string()]);
}

#[test]
fn test_names_preserve_registration_order() {
  let registry = DefinitionRegistry::new();
  for name in ["c", "a", "b"] {
    registry
      .register(name, BeanDefinition::with_type("demo::Service"))
      .unwrap();
  }
  assert_eq!(registry.names(), vec!["c", "a", "b"]);
}

#[test]
fn test_remove_unknown_definition_fails() {
  let registry = DefinitionRegistry::new();
  let err = registry.remove("ghost").unwrap_err();
  assert!(matches!(err, BeanError::NoSuchDefinition(name) if name == "ghost"));
}

// --- Phases ---

#[test]
fn test_frozen_registry_rejects_writes_until_reopened() {
  // Arrange
  let registry = DefinitionRegistry::new();
  registry
    .register("service", BeanDefinition::with_type("demo::Service"))
    .unwrap();
  registry.freeze();

  // Act + Assert: every write path is rejected.
  assert!(matches!(
    registry
      .register("late", BeanDefinition::with_type("demo::Late"))
      .unwrap_err(),
    BeanError::RegistryFrozen(_)
  ));
  assert!(matches!(
    registry.register_alias("svc", "service").unwrap_err(),
    BeanError::RegistryFrozen(_)
  ));
  assert!(matches!(
    registry.remove("service").unwrap_err(),
    BeanError::RegistryFrozen(_)
  ));

  // Reads still work while frozen.
  assert!(registry.get_merged("service").is_ok());

  // Reopening restores the configuration phase.
  registry.reopen();
  registry
    .register("late", BeanDefinition::with_type("demo::Late"))
    .unwrap();
}

// --- Aliases ---

#[test]
fn test_aliases_resolve_to_the_canonical_definition() {
  let registry = DefinitionRegistry::new();
  registry
    .register("engine", BeanDefinition::with_type("demo::Engine"))
    .unwrap();
  registry.register_alias("motor", "engine").unwrap();
  registry.register_alias("powerplant", "motor").unwrap();

  assert_eq!(registry.canonical_name("powerplant"), "engine");
  assert!(registry.contains("powerplant"));
  assert_eq!(
    registry.get_merged("powerplant").unwrap().type_identifier,
    Some(TypeKey::new("demo::Engine"))
  );
}

#[test]
fn test_alias_chain_loop_is_rejected() {
  let registry = DefinitionRegistry::new();
  registry.register_alias("a", "b").unwrap();
  registry.register_alias("b", "c").unwrap();

  let err = registry.register_alias("c", "a").unwrap_err();
  assert!(matches!(err, BeanError::CyclicInheritance { .. }));
}

#[test]
fn test_alias_may_not_shadow_a_definition() {
  let registry = DefinitionRegistry::new();
  registry
    .register("engine", BeanDefinition::with_type("demo::Engine"))
    .unwrap();
  let err = registry.register_alias("engine", "other").unwrap_err();
  assert!(matches!(err, BeanError::DuplicateDefinition(_)));
}

#[test]
fn test_definition_may_not_take_an_aliased_name() {
  // Arrange: "motor" already redirects to "engine".
  let registry = DefinitionRegistry::new();
  registry
    .register("engine", BeanDefinition::with_type("demo::Engine"))
    .unwrap();
  registry.register_alias("motor", "engine").unwrap();

  // Act
  let err = registry
    .register("motor", BeanDefinition::with_type("demo::Motor"))
    .unwrap_err();

  // Assert: rejected, and lookups under the name still reach the target.
  assert!(matches!(err, BeanError::DuplicateDefinition(name) if name == "motor"));
  assert_eq!(
    registry.get_merged("motor").unwrap().type_identifier,
    Some(TypeKey::new("demo::Engine"))
  );
}

#[test]
fn test_overriding_registration_displaces_an_alias() {
  // Arrange
  let registry = DefinitionRegistry::with_overriding(true);
  registry
    .register("engine", BeanDefinition::with_type("demo::Engine"))
    .unwrap();
  registry.register_alias("motor", "engine").unwrap();

  // Act: with overriding enabled the alias gives way to the definition.
  registry
    .register("motor", BeanDefinition::with_type("demo::Motor"))
    .unwrap();

  // Assert
  assert_eq!(registry.canonical_name("motor"), "motor");
  assert_eq!(
    registry.get_merged("motor").unwrap().type_identifier,
    Some(TypeKey::new("demo::Motor"))
  );
}

// --- Merging ---

fn three_level_chain(registry: &DefinitionRegistry) {
  registry
    .register(
      "base",
      BeanDefinition::with_type("demo::Base")
        .abstract_def(true)
        .lazy(true)
        .property("retries", ValueSpec::lit(3i64))
        .property("label", ValueSpec::lit("base")),
    )
    .unwrap();
  registry
    .register(
      "middle",
      BeanDefinition::new()
        .parent("base")
        .scoped(Scope::Prototype)
        .property("label", ValueSpec::lit("middle")),
    )
    .unwrap();
  registry
    .register(
      "leaf",
      BeanDefinition::new()
        .parent("middle")
        .lazy(false)
        .property("extra", ValueSpec::lit(true)),
    )
    .unwrap();
}

#[test]
fn test_merge_resolves_the_full_parent_chain() {
  // Arrange
  let registry = DefinitionRegistry::new();
  three_level_chain(&registry);

  // Act
  let merged = registry.get_merged("leaf").unwrap();

  // Assert
  assert_eq!(merged.type_identifier, Some(TypeKey::new("demo::Base")));
  assert_eq!(merged.resolved_scope(), Scope::Prototype);
  assert!(!merged.is_lazy_init());
  assert!(!merged.abstract_flag);
  assert!(merged.parent_name.is_none());
  let names: Vec<&str> = merged
    .property_values
    .iter()
    .map(|pv| pv.name.as_str())
    .collect();
  assert_eq!(names, vec!["retries", "label", "extra"]);
  assert_eq!(merged.property_values[1].value, ValueSpec::lit("middle"));
}

#[test]
fn test_merge_is_associative_along_the_chain() {
  // Arrange: the registry fold and a manual pairwise merge must agree.
  let registry = DefinitionRegistry::new();
  three_level_chain(&registry);
  let base = registry.get("base").unwrap();
  let middle = registry.get("middle").unwrap();
  let leaf = registry.get("leaf").unwrap();

  // Act
  let folded = registry.get_merged("leaf").unwrap();
  let pairwise = leaf.merged_onto(&middle.merged_onto(&base));

  // Assert
  assert_eq!(folded.type_identifier, pairwise.type_identifier);
  assert_eq!(folded.scope, pairwise.scope);
  assert_eq!(folded.lazy_init, pairwise.lazy_init);
  assert_eq!(folded.property_values, pairwise.property_values);
  assert_eq!(folded.constructor_args, pairwise.constructor_args);
  assert_eq!(folded.depends_on, pairwise.depends_on);
}

#[test]
fn test_self_parent_is_a_cyclic_inheritance_error() {
  let registry = DefinitionRegistry::new();
  registry
    .register("narcissus", BeanDefinition::new().parent("narcissus"))
    .unwrap();

  let err = registry.get_merged("narcissus").unwrap_err();
  assert!(matches!(
    err,
    BeanError::CyclicInheritance { ref path } if path == &["narcissus", "narcissus"]
  ));
}

#[test]
fn test_two_step_parent_cycle_reports_the_full_path() {
  let registry = DefinitionRegistry::new();
  registry
    .register("a", BeanDefinition::new().parent("b"))
    .unwrap();
  registry
    .register("b", BeanDefinition::new().parent("a"))
    .unwrap();

  let err = registry.get_merged("a").unwrap_err();
  assert!(matches!(
    err,
    BeanError::CyclicInheritance { ref path } if path == &["a", "b", "a"]
  ));
}

#[test]
fn test_missing_parent_link_fails() {
  let registry = DefinitionRegistry::new();
  registry
    .register("orphan", BeanDefinition::new().parent("ghost"))
    .unwrap();

  let err = registry.get_merged("orphan").unwrap_err();
  assert!(matches!(err, BeanError::NoSuchDefinition(name) if name == "ghost"));
}

#[test]
fn test_registering_over_a_parent_invalidates_merged_results() {
  // Arrange
  let registry = DefinitionRegistry::with_overriding(true);
  registry
    .register("parent", BeanDefinition::with_type("demo::V1"))
    .unwrap();
  registry
    .register("child", BeanDefinition::new().parent("parent"))
    .unwrap();
  assert_eq!(
    registry.get_merged("child").unwrap().type_identifier,
    Some(TypeKey::new("demo::V1"))
  );

  // Act: replace the parent after the child's merge was cached.
  registry
    .register("parent", BeanDefinition::with_type("demo::V2"))
    .unwrap();

  // Assert
  assert_eq!(
    registry.get_merged("child").unwrap().type_identifier,
    Some(TypeKey::new("demo::V2"))
  );
}

#[test]
fn test_names_by_type_skips_abstract_definitions() {
  let registry = DefinitionRegistry::new();
  registry
    .register(
      "template",
      BeanDefinition::with_type("demo::Widget").abstract_def(true),
    )
    .unwrap();
  registry
    .register("real", BeanDefinition::with_type("demo::Widget"))
    .unwrap();

  let names = registry.names_by_type(|key| key.as_str() == "demo::Widget");
  assert_eq!(names, vec!["real"]);
}
