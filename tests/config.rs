use armature::{
  arg, BeanError, Container, DefinitionSource, TypeBindings, TypeKey, YamlDefinitions,
};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// --- Test Fixtures ---

struct Crankshaft {
  journals: i64,
}

struct Engine {
  cylinders: i64,
  crank: Arc<Crankshaft>,
  started: AtomicUsize,
}

struct Dial {
  label: String,
}

struct Panel {
  dial: Mutex<Option<Arc<Dial>>>,
}

fn engine_bindings() -> Arc<TypeBindings> {
  let bindings = TypeBindings::new();
  bindings.bind_constructor::<Crankshaft>(|args| {
    Ok(Crankshaft {
      journals: *arg::<i64>(&args, 0)?,
    })
  });
  bindings.bind_constructor::<Engine>(|args| {
    Ok(Engine {
      cylinders: *arg::<i64>(&args, 0)?,
      crank: arg::<Crankshaft>(&args, 1)?,
      started: AtomicUsize::new(0),
    })
  });
  bindings.bind_callback::<Engine>("start", |engine| {
    engine.started.fetch_add(1, Ordering::SeqCst);
    Ok(())
  });
  Arc::new(bindings)
}

// --- Tests ---

#[test]
fn test_yaml_document_loads_definitions_and_aliases() {
  // Arrange
  let document = format!(
    r#"
beans:
  - name: crankshaft
    type: {crank}
    constructor:
      - value: 5
        type_hint: i64
  - name: engine
    type: {engine}
    constructor:
      - value: "4"
        type_hint: i64
      - ref: crankshaft
    init_method: start
aliases:
  - {{ alias: motor, target: engine }}
"#,
    crank = TypeKey::of::<Crankshaft>(),
    engine = TypeKey::of::<Engine>(),
  );
  let container = Container::new(engine_bindings());

  // Act
  container.load(&YamlDefinitions::from_str(document)).unwrap();
  let engine = container.get_as::<Engine>("motor").unwrap();

  // Assert: the string literal was coerced through the type hint, the
  // reference slot was wired, and the init callback ran once.
  assert_eq!(engine.cylinders, 4);
  assert_eq!(engine.crank.journals, 5);
  assert_eq!(engine.started.load(Ordering::SeqCst), 1);
}

#[test]
fn test_yaml_autowire_slot_honors_the_qualifier() {
  // Arrange: two candidates of the same type; the qualifier attribute on
  // "coolant_dial" narrows the typed property slot.
  let bindings = TypeBindings::new();
  bindings.bind_constructor::<Dial>(|args| {
    Ok(Dial {
      label: arg::<String>(&args, 0)?.as_ref().clone(),
    })
  });
  bindings.bind_constructor::<Panel>(|_| {
    Ok(Panel {
      dial: Mutex::new(None),
    })
  });
  bindings.bind_setter::<Panel, Dial>("dial", |panel, dial| {
    *panel.dial.lock().unwrap() = Some(dial);
  });
  let document = format!(
    r#"
beans:
  - name: fuel_dial
    type: {dial}
    constructor:
      - value: fuel
  - name: coolant_dial
    type: {dial}
    qualifier: coolant
    constructor:
      - value: coolant
  - name: panel
    type: {panel}
    properties:
      - name: dial
        autowire: {dial}
        qualifier: coolant
"#,
    dial = TypeKey::of::<Dial>(),
    panel = TypeKey::of::<Panel>(),
  );
  let container = Container::new(Arc::new(bindings));

  // Act
  container.load(&YamlDefinitions::from_str(document)).unwrap();
  let panel = container.get_as::<Panel>("panel").unwrap();

  // Assert
  let dial = panel.dial.lock().unwrap().clone().unwrap();
  assert_eq!(dial.label, "coolant");
}

#[test]
fn test_yaml_scope_and_parent_fields_are_applied() {
  // Arrange: an abstract template supplies the constructor argument; the
  // child inherits it and narrows the scope.
  let bindings = TypeBindings::new();
  bindings.bind_constructor::<Dial>(|args| {
    Ok(Dial {
      label: arg::<String>(&args, 0)?.as_ref().clone(),
    })
  });
  let document = format!(
    r#"
beans:
  - name: dial_template
    type: {dial}
    abstract: true
    constructor:
      - value: templated
  - name: gauge
    parent: dial_template
    scope: prototype
"#,
    dial = TypeKey::of::<Dial>(),
  );
  let container = Container::new(Arc::new(bindings));

  // Act
  container.load(&YamlDefinitions::from_str(document)).unwrap();
  let first = container.get_as::<Dial>("gauge").unwrap();
  let second = container.get_as::<Dial>("gauge").unwrap();

  // Assert: inherited wiring, prototype identity, abstract parent blocked.
  assert_eq!(first.label, "templated");
  assert!(!Arc::ptr_eq(&first, &second));
  assert!(matches!(
    container.get("dial_template").unwrap_err(),
    BeanError::NoSuchBean(_)
  ));
}

#[test]
fn test_slot_with_both_value_and_ref_is_rejected() {
  let document = r#"
beans:
  - name: engine
    type: demo::Engine
    constructor:
      - value: 4
        ref: crankshaft
"#;
  let err = YamlDefinitions::from_str(document)
    .definitions()
    .unwrap_err();
  match err {
    BeanError::Configuration(message) => {
      assert!(message.contains("engine"), "got: {}", message);
      assert!(message.contains("constructor argument 0"), "got: {}", message);
    }
    other => panic!("expected Configuration, got {:?}", other),
  }
}

#[test]
fn test_empty_slot_is_rejected() {
  let document = r#"
beans:
  - name: engine
    type: demo::Engine
    properties:
      - name: crank
        type_hint: demo::Crankshaft
"#;
  let err = YamlDefinitions::from_str(document)
    .definitions()
    .unwrap_err();
  assert!(matches!(err, BeanError::Configuration(_)));
}

#[test]
fn test_factory_bean_without_method_is_rejected() {
  let document = r#"
beans:
  - name: engine
    factory_bean: engine_factory
"#;
  let err = YamlDefinitions::from_str(document)
    .definitions()
    .unwrap_err();
  match err {
    BeanError::Configuration(message) => {
      assert!(message.contains("factory_method"), "got: {}", message);
    }
    other => panic!("expected Configuration, got {:?}", other),
  }
}

#[test]
fn test_unknown_role_is_rejected() {
  let document = r#"
beans:
  - name: engine
    type: demo::Engine
    role: decorative
"#;
  let err = YamlDefinitions::from_str(document)
    .definitions()
    .unwrap_err();
  assert!(matches!(err, BeanError::Configuration(_)));
}

#[test]
fn test_unknown_top_level_field_is_rejected() {
  let document = r#"
beans:
  - name: engine
    type: demo::Engine
    wheels: 4
"#;
  let err = YamlDefinitions::from_str(document)
    .definitions()
    .unwrap_err();
  assert!(matches!(err, BeanError::Configuration(_)));
}

#[test]
fn test_missing_file_reports_the_path() {
  let err = YamlDefinitions::from_path("/nonexistent/beans.yaml").unwrap_err();
  match err {
    BeanError::Configuration(message) => {
      assert!(message.contains("/nonexistent/beans.yaml"), "got: {}", message);
    }
    other => panic!("expected Configuration, got {:?}", other),
  }
}
