use armature::{arg, Container, TypeBindings, TypeKey, ValueSpec, YamlDefinitions};
use std::sync::Arc;

// A small engine assembly wired three ways: programmatic definitions, a YAML
// document, and typed autowiring.

struct Crankshaft {
  journals: i64,
}

struct Engine {
  cylinders: i64,
  crank: Arc<Crankshaft>,
}

struct Dashboard {
  engine: Arc<Engine>,
}

fn bindings() -> Arc<TypeBindings> {
  let bindings = TypeBindings::new();
  bindings.bind_constructor::<Crankshaft>(|args| {
    println!("Forging crankshaft with {} journals...", arg::<i64>(&args, 0)?);
    Ok(Crankshaft {
      journals: *arg::<i64>(&args, 0)?,
    })
  });
  bindings.bind_constructor::<Engine>(|args| {
    println!("Assembling engine...");
    Ok(Engine {
      cylinders: *arg::<i64>(&args, 0)?,
      crank: arg::<Crankshaft>(&args, 1)?,
    })
  });
  bindings.bind_callback::<Engine>("start", |engine| {
    println!("Engine started: {} cylinders.", engine.cylinders);
    Ok(())
  });
  bindings.bind_callback::<Engine>("stop", |_| {
    println!("Engine stopped.");
    Ok(())
  });
  bindings.bind_constructor::<Dashboard>(|args| {
    Ok(Dashboard {
      engine: arg::<Engine>(&args, 0)?,
    })
  });
  Arc::new(bindings)
}

fn main() {
  let container = Container::new(bindings());

  println!("--- Loading Definitions ---");
  // The engine and its crankshaft come from a declarative document. The
  // dashboard is registered programmatically and autowires the engine by
  // type, without naming it.
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
      - value: 4
        type_hint: i64
      - ref: crankshaft
    init_method: start
    destroy_method: stop
aliases:
  - {{ alias: motor, target: engine }}
"#,
    crank = TypeKey::of::<Crankshaft>(),
    engine = TypeKey::of::<Engine>(),
  );
  container
    .load(&YamlDefinitions::from_str(document))
    .expect("definitions should load");
  container
    .register(
      "dashboard",
      armature::BeanDefinition::of::<Dashboard>().ctor_arg(ValueSpec::by_type::<Engine>()),
    )
    .expect("dashboard should register");

  println!("\n--- Eager Startup ---");
  // Every non-lazy singleton is created up front; broken wiring surfaces
  // here instead of at first use.
  container
    .pre_instantiate_singletons()
    .expect("startup should succeed");

  println!("\n--- Resolving ---");
  let engine = container
    .get_as::<Engine>("motor")
    .expect("alias should resolve");
  let dashboard = container
    .get_as::<Dashboard>("dashboard")
    .expect("dashboard should resolve");
  println!(
    "Dashboard sees the same engine: {}",
    Arc::ptr_eq(&dashboard.engine, &engine)
  );
  println!("Crankshaft has {} journals.", engine.crank.journals);

  println!("\n--- Shutdown ---");
  // Destroy callbacks run in reverse creation order.
  container.close().expect("shutdown should be clean");
}
