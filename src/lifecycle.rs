// src/lifecycle.rs

//! Ordered destruction of scoped instances.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{BeanError, DestructionErrors};

type DisposalFn = Box<dyn FnOnce() -> Result<(), BeanError> + Send>;

struct DisposalAction {
  bean: String,
  run: DisposalFn,
}

/// Tracks registered destruction actions per scope and runs them in reverse
/// creation order on teardown.
#[derive(Default)]
pub struct LifecycleCoordinator {
  // Scope id -> disposal actions in creation order.
  actions: Mutex<HashMap<String, Vec<DisposalAction>>>,
}

impl LifecycleCoordinator {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers a disposal action for `bean` in `scope`. Called by the
  /// creation engine once an instance with a destroy callback reaches ready.
  pub(crate) fn register(
    &self,
    scope_id: &str,
    bean: &str,
    run: impl FnOnce() -> Result<(), BeanError> + Send + 'static,
  ) {
    let mut actions = self.actions.lock();
    actions
      .entry(scope_id.to_owned())
      .or_default()
      .push(DisposalAction {
        bean: bean.to_owned(),
        run: Box::new(run),
      });
    debug!(scope = scope_id, bean, "disposal action registered");
  }

  /// Number of pending disposal actions for `scope_id`.
  pub fn pending(&self, scope_id: &str) -> usize {
    self
      .actions
      .lock()
      .get(scope_id)
      .map(Vec::len)
      .unwrap_or(0)
  }

  /// Runs every disposal action registered for `scope_id`, last created
  /// first. Individual failures never abort the sweep; they are collected
  /// into an aggregated report after every action has been attempted.
  pub fn destroy_scope(&self, scope_id: &str) -> Result<(), DestructionErrors> {
    let drained = self.actions.lock().remove(scope_id).unwrap_or_default();
    let mut failures = Vec::new();
    for action in drained.into_iter().rev() {
      if let Err(err) = (action.run)() {
        warn!(scope = scope_id, bean = %action.bean, error = %err, "destroy callback failed");
        failures.push(BeanError::Destruction {
          bean: action.bean,
          reason: err.to_string(),
        });
      }
    }
    if failures.is_empty() {
      Ok(())
    } else {
      Err(DestructionErrors { failures })
    }
  }
}
