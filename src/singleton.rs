// src/singleton.rs

//! Per-scope instance caches, the thread-local resolution path used for
//! circular-dependency detection, and cross-thread wait handling.

use std::cell::RefCell;
use std::collections::HashMap;
use std::thread::{self, ThreadId};
use std::time::Duration;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::error::{BeanError, Result};
use crate::instantiate::BeanHandle;

/// Where a creation frame currently is: resolving constructor arguments, or
/// past instantiation (property population and callbacks).
#[derive(Clone, Copy, PartialEq)]
pub(crate) enum Phase {
  Constructor,
  Property,
}

struct Frame {
  name: String,
  phase: Phase,
}

thread_local! {
  // The ordered set of bean names currently being created by this thread.
  // Being thread-local is what keeps unrelated concurrent creations from
  // interfering with each other's cycle detection.
  static RESOLUTION_PATH: RefCell<Vec<Frame>> = RefCell::new(Vec::new());
}

/// RAII frame on the thread-local resolution path.
///
/// The creation engine checks [`on_current_path`] *before* entering a frame;
/// the guard itself only maintains the path. A frame starts in the
/// constructor phase; the engine advances it with [`enter_property_phase`]
/// once the instance exists.
pub(crate) struct PathGuard {
  _name: String,
}

impl PathGuard {
  pub(crate) fn enter(name: &str) -> Self {
    RESOLUTION_PATH.with(|path| {
      path.borrow_mut().push(Frame {
        name: name.to_owned(),
        phase: Phase::Constructor,
      })
    });
    Self {
      _name: name.to_owned(),
    }
  }
}

impl Drop for PathGuard {
  fn drop(&mut self) {
    RESOLUTION_PATH.with(|path| {
      path.borrow_mut().pop();
    });
  }
}

/// Whether `name` is already being created by this thread.
pub(crate) fn on_current_path(name: &str) -> bool {
  RESOLUTION_PATH.with(|path| path.borrow().iter().any(|f| f.name == name))
}

/// The current path plus `name`, for error reporting.
pub(crate) fn cycle_path(name: &str) -> Vec<String> {
  RESOLUTION_PATH.with(|path| {
    let mut full: Vec<String> = path.borrow().iter().map(|f| f.name.clone()).collect();
    full.push(name.to_owned());
    full
  })
}

/// Marks the innermost frame as past instantiation.
pub(crate) fn enter_property_phase() {
  RESOLUTION_PATH.with(|path| {
    if let Some(frame) = path.borrow_mut().last_mut() {
      frame.phase = Phase::Property;
    }
  });
}

/// Whether the innermost frame is still resolving constructor arguments.
/// A back-edge issued from that position cannot be satisfied with an early
/// reference, even when one exists.
pub(crate) fn resolving_constructor() -> bool {
  RESOLUTION_PATH.with(|path| {
    path
      .borrow()
      .last()
      .map_or(false, |f| f.phase == Phase::Constructor)
  })
}

// Cross-thread waits-for edges: waiting thread -> (bean waited on, creator).
// Consulted before parking so that two threads whose creations need each
// other's in-progress beans fail instead of deadlocking.
static CROSS_WAITS: Lazy<DashMap<ThreadId, WaitEdge>> = Lazy::new(DashMap::new);

struct WaitEdge {
  bean: String,
  creator: ThreadId,
}

fn cross_thread_cycle(me: ThreadId, bean: &str, creator: ThreadId) -> Option<Vec<String>> {
  let mut names = vec![bean.to_owned()];
  let mut cursor = creator;
  // Bounded walk: every hop consumes a distinct waiting thread.
  for _ in 0..=CROSS_WAITS.len() {
    if cursor == me {
      return Some(names);
    }
    match CROSS_WAITS.get(&cursor) {
      Some(edge) => {
        names.push(edge.bean.clone());
        cursor = edge.creator;
      }
      None => return None,
    }
  }
  None
}

/// Outcome of [`InstanceCache::begin`].
pub(crate) enum Begin {
  /// Another creation finished first; the shared instance is returned.
  Ready(BeanHandle),
  /// The caller owns the creation and must finish with `complete` or `fail`.
  Started,
}

/// The instance cache for one scope.
///
/// States per name: absent, in-progress (with the creating thread recorded),
/// or ready. In-progress singletons may additionally expose an early
/// reference: the instance exists but its properties are still being
/// populated. Failed creations are evicted entirely, so callers may retry.
pub(crate) struct InstanceCache {
  inner: Mutex<CacheInner>,
  ready_cv: Condvar,
}

#[derive(Default)]
struct CacheInner {
  ready: HashMap<String, BeanHandle>,
  early: HashMap<String, BeanHandle>,
  in_progress: HashMap<String, ThreadId>,
}

impl InstanceCache {
  pub(crate) fn new() -> Self {
    Self {
      inner: Mutex::new(CacheInner::default()),
      ready_cv: Condvar::new(),
    }
  }

  pub(crate) fn get_ready(&self, name: &str) -> Option<BeanHandle> {
    self.inner.lock().ready.get(name).cloned()
  }

  pub(crate) fn get_early(&self, name: &str) -> Option<BeanHandle> {
    self.inner.lock().early.get(name).cloned()
  }

  /// Claims the creation of `name` for the current thread.
  ///
  /// If another thread is already creating it, blocks until that creation
  /// reaches `Ready` or is evicted; before each park, a waits-for cycle
  /// among creating threads fails with [`BeanError::CircularDependency`]
  /// rather than deadlocking.
  pub(crate) fn begin(&self, name: &str) -> Result<Begin> {
    let me = thread::current().id();
    let mut inner = self.inner.lock();
    loop {
      if let Some(handle) = inner.ready.get(name) {
        return Ok(Begin::Ready(handle.clone()));
      }
      match inner.in_progress.get(name).copied() {
        None => {
          inner.in_progress.insert(name.to_owned(), me);
          trace!(name, "creation claimed");
          return Ok(Begin::Started);
        }
        Some(creator) if creator == me => {
          // Same-thread re-entry is normally intercepted by the resolution
          // path before `begin`; reaching it here is still a cycle.
          return Err(BeanError::CircularDependency {
            path: cycle_path(name),
          });
        }
        Some(creator) => {
          if let Some(path) = cross_thread_cycle(me, name, creator) {
            return Err(BeanError::CircularDependency { path });
          }
          CROSS_WAITS.insert(
            me,
            WaitEdge {
              bean: name.to_owned(),
              creator,
            },
          );
          // Bounded park so the waits-for check is re-evaluated even if a
          // wakeup is missed during an eviction race.
          self
            .ready_cv
            .wait_for(&mut inner, Duration::from_millis(20));
          CROSS_WAITS.remove(&me);
        }
      }
    }
  }

  /// Exposes the not-yet-populated instance of an in-progress singleton.
  pub(crate) fn publish_early(&self, name: &str, handle: BeanHandle) {
    self.inner.lock().early.insert(name.to_owned(), handle);
    trace!(name, "early reference published");
  }

  /// Transitions `name` to ready and wakes all waiters.
  pub(crate) fn complete(&self, name: &str, handle: BeanHandle) {
    let mut inner = self.inner.lock();
    inner.in_progress.remove(name);
    inner.early.remove(name);
    inner.ready.insert(name.to_owned(), handle);
    debug!(name, "instance ready");
    self.ready_cv.notify_all();
  }

  /// Evicts every trace of a failed creation and wakes all waiters; one of
  /// them will re-claim the creation.
  pub(crate) fn fail(&self, name: &str) {
    let mut inner = self.inner.lock();
    inner.in_progress.remove(name);
    inner.early.remove(name);
    inner.ready.remove(name);
    debug!(name, "creation failed, cache entry evicted");
    self.ready_cv.notify_all();
  }

  /// Drops all ready and early instances (scope teardown).
  pub(crate) fn clear(&self) {
    let mut inner = self.inner.lock();
    inner.ready.clear();
    inner.early.clear();
    self.ready_cv.notify_all();
  }

  #[cfg(test)]
  pub(crate) fn ready_len(&self) -> usize {
    self.inner.lock().ready.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;

  #[test]
  fn path_guard_unwinds_on_drop() {
    assert!(!on_current_path("a"));
    {
      let _a = PathGuard::enter("a");
      let _b = PathGuard::enter("b");
      assert!(on_current_path("a"));
      assert_eq!(cycle_path("a"), vec!["a", "b", "a"]);
    }
    assert!(!on_current_path("a"));
  }

  #[test]
  fn phase_tracks_the_innermost_frame() {
    let _outer = PathGuard::enter("outer");
    enter_property_phase();
    assert!(!resolving_constructor());
    {
      // A nested frame starts over in the constructor phase and does not
      // disturb the outer frame's phase.
      let _inner = PathGuard::enter("inner");
      assert!(resolving_constructor());
      enter_property_phase();
      assert!(!resolving_constructor());
    }
    assert!(!resolving_constructor());
  }

  #[test]
  fn failed_creation_leaves_no_residue() {
    let cache = InstanceCache::new();
    assert!(matches!(cache.begin("svc").unwrap(), Begin::Started));
    cache.publish_early("svc", Arc::new(1u32));
    cache.fail("svc");
    assert!(cache.get_ready("svc").is_none());
    assert!(cache.get_early("svc").is_none());
    // The slot is reclaimable.
    assert!(matches!(cache.begin("svc").unwrap(), Begin::Started));
  }

  #[test]
  fn begin_returns_ready_after_completion() {
    let cache = InstanceCache::new();
    assert!(matches!(cache.begin("svc").unwrap(), Begin::Started));
    cache.complete("svc", Arc::new(5u32));
    match cache.begin("svc").unwrap() {
      Begin::Ready(handle) => assert_eq!(*handle.downcast::<u32>().unwrap(), 5),
      Begin::Started => panic!("expected ready instance"),
    }
  }
}
