//! Bookkeeping for resolutions in progress.
//!
//! Two views of the same thing:
//! - a thread-local stack of providers being resolved on this thread, shared
//!   by every [`Resolution`](crate::resolution::Resolution) that runs on it.
//!   A delegate invoked from inside a target joins the stack of the
//!   resolution that called the target, so a cycle closed through a
//!   delegate is seen like any other;
//! - a per-container wait graph of Singleton constructions (which thread
//!   builds which Singleton, which Singleton each thread is blocked on),
//!   used to refuse a wait that would close a cycle across threads.

use std::cell::RefCell;
use std::thread::{self, ThreadId};

use dashmap::DashMap;
use tracing::warn;

use crate::error::{CircularDependencyError, Result, WireboxError};
use crate::name::ProviderName;
use crate::registry::EntryId;

thread_local! {
    static RESOLVING: RefCell<Vec<(usize, ProviderName)>> = const { RefCell::new(Vec::new()) };
}

fn cycle(chain: Vec<ProviderName>) -> WireboxError {
    warn!(cycle = ?chain, "Circular dependency detected!");
    WireboxError::CircularDependency(CircularDependencyError { chain })
}

// ============================================================
// Per-thread resolving stack
// ============================================================

/// Marks `name` as being resolved on this thread until dropped.
pub(crate) struct ResolvingGuard {
    container: usize,
}

impl ResolvingGuard {
    /// Pushes `name`, or fails if it is already being resolved on this
    /// thread for the same container.
    pub fn enter(container: usize, name: &ProviderName) -> Result<Self> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            let ours: Vec<&ProviderName> = stack
                .iter()
                .filter(|(owner, _)| *owner == container)
                .map(|(_, n)| n)
                .collect();

            if let Some(start) = ours.iter().position(|n| *n == name) {
                let mut chain: Vec<ProviderName> = ours[start..].iter().map(|n| (*n).clone()).collect();
                chain.push(name.clone());
                return Err(cycle(chain));
            }

            stack.push((container, name.clone()));
            Ok(Self { container })
        })
    }

    /// The innermost provider being resolved on this thread, if any.
    pub fn current(container: usize) -> Option<ProviderName> {
        RESOLVING.with(|stack| {
            stack
                .borrow()
                .iter()
                .rev()
                .find(|(owner, _)| *owner == container)
                .map(|(_, name)| name.clone())
        })
    }
}

impl Drop for ResolvingGuard {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(index) = stack.iter().rposition(|(owner, _)| *owner == self.container) {
                stack.remove(index);
            }
        });
    }
}

// ============================================================
// Cross-thread wait graph
// ============================================================

/// Which thread builds which Singleton, and what each thread waits for.
#[derive(Default)]
pub(crate) struct WaitGraph {
    building: DashMap<EntryId, (ThreadId, ProviderName)>,
    waiting: DashMap<ThreadId, (EntryId, ProviderName)>,
}

impl WaitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that this thread is about to wait for Singleton `id`.
    ///
    /// Fails with `CircularDependency` if the thread building `id` is
    /// (transitively) waiting for a Singleton this thread is building.
    pub fn wait_for(&self, id: EntryId, name: &ProviderName) -> Result<WaitGuard<'_>> {
        let me = thread::current().id();
        self.waiting.insert(me, (id, name.clone()));
        let guard = WaitGuard { graph: self, thread: me };

        let mut chain = vec![name.clone()];
        let mut cell = id;
        for _ in 0..=self.building.len() {
            let Some(owner) = self.building.get(&cell).map(|entry| entry.value().0) else {
                return Ok(guard);
            };
            if owner == me {
                return Err(cycle(chain));
            }
            let Some((next, next_name)) = self.waiting.get(&owner).map(|entry| entry.value().clone()) else {
                return Ok(guard);
            };
            chain.push(next_name);
            cell = next;
        }
        Ok(guard)
    }

    /// Records that this thread builds Singleton `id` until dropped.
    pub fn building(&self, id: EntryId, name: &ProviderName) -> BuildGuard<'_> {
        let me = thread::current().id();
        self.waiting.remove(&me);
        self.building.insert(id, (me, name.clone()));
        BuildGuard { graph: self, id }
    }

    #[cfg(test)]
    pub fn is_idle(&self) -> bool {
        self.building.is_empty() && self.waiting.is_empty()
    }
}

pub(crate) struct WaitGuard<'g> {
    graph: &'g WaitGraph,
    thread: ThreadId,
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.graph.waiting.remove(&self.thread);
    }
}

pub(crate) struct BuildGuard<'g> {
    graph: &'g WaitGraph,
    id: EntryId,
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        self.graph.building.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(err: WireboxError) -> Vec<String> {
        match err {
            WireboxError::CircularDependency(err) => err.chain.iter().map(|n| n.to_string()).collect(),
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
    }

    #[test]
    fn nested_guards_detect_reentry() {
        let a = ProviderName::new("a");
        let b = ProviderName::new("b");

        let _outer = ResolvingGuard::enter(1, &a).unwrap();
        let _inner = ResolvingGuard::enter(1, &b).unwrap();
        assert_eq!(ResolvingGuard::current(1), Some(b.clone()));

        let err = ResolvingGuard::enter(1, &a).err().unwrap();
        assert_eq!(names(err), vec!["a", "b", "a"]);
    }

    #[test]
    fn containers_do_not_share_stack() {
        let a = ProviderName::new("a");
        let _first = ResolvingGuard::enter(1, &a).unwrap();
        let _second = ResolvingGuard::enter(2, &a).unwrap();
        assert_eq!(ResolvingGuard::current(3), None);
    }

    #[test]
    fn guard_pops_on_drop() {
        let a = ProviderName::new("a");
        {
            let _guard = ResolvingGuard::enter(7, &a).unwrap();
        }
        assert!(ResolvingGuard::enter(7, &a).is_ok());
        assert_eq!(ResolvingGuard::current(7), None);
    }

    #[test]
    fn waiting_on_own_build_is_a_cycle() {
        let graph = WaitGraph::new();
        let a = ProviderName::new("a");
        let _building = graph.building(1, &a);

        let err = graph.wait_for(1, &a).err().unwrap();
        assert_eq!(names(err), vec!["a"]);
    }

    #[test]
    fn cross_thread_wait_cycle() {
        let graph = WaitGraph::new();
        let a = ProviderName::new("a");
        let b = ProviderName::new("b");
        let other = std::thread::spawn(|| thread::current().id()).join().unwrap();

        // Another thread builds `b` and waits for `a`.
        graph.building.insert(2, (other, b.clone()));
        graph.waiting.insert(other, (1, a.clone()));

        let _building_a = graph.building(1, &a);
        let err = graph.wait_for(2, &b).err().unwrap();
        assert_eq!(names(err), vec!["b", "a"]);
        assert!(!graph.waiting.contains_key(&thread::current().id()));
    }

    #[test]
    fn unrelated_wait_is_allowed() {
        let graph = WaitGraph::new();
        let a = ProviderName::new("a");
        assert!(graph.wait_for(1, &a).is_ok());
        assert!(graph.waiting.is_empty());
    }
}
