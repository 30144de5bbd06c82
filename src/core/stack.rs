//! Per-thread stack of executing processes.
//!
//! Every thread owns its own [`ProcessStack`]; it is never shared across threads,
//! so it needs no locking. A stack that is not empty once a top-level run has
//! returned means a process leaked.
//!
//! A caller can supply its own stack instead. While it is entered with
//! [`ProcessStack::enter`], [`ProcessStack::with_current`] resolves to it, so
//! nested invocations made from inside a body land on the same stack.

use crate::core::error::ProcessError;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;
use uuid::Uuid;

/// A process currently executing on this thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackEntry {
    pub process_id: Uuid,
    pub parent: Option<Uuid>,
}

/// A stack of executing processes. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct ProcessStack {
    entries: Rc<RefCell<Vec<StackEntry>>>,
}

thread_local! {
    static THREAD_STACK: ProcessStack = ProcessStack::new();
    static ENTERED: RefCell<Vec<ProcessStack>> = const { RefCell::new(Vec::new()) };
}

/// Keeps a stack entered as the thread's current one until dropped.
#[derive(Debug)]
pub struct StackScope {
    // Must be dropped on the thread that entered it.
    _not_send: PhantomData<Rc<()>>,
}

impl Drop for StackScope {
    fn drop(&mut self) {
        ENTERED.with(|entered| entered.borrow_mut().pop());
    }
}

impl ProcessStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with the current stack: the most recently entered one, or the
    /// calling thread's own.
    pub fn with_current<R>(f: impl FnOnce(&ProcessStack) -> R) -> R {
        let entered = ENTERED.with(|entered| entered.borrow().last().cloned());
        match entered {
            Some(stack) => f(&stack),
            None => THREAD_STACK.with(f),
        }
    }

    /// Makes this stack the current one on the calling thread until the returned
    /// scope is dropped. Scopes nest.
    pub fn enter(&self) -> StackScope {
        ENTERED.with(|entered| entered.borrow_mut().push(self.clone()));
        StackScope {
            _not_send: PhantomData,
        }
    }

    /// Whether `other` shares this stack's entries.
    pub fn same_as(&self, other: &ProcessStack) -> bool {
        Rc::ptr_eq(&self.entries, &other.entries)
    }

    /// Pushes a process, returning the id of its parent (the previous top).
    pub fn push(&self, process_id: Uuid) -> Option<Uuid> {
        let mut entries = self.entries.borrow_mut();
        let parent = entries.last().map(|e| e.process_id);
        entries.push(StackEntry { process_id, parent });
        parent
    }

    /// Pops `process_id`, which must be on top.
    ///
    /// On mismatch the stack is left untouched.
    pub fn pop(&self, process_id: Uuid) -> Result<StackEntry, ProcessError> {
        let mut entries = self.entries.borrow_mut();
        match entries.last().copied() {
            Some(top) if top.process_id == process_id => {
                entries.pop();
                Ok(top)
            }
            top => {
                let expected = top.map(|e| e.process_id);
                log::error!(
                    "Process stack corrupted: popping {} but top is {:?}",
                    process_id,
                    expected
                );
                Err(ProcessError::StackCorruption {
                    expected,
                    found: process_id,
                })
            }
        }
    }

    pub fn peek(&self) -> Option<StackEntry> {
        self.entries.borrow().last().copied()
    }

    pub fn depth(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Process ids from bottom to top.
    pub fn ids(&self) -> Vec<Uuid> {
        self.entries.borrow().iter().map(|e| e.process_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_tracks_parent() {
        let stack = ProcessStack::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        assert_eq!(stack.push(a), None);
        assert_eq!(stack.push(b), Some(a));
        assert_eq!(stack.depth(), 2);
        assert_eq!(
            stack.peek(),
            Some(StackEntry {
                process_id: b,
                parent: Some(a)
            })
        );

        assert_eq!(stack.pop(b).unwrap().parent, Some(a));
        assert_eq!(stack.pop(a).unwrap().parent, None);
        assert!(stack.is_empty());
        assert_eq!(stack.peek(), None);
    }

    #[test]
    fn test_mismatched_pop_is_corruption() {
        let stack = ProcessStack::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        stack.push(a);
        stack.push(b);

        let err = stack.pop(a).unwrap_err();
        assert!(matches!(
            err,
            ProcessError::StackCorruption { expected: Some(top), found } if top == b && found == a
        ));
        assert_eq!(stack.ids(), vec![a, b]);
    }

    #[test]
    fn test_pop_on_empty_stack() {
        let stack = ProcessStack::new();
        assert!(matches!(
            stack.pop(Uuid::new_v4()),
            Err(ProcessError::StackCorruption { expected: None, .. })
        ));
    }

    #[test]
    fn test_thread_stacks_are_independent() {
        let id = Uuid::new_v4();
        ProcessStack::with_current(|stack| stack.push(id));

        let other_depth = std::thread::spawn(|| ProcessStack::with_current(|s| s.depth()))
            .join()
            .unwrap();
        assert_eq!(other_depth, 0);

        ProcessStack::with_current(|stack| {
            assert_eq!(stack.depth(), 1);
            stack.pop(id).unwrap();
            assert!(stack.is_empty());
        });
    }

    #[test]
    fn test_entered_stack_becomes_current() {
        let own = ProcessStack::new();
        let id = Uuid::new_v4();
        {
            let _scope = own.enter();
            ProcessStack::with_current(|stack| {
                assert!(stack.same_as(&own));
                stack.push(id);
            });

            let inner = ProcessStack::new();
            {
                let _nested = inner.enter();
                assert_eq!(ProcessStack::with_current(|s| s.depth()), 0);
            }
            assert_eq!(ProcessStack::with_current(|s| s.depth()), 1);
        }

        assert_eq!(own.ids(), vec![id]);
        assert_eq!(ProcessStack::with_current(|s| s.depth()), 0);
        assert!(!ProcessStack::with_current(|s| s.same_as(&own)));
    }

    #[test]
    fn test_clones_share_entries() {
        let stack = ProcessStack::new();
        let handle = stack.clone();
        let id = Uuid::new_v4();

        handle.push(id);
        assert_eq!(stack.peek().map(|e| e.process_id), Some(id));
        assert!(stack.same_as(&handle));
        stack.pop(id).unwrap();
        assert!(handle.is_empty());
    }
}
