use std::cell::RefCell;
use thread_local::ThreadLocal;

/// Per-thread scratch storage, created on first use by each thread and kept for the lifetime of
/// the pool.
#[derive(Debug)]
pub struct ScratchPool<W: Send> {
    workspaces: ThreadLocal<RefCell<W>>,
}

impl<W: Send> Default for ScratchPool<W> {
    fn default() -> Self {
        Self {
            workspaces: ThreadLocal::new(),
        }
    }
}

impl<W: Send> ScratchPool<W> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with the workspace of the current thread, creating it with `create` if needed.
    ///
    /// # Panics
    ///
    /// Panics if called again from within `f` on the same thread.
    pub fn with<C, F, R>(&self, create: C, f: F) -> R
    where
        C: FnOnce() -> W,
        F: FnOnce(&mut W) -> R,
    {
        let workspace = self.workspaces.get_or(|| RefCell::new(create()));
        f(&mut workspace.borrow_mut())
    }
}
