// File: crates/chart-pipeline/src/channel.rs
// Summary: Single-event broadcast channel used by every stage to publish recomputed state.
// Notes:
// - `subscribe` replaces the listener set; it never appends.
// - Listeners run synchronously in subscription order. The first listener that
//   returns `Err` stops the emission and the error reaches the caller of `emit`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::Result;

pub type Listener<T> = Rc<dyn Fn(&T) -> Result<()>>;

/// Wrap a closure as a listener.
pub fn listener<T, F>(f: F) -> Listener<T>
where
    F: Fn(&T) -> Result<()> + 'static,
{
    Rc::new(f)
}

pub struct Channel<T> {
    listeners: RefCell<Rc<[Listener<T>]>>,
}

impl<T> Channel<T> {
    pub fn new() -> Self {
        Self { listeners: RefCell::new(Rc::from(Vec::new())) }
    }

    /// Replace every registered listener with `listeners`.
    pub fn subscribe(&self, listeners: Vec<Listener<T>>) {
        *self.listeners.borrow_mut() = Rc::from(listeners);
    }

    pub fn emit(&self, value: &T) -> Result<()> {
        // Snapshot so listeners may resubscribe or re-emit while we iterate.
        let listeners = Rc::clone(&self.listeners.borrow());
        for l in listeners.iter() {
            l(value)?;
        }
        Ok(())
    }

    pub fn listener_count(&self) -> usize { self.listeners.borrow().len() }
}

impl<T> Default for Channel<T> {
    fn default() -> Self { Self::new() }
}
