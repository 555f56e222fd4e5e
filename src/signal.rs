use std::{cell::Cell, rc::Rc};

/// An external boolean signal that can be connected to gate inputs.
///
/// The clone operation only performs a shallow clone: all clones
/// observe the same value. The caller keeps a clone to change the value
/// between evaluations, the graph only reads it.
#[derive(Clone, Debug, Default)]
pub struct Signal(Rc<Cell<bool>>);

impl Signal {
    pub fn new(value: bool) -> Self {
        Signal(Rc::new(Cell::new(value)))
    }

    pub fn get(&self) -> bool {
        self.0.get()
    }

    pub fn set(&self, value: bool) {
        self.0.set(value)
    }

    /// Returns true if both handles refer to the same signal.
    pub fn ptr_eq(&self, other: &Signal) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl From<bool> for Signal {
    fn from(value: bool) -> Signal {
        Signal::new(value)
    }
}
