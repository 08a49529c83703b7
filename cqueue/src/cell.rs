use std::cell::Cell;

/// A single mutable value.
///
/// Accesses are plain loads and stores. The cell is `!Sync`; threads that
/// want to share one must synchronize externally.
#[derive(Debug, Default)]
pub struct VariableCell<T: Copy> {
    value: Cell<T>,
}

impl<T: Copy + Default> VariableCell<T> {
    pub fn new() -> Self {
        Self {
            value: Cell::new(T::default()),
        }
    }

    /// Restores the default value.
    pub fn init(&self) {
        self.value.set(T::default());
    }
}

impl<T: Copy> VariableCell<T> {
    pub fn set(&self, val: T) {
        self.value.set(val);
    }

    pub fn get(&self) -> T {
        self.value.get()
    }
}
