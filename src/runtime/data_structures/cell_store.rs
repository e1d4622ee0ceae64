use crate::runtime::data_structures::value::Value;

/// The flat memory used by VARIABLE, ALLOT and friends.  Addresses are plain indices into the
/// store and every cell holds one value.  Cells are only ever handed out from the end, so a mark
/// taken with `here` can be used to give back everything allotted since.
///
/// The store never grows past `max_cells`.
pub struct CellStore {
    cells: Vec<Value>,
    max_cells: usize,
}

impl CellStore {
    pub fn new(max_cells: usize) -> CellStore {
        CellStore {
            cells: Vec::new(),
            max_cells,
        }
    }

    /// How many more cells can be allotted.
    pub fn available(&self) -> usize {
        self.max_cells.saturating_sub(self.cells.len())
    }

    /// The address the next allotted cell will get.
    pub fn here(&self) -> usize {
        self.cells.len()
    }

    /// Reserve `count` zeroed cells and return the address of the first one.  Returns None and
    /// allots nothing if that would go past the limit.
    pub fn allot(&mut self, count: usize) -> Option<usize> {
        if count > self.available() {
            return None;
        }

        let start = self.cells.len();

        self.cells.resize(start + count, Value::default());
        Some(start)
    }

    /// Read a cell, if the address is valid.
    pub fn fetch(&self, address: usize) -> Option<&Value> {
        self.cells.get(address)
    }

    /// Write a cell.  Returns false if the address is outside of the allotted memory.
    pub fn store(&mut self, address: usize, value: Value) -> bool {
        match self.cells.get_mut(address) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// Give back every cell allotted at or after the mark.
    pub fn truncate(&mut self, mark: usize) {
        self.cells.truncate(mark);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allot_fetch_and_store() {
        let mut store = CellStore::new(16);

        let first = store.allot(1);
        let second = store.allot(2);

        assert_eq!(first, Some(0));
        assert_eq!(second, Some(1));
        assert_eq!(store.here(), 3);
        assert_eq!(store.fetch(2), Some(&Value::Int(0)));

        assert!(store.store(1, Value::Int(42)));
        assert_eq!(store.fetch(1), Some(&Value::Int(42)));
        assert!(!store.store(3, Value::Int(1)));
        assert!(store.fetch(3).is_none());

        store.truncate(1);
        assert_eq!(store.here(), 1);
    }

    #[test]
    fn allot_stops_at_the_limit() {
        let mut store = CellStore::new(4);

        assert_eq!(store.allot(3), Some(0));
        assert_eq!(store.available(), 1);
        assert_eq!(store.allot(2), None);
        assert_eq!(store.allot(usize::MAX), None);
        assert_eq!(store.here(), 3);
        assert_eq!(store.allot(1), Some(3));
        assert_eq!(store.available(), 0);
    }
}
