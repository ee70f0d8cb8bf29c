/// Addressable store of textual words.
///
/// Cells hold either a 4-digit instruction or a decimal value of any length. Nothing
/// distinguishes code from data.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Memory {
    cells: Vec<String>,
}

impl Memory {
    pub const DEFAULT_SIZE: usize = 100;
    /// Content of a cell that was never written.
    pub const EMPTY_CELL: &'static str = "0000";

    pub fn new(size: usize) -> Self {
        Memory {
            cells: vec![Self::EMPTY_CELL.to_owned(); size],
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_address_valid(&self, address: usize) -> bool {
        address < self.cells.len()
    }

    pub fn get(&self, address: usize) -> Option<&str> {
        self.cells.get(address).map(String::as_str)
    }

    /// Returns `false` and leaves memory untouched if the address is out of range.
    pub fn set(&mut self, address: usize, value: impl Into<String>) -> bool {
        match self.cells.get_mut(address) {
            Some(cell) => {
                *cell = value.into();
                true
            }
            None => false,
        }
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    /// Clear every cell back to its initial content.
    pub fn reset(&mut self) {
        for cell in &mut self.cells {
            Self::EMPTY_CELL.clone_into(cell);
        }
    }
}

impl Default for Memory {
    fn default() -> Self {
        Memory::new(Self::DEFAULT_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let mem = Memory::default();
        assert_eq!(mem.len(), 100);
        assert!(mem.cells().iter().all(|cell| cell == "0000"));
    }

    #[test]
    fn get_and_set() {
        let mut mem = Memory::new(10);
        assert!(mem.set(3, "2005"));
        assert!(mem.set(9, "-123456789012345678901234567890"));
        assert_eq!(mem.get(3), Some("2005"));
        assert_eq!(mem.get(9), Some("-123456789012345678901234567890"));
        assert!(!mem.set(10, "1"));
        assert_eq!(mem.get(10), None);
        assert!(mem.is_address_valid(9));
        assert!(!mem.is_address_valid(10));
    }

    #[test]
    fn reset_clears() {
        let mut mem = Memory::new(4);
        mem.set(0, "4300");
        mem.reset();
        assert_eq!(mem, Memory::new(4));
    }
}
