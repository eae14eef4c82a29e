use crate::virtual_machine::errors::VMError;

/// Auto-extending interpreter memory.
///
/// Index-addressed from 0 and logically unbounded: any access at or beyond
/// the current length first zero-fills the store up to and including that
/// address. Extension is observable, a read of a touched but never written
/// cell returns 0.
///
/// An optional cell limit turns runaway addresses into
/// [`VMError::MemoryLimitExceeded`]. Without one, growth the host cannot
/// allocate fails with [`VMError::OutOfMemory`].
pub(super) struct Memory {
    cells: Vec<i64>,
    limit: Option<usize>,
}

impl Memory {
    /// Creates memory initialised with a program image.
    pub(super) fn new(image: Vec<i64>, limit: Option<usize>) -> Self {
        Self {
            cells: image,
            limit,
        }
    }

    /// Grows the store so that `address` is valid.
    fn ensure(&mut self, address: usize) -> Result<(), VMError> {
        if address < self.cells.len() {
            return Ok(());
        }
        if let Some(limit) = self.limit
            && address >= limit
        {
            return Err(VMError::MemoryLimitExceeded { address, limit });
        }
        let grow = address + 1 - self.cells.len();
        self.cells
            .try_reserve(grow)
            .map_err(|_| VMError::OutOfMemory { address })?;
        self.cells.resize(address + 1, 0);
        Ok(())
    }

    /// Returns the value at `address`, extending memory if needed.
    pub(super) fn read(&mut self, address: usize) -> Result<i64, VMError> {
        self.ensure(address)?;
        Ok(self.cells[address])
    }

    /// Stores `value` at `address`, extending memory if needed.
    pub(super) fn write(&mut self, address: usize, value: i64) -> Result<(), VMError> {
        self.ensure(address)?;
        self.cells[address] = value;
        Ok(())
    }

    /// Current number of cells.
    pub(super) fn len(&self) -> usize {
        self.cells.len()
    }

    pub(super) fn as_slice(&self) -> &[i64] {
        &self.cells
    }
}
