//! # Column Storage
//!
//! One attribute of one family, stored densely.
//!
//! - Access is O(1) by slot index
//! - Iteration is contiguous
//! - Growth is geometric and keeps existing slots in place

use bytemuck::Pod;

/// Smallest capacity a column grows to.
pub const MIN_COLUMN_CAPACITY: usize = 64;

/// Dense storage for a single attribute.
///
/// Slots past the owning family's counter hold stale or default data and are
/// never read as live.
///
/// # Type Parameters
///
/// * `T` - The plain-old-data attribute type
#[derive(Clone, Debug, PartialEq)]
pub struct Column<T: Pod + Default> {
    data: Vec<T>,
}

impl<T: Pod + Default> Column<T> {
    /// Creates a column with every slot initialized to the default value.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Initial number of slots
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![T::default(); capacity],
        }
    }

    /// Returns the number of allocated slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Grows the column so it holds at least `required` slots.
    ///
    /// Capacity at least doubles on every growth. Allocation failure aborts the
    /// process; there is nothing to recover in the middle of a tick.
    pub fn ensure_capacity(&mut self, required: usize) {
        if required <= self.data.len() {
            return;
        }
        let grown = (self.data.len() * 2).max(required).max(MIN_COLUMN_CAPACITY);
        self.data.resize(grown, T::default());
    }

    /// Gets a value by slot.
    ///
    /// # Returns
    ///
    /// The value, or None if the slot is past capacity.
    #[inline]
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<T> {
        self.data.get(slot).copied()
    }

    /// Gets a mutable reference by slot.
    #[inline]
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        self.data.get_mut(slot)
    }

    /// Sets the value at a slot.
    ///
    /// # Returns
    ///
    /// `true` if the value was written, `false` if the slot is past capacity.
    #[inline]
    pub fn set(&mut self, slot: usize, value: T) -> bool {
        if let Some(cell) = self.data.get_mut(slot) {
            *cell = value;
            true
        } else {
            false
        }
    }

    /// Returns all slots.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Returns all slots mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Returns the first `len` slots as raw bytes.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds capacity.
    #[must_use]
    pub fn prefix_bytes(&self, len: usize) -> &[u8] {
        bytemuck::cast_slice(&self.data[..len])
    }

    /// Copies the first `len` slots of `other` into this column.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the capacity of `other`.
    pub fn copy_prefix_from(&mut self, other: &Self, len: usize) {
        self.ensure_capacity(len);
        self.data[..len].copy_from_slice(&other.data[..len]);
    }

    /// Fills every slot with `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}
