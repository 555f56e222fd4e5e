use std::cmp::max;

use crate::GateError;

/// A randomly indexable collection of link records.
///
/// Every position below [`LinkVec::capacity`] is either empty or occupied;
/// [`LinkVec::len`] counts the occupied ones. The same container backs the
/// fixed input slot array of a gate (which has holes) and the output link
/// collection of a gate (which is kept dense by [`LinkVec::push`] and
/// [`LinkVec::swap_remove`]).
///
/// Capacity doubles when a push finds the collection full and halves once
/// the length drops to a quarter of the capacity, but never below the
/// capacity the collection was created with.
#[derive(Clone, Debug)]
pub struct LinkVec<T> {
    data: Vec<Option<T>>,
    len: usize,
    min_capacity: usize,
}

impl<T> LinkVec<T> {
    /// Creates a collection with `capacity` empty positions.
    pub fn with_capacity(capacity: usize) -> Result<Self, GateError> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)?;
        data.resize_with(capacity, || None);
        Ok(Self {
            data,
            len: 0,
            min_capacity: capacity,
        })
    }

    /// Returns the number of occupied positions.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of positions, occupied or not.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index)?.as_ref()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.data.get_mut(index)?.as_mut()
    }

    /// Stores `value` at `index` and returns the previous occupant.
    ///
    /// Writing to an empty position increases the length by one,
    /// overwriting does not. Fails if `index` is not below the capacity.
    pub fn set(&mut self, index: usize, value: T) -> Result<Option<T>, GateError> {
        let capacity = self.capacity();
        let position = self.data.get_mut(index).ok_or_else(|| {
            GateError::InvalidArgument(format!(
                "position {index} out of range for capacity {capacity}"
            ))
        })?;
        let previous = position.replace(value);
        if previous.is_none() {
            self.len += 1;
        }
        Ok(previous)
    }

    /// Empties the position at `index` and returns its occupant.
    pub fn take(&mut self, index: usize) -> Option<T> {
        let previous = self.data.get_mut(index)?.take();
        if previous.is_some() {
            self.len -= 1;
        }
        previous
    }

    /// Makes sure that the next [`LinkVec::push`] does not have to grow.
    pub fn reserve_one(&mut self) -> Result<(), GateError> {
        if self.len == self.capacity() {
            self.resize(max(2 * self.capacity(), 1))?;
        }
        Ok(())
    }

    /// Appends `value` after the last occupied position of a dense
    /// collection and returns its index.
    pub fn push(&mut self, value: T) -> Result<usize, GateError> {
        self.reserve_one()?;
        let index = self.len;
        debug_assert!(self.data[index].is_none());
        self.data[index] = Some(value);
        self.len += 1;
        Ok(index)
    }

    /// Removes the element at `index` of a dense collection by moving the
    /// last element into its place.
    ///
    /// If an element was moved, it can afterwards be found at `index` and
    /// whatever refers to it by position has to be repointed by the caller.
    /// Does not shrink, see [`LinkVec::shrink`].
    pub fn swap_remove(&mut self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }
        let last = self.len - 1;
        self.data.swap(index, last);
        self.len -= 1;
        self.data[last].take()
    }

    /// Halves the capacity if at most a quarter of it is in use.
    pub fn shrink(&mut self) {
        let capacity = self.capacity();
        let target = max(capacity / 2, self.min_capacity);
        if self.len <= capacity / 4 && target < capacity && target >= self.len {
            // Only dense collections shrink, so the dropped tail is empty.
            debug_assert!(self.data[target..].iter().all(Option::is_none));
            self.data.truncate(target);
            self.data.shrink_to_fit();
        }
    }

    /// Iterates over the occupied positions and their contents.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (usize, &T)> {
        self.data
            .iter()
            .enumerate()
            .filter_map(|(index, value)| value.as_ref().map(|value| (index, value)))
    }

    fn resize(&mut self, capacity: usize) -> Result<(), GateError> {
        self.data
            .try_reserve_exact(capacity.saturating_sub(self.data.len()))?;
        self.data.resize_with(capacity, || None);
        Ok(())
    }
}
