use std::fmt;

use thiserror::Error;

/// Stable index into a [`FixedList`].
///
/// Indices are never shifted by removals; a freed index is handed out again
/// by a later `push`/`emplace`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotIndex(u32);

impl SlotIndex {
    #[inline]
    pub const fn get(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
    #[error("double free of arena slot {0}")]
    DoubleFree(SlotIndex),

    #[error("arena slot {index} out of range (len {len})")]
    SlotOutOfRange { index: SlotIndex, len: usize },

    #[error("arena slot {0} is vacant")]
    VacantSlot(SlotIndex),
}

#[derive(Debug)]
enum Slot<T> {
    /// Free; its index sits on the free-list.
    Vacant,
    /// Handed out by `emplace`, value not written yet.
    Reserved,
    Occupied(T),
}

/// Slot arena with free-list recycling.
///
/// `Vacant` and `Reserved` are distinct states: a reserved slot is owned by
/// whoever called `emplace` and is never recycled until removed.
#[derive(Debug)]
pub struct FixedList<T> {
    slots: Vec<Slot<T>>,
    free: Vec<SlotIndex>,
    live: usize,
}

impl<T> Default for FixedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FixedList<T> {
    pub fn new() -> Self {
        Self { slots: Vec::new(), free: Vec::new(), live: 0 }
    }

    /// Number of occupied slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots ever allocated, vacant ones included.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn push(&mut self, value: T) -> SlotIndex {
        let index = self.allocate();
        self.slots[index.get()] = Slot::Occupied(value);
        self.live += 1;
        index
    }

    /// Reserves a slot to be filled later with [`FixedList::set`].
    pub fn emplace(&mut self) -> SlotIndex {
        let index = self.allocate();
        self.slots[index.get()] = Slot::Reserved;
        index
    }

    /// Writes `value` into a reserved or occupied slot, returning the
    /// previous value.
    pub fn set(&mut self, index: SlotIndex, value: T) -> Result<Option<T>, ArenaError> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index.get())
            .ok_or(ArenaError::SlotOutOfRange { index, len })?;
        match std::mem::replace(slot, Slot::Occupied(value)) {
            Slot::Occupied(prev) => Ok(Some(prev)),
            Slot::Reserved => {
                self.live += 1;
                Ok(None)
            }
            Slot::Vacant => {
                *slot = Slot::Vacant;
                Err(ArenaError::VacantSlot(index))
            }
        }
    }

    pub fn get(&self, index: SlotIndex) -> Option<&T> {
        match self.slots.get(index.get()) {
            Some(Slot::Occupied(v)) => Some(v),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, index: SlotIndex) -> Option<&mut T> {
        match self.slots.get_mut(index.get()) {
            Some(Slot::Occupied(v)) => Some(v),
            _ => None,
        }
    }

    /// Frees the slot. Returns the stored value, or `None` for a slot that
    /// was only reserved.
    pub fn remove(&mut self, index: SlotIndex) -> Result<Option<T>, ArenaError> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index.get())
            .ok_or(ArenaError::SlotOutOfRange { index, len })?;
        let value = match std::mem::replace(slot, Slot::Vacant) {
            Slot::Vacant => return Err(ArenaError::DoubleFree(index)),
            Slot::Reserved => None,
            Slot::Occupied(v) => {
                self.live -= 1;
                Some(v)
            }
        };
        self.free.push(index);
        Ok(value)
    }

    /// Occupied slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotIndex, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| match s {
            Slot::Occupied(v) => Some((SlotIndex(i as u32), v)),
            _ => None,
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotIndex, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(i, s)| match s {
            Slot::Occupied(v) => Some((SlotIndex(i as u32), v)),
            _ => None,
        })
    }

    pub fn find(&self, mut pred: impl FnMut(&T) -> bool) -> Option<SlotIndex> {
        self.iter().find(|(_, v)| pred(v)).map(|(i, _)| i)
    }

    fn allocate(&mut self) -> SlotIndex {
        if let Some(index) = self.free.pop() {
            return index;
        }
        let index = SlotIndex(self.slots.len() as u32);
        self.slots.push(Slot::Vacant);
        index
    }
}
