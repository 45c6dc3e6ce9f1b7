//! Generational slot arena.
//!
//! The clock rings keep their nodes here and link them by [`SlotId`]. Each
//! entry remembers the handle of its ring node in an atomic, so a handle can
//! outlive the node it named: an eviction may free the node while another
//! thread still holds the old handle. Every slot therefore carries a
//! generation that is bumped when the slot is freed, and a handle only
//! resolves while its generation matches. A stale handle yields `None`
//! instead of aliasing whichever node reused the slot.
//!
//! ```text
//!   slots:  [ gen 0: A ] [ gen 3: · ] [ gen 1: C ]      free: [1]
//!
//!   SlotId { index: 1, generation: 2 }  → None (slot freed since)
//!   insert(D)                           → SlotId { index: 1, generation: 3 }
//! ```
//!
//! Handles pack into a `u64` (index in the low half, generation in the high
//! half) so an entry can hold one in an `AtomicU64`.

/// Generation-checked handle to a value inside a [`SlotArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId {
    index: u32,
    generation: u32,
}

impl SlotId {
    /// Packed form that never equals `u64::MAX`.
    pub(crate) fn to_bits(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    pub(crate) fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }

    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slots with per-slot generations plus a free list of vacant indices.
#[derive(Debug)]
pub struct SlotArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> SlotArena<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn insert(&mut self, value: T) -> SlotId {
        self.insert_with(|_| value)
    }

    /// Stores the value built by `make`, which receives the handle the value
    /// will live under. Rings use this to link a first node to itself.
    pub fn insert_with(&mut self, make: impl FnOnce(SlotId) -> T) -> SlotId {
        let id = match self.free.pop() {
            Some(index) => SlotId {
                index,
                generation: self.slots[index as usize].generation,
            },
            None => {
                let index = u32::try_from(self.slots.len())
                    .ok()
                    .filter(|&index| index < u32::MAX)
                    .unwrap_or_else(|| panic!("slot arena exceeded {} slots", u32::MAX));
                self.slots.push(Slot {
                    generation: 0,
                    value: None,
                });
                SlotId {
                    index,
                    generation: 0,
                }
            },
        };
        self.slots[id.index()].value = Some(make(id));
        self.len += 1;
        id
    }

    /// Frees the slot and returns its value; `None` for a stale handle.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Frees every slot. Generations survive, so handles issued before the
    /// clear stay stale.
    pub fn clear(&mut self) {
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate().rev() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            self.free.push(index as u32);
        }
        self.len = 0;
    }

    /// Occupied slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                let id = SlotId {
                    index: index as u32,
                    generation: slot.generation,
                };
                (id, value)
            })
        })
    }
}

impl<T> Default for SlotArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reused_slot_rejects_old_handle() {
        let mut arena = SlotArena::new();
        let old = arena.insert("evicted");
        assert_eq!(arena.remove(old), Some("evicted"));

        let new = arena.insert("admitted");
        assert_eq!(new.index(), old.index());
        assert_ne!(new.generation(), old.generation());
        assert_eq!(arena.get(old), None);
        assert_eq!(arena.remove(old), None);
        assert_eq!(arena.get(new), Some(&"admitted"));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn insert_with_sees_its_own_handle() {
        let mut arena = SlotArena::new();
        let id = arena.insert_with(|id| id);
        assert_eq!(arena.get(id), Some(&id));
    }

    #[test]
    fn clear_invalidates_every_handle() {
        let mut arena = SlotArena::with_capacity(4);
        let ids: Vec<_> = (0..3).map(|v| arena.insert(v)).collect();
        arena.clear();
        assert!(arena.is_empty());
        assert_eq!(arena.iter().count(), 0);
        assert!(ids.iter().all(|&id| !arena.contains(id)));

        // Slots are reused lowest index first after a clear.
        let again = arena.insert(9);
        assert_eq!(again.index(), 0);
        assert!(!ids.contains(&again));
    }

    #[test]
    fn handles_round_trip_through_bits() {
        let mut arena = SlotArena::new();
        let a = arena.insert(1);
        arena.remove(a);
        let b = arena.insert(2);
        assert_eq!(SlotId::from_bits(b.to_bits()), b);
        assert_ne!(b.to_bits(), u64::MAX);
        assert_ne!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn iter_reports_current_generation() {
        let mut arena = SlotArena::new();
        let a = arena.insert('a');
        let _b = arena.insert('b');
        arena.remove(a);
        let c = arena.insert('c');
        let listed: Vec<_> = arena.iter().map(|(id, v)| (id, *v)).collect();
        assert_eq!(listed[0], (c, 'c'));
        assert_eq!(listed.len(), 2);
    }
}
