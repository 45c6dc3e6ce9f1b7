//! Arena-backed cyclic ring with a clock hand.
//!
//! Nodes live in a [`SlotArena`] and are linked by [`SlotId`] in both
//! directions, so a node can be unlinked in O(1) from anywhere in the ring.
//! Handles are generation-checked: once a node is removed, its old handle
//! no longer resolves, even after the slot is reused.
//! New nodes are inserted directly *behind* the hand, which makes them the
//! last ones the hand reaches: a full sweep visits nodes in insertion order.
//!
//! ## Architecture
//!
//! ```text
//!   arena (SlotArena<Link<T>>)
//!
//!            hand
//!             │
//!             ▼
//!        ┌──► [A] ──► [B] ──► [C] ──► [D] ──┐
//!        │                                  │
//!        └──────────────────────────────────┘
//!
//!   insert(E)   → E is linked between D and A (visited last)
//!   advance()   → returns A, hand moves to B
//!   remove(B)   → B unlinked; a hand on B moves to C
//! ```
//!
//! ## Performance
//! - `insert` / `remove` / `advance`: O(1)
//! - `iter`: O(n), hand order
//!
//! `debug_validate_invariants()` is available in debug/test builds.
use crate::ds::slot_arena::{SlotArena, SlotId};

#[derive(Debug)]
struct Link<T> {
    value: T,
    prev: SlotId,
    next: SlotId,
}

/// Cyclic doubly linked ring addressed by [`SlotId`] with a single hand.
#[derive(Debug)]
pub struct ClockRing<T> {
    arena: SlotArena<Link<T>>,
    hand: Option<SlotId>,
}

impl<T> ClockRing<T> {
    /// Creates an empty ring.
    pub fn new() -> Self {
        Self {
            arena: SlotArena::new(),
            hand: None,
        }
    }

    /// Creates an empty ring with reserved node capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: SlotArena::with_capacity(capacity),
            hand: None,
        }
    }

    /// Number of nodes in the ring.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Node currently under the hand.
    pub fn hand(&self) -> Option<SlotId> {
        self.hand
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.arena.contains(id)
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.arena.get(id).map(|link| &link.value)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.arena.get_mut(id).map(|link| &mut link.value)
    }

    /// Links `value` directly behind the hand and returns its handle.
    pub fn insert(&mut self, value: T) -> SlotId {
        let Some(hand) = self.hand else {
            let id = self.arena.insert_with(|id| Link {
                value,
                prev: id,
                next: id,
            });
            self.hand = Some(id);
            return id;
        };

        let tail = match self.arena.get(hand) {
            Some(link) => link.prev,
            None => unreachable!("clock hand points at a vacant slot"),
        };
        let id = self.arena.insert(Link {
            value,
            prev: tail,
            next: hand,
        });
        if let Some(link) = self.arena.get_mut(tail) {
            link.next = id;
        }
        if let Some(link) = self.arena.get_mut(hand) {
            link.prev = id;
        }
        id
    }

    /// Unlinks the node and returns its value.
    ///
    /// If the hand rests on the removed node it moves on to the successor.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let link = self.arena.remove(id)?;
        if link.next == id {
            self.hand = None;
            return Some(link.value);
        }
        if let Some(prev) = self.arena.get_mut(link.prev) {
            prev.next = link.next;
        }
        if let Some(next) = self.arena.get_mut(link.next) {
            next.prev = link.prev;
        }
        if self.hand == Some(id) {
            self.hand = Some(link.next);
        }
        Some(link.value)
    }

    /// Returns the node under the hand and moves the hand one step forward.
    pub fn advance(&mut self) -> Option<SlotId> {
        let current = self.hand?;
        let next = self.arena.get(current).map(|link| link.next)?;
        self.hand = Some(next);
        Some(current)
    }

    /// Drops every node and parks the hand.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.hand = None;
    }

    /// Iterates nodes in hand order, starting at the hand.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            ring: self,
            next: self.hand,
            remaining: self.len(),
        }
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let Some(hand) = self.hand else {
            assert!(self.arena.is_empty());
            return;
        };
        assert!(self.arena.contains(hand));
        let mut seen = 0;
        let mut cursor = hand;
        loop {
            let link = self.arena.get(cursor).expect("ring link to vacant slot");
            let next = self.arena.get(link.next).expect("dangling next link");
            assert_eq!(next.prev, cursor);
            seen += 1;
            cursor = link.next;
            if cursor == hand {
                break;
            }
            assert!(seen <= self.arena.len(), "ring cycle longer than arena");
        }
        assert_eq!(seen, self.arena.len());
    }
}

impl<T> Default for ClockRing<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Hand-order iterator over a [`ClockRing`].
pub struct Iter<'a, T> {
    ring: &'a ClockRing<T>,
    next: Option<SlotId>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (SlotId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.next?;
        let link = self.ring.arena.get(id)?;
        self.remaining -= 1;
        self.next = Some(link.next);
        Some((id, &link.value))
    }
}
