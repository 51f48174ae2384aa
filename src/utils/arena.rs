//! Typed index arenas.
//!
//! Every IR node of one compilation lives in an [`Arena`] and is addressed by
//! a small `Copy` id. Nodes are never freed individually; the arena (and with
//! it the whole IR) is dropped at once when the compilation ends, so ids can
//! never dangle within a compilation.

use std::{
    fmt,
    marker::PhantomData,
    ops::{Index, IndexMut},
};

/// A strongly typed index into an [`Arena`].
pub trait ArenaId: Copy + Eq {
    /// Wraps a raw arena position.
    fn from_index(index: usize) -> Self;

    /// Returns the raw arena position.
    fn index(self) -> usize;
}

/// Declares a newtype id implementing [`ArenaId`] with a prefixed `Display`.
macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            /// Creates an id from a raw index.
            #[must_use]
            #[inline]
            pub const fn new(index: usize) -> Self {
                Self(index as u32)
            }

            /// Returns the raw index.
            #[must_use]
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl $crate::utils::ArenaId for $name {
            fn from_index(index: usize) -> Self {
                Self::new(index)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

pub(crate) use arena_id;

/// Append-only storage addressed by `I`.
pub struct Arena<I, T> {
    items: Vec<T>,
    _id: PhantomData<I>,
}

impl<I: ArenaId, T> Arena<I, T> {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            _id: PhantomData,
        }
    }

    /// Stores `item` and returns its id.
    pub fn alloc(&mut self, item: T) -> I {
        let id = I::from_index(self.items.len());
        self.items.push(item);
        id
    }

    /// Returns the id the next [`alloc`](Self::alloc) will hand out.
    #[must_use]
    pub fn next_id(&self) -> I {
        I::from_index(self.items.len())
    }

    /// Number of allocated items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing has been allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the item for `id`, if it exists.
    #[must_use]
    pub fn get(&self, id: I) -> Option<&T> {
        self.items.get(id.index())
    }

    /// Iterates over all items with their ids, in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> + '_ {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (I::from_index(i), item))
    }

    /// Iterates over all ids, in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = I> + '_ {
        (0..self.items.len()).map(I::from_index)
    }

    /// Mutable iteration over all items.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.items.iter_mut()
    }

    /// Drops every item, invalidating all ids handed out so far.
    pub fn reset(&mut self) {
        self.items.clear();
    }
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T: Clone> Clone for Arena<I, T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            _id: PhantomData,
        }
    }
}

impl<I: ArenaId, T: fmt::Debug> fmt::Debug for Arena<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.items).finish()
    }
}

impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        &self.items[id.index()]
    }
}

impl<I: ArenaId, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        &mut self.items[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    arena_id!(
        /// Test id.
        NodeId,
        "n"
    );

    #[test]
    fn test_alloc_hands_out_dense_ids() {
        let mut arena: Arena<NodeId, &str> = Arena::new();
        assert_eq!(arena.next_id(), NodeId::new(0));
        let a = arena.alloc("a");
        let b = arena.alloc("b");

        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(arena[b], "b");
        assert_eq!(arena.len(), 2);
        assert_eq!(format!("{b}"), "n1");

        arena[a] = "z";
        let all: Vec<_> = arena.iter().map(|(id, s)| (id.index(), *s)).collect();
        assert_eq!(all, vec![(0, "z"), (1, "b")]);
    }

    #[test]
    fn test_reset_releases_everything() {
        let mut arena: Arena<NodeId, u32> = Arena::new();
        let id = arena.alloc(7);
        arena.reset();
        assert!(arena.is_empty());
        assert!(arena.get(id).is_none());
    }
}
