use std::{
    iter::{Flatten, Take},
    marker::PhantomData,
    mem,
    ptr::{self, NonNull},
    slice,
};

use crate::ecs::{
    component::Component,
    storage::{error::Error, sparse_set::Relocate},
};

/// Paged payload values, slot-aligned with the packed array of a sparse set.
///
/// Slot `i` holds `Some(value)` exactly when packed slot `i` holds a live entity. Pages are
/// allocated eagerly up to the highest slot ever assured, each with its final length, so a value
/// never moves because the column grew.
///
/// Zero-sized components have no pages at all: presence is encoded by the sparse set alone and
/// values are conjured from a dangling pointer, the same way `Vec` handles zero-sized elements.
pub struct Column<T: Component> {
    pages: Vec<Vec<Option<T>>>,
}

impl<T: Component> Column<T> {
    /// Zero-sized components have no payload pages.
    pub(crate) const PAGELESS: bool = mem::size_of::<T>() == 0;

    pub const fn new() -> Self {
        Self { pages: Vec::new() }
    }

    #[inline]
    fn indices(pos: usize) -> (usize, usize) {
        (pos / T::PAGE_SIZE, pos & (T::PAGE_SIZE - 1))
    }

    /// Number of slots backed by allocated pages.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.pages.len() * T::PAGE_SIZE
    }

    /// Number of allocated pages.
    #[inline]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Allocate every page up to and including the one holding `pos`.
    ///
    /// Either all missing pages are allocated or none are.
    pub fn try_assure(&mut self, pos: usize) -> Result<(), Error> {
        if Self::PAGELESS {
            return Ok(());
        }

        let (page, _) = Self::indices(pos);
        let len = self.pages.len();
        if page < len {
            return Ok(());
        }

        self.pages.try_reserve(page + 1 - len)?;
        for _ in len..=page {
            match Self::alloc_page() {
                Ok(allocated) => self.pages.push(allocated),
                Err(err) => {
                    self.pages.truncate(len);
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    fn alloc_page() -> Result<Vec<Option<T>>, Error> {
        let mut page = Vec::new();
        page.try_reserve_exact(T::PAGE_SIZE)?;
        page.resize_with(T::PAGE_SIZE, || None);
        Ok(page)
    }

    #[inline]
    fn slot(&self, pos: usize) -> &Option<T> {
        let (page, offset) = Self::indices(pos);
        &self.pages[page][offset]
    }

    #[inline]
    fn slot_mut(&mut self, pos: usize) -> &mut Option<T> {
        let (page, offset) = Self::indices(pos);
        &mut self.pages[page][offset]
    }

    /// A zero-sized value out of thin air.
    #[inline]
    fn conjure<'a>() -> &'a mut T {
        debug_assert!(Self::PAGELESS);
        // SAFETY: `T` is zero-sized, so a dangling, well-aligned pointer is valid for reads and
        // writes of it, and no two references to it can overlap any bytes.
        unsafe { NonNull::<T>::dangling().as_mut() }
    }

    /// Get the value at `pos`, if any. Always `Some` for zero-sized components.
    #[inline]
    pub fn get(&self, pos: usize) -> Option<&T> {
        if Self::PAGELESS {
            return Some(Self::conjure());
        }
        self.slot(pos).as_ref()
    }

    /// Get the value at an occupied slot.
    #[inline]
    pub(crate) fn value(&self, pos: usize) -> &T {
        match self.get(pos) {
            Some(value) => value,
            None => panic!("payload slot {pos} is vacant"),
        }
    }

    #[inline]
    pub fn get_mut(&mut self, pos: usize) -> Option<&mut T> {
        if Self::PAGELESS {
            return Some(Self::conjure());
        }
        self.slot_mut(pos).as_mut()
    }

    /// Write a value into a vacant slot whose page was assured.
    #[inline]
    pub fn write(&mut self, pos: usize, value: T) -> &mut T {
        if Self::PAGELESS {
            mem::forget(value);
            return Self::conjure();
        }
        let slot = self.slot_mut(pos);
        debug_assert!(slot.is_none(), "payload slot {pos} is occupied");
        slot.insert(value)
    }

    /// Move the value out of `pos`, leaving the slot vacant.
    #[inline]
    pub fn take(&mut self, pos: usize) -> Option<T> {
        if Self::PAGELESS {
            // SAFETY: zero-sized; this hands back the value forgotten by `write`.
            return Some(unsafe { ptr::read(NonNull::<T>::dangling().as_ptr()) });
        }
        self.slot_mut(pos).take()
    }

    /// Drop the value at `pos` where it lives, leaving the slot vacant.
    #[inline]
    pub fn drop_at(&mut self, pos: usize) {
        if Self::PAGELESS {
            drop(self.take(pos));
            return;
        }
        *self.slot_mut(pos) = None;
    }

    /// Drop every value and page. `live` is the number of live values, only needed to run the
    /// destructors of zero-sized components.
    pub fn clear(&mut self, live: usize) {
        if Self::PAGELESS && mem::needs_drop::<T>() {
            for _ in 0..live {
                self.drop_at(0);
            }
        }
        self.pages.clear();
    }

    /// Release pages past the one holding slot `len - 1`. Those pages must be vacant.
    pub fn shrink(&mut self, len: usize) {
        if Self::PAGELESS {
            return;
        }
        let keep = len.div_ceil(T::PAGE_SIZE);
        self.pages.truncate(keep);
        self.pages.shrink_to_fit();
    }

    /// Iterate the first `len` slots mutably.
    pub(crate) fn slots_mut(&mut self, len: usize) -> SlotsMut<'_, T> {
        if Self::PAGELESS {
            SlotsMut::Pageless(len, PhantomData)
        } else {
            SlotsMut::Paged(self.pages.iter_mut().flatten().take(len))
        }
    }
}

impl<T: Component> Default for Column<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> Relocate for Column<T> {
    fn relocate(&mut self, from: usize, to: usize) {
        assert!(!T::PINNED, "pinned components cannot be relocated");
        if Self::PAGELESS || from == to {
            return;
        }
        let moved = self.slot_mut(from).take();
        let displaced = mem::replace(self.slot_mut(to), moved);
        *self.slot_mut(from) = displaced;
    }
}

/// Mutable slot iterator returned by [`Column::slots_mut`].
pub(crate) enum SlotsMut<'a, T> {
    Paged(Take<Flatten<slice::IterMut<'a, Vec<Option<T>>>>>),
    Pageless(usize, PhantomData<&'a mut T>),
}

impl<'a, T: Component> Iterator for SlotsMut<'a, T> {
    type Item = Option<&'a mut T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            SlotsMut::Paged(slots) => slots.next().map(Option::as_mut),
            SlotsMut::Pageless(remaining, _) => {
                if *remaining == 0 {
                    return None;
                }
                *remaining -= 1;
                Some(Some(Column::<T>::conjure()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Small(u32);

    impl Component for Small {
        const PAGE_SIZE: usize = 4;
    }

    struct Tag;

    impl Component for Tag {}

    #[test]
    fn assure_allocates_pages_in_order() {
        // Given
        let mut column = Column::<Small>::new();

        // When
        column.try_assure(9).unwrap();

        // Then
        assert_eq!(column.page_count(), 3);
        assert_eq!(column.capacity(), 12);

        // When - already covered
        column.try_assure(2).unwrap();

        // Then
        assert_eq!(column.page_count(), 3);
    }

    #[test]
    fn write_take_and_relocate() {
        // Given
        let mut column = Column::<Small>::new();
        column.try_assure(7).unwrap();
        column.write(1, Small(1));
        column.write(6, Small(6));

        // When - move into a vacant slot across pages
        column.relocate(6, 2);

        // Then
        assert_eq!(column.get(2), Some(&Small(6)));
        assert_eq!(column.get(6), None);

        // When - swap two occupied slots
        column.relocate(1, 2);

        // Then
        assert_eq!(column.get(1), Some(&Small(6)));
        assert_eq!(column.get(2), Some(&Small(1)));
        assert_eq!(column.take(2), Some(Small(1)));
        assert_eq!(column.get(2), None);
    }

    #[test]
    fn values_do_not_move_on_growth() {
        // Given
        let mut column = Column::<Small>::new();
        column.try_assure(0).unwrap();
        let before: *const Small = column.write(0, Small(0));

        // When
        column.try_assure(4096).unwrap();

        // Then
        let after: *const Small = column.get(0).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn shrink_releases_trailing_pages() {
        // Given
        let mut column = Column::<Small>::new();
        column.try_assure(15).unwrap();
        column.write(4, Small(4));

        // When
        column.shrink(5);

        // Then
        assert_eq!(column.page_count(), 2);
        assert_eq!(column.get(4), Some(&Small(4)));
    }

    #[test]
    fn zero_sized_has_no_pages() {
        // Given
        let mut column = Column::<Tag>::new();

        // When
        column.try_assure(100).unwrap();
        column.write(100, Tag);

        // Then
        assert_eq!(column.page_count(), 0);
        assert!(column.get(100).is_some());
        assert_eq!(column.slots_mut(3).count(), 3);
    }

    #[test]
    fn slots_mut_walks_pages() {
        // Given
        let mut column = Column::<Small>::new();
        column.try_assure(5).unwrap();
        column.write(0, Small(0));
        column.write(5, Small(5));

        // When
        for value in column.slots_mut(6).flatten() {
            value.0 += 10;
        }

        // Then
        assert_eq!(column.get(0), Some(&Small(10)));
        assert_eq!(column.get(5), Some(&Small(15)));
    }

    #[test]
    #[should_panic(expected = "pinned components cannot be relocated")]
    fn pinned_relocation_panics() {
        struct Node(u8);
        impl Component for Node {
            const PINNED: bool = true;
        }

        let mut column = Column::<Node>::new();
        column.try_assure(1).unwrap();
        column.write(0, Node(0));
        column.relocate(0, 1);
    }
}
