use log::debug;

use crate::ecs::{entity::Entity, storage::error::Error};

/// A paged sparse index mapping entity indices to dense slots.
///
/// The index space is divided into fixed-size pages, allocating memory only for pages that hold at
/// least one entry. Within a page, each entry is an [`Entity`] whose index field is the dense slot
/// and whose version field is the version on record for that entity index. [`Entity::NULL`] marks
/// an unassigned entry.
///
/// # Design Rationale
///
/// Entity indices typically exhibit these patterns:
/// - **Sequential allocation**: indices 0, 1, 2, 3... as identifiers are minted
/// - **Chunked reuse**: recycled identifiers come back in batches
/// - **Local density**: identifiers created together have neighbouring indices
///
/// Paging exploits this:
/// - **Lazy pages**: a page is only allocated for an index range that is actually used
/// - **Dense pages**: within a page, lookup is a single offset
/// - **Stable pages**: the page table may reallocate, but a page never moves once allocated
///
/// # Performance Characteristics
///
/// | Operation | Time | Memory |
/// |-----------|------|--------|
/// | `try_assure()` | O(1) amortized | Allocates a page on first use |
/// | `entry()` | O(1) | No allocation |
/// | `clear()` | O(pages) | Frees every page |
///
/// # Memory Usage
///
/// For `P` allocated pages of page size `S`: `P * S * size_of::<Entity>()` plus the page table
/// itself. Pages are only released by [`SparseIndex::clear`] or drop.
///
/// # Example
///
/// ```ignore
/// let mut index = SparseIndex::with_page_size(4096);
///
/// *index.try_assure(Entity::from(10_000))? = Entity::construct(0, 0);
///
/// assert_eq!(index.extent(), 3 * 4096);
/// assert_eq!(index.allocated_page_count(), 1);
/// ```
#[derive(Debug)]
pub struct SparseIndex {
    /// The number of entries per page. Always a power of two.
    page_size: usize,

    /// The page table. Outer Vec is indexed by `index / page_size`, inner Vec by
    /// `index % page_size`.
    pages: Vec<Option<Vec<Entity>>>,
}

impl SparseIndex {
    /// Default page size balances the memory of a sparse page against table indirection.
    pub const DEFAULT_PAGE_SIZE: usize = 4096;

    /// Create a new index with the default page size.
    #[inline]
    pub const fn new() -> Self {
        Self::with_page_size(Self::DEFAULT_PAGE_SIZE)
    }

    /// Create a new index with a custom page size.
    ///
    /// # Panics
    ///
    /// Debug builds panic if `page_size` is not a power of two.
    #[inline]
    pub const fn with_page_size(page_size: usize) -> Self {
        debug_assert!(page_size.is_power_of_two(), "page_size must be a power of two");
        Self {
            page_size,
            pages: Vec::new(),
        }
    }

    /// Calculate page and within-page offsets for an entity.
    #[inline]
    fn indices(&self, entity: Entity) -> (usize, usize) {
        let index = entity.slot();
        (index / self.page_size, index & (self.page_size - 1))
    }

    /// Get the number of entries per page.
    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Get the number of indices addressable without growing the page table.
    #[inline]
    pub fn extent(&self) -> usize {
        self.pages.len() * self.page_size
    }

    /// Get the length of the page table (including unallocated pages).
    #[inline]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Get the number of pages that have been allocated.
    pub fn allocated_page_count(&self) -> usize {
        self.pages.iter().filter(|page| page.is_some()).count()
    }

    /// Estimate memory usage in bytes.
    ///
    /// This is approximate and doesn't include Vec overhead or heap allocator metadata.
    pub fn memory_usage(&self) -> usize {
        let table = self.pages.capacity() * std::mem::size_of::<Option<Vec<Entity>>>();
        let pages: usize = self
            .pages
            .iter()
            .filter_map(|page| page.as_ref())
            .map(|page| page.capacity() * std::mem::size_of::<Entity>())
            .sum();
        table + pages
    }

    /// Get the entry for an entity's index, or `None` if its page was never allocated.
    ///
    /// The entry itself may be [`Entity::NULL`] when the index is not assigned.
    #[inline]
    pub fn entry(&self, entity: Entity) -> Option<&Entity> {
        let (page, offset) = self.indices(entity);
        self.pages.get(page)?.as_ref().map(|page| &page[offset])
    }

    /// Get a mutable entry for an entity's index, or `None` if its page was never allocated.
    #[inline]
    pub fn entry_mut(&mut self, entity: Entity) -> Option<&mut Entity> {
        let (page, offset) = self.indices(entity);
        self.pages.get_mut(page)?.as_mut().map(|page| &mut page[offset])
    }

    /// Get the entry for an entity's index, allocating its page first if needed.
    ///
    /// On allocation failure the page table is left exactly as it was before the call.
    pub fn try_assure(&mut self, entity: Entity) -> Result<&mut Entity, Error> {
        let (page, offset) = self.indices(entity);
        let len = self.pages.len();

        if page >= len {
            self.pages.try_reserve(page + 1 - len)?;
            self.pages.resize_with(page + 1, || None);
            debug!(
                "sparse index grew from {} to {} entries",
                len * self.page_size,
                self.extent()
            );
        }

        if self.pages[page].is_none() {
            match Self::alloc_page(self.page_size) {
                Ok(allocated) => self.pages[page] = Some(allocated),
                Err(err) => {
                    // Drops the table slots added above, if any.
                    self.pages.truncate(len);
                    return Err(err);
                }
            }
        }

        match &mut self.pages[page] {
            Some(allocated) => Ok(&mut allocated[offset]),
            None => unreachable!("page {page} was assured above"),
        }
    }

    /// Drop every page and the page table.
    pub fn clear(&mut self) {
        self.pages.clear();
        self.pages.shrink_to_fit();
    }

    fn alloc_page(page_size: usize) -> Result<Vec<Entity>, Error> {
        let mut page = Vec::new();
        page.try_reserve_exact(page_size)?;
        page.resize(page_size, Entity::NULL);
        Ok(page)
    }
}

impl Default for SparseIndex {
    /// Custom default to ensure we get the default page size.
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
