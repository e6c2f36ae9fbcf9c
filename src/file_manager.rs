//! File Manager (C4): the row-level API built on the buffer pool (C3) and
//! page manager (C2), mediated by the catalog's per-table page list (C5).
//!
//! Functions here take `&mut BufferPool` as a plain parameter rather than
//! storing the borrow in a long-lived struct: the executor (C10) may need
//! two independent scans alive at once (a join's left and right side), and
//! threading the pool through each call, rather than capturing it, is what
//! lets both scans share the one buffer pool without aliasing it.
//!
//! Per §5's shared-resource policy, a scan holds at most one pinned page
//! at a time: it unpins the current page before pinning the next one.

use crate::buffer_pool::BufferPool;
use crate::catalog::Catalog;
use crate::error::Result;
use crate::page::{decode_row, encode_row, InsertOutcome, OverwriteOutcome};
use crate::value::Value;

/// Append a row, finding a page with enough free space or allocating a new
/// one. Returns its `(page_id, slot)` address.
pub fn append(
    pool: &mut BufferPool,
    catalog: &mut Catalog,
    table: &str,
    row: &[Value],
) -> Result<(u64, u16)> {
    let bytes = encode_row(row);
    let page_ids: Vec<u64> = catalog.page_ids(table).to_vec();
    for page_id in page_ids {
        let frame = pool.fetch(table, page_id)?;
        let outcome = pool.page_mut(frame).insert_row(&bytes);
        match outcome {
            InsertOutcome::Inserted(slot) => {
                pool.unpin(frame, true);
                return Ok((page_id, slot));
            }
            InsertOutcome::NoSpace => {
                pool.unpin(frame, false);
            }
        }
    }
    // No existing page had room; allocate a fresh one.
    let frame = pool.allocate(table)?;
    let page_id = pool.page(frame).page_id();
    let outcome = pool.page_mut(frame).insert_row(&bytes);
    let slot = match outcome {
        InsertOutcome::Inserted(slot) => slot,
        InsertOutcome::NoSpace => {
            pool.unpin(frame, false);
            return Err(crate::error::DbError::runtime("row does not fit in an empty page"));
        }
    };
    pool.unpin(frame, true);
    catalog.add_page(table, page_id);
    Ok((page_id, slot))
}

/// Overwrite the row at `(page_id, slot)` if it still fits; otherwise
/// tombstone it and append the new row elsewhere.
pub fn update_in_place(
    pool: &mut BufferPool,
    catalog: &mut Catalog,
    table: &str,
    page_id: u64,
    slot: u16,
    new_row: &[Value],
) -> Result<()> {
    let bytes = encode_row(new_row);
    let frame = pool.fetch(table, page_id)?;
    let outcome = pool.page_mut(frame).overwrite_row(slot, &bytes);
    match outcome {
        OverwriteOutcome::Overwritten => {
            pool.unpin(frame, true);
            Ok(())
        }
        OverwriteOutcome::NoSpace => {
            pool.page_mut(frame).tombstone(slot);
            pool.unpin(frame, true);
            append(pool, catalog, table, new_row)?;
            Ok(())
        }
    }
}

pub fn delete(pool: &mut BufferPool, table: &str, page_id: u64, slot: u16) -> Result<()> {
    let frame = pool.fetch(table, page_id)?;
    pool.page_mut(frame).tombstone(slot);
    pool.unpin(frame, true);
    Ok(())
}

/// Pull-based cursor over a table's live rows, honoring the
/// one-pinned-page-at-a-time discipline. Holds no borrow of the pool
/// between calls to `advance`.
pub struct TableScan {
    table: String,
    page_ids: Vec<u64>,
    page_idx: usize,
    slot: u16,
    current_frame: Option<usize>,
}

impl TableScan {
    pub fn new(table: impl Into<String>, page_ids: Vec<u64>) -> Self {
        TableScan { table: table.into(), page_ids, page_idx: 0, slot: 0, current_frame: None }
    }

    fn release_current(&mut self, pool: &mut BufferPool) {
        if let Some(frame) = self.current_frame.take() {
            pool.unpin(frame, false);
        }
    }

    /// Advance to the next live row, returning `(page_id, slot, row)`.
    pub fn advance(&mut self, pool: &mut BufferPool) -> Result<Option<(u64, u16, Vec<Value>)>> {
        loop {
            if self.page_idx >= self.page_ids.len() {
                self.release_current(pool);
                return Ok(None);
            }
            let page_id = self.page_ids[self.page_idx];
            let frame = match self.current_frame {
                Some(f) => f,
                None => {
                    let f = pool.fetch(&self.table, page_id)?;
                    self.current_frame = Some(f);
                    f
                }
            };
            let page = pool.page(frame);
            let slot_count = page.slot_count();
            while self.slot < slot_count {
                let s = self.slot;
                self.slot += 1;
                if let Some(raw) = page.read_row(s) {
                    return Ok(Some((page_id, s, decode_row(raw))));
                }
            }
            // Exhausted this page: release it and move on.
            self.release_current(pool);
            self.page_idx += 1;
            self.slot = 0;
        }
    }

    /// Release any pinned page without finishing the scan (used when a
    /// consumer stops early, e.g. a join building its right-side cache).
    pub fn close(&mut self, pool: &mut BufferPool) {
        self.release_current(pool);
    }
}
