//! Offset pagination over CMS collection listings.

use serde::{Deserialize, Serialize};

/// Page size used for collection reads (the CMS maximum).
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Pagination block of a listing response. All three fields are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
    pub total: u32,
}

/// Drives a full read of a collection from offset 0.
///
/// The read ends once the number of items seen reaches the reported total, or
/// as soon as a page comes back empty, whichever happens first. The empty-page
/// rule keeps a total that drifts upward mid-read from looping forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    page_size: u32,
    offset: u32,
    done: bool,
}

impl PageCursor {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            offset: 0,
            done: false,
        }
    }

    /// `(limit, offset)` of the next page to request, or `None` when drained.
    pub fn next_page(&self) -> Option<(u32, u32)> {
        if self.done {
            None
        } else {
            Some((self.page_size, self.offset))
        }
    }

    /// Record a received page of `received` items with the reported `total`.
    pub fn advance(&mut self, received: usize, total: u32) {
        let received = u32::try_from(received).unwrap_or(u32::MAX);
        self.offset = self.offset.saturating_add(received);
        if received == 0 || self.offset >= total {
            self.done = true;
        }
    }

    /// Items read so far.
    pub fn read(&self) -> u32 {
        self.offset
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}
