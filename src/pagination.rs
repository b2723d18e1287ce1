use serde::Serialize;

use crate::error::StoreError;
use crate::predicate::Predicate;
use crate::storage::{Record, Transaction};

/// A validated page window: `page` is zero-based, `size` at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    size: u64,
}

impl PageRequest {
    /// Clamps a negative page to 0 and a non-positive size to 1.
    pub fn new(page: i64, size: i64) -> Self {
        PageRequest {
            page: page.max(0) as u64,
            size: size.max(1) as u64,
        }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn window(&self) -> Window {
        Window {
            skip: self.page.saturating_mul(self.size),
            limit: Some(self.size),
        }
    }
}

/// Rows to skip and the maximum number of rows to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub skip: u64,
    pub limit: Option<u64>,
}

impl Window {
    pub fn all() -> Self {
        Window {
            skip: 0,
            limit: None,
        }
    }

    pub fn first(limit: u64) -> Self {
        Window {
            skip: 0,
            limit: Some(limit),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    /// Identifier ascending, so pages stay stable between requests.
    Natural,
    /// `createdAt` descending, ties broken by identifier ascending.
    Recent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_items: u64,
    pub total_pages: u64,
    pub page: u64,
    pub size: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_items: u64, request: PageRequest) -> Self {
        Page {
            items,
            total_items,
            total_pages: total_items.div_ceil(request.size),
            page: request.page,
            size: request.size,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_items: self.total_items,
            total_pages: self.total_pages,
            page: self.page,
            size: self.size,
        }
    }
}

/// Runs `predicate` against storage and packages one page with its totals.
pub async fn execute_page<R, T>(
    tx: &mut T,
    predicate: &Predicate,
    request: PageRequest,
    sort: Sort,
) -> Result<Page<R>, StoreError>
where
    R: Record,
    T: Transaction,
{
    let total_items = tx.count::<R>(predicate).await?;
    let items = if request.window().skip >= total_items {
        Vec::new()
    } else {
        tx.find_window::<R>(predicate, sort, request.window()).await?
    };
    Ok(Page::new(items, total_items, request))
}

/// Newest published records first; an empty list for a zero limit.
pub async fn find_recent<R, T>(tx: &mut T, limit: usize) -> Result<Vec<R>, StoreError>
where
    R: Record,
    T: Transaction,
{
    if limit == 0 {
        return Ok(Vec::new());
    }
    tx.find_window::<R>(&Predicate::published(), Sort::Recent, Window::first(limit as u64))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_page_and_size() {
        let request = PageRequest::new(-3, 0);
        assert_eq!(request.page(), 0);
        assert_eq!(request.size(), 1);
        let request = PageRequest::new(2, -10);
        assert_eq!(request.page(), 2);
        assert_eq!(request.size(), 1);
    }

    #[test]
    fn window_offsets_by_page() {
        assert_eq!(
            PageRequest::new(3, 5).window(),
            Window {
                skip: 15,
                limit: Some(5)
            }
        );
        assert_eq!(PageRequest::new(i64::MAX, i64::MAX).window().skip, u64::MAX);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page: Page<u8> = Page::new(vec![], 11, PageRequest::new(0, 5));
        assert_eq!(page.total_pages, 3);
        let page: Page<u8> = Page::new(vec![], 10, PageRequest::new(0, 5));
        assert_eq!(page.total_pages, 2);
        let page: Page<u8> = Page::new(vec![], 0, PageRequest::new(4, 5));
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.page, 4);
    }

    #[test]
    fn map_keeps_metadata() {
        let page = Page::new(vec![1, 2], 7, PageRequest::new(1, 2)).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.total_items, 7);
        assert_eq!(page.total_pages, 4);
        assert_eq!(page.page, 1);
    }
}
