// ldapsynctool/src/sync/pagination.rs
use std::future::Future;

/// Page size used for every paginated Harbor listing.
pub const PAGE_SIZE: usize = 100;

/// A page shorter than `page_size` (including an empty one) is the last page.
pub fn is_last_page(len: usize, page_size: usize) -> bool {
    len < page_size
}

/// Requests pages 0, 1, 2, ... through `fetch` until a short page comes back,
/// returning every item in page order. The first error stops the walk.
pub async fn collect_pages<T, E, F, Fut>(page_size: usize, mut fetch: F) -> Result<Vec<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    let mut items = Vec::new();
    let mut page = 0;
    loop {
        let batch = fetch(page).await?;
        let last = is_last_page(batch.len(), page_size);
        items.extend(batch);
        if last {
            return Ok(items);
        }
        page += 1;
    }
}
