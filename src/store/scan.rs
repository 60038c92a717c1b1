use super::{KeyRange, Namespace, RawEntry, Store, StoreResult};
use futures::{StreamExt, stream::BoxStream};
use std::{collections::VecDeque, sync::Arc};

/// Cursor state for a paged range scan.
struct Cursor {
    store: Arc<dyn Store>,
    namespace: Namespace,
    range: KeyRange,
    remaining: Option<usize>,
    reverse: bool,
    page_size: usize,
    buffer: VecDeque<RawEntry>,
    exhausted: bool,
}

impl Cursor {
    fn fill(&mut self) -> StoreResult<()> {
        let want = self
            .remaining
            .map_or(self.page_size, |remaining| remaining.min(self.page_size));
        if want == 0 {
            self.exhausted = true;
            return Ok(());
        }

        let page = self
            .namespace
            .scan(self.store.as_ref(), &self.range, Some(want), self.reverse)?;
        if page.len() < want {
            self.exhausted = true;
        }
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= page.len();
        }
        // Resume strictly past the last key of this page.
        if let Some((last, _)) = page.last() {
            if self.reverse {
                self.range.lt = Some(last.clone());
                self.range.lte = None;
            } else {
                self.range.gt = Some(last.clone());
                self.range.gte = None;
            }
        }
        tracing::trace!("Scanned page of {} entries", page.len());
        self.buffer.extend(page);
        Ok(())
    }
}

/// Lazily scan `range` inside `namespace`, one page of `page_size` entries
/// per store round trip.
///
/// Keys are yielded relative to the namespace. Dropping the stream stops the
/// scan; nothing is read ahead beyond the current page.
pub fn scan_stream(
    store: Arc<dyn Store>,
    namespace: Namespace,
    range: KeyRange,
    limit: Option<usize>,
    reverse: bool,
    page_size: usize,
) -> BoxStream<'static, StoreResult<RawEntry>> {
    let cursor = Cursor {
        store,
        namespace,
        exhausted: range.is_empty(),
        range,
        remaining: limit,
        reverse,
        page_size: page_size.max(1),
        buffer: VecDeque::new(),
    };

    futures::stream::unfold(cursor, |mut cursor| async move {
        loop {
            if let Some(entry) = cursor.buffer.pop_front() {
                return Some((Ok(entry), cursor));
            }
            if cursor.exhausted {
                return None;
            }
            if let Err(e) = cursor.fill() {
                cursor.exhausted = true;
                return Some((Err(e), cursor));
            }
        }
    })
    .boxed()
}
