//! Min-priority crawl frontier.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// A URL waiting to be crawled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlQueueItem {
    pub url: String,
    pub priority: i64,
}

/// Priority queue of URLs, lowest priority first.
///
/// Equal priorities come out in the order they were pushed.
#[derive(Debug, Default)]
pub struct CrawlQueue {
    heap: BinaryHeap<Reverse<(i64, u64, String)>>,
    next_seq: u64,
}

impl CrawlQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, url: impl Into<String>, priority: i64) {
        self.heap.push(Reverse((priority, self.next_seq, url.into())));
        self.next_seq += 1;
    }

    pub fn pop(&mut self) -> Option<CrawlQueueItem> {
        self.heap
            .pop()
            .map(|Reverse((priority, _, url))| CrawlQueueItem { url, priority })
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Queued URLs in the order they would be dequeued.
    #[must_use]
    pub fn pending(&self) -> Vec<String> {
        let mut entries: Vec<_> = self.heap.iter().map(|Reverse(entry)| entry).collect();
        entries.sort();
        entries.into_iter().map(|(_, _, url)| url.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowest_priority_first() {
        let mut queue = CrawlQueue::new();
        queue.push("https://a.com/archive", 2);
        queue.push("https://a.com/report", 0);
        queue.push("https://a.com", -1);
        queue.push("https://a.com/more", 1);

        let order: Vec<i64> = std::iter::from_fn(|| queue.pop()).map(|i| i.priority).collect();
        assert_eq!(order, vec![-1, 0, 1, 2]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut queue = CrawlQueue::new();
        queue.push("https://a.com/z", 0);
        queue.push("https://a.com/a", 0);
        queue.push("https://a.com/m", 0);

        assert_eq!(
            queue.pending(),
            vec!["https://a.com/z", "https://a.com/a", "https://a.com/m"]
        );
        assert_eq!(queue.pop().map(|i| i.url).as_deref(), Some("https://a.com/z"));
        assert_eq!(queue.len(), 2);
    }
}
