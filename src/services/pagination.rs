//! Pagination bar computation
//!
//! The bar always shows the first and last page, the current page with
//! `siblings` neighbours on each side, and collapses skipped runs of two or
//! more pages into an ellipsis. Once the page count exceeds the bar width
//! (`2 * siblings + 5`) the bar has a constant width, so it does not jump
//! around while paging.

use crate::models::PageItem;

/// Number of pages needed for `total_items`. Zero items means zero pages.
pub fn total_pages(total_items: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = total_items.div_ceil(page_size as u64);
    pages.min(u32::MAX as u64) as u32
}

/// Build the pagination bar for `current` (clamped into range).
pub fn page_window(current: u32, total_pages: u32, siblings: u32) -> Vec<PageItem> {
    if total_pages == 0 {
        return Vec::new();
    }

    let current = current.clamp(1, total_pages);
    let slots = 2 * siblings + 5;

    let numbers: Vec<Option<u32>> = if total_pages <= slots {
        (1..=total_pages).map(Some).collect()
    } else {
        let start = current.saturating_sub(siblings).max(1);
        let end = current.saturating_add(siblings).min(total_pages);
        let edge = 3 + 2 * siblings;

        let collapse_left = start > 3;
        let collapse_right = end + 2 < total_pages;

        let mut numbers = Vec::with_capacity(slots as usize);
        match (collapse_left, collapse_right) {
            (false, true) => {
                numbers.extend((1..=edge).map(Some));
                numbers.push(None);
                numbers.push(Some(total_pages));
            }
            (true, false) => {
                numbers.push(Some(1));
                numbers.push(None);
                numbers.extend((total_pages - edge + 1..=total_pages).map(Some));
            }
            (true, true) => {
                numbers.push(Some(1));
                numbers.push(None);
                numbers.extend((start..=end).map(Some));
                numbers.push(None);
                numbers.push(Some(total_pages));
            }
            // Unreachable once total_pages > slots
            (false, false) => numbers.extend((1..=total_pages).map(Some)),
        }
        numbers
    };

    numbers
        .into_iter()
        .map(|n| match n {
            Some(number) => PageItem::Page {
                number,
                current: number == current,
            },
            None => PageItem::Ellipsis,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Render as e.g. "1 … 4 [5] 6 … 10"
    fn render(items: &[PageItem]) -> String {
        items
            .iter()
            .map(|item| match item {
                PageItem::Page { number, current: true } => format!("[{}]", number),
                PageItem::Page { number, .. } => number.to_string(),
                PageItem::Ellipsis => "…".to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(5, 0), 0);
    }

    #[test]
    fn test_small_counts_show_every_page() {
        assert_eq!(render(&page_window(1, 1, 1)), "[1]");
        assert_eq!(render(&page_window(3, 7, 1)), "1 2 [3] 4 5 6 7");
        assert!(page_window(1, 0, 1).is_empty());
    }

    #[test]
    fn test_window_positions() {
        assert_eq!(render(&page_window(1, 10, 1)), "[1] 2 3 4 5 … 10");
        assert_eq!(render(&page_window(4, 10, 1)), "1 2 3 [4] 5 … 10");
        assert_eq!(render(&page_window(5, 10, 1)), "1 … 4 [5] 6 … 10");
        assert_eq!(render(&page_window(7, 10, 1)), "1 … 6 [7] 8 9 10");
        assert_eq!(render(&page_window(10, 10, 1)), "1 … 6 7 8 9 [10]");
    }

    #[test]
    fn test_current_is_clamped() {
        assert_eq!(render(&page_window(99, 3, 1)), "1 2 [3]");
        assert_eq!(render(&page_window(0, 3, 1)), "[1] 2 3");
    }

    proptest! {
        #[test]
        fn window_invariants(total in 1u32..500, current in 0u32..600, siblings in 0u32..4) {
            let items = page_window(current, total, siblings);
            let slots = (2 * siblings + 5) as usize;
            let expected_current = current.clamp(1, total);

            prop_assert!(items.len() <= slots);
            if total as usize > slots {
                prop_assert_eq!(items.len(), slots);
            }

            let numbers: Vec<u32> = items.iter().filter_map(|i| match i {
                PageItem::Page { number, .. } => Some(*number),
                PageItem::Ellipsis => None,
            }).collect();
            prop_assert_eq!(numbers.first().copied(), Some(1));
            prop_assert_eq!(numbers.last().copied(), Some(total));
            prop_assert!(numbers.windows(2).all(|w| w[0] < w[1]));

            let currents: Vec<u32> = items.iter().filter_map(|i| match i {
                PageItem::Page { number, current: true } => Some(*number),
                _ => None,
            }).collect();
            prop_assert_eq!(currents, vec![expected_current]);

            // An ellipsis replaces at least two pages, never sits at either end
            for (idx, item) in items.iter().enumerate() {
                if *item == PageItem::Ellipsis {
                    prop_assert!(idx > 0 && idx + 1 < items.len());
                    let prev = match items[idx - 1] { PageItem::Page { number, .. } => number, _ => 0 };
                    let next = match items[idx + 1] { PageItem::Page { number, .. } => number, _ => 0 };
                    prop_assert!(prev > 0 && next > 0);
                    prop_assert!(next - prev >= 3);
                }
            }

            // Without an ellipsis the pages are contiguous
            if !items.contains(&PageItem::Ellipsis) {
                prop_assert_eq!(numbers.len() as u32, total);
            }
        }
    }
}
