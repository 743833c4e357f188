use std::collections::BTreeMap;

use crate::formats::ReviewRecord;

/// Shelf name → the records on that shelf, in review fetch order.
pub type ShelfMap<'a> = BTreeMap<String, Vec<&'a ReviewRecord>>;

/// Files every record under each shelf it belongs to. Records on several shelves appear
/// once per shelf.
pub fn group_by_shelf(reviews: &[ReviewRecord]) -> ShelfMap<'_> {
    let mut shelves = ShelfMap::new();
    for review in reviews {
        for shelf in &review.bookshelves {
            shelves.entry(shelf.clone()).or_default().push(review);
        }
    }
    shelves
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(id: &str, shelves: &[&str]) -> ReviewRecord {
        ReviewRecord {
            book_id: Some(id.to_owned()),
            bookshelves: shelves.iter().map(|s| (*s).to_owned()).collect(),
            ..ReviewRecord::default()
        }
    }

    #[test]
    fn record_is_filed_under_every_shelf() {
        let reviews = vec![
            review("1", &["read", "fiction"]),
            review("2", &["to-read"]),
            review("3", &["read"]),
        ];

        let shelves = group_by_shelf(&reviews);

        assert_eq!(shelves.len(), 3);
        let read: Vec<_> = shelves["read"].iter().map(|r| r.book_id.as_deref()).collect();
        assert_eq!(read, vec![Some("1"), Some("3")]);
        assert_eq!(shelves["fiction"].len(), 1);
        assert!(std::ptr::eq(shelves["read"][0], shelves["fiction"][0]));
        assert!(std::ptr::eq(shelves["read"][0], &reviews[0]));
    }

    #[test]
    fn records_without_shelves_are_skipped() {
        let reviews = vec![review("1", &[])];
        assert!(group_by_shelf(&reviews).is_empty());
    }
}
