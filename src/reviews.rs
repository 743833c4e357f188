use anyhow::Context as _;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::BackupError;
use crate::formats::ReviewRecord;
use crate::http::{Endpoints, Transport, fetch_ok};
use crate::xml::{self, Element};

pub const DEFAULT_PAGE_SIZE: u32 = 200;

// API dates look like `Mon Oct 24 12:26:31 -0700 2016`.
const API_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

type Convert = fn(&Element, &mut ReviewRecord) -> anyhow::Result<()>;

static REVIEW_FIELDS: &[(&str, Convert)] = &[
    ("read_at", |e, r| {
        r.date_read = convert_date(e)?;
        Ok(())
    }),
    ("date_added", |e, r| {
        r.date_added = convert_date(e)?;
        Ok(())
    }),
    ("body", |e, r| {
        r.review = convert_body(e);
        Ok(())
    }),
    ("rating", |e, r| {
        r.my_rating = convert_rating(e)?;
        Ok(())
    }),
    ("shelves", |e, r| {
        r.bookshelves = convert_shelves(e)?;
        Ok(())
    }),
];

static BOOK_FIELDS: &[(&str, Convert)] = &[
    ("authors", |e, r| {
        r.authors = convert_authors(e)?;
        Ok(())
    }),
    ("id", |e, r| {
        r.book_id = identity(e);
        Ok(())
    }),
    ("title", |e, r| {
        r.title = identity(e);
        Ok(())
    }),
    ("isbn", |e, r| {
        r.isbn = identity(e);
        Ok(())
    }),
    ("isbn13", |e, r| {
        r.isbn13 = identity(e);
        Ok(())
    }),
    ("average_rating", |e, r| {
        r.average_rating = identity(e);
        Ok(())
    }),
    ("publisher", |e, r| {
        r.publisher = identity(e);
        Ok(())
    }),
    ("format", |e, r| {
        r.binding = identity(e);
        Ok(())
    }),
    ("num_pages", |e, r| {
        r.page_count = convert_page_count(e);
        Ok(())
    }),
    ("publication_year", |e, r| {
        r.publication_year = identity(e);
        Ok(())
    }),
    ("published", |e, r| {
        r.orig_year_published = identity(e);
        Ok(())
    }),
];

/// Lazily walks the 1-indexed review list, one API request per page, until `end` reaches
/// `total`.
pub struct ReviewPages<'a, T: Transport> {
    transport: &'a T,
    endpoints: &'a Endpoints,
    user_id: &'a str,
    api_key: &'a str,
    page_size: u32,
    max_pages: u32,
    next_page: u32,
    yielded: usize,
    declared_total: u64,
    buffered: std::vec::IntoIter<Element>,
    done: bool,
}

impl<'a, T: Transport> ReviewPages<'a, T> {
    pub fn new(
        transport: &'a T,
        endpoints: &'a Endpoints,
        user_id: &'a str,
        api_key: &'a str,
        page_size: u32,
        max_pages: u32,
    ) -> Self {
        Self {
            transport,
            endpoints,
            user_id,
            api_key,
            page_size,
            max_pages,
            next_page: 1,
            yielded: 0,
            declared_total: 0,
            buffered: Vec::new().into_iter(),
            done: false,
        }
    }

    fn fetch_next_page(&mut self) -> anyhow::Result<()> {
        let page = self.next_page;
        if page > self.max_pages {
            return Err(BackupError::PageLimit {
                pages: self.max_pages,
                collected: self.yielded,
                declared: self.declared_total,
            }
            .into());
        }

        let url = self
            .endpoints
            .review_list(self.user_id, self.api_key, page, self.page_size)?;
        let body = fetch_ok(self.transport, &url)
            .with_context(|| format!("fetch review page {page}"))?;
        let document =
            xml::parse_document(&body).with_context(|| format!("parse review page {page}"))?;
        let (items, end, total) = split_review_page(document)?;

        tracing::info!(page, items = items.len(), end, total, "fetched review page");

        self.declared_total = total;
        self.done = end >= total;
        self.next_page += 1;
        self.buffered = items.into_iter();
        Ok(())
    }
}

impl<T: Transport> Iterator for ReviewPages<'_, T> {
    type Item = anyhow::Result<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffered.next() {
                self.yielded += 1;
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }
            if let Err(err) = self.fetch_next_page() {
                self.done = true;
                return Some(Err(err));
            }
        }
    }
}

fn split_review_page(document: Element) -> anyhow::Result<(Vec<Element>, u64, u64)> {
    let reviews = document
        .find("reviews")
        .ok_or_else(|| BackupError::structure("reviews", "response has no <reviews> element"))?;
    let end = count_attr(reviews, "end")?;
    let total = count_attr(reviews, "total")?;
    Ok((reviews.children().to_vec(), end, total))
}

fn count_attr(reviews: &Element, name: &'static str) -> anyhow::Result<u64> {
    let raw = reviews
        .attr(name)
        .ok_or_else(|| BackupError::structure(format!("reviews@{name}"), "attribute missing"))?;
    let value = raw.trim().parse().map_err(|_| {
        BackupError::structure(format!("reviews@{name}"), format!("not a number: {raw:?}"))
    })?;
    Ok(value)
}

pub fn fetch_reviews(
    transport: &impl Transport,
    endpoints: &Endpoints,
    user_id: &str,
    api_key: &str,
    page_size: u32,
    max_pages: u32,
) -> anyhow::Result<Vec<ReviewRecord>> {
    ReviewPages::new(transport, endpoints, user_id, api_key, page_size, max_pages)
        .map(|item| item.and_then(|review| convert_review(&review)))
        .collect()
}

/// Projects one `<review>` element onto a record. Tags outside the field tables are ignored.
pub fn convert_review(review: &Element) -> anyhow::Result<ReviewRecord> {
    let mut record = ReviewRecord::default();
    for child in review.children() {
        if child.name == "book" {
            for book_child in child.children() {
                apply(BOOK_FIELDS, book_child, &mut record)?;
            }
        } else {
            apply(REVIEW_FIELDS, child, &mut record)?;
        }
    }
    Ok(record)
}

fn apply(
    fields: &[(&str, Convert)],
    element: &Element,
    record: &mut ReviewRecord,
) -> anyhow::Result<()> {
    match fields.iter().find(|(tag, _)| *tag == element.name) {
        Some((_, convert)) => convert(element, record),
        None => Ok(()),
    }
}

fn identity(element: &Element) -> Option<String> {
    element.non_empty_text().map(str::to_owned)
}

pub fn convert_date(element: &Element) -> anyhow::Result<Option<String>> {
    let Some(raw) = element.non_empty_text() else {
        return Ok(None);
    };
    let parsed = DateTime::parse_from_str(raw, API_DATE_FORMAT).map_err(|err| {
        BackupError::structure(element.name.clone(), format!("bad date {raw:?}: {err}"))
    })?;
    Ok(Some(
        parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true),
    ))
}

// `0` means not rated.
pub fn convert_rating(element: &Element) -> anyhow::Result<Option<u8>> {
    match element.non_empty_text() {
        None | Some("0") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            anyhow::Error::from(BackupError::structure(
                element.name.clone(),
                format!("bad rating {raw:?}"),
            ))
        }),
    }
}

pub fn convert_authors(element: &Element) -> anyhow::Result<Vec<String>> {
    element
        .find_all("author")
        .map(|author| {
            author
                .find("name")
                .and_then(Element::non_empty_text)
                .map(str::to_owned)
                .ok_or_else(|| {
                    anyhow::Error::from(BackupError::structure("authors/author/name", "missing"))
                })
        })
        .collect()
}

pub fn convert_shelves(element: &Element) -> anyhow::Result<Vec<String>> {
    element
        .find_all("shelf")
        .map(|shelf| {
            shelf
                .attr("name")
                .map(str::to_owned)
                .ok_or_else(|| {
                    anyhow::Error::from(BackupError::structure("shelves/shelf@name", "missing"))
                })
        })
        .collect()
}

pub fn convert_page_count(element: &Element) -> Option<u32> {
    element.non_empty_text()?.parse().ok()
}

fn convert_body(element: &Element) -> String {
    element.text().trim().to_owned()
}
