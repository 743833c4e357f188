use anyhow::Context as _;
use chrono::NaiveDateTime;
use scraper::{ElementRef, Html, Selector};

use crate::error::BackupError;
use crate::formats::StatusRecord;
use crate::http::{Endpoints, Transport, fetch_ok};
use crate::progress::parse_progress;

pub const FIRST_STATUS_PAGE: u32 = 0;

// "Showing 1-20 of 151"
const COUNT_HEADER_PREFIX: &str = "Showing ";

const STATUS_BLOCK: &str = "div.elementList";
const LEFT_BLOCK: &str = "div.left";
const STATUS_BODY: &str = "div.readable";
const PERMALINK: &str = "small a";
const STATUS_HEADER: &str = "div.bookMeta";
const BOOK_LINK: &str = r#"a[rel="nofollow"]"#;

// Oct 24, 2016 12:26PM, page-local time
const STATUS_DATE_FORMAT: &str = "%b %d, %Y %I:%M%p";

pub struct StatusPageLayout {
    block: Selector,
    left: Selector,
    body: Selector,
    permalink: Selector,
    header: Selector,
    book_link: Selector,
}

impl StatusPageLayout {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            block: selector(STATUS_BLOCK)?,
            left: selector(LEFT_BLOCK)?,
            body: selector(STATUS_BODY)?,
            permalink: selector(PERMALINK)?,
            header: selector(STATUS_HEADER)?,
            book_link: selector(BOOK_LINK)?,
        })
    }

    pub fn declared_total(&self, document: &Html) -> anyhow::Result<u64> {
        let line = document
            .root_element()
            .text()
            .map(str::trim)
            .find(|text| text.starts_with(COUNT_HEADER_PREFIX))
            .ok_or_else(|| BackupError::structure("status count", "no \"Showing ... of N\" line"))?;

        let total: u64 = line
            .split_whitespace()
            .last()
            .map(|token| token.replace(',', ""))
            .and_then(|token| token.parse().ok())
            .ok_or_else(|| {
                BackupError::structure("status count", format!("no total in {line:?}"))
            })?;
        Ok(total)
    }

    pub fn status_blocks<'a>(&'a self, document: &'a Html) -> impl Iterator<Item = ElementRef<'a>> {
        document.select(&self.block)
    }

    pub fn parse_status(&self, block: ElementRef<'_>) -> anyhow::Result<StatusRecord> {
        let left = first(block, &self.left, "left")?;

        let text = first(left, &self.body, "body")?.inner_html().trim().to_owned();

        let permalink = first(left, &self.permalink, "permalink")?;
        let date_text = collapse_whitespace(permalink.text());
        let date = NaiveDateTime::parse_from_str(&date_text, STATUS_DATE_FORMAT).map_err(|err| {
            BackupError::structure("permalink", format!("bad date {date_text:?}: {err}"))
        })?;
        let id = last_path_segment(href(permalink, "permalink")?)
            .ok_or_else(|| BackupError::structure("permalink", "href has no status id"))?
            .to_owned();

        let header = first(left, &self.header, "header")?;
        let book_link = first(header, &self.book_link, "book link")?;
        let book_title = collapse_whitespace(book_link.text());
        let book_id = book_id_from_href(href(book_link, "book link")?)
            .ok_or_else(|| BackupError::structure("book link", "href has no book id"))?
            .to_owned();

        let sentence = collapse_whitespace(header.text());
        let progress = parse_progress(&sentence);
        if !progress.is_explicit() {
            tracing::debug!(%id, %sentence, percentage = progress.percentage, "no explicit progress");
        }
        let pages = progress.pages();

        Ok(StatusRecord {
            id,
            text,
            date,
            book_title,
            book_id,
            percentage: progress.percentage,
            page_no: pages.map(|p| p.page_no),
            total_pages: pages.map(|p| p.total_pages),
        })
    }
}

/// Walks the status list until as many records as the first page declared have been collected.
pub fn fetch_statuses(
    transport: &impl Transport,
    endpoints: &Endpoints,
    user_id: &str,
    max_pages: u32,
) -> anyhow::Result<Vec<StatusRecord>> {
    let layout = StatusPageLayout::new()?;
    let mut statuses: Vec<StatusRecord> = Vec::new();
    let mut declared_total: Option<u64> = None;
    let mut page = FIRST_STATUS_PAGE;
    let mut fetched = 0_u32;

    loop {
        if fetched >= max_pages {
            return Err(BackupError::PageLimit {
                pages: fetched,
                collected: statuses.len(),
                declared: declared_total.unwrap_or_default(),
            }
            .into());
        }

        let url = endpoints.status_list(user_id, page)?;
        let html = fetch_ok(transport, &url).with_context(|| format!("fetch status page {page}"))?;
        let document = Html::parse_document(&html);
        fetched += 1;

        let total = match declared_total {
            Some(total) => total,
            None => {
                let total = layout
                    .declared_total(&document)
                    .with_context(|| format!("read status count on page {page}"))?;
                declared_total = Some(total);
                total
            }
        };

        let before = statuses.len();
        for block in layout.status_blocks(&document) {
            let status = layout
                .parse_status(block)
                .with_context(|| format!("parse status {} on page {page}", statuses.len() + 1))?;
            statuses.push(status);
        }

        tracing::info!(
            page,
            items = statuses.len() - before,
            collected = statuses.len(),
            total,
            "fetched status page"
        );

        if statuses.len() as u64 >= total {
            break;
        }
        page += 1;
    }

    Ok(statuses)
}

fn selector(css: &str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|err| anyhow::anyhow!("parse selector {css:?}: {err}"))
}

fn first<'a>(
    parent: ElementRef<'a>,
    selector: &Selector,
    field: &'static str,
) -> anyhow::Result<ElementRef<'a>> {
    parent
        .select(selector)
        .next()
        .ok_or_else(|| BackupError::structure(field, "element not found").into())
}

fn href<'a>(link: ElementRef<'a>, field: &'static str) -> anyhow::Result<&'a str> {
    link.value()
        .attr("href")
        .ok_or_else(|| BackupError::structure(field, "link has no href").into())
}

fn collapse_whitespace<'a>(fragments: impl Iterator<Item = &'a str>) -> String {
    let joined: String = fragments.collect();
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn last_path_segment(href: &str) -> Option<&str> {
    let path = href.split(['?', '#']).next()?;
    let segment = path.trim_end_matches('/').rsplit('/').next()?;
    (!segment.is_empty()).then_some(segment)
}

// `/book/show/5907.The_Hobbit` -> `5907`
fn book_id_from_href(href: &str) -> Option<&str> {
    let id = last_path_segment(href)?.split(['.', '-']).next()?;
    (!id.is_empty()).then_some(id)
}
