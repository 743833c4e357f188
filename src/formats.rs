use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub book_id: Option<String>,
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub isbn: Option<String>,
    pub isbn13: Option<String>,
    pub average_rating: Option<String>,
    pub publisher: Option<String>,
    pub binding: Option<String>,
    pub page_count: Option<u32>,
    pub publication_year: Option<String>,
    pub orig_year_published: Option<String>,
    pub my_rating: Option<u8>,
    pub review: String,
    /// ISO-8601 UTC.
    pub date_added: Option<String>,
    /// ISO-8601 UTC.
    pub date_read: Option<String>,
    pub bookshelves: Vec<String>,
}

impl ReviewRecord {
    /// A record with neither a rating nor a written review.
    pub fn is_empty(&self) -> bool {
        self.my_rating.is_none() && self.review.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub id: String,
    /// Inner HTML of the status body; line breaks are kept as-is.
    pub text: String,
    /// Local time as shown on the page; no timezone is attached.
    pub date: NaiveDateTime,
    pub book_title: String,
    pub book_id: String,
    pub percentage: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_no: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
}
