use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Serialize;

use crate::formats::{ReviewRecord, StatusRecord};
use crate::shelves::ShelfMap;

pub const REVIEWS_FILE: &str = "goodreads_reviews.json";
pub const STATUSES_FILE: &str = "goodreads_statuses.json";

pub const SHELF_COLUMNS: [&str; 8] = [
    "book_id",
    "title",
    "authors",
    "isbn",
    "isbn13",
    "my_rating",
    "date_added",
    "date_read",
];

/// Writes `goodreads_reviews.json`. Unless `keep_empty`, reviews with neither a rating nor a
/// body are left out.
pub fn write_reviews(
    reviews: &[ReviewRecord],
    out_dir: &Path,
    keep_empty: bool,
    no_clobber: bool,
) -> anyhow::Result<PathBuf> {
    let kept: Vec<&ReviewRecord> = reviews
        .iter()
        .filter(|review| keep_empty || !review.is_empty())
        .collect();
    let path = out_dir.join(REVIEWS_FILE);
    write_sorted_json(&path, &kept, no_clobber)?;
    tracing::info!(
        path = %path.display(),
        written = kept.len(),
        dropped = reviews.len() - kept.len(),
        "wrote reviews"
    );
    Ok(path)
}

pub fn write_statuses(
    statuses: &[StatusRecord],
    out_dir: &Path,
    no_clobber: bool,
) -> anyhow::Result<PathBuf> {
    let path = out_dir.join(STATUSES_FILE);
    write_sorted_json(&path, statuses, no_clobber)?;
    tracing::info!(path = %path.display(), written = statuses.len(), "wrote statuses");
    Ok(path)
}

/// Writes one `<shelf>.csv` per shelf.
pub fn write_shelves(
    shelves: &ShelfMap<'_>,
    out_dir: &Path,
    header: bool,
    no_clobber: bool,
) -> anyhow::Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(shelves.len());
    for (shelf, reviews) in shelves {
        let path = shelf_path(out_dir, shelf)?;
        let mut out = BufWriter::new(open_output(&path, no_clobber)?);

        if header {
            write_csv_row(&mut out, &SHELF_COLUMNS)
                .with_context(|| format!("write csv header: {}", path.display()))?;
        }
        for review in reviews {
            write_csv_row(&mut out, &shelf_row(review))
                .with_context(|| format!("write csv row: {}", path.display()))?;
        }
        out.flush()
            .with_context(|| format!("flush output: {}", path.display()))?;

        tracing::info!(path = %path.display(), %shelf, rows = reviews.len(), "wrote shelf");
        written.push(path);
    }
    Ok(written)
}

pub fn shelf_path(out_dir: &Path, shelf: &str) -> anyhow::Result<PathBuf> {
    ensure_plain_file_name(shelf)?;
    Ok(out_dir.join(format!("{shelf}.csv")))
}

/// Fails on the first path that already exists, before anything has been written.
pub fn ensure_absent<'a>(paths: impl IntoIterator<Item = &'a Path>) -> anyhow::Result<()> {
    for path in paths {
        if path.exists() {
            anyhow::bail!(
                "output already exists (drop --no-clobber to overwrite): {}",
                path.display()
            );
        }
    }
    Ok(())
}

fn shelf_row(review: &ReviewRecord) -> [String; 8] {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    [
        text(&review.book_id),
        text(&review.title),
        review.authors.join(", "),
        text(&review.isbn),
        text(&review.isbn13),
        review
            .my_rating
            .map(|rating| rating.to_string())
            .unwrap_or_default(),
        text(&review.date_added),
        text(&review.date_read),
    ]
}

fn write_sorted_json<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    no_clobber: bool,
) -> anyhow::Result<()> {
    // serde_json's default map is ordered by key, so a round trip through `Value` sorts
    // every object.
    let value = serde_json::to_value(value).context("serialize records")?;
    let mut out = BufWriter::new(open_output(path, no_clobber)?);
    serde_json::to_writer_pretty(&mut out, &value)
        .with_context(|| format!("write json: {}", path.display()))?;
    out.write_all(b"\n")
        .with_context(|| format!("write json: {}", path.display()))?;
    out.flush()
        .with_context(|| format!("flush output: {}", path.display()))?;
    Ok(())
}

fn open_output(path: &Path, no_clobber: bool) -> anyhow::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true);
    if no_clobber {
        options.create_new(true);
    } else {
        options.create(true).truncate(true);
    }
    options.open(path).with_context(|| {
        if no_clobber && path.exists() {
            format!(
                "output already exists (drop --no-clobber to overwrite): {}",
                path.display()
            )
        } else {
            format!("open output: {}", path.display())
        }
    })
}

fn ensure_plain_file_name(shelf: &str) -> anyhow::Result<()> {
    if shelf.is_empty() || shelf == "." || shelf == ".." || shelf.contains(['/', '\\']) {
        anyhow::bail!("shelf name cannot be used as a file name: {shelf:?}");
    }
    Ok(())
}

fn needs_quotes(field: &str) -> bool {
    field.contains([',', '"', '\n', '\r'])
}

fn write_csv_row<W, S>(out: &mut W, row: &[S]) -> std::io::Result<()>
where
    W: std::io::Write,
    S: AsRef<str>,
{
    for (index, field) in row.iter().enumerate() {
        if index > 0 {
            out.write_all(b",")?;
        }
        let field = field.as_ref();
        if needs_quotes(field) {
            write!(out, "\"{}\"", field.replace('"', "\"\""))?;
        } else {
            out.write_all(field.as_bytes())?;
        }
    }
    out.write_all(b"\r\n")
}
