use std::sync::LazyLock;

use regex::Regex;

static PROGRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"is (on page )?(\d+%?)(?: of (\d+))? (?:of|done with)")
        .expect("progress pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    pub page_no: u32,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressKind {
    Percent,
    Pages(PageProgress),
    Finished,
    /// Nothing recognisable; read as "currently reading".
    Unstated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub percentage: u8,
    pub kind: ProgressKind,
}

impl Progress {
    pub fn pages(&self) -> Option<PageProgress> {
        match self.kind {
            ProgressKind::Pages(pages) => Some(pages),
            _ => None,
        }
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self.kind, ProgressKind::Percent | ProgressKind::Pages(_))
    }
}

/// A percent value wins over page numbers. Sentences that match neither count as 100 when
/// they mention "finished", otherwise 0.
pub fn parse_progress(sentence: &str) -> Progress {
    if let Some(progress) = explicit_progress(sentence) {
        return progress;
    }
    if sentence.contains("finished") {
        Progress {
            percentage: 100,
            kind: ProgressKind::Finished,
        }
    } else {
        Progress {
            percentage: 0,
            kind: ProgressKind::Unstated,
        }
    }
}

fn explicit_progress(sentence: &str) -> Option<Progress> {
    let captures = PROGRESS_RE.captures(sentence)?;
    let value = captures.get(2)?.as_str();

    if let Some(percent) = value.strip_suffix('%') {
        let percent: u32 = percent.parse().ok()?;
        return Some(Progress {
            percentage: percent.min(100) as u8,
            kind: ProgressKind::Percent,
        });
    }

    let total_pages: u32 = captures.get(3)?.as_str().parse().ok()?;
    let page_no: u32 = value.parse().ok()?;
    let percentage = if total_pages == 0 {
        0
    } else {
        // Integer division floors; widen first so `page_no * 100` cannot overflow.
        (u64::from(page_no) * 100 / u64::from(total_pages)).min(100) as u8
    };

    Some(Progress {
        percentage,
        kind: ProgressKind::Pages(PageProgress {
            page_no,
            total_pages,
        }),
    })
}
