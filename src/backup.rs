use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;

use crate::cli::{BackupArgs, Phase};
use crate::config::{self, Credentials, EnvCredentialStore};
use crate::http::{Endpoints, ReqwestTransport, Transport};
use crate::{reviews, shelves, statuses, writers};

pub fn run(args: BackupArgs) -> anyhow::Result<()> {
    let credentials = config::resolve_credentials(
        &EnvCredentialStore,
        args.user_id.as_deref(),
        args.api_key.as_ref(),
        args.needs_reviews(),
    )
    .context("resolve credentials")?;
    let endpoints = Endpoints::new(&args.base_url)?;
    let transport = ReqwestTransport::new(Duration::from_secs(args.timeout_secs))?;

    let written = run_with(&transport, &endpoints, &credentials, &args)?;
    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

/// Fetches everything the selected phases need, then writes the output files.
///
/// Nothing is written unless every fetch succeeded.
pub fn run_with(
    transport: &impl Transport,
    endpoints: &Endpoints,
    credentials: &Credentials,
    args: &BackupArgs,
) -> anyhow::Result<Vec<PathBuf>> {
    let user_id = credentials.user_id.as_str();

    let review_records = if args.needs_reviews() {
        let api_key = credentials
            .api_key
            .as_ref()
            .context("an API key is required to fetch reviews")?;
        tracing::info!(user_id, "backup: reviews");
        reviews::fetch_reviews(
            transport,
            endpoints,
            user_id,
            api_key.expose(),
            args.page_size,
            args.max_pages,
        )
        .context("fetch reviews")?
    } else {
        Vec::new()
    };

    let status_records = if args.runs(Phase::Statuses) {
        tracing::info!(user_id, "backup: statuses");
        statuses::fetch_statuses(transport, endpoints, user_id, args.max_pages)
            .context("fetch statuses")?
    } else {
        Vec::new()
    };

    let out_dir = Path::new(&args.output);
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create output dir: {}", out_dir.display()))?;

    let shelf_map = shelves::group_by_shelf(&review_records);
    if args.no_clobber {
        let mut targets = Vec::new();
        if args.runs(Phase::Reviews) {
            targets.push(out_dir.join(writers::REVIEWS_FILE));
        }
        if args.runs(Phase::Shelves) {
            for shelf in shelf_map.keys() {
                targets.push(writers::shelf_path(out_dir, shelf)?);
            }
        }
        if args.runs(Phase::Statuses) {
            targets.push(out_dir.join(writers::STATUSES_FILE));
        }
        writers::ensure_absent(targets.iter().map(PathBuf::as_path))?;
    }

    let mut written = Vec::new();
    if args.runs(Phase::Reviews) {
        written.push(writers::write_reviews(
            &review_records,
            out_dir,
            args.keep_empty,
            args.no_clobber,
        )?);
    }
    if args.runs(Phase::Shelves) {
        written.extend(writers::write_shelves(
            &shelf_map,
            out_dir,
            !args.no_header,
            args.no_clobber,
        )?);
    }
    if args.runs(Phase::Statuses) {
        written.push(writers::write_statuses(&status_records, out_dir, args.no_clobber)?);
    }

    Ok(written)
}
