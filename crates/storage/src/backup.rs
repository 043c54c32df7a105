//! Everything-in-one-file backup: the database plus the stored
//! statement originals, as a gzipped tarball.

use crate::db::DbPool;
use crate::error::Result;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::path::Path;

/// Write a `.tar.gz` at `dest` holding the database as `mutasi.db` and
/// the object store under `statements/`.
///
/// The WAL is checkpointed first so the main database file alone is a
/// complete snapshot. Writes that land after the checkpoint are not in
/// the backup.
pub async fn backup_to(
    pool: &DbPool,
    db_path: &Path,
    statements_dir: &Path,
    dest: &Path,
) -> Result<()> {
    sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
        .execute(pool)
        .await?;

    let file = File::create(dest)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut archive = tar::Builder::new(encoder);
    archive.append_path_with_name(db_path, "mutasi.db")?;
    if statements_dir.is_dir() {
        archive.append_dir_all("statements", statements_dir)?;
    }
    archive.into_inner()?.finish()?;

    tracing::info!("backup written to {}", dest.display());
    Ok(())
}
