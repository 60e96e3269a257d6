//! CSV seed runner for the `movies` table.

use std::collections::HashSet;
use std::io::Read;
use std::ops::Range;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use sqlx::{Postgres, QueryBuilder};
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::store::MovieStore;

/// Default CSV file, relative to the working directory.
pub const DEFAULT_SEED_FILE: &str = "data/movies.csv";

/// Default number of rows per insert statement.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Seed options.
#[derive(Debug, Clone)]
pub struct SeedOptions {
    /// Rows per insert statement.
    pub batch_size: usize,
    /// `last_vote_time` given to every seeded movie.
    pub last_vote_time: DateTime<Utc>,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            last_vote_time: Utc
                .with_ymd_and_hms(2024, 12, 7, 0, 0, 0)
                .single()
                .unwrap_or_default(),
        }
    }
}

impl SeedOptions {
    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// Outcome of a seed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Unique titles submitted.
    pub submitted: usize,
    /// Rows actually inserted; existing ids are skipped.
    pub inserted: u64,
    /// Insert statements executed.
    pub batches: usize,
}

/// Read unique, non-empty movie titles from CSV with a `title` column.
///
/// Titles are trimmed; the first occurrence of each title keeps its position.
pub fn read_movie_titles<R: Read>(reader: R) -> StoreResult<Vec<String>> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let column = csv_reader
        .headers()?
        .iter()
        .position(|h| h.trim() == "title")
        .ok_or_else(|| StoreError::Seed("CSV has no \"title\" column".to_string()))?;

    let mut seen = HashSet::new();
    let mut titles = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let Some(title) = record.get(column).map(str::trim) else {
            continue;
        };
        if !title.is_empty() && seen.insert(title.to_string()) {
            titles.push(title.to_string());
        }
    }

    info!(count = titles.len(), "Parsed unique movies from CSV");
    Ok(titles)
}

/// Read movie titles from a CSV file.
pub fn read_movie_titles_from_path(path: &Path) -> StoreResult<Vec<String>> {
    let file = std::fs::File::open(path)?;
    read_movie_titles(file)
}

/// Index ranges of consecutive batches covering `total` items.
pub fn batch_ranges(total: usize, batch_size: usize) -> impl Iterator<Item = Range<usize>> {
    let step = batch_size.max(1);
    (0..total)
        .step_by(step)
        .map(move |start| start..(start + step).min(total))
}

/// Build the insert statement for `titles[range]`.
///
/// Ids are the 1-based positions of the titles; existing ids are left alone.
fn build_insert<'a>(
    titles: &'a [String],
    range: Range<usize>,
    last_vote_time: DateTime<Utc>,
) -> StoreResult<QueryBuilder<'a, Postgres>> {
    let first_id = i32::try_from(range.start + 1)
        .map_err(|_| StoreError::Seed("too many movies to assign ids".to_string()))?;
    if i32::try_from(range.end).is_err() {
        return Err(StoreError::Seed("too many movies to assign ids".to_string()));
    }

    let mut builder = QueryBuilder::new("INSERT INTO movies (id, title, score, last_vote_time) ");
    builder.push_values(
        titles[range].iter().zip(first_id..),
        |mut row, (title, id)| {
            row.push_bind(id)
                .push_bind(title.as_str())
                .push_bind(0_i32)
                .push_bind(last_vote_time);
        },
    );
    builder.push(" ON CONFLICT (id) DO NOTHING");
    Ok(builder)
}

/// Insert `titles` in batches, skipping ids that already exist.
pub async fn seed_movies(
    store: &MovieStore,
    titles: &[String],
    options: &SeedOptions,
) -> StoreResult<SeedReport> {
    if options.batch_size == 0 {
        return Err(StoreError::Config("batch size must be positive".to_string()));
    }

    let mut report = SeedReport {
        submitted: titles.len(),
        ..SeedReport::default()
    };
    info!(count = titles.len(), "Inserting movies...");

    for range in batch_ranges(titles.len(), options.batch_size) {
        let end = range.end;
        let mut insert = build_insert(titles, range, options.last_vote_time)?;
        let pool = store.pool().await?;
        let result = insert.build().execute(pool).await?;

        report.inserted += result.rows_affected();
        report.batches += 1;
        info!(progress = end, total = titles.len(), "Inserted movies...");
    }

    // Keep the serial sequence ahead of the explicitly assigned ids.
    let pool = store.pool().await?;
    sqlx::query(
        "SELECT setval(pg_get_serial_sequence('movies', 'id'), \
         COALESCE((SELECT MAX(id) FROM movies), 0) + 1, false)",
    )
    .execute(pool)
    .await?;

    info!(
        submitted = report.submitted,
        inserted = report.inserted,
        batches = report.batches,
        "Successfully seeded movies"
    );
    Ok(report)
}
