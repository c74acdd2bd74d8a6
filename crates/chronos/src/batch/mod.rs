//! Batch export: one extraction per planned group, written to disk.
//!
//! Runs are independent sessions executed by a bounded pool; a failed group
//! is reported and leaves its previous file untouched.

mod listing;

pub use listing::{list_calendars, render_index, CalendarListing, ListingEntry, ListingSection};

use chrono::{Datelike, Local, NaiveDate};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info};

use crate::ade::{ChronosError, Extraction, Extractor, HttpFetcher, PageFetcher, Result, DEFAULT_WEEKS};

/// Sub-directory of the output directory holding the calendar files.
pub const CALENDAR_DIR: &str = "calendars";
/// Name of the rendered index page.
pub const INDEX_FILE: &str = "index.html";

/// Which promotion a plan section is exported for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cohort {
    /// Students currently attending classes
    Student,
    /// Teaching assistants, two promotions ahead
    Assistant,
}

/// A titled list of groups exported for the same cohort
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSection {
    pub title: String,
    pub cohort: Cohort,
    pub groups: Vec<String>,
}

/// The groups exported by a batch, grouped for the index page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPlan {
    pub sections: Vec<PlanSection>,
}

impl Default for BatchPlan {
    fn default() -> Self {
        let groups = |names: &[&str]| names.iter().map(|n| n.to_string()).collect();
        BatchPlan {
            sections: vec![
                PlanSection {
                    title: "Groups".to_string(),
                    cohort: Cohort::Student,
                    groups: groups(&["GRA", "GRB", "APPING1", "APPING2", "APPING3"]),
                },
                PlanSection {
                    title: "Major".to_string(),
                    cohort: Cohort::Assistant,
                    groups: groups(&["CSI", "MTI", "GISTRE", "SRS", "SIGL", "SCIA", "TCOM", "GITM"]),
                },
            ],
        }
    }
}

/// Promotion labels for each cohort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Promotions {
    pub student: i32,
    pub assistant: i32,
}

impl Promotions {
    /// Promotions for a given day: the academic year turns over in July.
    pub fn for_date(date: NaiveDate) -> Self {
        let student = if date.month() < 7 {
            date.year() + 2
        } else {
            date.year() + 3
        };
        Self {
            student,
            assistant: student - 2,
        }
    }

    pub fn current() -> Self {
        Self::for_date(Local::now().date_naive())
    }

    pub fn for_cohort(&self, cohort: Cohort) -> i32 {
        match cohort {
            Cohort::Student => self.student,
            Cohort::Assistant => self.assistant,
        }
    }
}

/// Options for a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub output_dir: PathBuf,
    /// Maximum number of concurrent remote sessions
    pub workers: usize,
    pub weeks: u32,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("build"),
            workers: 5,
            weeks: DEFAULT_WEEKS,
        }
    }
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(String, ChronosError)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Path of the calendar file for `group`.
pub fn calendar_path(output_dir: &Path, group: &str) -> PathBuf {
    output_dir.join(CALENDAR_DIR).join(format!("{group}.ics"))
}

/// Runs every planned extraction over HTTP, then renders the index.
pub async fn run_batch(
    extractor: &Extractor,
    plan: &BatchPlan,
    promotions: Promotions,
    options: &BatchOptions,
) -> Result<BatchReport> {
    run_batch_with(extractor, plan, promotions, options, || {
        HttpFetcher::new(&extractor.ade)
    })
    .await
}

/// Runs every planned extraction, each over a fetcher from `new_fetcher`.
///
/// # Returns
/// * `Ok(BatchReport)` - Per-group outcome; failures never abort siblings
/// * `Err` - If the output directory or the index can't be written
pub async fn run_batch_with<F, M>(
    extractor: &Extractor,
    plan: &BatchPlan,
    promotions: Promotions,
    options: &BatchOptions,
    new_fetcher: M,
) -> Result<BatchReport>
where
    F: PageFetcher,
    M: Fn() -> Result<F>,
{
    fs::create_dir_all(options.output_dir.join(CALENDAR_DIR)).await?;

    let jobs: Vec<Extraction> = plan
        .sections
        .iter()
        .flat_map(|section| {
            let promotion = promotions.for_cohort(section.cohort).to_string();
            section.groups.iter().map(move |group| Extraction {
                promotion: promotion.clone(),
                group: group.clone(),
                weeks: options.weeks,
                reference_label: None,
            })
        })
        .collect();

    info!(
        jobs = jobs.len(),
        workers = options.workers,
        student = promotions.student,
        assistant = promotions.assistant,
        "Starting batch export"
    );

    let new_fetcher = &new_fetcher;
    let outcomes: Vec<(String, Result<PathBuf>)> = stream::iter(jobs)
        .map(|job| async move {
            let result = export_one(extractor, &job, &options.output_dir, new_fetcher).await;
            (job.group, result)
        })
        .buffer_unordered(options.workers.max(1))
        .collect()
        .await;

    let mut report = BatchReport::default();
    for (group, outcome) in outcomes {
        match outcome {
            Ok(path) => report.written.push(path),
            Err(e) => {
                error!(group = %group, error = %e, "Calendar export failed");
                report.failed.push((group, e));
            }
        }
    }

    update_index(&options.output_dir, plan).await?;

    info!(
        written = report.written.len(),
        failed = report.failed.len(),
        "Batch export finished"
    );
    Ok(report)
}

async fn export_one<F, M>(
    extractor: &Extractor,
    job: &Extraction,
    output_dir: &Path,
    new_fetcher: &M,
) -> Result<PathBuf>
where
    F: PageFetcher,
    M: Fn() -> Result<F>,
{
    let calendar = extractor.fetch_calendar_with(new_fetcher()?, job).await?;
    let path = calendar_path(output_dir, &job.group);
    write_atomic(&path, calendar.to_ics().as_bytes()).await?;

    info!(group = %job.group, events = calendar.len(), path = %path.display(), "Wrote calendar");
    Ok(path)
}

/// Renders the index page from the files currently on disk.
pub async fn update_index(output_dir: &Path, plan: &BatchPlan) -> Result<()> {
    let listing = list_calendars(&output_dir.join(CALENDAR_DIR), plan).await;
    write_atomic(&output_dir.join(INDEX_FILE), render_index(&listing).as_bytes()).await
}

/// Writes to a temporary sibling then renames over the target.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents).await?;
    fs::rename(&tmp, path).await.map_err(ChronosError::from)
}
