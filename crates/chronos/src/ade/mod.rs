//! Timetable extraction from the Chronos (ADE) web application.
mod client;
mod config;
mod error;
mod links;
mod rows;
mod tree;
mod types;
mod weeks;

pub use client::{AdeConfig, FetchedPage, HttpFetcher, PageFetcher, Session, ADE_BASE_URL};
pub use config::{GroupTable, LookupTables, TimetableConfig, BUILTIN_VERSION};
pub use error::{ChronosError, Result};
pub use links::{parse_schedule_rows, parse_tree_links, parse_week_picker, WeekPicker};
pub use rows::{parse_duration, parse_start, RowParser};
pub use tree::{find_tree_url, resolve, walk_tree};
pub use types::*;
pub use weeks::{establish_origin, WeekWindow};

use std::time::Instant;
use tracing::{error, info};

use crate::calendar::{self, Calendar};

/// Number of weeks collected when none is requested.
pub const DEFAULT_WEEKS: u32 = 80;

/// One extraction run: which timetable, for which promotion, how far ahead.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub promotion: String,
    pub group: String,
    pub weeks: u32,
    /// Date label of the first week to collect; `None` starts at week 0
    pub reference_label: Option<String>,
}

impl Extraction {
    pub fn new(promotion: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            promotion: promotion.into(),
            group: group.into(),
            weeks: DEFAULT_WEEKS,
            reference_label: None,
        }
    }
}

/// Walks a resolved path and pages through the weeks.
///
/// # Arguments
/// * `session` - A fresh session; nothing else may use it concurrently
/// * `path` - Route to the timetable's leaf
/// * `parser` - Row parser carrying the lookup tables
///
/// # Returns
/// * `Ok(Vec<ClassEvent>)` - Every class in the window, in table order
/// * `Err` - On the first transport, navigation or parse failure
pub async fn extract_events<F: PageFetcher>(
    session: &mut Session<F>,
    path: &GroupPath,
    parser: &RowParser,
    weeks: u32,
    reference_label: Option<&str>,
) -> Result<Vec<ClassEvent>> {
    let leaf = tree::resolve(session, path).await?;
    let origin = weeks::establish_origin(session, &leaf, reference_label).await?;

    let mut window = WeekWindow::new(origin);
    let rows = window.collect_weeks(session, weeks).await?;

    parser.parse_all(&rows)
}

/// Everything an extraction needs that does not change between runs.
///
/// Shared read-only by concurrent runs; each run opens its own session.
#[derive(Debug, Clone)]
pub struct Extractor {
    pub ade: AdeConfig,
    pub groups: GroupTable,
    pub parser: RowParser,
}

impl Extractor {
    pub fn new(ade: AdeConfig, config: &TimetableConfig) -> Result<Self> {
        Ok(Self {
            ade,
            groups: config.group_table()?,
            parser: RowParser::new(config.lookups()),
        })
    }

    /// Runs one extraction over a new HTTP session.
    pub async fn fetch_calendar(&self, job: &Extraction) -> Result<Calendar> {
        // Unknown groups fail before any request is made.
        self.groups.resolve(&job.group)?;
        let fetcher = HttpFetcher::new(&self.ade)?;
        self.fetch_calendar_with(fetcher, job).await
    }

    /// Runs one extraction over the given fetcher.
    pub async fn fetch_calendar_with<F: PageFetcher>(
        &self,
        fetcher: F,
        job: &Extraction,
    ) -> Result<Calendar> {
        let path = self.groups.resolve(&job.group)?;
        let mut session = Session::new(fetcher, &self.ade.base_url)?;
        let start = Instant::now();

        info!(
            correlation_id = %session.correlation_id(),
            group = %job.group,
            promotion = %job.promotion,
            weeks = job.weeks,
            "Starting timetable extraction"
        );

        let result = extract_events(
            &mut session,
            path,
            &self.parser,
            job.weeks,
            job.reference_label.as_deref(),
        )
        .await;

        match result {
            Ok(events) => {
                info!(
                    correlation_id = %session.correlation_id(),
                    group = %job.group,
                    events = events.len(),
                    requests = session.requests(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Timetable extraction completed"
                );
                Ok(calendar::assemble(&job.promotion, &events))
            }
            Err(e) => {
                error!(
                    correlation_id = %session.correlation_id(),
                    group = %job.group,
                    error = %e,
                    requests = session.requests(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Timetable extraction failed"
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::client::fake::FakeFetcher;
    use super::*;

    const TREE: &str = "http://ade.test/ade/standard/gui/tree.jsp";

    fn extractor() -> Extractor {
        let config: TimetableConfig = serde_json::from_str(
            r#"{ "version": "test", "groups": { "GRA": ["'trainee'", 1, 1057] } }"#,
        )
        .unwrap();
        let ade = AdeConfig {
            base_url: "http://ade.test".to_string(),
            ..AdeConfig::default()
        };
        Extractor::new(ade, &config).unwrap()
    }

    fn site() -> FakeFetcher {
        FakeFetcher::new()
            .page(
                "http://ade.test/",
                r#"<frameset><frame src="/ade/standard/gui/tree.jsp"></frameset>"#,
            )
            .page(TREE, r#"<a href="javascript:openCategory('trainee')">Students</a>"#)
            .page(
                &format!("{TREE}?expand=false&forceLoad=false&reload=false&scroll=0&category=trainee"),
                r#"<a href="javascript:openBranch(1)">EPITA</a>"#,
            )
            .page(&format!("{TREE}?selectId=1057&forceLoad=false&scroll=0"), "")
            .page("http://ade.test/ade/custom/modules/plannings/pianoWeeks.jsp", "")
            .page(
                "http://ade.test/ade/custom/modules/plannings/bounds.jsp?week=0&reset=true",
                "",
            )
            .page("http://ade.test/ade/custom/modules/plannings/bounds.jsp?week=1", "")
            .page(
                "http://ade.test/ade/custom/modules/plannings/info.jsp",
                r#"<table>
                    <tr><td>01/09/2024</td><td>08h00</td><td>2h</td><td>COD101</td>
                        <td>GRA</td><td>Doe</td><td>R101</td></tr>
                    <tr><td>02/09/2024</td><td>14h00</td><td>1h30min</td><td>MATH</td>
                        <td>GRA GRB</td><td>-</td><td>R102</td></tr>
                </table>"#,
            )
    }

    #[tokio::test]
    async fn test_full_extraction() {
        let fetcher = site();
        let mut job = Extraction::new("2027", "GRA");
        job.weeks = 2;

        let calendar = extractor()
            .fetch_calendar_with(fetcher.clone(), &job)
            .await
            .unwrap();

        assert_eq!(calendar.events.len(), 2);
        assert_eq!(calendar.events[0].summary, "COD101 - Doe (R101)");
        assert_eq!(calendar.events[1].summary, "MATH (R102)");
        // root, 2 tree pages, leaf, picker, 2 week pushes, info
        assert_eq!(fetcher.requested().len(), 8);
    }

    #[tokio::test]
    async fn test_unknown_group_makes_no_request() {
        let fetcher = site();
        let job = Extraction::new("2027", "NOPE");

        let err = extractor()
            .fetch_calendar_with(fetcher.clone(), &job)
            .await
            .unwrap_err();

        assert!(matches!(err, ChronosError::UnknownGroup { .. }));
        assert!(fetcher.requested().is_empty());
    }

    #[tokio::test]
    async fn test_bad_row_fails_the_run() {
        let fetcher = site().page(
            "http://ade.test/ade/custom/modules/plannings/info.jsp",
            r#"<table><tr><td>01/09/2024</td><td>08h00</td><td>forever</td><td>COD101</td>
               <td>GRA</td><td>Doe</td><td>R101</td></tr></table>"#,
        );
        let mut job = Extraction::new("2027", "GRA");
        job.weeks = 2;

        let err = extractor().fetch_calendar_with(fetcher, &job).await.unwrap_err();
        assert!(matches!(err, ChronosError::UnhandledDuration { .. }));
    }
}
