//! Week window: anchoring week numbers and paging the server-side cursor.
//!
//! The planning module accumulates the weeks selected through `bounds.jsp` in
//! the session; `info.jsp` then lists every class of the accumulated window.

use tracing::{debug, info};
use url::Url;

use super::client::{PageFetcher, Session};
use super::error::{ChronosError, Result};
use super::links;
use super::types::{RawRow, WeekOrigin};

/// Paths for the planning module endpoints.
const PIANO_PATH: &str = "/ade/custom/modules/plannings/pianoWeeks.jsp";
const BOUNDS_PATH: &str = "/ade/custom/modules/plannings/bounds.jsp";
const INFO_PATH: &str = "/ade/custom/modules/plannings/info.jsp";

/// Opens the leaf resource and reads the week picker.
///
/// Without a reference label the origin is week 0. With one, the origin is
/// the week-selector value of the first picker week carrying that label.
pub async fn establish_origin<F: PageFetcher>(
    session: &mut Session<F>,
    leaf: &Url,
    reference_label: Option<&str>,
) -> Result<WeekOrigin> {
    session.get(leaf).await?;

    let piano = session.url(PIANO_PATH)?;
    let html = session.get(&piano).await?;

    let Some(label) = reference_label else {
        return Ok(WeekOrigin::UNANCHORED);
    };

    let picker = links::parse_week_picker(&html)?;
    let selector = picker
        .selector_for(label)
        .ok_or_else(|| ChronosError::WeekLabelNotFound {
            label: label.to_string(),
        })?;

    debug!(
        correlation_id = %session.correlation_id(),
        label = %label,
        week = selector,
        "Anchored week origin"
    );
    Ok(WeekOrigin(selector))
}

/// Owns the server-side week cursor for one session.
#[derive(Debug, Clone)]
pub struct WeekWindow {
    origin: WeekOrigin,
    /// Offset from the origin of the last week pushed to the server
    cursor: Option<u32>,
}

impl WeekWindow {
    pub fn new(origin: WeekOrigin) -> Self {
        Self {
            origin,
            cursor: None,
        }
    }

    pub fn origin(&self) -> WeekOrigin {
        self.origin
    }

    pub fn cursor(&self) -> Option<u32> {
        self.cursor
    }

    /// URL pushing the week at `offset`; the first push resets the window.
    fn bounds_url<F: PageFetcher>(&self, session: &Session<F>, offset: u32) -> Result<Url> {
        let week = self.origin.week(offset)?;
        let mut url = session.url(BOUNDS_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("week", &week.to_string());
            if offset == 0 {
                query.append_pair("reset", "true");
            }
        }
        Ok(url)
    }

    /// Pushes the next week to the server.
    async fn advance<F: PageFetcher>(&mut self, session: &mut Session<F>) -> Result<()> {
        let offset = self.cursor.map_or(0, |c| c + 1);
        let url = self.bounds_url(session, offset)?;
        // Only the side effect matters; the body is discarded.
        session.get(&url).await?;
        self.cursor = Some(offset);
        Ok(())
    }

    /// Pushes `count` consecutive weeks then harvests the accumulated rows.
    ///
    /// Rows are returned in the order the info table lists them.
    pub async fn collect_weeks<F: PageFetcher>(
        &mut self,
        session: &mut Session<F>,
        count: u32,
    ) -> Result<Vec<RawRow>> {
        if count == 0 {
            return Err(ChronosError::Config {
                message: "week count must be positive".to_string(),
            });
        }

        self.cursor = None;
        for _ in 0..count {
            self.advance(session).await?;
        }

        let info = session.url(INFO_PATH)?;
        let html = session.get(&info).await?;
        let rows = links::parse_schedule_rows(&html)?;

        info!(
            correlation_id = %session.correlation_id(),
            first_week = self.origin.0,
            weeks = count,
            rows = rows.len(),
            "Collected schedule rows"
        );
        Ok(rows)
    }
}
