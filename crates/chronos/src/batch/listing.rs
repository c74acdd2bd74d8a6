//! Listing of exported calendars and the index page rendered from it.
use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::path::Path;
use tokio::fs;

use super::BatchPlan;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub group: String,
    pub file_name: String,
    /// `None` when the calendar has not been generated yet
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSection {
    pub title: String,
    pub entries: Vec<ListingEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarListing {
    pub sections: Vec<ListingSection>,
}

/// Lists the planned calendars with the modification time of their files.
pub async fn list_calendars(calendars_dir: &Path, plan: &BatchPlan) -> CalendarListing {
    let mut sections = Vec::with_capacity(plan.sections.len());

    for section in &plan.sections {
        let mut entries = Vec::with_capacity(section.groups.len());
        for group in &section.groups {
            let file_name = format!("{group}.ics");
            let modified = fs::metadata(calendars_dir.join(&file_name))
                .await
                .and_then(|meta| meta.modified())
                .ok()
                .map(DateTime::<Utc>::from);

            entries.push(ListingEntry {
                group: group.clone(),
                file_name,
                modified,
            });
        }
        sections.push(ListingSection {
            title: section.title.clone(),
            entries,
        });
    }

    CalendarListing { sections }
}

/// Renders the listing as a standalone HTML page.
pub fn render_index(listing: &CalendarListing) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Calendars</title>\n</head>\n<body>\n",
    );

    for section in &listing.sections {
        html.push_str(&format!("<h2>{}</h2>\n<ul>\n", encode_text(&section.title)));
        for entry in &section.entries {
            let updated = match entry.modified {
                Some(at) => at.format("%a %b %e %H:%M:%S %Y UTC").to_string(),
                None => "not generated yet".to_string(),
            };
            html.push_str(&format!(
                "<li><a href=\"calendars/{}\">{}</a> <small>{}</small></li>\n",
                encode_double_quoted_attribute(&entry.file_name),
                encode_text(&entry.group),
                encode_text(&updated)
            ));
        }
        html.push_str("</ul>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}
