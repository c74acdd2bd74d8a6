//! Markup adapter for the remote application's pages.
//!
//! Every assumption about how the pages are written lives here: frame layout,
//! the `javascript:op(arg, ...)` link encoding, the week picker image map and
//! the info table. The rest of the pipeline only sees the structured values.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

use super::error::{ChronosError, Result};
use super::types::{LinkKind, RawRow, TreeLink};

// Static selectors for parsing - compiled once
static FRAME_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("frame[src], iframe[src]").unwrap());
static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static IMG_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
static AREA_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("area[href]").unwrap());
static TABLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static SCRIPT_LINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^javascript:\s*(\w+)\(([^,)]*)").unwrap());
static WEEK_PUSH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^javascript:\s*push\((\d+)").unwrap());

/// Marker in the `src` of the frame holding the navigation tree.
const TREE_FRAME_MARKER: &str = "tree.jsp";

/// Finds the `src` of the tree frame on the root page.
pub fn find_tree_frame(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&FRAME_SELECTOR)
        .filter_map(|frame| frame.value().attr("src"))
        .find(|src| src.contains(TREE_FRAME_MARKER))
        .map(str::to_string)
}

/// Parses a script href such as `javascript:openBranch(13, 'x')`.
///
/// Returns `None` for ordinary hrefs.
pub fn parse_script_href(href: &str) -> Option<TreeLink> {
    let caps = SCRIPT_LINK_REGEX.captures(href.trim())?;
    let operation = caps.get(1)?.as_str();
    let selector = caps.get(2)?.as_str().trim().to_string();

    let kind = match operation {
        "openCategory" => LinkKind::OpenCategory,
        "openBranch" => LinkKind::OpenBranch,
        other => LinkKind::Other(other.to_string()),
    };

    Some(TreeLink { kind, selector })
}

/// Extracts every script link on a tree page, in document order.
pub fn parse_tree_links(html: &str) -> Vec<TreeLink> {
    let document = Html::parse_document(html);
    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(parse_script_href)
        .collect()
}

/// The week picker: date labels and week-selector values, paired by position.
///
/// One label per picker image, `None` when the image has no `alt`, so that
/// decorative images keep their slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeekPicker {
    pub labels: Vec<Option<String>>,
    pub selectors: Vec<u64>,
}

impl WeekPicker {
    /// Week-selector value of the first week carrying `label`.
    pub fn selector_for(&self, label: &str) -> Option<u64> {
        let index = self
            .labels
            .iter()
            .position(|l| l.as_deref() == Some(label))?;
        self.selectors.get(index).copied()
    }
}

/// Parses the week picker page.
///
/// Labels come from image `alt` texts, selectors from the image map hrefs
/// (`javascript:push(<week>, 'true')`). An area that does not encode a week
/// is a parse error rather than a skipped slot.
pub fn parse_week_picker(html: &str) -> Result<WeekPicker> {
    let document = Html::parse_document(html);

    let labels = document
        .select(&IMG_SELECTOR)
        .map(|img| img.value().attr("alt").map(|alt| alt.trim().to_string()))
        .collect();

    let selectors = document
        .select(&AREA_SELECTOR)
        .filter_map(|area| area.value().attr("href"))
        .map(parse_week_push)
        .collect::<Result<Vec<u64>>>()?;

    Ok(WeekPicker { labels, selectors })
}

fn parse_week_push(href: &str) -> Result<u64> {
    WEEK_PUSH_REGEX
        .captures(href.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .ok_or_else(|| ChronosError::Parse {
            message: format!("week picker area does not push a week: {href:?}"),
        })
}

/// Parses the info page table into raw schedule rows.
///
/// Rows without any non-empty cell (headers, spacers) are skipped; any other
/// row must have at least seven cells.
pub fn parse_schedule_rows(html: &str) -> Result<Vec<RawRow>> {
    let document = Html::parse_document(html);
    let Some(table) = document.select(&TABLE_SELECTOR).next() else {
        return Ok(Vec::new());
    };

    let mut rows = Vec::new();
    for tr in table.select(&ROW_SELECTOR) {
        let cells: Vec<String> = tr
            .select(&CELL_SELECTOR)
            .map(|td| td.text().collect::<String>().trim().to_string())
            .collect();

        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }

        rows.push(RawRow::try_from(cells)?);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tree_frame() {
        let html = r#"<html><frameset>
            <frame src="/ade/standard/gui/menu.jsp">
            <frame src="/ade/standard/gui/tree.jsp?showTab=true">
        </frameset></html>"#;
        assert_eq!(
            find_tree_frame(html),
            Some("/ade/standard/gui/tree.jsp?showTab=true".to_string())
        );
        assert_eq!(find_tree_frame("<html><body></body></html>"), None);
    }

    #[test]
    fn test_parse_script_href() {
        let link = parse_script_href("javascript:openCategory('trainee')").unwrap();
        assert_eq!(link.kind, LinkKind::OpenCategory);
        assert_eq!(link.selector, "'trainee'");

        let link = parse_script_href("javascript:openBranch(13, 'true')").unwrap();
        assert_eq!(link.kind, LinkKind::OpenBranch);
        assert_eq!(link.selector, "13");

        let link = parse_script_href("javascript:check(1057, 'false')").unwrap();
        assert_eq!(link.kind, LinkKind::Other("check".to_string()));

        assert!(parse_script_href("/ade/standard/index.jsp").is_none());
    }

    #[test]
    fn test_parse_tree_links_skips_plain_anchors() {
        let html = r#"<a href="/help">Help</a>
            <a href="javascript:openCategory('trainee')">Students</a>
            <a href="javascript:openBranch(1)">EPITA</a>"#;
        let links = parse_tree_links(html);
        assert_eq!(links.len(), 2);
        assert_eq!(links[1].selector, "1");
    }

    #[test]
    fn test_parse_week_picker() {
        let html = r#"<img alt="02/09/2024"><img alt="09/09/2024"><img alt="09/09/2024">
            <map>
              <area href="javascript:push(0, 'true')">
              <area href="javascript:push(1, 'true')">
              <area href="javascript:push(2, 'true')">
            </map>"#;
        let picker = parse_week_picker(html).unwrap();
        assert_eq!(picker.selectors, vec![0, 1, 2]);
        assert_eq!(picker.selector_for("09/09/2024"), Some(1));
        assert_eq!(picker.selector_for("16/09/2024"), None);
    }

    #[test]
    fn test_week_picker_keeps_slot_for_unlabelled_image() {
        let html = r#"<img src="left.gif"><img alt="02/09/2024"><img alt="09/09/2024">
            <map>
              <area href="javascript:push(0, 'true')">
              <area href="javascript:push(1, 'true')">
              <area href="javascript:push(2, 'true')">
            </map>"#;
        let picker = parse_week_picker(html).unwrap();
        assert_eq!(picker.labels.len(), 3);
        assert_eq!(picker.labels[0], None);
        assert_eq!(picker.selector_for("02/09/2024"), Some(1));
        assert_eq!(picker.selector_for("09/09/2024"), Some(2));
    }

    #[test]
    fn test_week_picker_epoch_sized_selector() {
        let html = r#"<img alt="02/09/2024">
            <area href="javascript:push(1725228000000, 'true')">"#;
        let picker = parse_week_picker(html).unwrap();
        assert_eq!(picker.selector_for("02/09/2024"), Some(1_725_228_000_000));
    }

    #[test]
    fn test_week_picker_rejects_unreadable_area() {
        let html = r#"<img alt="02/09/2024">
            <area href="javascript:push(99999999999999999999999, 'true')">"#;
        assert!(matches!(
            parse_week_picker(html),
            Err(ChronosError::Parse { .. })
        ));

        let html = r#"<img alt="02/09/2024"><area href="javascript:help()">"#;
        assert!(parse_week_picker(html).is_err());
    }

    #[test]
    fn test_parse_schedule_rows() {
        let html = r#"<table>
            <tr><th>Date</th><th>Hour</th></tr>
            <tr><td>01/09/2024</td><td>08h00</td><td>2h</td><td>COD101</td>
                <td>GRA GRB</td><td>Doe</td><td><a>R101</a></td></tr>
            <tr><td></td><td> </td></tr>
        </table>"#;
        let rows = parse_schedule_rows(html).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].groups, "GRA GRB");
        assert_eq!(rows[0].room, "R101");
    }

    #[test]
    fn test_parse_schedule_rows_rejects_short_rows() {
        let html = "<table><tr><td>01/09/2024</td><td>08h00</td></tr></table>";
        assert!(matches!(
            parse_schedule_rows(html),
            Err(ChronosError::UnexpectedRow { fields: 2 })
        ));
    }
}
