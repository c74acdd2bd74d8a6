//! Tree navigation: resolving a group path to its leaf resource.
//!
//! The tree page lists script links `openCategory('x')` and `openBranch(n)`.
//! Following one means requesting the tree page again with `category=x` or
//! `branchId=n`; the leaf itself is selected with `selectId` (or
//! `selectBranchId` once the path switched to branch addressing).

use tracing::{debug, info, warn};
use url::Url;

use super::client::{PageFetcher, Session};
use super::error::{ChronosError, Result};
use super::links;
use super::types::{GroupPath, LinkKind, PathSegment, TreeLink};

/// Path of the tree page.
const TREE_PATH: &str = "/ade/standard/gui/tree.jsp";

/// Finds the tree page URL from the application's root frameset.
pub async fn find_tree_url<F: PageFetcher>(session: &mut Session<F>) -> Result<Url> {
    let root = session.url("/")?;
    let html = session.get(&root).await?;

    let src = links::find_tree_frame(&html).ok_or_else(|| ChronosError::TreeFrameMissing {
        url: root.to_string(),
    })?;

    let tree = session.url(&src)?;
    debug!(
        correlation_id = %session.correlation_id(),
        url = %tree,
        "Found tree frame"
    );
    Ok(tree)
}

/// Resolves `path` to the leaf URL, starting from the root page.
pub async fn resolve<F: PageFetcher>(session: &mut Session<F>, path: &GroupPath) -> Result<Url> {
    let tree = find_tree_url(session).await?;
    walk_tree(session, tree, path).await
}

/// Walks the tree from `tree` following `path` and returns the leaf URL.
///
/// Issues exactly one request per category/branch segment; the terminal
/// segment and the branch mode marker cost nothing.
pub async fn walk_tree<F: PageFetcher>(
    session: &mut Session<F>,
    tree: Url,
    path: &GroupPath,
) -> Result<Url> {
    let (terminal, route) = path
        .segments()
        .split_last()
        .ok_or(ChronosError::EmptySelector)?;

    let mut branch_select = false;
    let mut current = tree;

    for (depth, segment) in route.iter().enumerate() {
        if *segment == PathSegment::BranchModeSwitch {
            branch_select = true;
            continue;
        }

        let html = session.get(&current).await?;
        let wanted = segment.selector();

        let Some(link) = links::parse_tree_links(&html)
            .into_iter()
            .find(|link| link.selector == wanted && is_navigation(link))
        else {
            warn!(
                correlation_id = %session.correlation_id(),
                segment = %wanted,
                depth = depth,
                "No tree link matches path segment"
            );
            return Err(ChronosError::Unresolvable {
                segment: wanted,
                depth,
            });
        };

        current = tree_page_url(session, &link)?;
        debug!(
            correlation_id = %session.correlation_id(),
            segment = %wanted,
            url = %current,
            "Followed tree link"
        );
    }

    let leaf = leaf_url(session, terminal, branch_select)?;
    info!(
        correlation_id = %session.correlation_id(),
        url = %leaf,
        branch_select = branch_select,
        "Resolved group path"
    );
    Ok(leaf)
}

fn is_navigation(link: &TreeLink) -> bool {
    matches!(link.kind, LinkKind::OpenCategory | LinkKind::OpenBranch)
}

/// Builds the tree page URL that a navigation link leads to.
fn tree_page_url<F: PageFetcher>(session: &Session<F>, link: &TreeLink) -> Result<Url> {
    let mut url = session.url(TREE_PATH)?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("expand", "false")
            .append_pair("forceLoad", "false")
            .append_pair("reload", "false")
            .append_pair("scroll", "0");
        match link.kind {
            LinkKind::OpenCategory => {
                query.append_pair("category", strip_delimiters(&link.selector));
            }
            LinkKind::OpenBranch => {
                query.append_pair("branchId", &link.selector);
            }
            LinkKind::Other(_) => {}
        }
    }
    Ok(url)
}

/// Builds the URL selecting the leaf node.
fn leaf_url<F: PageFetcher>(
    session: &Session<F>,
    terminal: &PathSegment,
    branch_select: bool,
) -> Result<Url> {
    if *terminal == PathSegment::BranchModeSwitch {
        return Err(ChronosError::EmptySelector);
    }

    let selector = terminal.selector();
    if is_falsy(&selector) {
        return Err(ChronosError::EmptySelector);
    }

    let parameter = if branch_select {
        "selectBranchId"
    } else {
        "selectId"
    };

    let mut url = session.url(TREE_PATH)?;
    url.query_pairs_mut()
        .append_pair(parameter, &selector)
        .append_pair("forceLoad", "false")
        .append_pair("scroll", "0");
    Ok(url)
}

/// Drops the first and last character (the quotes around a category id).
fn strip_delimiters(selector: &str) -> &str {
    let mut chars = selector.chars();
    chars.next();
    chars.next_back();
    chars.as_str()
}

fn is_falsy(selector: &str) -> bool {
    matches!(selector.trim(), "" | "0" | "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ade::client::fake::FakeFetcher;

    const BASE: &str = "http://ade.test";

    fn segments(raw: &[&str]) -> GroupPath {
        let segments = raw
            .iter()
            .map(|s| match s.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
                Some("branch") => PathSegment::BranchModeSwitch,
                Some(id) => PathSegment::Category(id.to_string()),
                None => PathSegment::Branch(s.to_string()),
            })
            .collect();
        GroupPath::new(segments).unwrap()
    }

    fn root_page() -> &'static str {
        r#"<html><frameset><frame src="/ade/standard/gui/tree.jsp?showTab=true"></frameset></html>"#
    }

    #[test]
    fn test_strip_delimiters() {
        assert_eq!(strip_delimiters("'trainee'"), "trainee");
        assert_eq!(strip_delimiters("x"), "");
    }

    #[tokio::test]
    async fn test_resolve_category_then_branches() {
        let fetcher = FakeFetcher::new()
            .page("http://ade.test/", root_page())
            .page(
                "http://ade.test/ade/standard/gui/tree.jsp?showTab=true",
                r#"<a href="javascript:openCategory('instructor')">Staff</a>
                   <a href="javascript:openCategory('trainee')">Students</a>"#,
            )
            .page(
                "http://ade.test/ade/standard/gui/tree.jsp?expand=false&forceLoad=false&reload=false&scroll=0&category=trainee",
                r#"<a href="javascript:openBranch(1, 'false')">EPITA</a>"#,
            )
            .page(
                "http://ade.test/ade/standard/gui/tree.jsp?expand=false&forceLoad=false&reload=false&scroll=0&branchId=1",
                r#"<a href="javascript:check(1057, 'false')">GRA</a>"#,
            );
        let mut session = Session::new(fetcher.clone(), BASE).unwrap();

        let leaf = resolve(&mut session, &segments(&["'trainee'", "1", "1057"]))
            .await
            .unwrap();

        assert_eq!(
            leaf.as_str(),
            "http://ade.test/ade/standard/gui/tree.jsp?selectId=1057&forceLoad=false&scroll=0"
        );
        // root + one fetch per non-terminal segment
        assert_eq!(fetcher.requested().len(), 3);
    }

    #[tokio::test]
    async fn test_branch_mode_switch_selects_branch() {
        let tree = "http://ade.test/ade/standard/gui/tree.jsp";
        let fetcher = FakeFetcher::new().page(
            tree,
            r#"<a href="javascript:openBranch(7)">Rooms</a>"#,
        );
        let mut session = Session::new(fetcher.clone(), BASE).unwrap();

        let leaf = walk_tree(
            &mut session,
            Url::parse(tree).unwrap(),
            &segments(&["7", "'branch'", "42"]),
        )
        .await
        .unwrap();

        assert_eq!(
            leaf.as_str(),
            "http://ade.test/ade/standard/gui/tree.jsp?selectBranchId=42&forceLoad=false&scroll=0"
        );
        // The marker does not cost a request.
        assert_eq!(fetcher.requested(), vec![tree.to_string()]);
    }

    #[tokio::test]
    async fn test_missing_link_stops_navigation() {
        let tree = "http://ade.test/ade/standard/gui/tree.jsp";
        let fetcher = FakeFetcher::new().page(
            tree,
            r#"<a href="javascript:openCategory('instructor')">Staff</a>"#,
        );
        let mut session = Session::new(fetcher.clone(), BASE).unwrap();

        let err = walk_tree(
            &mut session,
            Url::parse(tree).unwrap(),
            &segments(&["'trainee'", "1", "13", "1057"]),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ChronosError::Unresolvable { depth: 0, .. }));
        assert_eq!(fetcher.requested().len(), 1);
    }

    #[tokio::test]
    async fn test_selector_must_match_exactly() {
        let tree = "http://ade.test/ade/standard/gui/tree.jsp";
        let fetcher = FakeFetcher::new().page(
            tree,
            r#"<a href="javascript:openBranch(130)">Other</a>"#,
        );
        let mut session = Session::new(fetcher, BASE).unwrap();

        let err = walk_tree(
            &mut session,
            Url::parse(tree).unwrap(),
            &segments(&["13", "1057"]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ChronosError::Unresolvable { .. }));
    }

    #[tokio::test]
    async fn test_falsy_terminal_is_configuration_error() {
        let mut session = Session::new(FakeFetcher::new(), BASE).unwrap();
        let err = walk_tree(
            &mut session,
            Url::parse("http://ade.test/ade/standard/gui/tree.jsp").unwrap(),
            &segments(&["0"]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ChronosError::EmptySelector));
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_missing_tree_frame() {
        let fetcher = FakeFetcher::new().page("http://ade.test/", "<html><body>down</body></html>");
        let mut session = Session::new(fetcher, BASE).unwrap();
        let err = find_tree_url(&mut session).await.unwrap_err();
        assert!(matches!(err, ChronosError::TreeFrameMissing { .. }));
    }

    #[tokio::test]
    async fn test_tree_error_status_aborts() {
        let fetcher = FakeFetcher::new().status("http://ade.test/", 503, "");
        let mut session = Session::new(fetcher, BASE).unwrap();
        let err = resolve(&mut session, &segments(&["'trainee'", "1"]))
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }
}
