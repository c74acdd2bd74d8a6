use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::batch::{list_calendars, render_index, CALENDAR_DIR};
use crate::server::types::ApiErrorType;
use crate::types::ServerState;

/// GET / and GET /calendars/
/// Lists the exported calendars with their last update time
pub async fn get_index(State(s): State<Arc<ServerState>>) -> Response {
    info!("GET /calendars/");

    let listing = list_calendars(&s.output_dir.join(CALENDAR_DIR), &s.plan).await;
    Html(render_index(&listing)).into_response()
}

/// GET /calendars/:name
/// Serves one calendar file
pub async fn get_calendar(
    Path(name): Path<String>,
    State(s): State<Arc<ServerState>>,
) -> Response {
    info!("GET /calendars/{}", name);

    if !is_safe_file_name(&name) {
        warn!(name = %name, "Rejected calendar file name");
        return ApiErrorType::from((StatusCode::BAD_REQUEST, "Invalid calendar name", None))
            .into_response();
    }

    let path = s.output_dir.join(CALENDAR_DIR).join(&name);
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/calendar; charset=utf-8")],
            bytes,
        )
            .into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ApiErrorType::from((
            StatusCode::NOT_FOUND,
            "Calendar not found",
            Some(name),
        ))
        .into_response(),
        Err(e) => ApiErrorType::from((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to read calendar",
            Some(e.to_string()),
        ))
        .into_response(),
    }
}

/// A bare file name: no separators, no parent references, not hidden.
fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.contains("..")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchPlan;
    use std::path::PathBuf;

    fn state(output_dir: PathBuf) -> Arc<ServerState> {
        Arc::new(ServerState {
            output_dir,
            plan: BatchPlan::default(),
        })
    }

    #[test]
    fn test_safe_file_names() {
        assert!(is_safe_file_name("GRA.ics"));
        assert!(!is_safe_file_name("../secret"));
        assert!(!is_safe_file_name("a/b.ics"));
        assert!(!is_safe_file_name(".hidden"));
        assert!(!is_safe_file_name(""));
    }

    #[tokio::test]
    async fn test_get_calendar_statuses() {
        let dir = std::env::temp_dir().join(format!(
            "chronos-server-{}-{}",
            std::process::id(),
            rand::random::<u32>()
        ));
        std::fs::create_dir_all(dir.join(CALENDAR_DIR)).unwrap();
        std::fs::write(dir.join(CALENDAR_DIR).join("GRA.ics"), "BEGIN:VCALENDAR\r\n").unwrap();

        let ok = get_calendar(Path("GRA.ics".to_string()), State(state(dir.clone()))).await;
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(
            ok.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/calendar; charset=utf-8"
        );

        let missing = get_calendar(Path("GRB.ics".to_string()), State(state(dir.clone()))).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let bad = get_calendar(Path("..".to_string()), State(state(dir.clone()))).await;
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_get_index_lists_plan() {
        let response = get_index(State(state(PathBuf::from("/nonexistent/chronos")))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
