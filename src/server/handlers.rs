//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::server::state::ServerState;

/// Serve the latest report, or the latest refresh error
pub async fn report_handler(State(state): State<Arc<ServerState>>) -> Response {
    let snapshot = state.store.get();

    if let Some(message) = snapshot.error {
        error!("error fetching report: {}", message);
        return (StatusCode::INTERNAL_SERVER_ERROR, message).into_response();
    }

    let Some(report) = snapshot.report else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "report not yet available".to_string(),
        )
            .into_response();
    };

    match serde_json::to_vec(&report) {
        Ok(body) => (
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("error encoding report: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PluginError;
    use crate::report::model::Report;
    use crate::report::store::ReportStore;

    fn state_with_store(store: ReportStore) -> State<Arc<ServerState>> {
        State(Arc::new(ServerState::new(Arc::new(store))))
    }

    #[tokio::test]
    async fn test_no_report_yet_is_server_error() {
        let response = report_handler(state_with_store(ReportStore::new())).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_error_takes_precedence_over_report() {
        let store = ReportStore::new();
        store.set_report(Report::new("vm-1"));
        store.set_error(&PluginError::ConnectionError("monit down".to_string()));

        let response = report_handler(state_with_store(store)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_report_served_as_json() {
        let store = ReportStore::new();
        store.set_report(Report::new("vm-1"));

        let response = report_handler(state_with_store(store)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(value["ID"].is_string());
        assert_eq!(value["Plugins"][0]["id"], "bosh");
    }
}
