/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::*;
use url::form_urlencoded;

pub async fn post_execute(config: &RequestConfig, project_id: i64) -> ApiResponse<serde_json::Value> {
    send(get_client(
        config,
        ServiceBase::Execution,
        &format!("/{}/execute", project_id),
        RequestType::POST,
    ))
    .await
}

/// The datetime is passed through as typed, only percent-encoded.
pub fn schedule_path(project_id: i64, datetime: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(datetime.as_bytes()).collect();
    format!("/{}/schedule-execution?datetime={}", project_id, encoded)
}

pub async fn post_schedule_execution(
    config: &RequestConfig,
    project_id: i64,
    datetime: &str,
) -> ApiResponse<serde_json::Value> {
    send(get_client(
        config,
        ServiceBase::Execution,
        &schedule_path(project_id, datetime),
        RequestType::POST,
    ))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_path_encodes_colon() {
        assert_eq!(
            schedule_path(7, "2025-05-28T15:56"),
            "/7/schedule-execution?datetime=2025-05-28T15%3A56"
        );
    }

    #[test]
    fn test_schedule_path_keeps_seconds_as_typed() {
        assert_eq!(
            schedule_path(7, "2025-05-28T15:56:30"),
            "/7/schedule-execution?datetime=2025-05-28T15%3A56%3A30"
        );
    }
}
