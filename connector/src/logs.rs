/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::*;

/// Newest log lines of a project. An empty body decodes to no entries.
pub async fn get_logs(config: &RequestConfig, project_id: i64) -> ApiResponse<Vec<LogEntry>> {
    send::<Option<OneOrMany<LogEntry>>>(get_client(
        config,
        ServiceBase::Project,
        &format!("/logs/{}", project_id),
        RequestType::GET,
    ))
    .await
    .map(|entries| entries.map(OneOrMany::into_vec).unwrap_or_default())
}

pub async fn get_all_logs(config: &RequestConfig, project_id: i64) -> ApiResponse<Vec<LogEntry>> {
    send::<Option<OneOrMany<LogEntry>>>(get_client(
        config,
        ServiceBase::Project,
        &format!("/all-logs/{}", project_id),
        RequestType::GET,
    ))
    .await
    .map(|entries| entries.map(OneOrMany::into_vec).unwrap_or_default())
}

pub async fn delete_logs(config: &RequestConfig, project_id: i64) -> ApiResponse<()> {
    send(get_client(
        config,
        ServiceBase::Project,
        &format!("/clear-logs/{}", project_id),
        RequestType::DELETE,
    ))
    .await
}
