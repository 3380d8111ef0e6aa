/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::*;

/// Build history of a project, newest (highest id) first.
pub async fn get_all_builds(
    config: &RequestConfig,
    project_id: i64,
) -> ApiResponse<Vec<BuildHistory>> {
    send::<Option<Vec<BuildHistory>>>(get_client(
        config,
        ServiceBase::Project,
        &format!("/build/all/{}", project_id),
        RequestType::GET,
    ))
    .await
    .map(|builds| {
        let mut builds = builds.unwrap_or_default();
        builds.sort_by(|a, b| b.id.cmp(&a.id));
        builds
    })
}
