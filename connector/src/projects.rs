/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::*;

pub async fn post_validate_github_url(config: &RequestConfig, url: &str) -> ApiResponse<bool> {
    send(
        get_client(
            config,
            ServiceBase::Project,
            "/validate/github-url",
            RequestType::POST,
        )
        .query(&[("url", url)]),
    )
    .await
}

pub async fn post_create(
    config: &RequestConfig,
    project: &CreateProjectRequest,
) -> ApiResponse<Project> {
    send(get_client(config, ServiceBase::Project, "/create", RequestType::POST).json(project)).await
}

pub async fn get_all(config: &RequestConfig, user_id: &str) -> ApiResponse<Vec<Project>> {
    send(get_client(
        config,
        ServiceBase::Project,
        &format!("/all/{}", user_id),
        RequestType::GET,
    ))
    .await
}

pub async fn get_project(config: &RequestConfig, project_id: i64) -> ApiResponse<Project> {
    send(get_client(
        config,
        ServiceBase::Project,
        &format!("/{}", project_id),
        RequestType::GET,
    ))
    .await
}

pub async fn post_update_project_info(
    config: &RequestConfig,
    project_id: i64,
    project_config: &ProjectConfig,
) -> ApiResponse<ProjectConfig> {
    send(
        get_client(
            config,
            ServiceBase::Project,
            &format!("/update-project-info/{}", project_id),
            RequestType::POST,
        )
        .json(project_config),
    )
    .await
}

pub async fn post_update_pipeline(
    config: &RequestConfig,
    pipeline_id: i64,
    pipeline: &PipelineUpdateRequest,
) -> ApiResponse<Project> {
    send(
        get_client(
            config,
            ServiceBase::Project,
            &format!("/update/pipeline/{}", pipeline_id),
            RequestType::POST,
        )
        .json(pipeline),
    )
    .await
}

pub async fn delete_project(config: &RequestConfig, project_id: i64) -> ApiResponse<()> {
    send(get_client(
        config,
        ServiceBase::Project,
        &format!("/{}", project_id),
        RequestType::DELETE,
    ))
    .await
}

/// Push events sent by GitHub to this URL trigger a build on the backend.
pub fn webhook_url(config: &RequestConfig, project_id: i64) -> String {
    config.url(
        ServiceBase::Project,
        &format!("/webhook/github/{}", project_id),
    )
}
