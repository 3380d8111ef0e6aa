/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProjectStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl ProjectStatus {
    pub fn is_running(self) -> bool {
        self == ProjectStatus::Running
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let status = match self {
            ProjectStatus::Pending => "PENDING",
            ProjectStatus::Running => "RUNNING",
            ProjectStatus::Success => "SUCCESS",
            ProjectStatus::Failed => "FAILED",
        };

        write!(f, "{}", status)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuildStatus {
    Success,
    Failure,
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BuildStatus::Success => write!(f, "SUCCESS"),
            BuildStatus::Failure => write!(f, "FAILURE"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub github_url: Option<String>,
    pub shell_command: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Newline separated `KEY=VALUE` pairs.
    #[serde(default)]
    pub environment_variables: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PipelineStage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub command: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub stages: Vec<PipelineStage>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub project_id: i64,
    pub user_id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub project_status: ProjectStatus,
    #[serde(default)]
    pub last_run: Option<String>,
    #[serde(default)]
    pub last_build_time: Option<String>,
    pub project_name: String,
    #[serde(default)]
    pub create_date_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub project_config: Option<ProjectConfig>,
    #[serde(default)]
    pub pipeline_config: Option<PipelineConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: i64,
    pub log_time: NaiveDateTime,
    pub project_id: i64,
    pub log: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuildHistory {
    pub id: i64,
    pub status: BuildStatus,
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub execution_time: Option<String>,
    pub project_id: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PipelineRequest {
    pub name: String,
    pub stages: Vec<PipelineStage>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineUpdateRequest {
    pub pipeline_request: PipelineRequest,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub project_name: String,
    pub description: String,
    pub user_id: String,
    pub project_config: ProjectConfig,
    pub pipeline_config: PipelineUpdateRequest,
}

/// The incremental log endpoint answers with the newest entry alone, older
/// deployments answer with a list.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

fn default_branch() -> String {
    "main".to_string()
}
