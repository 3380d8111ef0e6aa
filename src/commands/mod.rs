/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod base;
pub mod project;

use crate::config::*;
use crate::session::{FileStore, Session};
use anyhow::{Context as _, Result, anyhow};
use connector::{ApiResponse, RequestConfig, User};

pub const SESSION_FILE: &str = "session.json";

/// Configuration and hydrated session shared by every command.
pub struct Context {
    pub config: Config,
    pub session: Session<FileStore>,
}

impl Context {
    pub fn load() -> Result<Self> {
        let config = load_config()?;
        let mut session = Session::new(FileStore::new(config_dir()?.join(SESSION_FILE)));
        session.hydrate();

        Ok(Context { config, session })
    }

    pub fn request_config(&self) -> Result<RequestConfig> {
        Ok(get_request_config(&self.config, self.session.token())?)
    }

    pub fn user(&self) -> Result<&User> {
        Ok(self.session.require_user()?)
    }

    /// `--project` if given, otherwise the selected project.
    pub fn project_id(&self, project: Option<i64>) -> Result<i64> {
        if let Some(project) = project {
            return Ok(project);
        }

        get_value(&self.config, ConfigKey::SelectedProject)
            .ok_or_else(|| {
                anyhow!("Project is required for command. Use `minijenkins project select <id>`.")
            })?
            .parse()
            .context("Selected project is not a valid id")
    }
}

/// Turns a failed response into an error prefixed with `action`.
pub fn expect_ok<T>(res: ApiResponse<T>, action: &str) -> Result<T> {
    match res {
        ApiResponse::Ok { data, .. } => Ok(data),
        ApiResponse::Err { message, detail } => Err(anyhow!("{}: {} = [{}]", action, message, detail)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expect_ok_formats_message_and_detail() {
        let res: ApiResponse<()> = ApiResponse::Err {
            message: "Resource not found".to_string(),
            detail: "Project with id 9 not found".to_string(),
        };

        let err = expect_ok(res, "Failed to get project").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to get project: Resource not found = [Project with id 9 not found]"
        );
    }
}
