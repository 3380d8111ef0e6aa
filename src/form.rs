/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use connector::{
    CreateProjectRequest, PipelineConfig, PipelineRequest, PipelineStage, PipelineUpdateRequest,
    ProjectConfig,
};
use std::collections::BTreeMap;
use std::fmt;

pub const PRIVATE_REPOSITORY: &str =
    "This is a private repository. Please provide a public repository";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldKey {
    ProjectName,
    Description,
    GithubUrl,
    Branch,
    ShellCommand,
    PipelineName,
    StageName(usize),
    StageCommand(usize),
    Submit,
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldKey::ProjectName => write!(f, "projectName"),
            FieldKey::Description => write!(f, "description"),
            FieldKey::GithubUrl => write!(f, "projectConfig.githubUrl"),
            FieldKey::Branch => write!(f, "projectConfig.branch"),
            FieldKey::ShellCommand => write!(f, "projectConfig.shellCommand"),
            FieldKey::PipelineName => write!(f, "pipelineConfig.name"),
            FieldKey::StageName(index) => write!(f, "pipelineStageName-{}", index),
            FieldKey::StageCommand(index) => write!(f, "pipelineStageCommand-{}", index),
            FieldKey::Submit => write!(f, "submit"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<FieldKey, String>);

impl FormErrors {
    pub fn insert(&mut self, key: FieldKey, message: impl Into<String>) {
        self.0.insert(key, message.into());
    }

    pub fn remove(&mut self, key: &FieldKey) {
        self.0.remove(key);
    }

    #[cfg(test)]
    pub fn get(&self, key: &FieldKey) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn retain_non_stage(&mut self) {
        self.0
            .retain(|key, _| !matches!(key, FieldKey::StageName(_) | FieldKey::StageCommand(_)));
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, (key, message)) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", key, message)?;
        }

        Ok(())
    }
}

impl std::error::Error for FormErrors {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageForm {
    pub name: String,
    pub command: String,
}

impl std::str::FromStr for StageForm {
    type Err = String;

    /// `name:command`, split at the first colon.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, command) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <name>:<command>, got \"{}\"", s))?;

        Ok(StageForm {
            name: name.trim().to_string(),
            command: command.trim().to_string(),
        })
    }
}

impl From<&PipelineStage> for StageForm {
    fn from(stage: &PipelineStage) -> Self {
        StageForm {
            name: stage.name.clone(),
            command: stage.command.clone(),
        }
    }
}

impl From<&StageForm> for PipelineStage {
    fn from(stage: &StageForm) -> Self {
        PipelineStage {
            id: None,
            name: stage.name.clone(),
            command: stage.command.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageUpdate {
    Name { index: usize, value: String },
    Command { index: usize, value: String },
    Add,
    Remove(usize),
}

fn apply_stage_update(stages: &mut Vec<StageForm>, update: StageUpdate) -> Option<FieldKey> {
    match update {
        StageUpdate::Name { index, value } => {
            stages.get_mut(index)?.name = value;
            Some(FieldKey::StageName(index))
        }
        StageUpdate::Command { index, value } => {
            stages.get_mut(index)?.command = value;
            Some(FieldKey::StageCommand(index))
        }
        StageUpdate::Add => {
            stages.push(StageForm::default());
            None
        }
        StageUpdate::Remove(index) => {
            if stages.len() > 1 && index < stages.len() {
                stages.remove(index);
            }
            None
        }
    }
}

/// Updates that turn a stage list of `current_len` entries into `stages`.
pub fn replace_stages(current_len: usize, stages: &[StageForm]) -> Vec<StageUpdate> {
    let mut updates: Vec<StageUpdate> = (1..current_len).rev().map(StageUpdate::Remove).collect();

    for (index, stage) in stages.iter().enumerate() {
        if index > 0 || current_len == 0 {
            updates.push(StageUpdate::Add);
        }
        updates.push(StageUpdate::Name {
            index,
            value: stage.name.clone(),
        });
        updates.push(StageUpdate::Command {
            index,
            value: stage.command.clone(),
        });
    }

    updates
}

fn validate_stages(stages: &[StageForm], errors: &mut FormErrors) {
    for (index, stage) in stages.iter().enumerate() {
        if stage.name.trim().is_empty() {
            errors.insert(
                FieldKey::StageName(index),
                format!("Stage {} name is required", index + 1),
            );
        }

        if stage.command.trim().is_empty() {
            errors.insert(
                FieldKey::StageCommand(index),
                format!("Stage {} command is required", index + 1),
            );
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormUpdate {
    ProjectName(String),
    Description(String),
    GithubUrl(String),
    Branch(String),
    ShellCommand(String),
    EnvironmentVariables(String),
    PipelineName(String),
    Stage(StageUpdate),
}

/// State of the new-project form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectForm {
    pub project_name: String,
    pub description: String,
    pub github_url: String,
    pub branch: String,
    pub shell_command: String,
    pub environment_variables: String,
    pub pipeline_name: String,
    pub stages: Vec<StageForm>,
    pub errors: FormErrors,
}

impl Default for ProjectForm {
    fn default() -> Self {
        ProjectForm {
            project_name: String::new(),
            description: String::new(),
            github_url: String::new(),
            branch: "main".to_string(),
            shell_command: String::new(),
            environment_variables: String::new(),
            pipeline_name: String::new(),
            stages: vec![StageForm::default()],
            errors: FormErrors::default(),
        }
    }
}

impl ProjectForm {
    /// Applies one edit and clears the error recorded for the edited field.
    pub fn apply(&mut self, update: FormUpdate) {
        let field = match update {
            FormUpdate::ProjectName(value) => {
                self.project_name = value;
                Some(FieldKey::ProjectName)
            }
            FormUpdate::Description(value) => {
                self.description = value;
                Some(FieldKey::Description)
            }
            FormUpdate::GithubUrl(value) => {
                self.github_url = value;
                Some(FieldKey::GithubUrl)
            }
            FormUpdate::Branch(value) => {
                self.branch = value;
                Some(FieldKey::Branch)
            }
            FormUpdate::ShellCommand(value) => {
                self.shell_command = value;
                Some(FieldKey::ShellCommand)
            }
            FormUpdate::EnvironmentVariables(value) => {
                self.environment_variables = value;
                None
            }
            FormUpdate::PipelineName(value) => {
                self.pipeline_name = value;
                Some(FieldKey::PipelineName)
            }
            FormUpdate::Stage(update) => {
                let structural = matches!(update, StageUpdate::Add | StageUpdate::Remove(_));
                let field = apply_stage_update(&mut self.stages, update);
                if structural {
                    self.errors.retain_non_stage();
                }
                field
            }
        };

        if let Some(field) = field {
            self.errors.remove(&field);
        }
    }

    pub fn validate(&mut self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();

        if self.project_name.trim().is_empty() {
            errors.insert(FieldKey::ProjectName, "Project name is required");
        }

        if self.shell_command.trim().is_empty() {
            errors.insert(FieldKey::ShellCommand, "Build command is required");
        }

        if !self.github_url.trim().is_empty() && !self.github_url.contains("github.com") {
            errors.insert(FieldKey::GithubUrl, "Please enter a valid GitHub URL");
        }

        validate_stages(&self.stages, &mut errors);

        self.errors = errors.clone();
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Validates and builds the create body. Nothing is built when any field
    /// is invalid.
    pub fn submit(&mut self, user_id: &str) -> Result<CreateProjectRequest, FormErrors> {
        self.validate()?;
        Ok(self.to_request(user_id))
    }

    /// Records a rejection of the submitted form by the backend.
    pub fn reject(&mut self, message: &str, detail: &str) -> FormErrors {
        self.errors
            .insert(FieldKey::Submit, format!("{} = [{}]", message, detail));
        self.errors.clone()
    }

    pub fn to_request(&self, user_id: &str) -> CreateProjectRequest {
        let pipeline_name = non_empty(&self.pipeline_name).unwrap_or_else(|| self.project_name.clone());

        CreateProjectRequest {
            project_name: self.project_name.trim().to_string(),
            description: self.description.clone(),
            user_id: user_id.to_string(),
            project_config: ProjectConfig {
                id: None,
                github_url: non_empty(&self.github_url),
                shell_command: self.shell_command.clone(),
                branch: non_empty(&self.branch).unwrap_or_else(|| "main".to_string()),
                environment_variables: non_empty(&self.environment_variables),
            },
            pipeline_config: PipelineUpdateRequest {
                pipeline_request: PipelineRequest {
                    name: pipeline_name,
                    stages: self.stages.iter().map(PipelineStage::from).collect(),
                },
            },
        }
    }
}

/// Edit form for the repository and build settings of an existing project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigForm {
    pub github_url: String,
    pub branch: String,
    pub shell_command: String,
    pub environment_variables: String,
}

impl ConfigForm {
    pub fn from_config(config: &ProjectConfig) -> Self {
        ConfigForm {
            github_url: config.github_url.clone().unwrap_or_default(),
            branch: config.branch.clone(),
            shell_command: config.shell_command.clone(),
            environment_variables: config.environment_variables.clone().unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();

        if self.branch.trim().is_empty() {
            errors.insert(FieldKey::Branch, "Branch is required");
        }

        if self.shell_command.trim().is_empty() {
            errors.insert(FieldKey::ShellCommand, "Build command is required");
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    pub fn into_config(self, id: Option<i64>) -> ProjectConfig {
        ProjectConfig {
            id,
            github_url: non_empty(&self.github_url),
            shell_command: self.shell_command,
            branch: self.branch.trim().to_string(),
            environment_variables: non_empty(&self.environment_variables),
        }
    }
}

/// Edit form for the stages of an existing pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineForm {
    pub name: String,
    pub stages: Vec<StageForm>,
}

impl PipelineForm {
    pub fn from_config(config: &PipelineConfig) -> Self {
        PipelineForm {
            name: config.name.clone(),
            stages: config.stages.iter().map(StageForm::from).collect(),
        }
    }

    pub fn apply(&mut self, update: StageUpdate) {
        apply_stage_update(&mut self.stages, update);
    }

    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();

        if self.name.trim().is_empty() {
            errors.insert(FieldKey::PipelineName, "Pipeline name is required");
        }

        validate_stages(&self.stages, &mut errors);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    pub fn into_request(self) -> PipelineUpdateRequest {
        PipelineUpdateRequest {
            pipeline_request: PipelineRequest {
                name: self.name,
                stages: self.stages.iter().map(PipelineStage::from).collect(),
            },
        }
    }
}

/// Message shown for a rejected repository check.
pub fn repository_error(message: &str, detail: &str) -> String {
    if detail.contains("private") {
        PRIVATE_REPOSITORY.to_string()
    } else if message.is_empty() {
        "Failed to verify repository URL".to_string()
    } else {
        message.to_string()
    }
}

/// `KEY=VALUE` pairs, blank lines and `#` comments skipped.
pub fn parse_environment(text: &str) -> Vec<(String, String)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| match line.split_once('=') {
            Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
            None => (line.to_string(), String::new()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form() -> ProjectForm {
        let mut form = ProjectForm::default();
        form.apply(FormUpdate::ProjectName("demo".to_string()));
        form.apply(FormUpdate::ShellCommand("npm test".to_string()));
        form.apply(FormUpdate::Stage(StageUpdate::Name {
            index: 0,
            value: "build".to_string(),
        }));
        form.apply(FormUpdate::Stage(StageUpdate::Command {
            index: 0,
            value: "npm run build".to_string(),
        }));
        form
    }

    #[test]
    fn test_empty_build_command_is_rejected() {
        let mut form = filled_form();
        form.apply(FormUpdate::ShellCommand("   ".to_string()));

        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get(&FieldKey::ShellCommand), Some("Build command is required"));
        assert_eq!(FieldKey::ShellCommand.to_string(), "projectConfig.shellCommand");
    }

    #[test]
    fn test_stage_errors_are_keyed_by_index() {
        let mut form = filled_form();
        form.apply(FormUpdate::Stage(StageUpdate::Add));

        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get(&FieldKey::StageName(1)), Some("Stage 2 name is required"));
        assert_eq!(
            errors.get(&FieldKey::StageCommand(1)),
            Some("Stage 2 command is required")
        );
        assert_eq!(FieldKey::StageName(1).to_string(), "pipelineStageName-1");
    }

    #[test]
    fn test_non_github_url_is_rejected() {
        let mut form = filled_form();
        form.apply(FormUpdate::GithubUrl("https://gitlab.com/a/b".to_string()));
        assert!(form.validate().unwrap_err().get(&FieldKey::GithubUrl).is_some());

        form.apply(FormUpdate::GithubUrl("https://github.com/a/b".to_string()));
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_editing_clears_field_error() {
        let mut form = ProjectForm::default();
        assert!(form.validate().is_err());
        assert!(form.errors.get(&FieldKey::ProjectName).is_some());

        form.apply(FormUpdate::ProjectName("demo".to_string()));
        assert!(form.errors.get(&FieldKey::ProjectName).is_none());
        assert!(form.errors.get(&FieldKey::ShellCommand).is_some());
    }

    #[test]
    fn test_out_of_range_stage_update_is_ignored() {
        let mut form = filled_form();
        let before = form.clone();
        form.apply(FormUpdate::Stage(StageUpdate::Command {
            index: 4,
            value: "rm -rf /".to_string(),
        }));

        assert_eq!(form.stages, before.stages);
    }

    #[test]
    fn test_last_stage_cannot_be_removed() {
        let mut form = filled_form();
        form.apply(FormUpdate::Stage(StageUpdate::Remove(0)));
        assert_eq!(form.stages.len(), 1);

        form.apply(FormUpdate::Stage(StageUpdate::Add));
        form.apply(FormUpdate::Stage(StageUpdate::Remove(0)));
        assert_eq!(form.stages, vec![StageForm::default()]);
    }

    #[test]
    fn test_request_drops_empty_optionals() {
        let request = filled_form().to_request("u1");

        assert_eq!(request.user_id, "u1");
        assert_eq!(request.project_config.github_url, None);
        assert_eq!(request.project_config.environment_variables, None);
        assert_eq!(request.project_config.branch, "main");
        assert_eq!(request.pipeline_config.pipeline_request.name, "demo");
        assert_eq!(request.pipeline_config.pipeline_request.stages[0].command, "npm run build");
    }

    #[test]
    fn test_submit_builds_nothing_for_invalid_form() {
        let mut form = filled_form();
        form.apply(FormUpdate::ShellCommand(String::new()));

        let errors = form.submit("u1").unwrap_err();
        assert_eq!(errors.get(&FieldKey::ShellCommand), Some("Build command is required"));

        form.apply(FormUpdate::ShellCommand("npm test".to_string()));
        assert_eq!(form.submit("u1").unwrap().project_config.shell_command, "npm test");
    }

    #[test]
    fn test_reject_is_keyed_to_submit() {
        let mut form = filled_form();
        let errors = form.reject("Invalid github url", "Repository not found");

        assert_eq!(
            errors.get(&FieldKey::Submit),
            Some("Invalid github url = [Repository not found]")
        );
        assert_eq!(errors.to_string(), "submit: Invalid github url = [Repository not found]");
    }

    #[test]
    fn test_replace_stages_through_updates() {
        let stages = vec![
            StageForm {
                name: "build".to_string(),
                command: "make".to_string(),
            },
            StageForm {
                name: "test".to_string(),
                command: "make test".to_string(),
            },
        ];

        let mut form = ProjectForm::default();
        for update in replace_stages(form.stages.len(), &stages) {
            form.apply(FormUpdate::Stage(update));
        }
        assert_eq!(form.stages, stages);

        let mut pipeline = PipelineForm {
            name: "demo".to_string(),
            stages: vec![StageForm::default(); 3],
        };
        for update in replace_stages(pipeline.stages.len(), &stages[1..]) {
            pipeline.apply(update);
        }
        assert_eq!(pipeline.stages, stages[1..].to_vec());
    }

    #[test]
    fn test_config_form_requires_branch_and_command() {
        let form = ConfigForm::default();
        let errors = form.validate().unwrap_err();

        assert_eq!(errors.get(&FieldKey::Branch), Some("Branch is required"));
        assert_eq!(errors.get(&FieldKey::ShellCommand), Some("Build command is required"));
    }

    #[test]
    fn test_pipeline_form_roundtrip() {
        let config = PipelineConfig {
            id: Some(3),
            name: "demo".to_string(),
            stages: vec![PipelineStage {
                id: Some(10),
                name: "test".to_string(),
                command: "cargo test".to_string(),
            }],
        };

        let mut form = PipelineForm::from_config(&config);
        form.apply(StageUpdate::Add);
        form.apply(StageUpdate::Name {
            index: 1,
            value: "lint".to_string(),
        });
        form.apply(StageUpdate::Command {
            index: 1,
            value: "cargo clippy".to_string(),
        });
        assert!(form.validate().is_ok());

        let request = form.into_request();
        let names: Vec<&str> = request
            .pipeline_request
            .stages
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["test", "lint"]);
    }

    #[test]
    fn test_stage_from_str() {
        let stage: StageForm = "deploy: scp dist host:/srv".parse().unwrap();
        assert_eq!(stage.name, "deploy");
        assert_eq!(stage.command, "scp dist host:/srv");
        assert!("no-colon".parse::<StageForm>().is_err());
    }

    #[test]
    fn test_private_repository_is_remapped() {
        assert_eq!(
            repository_error("Invalid github url", "The repo is private Authentication is required"),
            PRIVATE_REPOSITORY
        );
        assert_eq!(
            repository_error("Invalid github url", "Invalid GitHub URL: not found"),
            "Invalid github url"
        );
    }

    #[test]
    fn test_parse_environment() {
        let vars = parse_environment("NODE_ENV=production\n\n# comment\nAPI_URL=https://api.example.com?a=b\nFLAG");
        assert_eq!(
            vars,
            vec![
                ("NODE_ENV".to_string(), "production".to_string()),
                ("API_URL".to_string(), "https://api.example.com?a=b".to_string()),
                ("FLAG".to_string(), String::new()),
            ]
        );
    }
}
