/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use super::*;
use crate::config::*;
use crate::form::*;
use crate::input::*;
use crate::logbook::LogBook;
use crate::poller::{self, PollEvent, PollState};
use crate::schedule::{Reminder, ScheduleRequest, reminder_lead};
use anyhow::{Result, anyhow, bail};
use clap::Subcommand;
use connector::*;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List projects of the logged-in user.
    List,
    Select {
        project: i64,
    },
    Show {
        #[arg(short, long)]
        project: Option<i64>,
    },
    Create {
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short = 'c', long)]
        description: Option<String>,
        #[arg(short, long)]
        repository: Option<String>,
        #[arg(short, long)]
        branch: Option<String>,
        /// Shell command that builds the project.
        #[arg(short = 'x', long)]
        command: Option<String>,
        /// Environment variables, one KEY=VALUE per entry.
        #[arg(short, long = "env")]
        env: Vec<String>,
        #[arg(long)]
        pipeline_name: Option<String>,
        #[arg(short, long = "stage", value_name = "NAME:COMMAND")]
        stages: Vec<StageForm>,
    },
    /// Edit repository and build settings.
    Edit {
        #[arg(short, long)]
        project: Option<i64>,
        #[arg(short, long)]
        repository: Option<String>,
        #[arg(short, long)]
        branch: Option<String>,
        #[arg(short = 'x', long)]
        command: Option<String>,
        #[arg(short, long = "env")]
        env: Vec<String>,
    },
    /// Edit pipeline stages.
    Pipeline {
        #[arg(short, long)]
        project: Option<i64>,
        #[arg(short, long)]
        name: Option<String>,
        /// Replaces all stages.
        #[arg(short, long = "stage", value_name = "NAME:COMMAND")]
        stages: Vec<StageForm>,
        #[arg(short, long, value_name = "NAME:COMMAND")]
        add: Vec<StageForm>,
        /// Removes the stage at this position, counting from 1.
        #[arg(long, value_name = "POSITION")]
        remove: Vec<usize>,
    },
    /// Check that a GitHub repository is reachable.
    Validate {
        url: String,
    },
    Execute {
        #[arg(short, long)]
        project: Option<i64>,
        #[arg(short, long)]
        follow: bool,
    },
    /// Schedule a build at a local date and time, e.g. 2025-05-28T15:56.
    Schedule {
        datetime: String,
        #[arg(short, long)]
        project: Option<i64>,
        /// Stay in the foreground and announce the build a minute ahead.
        #[arg(short, long)]
        wait: bool,
    },
    Logs {
        #[arg(short, long)]
        project: Option<i64>,
        #[arg(short, long)]
        follow: bool,
    },
    ClearLogs {
        #[arg(short, long)]
        project: Option<i64>,
    },
    Builds {
        #[arg(short, long)]
        project: Option<i64>,
    },
    /// Print the URL to register as GitHub push webhook.
    Webhook {
        #[arg(short, long)]
        project: Option<i64>,
    },
    Delete {
        #[arg(short, long)]
        project: Option<i64>,
        #[arg(short, long)]
        yes: bool,
    },
}

pub async fn handle(cmd: Commands) -> Result<()> {
    let ctx = Context::load()?;

    match cmd {
        Commands::List => {
            let user = ctx.user()?;
            let projects = expect_ok(
                projects::get_all(&ctx.request_config()?, &user.user_id).await,
                "Failed to get projects",
            )?;

            if projects.is_empty() {
                println!("You have no projects.");
            } else {
                for project in &projects {
                    println!(
                        "{}: {} [{}]",
                        project.project_id, project.project_name, project.project_status
                    );
                }
            }

            let summary = ProjectSummary::from_projects(&projects);
            println!();
            println!("Total Projects: {}", summary.total);
            println!("Successful Builds: {}%", summary.success_rate);
            println!("Branches Monitored: {}", summary.branches);
        }

        Commands::Select { project } => {
            let request_config = ctx.request_config()?;
            let project = expect_ok(
                projects::get_project(&request_config, project).await,
                "Failed to get project",
            )?;

            set_get_value(
                ConfigKey::SelectedProject,
                Some(project.project_id.to_string()),
                true,
            )?;
            println!("Project {} selected.", project.project_name);
        }

        Commands::Show { project } => {
            let project_id = ctx.project_id(project)?;
            let request_config = ctx.request_config()?;
            let project = expect_ok(
                projects::get_project(&request_config, project_id).await,
                "Failed to get project",
            )?;

            print_project(&project);

            let builds = expect_ok(
                builds::get_all_builds(&request_config, project_id).await,
                "Failed to get builds",
            )?;

            println!();
            println!("===== Latest Builds =====");
            if builds.is_empty() {
                println!("No builds.");
            }
            for build in builds.iter().take(5) {
                print_build(build);
            }
        }

        Commands::Create {
            name,
            description,
            repository,
            branch,
            command,
            env,
            pipeline_name,
            stages,
        } => {
            let user = ctx.user()?;
            let request_config = ctx.request_config()?;

            let mut input_fields = vec![
                ("Name", name),
                ("Description", description),
                ("Repository", repository),
                ("Branch", branch.or(Some("main".to_string()))),
                ("Build Command", command),
                ("Pipeline Name", pipeline_name),
            ];
            if stages.is_empty() {
                input_fields.push(("Stage Name", None));
                input_fields.push(("Stage Command", None));
            }

            let input = handle_input(
                input_fields
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
                true,
                &["Description", "Repository", "Pipeline Name"],
            )?;
            let value = |key: &str| input.get(key).cloned().unwrap_or_default();

            let mut form = ProjectForm::default();
            form.apply(FormUpdate::ProjectName(value("Name")));
            form.apply(FormUpdate::Description(value("Description")));
            form.apply(FormUpdate::GithubUrl(value("Repository")));
            form.apply(FormUpdate::Branch(value("Branch")));
            form.apply(FormUpdate::ShellCommand(value("Build Command")));
            form.apply(FormUpdate::EnvironmentVariables(env.join("\n")));
            form.apply(FormUpdate::PipelineName(value("Pipeline Name")));

            let stages = if stages.is_empty() {
                vec![StageForm {
                    name: value("Stage Name"),
                    command: value("Stage Command"),
                }]
            } else {
                stages
            };
            for update in replace_stages(form.stages.len(), &stages) {
                form.apply(FormUpdate::Stage(update));
            }

            let project = submit_project(&request_config, &mut form, &user.user_id).await?;

            set_get_value(
                ConfigKey::SelectedProject,
                Some(project.project_id.to_string()),
                true,
            )?;
            info!(project_id = project.project_id, "created project");
            println!("Project {} created with id {}.", project.project_name, project.project_id);
        }

        Commands::Edit {
            project,
            repository,
            branch,
            command,
            env,
        } => {
            let project_id = ctx.project_id(project)?;
            let request_config = ctx.request_config()?;
            let current = expect_ok(
                projects::get_project(&request_config, project_id).await,
                "Failed to get project",
            )?;
            let current_config = current.project_config.unwrap_or_else(|| ProjectConfig {
                id: None,
                github_url: None,
                shell_command: String::new(),
                branch: "main".to_string(),
                environment_variables: None,
            });
            let config_id = current_config.id;
            let mut form = ConfigForm::from_config(&current_config);

            let edited = repository.is_some() || branch.is_some() || command.is_some() || !env.is_empty();
            if edited {
                form.github_url = repository.unwrap_or(form.github_url);
                form.branch = branch.unwrap_or(form.branch);
                form.shell_command = command.unwrap_or(form.shell_command);
                if !env.is_empty() {
                    form.environment_variables = env.join("\n");
                }
            } else {
                let input = handle_input(
                    vec![
                        ("Repository".to_string(), Some(form.github_url.clone())),
                        ("Branch".to_string(), Some(form.branch.clone())),
                        ("Build Command".to_string(), Some(form.shell_command.clone())),
                    ],
                    false,
                    &["Repository", "Branch", "Build Command"],
                )?;
                let value = |key: &str| input.get(key).cloned().unwrap_or_default();

                form.github_url = value("Repository");
                form.branch = value("Branch");
                form.shell_command = value("Build Command");
            }

            form.validate().map_err(invalid)?;

            if !form.github_url.trim().is_empty() && Some(form.github_url.trim()) != current_config.github_url.as_deref() {
                check_repository(&request_config, form.github_url.trim()).await?;
            }

            expect_ok(
                projects::post_update_project_info(&request_config, project_id, &form.into_config(config_id)).await,
                "Failed to update project",
            )?;
            println!("Project edited.");
        }

        Commands::Pipeline {
            project,
            name,
            stages,
            add,
            remove,
        } => {
            let project_id = ctx.project_id(project)?;
            let request_config = ctx.request_config()?;
            let current = expect_ok(
                projects::get_project(&request_config, project_id).await,
                "Failed to get project",
            )?;

            let pipeline = current
                .pipeline_config
                .ok_or_else(|| anyhow!("Project {} has no pipeline.", project_id))?;
            let pipeline_id = pipeline
                .id
                .ok_or_else(|| anyhow!("Pipeline of project {} has no id.", project_id))?;

            let mut form = PipelineForm::from_config(&pipeline);
            if let Some(name) = name {
                form.name = name;
            }
            if !stages.is_empty() {
                for update in replace_stages(form.stages.len(), &stages) {
                    form.apply(update);
                }
            }

            let mut positions = remove;
            positions.sort_unstable_by(|a, b| b.cmp(a));
            positions.dedup();
            for position in positions {
                if position == 0 || position > form.stages.len() {
                    bail!("No stage at position {}.", position);
                }
                form.apply(StageUpdate::Remove(position - 1));
            }

            for stage in add {
                form.apply(StageUpdate::Add);
                let index = form.stages.len() - 1;
                form.apply(StageUpdate::Name {
                    index,
                    value: stage.name,
                });
                form.apply(StageUpdate::Command {
                    index,
                    value: stage.command,
                });
            }

            form.validate().map_err(invalid)?;

            let updated = expect_ok(
                projects::post_update_pipeline(&request_config, pipeline_id, &form.into_request()).await,
                "Failed to update pipeline",
            )?;

            if let Some(pipeline) = updated.pipeline_config {
                print_stages(&pipeline);
            }
            println!("Pipeline updated.");
        }

        Commands::Validate { url } => {
            check_repository(&ctx.request_config()?, &url).await?;
            println!("Repository is valid.");
        }

        Commands::Execute { project, follow } => {
            let project_id = ctx.project_id(project)?;
            let request_config = ctx.request_config()?;

            expect_ok(
                execution::post_execute(&request_config, project_id).await,
                "Failed to start build",
            )?;
            println!("Build started.");

            if follow {
                follow_logs(request_config, project_id).await?;
            }
        }

        Commands::Schedule {
            datetime,
            project,
            wait,
        } => {
            let project_id = ctx.project_id(project)?;
            let request = ScheduleRequest::parse(&datetime)?;

            expect_ok(
                execution::post_schedule_execution(&ctx.request_config()?, project_id, &request.raw).await,
                "Failed to schedule build",
            )?;
            println!("Build scheduled for {}.", request.at.format("%Y-%m-%d %H:%M"));

            if wait {
                match reminder_lead(request.at, chrono::Local::now().naive_local()) {
                    Some(lead) => {
                        debug!(lead_secs = lead.as_secs(), "arming schedule reminder");
                        let mut reminder = Reminder::arm(lead);
                        tokio::select! {
                            fired = reminder.wait() => {
                                if fired {
                                    println!("Scheduled build for project {} starts in one minute.", project_id);
                                }
                            }
                            _ = tokio::signal::ctrl_c() => {}
                        }
                    }
                    None => println!("Build starts in less than a minute."),
                }
            }
        }

        Commands::Logs { project, follow } => {
            let project_id = ctx.project_id(project)?;
            let request_config = ctx.request_config()?;

            if follow {
                follow_logs(request_config, project_id).await?;
            } else {
                let entries = expect_ok(
                    logs::get_all_logs(&request_config, project_id).await,
                    "Failed to get logs",
                )?;
                let mut book = LogBook::new();
                book.replace(entries);
                debug!(entries = book.len(), last_id = ?book.last_id(), "loaded logs");

                if book.is_empty() {
                    println!("No logs.");
                }
                print_logs(book.entries());
            }
        }

        Commands::ClearLogs { project } => {
            let project_id = ctx.project_id(project)?;
            expect_ok(
                logs::delete_logs(&ctx.request_config()?, project_id).await,
                "Failed to clear logs",
            )?;
            println!("Logs cleared.");
        }

        Commands::Builds { project } => {
            let project_id = ctx.project_id(project)?;
            let builds = expect_ok(
                builds::get_all_builds(&ctx.request_config()?, project_id).await,
                "Failed to get builds",
            )?;

            if builds.is_empty() {
                println!("No builds.");
            }
            for build in &builds {
                print_build(build);
            }
        }

        Commands::Webhook { project } => {
            let project_id = ctx.project_id(project)?;
            println!("{}", projects::webhook_url(&ctx.request_config()?, project_id));
        }

        Commands::Delete { project, yes } => {
            let project_id = ctx.project_id(project)?;

            if !yes && !confirm(&format!("Delete project {}?", project_id))? {
                println!("Aborted.");
                return Ok(());
            }

            expect_ok(
                projects::delete_project(&ctx.request_config()?, project_id).await,
                "Failed to delete project",
            )?;

            if get_value(&ctx.config, ConfigKey::SelectedProject) == Some(project_id.to_string()) {
                unset_value(ConfigKey::SelectedProject)?;
            }
            println!("Project deleted.");
        }
    }

    Ok(())
}

fn invalid(errors: FormErrors) -> anyhow::Error {
    anyhow!("Validation failed:\n{}", errors)
}

/// Validates the form, checks the repository and creates the project. No
/// request is issued for an invalid form.
async fn submit_project(
    request_config: &RequestConfig,
    form: &mut ProjectForm,
    user_id: &str,
) -> Result<Project> {
    let request = form.submit(user_id).map_err(invalid)?;

    if let Some(url) = request.project_config.github_url.as_deref() {
        check_repository(request_config, url).await?;
    }

    match projects::post_create(request_config, &request).await {
        ApiResponse::Ok { data, .. } => Ok(data),
        ApiResponse::Err { message, detail } => {
            bail!("Project creation failed:\n{}", form.reject(&message, &detail))
        }
    }
}

async fn check_repository(request_config: &RequestConfig, url: &str) -> Result<()> {
    match projects::post_validate_github_url(request_config, url).await {
        ApiResponse::Ok { data: true, .. } => Ok(()),
        ApiResponse::Ok { data: false, .. } => bail!("Please enter a valid GitHub URL"),
        ApiResponse::Err { message, detail } => bail!("{}", repository_error(&message, &detail)),
    }
}

/// Prints the full log, then streams new lines while the project runs.
async fn follow_logs(request_config: RequestConfig, project_id: i64) -> Result<()> {
    let project = expect_ok(
        projects::get_project(&request_config, project_id).await,
        "Failed to get project",
    )?;

    let mut book = LogBook::new();
    book.replace(expect_ok(
        logs::get_all_logs(&request_config, project_id).await,
        "Failed to get logs",
    )?);
    print_logs(book.entries());
    debug!(last_id = ?book.last_id(), "following logs");

    let logbook = Arc::new(Mutex::new(book));
    let (tx, mut rx) = mpsc::channel(32);
    let handle = poller::spawn(Arc::new(request_config), &project, logbook, tx);

    if handle.state() == PollState::Idle {
        println!("Project is not running ({}).", project.project_status);
        return Ok(());
    }

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(PollEvent::Project(project)) => {
                    debug!(status = %project.project_status, "project refreshed");
                }
                Some(PollEvent::Logs(entries)) => print_logs(&entries),
                Some(PollEvent::Finished(status)) => {
                    println!("Build finished: {}", status);
                    break;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                handle.stop();
                break;
            }
        }
    }

    handle.join().await;
    Ok(())
}

/// Figures shown below the project list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ProjectSummary {
    total: usize,
    /// Share of projects whose last build succeeded, in whole percent.
    success_rate: u32,
    /// Distinct configured branches.
    branches: usize,
}

impl ProjectSummary {
    fn from_projects(projects: &[Project]) -> Self {
        let total = projects.len();
        let succeeded = projects
            .iter()
            .filter(|p| p.project_status == ProjectStatus::Success)
            .count();
        let success_rate = if total == 0 {
            0
        } else {
            (succeeded as f64 / total as f64 * 100.0).round() as u32
        };
        let branches = projects
            .iter()
            .filter_map(|p| p.project_config.as_ref())
            .map(|c| c.branch.as_str())
            .filter(|b| !b.is_empty())
            .collect::<std::collections::HashSet<_>>()
            .len();

        ProjectSummary {
            total,
            success_rate,
            branches,
        }
    }
}

/// Entries arrive newest first; the terminal reads oldest first.
fn print_logs(entries: &[LogEntry]) {
    for entry in entries.iter().rev() {
        println!("[{}] {}", entry.log_time.format("%Y-%m-%d %H:%M:%S"), entry.log);
    }
}

fn print_build(build: &BuildHistory) {
    println!(
        "#{} {} {} ({})",
        build.id,
        build.status,
        build.timestamp.format("%Y-%m-%d %H:%M:%S"),
        build.execution_time.as_deref().unwrap_or("-")
    );
}

fn print_stages(pipeline: &PipelineConfig) {
    println!("===== Pipeline {} =====", pipeline.name);
    for (i, stage) in pipeline.stages.iter().enumerate() {
        println!("{}. {}: {}", i + 1, stage.name, stage.command);
    }
}

fn print_project(project: &Project) {
    println!("===== Project =====");
    println!("ID: {}", project.project_id);
    println!("Name: {}", project.project_name);
    println!("Description: {}", project.description.as_deref().unwrap_or(""));
    println!("Status: {}", project.project_status);
    println!("Last Run: {}", project.last_run.as_deref().unwrap_or("never"));
    println!("Last Build Time: {}", project.last_build_time.as_deref().unwrap_or("-"));
    if let Some(created) = project.create_date_time {
        println!("Created: {}", created.format("%Y-%m-%d %H:%M"));
    }

    if let Some(config) = &project.project_config {
        println!();
        println!("===== Configuration =====");
        println!("Repository: {}", config.github_url.as_deref().unwrap_or("-"));
        println!("Branch: {}", config.branch);
        println!("Build Command: {}", config.shell_command);

        let vars = parse_environment(config.environment_variables.as_deref().unwrap_or(""));
        if !vars.is_empty() {
            println!("Environment:");
            for (key, value) in vars {
                println!("  {}={}", key, value);
            }
        }
    }

    if let Some(pipeline) = &project.pipeline_config {
        println!();
        print_stages(pipeline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn project(id: i64, status: ProjectStatus, branch: Option<&str>) -> Project {
        Project {
            project_id: id,
            user_id: "u1".to_string(),
            description: None,
            project_status: status,
            last_run: None,
            last_build_time: None,
            project_name: format!("project-{}", id),
            create_date_time: None,
            project_config: branch.map(|branch| ProjectConfig {
                id: Some(id),
                github_url: None,
                shell_command: "make".to_string(),
                branch: branch.to_string(),
                environment_variables: None,
            }),
            pipeline_config: None,
        }
    }

    #[test]
    fn test_summary_of_no_projects() {
        assert_eq!(
            ProjectSummary::from_projects(&[]),
            ProjectSummary {
                total: 0,
                success_rate: 0,
                branches: 0,
            }
        );
    }

    #[test]
    fn test_summary_rounds_rate_and_counts_distinct_branches() {
        let projects = vec![
            project(1, ProjectStatus::Success, Some("main")),
            project(2, ProjectStatus::Failed, Some("main")),
            project(3, ProjectStatus::Success, Some("develop")),
            project(4, ProjectStatus::Running, None),
            project(5, ProjectStatus::Pending, Some("")),
            project(6, ProjectStatus::Success, Some("develop")),
        ];

        let summary = ProjectSummary::from_projects(&projects);
        assert_eq!(summary.total, 6);
        assert_eq!(summary.success_rate, 50);
        assert_eq!(summary.branches, 2);

        let summary = ProjectSummary::from_projects(&projects[..3]);
        assert_eq!(summary.success_rate, 67);
    }

    #[tokio::test]
    async fn test_invalid_form_issues_no_request() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = connections.clone();
        tokio::spawn(async move {
            while listener.accept().await.is_ok() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        let request_config = RequestConfig {
            project_url: format!("http://{}/project", addr),
            execution_url: format!("http://{}", addr),
            auth_url: format!("http://{}/auth", addr),
            token: Some("jwt".to_string()),
        };

        let mut form = ProjectForm::default();
        form.apply(FormUpdate::ProjectName("demo".to_string()));
        form.apply(FormUpdate::GithubUrl("https://github.com/a/b".to_string()));
        let stages: Vec<StageForm> = vec!["build:make".parse().unwrap()];
        for update in replace_stages(form.stages.len(), &stages) {
            form.apply(FormUpdate::Stage(update));
        }

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            submit_project(&request_config, &mut form, "u1"),
        )
        .await
        .unwrap()
        .unwrap_err();

        assert!(err.to_string().contains("projectConfig.shellCommand: Build command is required"));
        tokio::task::yield_now().await;
        assert_eq!(connections.load(Ordering::SeqCst), 0);
    }
}
