/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Refreshes a running project and its log lines on a fixed period until the
//! project leaves `RUNNING` or the handle is dropped.

use crate::logbook::LogBook;
use connector::{ApiResponse, LogEntry, Project, ProjectStatus, RequestConfig};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

pub trait ProjectSource: Send + Sync + 'static {
    fn fetch_project(&self, project_id: i64) -> impl Future<Output = ApiResponse<Project>> + Send;

    fn fetch_new_logs(
        &self,
        project_id: i64,
    ) -> impl Future<Output = ApiResponse<Vec<LogEntry>>> + Send;
}

impl ProjectSource for RequestConfig {
    async fn fetch_project(&self, project_id: i64) -> ApiResponse<Project> {
        connector::projects::get_project(self, project_id).await
    }

    async fn fetch_new_logs(&self, project_id: i64) -> ApiResponse<Vec<LogEntry>> {
        connector::logs::get_logs(self, project_id).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    Project(Project),
    Logs(Vec<LogEntry>),
    Finished(ProjectStatus),
}

pub struct PollHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    fn idle() -> Self {
        PollHandle {
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    pub fn state(&self) -> PollState {
        match &self.task {
            Some(task) if !task.is_finished() && !self.cancel.is_cancelled() => PollState::Polling,
            _ => PollState::Idle,
        }
    }

    /// Stops future polls. A request already in flight runs to completion.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                debug!(error = %e, "poll task ended abnormally");
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Starts polling when `project` is running, otherwise returns an idle handle
/// without issuing any request.
pub fn spawn<S: ProjectSource>(
    source: Arc<S>,
    project: &Project,
    logbook: Arc<Mutex<LogBook>>,
    events: mpsc::Sender<PollEvent>,
) -> PollHandle {
    if !project.project_status.is_running() {
        return PollHandle::idle();
    }

    let cancel = CancellationToken::new();
    let task = tokio::spawn(poll_loop(
        source,
        project.project_id,
        logbook,
        events,
        cancel.clone(),
    ));

    PollHandle {
        cancel,
        task: Some(task),
    }
}

async fn poll_loop<S: ProjectSource>(
    source: Arc<S>,
    project_id: i64,
    logbook: Arc<Mutex<LogBook>>,
    events: mpsc::Sender<PollEvent>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval_at(Instant::now() + POLL_INTERVAL, POLL_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(project_id, "polling started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let mut finished = None;

        match source.fetch_project(project_id).await {
            ApiResponse::Ok { data, .. } => {
                if !data.project_status.is_running() {
                    finished = Some(data.project_status);
                }

                if events.send(PollEvent::Project(data)).await.is_err() {
                    break;
                }
            }
            ApiResponse::Err { message, detail } => {
                debug!(project_id, %message, %detail, "project poll failed");
            }
        }

        if cancel.is_cancelled() {
            break;
        }

        match source.fetch_new_logs(project_id).await {
            ApiResponse::Ok { data, .. } => {
                let accepted = logbook.lock().await.merge_new(data);
                if !accepted.is_empty() && events.send(PollEvent::Logs(accepted)).await.is_err() {
                    break;
                }
            }
            ApiResponse::Err { message, detail } => {
                debug!(project_id, %message, %detail, "log poll failed");
            }
        }

        if let Some(status) = finished {
            info!(project_id, %status, "project finished");
            let _ = events.send(PollEvent::Finished(status)).await;
            break;
        }
    }

    debug!(project_id, "polling stopped");
}
