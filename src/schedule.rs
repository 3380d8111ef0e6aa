/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use chrono::NaiveDateTime;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

const FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];
pub const REMINDER_LEAD: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid date/time \"{0}\", expected YYYY-MM-DDTHH:MM")]
    InvalidDateTime(String),
}

/// Local date-time chosen by the user. The raw text is sent to the server
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRequest {
    pub raw: String,
    pub at: NaiveDateTime,
}

impl ScheduleRequest {
    pub fn parse(input: &str) -> Result<Self, ScheduleError> {
        let input = input.trim();
        FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
            .map(|at| ScheduleRequest {
                raw: input.to_string(),
                at,
            })
            .ok_or_else(|| ScheduleError::InvalidDateTime(input.to_string()))
    }
}

/// Time from `now` until one minute before `scheduled`, if that is still ahead.
pub fn reminder_lead(scheduled: NaiveDateTime, now: NaiveDateTime) -> Option<Duration> {
    let lead = (scheduled - now).to_std().ok()?.checked_sub(REMINDER_LEAD)?;
    (!lead.is_zero()).then_some(lead)
}

/// One-shot timer that resolves once when the lead time elapses.
pub struct Reminder {
    fired: Option<oneshot::Receiver<()>>,
    task: JoinHandle<()>,
}

impl Reminder {
    pub fn arm(lead: Duration) -> Self {
        let (tx, rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            tokio::time::sleep(lead).await;
            debug!("schedule reminder fired");
            let _ = tx.send(());
        });

        Reminder {
            fired: Some(rx),
            task,
        }
    }

    /// Resolves when the reminder fires. Returns `false` if it was already
    /// awaited or the timer task died.
    pub async fn wait(&mut self) -> bool {
        match self.fired.take() {
            Some(rx) => rx.await.is_ok(),
            None => false,
        }
    }
}

impl Drop for Reminder {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(input: &str) -> NaiveDateTime {
        ScheduleRequest::parse(input).unwrap().at
    }

    #[test]
    fn test_parse_keeps_raw_text() {
        let request = ScheduleRequest::parse(" 2025-05-28T15:56 ").unwrap();
        assert_eq!(request.raw, "2025-05-28T15:56");
        assert_eq!(request.at, at("2025-05-28T15:56:00"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            ScheduleRequest::parse("tomorrow"),
            Err(ScheduleError::InvalidDateTime(_))
        ));
        assert!(ScheduleRequest::parse("2025-13-01T10:00").is_err());
    }

    #[test]
    fn test_reminder_lead() {
        let scheduled = at("2025-05-28T15:56");

        assert_eq!(
            reminder_lead(scheduled, at("2025-05-28T15:50")),
            Some(Duration::from_secs(5 * 60))
        );
        assert_eq!(reminder_lead(scheduled, at("2025-05-28T15:55")), None);
        assert_eq!(reminder_lead(scheduled, at("2025-05-28T15:55:30")), None);
        assert_eq!(reminder_lead(scheduled, at("2025-05-28T16:00")), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reminder_fires_once_after_lead() {
        let start = tokio::time::Instant::now();
        let mut reminder = Reminder::arm(Duration::from_secs(300));

        assert!(reminder.wait().await);
        assert!(start.elapsed() >= Duration::from_secs(300));
        assert!(!reminder.wait().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_reminder_never_fires() {
        let mut reminder = Reminder::arm(Duration::from_secs(60));
        let fired = reminder.fired.take().unwrap();
        drop(reminder);
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert!(fired.await.is_err());
    }
}
