use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the status of a shift task.
/// Corresponds to the `task_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting for the company to report back.
    Pending,
    /// Done within the allotted time.
    Completed,
    /// The allotted time ran out while the task was pending.
    Expired,
}

/// Input structure for creating a task.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// Must be between 1 and 200 characters.
    #[serde(default)]
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// Company responsible for the task.
    #[serde(default)]
    #[validate(range(min = 1, message = "Company required"))]
    pub assigned_company_id: i32,

    /// Minutes the company has before the task expires. At most one day.
    #[serde(default)]
    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: i32,

    /// Whether the company must attach a photo as proof.
    #[serde(default)]
    pub require_photo: bool,
}

#[derive(Debug, Deserialize)]
pub struct TaskStatusInput {
    pub status: TaskStatus,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TaskPhotoInput {
    #[validate(length(min = 1, max = 500))]
    pub photo_url: String,
}

/// Represents a task as returned by the API, joined with the names the
/// dashboards display.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Task {
    pub id: i32,
    pub title: String,
    pub assigned_company_id: i32,
    pub assigned_by_user_id: i32,
    pub created_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: TaskStatus,
    pub photo_url: Option<String>,
    pub require_photo: bool,
    pub company_name: String,
    pub assigned_by_username: String,
}

impl Task {
    /// Moment after which a pending task counts as expired.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// True when the task is still pending but its time ran out at `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Pending && now > self.expires_at()
    }
}

/// Marks overdue tasks as expired in place and returns their ids so the
/// caller can persist the change.
pub fn expire_overdue(tasks: &mut [Task], now: DateTime<Utc>) -> Vec<i32> {
    tasks
        .iter_mut()
        .filter(|task| task.is_overdue(now))
        .map(|task| {
            task.status = TaskStatus::Expired;
            task.id
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: i32, minutes_ago: i64, duration: i32, status: TaskStatus) -> Task {
        Task {
            id,
            title: "Убрать паллеты у ворот 3".into(),
            assigned_company_id: 1,
            assigned_by_user_id: 1,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
            duration_minutes: duration,
            status,
            photo_url: None,
            require_photo: false,
            company_name: "ЭСК".into(),
            assigned_by_username: "operator".into(),
        }
    }

    #[test]
    fn test_expire_overdue_only_touches_pending() {
        let mut tasks = vec![
            task(1, 30, 15, TaskStatus::Pending),
            task(2, 5, 15, TaskStatus::Pending),
            task(3, 30, 15, TaskStatus::Completed),
        ];

        let expired = expire_overdue(&mut tasks, Utc::now());

        assert_eq!(expired, vec![1]);
        assert_eq!(tasks[0].status, TaskStatus::Expired);
        assert_eq!(tasks[1].status, TaskStatus::Pending);
        assert_eq!(tasks[2].status, TaskStatus::Completed);
    }

    #[test]
    fn test_expires_at() {
        let t = task(1, 0, 90, TaskStatus::Pending);
        assert_eq!(t.expires_at() - t.created_at, Duration::minutes(90));
        assert!(!t.is_overdue(t.created_at + Duration::minutes(90)));
        assert!(t.is_overdue(t.created_at + Duration::minutes(91)));
    }

    #[test]
    fn test_task_input_validation() {
        let valid = TaskInput {
            title: "Пересчитать ячейку A-12".into(),
            assigned_company_id: 1,
            duration_minutes: 30,
            require_photo: true,
        };
        assert!(valid.validate().is_ok());

        let empty_title = TaskInput {
            title: "".into(),
            assigned_company_id: 1,
            duration_minutes: 30,
            require_photo: false,
        };
        assert!(empty_title.validate().is_err());

        let zero_duration = TaskInput {
            title: "Valid".into(),
            assigned_company_id: 1,
            duration_minutes: 0,
            require_photo: false,
        };
        assert!(zero_duration.validate().is_err());

        let missing: TaskInput = serde_json::from_str(r#"{"title":"Valid"}"#).unwrap();
        assert!(missing.validate().is_err());
    }

    #[test]
    fn test_status_deserialization() {
        let input: TaskStatusInput = serde_json::from_str(r#"{"status":"completed"}"#).unwrap();
        assert_eq!(input.status, TaskStatus::Completed);
        assert!(serde_json::from_str::<TaskStatusInput>(r#"{"status":"done"}"#).is_err());
    }
}
