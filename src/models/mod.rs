use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a user account. Created at bootstrap only; there is no signup
/// route in the current surface.
#[derive(Debug, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub hashed_password: String,
}

/// User as exposed to clients, with the password hash projected away.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
}

/// Represents a project. Tasks reference projects by id; no foreign-key
/// integrity is enforced.
#[derive(Debug, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Represents a task as stored and returned.
///
/// `status` and `priority` are open strings; any value is accepted.
/// `created_by`, `created_at` and `actual_hours` are server-owned and never
/// taken from client input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: String,
    pub priority: String,
    #[serde(default)]
    pub project_id: i64,
    /// Assigned user id; 0 means unassigned.
    #[serde(default)]
    pub assigned_to: i64,
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub estimated_hours: f64,
    #[serde(default)]
    pub actual_hours: f64,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents a comment on a task. Insert-only.
#[derive(Debug, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub task_id: i64,
    pub comment_text: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

/// One row of the append-only task audit trail.
#[derive(Debug, Serialize, Deserialize)]
pub struct History {
    pub id: i64,
    pub task_id: i64,
    pub user_id: i64,
    /// One of CREATED, STATUS_CHANGED, TITLE_CHANGED, DELETED.
    pub action: String,
    pub old_value: String,
    pub new_value: String,
    pub timestamp: DateTime<Utc>,
}

/// Represents a notification produced by the task cascade.
#[derive(Debug, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_kind_serializes_as_type() {
        let n = Notification {
            id: 1,
            user_id: 2,
            message: "Nueva tarea asignada: Demo".to_string(),
            kind: "task_assigned".to_string(),
            read: false,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "task_assigned");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn task_round_trips_through_json() {
        let now = Utc::now();
        let task = Task {
            id: 4,
            title: "Write report".to_string(),
            description: String::new(),
            status: "Pendiente".to_string(),
            priority: "Media".to_string(),
            project_id: 0,
            assigned_to: 0,
            due_date: String::new(),
            estimated_hours: 2.5,
            actual_hours: 0.0,
            created_by: 1,
            created_at: now,
            updated_at: now,
        };
        let back: Task = serde_json::from_str(&serde_json::to_string(&task).unwrap()).unwrap();
        assert_eq!(back.id, 4);
        assert_eq!(back.status, "Pendiente");
        assert_eq!(back.estimated_hours, 2.5);
    }
}
