//! Domain records for the GuardianLink core
//!
//! Plain serde structs mirroring the documents held in the external store,
//! plus the mentor/student mutations that carry rule content. Note
//! visibility rules live in [`crate::notes`]; the meeting state machine in
//! [`crate::meetings`].

use crate::risk::{self, RiskAssessment};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// Caller role. The core trusts the role supplied by the auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Mentor,
    Student,
    Parent,
}

/// One point of metric history, appended on every metric update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub attendance: f64,
    pub marks: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskEventKind {
    Escalation,
    Recovery,
}

/// Immutable audit record of a risk transition. Append-only; never mutated
/// or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEvent {
    pub kind: RiskEventKind,
    pub attendance: f64,
    pub marks: f64,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl RiskEvent {
    pub fn new(kind: RiskEventKind, attendance: f64, marks: f64, message: String) -> Self {
        Self {
            kind,
            attendance,
            marks,
            message,
            occurred_at: Utc::now(),
        }
    }
}

/// Mentor-initiated escalation tied to an at-risk student. Presence on the
/// record means an intervention is active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intervention {
    pub note: String,
    pub initiated_by: Uuid,
    pub initiated_at: DateTime<Utc>,
}

/// Mentor note on a student record.
///
/// `approved` is meaningful only when `sensitive`: `None` is pending,
/// `Some(true)`/`Some(false)` is the student's one-way response. Invariant
/// enforced at creation: confidential implies not parent-visible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub content: String,
    pub confidential: bool,
    pub sensitive: bool,
    pub parent_visible: bool,
    pub approved: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub mentor_id: Uuid,
}

/// Input for a new note; flags as ticked by the mentor.
#[derive(Debug, Clone)]
pub struct NoteDraft {
    pub content: String,
    pub confidential: bool,
    pub sensitive: bool,
    pub parent_visible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Student-owned goal; progress is set by the student only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalGoal {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub target_date: String,
    pub progress: u8,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    Pending,
    Accepted,
    Rescheduled,
}

/// Meeting embedded in a student record. Status and reschedule counter are
/// mutated only through [`crate::meetings`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: Uuid,
    pub date: String,
    pub time: Option<String>,
    pub agenda: String,
    #[serde(default = "default_invitees")]
    pub invitees: Vec<Role>,
    pub status: MeetingStatus,
    #[serde(default)]
    pub reschedule_count: u8,
    /// Assigned at creation; reused for every call join on this meeting
    pub call_session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub requested_by: Option<Role>,
}

fn default_invitees() -> Vec<Role> {
    vec![Role::Student]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
}

/// Top-level meeting request, distinct from an embedded meeting. Consumed
/// (removed from the store) when the mentor approves or declines it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingRequest {
    pub id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    pub student_email: String,
    pub parent_email: String,
    pub mentor_id: Uuid,
    pub date: String,
    pub time: String,
    pub reason: String,
    pub requested_by: Role,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

/// Notification type tag; string forms match the stored documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RiskAlert,
    NoteApproval,
    NoteApproved,
    NoteRejected,
    TaskAssigned,
    MeetingScheduled,
    MeetingRequest,
    MeetingDeclined,
    MeetingRescheduled,
    Intervention,
}

/// One notification append. Target identity is the email fields: both absent
/// means the notification is addressed to the mentor inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub student_email: Option<String>,
    pub parent_email: Option<String>,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        student_email: Option<String>,
        parent_email: Option<String>,
        message: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            student_email,
            parent_email,
            message,
            read: false,
            created_at: Utc::now(),
        }
    }

    /// Flip the read flag; only the owning recipient opens a notification.
    pub fn mark_read(&mut self) {
        self.read = true;
    }
}

/// Student record: identity, metrics, owned collections, and the derived
/// at-risk flag (persisted for query efficiency). Never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub parent_email: String,
    pub mentor_id: Uuid,
    pub attendance: f64,
    pub marks: f64,
    pub at_risk: bool,
    #[serde(default)]
    pub history: Vec<MetricSnapshot>,
    #[serde(default)]
    pub risk_events: Vec<RiskEvent>,
    pub intervention: Option<Intervention>,
    pub mentor_feedback: Option<String>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub meetings: Vec<Meeting>,
    #[serde(default)]
    pub personal_goals: Vec<PersonalGoal>,
    #[serde(default)]
    pub deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Student {
    /// Create a student record (mentor action). Metrics are validated; the
    /// at-risk flag is derived from the initial values.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        parent_email: impl Into<String>,
        mentor_id: Uuid,
        attendance: f64,
        marks: f64,
    ) -> Result<Self> {
        risk::validate_metric("attendance", attendance)?;
        risk::validate_metric("marks", marks)?;

        Ok(Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            parent_email: parent_email.into(),
            mentor_id,
            attendance,
            marks,
            at_risk: risk::classify(attendance, marks).at_risk,
            history: Vec::new(),
            risk_events: Vec::new(),
            intervention: None,
            mentor_feedback: None,
            notes: Vec::new(),
            tasks: Vec::new(),
            meetings: Vec::new(),
            personal_goals: Vec::new(),
            deleted: false,
            deleted_at: None,
            created_at: Utc::now(),
        })
    }

    /// Whether the record should appear in listings
    pub fn is_active(&self) -> bool {
        !self.deleted
    }

    /// Update both metrics (mentor action).
    ///
    /// Appends a history snapshot, re-derives the at-risk flag, appends a
    /// risk event when a transition occurred, and clears any active
    /// intervention on recovery. Returns the assessment so the caller can
    /// fan out the escalation notification.
    pub fn update_metrics(&mut self, attendance: f64, marks: f64) -> Result<RiskAssessment> {
        risk::validate_metric("attendance", attendance)?;
        risk::validate_metric("marks", marks)?;

        let assessment = risk::evaluate(self.attendance, self.marks, attendance, marks);

        self.attendance = attendance;
        self.marks = marks;
        self.at_risk = assessment.at_risk;
        self.history.push(MetricSnapshot {
            attendance,
            marks,
            recorded_at: Utc::now(),
        });

        if let Some(event) = &assessment.risk_event {
            info!(student = %self.name, kind = ?event.kind, "risk transition");
            self.risk_events.push(event.clone());
        }

        if assessment.recovered && self.intervention.take().is_some() {
            debug!(student = %self.name, "cleared intervention on recovery");
        }

        Ok(assessment)
    }

    /// Soft delete: sets the flag; listings exclude the record afterwards.
    pub fn soft_delete(&mut self) {
        self.deleted = true;
        self.deleted_at = Some(Utc::now());
    }

    /// Record mentor feedback visible to parents and the student
    pub fn set_feedback(&mut self, feedback: impl Into<String>) {
        self.mentor_feedback = Some(feedback.into());
    }

    /// Start an intervention (mentor action). Only valid while the student
    /// is at risk.
    pub fn trigger_intervention(&mut self, note: impl Into<String>, mentor_id: Uuid) -> Result<()> {
        if !self.at_risk {
            return Err(Error::InvalidState(
                "intervention requires an at-risk student".to_string(),
            ));
        }
        if self.intervention.is_some() {
            return Err(Error::InvalidState(
                "an intervention is already active".to_string(),
            ));
        }
        self.intervention = Some(Intervention {
            note: note.into(),
            initiated_by: mentor_id,
            initiated_at: Utc::now(),
        });
        Ok(())
    }

    // ── Tasks (mentor-created; completion toggled by student only) ──

    pub fn add_task(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
        due_date: impl Into<String>,
    ) -> &Task {
        self.tasks.push(Task {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            due_date: due_date.into(),
            completed: false,
            completed_at: None,
            created_at: Utc::now(),
        });
        self.tasks.last().expect("just pushed")
    }

    pub fn edit_task(
        &mut self,
        task_id: Uuid,
        title: impl Into<String>,
        description: impl Into<String>,
        due_date: impl Into<String>,
    ) -> Result<()> {
        let task = self.task_mut(task_id)?;
        task.title = title.into();
        task.description = description.into();
        task.due_date = due_date.into();
        Ok(())
    }

    pub fn remove_task(&mut self, task_id: Uuid) -> Result<()> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != task_id);
        if self.tasks.len() == before {
            return Err(Error::NotFound(format!("task {task_id}")));
        }
        Ok(())
    }

    pub fn complete_task(&mut self, task_id: Uuid, role: Role) -> Result<()> {
        if role != Role::Student {
            return Err(Error::Permission(
                "only the student completes tasks".to_string(),
            ));
        }
        let task = self.task_mut(task_id)?;
        task.completed = true;
        task.completed_at = Some(Utc::now());
        Ok(())
    }

    fn task_mut(&mut self, task_id: Uuid) -> Result<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| Error::NotFound(format!("task {task_id}")))
    }

    // ── Personal goals (student-owned) ──

    pub fn add_goal(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
        target_date: impl Into<String>,
    ) -> &PersonalGoal {
        self.personal_goals.push(PersonalGoal {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            target_date: target_date.into(),
            progress: 0,
            completed: false,
            completed_at: None,
            created_at: Utc::now(),
        });
        self.personal_goals.last().expect("just pushed")
    }

    /// Set goal progress (0..=100). Reaching 100 completes the goal.
    pub fn update_goal_progress(&mut self, goal_id: Uuid, progress: u8) -> Result<()> {
        if progress > 100 {
            return Err(Error::InvalidInput(format!(
                "progress must be in 0..=100, got {progress}"
            )));
        }
        let goal = self
            .personal_goals
            .iter_mut()
            .find(|g| g.id == goal_id)
            .ok_or_else(|| Error::NotFound(format!("goal {goal_id}")))?;
        goal.progress = progress;
        if progress == 100 && !goal.completed {
            goal.completed = true;
            goal.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn remove_goal(&mut self, goal_id: Uuid) -> Result<()> {
        let before = self.personal_goals.len();
        self.personal_goals.retain(|g| g.id != goal_id);
        if self.personal_goals.len() == before {
            return Err(Error::NotFound(format!("goal {goal_id}")));
        }
        Ok(())
    }
}
