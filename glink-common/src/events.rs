//! Domain event types and EventBus
//!
//! Every fan-out-triggering action in the core is described by a
//! [`DomainEvent`]. Events are broadcast via [`EventBus`] so the host
//! application can drive the notification store, web push, and UI refresh
//! from one stream. The fan-out policy itself lives in [`crate::notify`].

use crate::model::{Role, Student};
use crate::risk::Band;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Identity slice of a student record carried inside events, enough to
/// address notifications without refetching the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRef {
    pub name: String,
    pub email: String,
    pub parent_email: String,
}

impl From<&Student> for StudentRef {
    fn from(student: &Student) -> Self {
        Self {
            name: student.name.clone(),
            email: student.email.clone(),
            parent_email: student.parent_email.clone(),
        }
    }
}

/// GuardianLink domain events
///
/// Serialized with a `type` tag so the host can persist or relay them as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// Student crossed into at-risk (both metrics critical)
    RiskEscalated {
        student: StudentRef,
        attendance: f64,
        marks: f64,
        attendance_band: Band,
        marks_band: Band,
    },

    /// Student left the at-risk state
    RiskRecovered {
        student: StudentRef,
        attendance: f64,
        marks: f64,
    },

    /// Mentor added a note; only sensitive ones trigger an approval request
    NoteAdded {
        student: StudentRef,
        sensitive: bool,
        excerpt: String,
    },

    /// Student responded to a sensitive note's approval request
    NoteApprovalResponded {
        student: StudentRef,
        approved: bool,
        excerpt: String,
    },

    /// Mentor assigned a task
    TaskAssigned {
        student: StudentRef,
        title: String,
    },

    /// A meeting was created (mentor-scheduled or request approval)
    MeetingScheduled {
        student: StudentRef,
        date: String,
        time: Option<String>,
        agenda: String,
        invitees: Vec<Role>,
    },

    /// Student or parent filed a meeting request
    MeetingRequestCreated {
        student: StudentRef,
        requested_by: Role,
        date: String,
        time: String,
        reason: String,
    },

    /// Mentor approved a meeting request
    MeetingRequestApproved {
        student: StudentRef,
        requested_by: Role,
        date: String,
        time: String,
    },

    /// Mentor declined a meeting request
    MeetingRequestDeclined {
        student: StudentRef,
        requested_by: Role,
        date: String,
        time: String,
    },

    /// Invited student moved a meeting to a new date
    MeetingRescheduled {
        student: StudentRef,
        new_date: String,
    },

    /// Mentor initiated an intervention for an at-risk student
    InterventionTriggered {
        student: StudentRef,
        note: String,
    },
}

/// Central event distribution bus for domain events
///
/// Thin wrapper over `tokio::sync::broadcast`: non-blocking publish,
/// multiple concurrent subscribers, automatic cleanup when receivers drop.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// Create a bus with the given channel capacity (see
    /// [`crate::config::DEFAULT_EVENT_CAPACITY`]).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events. Events emitted before subscription
    /// are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers. Returns the subscriber count, or
    /// an error when nobody is listening.
    pub fn emit(
        &self,
        event: DomainEvent,
    ) -> Result<usize, broadcast::error::SendError<DomainEvent>> {
        debug!(?event, "emitting domain event");
        self.tx.send(event)
    }

    /// Emit, ignoring the no-subscriber case.
    pub fn emit_lossy(&self, event: DomainEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student_ref() -> StudentRef {
        StudentRef {
            name: "Riya Patel".to_string(),
            email: "riya@student.edu".to_string(),
            parent_email: "parent.riya@guardianlink.edu".to_string(),
        }
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = DomainEvent::TaskAssigned {
            student: student_ref(),
            title: "Revise algebra".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "task_assigned");
        assert_eq!(json["student"]["email"], "riya@student.edu");
    }

    #[tokio::test]
    async fn bus_delivers_to_subscribers() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(DomainEvent::RiskRecovered {
            student: student_ref(),
            attendance: 85.0,
            marks: 70.0,
        })
        .unwrap();

        let received = rx.recv().await.unwrap();
        assert!(matches!(received, DomainEvent::RiskRecovered { .. }));
    }

    #[test]
    fn emit_without_subscribers_errors_but_lossy_does_not() {
        let bus = EventBus::new(16);
        let event = DomainEvent::RiskRecovered {
            student: student_ref(),
            attendance: 85.0,
            marks: 70.0,
        };
        assert!(bus.emit(event.clone()).is_err());
        bus.emit_lossy(event);
    }
}
