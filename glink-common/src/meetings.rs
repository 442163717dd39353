//! Meeting lifecycle state machine and meeting requests
//!
//! Transitions: pending → accepted (terminal) by the invited student, and
//! pending/rescheduled → rescheduled with a hard cap of two reschedules.
//! The third reschedule attempt fails with a quota error and performs no
//! mutation. Declining only exists at the meeting-request stage, before a
//! meeting record is created.

use crate::model::{Meeting, MeetingRequest, MeetingStatus, RequestStatus, Role, Student};
use crate::{Error, Result};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

/// Maximum reschedules per meeting (inclusive cap)
pub const MAX_RESCHEDULES: u8 = 2;

impl Meeting {
    /// Accept the meeting (invited student only). Terminal: there is no
    /// transition back out of accepted.
    pub fn accept(&mut self, role: Role) -> Result<()> {
        if role != Role::Student || !self.invitees.contains(&Role::Student) {
            return Err(Error::Permission(
                "only the invited student accepts a meeting".to_string(),
            ));
        }
        if self.status == MeetingStatus::Accepted {
            return Err(Error::InvalidState("meeting is already accepted".to_string()));
        }
        self.status = MeetingStatus::Accepted;
        Ok(())
    }

    /// Reschedule to a new date (invited student only).
    ///
    /// Bumps the counter and re-enters the rescheduled state. Rejected with
    /// a quota error once the counter has reached the cap; the counter is
    /// left unchanged on rejection.
    pub fn reschedule(&mut self, role: Role, new_date: impl Into<String>) -> Result<()> {
        if role != Role::Student || !self.invitees.contains(&Role::Student) {
            return Err(Error::Permission(
                "only the invited student reschedules a meeting".to_string(),
            ));
        }
        if self.status == MeetingStatus::Accepted {
            return Err(Error::InvalidState(
                "an accepted meeting cannot be rescheduled".to_string(),
            ));
        }
        if self.reschedule_count >= MAX_RESCHEDULES {
            return Err(Error::RescheduleQuota(format!(
                "meeting {} already rescheduled {MAX_RESCHEDULES} times",
                self.id
            )));
        }
        self.date = new_date.into();
        self.reschedule_count += 1;
        self.status = MeetingStatus::Rescheduled;
        Ok(())
    }

    /// Call joins are only permitted on an accepted meeting.
    pub fn can_join_call(&self) -> bool {
        self.status == MeetingStatus::Accepted
    }
}

impl Student {
    /// Schedule a meeting (mentor action, or request approval). A call
    /// session id is assigned here and reused for every join.
    pub fn schedule_meeting(
        &mut self,
        date: impl Into<String>,
        time: Option<String>,
        agenda: impl Into<String>,
        invitees: Vec<Role>,
        requested_by: Option<Role>,
    ) -> &Meeting {
        let invitees = if invitees.is_empty() {
            vec![Role::Student]
        } else {
            invitees
        };
        self.meetings.push(Meeting {
            id: Uuid::new_v4(),
            date: date.into(),
            time,
            agenda: agenda.into(),
            invitees,
            status: MeetingStatus::Pending,
            reschedule_count: 0,
            call_session_id: Uuid::new_v4(),
            created_at: Utc::now(),
            requested_by,
        });
        self.meetings.last().expect("just pushed")
    }
}

impl MeetingRequest {
    /// Create a pending request (student or parent action).
    pub fn new(
        student: &Student,
        requested_by: Role,
        date: impl Into<String>,
        time: impl Into<String>,
        reason: impl Into<String>,
    ) -> Result<Self> {
        if requested_by == Role::Mentor {
            return Err(Error::Permission(
                "mentors schedule meetings directly instead of requesting".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            student_id: student.id,
            student_name: student.name.clone(),
            student_email: student.email.clone(),
            parent_email: student.parent_email.clone(),
            mentor_id: student.mentor_id,
            date: date.into(),
            time: time.into(),
            reason: reason.into(),
            requested_by,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        })
    }

    /// Approve (mentor only): materializes a pending meeting on the student
    /// record, invitees being the requester alongside the student. The
    /// request itself is consumed; the caller deletes it from the store.
    pub fn approve(self, role: Role, student: &mut Student) -> Result<Uuid> {
        if role != Role::Mentor {
            return Err(Error::Permission(
                "only the mentor resolves meeting requests".to_string(),
            ));
        }
        if student.id != self.student_id {
            return Err(Error::InvalidInput(
                "request does not belong to this student".to_string(),
            ));
        }
        let mut invitees = vec![Role::Student];
        if self.requested_by == Role::Parent {
            invitees.push(Role::Parent);
        }
        let meeting = student.schedule_meeting(
            self.date.clone(),
            Some(self.time.clone()),
            self.reason.clone(),
            invitees,
            Some(self.requested_by),
        );
        info!(request = %self.id, meeting = %meeting.id, "meeting request approved");
        Ok(meeting.id)
    }

    /// Decline (mentor only): the request is simply discarded; no meeting
    /// is created. Consumes the request.
    pub fn decline(self, role: Role) -> Result<()> {
        if role != Role::Mentor {
            return Err(Error::Permission(
                "only the mentor resolves meeting requests".to_string(),
            ));
        }
        info!(request = %self.id, "meeting request declined");
        Ok(())
    }
}
