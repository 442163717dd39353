//! Notification fan-out policy
//!
//! Pure mapping from a domain event to the notification appends it causes.
//! Each returned notification is an independent append: no deduplication,
//! no batching, so repeated identical events produce repeated
//! notifications. Notifications with neither email set are addressed to the
//! mentor inbox.

use crate::events::DomainEvent;
use crate::model::{Notification, NotificationKind, Role};

/// Compute the notification appends for one domain event.
pub fn fan_out(event: &DomainEvent) -> Vec<Notification> {
    match event {
        DomainEvent::RiskEscalated {
            student,
            attendance,
            marks,
            attendance_band,
            marks_band,
        } => vec![Notification::new(
            NotificationKind::RiskAlert,
            Some(student.email.clone()),
            Some(student.parent_email.clone()),
            format!(
                "Student flagged as At-Risk: Attendance {attendance}% ({attendance_band}), \
                 Marks {marks}% ({marks_band})"
            ),
        )],

        // Recovery is recorded on the student record but does not page the
        // parent.
        DomainEvent::RiskRecovered { .. } => Vec::new(),

        DomainEvent::NoteAdded { student, sensitive, .. } => {
            if *sensitive {
                vec![Notification::new(
                    NotificationKind::NoteApproval,
                    Some(student.email.clone()),
                    None,
                    "A mentor has added a sensitive note. Please approve or reject \
                     parent visibility."
                        .to_string(),
                )]
            } else {
                Vec::new()
            }
        }

        DomainEvent::NoteApprovalResponded {
            student,
            approved,
            excerpt,
        } => {
            let (kind, message) = if *approved {
                (
                    NotificationKind::NoteApproved,
                    format!("{} approved a sensitive note for parent visibility", student.name),
                )
            } else {
                (
                    NotificationKind::NoteRejected,
                    format!(
                        "{} rejected parent visibility for a sensitive note: \"{excerpt}\"",
                        student.name
                    ),
                )
            };
            vec![Notification::new(kind, None, None, message)]
        }

        DomainEvent::TaskAssigned { student, title } => vec![Notification::new(
            NotificationKind::TaskAssigned,
            Some(student.email.clone()),
            None,
            format!("New task assigned: {title}"),
        )],

        DomainEvent::MeetingScheduled {
            student,
            date,
            time,
            agenda,
            invitees,
        } => {
            let when = match time {
                Some(time) => format!("{date} at {time}"),
                None => date.clone(),
            };
            let mut out = Vec::new();
            if invitees.contains(&Role::Student) {
                out.push(Notification::new(
                    NotificationKind::MeetingScheduled,
                    Some(student.email.clone()),
                    None,
                    format!("New meeting scheduled for {when}: {agenda}"),
                ));
            }
            if invitees.contains(&Role::Parent) {
                out.push(Notification::new(
                    NotificationKind::MeetingScheduled,
                    Some(student.email.clone()),
                    Some(student.parent_email.clone()),
                    format!(
                        "A mentoring session for {} has been scheduled for {when}: {agenda}",
                        student.name
                    ),
                ));
            }
            out
        }

        DomainEvent::MeetingRequestCreated {
            student,
            requested_by,
            date,
            time,
            reason,
        } => {
            let message = match requested_by {
                Role::Parent => format!(
                    "{}'s parent has requested a meeting on {date} at {time}: {reason}",
                    student.name
                ),
                _ => format!(
                    "{} has requested a meeting on {date} at {time}: {reason}",
                    student.name
                ),
            };
            vec![Notification::new(
                NotificationKind::MeetingRequest,
                None,
                None,
                message,
            )]
        }

        DomainEvent::MeetingRequestApproved {
            student,
            date,
            time,
            ..
        } => vec![
            Notification::new(
                NotificationKind::MeetingScheduled,
                Some(student.email.clone()),
                None,
                format!("Your meeting request for {date} at {time} has been approved!"),
            ),
            Notification::new(
                NotificationKind::MeetingScheduled,
                Some(student.email.clone()),
                Some(student.parent_email.clone()),
                format!(
                    "Meeting for {} on {date} at {time} has been approved.",
                    student.name
                ),
            ),
        ],

        DomainEvent::MeetingRequestDeclined {
            student,
            requested_by,
            date,
            time,
        } => {
            let message =
                format!("Meeting request for {date} at {time} was declined by the mentor.");
            let notification = match requested_by {
                Role::Parent => Notification::new(
                    NotificationKind::MeetingDeclined,
                    None,
                    Some(student.parent_email.clone()),
                    message,
                ),
                _ => Notification::new(
                    NotificationKind::MeetingDeclined,
                    Some(student.email.clone()),
                    None,
                    message,
                ),
            };
            vec![notification]
        }

        DomainEvent::MeetingRescheduled { student, new_date } => vec![
            Notification::new(
                NotificationKind::MeetingRescheduled,
                None,
                None,
                format!("{} rescheduled a meeting to {new_date}", student.name),
            ),
            Notification::new(
                NotificationKind::MeetingRescheduled,
                Some(student.email.clone()),
                Some(student.parent_email.clone()),
                format!(
                    "Meeting for {} has been rescheduled to {new_date}",
                    student.name
                ),
            ),
        ],

        DomainEvent::InterventionTriggered { student, note } => vec![Notification::new(
            NotificationKind::Intervention,
            Some(student.email.clone()),
            Some(student.parent_email.clone()),
            format!(
                "An intervention has been initiated for {}: {note}",
                student.name
            ),
        )],
    }
}
