//! Note visibility rules and approval workflow
//!
//! Confidential dominates every other flag: a confidential note is never
//! parent-visible, whatever the stored flag says. Approval gates parent
//! visibility only; a sensitive note is always visible to the student it is
//! about.

use crate::model::{Note, NoteDraft, Role, Student};
use crate::{Error, Result};
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

impl Note {
    /// Visibility predicate per viewer role.
    pub fn is_visible_to(&self, role: Role) -> bool {
        match role {
            Role::Mentor => true,
            Role::Student => !self.confidential,
            Role::Parent => {
                !self.confidential
                    && self.parent_visible
                    && (!self.sensitive || self.approved == Some(true))
            }
        }
    }

    /// Set the confidential flag. Setting it forces parent_visible off in
    /// the same update; clearing it does not restore parent visibility.
    pub fn set_confidential(&mut self, confidential: bool) {
        self.confidential = confidential;
        if confidential {
            self.parent_visible = false;
        }
    }
}

impl Student {
    /// Append a note (mentor action).
    ///
    /// Enforces confidential ⇒ not parent-visible at creation. Sensitive
    /// notes start with approval pending; everything else is implicitly
    /// approved.
    pub fn add_note(&mut self, draft: NoteDraft, mentor_id: Uuid) -> &Note {
        let note = Note {
            id: Uuid::new_v4(),
            parent_visible: draft.parent_visible && !draft.confidential,
            approved: if draft.sensitive { None } else { Some(true) },
            content: draft.content,
            confidential: draft.confidential,
            sensitive: draft.sensitive,
            created_at: Utc::now(),
            mentor_id,
        };
        self.notes.push(note);
        self.notes.last().expect("just pushed")
    }

    /// Edit note content (mentor action). Approval state is untouched: a
    /// rejected sensitive note stays rejected.
    pub fn edit_note(&mut self, note_id: Uuid, content: impl Into<String>) -> Result<()> {
        let note = self.note_mut(note_id)?;
        note.content = content.into();
        Ok(())
    }

    pub fn remove_note(&mut self, note_id: Uuid) -> Result<()> {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != note_id);
        if self.notes.len() == before {
            return Err(Error::NotFound(format!("note {note_id}")));
        }
        Ok(())
    }

    /// Student response to a sensitive note's approval request.
    ///
    /// One-way capability: only the subject student may respond, and only
    /// while approval is pending. A rejection additionally withdraws parent
    /// visibility and is permanent.
    pub fn respond_note_approval(&mut self, note_id: Uuid, role: Role, approve: bool) -> Result<()> {
        if role != Role::Student {
            return Err(Error::Permission(
                "only the student responds to note approval".to_string(),
            ));
        }
        let note = self.note_mut(note_id)?;
        if !note.sensitive {
            return Err(Error::InvalidState(
                "approval applies to sensitive notes only".to_string(),
            ));
        }
        if note.approved.is_some() {
            return Err(Error::InvalidState(
                "approval has already been decided".to_string(),
            ));
        }
        note.approved = Some(approve);
        if !approve {
            note.parent_visible = false;
        }
        debug!(note = %note_id, approve, "note approval recorded");
        Ok(())
    }

    /// Notes filtered for a viewer role
    pub fn visible_notes(&self, role: Role) -> impl Iterator<Item = &Note> {
        self.notes.iter().filter(move |n| n.is_visible_to(role))
    }

    fn note_mut(&mut self, note_id: Uuid) -> Result<&mut Note> {
        self.notes
            .iter_mut()
            .find(|n| n.id == note_id)
            .ok_or_else(|| Error::NotFound(format!("note {note_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student() -> Student {
        Student::new(
            "Aarav Sharma",
            "aarav@student.edu",
            "parent.aarav@guardianlink.edu",
            Uuid::new_v4(),
            92.0,
            81.0,
        )
        .unwrap()
    }

    fn draft(confidential: bool, sensitive: bool, parent_visible: bool) -> NoteDraft {
        NoteDraft {
            content: "Session summary".to_string(),
            confidential,
            sensitive,
            parent_visible,
        }
    }

    #[test]
    fn confidential_dominates_parent_visible() {
        // Even with a stored parent_visible=true the parent never sees it.
        let note = Note {
            id: Uuid::new_v4(),
            content: "x".to_string(),
            confidential: true,
            sensitive: false,
            parent_visible: true,
            approved: Some(true),
            created_at: Utc::now(),
            mentor_id: Uuid::new_v4(),
        };
        assert!(!note.is_visible_to(Role::Parent));
        assert!(!note.is_visible_to(Role::Student));
        assert!(note.is_visible_to(Role::Mentor));
    }

    #[test]
    fn creation_enforces_confidential_invariant() {
        let mut s = student();
        let mentor = s.mentor_id;
        let note = s.add_note(draft(true, false, true), mentor);
        assert!(!note.parent_visible);
    }

    #[test]
    fn sensitive_note_gates_parent_on_approval() {
        let mut s = student();
        let mentor = s.mentor_id;
        let id = s.add_note(draft(false, true, true), mentor).id;

        // Pending: student sees it, parent does not.
        assert!(s.notes[0].is_visible_to(Role::Student));
        assert!(!s.notes[0].is_visible_to(Role::Parent));

        s.respond_note_approval(id, Role::Student, true).unwrap();
        assert!(s.notes[0].is_visible_to(Role::Parent));
    }

    #[test]
    fn rejection_is_permanent() {
        let mut s = student();
        let mentor = s.mentor_id;
        let id = s.add_note(draft(false, true, true), mentor).id;

        s.respond_note_approval(id, Role::Student, false).unwrap();
        assert!(!s.notes[0].is_visible_to(Role::Parent));

        // Mentor edits do not reset the decision.
        s.edit_note(id, "revised wording").unwrap();
        assert_eq!(s.notes[0].approved, Some(false));
        assert!(!s.notes[0].is_visible_to(Role::Parent));

        // And the student cannot respond again.
        let again = s.respond_note_approval(id, Role::Student, true);
        assert!(matches!(again, Err(Error::InvalidState(_))));
    }

    #[test]
    fn approval_is_student_only() {
        let mut s = student();
        let mentor = s.mentor_id;
        let id = s.add_note(draft(false, true, true), mentor).id;

        let result = s.respond_note_approval(id, Role::Parent, true);
        assert!(matches!(result, Err(Error::Permission(_))));
        assert_eq!(s.notes[0].approved, None);
    }

    #[test]
    fn non_sensitive_notes_are_implicitly_approved() {
        let mut s = student();
        let mentor = s.mentor_id;
        let note = s.add_note(draft(false, false, true), mentor);
        assert_eq!(note.approved, Some(true));
        assert!(note.is_visible_to(Role::Parent));
    }

    #[test]
    fn set_confidential_forces_parent_visible_off() {
        let mut s = student();
        let mentor = s.mentor_id;
        let id = s.add_note(draft(false, false, true), mentor).id;

        let note = s.notes.iter_mut().find(|n| n.id == id).unwrap();
        note.set_confidential(true);
        assert!(!note.parent_visible);

        // Clearing confidential does not restore visibility on its own.
        note.set_confidential(false);
        assert!(!note.parent_visible);
    }

    #[test]
    fn visible_notes_filters_per_role() {
        let mut s = student();
        let mentor = s.mentor_id;
        s.add_note(draft(false, false, true), mentor);
        s.add_note(draft(true, false, false), mentor);
        s.add_note(draft(false, true, true), mentor);

        assert_eq!(s.visible_notes(Role::Mentor).count(), 3);
        assert_eq!(s.visible_notes(Role::Student).count(), 2);
        assert_eq!(s.visible_notes(Role::Parent).count(), 1);
    }
}
