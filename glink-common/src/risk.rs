//! Risk classification and transition evaluation
//!
//! A student is at risk only when BOTH attendance and marks sit below their
//! critical thresholds. A single critical metric does not flag the student;
//! the conjunctive rule is deliberate product behavior, not an approximation.

use crate::model::{RiskEvent, RiskEventKind};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attendance band thresholds: >=85 good, >=80 warning, else critical
pub const ATTENDANCE_GOOD: f64 = 85.0;
pub const ATTENDANCE_WARNING: f64 = 80.0;

/// Marks band thresholds: >=75 good, >=60 warning, else critical
pub const MARKS_GOOD: f64 = 75.0;
pub const MARKS_WARNING: f64 = 60.0;

/// Status band for a single metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Good,
    Warning,
    Critical,
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Band::Good => write!(f, "good"),
            Band::Warning => write!(f, "warning"),
            Band::Critical => write!(f, "critical"),
        }
    }
}

/// Result of classifying one (attendance, marks) pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub attendance_band: Band,
    pub marks_band: Band,
    /// True iff attendance < 80 AND marks < 60 (both critical)
    pub at_risk: bool,
}

/// Band for an attendance percentage
pub fn attendance_band(attendance: f64) -> Band {
    if attendance >= ATTENDANCE_GOOD {
        Band::Good
    } else if attendance >= ATTENDANCE_WARNING {
        Band::Warning
    } else {
        Band::Critical
    }
}

/// Band for a marks percentage
pub fn marks_band(marks: f64) -> Band {
    if marks >= MARKS_GOOD {
        Band::Good
    } else if marks >= MARKS_WARNING {
        Band::Warning
    } else {
        Band::Critical
    }
}

/// Classify a metric pair. Pure and total; no failure mode.
pub fn classify(attendance: f64, marks: f64) -> Classification {
    Classification {
        attendance_band: attendance_band(attendance),
        marks_band: marks_band(marks),
        at_risk: attendance < ATTENDANCE_WARNING && marks < MARKS_WARNING,
    }
}

/// Validate a metric value supplied by the caller.
///
/// Surfaced immediately, never retried; no mutation happens on a validation
/// failure.
pub fn validate_metric(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(Error::InvalidInput(format!(
            "{name} must be a percentage in [0,100], got {value}"
        )));
    }
    Ok(())
}

/// Result of evaluating a metric update against the previous values
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub attendance_band: Band,
    pub marks_band: Band,
    pub at_risk: bool,
    /// Was not at risk, is now
    pub newly_at_risk: bool,
    /// Was at risk, is no longer
    pub recovered: bool,
    /// Audit record, present exactly when a transition occurred
    pub risk_event: Option<RiskEvent>,
}

/// Evaluate a risk transition across a metric update.
///
/// Pure function of its four inputs (modulo the event timestamp). Produces a
/// risk event only on an escalation or recovery transition; risk persisting
/// unchanged produces none.
///
/// Caller contract: on `recovered` the caller must clear any active
/// intervention; on `newly_at_risk` the caller must notify the parent using
/// the event's message.
pub fn evaluate(
    old_attendance: f64,
    old_marks: f64,
    new_attendance: f64,
    new_marks: f64,
) -> RiskAssessment {
    let was_at_risk = classify(old_attendance, old_marks).at_risk;
    let now = classify(new_attendance, new_marks);

    let newly_at_risk = !was_at_risk && now.at_risk;
    let recovered = was_at_risk && !now.at_risk;

    let risk_event = if newly_at_risk {
        Some(RiskEvent::new(
            RiskEventKind::Escalation,
            new_attendance,
            new_marks,
            format!(
                "Student flagged as At-Risk: Attendance {new_attendance}% ({}), Marks {new_marks}% ({})",
                now.attendance_band, now.marks_band
            ),
        ))
    } else if recovered {
        Some(RiskEvent::new(
            RiskEventKind::Recovery,
            new_attendance,
            new_marks,
            format!(
                "Student recovered from At-Risk status: Attendance {new_attendance}%, Marks {new_marks}%"
            ),
        ))
    } else {
        None
    };

    RiskAssessment {
        attendance_band: now.attendance_band,
        marks_band: now.marks_band,
        at_risk: now.at_risk,
        newly_at_risk,
        recovered,
        risk_event,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_boundaries() {
        assert_eq!(attendance_band(85.0), Band::Good);
        assert_eq!(attendance_band(84.9), Band::Warning);
        assert_eq!(attendance_band(80.0), Band::Warning);
        assert_eq!(attendance_band(79.9), Band::Critical);

        assert_eq!(marks_band(75.0), Band::Good);
        assert_eq!(marks_band(74.9), Band::Warning);
        assert_eq!(marks_band(60.0), Band::Warning);
        assert_eq!(marks_band(59.9), Band::Critical);
    }

    #[test]
    fn at_risk_requires_both_metrics_critical() {
        assert!(classify(79.0, 59.0).at_risk);
        assert!(!classify(79.0, 60.0).at_risk);
        assert!(!classify(80.0, 50.0).at_risk);
        assert!(!classify(95.0, 95.0).at_risk);
    }

    #[test]
    fn validate_rejects_out_of_range() {
        assert!(validate_metric("attendance", -1.0).is_err());
        assert!(validate_metric("marks", 100.1).is_err());
        assert!(validate_metric("marks", f64::NAN).is_err());
        assert!(validate_metric("attendance", 0.0).is_ok());
        assert!(validate_metric("marks", 100.0).is_ok());
    }

    #[test]
    fn escalation_transition() {
        let result = evaluate(85.0, 70.0, 70.0, 50.0);
        assert!(result.at_risk);
        assert!(result.newly_at_risk);
        assert!(!result.recovered);

        let event = result.risk_event.expect("escalation event");
        assert_eq!(event.kind, RiskEventKind::Escalation);
        assert_eq!(event.attendance, 70.0);
        assert_eq!(event.marks, 50.0);
        assert_eq!(
            event.message,
            "Student flagged as At-Risk: Attendance 70% (critical), Marks 50% (critical)"
        );
    }

    #[test]
    fn recovery_transition() {
        let result = evaluate(70.0, 50.0, 85.0, 70.0);
        assert!(!result.at_risk);
        assert!(result.recovered);
        assert!(!result.newly_at_risk);
        assert_eq!(
            result.risk_event.expect("recovery event").kind,
            RiskEventKind::Recovery
        );
    }

    #[test]
    fn persisting_risk_produces_no_event() {
        let result = evaluate(70.0, 50.0, 65.0, 55.0);
        assert!(result.at_risk);
        assert!(!result.newly_at_risk);
        assert!(!result.recovered);
        assert!(result.risk_event.is_none());
    }

    #[test]
    fn no_change_produces_no_event() {
        let result = evaluate(90.0, 80.0, 88.0, 78.0);
        assert!(!result.at_risk);
        assert!(result.risk_event.is_none());
    }

    #[test]
    fn evaluate_is_repeatable() {
        let a = evaluate(85.0, 70.0, 70.0, 50.0);
        let b = evaluate(85.0, 70.0, 70.0, 50.0);
        assert_eq!(a.at_risk, b.at_risk);
        assert_eq!(a.newly_at_risk, b.newly_at_risk);
        assert_eq!(
            a.risk_event.map(|e| e.message),
            b.risk_event.map(|e| e.message)
        );
    }
}
