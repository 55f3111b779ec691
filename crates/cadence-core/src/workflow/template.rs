//! Hard-coded step chains, one per process kind.
//!
//! Dates are fixed day offsets from the process anchor date (the exam date
//! for exam chains). A chain is linear: every step depends only on steps
//! listed before it, so list order is always a valid topological order.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::step::{Step, StepMetadata};
use crate::error::{CadenceError, Result};

/// Supported process kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    /// Regular exam: convocation through result notification.
    ExamResult,
    /// Resit session, shorter turnaround and no document generation.
    ResitExam,
}

impl ProcessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExamResult => "exam_result",
            Self::ResitExam => "resit_exam",
        }
    }

    fn definitions(&self) -> &'static [StepDef] {
        match self {
            Self::ExamResult => EXAM_RESULT_CHAIN,
            Self::ResitExam => RESIT_EXAM_CHAIN,
        }
    }
}

impl fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessKind {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "exam_result" => Ok(Self::ExamResult),
            "resit_exam" => Ok(Self::ResitExam),
            other => Err(CadenceError::InvalidArgument(format!(
                "unknown process kind '{}'",
                other
            ))),
        }
    }
}

/// Static step definition.
struct StepDef {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    start_offset: i64,
    end_offset: Option<i64>,
    depends_on: &'static [&'static str],
    automatable: bool,
}

const EXAM_RESULT_CHAIN: &[StepDef] = &[
    StepDef {
        id: "convocation",
        name: "Convocation",
        description: "Send exam convocations to registered students",
        start_offset: -15,
        end_offset: None,
        depends_on: &[],
        automatable: true,
    },
    StepDef {
        id: "exam_session",
        name: "Exam session",
        description: "Hold the exam session",
        start_offset: 0,
        end_offset: None,
        depends_on: &["convocation"],
        automatable: false,
    },
    StepDef {
        id: "grade_entry",
        name: "Grade entry",
        description: "Teachers enter grades",
        start_offset: 1,
        end_offset: Some(7),
        depends_on: &["exam_session"],
        automatable: false,
    },
    StepDef {
        id: "validation",
        name: "Validation",
        description: "Validate grades and deliberate",
        start_offset: 8,
        end_offset: Some(10),
        depends_on: &["grade_entry"],
        automatable: true,
    },
    StepDef {
        id: "document_generation",
        name: "Document generation",
        description: "Generate transcripts and result sheets",
        start_offset: 11,
        end_offset: None,
        depends_on: &["validation"],
        automatable: true,
    },
    StepDef {
        id: "notification",
        name: "Notification",
        description: "Publish results to students",
        start_offset: 12,
        end_offset: None,
        depends_on: &["document_generation"],
        automatable: true,
    },
];

const RESIT_EXAM_CHAIN: &[StepDef] = &[
    StepDef {
        id: "convocation",
        name: "Convocation",
        description: "Send resit convocations to eligible students",
        start_offset: -7,
        end_offset: None,
        depends_on: &[],
        automatable: true,
    },
    StepDef {
        id: "exam_session",
        name: "Exam session",
        description: "Hold the resit session",
        start_offset: 0,
        end_offset: None,
        depends_on: &["convocation"],
        automatable: false,
    },
    StepDef {
        id: "grade_entry",
        name: "Grade entry",
        description: "Teachers enter resit grades",
        start_offset: 1,
        end_offset: Some(5),
        depends_on: &["exam_session"],
        automatable: false,
    },
    StepDef {
        id: "validation",
        name: "Validation",
        description: "Validate resit grades",
        start_offset: 6,
        end_offset: Some(7),
        depends_on: &["grade_entry"],
        automatable: true,
    },
    StepDef {
        id: "notification",
        name: "Notification",
        description: "Publish resit results to students",
        start_offset: 8,
        end_offset: None,
        depends_on: &["validation"],
        automatable: true,
    },
];

/// Parse a `YYYY-MM-DD` anchor date.
pub fn parse_anchor_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|e| {
        CadenceError::InvalidArgument(format!("invalid anchor date '{}': {}", input, e))
    })
}

/// Generate the ordered step list for `kind`, anchored at `anchor`.
pub fn generate_template(anchor: NaiveDate, kind: ProcessKind) -> Result<Vec<Step>> {
    let steps = kind
        .definitions()
        .iter()
        .map(|def| {
            let start = offset(anchor, def.start_offset)?;
            let end = def.end_offset.map(|o| offset(anchor, o)).transpose()?;

            let mut step = Step::new(
                def.id,
                def.name,
                StepMetadata::new(def.automatable, def.description),
            )
            .window(start, end);
            step.dependencies = def.depends_on.iter().map(|d| d.to_string()).collect();
            Ok(step)
        })
        .collect::<Result<Vec<_>>>()?;

    validate_chain(&steps)?;
    Ok(steps)
}

/// Check that `steps` forms a linear chain: unique ids, and dependencies
/// only on earlier steps.
pub fn validate_chain(steps: &[Step]) -> Result<()> {
    if steps.is_empty() {
        return Err(CadenceError::InvalidArgument(
            "template must contain at least one step".into(),
        ));
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(steps.len());
    for step in steps {
        for dep in &step.dependencies {
            if dep == &step.id {
                return Err(CadenceError::InvalidArgument(format!(
                    "step '{}' depends on itself",
                    step.id
                )));
            }
            if !seen.contains(dep.as_str()) {
                return Err(CadenceError::InvalidArgument(format!(
                    "step '{}' depends on '{}', which does not precede it",
                    step.id, dep
                )));
            }
        }
        if !seen.insert(step.id.as_str()) {
            return Err(CadenceError::InvalidArgument(format!(
                "duplicate step id '{}'",
                step.id
            )));
        }
    }

    Ok(())
}

fn offset(anchor: NaiveDate, days: i64) -> Result<NaiveDate> {
    anchor
        .checked_add_signed(Duration::days(days))
        .ok_or_else(|| {
            CadenceError::InvalidArgument(format!(
                "anchor date {} offset by {} days is out of range",
                anchor, days
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn find<'a>(steps: &'a [Step], id: &str) -> &'a Step {
        steps.iter().find(|s| s.id == id).unwrap()
    }

    #[test]
    fn test_exam_result_dates() {
        let steps = generate_template(date(2024, 3, 1), ProcessKind::ExamResult).unwrap();
        assert_eq!(steps.len(), 6);

        assert_eq!(find(&steps, "convocation").start_date, Some(date(2024, 2, 15)));
        assert_eq!(find(&steps, "exam_session").start_date, Some(date(2024, 3, 1)));
        assert_eq!(find(&steps, "grade_entry").start_date, Some(date(2024, 3, 2)));
        assert_eq!(find(&steps, "grade_entry").end_date, Some(date(2024, 3, 8)));
        assert_eq!(find(&steps, "validation").start_date, Some(date(2024, 3, 9)));
        assert_eq!(find(&steps, "validation").end_date, Some(date(2024, 3, 11)));
        assert_eq!(
            find(&steps, "document_generation").start_date,
            Some(date(2024, 3, 12))
        );
        assert_eq!(find(&steps, "notification").start_date, Some(date(2024, 3, 13)));
    }

    #[test]
    fn test_chain_ordering() {
        let steps = generate_template(date(2025, 1, 10), ProcessKind::ExamResult).unwrap();

        for (i, pair) in steps.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            if i == 1 {
                assert!(prev.start_date <= next.start_date);
            } else {
                assert!(prev.start_date < next.start_date);
            }
            assert_eq!(next.dependencies, vec![prev.id.clone()]);
        }
        assert!(steps[0].dependencies.is_empty());
    }

    #[test]
    fn test_automatable_flags() {
        let steps = generate_template(date(2024, 3, 1), ProcessKind::ExamResult).unwrap();
        let flags: Vec<bool> = steps.iter().map(|s| s.is_automatable()).collect();
        assert_eq!(flags, vec![true, false, false, true, true, true]);
        assert!(steps
            .iter()
            .all(|s| s.status == super::super::StepStatus::Pending));
    }

    #[test]
    fn test_resit_chain() {
        let steps = generate_template(date(2024, 6, 20), ProcessKind::ResitExam).unwrap();
        let ids: Vec<&str> = steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["convocation", "exam_session", "grade_entry", "validation", "notification"]
        );
        assert_eq!(find(&steps, "convocation").start_date, Some(date(2024, 6, 13)));
        assert_eq!(find(&steps, "notification").start_date, Some(date(2024, 6, 28)));
    }

    #[test]
    fn test_parse_anchor_date() {
        assert_eq!(parse_anchor_date("2024-03-01").unwrap(), date(2024, 3, 1));
        assert!(matches!(
            parse_anchor_date("2024-02-30"),
            Err(CadenceError::InvalidArgument(_))
        ));
        assert!(parse_anchor_date("yesterday").is_err());
    }

    #[test]
    fn test_out_of_range_anchor() {
        let result = generate_template(NaiveDate::MIN, ProcessKind::ExamResult);
        assert!(matches!(result, Err(CadenceError::InvalidArgument(_))));
    }

    #[test]
    fn test_validate_chain_rejects_forward_reference() {
        let steps = vec![
            Step::new("a", "A", StepMetadata::new(false, "")).depends_on("b"),
            Step::new("b", "B", StepMetadata::new(false, "")),
        ];
        assert!(validate_chain(&steps).is_err());
    }

    #[test]
    fn test_validate_chain_rejects_self_and_duplicates() {
        let looped = vec![Step::new("a", "A", StepMetadata::new(false, "")).depends_on("a")];
        assert!(validate_chain(&looped).is_err());

        let dup = vec![
            Step::new("a", "A", StepMetadata::new(false, "")),
            Step::new("a", "A again", StepMetadata::new(false, "")),
        ];
        assert!(validate_chain(&dup).is_err());

        assert!(validate_chain(&[]).is_err());
    }

    #[test]
    fn test_process_kind_parse() {
        assert_eq!(
            "exam_result".parse::<ProcessKind>().unwrap(),
            ProcessKind::ExamResult
        );
        assert_eq!(ProcessKind::ResitExam.to_string(), "resit_exam");
        assert!("thesis".parse::<ProcessKind>().is_err());
    }
}
