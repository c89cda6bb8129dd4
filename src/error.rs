use thiserror::Error;

use crate::models::{GradeCategory, GradeScale};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradeError {
    #[error("no letter-grade mapping for '{letter}' on record '{name}'")]
    UnmappableGrade { name: String, letter: String },

    #[error("no {category} records with a mark above zero")]
    NoGradeData { category: GradeCategory },

    #[error(
        "weights must be non-negative and sum to 1.0 (got secondary {secondary} + exam {exam})"
    )]
    InvalidWeights { secondary: f64, exam: f64 },

    #[error("record '{name}': mark {value} exceeds the {scale} upper bound of {upper}")]
    OutOfRange {
        name: String,
        value: f64,
        scale: GradeScale,
        upper: f64,
    },

    #[error("malformed grade record '{name}': {reason}")]
    MalformedRecord { name: String, reason: String },
}
