use std::collections::HashMap;

use crate::error::GradeError;
use crate::models::{GradeCategory, GradeMark, GradeRecord, GradeScale, NormalizedGrade};

/// Caller-supplied conversion from letter grades to 0–20 points.
#[derive(Debug, Clone)]
pub struct LetterGradeTable {
    points: HashMap<String, f64>,
}

impl LetterGradeTable {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let points = pairs
            .into_iter()
            .map(|(letter, value)| (letter.into().trim().to_uppercase(), value))
            .collect();
        Self { points }
    }

    /// The common A–E banding on the 0–20 scale. F is deliberately not
    /// mapped: a failing letter grade would collide with the "not entered"
    /// rule if it became 0, so it must arrive numerically or through a
    /// caller-supplied table.
    pub fn standard() -> Self {
        Self::from_pairs([("A", 18.0), ("B", 15.0), ("C", 12.0), ("D", 8.0), ("E", 4.0)])
    }

    pub fn lookup(&self, letter: &str) -> Option<f64> {
        self.points.get(&letter.trim().to_uppercase()).copied()
    }
}

/// Converts one raw record to its canonical points: 0–20 for secondary
/// subjects, 0–200 for national exams. Returns `Ok(None)` for marks at or
/// below zero, which mean "not entered" and must stay out of every average.
/// The declared scale tag decides the conversion; magnitude never does.
pub fn normalize(
    record: &GradeRecord,
    letters: Option<&LetterGradeTable>,
) -> Result<Option<NormalizedGrade>, GradeError> {
    record.validate()?;

    // validate() has already paired letter marks with the letter scale.
    let points_20 = match (&record.mark, record.scale) {
        (GradeMark::Letter(letter), _) => {
            let table = letters.ok_or_else(|| GradeError::UnmappableGrade {
                name: record.name.clone(),
                letter: letter.clone(),
            })?;
            let points = match table.lookup(letter) {
                Some(points) => points,
                None => {
                    return Err(GradeError::UnmappableGrade {
                        name: record.name.clone(),
                        letter: letter.clone(),
                    })
                }
            };
            // Table entries obey the same bound as native 0-20 marks.
            if points > 20.0 || !points.is_finite() {
                return Err(GradeError::OutOfRange {
                    name: record.name.clone(),
                    value: points,
                    scale: GradeScale::Letter,
                    upper: 20.0,
                });
            }
            points
        }
        (GradeMark::Numeric(value), scale) => {
            if *value <= 0.0 {
                return Ok(None);
            }
            let upper = match scale {
                GradeScale::ZeroToTwenty => 20.0,
                GradeScale::ZeroToTwoHundred => 200.0,
                GradeScale::OtherNumeric => {
                    let bound = record.scale_upper_bound.unwrap_or(100.0);
                    if !(bound > 0.0) {
                        return Err(GradeError::MalformedRecord {
                            name: record.name.clone(),
                            reason: format!("non-positive scale upper bound {bound}"),
                        });
                    }
                    bound
                }
                GradeScale::Gpa => 4.0,
                GradeScale::Letter => unreachable!("validate rejects numeric letter marks"),
            };
            if *value > upper {
                return Err(GradeError::OutOfRange {
                    name: record.name.clone(),
                    value: *value,
                    scale,
                    upper,
                });
            }
            value / upper * 20.0
        }
    };

    if points_20 <= 0.0 {
        return Ok(None);
    }

    let points = match record.category {
        GradeCategory::SecondarySubject => points_20,
        GradeCategory::NationalExam => points_20 * 10.0,
    };

    Ok(Some(NormalizedGrade {
        name: record.name.clone(),
        points,
        category: record.category,
        year_level: record.year_level,
    }))
}
