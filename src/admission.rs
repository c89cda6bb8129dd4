use crate::error::GradeError;
use crate::grades::{normalize, LetterGradeTable};
use crate::models::{
    AdmissionScore, GradeCategory, StudentGradeProfile, WeightConfig, YearLevel,
};

/// Computes the weighted admission average on the 0–200 scale.
///
/// Secondary subjects are pooled across all year levels into one mean on
/// 0–20, then lifted to 0–200. Tenth graders cannot have taken national
/// exams, so their result is the secondary component alone whatever the
/// configured weights say; the same fallback applies when no exam marks
/// have been entered yet. No rounding happens here.
pub fn calculate_admission_average(
    profile: &StudentGradeProfile,
    weights: &WeightConfig,
    letters: Option<&LetterGradeTable>,
) -> Result<AdmissionScore, GradeError> {
    weights.validate()?;

    let mut secondary_points = Vec::new();
    let mut exam_points = Vec::new();

    for record in &profile.records {
        if let Some(grade) = normalize(record, letters)? {
            match grade.category {
                GradeCategory::SecondarySubject => secondary_points.push(grade.points),
                GradeCategory::NationalExam => exam_points.push(grade.points),
            }
        }
    }

    if secondary_points.is_empty() {
        return Err(GradeError::NoGradeData {
            category: GradeCategory::SecondarySubject,
        });
    }

    let secondary_avg = mean(&secondary_points);
    let secondary_200 = secondary_avg * 10.0;

    let score = if profile.current_year_level == YearLevel::Tenth || exam_points.is_empty() {
        secondary_200
    } else {
        let exam_avg = mean(&exam_points);
        secondary_200 * weights.secondary_weight + exam_avg * weights.exam_weight
    };

    Ok(AdmissionScore::from_two_hundred(score))
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GradeMark, GradeRecord, GradeScale, WeightPreset};

    fn subject(name: &str, value: f64, year: YearLevel) -> GradeRecord {
        GradeRecord {
            name: name.to_string(),
            mark: GradeMark::Numeric(value),
            scale: GradeScale::ZeroToTwenty,
            scale_upper_bound: None,
            year_level: year,
            category: GradeCategory::SecondarySubject,
        }
    }

    fn exam(name: &str, value: f64) -> GradeRecord {
        GradeRecord {
            name: name.to_string(),
            mark: GradeMark::Numeric(value),
            scale: GradeScale::ZeroToTwoHundred,
            scale_upper_bound: None,
            year_level: YearLevel::Twelfth,
            category: GradeCategory::NationalExam,
        }
    }

    fn twelfth_grade_profile() -> StudentGradeProfile {
        StudentGradeProfile {
            student_track: "Ciências e Tecnologias".to_string(),
            current_year_level: YearLevel::Twelfth,
            records: vec![
                subject("Português", 15.0, YearLevel::Twelfth),
                subject("Matemática A", 17.0, YearLevel::Twelfth),
                exam("Português (639)", 150.0),
                exam("Matemática A (635)", 170.0),
            ],
        }
    }

    #[test]
    fn blends_secondary_and_exam_components() {
        let weights = WeightConfig::new(0.65, 0.35).unwrap();
        let score =
            calculate_admission_average(&twelfth_grade_profile(), &weights, None).unwrap();
        // secondary_avg 16 -> 160; exam_avg 160; 160*0.65 + 160*0.35 = 160.
        assert!((score.on_two_hundred() - 160.0).abs() < 1e-12);
        assert!((score.on_twenty() - 16.0).abs() < 1e-12);
    }

    #[test]
    fn falls_back_to_secondary_when_no_exams_entered() {
        let mut profile = twelfth_grade_profile();
        profile
            .records
            .retain(|r| r.category == GradeCategory::SecondarySubject);
        let weights = WeightConfig::new(0.65, 0.35).unwrap();
        let score = calculate_admission_average(&profile, &weights, None).unwrap();
        assert!((score.on_two_hundred() - 160.0).abs() < 1e-12);
    }

    #[test]
    fn zero_exam_marks_count_as_not_entered() {
        let mut profile = twelfth_grade_profile();
        for record in &mut profile.records {
            if record.category == GradeCategory::NationalExam {
                record.mark = GradeMark::Numeric(0.0);
            }
        }
        let weights = WeightPreset::Standard.config();
        let score = calculate_admission_average(&profile, &weights, None).unwrap();
        assert!((score.on_two_hundred() - 160.0).abs() < 1e-12);
    }

    #[test]
    fn tenth_grade_ignores_weights_and_exam_records() {
        let profile = StudentGradeProfile {
            student_track: "Ciências e Tecnologias".to_string(),
            current_year_level: YearLevel::Tenth,
            records: vec![
                subject("Português", 14.0, YearLevel::Tenth),
                // A stray predicted exam must not leak into a 10th-grade score.
                exam("Matemática A (635)", 190.0),
            ],
        };
        let weights = WeightConfig::new(0.5, 0.5).unwrap();
        let score = calculate_admission_average(&profile, &weights, None).unwrap();
        assert!((score.on_two_hundred() - 140.0).abs() < 1e-12);
    }

    #[test]
    fn pools_years_instead_of_averaging_averages() {
        // One 10th-year mark and three 12th-year marks: the pooled mean is
        // (10 + 14 + 14 + 14) / 4 = 13, not (10 + 14) / 2 = 12.
        let profile = StudentGradeProfile {
            student_track: "Línguas e Humanidades".to_string(),
            current_year_level: YearLevel::Twelfth,
            records: vec![
                subject("Filosofia", 10.0, YearLevel::Tenth),
                subject("Português", 14.0, YearLevel::Twelfth),
                subject("História A", 14.0, YearLevel::Twelfth),
                subject("Geografia A", 14.0, YearLevel::Twelfth),
            ],
        };
        let weights = WeightPreset::Standard.config();
        let score = calculate_admission_average(&profile, &weights, None).unwrap();
        assert!((score.on_two_hundred() - 130.0).abs() < 1e-12);
    }

    #[test]
    fn zero_valued_record_changes_nothing() {
        let weights = WeightPreset::Standard.config();
        let baseline =
            calculate_admission_average(&twelfth_grade_profile(), &weights, None).unwrap();

        let mut padded = twelfth_grade_profile();
        padded
            .records
            .push(subject("Educação Física", 0.0, YearLevel::Eleventh));
        let with_zero = calculate_admission_average(&padded, &weights, None).unwrap();

        assert_eq!(baseline.on_two_hundred(), with_zero.on_two_hundred());
    }

    #[test]
    fn repeated_calls_are_bit_identical() {
        let weights = WeightConfig::new(0.65, 0.35).unwrap();
        let profile = twelfth_grade_profile();
        let first = calculate_admission_average(&profile, &weights, None).unwrap();
        let second = calculate_admission_average(&profile, &weights, None).unwrap();
        assert_eq!(
            first.on_two_hundred().to_bits(),
            second.on_two_hundred().to_bits()
        );
    }

    #[test]
    fn empty_secondary_category_is_named_in_the_error() {
        let profile = StudentGradeProfile {
            student_track: "Ciências e Tecnologias".to_string(),
            current_year_level: YearLevel::Twelfth,
            records: vec![exam("Matemática A (635)", 170.0)],
        };
        let weights = WeightPreset::Standard.config();
        let result = calculate_admission_average(&profile, &weights, None);
        assert_eq!(
            result,
            Err(GradeError::NoGradeData {
                category: GradeCategory::SecondarySubject
            })
        );
    }

    #[test]
    fn invalid_weights_are_rejected_before_any_arithmetic() {
        let weights = WeightConfig {
            secondary_weight: 0.9,
            exam_weight: 0.9,
        };
        let result = calculate_admission_average(&twelfth_grade_profile(), &weights, None);
        assert!(matches!(result, Err(GradeError::InvalidWeights { .. })));
    }

    #[test]
    fn letter_grades_flow_through_the_supplied_table() {
        let table = LetterGradeTable::from_pairs([("A", 18.0), ("B", 15.0)]);
        let profile = StudentGradeProfile {
            student_track: "International".to_string(),
            current_year_level: YearLevel::Unspecified,
            records: vec![
                GradeRecord {
                    name: "Mathematics".to_string(),
                    mark: GradeMark::Letter("A".to_string()),
                    scale: GradeScale::Letter,
                    scale_upper_bound: None,
                    year_level: YearLevel::Unspecified,
                    category: GradeCategory::SecondarySubject,
                },
                GradeRecord {
                    name: "Physics".to_string(),
                    mark: GradeMark::Letter("B".to_string()),
                    scale: GradeScale::Letter,
                    scale_upper_bound: None,
                    year_level: YearLevel::Unspecified,
                    category: GradeCategory::SecondarySubject,
                },
            ],
        };
        let weights = WeightPreset::Standard.config();
        let score = calculate_admission_average(&profile, &weights, Some(&table)).unwrap();
        assert!((score.on_two_hundred() - 165.0).abs() < 1e-12);
    }
}
