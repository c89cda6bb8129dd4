use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GradeError;

/// How a raw mark is to be interpreted. Conversion is driven by this tag
/// alone; the magnitude of the mark is never used to guess a scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeScale {
    ZeroToTwenty,
    ZeroToTwoHundred,
    OtherNumeric,
    Letter,
    Gpa,
}

impl GradeScale {
    pub fn as_str(&self) -> &'static str {
        match self {
            GradeScale::ZeroToTwenty => "zero_to_twenty",
            GradeScale::ZeroToTwoHundred => "zero_to_two_hundred",
            GradeScale::OtherNumeric => "other_numeric",
            GradeScale::Letter => "letter",
            GradeScale::Gpa => "gpa",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "zero_to_twenty" => Some(GradeScale::ZeroToTwenty),
            "zero_to_two_hundred" => Some(GradeScale::ZeroToTwoHundred),
            "other_numeric" => Some(GradeScale::OtherNumeric),
            "letter" => Some(GradeScale::Letter),
            "gpa" => Some(GradeScale::Gpa),
            _ => None,
        }
    }
}

impl std::fmt::Display for GradeScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeCategory {
    SecondarySubject,
    NationalExam,
}

impl GradeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            GradeCategory::SecondarySubject => "secondary_subject",
            GradeCategory::NationalExam => "national_exam",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "secondary_subject" => Some(GradeCategory::SecondarySubject),
            "national_exam" => Some(GradeCategory::NationalExam),
            _ => None,
        }
    }
}

impl std::fmt::Display for GradeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearLevel {
    Tenth,
    Eleventh,
    Twelfth,
    /// Undated records, e.g. international transcripts without a year.
    #[default]
    Unspecified,
}

impl YearLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            YearLevel::Tenth => "tenth",
            YearLevel::Eleventh => "eleventh",
            YearLevel::Twelfth => "twelfth",
            YearLevel::Unspecified => "unspecified",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "tenth" => Some(YearLevel::Tenth),
            "eleventh" => Some(YearLevel::Eleventh),
            "twelfth" => Some(YearLevel::Twelfth),
            "unspecified" => Some(YearLevel::Unspecified),
            _ => None,
        }
    }
}

impl std::fmt::Display for YearLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw mark as it arrives from manual entry or the extraction service.
/// Letter grades stay textual until a conversion table resolves them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GradeMark {
    Numeric(f64),
    Letter(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub name: String,
    pub mark: GradeMark,
    pub scale: GradeScale,
    /// Upper bound for `other_numeric` marks; 100 when absent.
    #[serde(default)]
    pub scale_upper_bound: Option<f64>,
    #[serde(default)]
    pub year_level: YearLevel,
    pub category: GradeCategory,
}

impl GradeRecord {
    /// National-exam names carry a trailing numeric code, e.g.
    /// "Matemática A (635)".
    pub fn exam_code(&self) -> Option<u32> {
        let trimmed = self.name.trim_end();
        let inner = trimmed[trimmed.rfind('(')? + 1..].strip_suffix(')')?;
        if inner.is_empty() || !inner.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        inner.parse().ok()
    }

    /// Boundary check: the mark kind must agree with the declared scale.
    pub fn validate(&self) -> Result<(), GradeError> {
        match (&self.mark, self.scale) {
            (GradeMark::Letter(_), GradeScale::Letter) => Ok(()),
            (GradeMark::Numeric(_), GradeScale::Letter) => Err(GradeError::MalformedRecord {
                name: self.name.clone(),
                reason: "numeric mark tagged with the letter scale".to_string(),
            }),
            (GradeMark::Letter(letter), scale) => Err(GradeError::MalformedRecord {
                name: self.name.clone(),
                reason: format!("letter mark '{letter}' tagged with the {scale} scale"),
            }),
            (GradeMark::Numeric(value), _) if !value.is_finite() => {
                Err(GradeError::MalformedRecord {
                    name: self.name.clone(),
                    reason: "mark is not a finite number".to_string(),
                })
            }
            (GradeMark::Numeric(_), _) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentGradeProfile {
    pub student_track: String,
    pub current_year_level: YearLevel,
    pub records: Vec<GradeRecord>,
}

impl StudentGradeProfile {
    pub fn validate(&self) -> Result<(), GradeError> {
        for record in &self.records {
            record.validate()?;
        }
        Ok(())
    }
}

/// A grade after normalization: 0–20 points for secondary subjects,
/// 0–200 points for national exams.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedGrade {
    pub name: String,
    pub points: f64,
    pub category: GradeCategory,
    pub year_level: YearLevel,
}

pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightConfig {
    pub secondary_weight: f64,
    pub exam_weight: f64,
}

impl WeightConfig {
    pub fn new(secondary_weight: f64, exam_weight: f64) -> Result<Self, GradeError> {
        let config = Self {
            secondary_weight,
            exam_weight,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GradeError> {
        let valid = self.secondary_weight >= 0.0
            && self.exam_weight >= 0.0
            && (self.sum() - 1.0).abs() < WEIGHT_SUM_TOLERANCE;
        if valid {
            Ok(())
        } else {
            Err(GradeError::InvalidWeights {
                secondary: self.secondary_weight,
                exam: self.exam_weight,
            })
        }
    }

    pub fn sum(&self) -> f64 {
        self.secondary_weight + self.exam_weight
    }
}

/// Named weight splits. The reference UI picked these by matching label
/// substrings; here they are a closed set decoupled from presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightPreset {
    Standard,
    EqualWeight,
    SecondaryOnly,
}

impl WeightPreset {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "standard" => Some(WeightPreset::Standard),
            "equal-weight" => Some(WeightPreset::EqualWeight),
            "secondary-only" => Some(WeightPreset::SecondaryOnly),
            _ => None,
        }
    }

    pub fn config(self) -> WeightConfig {
        match self {
            WeightPreset::Standard => WeightConfig {
                secondary_weight: 0.65,
                exam_weight: 0.35,
            },
            WeightPreset::EqualWeight => WeightConfig {
                secondary_weight: 0.5,
                exam_weight: 0.5,
            },
            WeightPreset::SecondaryOnly => WeightConfig {
                secondary_weight: 1.0,
                exam_weight: 0.0,
            },
        }
    }
}

/// A computed admission average, held internally on the 0–200 scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdmissionScore(f64);

impl AdmissionScore {
    pub fn from_two_hundred(value: f64) -> Self {
        Self(value)
    }

    pub fn on_two_hundred(self) -> f64 {
        self.0
    }

    pub fn on_twenty(self) -> f64 {
        self.0 / 10.0
    }
}

/// One historical program-offering row; `required_grade` is the entry score
/// of the last admitted student (0–200), 0 meaning no recorded threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub program_name: String,
    pub institution_name: String,
    pub region: String,
    pub required_grade: f64,
    pub vacancies: i64,
    pub placed: i64,
    pub cycle_year: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdStats {
    pub min_required: f64,
    pub max_required: f64,
    pub avg_required: f64,
    pub sample_size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub matched_entries: Vec<CatalogEntry>,
    /// `None` when nothing matched or no matched entry has a recorded
    /// threshold; never a stand-in zero.
    pub stats: Option<ThresholdStats>,
}

impl MatchResult {
    pub fn is_empty(&self) -> bool {
        self.matched_entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Safe,
    Target,
    Reach,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Safe => "safe",
            Tier::Target => "target",
            Tier::Reach => "reach",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub tier: Tier,
    pub margin: f64,
}

#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub track: String,
    pub current_year: YearLevel,
}
