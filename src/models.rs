use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::scoring::{self, Assessment};
use crate::trend::Trend;

pub const MIN_AGE: i32 = 13;
pub const MAX_AGE: i32 = 25;
pub const MIN_ANSWER: u8 = 1;
pub const MAX_ANSWER: u8 = 5;

/// Bucket for demographic fields that were left blank.
pub const UNKNOWN_LABEL: &str = "unknown";

/// One question of the standard survey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Mood,
    Anxiety,
    Sleep,
    Social,
    Energy,
    Stress,
    Hopeful,
}

impl Dimension {
    pub const ALL: [Dimension; 7] = [
        Dimension::Mood,
        Dimension::Anxiety,
        Dimension::Sleep,
        Dimension::Social,
        Dimension::Energy,
        Dimension::Stress,
        Dimension::Hopeful,
    ];

    /// Protective factors: higher answers mean better wellbeing.
    pub const PROTECTIVE: [Dimension; 4] = [
        Dimension::Sleep,
        Dimension::Social,
        Dimension::Energy,
        Dimension::Hopeful,
    ];

    /// Risk factors: higher answers mean worse wellbeing.
    pub const RISK: [Dimension; 2] = [Dimension::Anxiety, Dimension::Stress];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Mood => "mood",
            Dimension::Anxiety => "anxiety",
            Dimension::Sleep => "sleep",
            Dimension::Social => "social",
            Dimension::Energy => "energy",
            Dimension::Stress => "stress",
            Dimension::Hopeful => "hopeful",
        }
    }

    /// The question as shown to respondents.
    pub fn question(&self) -> &'static str {
        match self {
            Dimension::Mood => "How do you feel today on a scale from 1 to 5?",
            Dimension::Anxiety => "How anxious do you feel? (1-5)",
            Dimension::Sleep => "How would you rate your sleep quality? (1-5)",
            Dimension::Social => "Did you feel connected to others today? (1-5)",
            Dimension::Energy => "What is your energy level? (1-5)",
            Dimension::Stress => "How stressed do you feel? (1-5)",
            Dimension::Hopeful => "How hopeful do you feel about the future? (1-5)",
        }
    }

    /// Answer for this dimension, ignoring values outside 1-5.
    pub fn value(&self, responses: &SurveyResponses) -> Option<u8> {
        self.raw(responses)
            .filter(|value| (MIN_ANSWER..=MAX_ANSWER).contains(value))
    }

    fn raw(&self, responses: &SurveyResponses) -> Option<u8> {
        match self {
            Dimension::Mood => responses.mood,
            Dimension::Anxiety => responses.anxiety,
            Dimension::Sleep => responses.sleep,
            Dimension::Social => responses.social,
            Dimension::Energy => responses.energy,
            Dimension::Stress => responses.stress,
            Dimension::Hopeful => responses.hopeful,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answers to the seven survey questions. Unanswered questions are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyResponses {
    pub mood: Option<u8>,
    pub anxiety: Option<u8>,
    pub sleep: Option<u8>,
    pub social: Option<u8>,
    pub energy: Option<u8>,
    pub stress: Option<u8>,
    pub hopeful: Option<u8>,
}

impl SurveyResponses {
    /// Every question answered.
    #[allow(clippy::too_many_arguments)]
    pub fn complete(
        mood: u8,
        anxiety: u8,
        sleep: u8,
        social: u8,
        energy: u8,
        stress: u8,
        hopeful: u8,
    ) -> Self {
        Self {
            mood: Some(mood),
            anxiety: Some(anxiety),
            sleep: Some(sleep),
            social: Some(social),
            energy: Some(energy),
            stress: Some(stress),
            hopeful: Some(hopeful),
        }
    }

    /// Rejects answers outside 1-5.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for dimension in Dimension::ALL {
            if let Some(value) = dimension.raw(self) {
                if !(MIN_ANSWER..=MAX_ANSWER).contains(&value) {
                    return Err(ValidationError::ResponseOutOfRange {
                        dimension,
                        value: i32::from(value),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        Dimension::ALL.iter().all(|d| d.value(self).is_none())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyKind {
    #[default]
    Daily,
    Weekly,
    Special,
    Quick,
}

impl SurveyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurveyKind::Daily => "daily",
            SurveyKind::Weekly => "weekly",
            SurveyKind::Special => "special",
            SurveyKind::Quick => "quick",
        }
    }
}

impl fmt::Display for SurveyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SurveyKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(SurveyKind::Daily),
            "weekly" => Ok(SurveyKind::Weekly),
            "special" => Ok(SurveyKind::Special),
            "quick" => Ok(SurveyKind::Quick),
            _ => Err(ValidationError::UnknownSurveyKind(value.to_string())),
        }
    }
}

/// A submitted survey together with its derived wellness score and crisis flag.
///
/// The derived fields are only ever written by [`scoring::assess`], either when the
/// record is built or when its responses are replaced, so they always agree with the
/// responses they were computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyRecord {
    id: Uuid,
    user_id: Uuid,
    taken_at: DateTime<Utc>,
    kind: SurveyKind,
    #[serde(flatten)]
    responses: SurveyResponses,
    #[serde(flatten)]
    assessment: Assessment,
}

impl SurveyRecord {
    pub fn new(
        id: Uuid,
        user_id: Uuid,
        taken_at: DateTime<Utc>,
        kind: SurveyKind,
        responses: SurveyResponses,
    ) -> Self {
        Self {
            id,
            user_id,
            taken_at,
            kind,
            responses,
            assessment: scoring::assess(&responses),
        }
    }

    /// Builds a fresh record with a random id, stamped now.
    pub fn submit(user_id: Uuid, kind: SurveyKind, responses: SurveyResponses) -> Self {
        Self::new(Uuid::new_v4(), user_id, Utc::now(), kind, responses)
    }

    /// Replaces the answers and rescores the record in one step.
    pub fn set_responses(&mut self, responses: SurveyResponses) {
        self.assessment = scoring::assess(&responses);
        self.responses = responses;
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn kind(&self) -> SurveyKind {
        self.kind
    }

    pub fn responses(&self) -> &SurveyResponses {
        &self.responses
    }

    pub fn assessment(&self) -> Assessment {
        self.assessment
    }

    pub fn wellness_score(&self) -> f64 {
        self.assessment.wellness_score
    }

    pub fn crisis_alert(&self) -> bool {
        self.assessment.crisis_alert
    }

    pub fn value(&self, dimension: Dimension) -> Option<u8> {
        dimension.value(&self.responses)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub context: String,
    pub gender: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl UserProfile {
    /// Validates and normalizes a new registration.
    pub fn new(
        id: Uuid,
        name: &str,
        age: i32,
        context: &str,
        gender: Option<&str>,
        registered_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if !(MIN_AGE..=MAX_AGE).contains(&age) {
            return Err(ValidationError::AgeOutOfRange(age));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        Ok(Self {
            id,
            name: name.to_string(),
            age,
            context: context.trim().to_string(),
            gender: gender
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            registered_at,
        })
    }

    pub fn context_label(&self) -> &str {
        label_or_unknown(Some(self.context.as_str()))
    }

    pub fn gender_label(&self) -> &str {
        label_or_unknown(self.gender.as_deref())
    }
}

fn label_or_unknown(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(label) if !label.is_empty() => label,
        _ => UNKNOWN_LABEL,
    }
}

/// Per-user view over a survey history. Recomputed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRiskSummary {
    pub user_id: Uuid,
    pub name: String,
    pub age: i32,
    pub context: String,
    pub gender: String,
    pub total_surveys: usize,
    pub scored_surveys: usize,
    pub avg_mood: f64,
    pub avg_wellness: f64,
    pub avg_anxiety: f64,
    pub avg_sleep: f64,
    pub avg_social: f64,
    pub avg_energy: f64,
    pub avg_stress: f64,
    pub avg_hopeful: f64,
    pub crisis_count: usize,
    pub crisis_rate: f64,
    pub mood_trend: Trend,
    pub wellness_trend: Trend,
    pub last_survey: Option<DateTime<Utc>>,
    pub days_since_last: Option<i64>,
}

impl UserRiskSummary {
    /// Average for one dimension; 0 when never answered.
    pub fn average(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Mood => self.avg_mood,
            Dimension::Anxiety => self.avg_anxiety,
            Dimension::Sleep => self.avg_sleep,
            Dimension::Social => self.avg_social,
            Dimension::Energy => self.avg_energy,
            Dimension::Stress => self.avg_stress,
            Dimension::Hopeful => self.avg_hopeful,
        }
    }
}
