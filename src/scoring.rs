//! Wellness score and crisis flag for a single survey.
//!
//! Both functions are total over any [`SurveyResponses`]: out-of-range answers are
//! read as unanswered, and an entirely unanswered survey scores [`NO_DATA_SCORE`].

use serde::Serialize;

use crate::models::{Dimension, SurveyResponses};

/// Score reported for a survey with no usable answers. Sits outside 1-5.
pub const NO_DATA_SCORE: f64 = 0.0;

/// Value substituted for an unanswered question when scoring.
pub const NEUTRAL_ANSWER: f64 = 3.0;

pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 5.0;

const MOOD_WEIGHT: f64 = 0.4;
const PROTECTIVE_WEIGHT: f64 = 0.3;
const RISK_WEIGHT: f64 = 0.3;
/// Risk factors are mirrored around this value so high anxiety lowers the score.
const RISK_INVERSION: f64 = 6.0;

const LOW_ANSWER: u8 = 2;
const HIGH_ANSWER: u8 = 4;
const HOPELESS_ANSWER: u8 = 1;
const RISK_HITS_FOR_CRISIS: usize = 4;

/// Score and flag derived together from one set of responses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Assessment {
    pub wellness_score: f64,
    pub crisis_alert: bool,
}

impl Assessment {
    pub fn has_data(&self) -> bool {
        self.wellness_score != NO_DATA_SCORE
    }

    pub fn wellness(&self) -> Option<f64> {
        self.has_data().then_some(self.wellness_score)
    }
}

/// Why a survey was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrisisTrigger {
    LowMood,
    Hopelessness,
    MultipleRiskFactors,
}

impl CrisisTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrisisTrigger::LowMood => "low_mood",
            CrisisTrigger::Hopelessness => "hopelessness",
            CrisisTrigger::MultipleRiskFactors => "multiple_risk_factors",
        }
    }
}

pub fn assess(responses: &SurveyResponses) -> Assessment {
    Assessment {
        wellness_score: wellness_score(responses),
        crisis_alert: is_crisis(responses),
    }
}

pub fn wellness_score(responses: &SurveyResponses) -> f64 {
    if responses.is_empty() {
        return NO_DATA_SCORE;
    }

    let answer = |dimension: Dimension| {
        dimension
            .value(responses)
            .map(f64::from)
            .unwrap_or(NEUTRAL_ANSWER)
    };

    let protective = Dimension::PROTECTIVE.iter().map(|d| answer(*d)).sum::<f64>()
        / Dimension::PROTECTIVE.len() as f64;
    let risk =
        Dimension::RISK.iter().map(|d| answer(*d)).sum::<f64>() / Dimension::RISK.len() as f64;

    let raw = MOOD_WEIGHT * answer(Dimension::Mood)
        + PROTECTIVE_WEIGHT * protective
        + RISK_WEIGHT * (RISK_INVERSION - risk);

    raw.clamp(MIN_SCORE, MAX_SCORE)
}

pub fn is_crisis(responses: &SurveyResponses) -> bool {
    !crisis_triggers(responses).is_empty()
}

/// Every crisis condition the responses meet, in a fixed order.
pub fn crisis_triggers(responses: &SurveyResponses) -> Vec<CrisisTrigger> {
    let mood = Dimension::Mood.value(responses);
    let hopeful = Dimension::Hopeful.value(responses);

    let mut triggers = Vec::new();
    if mood.is_some_and(|value| value <= LOW_ANSWER) {
        triggers.push(CrisisTrigger::LowMood);
    }
    if hopeful.is_some_and(|value| value <= HOPELESS_ANSWER) {
        triggers.push(CrisisTrigger::Hopelessness);
    }
    if risk_hits(responses) >= RISK_HITS_FOR_CRISIS {
        triggers.push(CrisisTrigger::MultipleRiskFactors);
    }
    triggers
}

fn risk_hits(responses: &SurveyResponses) -> usize {
    let low_mood = Dimension::Mood
        .value(responses)
        .is_some_and(|value| value <= LOW_ANSWER);
    let high_risk = Dimension::RISK
        .iter()
        .filter(|d| d.value(responses).is_some_and(|value| value >= HIGH_ANSWER))
        .count();
    let low_protective = Dimension::PROTECTIVE
        .iter()
        .filter(|d| d.value(responses).is_some_and(|value| value <= LOW_ANSWER))
        .count();

    usize::from(low_mood) + high_risk + low_protective
}
