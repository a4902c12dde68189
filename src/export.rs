use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::UserRiskSummary;
use crate::risk::{self, RiskThresholds};
use crate::stats::round_to;

#[derive(Serialize)]
struct SummaryRow<'a> {
    user_id: Uuid,
    name: &'a str,
    age: i32,
    context: &'a str,
    gender: &'a str,
    total_surveys: usize,
    avg_mood: f64,
    avg_wellness: f64,
    avg_anxiety: f64,
    avg_sleep: f64,
    avg_social: f64,
    avg_energy: f64,
    avg_stress: f64,
    avg_hopeful: f64,
    crisis_count: usize,
    crisis_rate: f64,
    mood_trend: &'static str,
    wellness_trend: &'static str,
    last_survey: Option<DateTime<Utc>>,
    days_since_last: Option<i64>,
    high_risk: bool,
}

impl<'a> SummaryRow<'a> {
    fn new(summary: &'a UserRiskSummary, thresholds: &RiskThresholds) -> Self {
        Self {
            user_id: summary.user_id,
            name: &summary.name,
            age: summary.age,
            context: &summary.context,
            gender: &summary.gender,
            total_surveys: summary.total_surveys,
            avg_mood: round_to(summary.avg_mood, 2),
            avg_wellness: round_to(summary.avg_wellness, 2),
            avg_anxiety: round_to(summary.avg_anxiety, 2),
            avg_sleep: round_to(summary.avg_sleep, 2),
            avg_social: round_to(summary.avg_social, 2),
            avg_energy: round_to(summary.avg_energy, 2),
            avg_stress: round_to(summary.avg_stress, 2),
            avg_hopeful: round_to(summary.avg_hopeful, 2),
            crisis_count: summary.crisis_count,
            crisis_rate: round_to(summary.crisis_rate, 1),
            mood_trend: summary.mood_trend.as_str(),
            wellness_trend: summary.wellness_trend.as_str(),
            last_survey: summary.last_survey,
            days_since_last: summary.days_since_last,
            high_risk: risk::is_high_risk(summary, thresholds),
        }
    }
}

pub fn write_summaries<W: Write>(
    writer: W,
    summaries: &[UserRiskSummary],
    thresholds: &RiskThresholds,
) -> anyhow::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for summary in summaries {
        csv.serialize(SummaryRow::new(summary, thresholds))?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_summaries_csv(
    path: &Path,
    summaries: &[UserRiskSummary],
    thresholds: &RiskThresholds,
) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)?;
    write_summaries(file, summaries, thresholds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SurveyKind, SurveyRecord, SurveyResponses, UserProfile};
    use crate::trend::TrendPolicy;

    #[test]
    fn writes_one_row_per_user_with_risk_flag() {
        let user = UserProfile::new(Uuid::new_v4(), "Avery Lee", 16, "foster care", None, Utc::now())
            .unwrap();
        let surveys = vec![SurveyRecord::submit(
            user.id,
            SurveyKind::Weekly,
            SurveyResponses::complete(1, 5, 1, 1, 1, 5, 1),
        )];
        let summary = risk::profile_user(&user, &surveys, &TrendPolicy::default(), Utc::now());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summaries.csv");
        write_summaries_csv(&path, &[summary], &RiskThresholds::default()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("user_id,name,age,context,gender"));
        assert!(header.ends_with("high_risk"));

        let row = lines.next().unwrap();
        assert!(row.contains("Avery Lee"));
        assert!(row.contains("unknown"));
        assert!(row.ends_with("true"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn empty_input_writes_nothing() {
        let mut buffer = Vec::new();
        write_summaries(&mut buffer, &[], &RiskThresholds::default()).unwrap();
        assert!(buffer.is_empty());
    }
}
