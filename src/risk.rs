use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use uuid::Uuid;

use crate::models::{Dimension, SurveyRecord, UserProfile, UserRiskSummary};
use crate::scoring::{self, CrisisTrigger};
use crate::stats;
use crate::trend::{Trend, TrendPolicy};

/// Cut-offs for the high-risk predicate. Any one clause is enough.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    /// Average wellness at or below this is high risk.
    pub wellness: f64,
    /// Percentage of crisis surveys at or above this is high risk.
    pub crisis_rate: f64,
    /// Average hope at or below this is high risk.
    pub hopeful: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        // 6.0 sits above the 1-5 score range; kept as the long-standing default.
        Self {
            wellness: 6.0,
            crisis_rate: 30.0,
            hopeful: 2.0,
        }
    }
}

impl RiskThresholds {
    /// Human-readable problems with the configured cut-offs.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.wellness >= crate::scoring::MAX_SCORE {
            warnings.push(format!(
                "wellness threshold {:.1} is at or above the maximum score {:.1}; every user with surveys will be flagged high risk",
                self.wellness,
                crate::scoring::MAX_SCORE
            ));
        }
        if self.crisis_rate <= 0.0 {
            warnings.push(format!(
                "crisis rate threshold {:.1} flags every user",
                self.crisis_rate
            ));
        }
        warnings
    }
}

/// Average, direction and latest answer of one dimension across a history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionTrend {
    pub dimension: Dimension,
    pub answered: usize,
    pub average: f64,
    pub trend: Trend,
    pub latest: Option<u8>,
}

/// Longest look-back accepted from configuration or the command line.
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// Start of a window of `since_days` days ending at `now`. Windows reaching past
/// the representable calendar start at its first instant.
pub fn cutoff(now: DateTime<Utc>, since_days: i64) -> DateTime<Utc> {
    Duration::try_days(since_days.max(1))
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Surveys taken within the last `since_days` days of `now`.
pub fn within_window(
    surveys: &[SurveyRecord],
    now: DateTime<Utc>,
    since_days: i64,
) -> Vec<&SurveyRecord> {
    let from = cutoff(now, since_days);
    surveys
        .iter()
        .filter(|s| s.taken_at() >= from && s.taken_at() <= now)
        .collect()
}

/// Case-insensitive substring match of a context filter.
pub fn context_matches(context: &str, query: &str) -> bool {
    context
        .to_lowercase()
        .contains(query.trim().to_lowercase().as_str())
}

/// A survey that raised a crisis alert, with the answers that raised it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrisisAlert {
    pub survey_id: Uuid,
    pub user_id: Uuid,
    pub taken_at: DateTime<Utc>,
    pub wellness_score: f64,
    pub triggers: Vec<CrisisTrigger>,
}

/// Crisis alerts among `surveys`, newest first.
pub fn crisis_alerts<'a>(
    surveys: impl IntoIterator<Item = &'a SurveyRecord>,
) -> Vec<CrisisAlert> {
    let mut alerts: Vec<CrisisAlert> = surveys
        .into_iter()
        .filter(|s| s.crisis_alert())
        .map(|s| CrisisAlert {
            survey_id: s.id(),
            user_id: s.user_id(),
            taken_at: s.taken_at(),
            wellness_score: s.wellness_score(),
            triggers: scoring::crisis_triggers(s.responses()),
        })
        .collect();
    alerts.sort_by(|a, b| b.taken_at.cmp(&a.taken_at));
    alerts
}

/// Oldest first. Ties keep their input order.
fn chronological<'a>(
    user: &UserProfile,
    surveys: impl IntoIterator<Item = &'a SurveyRecord>,
) -> Vec<&'a SurveyRecord> {
    let mut own: Vec<&SurveyRecord> = surveys
        .into_iter()
        .filter(|s| s.user_id() == user.id)
        .collect();
    own.sort_by_key(|s| s.taken_at());
    own
}

fn answers(surveys: &[&SurveyRecord], dimension: Dimension) -> Vec<f64> {
    surveys
        .iter()
        .filter_map(|s| s.value(dimension))
        .map(f64::from)
        .collect()
}

/// Summarises one user's history. Records owned by other users are ignored.
pub fn profile_user<'a>(
    user: &UserProfile,
    surveys: impl IntoIterator<Item = &'a SurveyRecord>,
    policy: &TrendPolicy,
    now: DateTime<Utc>,
) -> UserRiskSummary {
    let history = chronological(user, surveys);
    let scored: Vec<&SurveyRecord> = history
        .iter()
        .copied()
        .filter(|s| s.assessment().has_data())
        .collect();

    let wellness: Vec<f64> = scored.iter().map(|s| s.wellness_score()).collect();
    let moods = answers(&scored, Dimension::Mood);
    let average = |dimension| stats::mean_or_zero(&answers(&scored, dimension));

    let crisis_count = history.iter().filter(|s| s.crisis_alert()).count();
    let last_survey = history.last().map(|s| s.taken_at());

    UserRiskSummary {
        user_id: user.id,
        name: user.name.clone(),
        age: user.age,
        context: user.context_label().to_string(),
        gender: user.gender_label().to_string(),
        total_surveys: history.len(),
        scored_surveys: scored.len(),
        avg_mood: stats::mean_or_zero(&moods),
        avg_wellness: stats::mean_or_zero(&wellness),
        avg_anxiety: average(Dimension::Anxiety),
        avg_sleep: average(Dimension::Sleep),
        avg_social: average(Dimension::Social),
        avg_energy: average(Dimension::Energy),
        avg_stress: average(Dimension::Stress),
        avg_hopeful: average(Dimension::Hopeful),
        crisis_count,
        crisis_rate: stats::percentage(crisis_count, history.len()),
        mood_trend: policy.classify(&moods),
        wellness_trend: policy.classify(&wellness),
        last_survey,
        days_since_last: last_survey.map(|last| (now - last).num_days()),
    }
}

/// A user is high risk when any configured clause holds.
///
/// The hope clause only applies to users who answered the hope question at least
/// once; an average of 0 means "never answered", not "no hope".
pub fn is_high_risk(summary: &UserRiskSummary, thresholds: &RiskThresholds) -> bool {
    let answered_hope = summary.avg_hopeful >= f64::from(crate::models::MIN_ANSWER);
    summary.avg_wellness <= thresholds.wellness
        || summary.crisis_rate >= thresholds.crisis_rate
        || (answered_hope && summary.avg_hopeful <= thresholds.hopeful)
}

/// Per-dimension view of a user's history, excluding mood.
pub fn dimension_trends(
    user: &UserProfile,
    surveys: &[SurveyRecord],
    policy: &TrendPolicy,
) -> Vec<DimensionTrend> {
    let history = chronological(user, surveys);

    Dimension::ALL
        .iter()
        .filter(|d| **d != Dimension::Mood)
        .map(|dimension| {
            let values = answers(&history, *dimension);
            DimensionTrend {
                dimension: *dimension,
                answered: values.len(),
                average: stats::mean_or_zero(&values),
                trend: policy.classify(&values),
                latest: history.iter().rev().find_map(|s| s.value(*dimension)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SurveyKind, SurveyResponses};
    use uuid::Uuid;

    fn user() -> UserProfile {
        UserProfile::new(
            Uuid::new_v4(),
            "Avery Lee",
            16,
            "foster care",
            Some("female"),
            Utc::now(),
        )
        .unwrap()
    }

    fn survey(user: &UserProfile, days_ago: i64, responses: SurveyResponses) -> SurveyRecord {
        SurveyRecord::new(
            Uuid::new_v4(),
            user.id,
            Utc::now() - Duration::days(days_ago),
            SurveyKind::Daily,
            responses,
        )
    }

    fn mood(value: u8) -> SurveyResponses {
        SurveyResponses {
            mood: Some(value),
            hopeful: Some(3),
            ..Default::default()
        }
    }

    #[test]
    fn user_without_surveys_gets_neutral_summary() {
        let user = user();
        let summary = profile_user(&user, Vec::new(), &TrendPolicy::default(), Utc::now());
        assert_eq!(summary.total_surveys, 0);
        assert_eq!(summary.avg_wellness, 0.0);
        assert_eq!(summary.crisis_rate, 0.0);
        assert_eq!(summary.mood_trend, Trend::Stable);
        assert_eq!(summary.days_since_last, None);
        assert_eq!(summary.last_survey, None);
    }

    #[test]
    fn unordered_history_is_sorted_before_trend() {
        let user = user();
        // supplied newest first; chronologically mood rises 1 -> 5
        let surveys = vec![
            survey(&user, 1, mood(5)),
            survey(&user, 3, mood(3)),
            survey(&user, 5, mood(1)),
        ];
        let summary = profile_user(&user, &surveys, &TrendPolicy::default(), Utc::now());
        assert_eq!(summary.mood_trend, Trend::Improving);
        assert_eq!(summary.days_since_last, Some(1));
        assert!((summary.avg_mood - 3.0).abs() < 1e-9);
    }

    #[test]
    fn no_data_surveys_are_left_out_of_averages() {
        let user = user();
        let surveys = vec![
            survey(&user, 2, SurveyResponses::complete(5, 1, 5, 5, 5, 1, 5)),
            survey(&user, 1, SurveyResponses::default()),
        ];
        let summary = profile_user(&user, &surveys, &TrendPolicy::default(), Utc::now());
        assert_eq!(summary.total_surveys, 2);
        assert_eq!(summary.scored_surveys, 1);
        assert!((summary.avg_wellness - 5.0).abs() < 1e-9);
        assert_eq!(summary.avg_anxiety, 1.0);
    }

    #[test]
    fn crisis_rate_counts_every_survey() {
        let user = user();
        let surveys = vec![
            survey(&user, 4, mood(1)),
            survey(&user, 3, mood(4)),
            survey(&user, 2, mood(4)),
            survey(&user, 1, SurveyResponses::default()),
        ];
        let summary = profile_user(&user, &surveys, &TrendPolicy::default(), Utc::now());
        assert_eq!(summary.crisis_count, 1);
        assert!((summary.crisis_rate - 25.0).abs() < 1e-9);
    }

    #[test]
    fn other_users_surveys_are_ignored() {
        let user = user();
        let other = UserProfile::new(Uuid::new_v4(), "Jules", 19, "homeless", None, Utc::now())
            .unwrap();
        let surveys = vec![survey(&user, 1, mood(4)), survey(&other, 1, mood(1))];
        let summary = profile_user(&user, &surveys, &TrendPolicy::default(), Utc::now());
        assert_eq!(summary.total_surveys, 1);
        assert_eq!(summary.crisis_count, 0);
    }

    #[test]
    fn default_wellness_threshold_flags_every_scored_user() {
        let user = user();
        let surveys = vec![survey(&user, 1, SurveyResponses::complete(5, 1, 5, 5, 5, 1, 5))];
        let summary = profile_user(&user, &surveys, &TrendPolicy::default(), Utc::now());
        assert!(is_high_risk(&summary, &RiskThresholds::default()));
        assert!(!RiskThresholds::default().warnings().is_empty());
    }

    #[test]
    fn each_clause_triggers_independently() {
        let user = user();
        let strict = RiskThresholds {
            wellness: 3.0,
            ..RiskThresholds::default()
        };
        assert!(strict.warnings().is_empty());

        let healthy = vec![survey(&user, 1, SurveyResponses::complete(5, 1, 5, 5, 5, 1, 5))];
        let summary = profile_user(&user, &healthy, &TrendPolicy::default(), Utc::now());
        assert!(!is_high_risk(&summary, &strict));

        let hopeless = vec![survey(&user, 1, SurveyResponses::complete(4, 2, 4, 4, 4, 2, 2))];
        let summary = profile_user(&user, &hopeless, &TrendPolicy::default(), Utc::now());
        assert!(summary.avg_wellness > 3.0);
        assert!(is_high_risk(&summary, &strict));

        let mut crisis = summary.clone();
        crisis.avg_hopeful = 4.0;
        crisis.crisis_rate = 30.0;
        assert!(is_high_risk(&crisis, &strict));
        crisis.crisis_rate = 29.9;
        assert!(!is_high_risk(&crisis, &strict));
    }

    #[test]
    fn unanswered_hope_does_not_flag() {
        let user = user();
        let surveys = vec![survey(
            &user,
            1,
            SurveyResponses {
                mood: Some(5),
                ..Default::default()
            },
        )];
        let summary = profile_user(&user, &surveys, &TrendPolicy::default(), Utc::now());
        assert_eq!(summary.avg_hopeful, 0.0);
        let strict = RiskThresholds {
            wellness: 3.0,
            ..RiskThresholds::default()
        };
        assert!(!is_high_risk(&summary, &strict));
    }

    #[test]
    fn dimension_trends_report_latest_answer() {
        let user = user();
        let surveys = vec![
            survey(&user, 3, SurveyResponses::complete(3, 5, 2, 3, 3, 5, 3)),
            survey(&user, 2, SurveyResponses::complete(3, 3, 3, 3, 3, 3, 3)),
            survey(&user, 1, SurveyResponses::complete(3, 1, 4, 3, 3, 1, 3)),
        ];
        let trends = dimension_trends(&user, &surveys, &TrendPolicy::default());
        assert_eq!(trends.len(), 6);

        let anxiety = trends
            .iter()
            .find(|t| t.dimension == Dimension::Anxiety)
            .unwrap();
        assert_eq!(anxiety.latest, Some(1));
        assert_eq!(anxiety.trend, Trend::Declining);
        assert!((anxiety.average - 3.0).abs() < 1e-9);

        let sleep = trends.iter().find(|t| t.dimension == Dimension::Sleep).unwrap();
        assert_eq!(sleep.trend, Trend::Improving);
    }

    #[test]
    fn window_keeps_recent_surveys_only() {
        let user = user();
        let now = Utc::now();
        let surveys = vec![survey(&user, 2, mood(4)), survey(&user, 45, mood(2))];
        let recent = within_window(&surveys, now, 30);
        assert_eq!(recent.len(), 1);
        assert_eq!(cutoff(now, 0), now - Duration::days(1));
    }

    #[test]
    fn oversized_window_reaches_back_to_calendar_start() {
        let user = user();
        let now = Utc::now();
        let surveys = vec![survey(&user, 2, mood(4)), survey(&user, 4000, mood(2))];

        assert_eq!(cutoff(now, 100_000_000), DateTime::<Utc>::MIN_UTC);
        assert_eq!(cutoff(now, i64::MAX), DateTime::<Utc>::MIN_UTC);
        assert_eq!(within_window(&surveys, now, 100_000_000).len(), 2);
    }

    #[test]
    fn context_filter_ignores_case_and_matches_fragments() {
        assert!(context_matches("Foster Care", "foster"));
        assert!(context_matches("foster care", " CARE "));
        assert!(!context_matches("refugee", "foster"));
    }

    #[test]
    fn crisis_alerts_list_newest_first_with_triggers() {
        let user = user();
        let surveys = vec![
            survey(&user, 5, mood(1)),
            survey(&user, 3, mood(4)),
            survey(&user, 1, SurveyResponses::complete(2, 5, 3, 3, 3, 5, 1)),
        ];

        let alerts = crisis_alerts(&surveys);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].survey_id, surveys[2].id());
        assert_eq!(
            alerts[0].triggers,
            vec![
                CrisisTrigger::LowMood,
                CrisisTrigger::Hopelessness,
                CrisisTrigger::MultipleRiskFactors
            ]
        );
        assert_eq!(alerts[1].survey_id, surveys[0].id());
        assert_eq!(alerts[1].triggers, vec![CrisisTrigger::LowMood]);
    }
}
