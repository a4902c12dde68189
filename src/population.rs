//! Population-wide aggregation: descriptive statistics, correlation structure,
//! high-risk cohort and demographic breakdowns.
//!
//! Every function here is total. An empty population yields zero counts and empty
//! maps, and survey records whose owner is not among the supplied users are counted
//! under the `unknown` demographic bucket.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Dimension, SurveyRecord, UserProfile, UserRiskSummary, UNKNOWN_LABEL};
use crate::risk::{self, RiskThresholds};
use crate::stats;
use crate::trend::TrendPolicy;

pub const DEFAULT_TREND_WINDOW_DAYS: i64 = 30;
/// Surveys scoring below this count as low wellness in the context ranking.
pub const LOW_WELLNESS_SCORE: f64 = 3.0;
const CORRELATION_DECIMALS: i32 = 3;

/// Knobs for one analysis run. Nothing is read from global state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSettings {
    pub thresholds: RiskThresholds,
    pub trend: TrendPolicy,
    pub trend_window_days: i64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            thresholds: RiskThresholds::default(),
            trend: TrendPolicy::default(),
            trend_window_days: DEFAULT_TREND_WINDOW_DAYS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgeStatistics {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl AgeStatistics {
    fn from_ages(ages: &[f64]) -> Self {
        Self {
            mean: stats::mean_or_zero(ages),
            median: stats::median(ages).unwrap_or(0.0),
            min: ages.iter().copied().reduce(f64::min).unwrap_or(0.0),
            max: ages.iter().copied().reduce(f64::max).unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserStatistics {
    pub total: usize,
    pub age: AgeStatistics,
    pub contexts: BTreeMap<String, usize>,
    pub genders: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SurveyStatistics {
    pub total: usize,
    pub responding_users: usize,
    pub mean_mood: f64,
    pub mean_wellness: f64,
    pub crisis_total: usize,
    pub surveys_per_user: f64,
    pub kinds: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DescriptiveStatistics {
    pub users: UserStatistics,
    pub surveys: SurveyStatistics,
    pub participation_rate: f64,
    pub crisis_rate: f64,
    pub period: Option<DataPeriod>,
}

/// Pairwise Pearson correlations. Cells are `None` where the correlation is
/// undefined (too few paired answers or no variance).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub variables: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.variables.iter().position(|v| v == a)?;
        let j = self.variables.iter().position(|v| v == b)?;
        self.values[i][j]
    }

    /// Off-diagonal pairs ordered by absolute correlation, strongest first.
    pub fn strongest_pairs(&self, limit: usize) -> Vec<(String, String, f64)> {
        let mut pairs = Vec::new();
        for (i, row) in self.values.iter().enumerate() {
            for (j, cell) in row.iter().enumerate().skip(i + 1) {
                if let Some(value) = cell {
                    pairs.push((self.variables[i].clone(), self.variables[j].clone(), *value));
                }
            }
        }
        pairs.sort_by(|a, b| b.2.abs().total_cmp(&a.2.abs()));
        pairs.truncate(limit);
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortCharacteristics {
    pub mean_age: f64,
    pub mean_mood: f64,
    pub mean_crisis_rate: f64,
    pub contexts: BTreeMap<String, usize>,
    pub genders: BTreeMap<String, usize>,
    pub trends: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HighRiskCohort {
    /// Users with at least one survey; the cohort is drawn from these.
    pub profiled_users: usize,
    pub size: usize,
    pub percentage: f64,
    pub members: Vec<Uuid>,
    pub characteristics: Option<CohortCharacteristics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenderWellness {
    pub users: usize,
    pub surveys: usize,
    pub mean_wellness: Option<f64>,
    pub mean_mood: Option<f64>,
    pub crisis_count: usize,
    pub crisis_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextRisk {
    pub context: String,
    pub users: usize,
    pub surveys: usize,
    pub mean_age: f64,
    pub mean_wellness: Option<f64>,
    pub low_wellness_surveys: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DemographicBreakdown {
    pub age_by_gender: BTreeMap<String, AgeStatistics>,
    pub wellness_by_gender: BTreeMap<String, GenderWellness>,
    /// Lowest mean wellness first.
    pub context_risk: Vec<ContextRisk>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTrend {
    pub day: NaiveDate,
    pub surveys: usize,
    pub mood_mean: Option<f64>,
    pub mood_std: Option<f64>,
    pub mood_count: usize,
    pub wellness_mean: Option<f64>,
    pub wellness_std: Option<f64>,
    pub crisis_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationRiskReport {
    pub generated_at: DateTime<Utc>,
    pub settings: AnalysisSettings,
    pub descriptive: DescriptiveStatistics,
    pub correlations: CorrelationMatrix,
    pub high_risk: HighRiskCohort,
    pub demographics: DemographicBreakdown,
    pub daily_trends: Vec<DailyTrend>,
    /// Highest crisis rate first, then lowest wellness.
    pub users: Vec<UserRiskSummary>,
}

/// Runs every aggregation over one snapshot of users and surveys.
pub fn analyze(
    users: &[UserProfile],
    surveys: &[SurveyRecord],
    settings: &AnalysisSettings,
    now: DateTime<Utc>,
) -> PopulationRiskReport {
    let summaries = summarize_users(users, surveys, &settings.trend, now);
    debug!(
        users = users.len(),
        surveys = surveys.len(),
        "analyzing population snapshot"
    );

    PopulationRiskReport {
        generated_at: now,
        settings: settings.clone(),
        descriptive: descriptive_statistics(users, surveys),
        correlations: correlation_matrix(surveys),
        high_risk: high_risk_cohort(&summaries, &settings.thresholds),
        demographics: demographic_breakdown(users, surveys),
        daily_trends: daily_trends(surveys, now, settings.trend_window_days),
        users: summaries,
    }
}

/// One summary per user, riskiest first.
pub fn summarize_users(
    users: &[UserProfile],
    surveys: &[SurveyRecord],
    policy: &TrendPolicy,
    now: DateTime<Utc>,
) -> Vec<UserRiskSummary> {
    let mut by_user: HashMap<Uuid, Vec<&SurveyRecord>> = HashMap::new();
    for survey in surveys {
        by_user.entry(survey.user_id()).or_default().push(survey);
    }

    let mut summaries: Vec<UserRiskSummary> = users
        .iter()
        .map(|user| {
            let history = by_user.get(&user.id).into_iter().flatten().copied();
            risk::profile_user(user, history, policy, now)
        })
        .collect();

    summaries.sort_by(compare_risk);
    summaries
}

fn compare_risk(a: &UserRiskSummary, b: &UserRiskSummary) -> Ordering {
    (b.total_surveys > 0)
        .cmp(&(a.total_surveys > 0))
        .then_with(|| b.crisis_rate.total_cmp(&a.crisis_rate))
        .then_with(|| a.avg_wellness.total_cmp(&b.avg_wellness))
        .then_with(|| a.name.cmp(&b.name))
}

fn count_labels<'a>(labels: impl Iterator<Item = &'a str>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for label in labels {
        *counts.entry(label.to_string()).or_insert(0) += 1;
    }
    counts
}

fn mood_values<'a>(surveys: impl Iterator<Item = &'a SurveyRecord>) -> Vec<f64> {
    surveys
        .filter_map(|s| s.value(Dimension::Mood))
        .map(f64::from)
        .collect()
}

fn wellness_values<'a>(surveys: impl Iterator<Item = &'a SurveyRecord>) -> Vec<f64> {
    surveys.filter_map(|s| s.assessment().wellness()).collect()
}

pub fn descriptive_statistics(
    users: &[UserProfile],
    surveys: &[SurveyRecord],
) -> DescriptiveStatistics {
    let ages: Vec<f64> = users.iter().map(|u| f64::from(u.age)).collect();
    let user_stats = UserStatistics {
        total: users.len(),
        age: AgeStatistics::from_ages(&ages),
        contexts: count_labels(users.iter().map(UserProfile::context_label)),
        genders: count_labels(users.iter().map(UserProfile::gender_label)),
    };

    let mut responders: Vec<Uuid> = surveys.iter().map(SurveyRecord::user_id).collect();
    responders.sort();
    responders.dedup();

    let crisis_total = surveys.iter().filter(|s| s.crisis_alert()).count();
    let survey_stats = SurveyStatistics {
        total: surveys.len(),
        responding_users: responders.len(),
        mean_mood: stats::mean_or_zero(&mood_values(surveys.iter())),
        mean_wellness: stats::mean_or_zero(&wellness_values(surveys.iter())),
        crisis_total,
        surveys_per_user: if responders.is_empty() {
            0.0
        } else {
            surveys.len() as f64 / responders.len() as f64
        },
        kinds: count_labels(surveys.iter().map(|s| s.kind().as_str())),
    };

    let known: HashSet<Uuid> = users.iter().map(|u| u.id).collect();
    let participating = responders.iter().filter(|id| known.contains(*id)).count();

    let period = surveys
        .iter()
        .map(SurveyRecord::taken_at)
        .min()
        .zip(surveys.iter().map(SurveyRecord::taken_at).max())
        .map(|(start, end)| DataPeriod { start, end });

    DescriptiveStatistics {
        participation_rate: stats::percentage(participating, users.len()),
        crisis_rate: stats::percentage(crisis_total, surveys.len()),
        users: user_stats,
        surveys: survey_stats,
        period,
    }
}

#[derive(Debug, Clone, Copy)]
enum Variable {
    Answer(Dimension),
    Wellness,
}

impl Variable {
    const ORDER: [Variable; 8] = [
        Variable::Answer(Dimension::Mood),
        Variable::Wellness,
        Variable::Answer(Dimension::Anxiety),
        Variable::Answer(Dimension::Sleep),
        Variable::Answer(Dimension::Social),
        Variable::Answer(Dimension::Energy),
        Variable::Answer(Dimension::Stress),
        Variable::Answer(Dimension::Hopeful),
    ];

    fn name(&self) -> &'static str {
        match self {
            Variable::Answer(dimension) => dimension.as_str(),
            Variable::Wellness => "wellness_score",
        }
    }

    fn read(&self, survey: &SurveyRecord) -> Option<f64> {
        match self {
            Variable::Answer(dimension) => survey.value(*dimension).map(f64::from),
            Variable::Wellness => survey.assessment().wellness(),
        }
    }
}

/// Correlations among the seven answers and the wellness score, using every
/// survey where both values of a pair are present.
pub fn correlation_matrix(surveys: &[SurveyRecord]) -> CorrelationMatrix {
    if surveys.is_empty() {
        return CorrelationMatrix::default();
    }

    let columns: Vec<Vec<Option<f64>>> = Variable::ORDER
        .iter()
        .map(|variable| surveys.iter().map(|s| variable.read(s)).collect())
        .collect();

    let n = Variable::ORDER.len();
    let mut values = vec![vec![None; n]; n];
    for i in 0..n {
        values[i][i] = Some(1.0);
        for j in (i + 1)..n {
            let (xs, ys): (Vec<f64>, Vec<f64>) = columns[i]
                .iter()
                .zip(&columns[j])
                .filter_map(|(x, y)| x.zip(*y))
                .unzip();
            let cell = stats::pearson(&xs, &ys).map(|r| stats::round_to(r, CORRELATION_DECIMALS));
            values[i][j] = cell;
            values[j][i] = cell;
        }
    }

    CorrelationMatrix {
        variables: Variable::ORDER.iter().map(|v| v.name().to_string()).collect(),
        values,
    }
}

pub fn high_risk_cohort(
    summaries: &[UserRiskSummary],
    thresholds: &RiskThresholds,
) -> HighRiskCohort {
    let profiled: Vec<&UserRiskSummary> =
        summaries.iter().filter(|s| s.total_surveys > 0).collect();
    let cohort: Vec<&UserRiskSummary> = profiled
        .iter()
        .copied()
        .filter(|s| risk::is_high_risk(s, thresholds))
        .collect();

    let characteristics = (!cohort.is_empty()).then(|| {
        let ages: Vec<f64> = cohort.iter().map(|s| f64::from(s.age)).collect();
        let moods: Vec<f64> = cohort.iter().map(|s| s.avg_mood).collect();
        let rates: Vec<f64> = cohort.iter().map(|s| s.crisis_rate).collect();
        CohortCharacteristics {
            mean_age: stats::mean_or_zero(&ages),
            mean_mood: stats::mean_or_zero(&moods),
            mean_crisis_rate: stats::mean_or_zero(&rates),
            contexts: count_labels(cohort.iter().map(|s| s.context.as_str())),
            genders: count_labels(cohort.iter().map(|s| s.gender.as_str())),
            trends: count_labels(cohort.iter().map(|s| s.mood_trend.as_str())),
        }
    });

    HighRiskCohort {
        profiled_users: profiled.len(),
        size: cohort.len(),
        percentage: stats::percentage(cohort.len(), profiled.len()),
        members: cohort.iter().map(|s| s.user_id).collect(),
        characteristics,
    }
}

/// Owner's gender and context labels, `unknown` for surveys with no known owner.
fn owner_labels<'a>(
    owners: &HashMap<Uuid, &'a UserProfile>,
    survey: &SurveyRecord,
) -> (&'a str, &'a str) {
    match owners.get(&survey.user_id()).copied() {
        Some(user) => (user.gender_label(), user.context_label()),
        None => (UNKNOWN_LABEL, UNKNOWN_LABEL),
    }
}

pub fn demographic_breakdown(
    users: &[UserProfile],
    surveys: &[SurveyRecord],
) -> DemographicBreakdown {
    let owners: HashMap<Uuid, &UserProfile> = users.iter().map(|u| (u.id, u)).collect();

    let mut ages_by_gender: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut ages_by_context: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for user in users {
        ages_by_gender
            .entry(user.gender_label().to_string())
            .or_default()
            .push(f64::from(user.age));
        ages_by_context
            .entry(user.context_label().to_string())
            .or_default()
            .push(f64::from(user.age));
    }

    let mut surveys_by_gender: BTreeMap<String, Vec<&SurveyRecord>> = BTreeMap::new();
    let mut surveys_by_context: BTreeMap<String, Vec<&SurveyRecord>> = BTreeMap::new();
    for survey in surveys {
        let (gender, context) = owner_labels(&owners, survey);
        surveys_by_gender
            .entry(gender.to_string())
            .or_default()
            .push(survey);
        surveys_by_context
            .entry(context.to_string())
            .or_default()
            .push(survey);
    }

    let age_by_gender: BTreeMap<String, AgeStatistics> = ages_by_gender
        .iter()
        .map(|(gender, ages)| (gender.clone(), AgeStatistics::from_ages(ages)))
        .collect();

    let mut wellness_by_gender: BTreeMap<String, GenderWellness> = BTreeMap::new();
    for (gender, ages) in &ages_by_gender {
        wellness_by_gender.entry(gender.clone()).or_default().users = ages.len();
    }
    for (gender, group) in &surveys_by_gender {
        let crisis_count = group.iter().filter(|s| s.crisis_alert()).count();
        let entry = wellness_by_gender.entry(gender.clone()).or_default();
        entry.surveys = group.len();
        entry.mean_wellness = stats::mean(&wellness_values(group.iter().copied()));
        entry.mean_mood = stats::mean(&mood_values(group.iter().copied()));
        entry.crisis_count = crisis_count;
        entry.crisis_rate = stats::percentage(crisis_count, group.len());
    }

    let mut contexts: Vec<String> = ages_by_context.keys().cloned().collect();
    contexts.extend(surveys_by_context.keys().cloned());
    contexts.sort();
    contexts.dedup();

    let mut context_risk: Vec<ContextRisk> = contexts
        .into_iter()
        .map(|context| {
            let ages = ages_by_context.get(&context).map(Vec::as_slice).unwrap_or(&[]);
            let group = surveys_by_context
                .get(&context)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let wellness = wellness_values(group.iter().copied());
            ContextRisk {
                users: ages.len(),
                surveys: group.len(),
                mean_age: stats::mean_or_zero(ages),
                mean_wellness: stats::mean(&wellness),
                low_wellness_surveys: wellness.iter().filter(|w| **w < LOW_WELLNESS_SCORE).count(),
                context,
            }
        })
        .collect();

    context_risk.sort_by(|a, b| match (a.mean_wellness, b.mean_wellness) {
        (Some(x), Some(y)) => x.total_cmp(&y).then_with(|| a.context.cmp(&b.context)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.context.cmp(&b.context),
    });

    DemographicBreakdown {
        age_by_gender,
        wellness_by_gender,
        context_risk,
    }
}

/// Per-day aggregates over the last `window_days` days, oldest day first.
pub fn daily_trends(
    surveys: &[SurveyRecord],
    now: DateTime<Utc>,
    window_days: i64,
) -> Vec<DailyTrend> {
    let mut by_day: BTreeMap<NaiveDate, Vec<&SurveyRecord>> = BTreeMap::new();
    for survey in risk::within_window(surveys, now, window_days) {
        by_day
            .entry(survey.taken_at().date_naive())
            .or_default()
            .push(survey);
    }

    by_day
        .into_iter()
        .map(|(day, group)| {
            let moods = mood_values(group.iter().copied());
            let wellness = wellness_values(group.iter().copied());
            DailyTrend {
                day,
                surveys: group.len(),
                mood_mean: stats::mean(&moods),
                mood_std: stats::sample_std_dev(&moods),
                mood_count: moods.len(),
                wellness_mean: stats::mean(&wellness),
                wellness_std: stats::sample_std_dev(&wellness),
                crisis_count: group.iter().filter(|s| s.crisis_alert()).count(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SurveyKind, SurveyResponses};
    use chrono::Duration;

    fn user(name: &str, age: i32, context: &str, gender: Option<&str>) -> UserProfile {
        UserProfile::new(Uuid::new_v4(), name, age, context, gender, Utc::now()).unwrap()
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

    fn healthy() -> SurveyResponses {
        SurveyResponses::complete(5, 1, 5, 5, 5, 1, 5)
    }

    fn struggling() -> SurveyResponses {
        SurveyResponses::complete(1, 5, 1, 1, 1, 5, 1)
    }

    #[test]
    fn empty_population_yields_empty_report() {
        let report = analyze(&[], &[], &AnalysisSettings::default(), Utc::now());
        assert_eq!(report.descriptive.users.total, 0);
        assert_eq!(report.descriptive.participation_rate, 0.0);
        assert_eq!(report.descriptive.crisis_rate, 0.0);
        assert!(report.descriptive.period.is_none());
        assert!(report.correlations.is_empty());
        assert_eq!(report.high_risk.size, 0);
        assert!(report.high_risk.characteristics.is_none());
        assert!(report.demographics.context_risk.is_empty());
        assert!(report.daily_trends.is_empty());
        assert!(report.users.is_empty());
    }

    #[test]
    fn descriptive_statistics_count_participation_and_crisis() {
        let a = user("Avery", 14, "foster care", Some("female"));
        let b = user("Jules", 20, "foster care", None);
        let c = user("Kiara", 17, "juvenile justice", Some("female"));
        let surveys = vec![
            survey(&a, 3, healthy()),
            survey(&a, 2, struggling()),
            survey(&b, 1, healthy()),
            survey(&b, 1, SurveyResponses::default()),
        ];

        let stats = descriptive_statistics(&[a, b, c], &surveys);
        assert_eq!(stats.users.total, 3);
        assert_eq!(stats.users.age.median, 17.0);
        assert_eq!(stats.users.age.min, 14.0);
        assert_eq!(stats.users.age.max, 20.0);
        assert_eq!(stats.users.contexts.get("foster care"), Some(&2));
        assert_eq!(stats.users.genders.get("female"), Some(&2));
        assert_eq!(stats.users.genders.get(UNKNOWN_LABEL), Some(&1));
        assert_eq!(stats.surveys.responding_users, 2);
        assert_eq!(stats.surveys.crisis_total, 1);
        assert_eq!(stats.surveys.kinds.get("daily"), Some(&4));
        assert!((stats.surveys.mean_wellness - 11.0 / 3.0).abs() < 1e-9);
        assert!((stats.participation_rate - 200.0 / 3.0).abs() < 1e-9);
        assert!((stats.crisis_rate - 25.0).abs() < 1e-9);
        assert!(stats.period.is_some());
    }

    #[test]
    fn correlation_matrix_is_symmetric_with_unit_diagonal() {
        let u = user("Avery", 16, "foster care", None);
        let surveys = vec![
            survey(&u, 4, SurveyResponses::complete(1, 5, 2, 1, 2, 4, 1)),
            survey(&u, 3, SurveyResponses::complete(2, 4, 2, 3, 2, 5, 2)),
            survey(&u, 2, SurveyResponses::complete(4, 2, 4, 3, 4, 2, 4)),
            survey(&u, 1, SurveyResponses::complete(5, 1, 5, 5, 4, 1, 5)),
        ];
        let matrix = correlation_matrix(&surveys);
        assert_eq!(matrix.variables.len(), 8);
        for i in 0..8 {
            assert_eq!(matrix.values[i][i], Some(1.0));
            for j in 0..8 {
                assert_eq!(matrix.values[i][j], matrix.values[j][i]);
            }
        }
        assert!(matrix.get("mood", "anxiety").unwrap() < -0.9);
        assert!(matrix.get("mood", "wellness_score").unwrap() > 0.9);
        assert_eq!(matrix.get("mood", "hopeful"), Some(1.0));
    }

    #[test]
    fn correlation_cells_without_variance_are_undefined() {
        let u = user("Avery", 16, "foster care", None);
        let surveys = vec![
            survey(&u, 2, SurveyResponses::complete(3, 3, 3, 3, 3, 3, 3)),
            survey(&u, 1, SurveyResponses::complete(4, 3, 3, 3, 3, 3, 3)),
        ];
        let matrix = correlation_matrix(&surveys);
        assert_eq!(matrix.get("mood", "anxiety"), None);
        assert_eq!(matrix.get("anxiety", "anxiety"), Some(1.0));
        assert_eq!(matrix.strongest_pairs(1).len(), 1);
    }

    #[test]
    fn cohort_skips_users_without_surveys() {
        let a = user("Avery", 14, "foster care", Some("female"));
        let b = user("Jules", 20, "homeless", Some("male"));
        let c = user("Kiara", 17, "homeless", None);
        let surveys = vec![survey(&a, 1, healthy()), survey(&b, 1, struggling())];
        let strict = RiskThresholds {
            wellness: 3.0,
            ..RiskThresholds::default()
        };

        let summaries =
            summarize_users(&[a, b.clone(), c], &surveys, &TrendPolicy::default(), Utc::now());
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].user_id, b.id);
        assert_eq!(summaries[2].total_surveys, 0);

        let cohort = high_risk_cohort(&summaries, &strict);
        assert_eq!(cohort.profiled_users, 2);
        assert_eq!(cohort.size, 1);
        assert_eq!(cohort.percentage, 50.0);
        assert_eq!(cohort.members, vec![b.id]);

        let traits = cohort.characteristics.unwrap();
        assert_eq!(traits.mean_age, 20.0);
        assert_eq!(traits.mean_crisis_rate, 100.0);
        assert_eq!(traits.contexts.get("homeless"), Some(&1));
        assert_eq!(traits.trends.get("stable"), Some(&1));
    }

    #[test]
    fn default_thresholds_put_every_respondent_in_cohort() {
        let a = user("Avery", 14, "foster care", None);
        let surveys = vec![survey(&a, 1, healthy())];
        let report = analyze(&[a], &surveys, &AnalysisSettings::default(), Utc::now());
        assert_eq!(report.high_risk.size, 1);
        assert_eq!(report.high_risk.percentage, 100.0);
    }

    #[test]
    fn contexts_rank_lowest_wellness_first() {
        let a = user("Avery", 14, "foster care", Some("female"));
        let b = user("Jules", 20, "homeless", None);
        let c = user("Kiara", 18, "homeless", Some("female"));
        let d = user("Noor", 15, "refugee", Some("female"));
        let surveys = vec![
            survey(&a, 1, healthy()),
            survey(&b, 1, struggling()),
            survey(&c, 1, healthy()),
        ];

        let breakdown = demographic_breakdown(&[a, b, c, d], &surveys);
        let order: Vec<&str> = breakdown
            .context_risk
            .iter()
            .map(|c| c.context.as_str())
            .collect();
        assert_eq!(order, vec!["homeless", "foster care", "refugee"]);

        let homeless = &breakdown.context_risk[0];
        assert_eq!(homeless.users, 2);
        assert_eq!(homeless.surveys, 2);
        assert_eq!(homeless.mean_age, 19.0);
        assert_eq!(homeless.low_wellness_surveys, 1);
        assert_eq!(homeless.mean_wellness, Some(3.0));
        assert_eq!(breakdown.context_risk[2].mean_wellness, None);

        let female = &breakdown.age_by_gender["female"];
        assert_eq!(female.min, 14.0);
        assert_eq!(female.max, 18.0);
        assert_eq!(female.median, 15.0);

        let unknown = &breakdown.wellness_by_gender[UNKNOWN_LABEL];
        assert_eq!(unknown.users, 1);
        assert_eq!(unknown.crisis_count, 1);
        assert_eq!(unknown.mean_mood, Some(1.0));
    }

    #[test]
    fn orphan_surveys_fall_into_unknown_bucket() {
        let a = user("Avery", 14, "foster care", Some("female"));
        let ghost = user("Ghost", 16, "refugee", Some("male"));
        let surveys = vec![survey(&ghost, 1, healthy())];

        let breakdown = demographic_breakdown(&[a], &surveys);
        assert_eq!(breakdown.wellness_by_gender[UNKNOWN_LABEL].surveys, 1);
        assert!(breakdown
            .context_risk
            .iter()
            .any(|c| c.context == UNKNOWN_LABEL && c.surveys == 1));
    }

    #[test]
    fn daily_trends_group_by_day_within_window() {
        let a = user("Avery", 14, "foster care", None);
        let now = Utc::now();
        let day = now - Duration::days(2);
        let surveys = vec![
            SurveyRecord::new(Uuid::new_v4(), a.id, day, SurveyKind::Daily, healthy()),
            SurveyRecord::new(Uuid::new_v4(), a.id, day, SurveyKind::Quick, struggling()),
            survey(&a, 60, healthy()),
        ];

        let trends = daily_trends(&surveys, now, 30);
        assert_eq!(trends.len(), 1);
        let trend = &trends[0];
        assert_eq!(trend.day, day.date_naive());
        assert_eq!(trend.surveys, 2);
        assert_eq!(trend.mood_mean, Some(3.0));
        assert_eq!(trend.mood_count, 2);
        assert!(trend.mood_std.is_some());
        assert_eq!(trend.crisis_count, 1);
    }

    #[test]
    fn huge_trend_window_covers_all_history() {
        let a = user("Avery", 14, "foster care", None);
        let surveys = vec![survey(&a, 1, healthy()), survey(&a, 3000, struggling())];
        let settings = AnalysisSettings {
            trend_window_days: 100_000_000,
            ..AnalysisSettings::default()
        };

        let report = analyze(&[a], &surveys, &settings, Utc::now());
        assert_eq!(report.daily_trends.len(), 2);
    }
}
