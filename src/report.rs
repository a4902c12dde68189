use std::fmt::Write;

use crate::population::PopulationRiskReport;
use crate::risk;

fn optional(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{v:.decimals$}"),
        None => "n/a".to_string(),
    }
}

fn distribution(counts: &std::collections::BTreeMap<String, usize>) -> String {
    let mut entries: Vec<(&String, &usize)> = counts.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    entries
        .iter()
        .map(|(label, count)| format!("{label} ({count})"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn build_report(report: &PopulationRiskReport, limit: usize) -> String {
    let stats = &report.descriptive;
    let mut output = String::new();

    let _ = writeln!(output, "# Youth Wellness Early Warning Report");
    let _ = writeln!(output, "Generated {}", report.generated_at.format("%Y-%m-%d %H:%M UTC"));
    if let Some(period) = &stats.period {
        let _ = writeln!(
            output,
            "Surveys from {} to {}",
            period.start.date_naive(),
            period.end.date_naive()
        );
    }
    for warning in report.settings.thresholds.warnings() {
        let _ = writeln!(output);
        let _ = writeln!(output, "> Note: {warning}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    if stats.users.total == 0 {
        let _ = writeln!(output, "No users registered.");
    } else {
        let _ = writeln!(
            output,
            "- {} users, ages {:.0}-{:.0} (mean {:.1}, median {:.1})",
            stats.users.total,
            stats.users.age.min,
            stats.users.age.max,
            stats.users.age.mean,
            stats.users.age.median
        );
        let _ = writeln!(
            output,
            "- {} surveys from {} users ({:.1}% participation, {:.1} per user)",
            stats.surveys.total,
            stats.surveys.responding_users,
            stats.participation_rate,
            stats.surveys.surveys_per_user
        );
        let _ = writeln!(
            output,
            "- Mean mood {:.2}, mean wellness {:.2}",
            stats.surveys.mean_mood, stats.surveys.mean_wellness
        );
        let _ = writeln!(
            output,
            "- {} crisis alerts ({:.1}% of surveys)",
            stats.surveys.crisis_total, stats.crisis_rate
        );
    }

    let cohort = &report.high_risk;
    let _ = writeln!(output);
    let _ = writeln!(output, "## High Risk Cohort");
    match &cohort.characteristics {
        None => {
            let _ = writeln!(output, "No users meet the high-risk criteria.");
        }
        Some(traits) => {
            let _ = writeln!(
                output,
                "- {} of {} surveyed users ({:.1}%)",
                cohort.size, cohort.profiled_users, cohort.percentage
            );
            let _ = writeln!(
                output,
                "- Mean age {:.1}, mean mood {:.2}, mean crisis rate {:.1}%",
                traits.mean_age, traits.mean_mood, traits.mean_crisis_rate
            );
            let _ = writeln!(output, "- Contexts: {}", distribution(&traits.contexts));
            let _ = writeln!(output, "- Mood trends: {}", distribution(&traits.trends));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Contexts By Risk");
    if report.demographics.context_risk.is_empty() {
        let _ = writeln!(output, "No context data recorded.");
    } else {
        for context in report.demographics.context_risk.iter() {
            let _ = writeln!(
                output,
                "- {}: mean wellness {} across {} surveys from {} users ({} low-wellness surveys)",
                context.context,
                optional(context.mean_wellness, 2),
                context.surveys,
                context.users,
                context.low_wellness_surveys
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Gender Breakdown");
    if report.demographics.wellness_by_gender.is_empty() {
        let _ = writeln!(output, "No gender data recorded.");
    } else {
        for (gender, wellness) in report.demographics.wellness_by_gender.iter() {
            let _ = writeln!(
                output,
                "- {}: {} users, mean wellness {}, mean mood {}, crisis rate {:.1}%",
                gender,
                wellness.users,
                optional(wellness.mean_wellness, 2),
                optional(wellness.mean_mood, 2),
                wellness.crisis_rate
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Strongest Correlations");
    let pairs = report.correlations.strongest_pairs(5);
    if pairs.is_empty() {
        let _ = writeln!(output, "Not enough survey data to correlate.");
    } else {
        for (a, b, value) in pairs {
            let _ = writeln!(output, "- {a} / {b}: {value:.3}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Users");
    let flagged: Vec<_> = report
        .users
        .iter()
        .filter(|s| s.total_surveys > 0 && risk::is_high_risk(s, &report.settings.thresholds))
        .collect();
    if flagged.is_empty() {
        let _ = writeln!(output, "No users with surveys meet the high-risk criteria.");
    } else {
        for summary in flagged.iter().take(limit) {
            let _ = writeln!(
                output,
                "- {} ({}, {}) wellness {:.2}, crisis rate {:.1}%, mood {}, last survey {} days ago",
                summary.name,
                summary.age,
                summary.context,
                summary.avg_wellness,
                summary.crisis_rate,
                summary.mood_trend,
                summary
                    .days_since_last
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "n/a".to_string())
            );
        }
    }

    output
}
