use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{SurveyKind, SurveyRecord, SurveyResponses, UserProfile};
use crate::scoring;

const SURVEY_COLUMNS: &str = "id, user_id, taken_at, survey_kind, mood, anxiety, sleep, social, \
     energy, stress, hopeful";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn insert_user(pool: &PgPool, user: &UserProfile) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO wellness.users (id, full_name, age, context, gender, registered_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO UPDATE
        SET full_name = EXCLUDED.full_name,
            age = EXCLUDED.age,
            context = EXCLUDED.context,
            gender = EXCLUDED.gender
        "#,
    )
    .bind(user.id)
    .bind(&user.name)
    .bind(user.age)
    .bind(&user.context)
    .bind(&user.gender)
    .bind(user.registered_at)
    .execute(pool)
    .await?;

    Ok(())
}

fn user_from_row(row: &PgRow) -> anyhow::Result<UserProfile> {
    Ok(UserProfile {
        id: row.try_get("id")?,
        name: row.try_get("full_name")?,
        age: row.try_get("age")?,
        context: row.try_get("context")?,
        gender: row.try_get("gender")?,
        registered_at: row.try_get("registered_at")?,
    })
}

pub async fn fetch_users(pool: &PgPool) -> anyhow::Result<Vec<UserProfile>> {
    let rows = sqlx::query(
        "SELECT id, full_name, age, context, gender, registered_at \
         FROM wellness.users ORDER BY full_name",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(user_from_row).collect()
}

pub async fn fetch_user(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Option<UserProfile>> {
    let row = sqlx::query(
        "SELECT id, full_name, age, context, gender, registered_at \
         FROM wellness.users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(user_from_row).transpose()
}

fn answer(row: &PgRow, column: &str) -> anyhow::Result<Option<u8>> {
    let value: Option<i16> = row.try_get(column)?;
    Ok(value.and_then(|v| u8::try_from(v).ok()))
}

/// Rebuilds the record from its answers; stored derived columns are not read back.
fn survey_from_row(row: &PgRow) -> anyhow::Result<SurveyRecord> {
    let kind: String = row.try_get("survey_kind")?;
    let responses = SurveyResponses {
        mood: answer(row, "mood")?,
        anxiety: answer(row, "anxiety")?,
        sleep: answer(row, "sleep")?,
        social: answer(row, "social")?,
        energy: answer(row, "energy")?,
        stress: answer(row, "stress")?,
        hopeful: answer(row, "hopeful")?,
    };

    Ok(SurveyRecord::new(
        row.try_get("id")?,
        row.try_get("user_id")?,
        row.try_get("taken_at")?,
        kind.parse()?,
        responses,
    ))
}

fn to_column(value: Option<u8>) -> Option<i16> {
    value.map(i16::from)
}

pub async fn insert_survey(pool: &PgPool, survey: &SurveyRecord) -> anyhow::Result<bool> {
    let responses = survey.responses();
    let result = sqlx::query(
        r#"
        INSERT INTO wellness.surveys
        (id, user_id, taken_at, survey_kind, mood, anxiety, sleep, social, energy, stress,
         hopeful, wellness_score, crisis_alert)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(survey.id())
    .bind(survey.user_id())
    .bind(survey.taken_at())
    .bind(survey.kind().as_str())
    .bind(to_column(responses.mood))
    .bind(to_column(responses.anxiety))
    .bind(to_column(responses.sleep))
    .bind(to_column(responses.social))
    .bind(to_column(responses.energy))
    .bind(to_column(responses.stress))
    .bind(to_column(responses.hopeful))
    .bind(survey.wellness_score())
    .bind(survey.crisis_alert())
    .execute(pool)
    .await?;

    let inserted = result.rows_affected() > 0;
    if inserted && survey.crisis_alert() {
        warn!(
            survey_id = %survey.id(),
            user_id = %survey.user_id(),
            wellness_score = survey.wellness_score(),
            triggers = ?scoring::crisis_triggers(responses),
            "crisis alert raised"
        );
    }

    Ok(inserted)
}

/// Survey SELECT with positional filters in bind order: user, then `since`.
fn survey_query(by_user: bool, since: bool, crisis_only: bool) -> String {
    let mut query = format!("SELECT {SURVEY_COLUMNS} FROM wellness.surveys WHERE TRUE");
    let mut position = 1;
    if crisis_only {
        query.push_str(" AND crisis_alert");
    }
    if by_user {
        query.push_str(&format!(" AND user_id = ${position}"));
        position += 1;
    }
    if since {
        query.push_str(&format!(" AND taken_at >= ${position}"));
    }
    query.push_str(" ORDER BY taken_at");
    query
}

async fn fetch_filtered(
    pool: &PgPool,
    user_id: Option<Uuid>,
    since: Option<DateTime<Utc>>,
    crisis_only: bool,
) -> anyhow::Result<Vec<SurveyRecord>> {
    let query = survey_query(user_id.is_some(), since.is_some(), crisis_only);
    let mut rows = sqlx::query(&query);
    if let Some(value) = user_id {
        rows = rows.bind(value);
    }
    if let Some(value) = since {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    records.iter().map(survey_from_row).collect()
}

/// All surveys, optionally for one user and/or taken on or after `since`.
pub async fn fetch_surveys(
    pool: &PgPool,
    user_id: Option<Uuid>,
    since: Option<DateTime<Utc>>,
) -> anyhow::Result<Vec<SurveyRecord>> {
    fetch_filtered(pool, user_id, since, false).await
}

/// Surveys stored with a crisis alert, filtered like [`fetch_surveys`].
///
/// Records are rescored on load, so callers should still check `crisis_alert()`.
pub async fn fetch_crisis_surveys(
    pool: &PgPool,
    user_id: Option<Uuid>,
    since: Option<DateTime<Utc>>,
) -> anyhow::Result<Vec<SurveyRecord>> {
    fetch_filtered(pool, user_id, since, true).await
}

/// Replaces a survey's answers and stores them with a fresh score and flag.
pub async fn update_survey_responses(
    pool: &PgPool,
    survey_id: Uuid,
    responses: SurveyResponses,
) -> anyhow::Result<SurveyRecord> {
    let row = sqlx::query(&format!(
        "SELECT {SURVEY_COLUMNS} FROM wellness.surveys WHERE id = $1"
    ))
    .bind(survey_id)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("survey {survey_id} not found"))?;

    let mut survey = survey_from_row(&row)?;
    survey.set_responses(responses);

    sqlx::query(
        r#"
        UPDATE wellness.surveys
        SET mood = $2, anxiety = $3, sleep = $4, social = $5, energy = $6, stress = $7,
            hopeful = $8, wellness_score = $9, crisis_alert = $10
        WHERE id = $1
        "#,
    )
    .bind(survey.id())
    .bind(to_column(responses.mood))
    .bind(to_column(responses.anxiety))
    .bind(to_column(responses.sleep))
    .bind(to_column(responses.social))
    .bind(to_column(responses.energy))
    .bind(to_column(responses.stress))
    .bind(to_column(responses.hopeful))
    .bind(survey.wellness_score())
    .bind(survey.crisis_alert())
    .execute(pool)
    .await?;

    info!(survey_id = %survey.id(), wellness_score = survey.wellness_score(), "survey rescored");
    Ok(survey)
}

pub async fn import_users_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        user_id: Option<Uuid>,
        name: String,
        age: i32,
        context: String,
        gender: Option<String>,
        registration_date: Option<DateTime<Utc>>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut imported = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let user = UserProfile::new(
            row.user_id.unwrap_or_else(Uuid::new_v4),
            &row.name,
            row.age,
            &row.context,
            row.gender.as_deref(),
            row.registration_date.unwrap_or_else(Utc::now),
        )
        .with_context(|| format!("invalid user on row {}", line + 1))?;

        insert_user(pool, &user).await?;
        imported += 1;
    }

    Ok(imported)
}

pub async fn import_surveys_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        survey_id: Option<Uuid>,
        user_id: Uuid,
        date: DateTime<Utc>,
        mood: Option<u8>,
        anxiety: Option<u8>,
        sleep: Option<u8>,
        social: Option<u8>,
        energy: Option<u8>,
        stress: Option<u8>,
        hopeful: Option<u8>,
        survey_type: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let responses = SurveyResponses {
            mood: row.mood,
            anxiety: row.anxiety,
            sleep: row.sleep,
            social: row.social,
            energy: row.energy,
            stress: row.stress,
            hopeful: row.hopeful,
        };
        responses
            .validate()
            .with_context(|| format!("invalid answers on row {}", line + 1))?;
        let kind = match row.survey_type.as_deref() {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => SurveyKind::default(),
        };

        let survey = SurveyRecord::new(
            row.survey_id.unwrap_or_else(Uuid::new_v4),
            row.user_id,
            row.date,
            kind,
            responses,
        );
        if insert_survey(pool, &survey).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}
