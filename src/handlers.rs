use crate::errors::{AppError, StoreError};
use crate::models::{
    AddSuggestionRequest, AuxDocument, DaySummary, LoginRequest, LoginResponse, NewWorkout,
    Profile, ProfileResponse, RegisterRequest, StatsQuery, StatsResponse, SuggestedExercise,
    Username, WeeklyTargets, WorkoutChanges, WorkoutQuery, WorkoutRecord,
};
use crate::state::AppState;
use crate::stats::{
    body_metrics, build_day_summary, build_stats_at, build_summary, suggested_exercises,
};
use crate::ui::render_dashboard;
use crate::workouts::{filter_by_date, filter_by_range};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
};
use chrono::{Local, NaiveDate};
use serde_json::{Value, json};
use tracing::{error, info, warn};
use uuid::Uuid;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ProfileResponse>), AppError> {
    let user = Username::parse(&payload.username)?;
    state
        .users
        .register(&user, &payload.password, payload.profile)
        .await?;
    let profile = state.users.profile(&user).await?;

    Ok((StatusCode::CREATED, Json(profile_response(user, profile))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = Username::parse(&payload.username)
        .map_err(|_| AppError::unauthorized("invalid username or password"))?;
    if !state.users.authenticate(&user, &payload.password).await? {
        warn!(user = %user, "rejected login");
        return Err(AppError::unauthorized("invalid username or password"));
    }

    info!(user = %user, "login");
    Ok(Json(LoginResponse {
        username: user.to_string(),
        authenticated: true,
    }))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = Username::parse(&username)?;
    let profile = state.users.profile(&user).await?;
    Ok(Json(profile_response(user, profile)))
}

pub async fn put_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(profile): Json<Profile>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = Username::parse(&username)?;
    let profile = state.users.update_profile(&user, profile).await?;
    Ok(Json(profile_response(user, profile)))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path((username, kind)): Path<(String, AuxDocument)>,
) -> Result<Json<Value>, AppError> {
    let user = Username::parse(&username)?;
    Ok(Json(state.users.load_auxiliary(&user, kind).await?))
}

pub async fn put_document(
    State(state): State<AppState>,
    Path((username, kind)): Path<(String, AuxDocument)>,
    Json(document): Json<Value>,
) -> Result<StatusCode, AppError> {
    let user = Username::parse(&username)?;
    state.users.save_auxiliary(&user, kind, &document).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_workouts(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<WorkoutQuery>,
) -> Result<Json<Vec<WorkoutRecord>>, AppError> {
    let user = Username::parse(&username)?;
    let mut records = state.workouts.list(&user).await?;

    if let Some(date) = query.date {
        records = filter_by_date(&records, date);
    }
    if query.start.is_some() || query.end.is_some() {
        let start = query.start.unwrap_or(NaiveDate::MIN);
        let end = query.end.unwrap_or(NaiveDate::MAX);
        records = filter_by_range(&records, start, end);
    }

    Ok(Json(records))
}

pub async fn create_workout(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(payload): Json<NewWorkout>,
) -> Result<(StatusCode, Json<WorkoutRecord>), AppError> {
    let user = Username::parse(&username)?;
    let record = state.workouts.append(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_workout(
    State(state): State<AppState>,
    Path((username, id)): Path<(String, Uuid)>,
) -> Result<Json<WorkoutRecord>, AppError> {
    let user = Username::parse(&username)?;
    Ok(Json(state.workouts.get(&user, id).await?))
}

pub async fn update_workout(
    State(state): State<AppState>,
    Path((username, id)): Path<(String, Uuid)>,
    Json(changes): Json<WorkoutChanges>,
) -> Result<Json<WorkoutRecord>, AppError> {
    let user = Username::parse(&username)?;
    Ok(Json(state.workouts.update(&user, id, changes).await?))
}

pub async fn delete_workout(
    State(state): State<AppState>,
    Path((username, id)): Path<(String, Uuid)>,
) -> Result<Json<WorkoutRecord>, AppError> {
    let user = Username::parse(&username)?;
    Ok(Json(state.workouts.remove(&user, id).await?))
}

pub async fn get_stats(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>, AppError> {
    let user = Username::parse(&username)?;
    let records = state.workouts.list(&user).await?;
    let as_of = query.as_of.unwrap_or_else(today);
    let period_days = query
        .period_days
        .unwrap_or(state.config.stats_period_days);
    let goals = state.users.load_auxiliary(&user, AuxDocument::Goals).await?;

    Ok(Json(build_stats_at(
        as_of,
        &records,
        period_days,
        WeeklyTargets::from_goals(&goals),
        &state.catalog,
    )))
}

pub async fn get_suggestions(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<SuggestedExercise>>, AppError> {
    let user = Username::parse(&username)?;
    Ok(Json(load_suggestions(&state, &user).await?))
}

/// Logs one of the currently offered suggestions, dated today unless the
/// request names a date.
pub async fn add_suggestion(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(payload): Json<AddSuggestionRequest>,
) -> Result<(StatusCode, Json<WorkoutRecord>), AppError> {
    let user = Username::parse(&username)?;
    let suggestion = load_suggestions(&state, &user)
        .await?
        .into_iter()
        .find(|exercise| exercise.name.eq_ignore_ascii_case(payload.exercise.trim()))
        .ok_or_else(|| {
            StoreError::no_match(format!("'{}' is not a current suggestion", payload.exercise))
        })?;

    let now = Local::now();
    let new = NewWorkout {
        date: Some(payload.date.unwrap_or_else(today).to_string()),
        exercise: Some(suggestion.name),
        sets: Some(suggestion.sets),
        reps: Some(suggestion.reps),
        weight: Some(0.0),
        duration_minutes: Some(suggestion.duration_minutes),
        start_time: Some(now.format("%H:%M").to_string()),
        notes: Some("Suggested exercise".to_string()),
        created_at: None,
    };
    let record = state.workouts.append(&user, new).await?;
    info!(user = %user, exercise = %record.exercise, "suggestion logged");
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_day(
    State(state): State<AppState>,
    Path((username, date)): Path<(String, NaiveDate)>,
) -> Result<Json<DaySummary>, AppError> {
    let user = Username::parse(&username)?;
    let records = state.workouts.list(&user).await?;
    Ok(Json(build_day_summary(&records, date, &state.catalog)))
}

/// HTML dashboard. Unreadable data degrades to an empty page instead of an
/// error response.
pub async fn dashboard(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Html<String>, AppError> {
    let user = Username::parse(&username)?;

    let records = match state.workouts.list(&user).await {
        Ok(records) => records,
        Err(err) => {
            error!("failed to load workouts for {user}: {err}");
            Vec::new()
        }
    };
    let profile = match state.users.profile(&user).await {
        Ok(profile) => Some(profile),
        Err(StoreError::NoMatch(_)) => None,
        Err(err) => {
            error!("failed to load profile for {user}: {err}");
            None
        }
    };

    let summary = build_summary(
        &records,
        today(),
        state.config.stats_period_days,
        &state.catalog,
    );
    Ok(Html(render_dashboard(
        &user,
        profile.as_ref(),
        &summary,
        &records,
    )))
}

async fn load_suggestions(
    state: &AppState,
    user: &Username,
) -> Result<Vec<SuggestedExercise>, StoreError> {
    let profile = match state.users.profile(user).await {
        Ok(profile) => Some(profile),
        Err(StoreError::NoMatch(_)) => None,
        Err(err) => return Err(err),
    };
    let preferences = state
        .users
        .load_auxiliary(user, AuxDocument::Preferences)
        .await?;
    Ok(suggested_exercises(
        profile.as_ref(),
        &preferences,
        &state.catalog,
    ))
}

fn profile_response(user: Username, profile: Profile) -> ProfileResponse {
    ProfileResponse {
        body_metrics: body_metrics(&profile),
        username: user.to_string(),
        profile,
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
