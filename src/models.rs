use crate::errors::StoreError;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

const USERNAME_MAX_LEN: usize = 64;

/// A validated username. Usernames double as directory names under the data
/// root, so only ASCII alphanumerics, `_` and `-` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(StoreError::validation("username must not be empty"));
        }
        if raw.len() > USERNAME_MAX_LEN {
            return Err(StoreError::validation(format!(
                "username must be at most {USERNAME_MAX_LEN} characters"
            )));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(StoreError::validation(
                "username may only contain letters, digits, '_' and '-'",
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Username {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One logged exercise instance, as stored in `workouts.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    /// Nil when read from a document written before records carried ids;
    /// the record store backfills it on load.
    #[serde(default)]
    pub id: Uuid,
    pub date: NaiveDate,
    pub exercise: String,
    pub sets: u32,
    pub reps: u32,
    #[serde(default)]
    pub weight: f64,
    pub duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Absent on records seeded for demo accounts.
    #[serde(
        default,
        deserialize_with = "timestamp::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<NaiveDateTime>,
    #[serde(
        default,
        deserialize_with = "timestamp::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<NaiveDateTime>,
    /// Fields this service does not interpret (intensity, heart rate, ...),
    /// carried through rewrites untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload for appending a record. Required fields are optional here so that
/// a missing one is reported as a validation failure rather than a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewWorkout {
    pub date: Option<String>,
    pub exercise: Option<String>,
    pub sets: Option<u32>,
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub duration_minutes: Option<u32>,
    pub start_time: Option<String>,
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkoutChanges {
    pub sets: Option<u32>,
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub duration_minutes: Option<u32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    /// Centimetres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Kilograms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitness_level: Option<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub favorite_exercises: Vec<String>,
}

impl Profile {
    pub fn for_new_user(username: &Username) -> Self {
        Self {
            name: username.to_string(),
            email: String::new(),
            age: Some(25),
            height: Some(170.0),
            weight: Some(70.0),
            fitness_level: Some("Intermediate".to_string()),
            goals: Vec::new(),
            favorite_exercises: Vec::new(),
        }
    }
}

/// One entry of `users.json`. Entries created by the profile editor alone
/// carry no password and never authenticate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "password", default)]
    pub password_hash: String,
    #[serde(
        default,
        deserialize_with = "timestamp::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub profile: Profile,
    #[serde(
        default,
        deserialize_with = "timestamp::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<NaiveDateTime>,
}

/// Timestamps arrive both ISO-formatted (`2024-06-01T10:20:30`) and in the
/// space-separated form older writers produced (`2024-06-01 10:20:30.123456`).
/// They are always written back ISO-formatted.
mod timestamp {
    use chrono::NaiveDateTime;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    const FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    }

    pub fn optional<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp '{raw}'"))),
        }
    }
}

/// Contents of `users.json`, keyed by username.
pub type UserDirectory = BTreeMap<String, UserRecord>;

/// Per-user documents owned by the preferences/profile side of the app and
/// stored as opaque JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuxDocument {
    Preferences,
    Records,
    Goals,
    Stats,
}

impl AuxDocument {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Preferences => "preferences.json",
            Self::Records => "records.json",
            Self::Goals => "goals.json",
            Self::Stats => "stats.json",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub username: String,
    pub authenticated: bool,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub username: String,
    pub profile: Profile,
    pub body_metrics: Option<BodyMetrics>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WorkoutQuery {
    pub date: Option<NaiveDate>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub as_of: Option<NaiveDate>,
    pub period_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkoutSummary {
    pub period_days: u32,
    pub total_workouts: usize,
    pub total_duration: u64,
    pub avg_duration: f64,
    pub total_calories: u64,
    pub total_sets: u64,
    pub total_reps: u64,
    pub most_common_exercise: Option<String>,
    /// Workouts per week over the period.
    pub workout_frequency: f64,
    pub current_streak: u32,
}

#[derive(Debug, Serialize)]
pub struct DailyPoint {
    pub date: String,
    pub workouts: usize,
    pub duration_minutes: u64,
}

#[derive(Debug, Serialize)]
pub struct WeeklyPoint {
    pub week: String,
    pub start_date: String,
    pub end_date: String,
    pub workouts: usize,
    pub duration_minutes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    TenWorkouts,
    ThreeHundredMinutes,
    PerfectWeek,
    Explorer,
}

impl Achievement {
    pub fn label(self) -> &'static str {
        match self {
            Self::TenWorkouts => "First milestone: 10+ workouts",
            Self::ThreeHundredMinutes => "Time warrior: 300+ minutes",
            Self::PerfectWeek => "Perfect week: 7 consecutive days",
            Self::Explorer => "Explorer: 5+ exercise types",
        }
    }
}

/// Weekly targets read from the goals document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyTargets {
    pub workouts: u32,
    pub minutes: u32,
}

impl WeeklyTargets {
    pub const DEFAULT_WORKOUTS: u32 = 3;
    pub const DEFAULT_MINUTES: u32 = 150;

    /// Reads `weekly_workouts` and `weekly_minutes`; anything missing or not a
    /// non-negative integer falls back to the default target.
    pub fn from_goals(goals: &Value) -> Self {
        let target = |key: &str, default: u32| {
            goals
                .get(key)
                .and_then(Value::as_u64)
                .and_then(|value| u32::try_from(value).ok())
                .unwrap_or(default)
        };
        Self {
            workouts: target("weekly_workouts", Self::DEFAULT_WORKOUTS),
            minutes: target("weekly_minutes", Self::DEFAULT_MINUTES),
        }
    }
}

impl Default for WeeklyTargets {
    fn default() -> Self {
        Self {
            workouts: Self::DEFAULT_WORKOUTS,
            minutes: Self::DEFAULT_MINUTES,
        }
    }
}

/// Progress over the seven days ending at the reference day. Progress values
/// are fractions capped at 1.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    pub start_date: String,
    pub end_date: String,
    pub workouts: usize,
    pub target_workouts: u32,
    pub workout_progress: f64,
    pub minutes: u64,
    pub target_minutes: u32,
    pub minutes_progress: f64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub as_of: String,
    pub summary: WorkoutSummary,
    pub last_7_days: Vec<DailyPoint>,
    pub weekly_totals: Vec<WeeklyPoint>,
    pub achievements: Vec<Achievement>,
    pub goal_progress: GoalProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Moderate,
    Intermediate,
    Challenging,
    Advanced,
}

impl Difficulty {
    /// Accepts the English labels and the Spanish ones the preferences page
    /// stores (`Fácil`, `Moderado`, `Intermedio`, `Desafiante`, `Extremo`).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "easy" | "fácil" | "facil" => Some(Self::Easy),
            "moderate" | "moderado" => Some(Self::Moderate),
            "intermediate" | "intermedio" => Some(Self::Intermediate),
            "challenging" | "desafiante" => Some(Self::Challenging),
            "advanced" | "extreme" | "avanzado" | "extremo" => Some(Self::Advanced),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestedExercise {
    pub name: String,
    pub sets: u32,
    pub reps: u32,
    pub duration_minutes: u32,
    pub rest_seconds: u32,
    pub difficulty: Difficulty,
    pub muscle_groups: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddSuggestionRequest {
    pub exercise: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityLevel {
    Light,
    Moderate,
    Intense,
    Extreme,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntensityReport {
    pub average: f64,
    pub peak: f64,
    pub level: IntensityLevel,
}

#[derive(Debug, Serialize)]
pub struct DaySummary {
    pub date: String,
    pub workouts: usize,
    pub total_duration: u64,
    pub calories: u64,
    pub muscle_groups: Vec<String>,
    pub intensity: Option<IntensityReport>,
    pub records: Vec<WorkoutRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BodyMetrics {
    pub bmi: f64,
    pub category: BmiCategory,
    pub ideal_weight: f64,
    pub weight_difference: f64,
}
