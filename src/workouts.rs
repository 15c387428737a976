use crate::errors::StoreError;
use crate::models::{NewWorkout, Username, WorkoutChanges, WorkoutRecord};
use crate::storage::{DocumentLocks, load_document, persist_document};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Map;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use tracing::debug;
use uuid::Uuid;

const WORKOUTS_FILE: &str = "workouts.json";

/// Workout log persistence: one `workouts.json` array per user, rewritten in
/// full under that document's lock on every mutation.
#[derive(Clone)]
pub struct WorkoutStore {
    data_dir: PathBuf,
    locks: DocumentLocks,
}

impl WorkoutStore {
    pub fn new(data_dir: impl Into<PathBuf>, locks: DocumentLocks) -> Self {
        Self {
            data_dir: data_dir.into(),
            locks,
        }
    }

    pub fn document_path(&self, user: &Username) -> PathBuf {
        self.data_dir.join(user.as_str()).join(WORKOUTS_FILE)
    }

    /// All records in storage order. A user with no document has no records.
    pub async fn list(&self, user: &Username) -> Result<Vec<WorkoutRecord>, StoreError> {
        load_records(&self.document_path(user)).await
    }

    pub async fn get(&self, user: &Username, id: Uuid) -> Result<WorkoutRecord, StoreError> {
        self.list(user)
            .await?
            .into_iter()
            .find(|record| record.id == id)
            .ok_or_else(|| no_such_workout(user, id))
    }

    pub async fn append(
        &self,
        user: &Username,
        new: NewWorkout,
    ) -> Result<WorkoutRecord, StoreError> {
        let record = build_record(new, Local::now().naive_local())?;
        let path = self.document_path(user);

        let _guard = self.locks.acquire(&path).await;
        let mut records = load_records(&path).await?;
        records.push(record.clone());
        persist_document(&path, &records).await?;

        debug!(user = %user, id = %record.id, exercise = %record.exercise, "workout appended");
        Ok(record)
    }

    pub async fn update(
        &self,
        user: &Username,
        id: Uuid,
        changes: WorkoutChanges,
    ) -> Result<WorkoutRecord, StoreError> {
        validate_changes(&changes)?;
        let path = self.document_path(user);

        let _guard = self.locks.acquire(&path).await;
        let mut records = load_records(&path).await?;
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| no_such_workout(user, id))?;
        apply_changes(record, changes, Local::now().naive_local());
        let updated = record.clone();
        persist_document(&path, &records).await?;

        debug!(user = %user, id = %id, "workout updated");
        Ok(updated)
    }

    /// Removes the single record carrying `id`.
    pub async fn remove(&self, user: &Username, id: Uuid) -> Result<WorkoutRecord, StoreError> {
        let path = self.document_path(user);

        let _guard = self.locks.acquire(&path).await;
        let mut records = load_records(&path).await?;
        let index = records
            .iter()
            .position(|record| record.id == id)
            .ok_or_else(|| no_such_workout(user, id))?;
        let removed = records.remove(index);
        persist_document(&path, &records).await?;

        debug!(user = %user, id = %id, "workout removed");
        Ok(removed)
    }
}

pub fn filter_by_date(records: &[WorkoutRecord], date: NaiveDate) -> Vec<WorkoutRecord> {
    records
        .iter()
        .filter(|record| record.date == date)
        .cloned()
        .collect()
}

/// Records dated within `[start, end]`.
pub fn filter_by_range(
    records: &[WorkoutRecord],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<WorkoutRecord> {
    records
        .iter()
        .filter(|record| record.date >= start && record.date <= end)
        .cloned()
        .collect()
}

async fn load_records(path: &Path) -> Result<Vec<WorkoutRecord>, StoreError> {
    let mut records: Vec<WorkoutRecord> = load_document(path).await?;
    backfill_ids(&mut records);
    Ok(records)
}

/// Gives records written without an id a deterministic one, so the same
/// document yields the same ids on every load until it is rewritten.
fn backfill_ids(records: &mut [WorkoutRecord]) {
    let mut seen: HashMap<String, u32> = HashMap::new();
    for record in records.iter_mut().filter(|record| record.id.is_nil()) {
        let created_at = record
            .created_at
            .map(|at| at.to_string())
            .unwrap_or_default();
        let key = format!("{}|{}|{created_at}", record.date, record.exercise);
        let ordinal = seen.entry(key.clone()).or_default();
        record.id = Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{key}|{ordinal}").as_bytes());
        *ordinal += 1;
    }
}

fn build_record(new: NewWorkout, now: NaiveDateTime) -> Result<WorkoutRecord, StoreError> {
    let date = required_text("date", new.date.as_deref())?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
        StoreError::validation(format!("malformed date '{date}', expected YYYY-MM-DD"))
    })?;
    let exercise = required_text("exercise", new.exercise.as_deref())?.to_string();
    let sets = positive("sets", new.sets)?;
    let reps = positive("reps", new.reps)?;
    let duration_minutes = positive("duration_minutes", new.duration_minutes)?;
    let weight = checked_weight(new.weight.unwrap_or(0.0))?;

    let start_time = non_blank(new.start_time);
    if let Some(time) = start_time.as_deref() {
        NaiveTime::parse_from_str(time, "%H:%M").map_err(|_| {
            StoreError::validation(format!("malformed start_time '{time}', expected HH:MM"))
        })?;
    }

    Ok(WorkoutRecord {
        id: Uuid::new_v4(),
        date,
        exercise,
        sets,
        reps,
        weight,
        duration_minutes,
        start_time,
        notes: non_blank(new.notes),
        created_at: Some(new.created_at.unwrap_or(now)),
        updated_at: None,
        extra: Map::new(),
    })
}

fn validate_changes(changes: &WorkoutChanges) -> Result<(), StoreError> {
    if let Some(sets) = changes.sets {
        positive("sets", Some(sets))?;
    }
    if let Some(reps) = changes.reps {
        positive("reps", Some(reps))?;
    }
    if let Some(minutes) = changes.duration_minutes {
        positive("duration_minutes", Some(minutes))?;
    }
    if let Some(weight) = changes.weight {
        checked_weight(weight)?;
    }
    Ok(())
}

fn apply_changes(record: &mut WorkoutRecord, changes: WorkoutChanges, now: NaiveDateTime) {
    if let Some(sets) = changes.sets {
        record.sets = sets;
    }
    if let Some(reps) = changes.reps {
        record.reps = reps;
    }
    if let Some(weight) = changes.weight {
        record.weight = weight;
    }
    if let Some(minutes) = changes.duration_minutes {
        record.duration_minutes = minutes;
    }
    if changes.notes.is_some() {
        record.notes = non_blank(changes.notes);
    }
    record.updated_at = Some(now);
}

fn required_text<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, StoreError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| StoreError::validation(format!("{field} is required")))
}

fn positive(field: &str, value: Option<u32>) -> Result<u32, StoreError> {
    match value {
        None => Err(StoreError::validation(format!("{field} is required"))),
        Some(0) => Err(StoreError::validation(format!("{field} must be positive"))),
        Some(value) => Ok(value),
    }
}

fn checked_weight(weight: f64) -> Result<f64, StoreError> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(weight)
    } else {
        Err(StoreError::validation("weight must be a non-negative number"))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn no_such_workout(user: &Username, id: Uuid) -> StoreError {
    StoreError::no_match(format!("no workout {id} for user '{user}'"))
}
