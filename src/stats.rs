use crate::catalog::{ExerciseCatalog, PlanKind};
use crate::models::{
    Achievement, BmiCategory, BodyMetrics, DailyPoint, DaySummary, Difficulty, GoalProgress,
    IntensityLevel, IntensityReport, Profile, StatsResponse, SuggestedExercise, WeeklyPoint,
    WeeklyTargets, WorkoutRecord, WorkoutSummary,
};
use crate::workouts::{filter_by_date, filter_by_range};
use chrono::{Datelike, Duration, NaiveDate};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

const WEEK_COUNT: usize = 8;
const SUGGESTION_COUNT: usize = 3;

pub fn total_count(records: &[WorkoutRecord]) -> usize {
    records.len()
}

pub fn total_duration(records: &[WorkoutRecord]) -> u64 {
    records
        .iter()
        .map(|record| u64::from(record.duration_minutes))
        .sum()
}

/// Mean minutes per record, 0 for an empty slice.
pub fn average_duration(records: &[WorkoutRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    total_duration(records) as f64 / total_count(records) as f64
}

/// Mode of the exercise names. Ties go to the name seen first in storage order.
pub fn most_frequent_exercise(records: &[WorkoutRecord]) -> Option<&str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.exercise.as_str()).or_default() += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for record in records {
        let name = record.exercise.as_str();
        let count = counts[name];
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((name, count));
        }
    }
    best.map(|(name, _)| name)
}

/// Consecutive days with at least one record, walking back from `as_of`.
/// Zero when `as_of` itself has no record.
pub fn current_streak(records: &[WorkoutRecord], as_of: NaiveDate) -> u32 {
    let days: HashSet<NaiveDate> = records.iter().map(|record| record.date).collect();

    let mut streak = 0;
    let mut day = Some(as_of);
    while let Some(current) = day.filter(|date| days.contains(date)) {
        streak += 1;
        day = current.pred_opt();
    }
    streak
}

pub fn estimate_calories(records: &[WorkoutRecord], catalog: &ExerciseCatalog) -> u64 {
    records
        .iter()
        .map(|record| {
            u64::from(catalog.calorie_rate(&record.exercise)) * u64::from(record.duration_minutes)
        })
        .sum()
}

pub fn muscle_groups_worked(
    records: &[WorkoutRecord],
    catalog: &ExerciseCatalog,
) -> BTreeSet<String> {
    records
        .iter()
        .flat_map(|record| catalog.muscle_groups(&record.exercise).iter().cloned())
        .collect()
}

/// Volume scaled by load and normalised to a 30 minute session.
pub fn intensity_score(record: &WorkoutRecord) -> f64 {
    let volume = f64::from(record.sets) * f64::from(record.reps);
    let weight_multiplier = 1.0 + record.weight / 100.0;
    let duration_factor = f64::from(record.duration_minutes) / 30.0;
    volume * weight_multiplier * duration_factor
}

pub fn intensity_report(records: &[WorkoutRecord]) -> Option<IntensityReport> {
    if records.is_empty() {
        return None;
    }

    let scores: Vec<f64> = records.iter().map(intensity_score).collect();
    let average = scores.iter().sum::<f64>() / scores.len() as f64;
    let peak = scores.iter().copied().fold(f64::MIN, f64::max);
    let level = if average < 50.0 {
        IntensityLevel::Light
    } else if average < 100.0 {
        IntensityLevel::Moderate
    } else if average < 200.0 {
        IntensityLevel::Intense
    } else {
        IntensityLevel::Extreme
    };

    Some(IntensityReport {
        average,
        peak,
        level,
    })
}

pub fn achievements(records: &[WorkoutRecord], as_of: NaiveDate) -> Vec<Achievement> {
    let mut unlocked = Vec::new();
    if total_count(records) >= 10 {
        unlocked.push(Achievement::TenWorkouts);
    }
    if total_duration(records) >= 300 {
        unlocked.push(Achievement::ThreeHundredMinutes);
    }
    if current_streak(records, as_of) >= 7 {
        unlocked.push(Achievement::PerfectWeek);
    }
    let distinct: HashSet<&str> = records.iter().map(|r| r.exercise.as_str()).collect();
    if distinct.len() >= 5 {
        unlocked.push(Achievement::Explorer);
    }
    unlocked
}

/// Aggregates over the records dated within `period_days` before `as_of`.
/// The streak always looks at the full history.
pub fn build_summary(
    records: &[WorkoutRecord],
    as_of: NaiveDate,
    period_days: u32,
    catalog: &ExerciseCatalog,
) -> WorkoutSummary {
    let period_days = period_days.max(1);
    let start = shift_days(as_of, -i64::from(period_days));
    let recent = filter_by_range(records, start, as_of);

    WorkoutSummary {
        period_days,
        total_workouts: total_count(&recent),
        total_duration: total_duration(&recent),
        avg_duration: average_duration(&recent),
        total_calories: estimate_calories(&recent, catalog),
        total_sets: recent.iter().map(|r| u64::from(r.sets)).sum(),
        total_reps: recent.iter().map(|r| u64::from(r.reps)).sum(),
        most_common_exercise: most_frequent_exercise(&recent).map(str::to_string),
        workout_frequency: total_count(&recent) as f64 / f64::from(period_days) * 7.0,
        current_streak: current_streak(records, as_of),
    }
}

/// Counts and minutes over the seven days ending at `as_of`, against the
/// weekly targets.
pub fn goal_progress(
    records: &[WorkoutRecord],
    as_of: NaiveDate,
    targets: WeeklyTargets,
) -> GoalProgress {
    let start = shift_days(as_of, -6);
    let week = filter_by_range(records, start, as_of);
    let workouts = total_count(&week);
    let minutes = total_duration(&week);

    GoalProgress {
        start_date: start.to_string(),
        end_date: as_of.to_string(),
        workouts,
        target_workouts: targets.workouts,
        workout_progress: progress(workouts as f64, targets.workouts),
        minutes,
        target_minutes: targets.minutes,
        minutes_progress: progress(minutes as f64, targets.minutes),
    }
}

fn progress(current: f64, target: u32) -> f64 {
    if target == 0 {
        return 1.0;
    }
    (current / f64::from(target)).min(1.0)
}

pub fn build_stats_at(
    today: NaiveDate,
    records: &[WorkoutRecord],
    period_days: u32,
    targets: WeeklyTargets,
    catalog: &ExerciseCatalog,
) -> StatsResponse {
    let mut per_day: BTreeMap<NaiveDate, (usize, u64)> = BTreeMap::new();
    for record in records {
        let entry = per_day.entry(record.date).or_default();
        entry.0 += 1;
        entry.1 += u64::from(record.duration_minutes);
    }
    let day_totals = |date: NaiveDate| per_day.get(&date).copied().unwrap_or_default();

    let mut last_7_days = Vec::with_capacity(7);
    for offset in (0..7).rev() {
        let date = shift_days(today, -offset);
        let (workouts, duration_minutes) = day_totals(date);
        last_7_days.push(DailyPoint {
            date: date.to_string(),
            workouts,
            duration_minutes,
        });
    }

    let current_week_start = week_start(today);
    let mut weekly_totals = Vec::with_capacity(WEEK_COUNT);
    for offset in (0..WEEK_COUNT).rev() {
        let start = shift_days(current_week_start, -7 * offset as i64);
        let end = shift_days(start, 6);

        let mut workouts = 0usize;
        let mut duration_minutes = 0u64;
        for day_offset in 0..7 {
            let (count, minutes) = day_totals(shift_days(start, day_offset));
            workouts += count;
            duration_minutes = duration_minutes.saturating_add(minutes);
        }

        weekly_totals.push(WeeklyPoint {
            week: week_label(start),
            start_date: start.to_string(),
            end_date: end.to_string(),
            workouts,
            duration_minutes,
        });
    }

    StatsResponse {
        as_of: today.to_string(),
        summary: build_summary(records, today, period_days, catalog),
        last_7_days,
        weekly_totals,
        achievements: achievements(records, today),
        goal_progress: goal_progress(records, today, targets),
    }
}

pub fn build_day_summary(
    records: &[WorkoutRecord],
    date: NaiveDate,
    catalog: &ExerciseCatalog,
) -> DaySummary {
    let daily = filter_by_date(records, date);
    DaySummary {
        date: date.to_string(),
        workouts: total_count(&daily),
        total_duration: total_duration(&daily),
        calories: estimate_calories(&daily, catalog),
        muscle_groups: muscle_groups_worked(&daily, catalog).into_iter().collect(),
        intensity: intensity_report(&daily),
        records: daily,
    }
}

/// BMI and ideal weight (BMI 22.5) from the profile's height and weight.
pub fn body_metrics(profile: &Profile) -> Option<BodyMetrics> {
    let height_m = profile.height.filter(|h| *h > 0.0)? / 100.0;
    let weight = profile.weight.filter(|w| *w > 0.0)?;

    let bmi = weight / (height_m * height_m);
    let category = if bmi < 18.5 {
        BmiCategory::Underweight
    } else if bmi < 25.0 {
        BmiCategory::Normal
    } else if bmi < 30.0 {
        BmiCategory::Overweight
    } else {
        BmiCategory::Obese
    };
    let ideal_weight = 22.5 * height_m * height_m;

    Some(BodyMetrics {
        bmi,
        category,
        ideal_weight,
        weight_difference: weight - ideal_weight,
    })
}

/// Suggestions from the plan matching the profile's fitness level. Entries at
/// the difficulty named in `preferences.difficulty_level` are offered first.
pub fn suggested_exercises(
    profile: Option<&Profile>,
    preferences: &Value,
    catalog: &ExerciseCatalog,
) -> Vec<SuggestedExercise> {
    let advanced = profile
        .and_then(|profile| profile.fitness_level.as_deref())
        .is_some_and(|level| {
            matches!(
                level.trim().to_lowercase().as_str(),
                "advanced" | "avanzado" | "expert" | "experto"
            )
        });
    let kind = if advanced {
        PlanKind::Weighted
    } else {
        PlanKind::Bodyweight
    };
    let preferred = preferences
        .get("difficulty_level")
        .and_then(Value::as_str)
        .and_then(Difficulty::parse);

    let mut plan = catalog.plan(kind);
    if let Some(preferred) = preferred {
        plan.sort_by_key(|exercise| exercise.difficulty != preferred);
    }
    plan.truncate(SUGGESTION_COUNT);
    plan
}

/// Adds `days` to `date`, saturating at the calendar bounds.
fn shift_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

fn week_start(date: NaiveDate) -> NaiveDate {
    shift_days(date, -i64::from(date.weekday().num_days_from_monday()))
}

fn week_label(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}
