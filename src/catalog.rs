use crate::models::{Difficulty, SuggestedExercise};
use std::collections::HashMap;

pub const DEFAULT_CALORIE_RATE: u32 = 7;
pub const FALLBACK_MUSCLE_GROUP: &str = "General";

// (exercise, kcal per minute, muscle groups)
const KNOWN_EXERCISES: &[(&str, u32, &[&str])] = &[
    ("Push-ups", 8, &["Chest", "Triceps", "Shoulders"]),
    ("Squats", 9, &["Legs", "Glutes"]),
    ("Planks", 5, &["Core", "Shoulders"]),
    ("Burpees", 12, &["Full Body"]),
    ("Lunges", 8, &["Legs", "Glutes"]),
    ("Mountain Climbers", 10, &["Core", "Legs"]),
    ("Jumping Jacks", 11, &["Cardio", "Legs"]),
    ("Pull-ups", 9, &["Back", "Biceps"]),
    ("Deadlifts", 7, &["Back", "Legs", "Glutes"]),
    ("Bench Press", 6, &["Chest", "Triceps", "Shoulders"]),
    ("Rows", 7, &["Back", "Biceps"]),
    ("Dips", 8, &["Triceps", "Chest"]),
];

// (exercise, sets, reps, minutes, rest seconds, difficulty)
type PlanEntry = (&'static str, u32, u32, u32, u32, Difficulty);

const BODYWEIGHT_PLAN: &[PlanEntry] = &[
    ("Push-ups", 3, 12, 10, 60, Difficulty::Moderate),
    ("Squats", 3, 15, 10, 45, Difficulty::Easy),
    ("Planks", 3, 45, 8, 30, Difficulty::Moderate),
    ("Burpees", 3, 8, 12, 90, Difficulty::Challenging),
];

const WEIGHTED_PLAN: &[PlanEntry] = &[
    ("Pull-ups", 4, 8, 15, 90, Difficulty::Advanced),
    ("Deadlifts", 4, 6, 20, 120, Difficulty::Advanced),
    ("Bench Press", 4, 8, 18, 90, Difficulty::Advanced),
    ("Squats", 4, 10, 15, 75, Difficulty::Intermediate),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    Bodyweight,
    Weighted,
}

/// Lookup tables used by calorie estimation and muscle-group reporting.
#[derive(Debug, Clone)]
pub struct ExerciseCatalog {
    calorie_rates: HashMap<String, u32>,
    muscle_groups: HashMap<String, Vec<String>>,
    default_rate: u32,
    fallback_group: String,
}

impl ExerciseCatalog {
    pub fn new(default_rate: u32) -> Self {
        let mut calorie_rates = HashMap::with_capacity(KNOWN_EXERCISES.len());
        let mut muscle_groups = HashMap::with_capacity(KNOWN_EXERCISES.len());
        for (name, rate, groups) in KNOWN_EXERCISES {
            calorie_rates.insert((*name).to_string(), *rate);
            muscle_groups.insert(
                (*name).to_string(),
                groups.iter().map(|group| (*group).to_string()).collect(),
            );
        }

        Self {
            calorie_rates,
            muscle_groups,
            default_rate,
            fallback_group: FALLBACK_MUSCLE_GROUP.to_string(),
        }
    }

    pub fn calorie_rate(&self, exercise: &str) -> u32 {
        self.calorie_rates
            .get(exercise)
            .copied()
            .unwrap_or(self.default_rate)
    }

    pub fn muscle_groups(&self, exercise: &str) -> &[String] {
        self.muscle_groups
            .get(exercise)
            .map(Vec::as_slice)
            .unwrap_or(std::slice::from_ref(&self.fallback_group))
    }

    /// Every exercise of a suggestion plan, in plan order.
    pub fn plan(&self, kind: PlanKind) -> Vec<SuggestedExercise> {
        let entries = match kind {
            PlanKind::Bodyweight => BODYWEIGHT_PLAN,
            PlanKind::Weighted => WEIGHTED_PLAN,
        };
        entries
            .iter()
            .map(
                |&(name, sets, reps, duration_minutes, rest_seconds, difficulty)| {
                    SuggestedExercise {
                        name: name.to_string(),
                        sets,
                        reps,
                        duration_minutes,
                        rest_seconds,
                        difficulty,
                        muscle_groups: self.muscle_groups(name).to_vec(),
                    }
                },
            )
            .collect()
    }
}

impl Default for ExerciseCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_CALORIE_RATE)
    }
}
