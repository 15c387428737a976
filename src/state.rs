use crate::catalog::ExerciseCatalog;
use crate::config::Config;
use crate::storage::DocumentLocks;
use crate::users::UserStore;
use crate::workouts::WorkoutStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<ExerciseCatalog>,
    pub workouts: WorkoutStore,
    pub users: UserStore,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let locks = DocumentLocks::default();
        Self {
            catalog: Arc::new(ExerciseCatalog::new(config.default_calorie_rate)),
            workouts: WorkoutStore::new(config.data_dir.clone(), locks.clone()),
            users: UserStore::new(config.data_dir.clone(), locks),
            config: Arc::new(config),
        }
    }
}
