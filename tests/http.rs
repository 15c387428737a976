use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct Workout {
    id: String,
    date: String,
    exercise: String,
    sets: u32,
    reps: u32,
    duration_minutes: u32,
    created_at: Option<String>,
    updated_at: Option<String>,
}

struct TestServer {
    base_url: String,
    data_dir: PathBuf,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::Once;
    use std::sync::atomic::{AtomicI32, Ordering};

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_suffix() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}_{}", std::process::id(), nanos)
}

fn unique_data_dir() -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("fitness_log_http_{}", unique_suffix()));
    path
}

fn unique_user(prefix: &str) -> String {
    format!("{prefix}_{}", unique_suffix())
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/health")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let data_dir = unique_data_dir();
    let child = Command::new(env!("CARGO_BIN_EXE_fitness_log"))
        .env("PORT", port.to_string())
        .env("APP_DATA_DIR", &data_dir)
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer {
        base_url,
        data_dir,
        child,
    }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn add_workout(client: &Client, base_url: &str, user: &str, body: Value) -> Workout {
    let response = client
        .post(format!("{base_url}/api/users/{user}/workouts"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.unwrap()
}

#[tokio::test]
async fn http_register_and_login() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let user = unique_user("alice");

    let response = client
        .post(format!("{}/api/register", server.base_url))
        .json(&json!({ "username": user, "password": "pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["username"], user.as_str());
    assert_eq!(created["profile"]["name"], user.as_str());

    let duplicate = client
        .post(format!("{}/api/register", server.base_url))
        .json(&json!({ "username": user, "password": "other" }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let login = client
        .post(format!("{}/api/login", server.base_url))
        .json(&json!({ "username": user, "password": "pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);

    let wrong = client
        .post(format!("{}/api/login", server.base_url))
        .json(&json!({ "username": user, "password": "other" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn http_workout_lifecycle() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let base = server.base_url.as_str();
    let user = unique_user("rocio");

    let body = json!({
        "date": "2024-06-01",
        "exercise": "Squats",
        "sets": 3,
        "reps": 15,
        "duration_minutes": 12,
        "created_at": "2024-06-01T07:00:00"
    });
    let first = add_workout(&client, base, &user, body.clone()).await;
    let mut later = body;
    later["created_at"] = json!("2024-06-01T19:00:00");
    let second = add_workout(&client, base, &user, later).await;
    add_workout(
        &client,
        base,
        &user,
        json!({
            "date": "2024-06-02",
            "exercise": "Squats",
            "sets": 4,
            "reps": 10,
            "duration_minutes": 20
        }),
    )
    .await;
    assert_ne!(first.id, second.id);

    let day: Vec<Workout> = client
        .get(format!("{base}/api/users/{user}/workouts?date=2024-06-01"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(day.len(), 2);
    assert!(day.iter().all(|w| w.date == "2024-06-01" && w.exercise == "Squats"));

    let updated: Workout = client
        .put(format!("{base}/api/users/{user}/workouts/{}", second.id))
        .json(&json!({ "sets": 5, "reps": 20 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!((updated.sets, updated.reps), (5, 20));
    assert!(updated.updated_at.is_some());

    let untouched: Workout = client
        .get(format!("{base}/api/users/{user}/workouts/{}", first.id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!((untouched.sets, untouched.reps), (3, 15));
    assert_eq!(untouched.created_at, first.created_at);
    assert!(untouched.updated_at.is_none());

    let stats: Value = client
        .get(format!(
            "{base}/api/users/{user}/stats?as_of=2024-06-02&period_days=7"
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["summary"]["total_workouts"], 3);
    assert_eq!(stats["summary"]["total_duration"], 44);
    assert_eq!(stats["summary"]["current_streak"], 2);
    assert_eq!(stats["summary"]["most_common_exercise"], "Squats");
    assert_eq!(stats["last_7_days"].as_array().unwrap().len(), 7);
    assert_eq!(stats["goal_progress"]["workouts"], 3);
    assert_eq!(stats["goal_progress"]["target_workouts"], 3);
    assert_eq!(stats["goal_progress"]["workout_progress"], 1.0);

    let day: Value = client
        .get(format!("{base}/api/users/{user}/days/2024-06-01"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(day["workouts"], 2);
    assert_eq!(day["total_duration"], 24);
    assert_eq!(day["calories"], 216);
    assert_eq!(day["muscle_groups"], json!(["Glutes", "Legs"]));
    assert_eq!(day["records"].as_array().unwrap().len(), 2);

    let removed = client
        .delete(format!("{base}/api/users/{user}/workouts/{}", first.id))
        .send()
        .await
        .unwrap();
    assert_eq!(removed.status(), StatusCode::OK);

    let missing = client
        .delete(format!("{base}/api/users/{user}/workouts/{}", first.id))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let remaining: Vec<Workout> = client
        .get(format!(
            "{base}/api/users/{user}/workouts?start=2024-06-01&end=2024-06-01"
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, second.id);
    assert_eq!(remaining[0].duration_minutes, 12);
}

#[tokio::test]
async fn http_rejects_incomplete_workout() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let user = unique_user("bob");

    let response = client
        .post(format!("{}/api/users/{user}/workouts", server.base_url))
        .json(&json!({ "date": "2024-06-01", "exercise": "Dips", "sets": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bad_user = client
        .get(format!("{}/api/users/..%2Fetc/workouts", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_user.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_dashboard_renders_for_new_user() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let user = unique_user("carol");

    let response = client
        .get(format!("{}/users/{user}", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let html = response.text().await.unwrap();
    assert!(html.contains(&format!("Hi, {user}")));
    assert!(html.contains("No workouts logged yet"));
}

#[tokio::test]
async fn http_documents_and_weekly_goals() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let base = server.base_url.as_str();
    let user = unique_user("dana");

    let empty: Value = client
        .get(format!("{base}/api/users/{user}/documents/goals"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(empty, json!({}));

    let goals = json!({ "weekly_workouts": 2, "weekly_minutes": 40, "current_goals": ["Run 5k"] });
    let saved = client
        .put(format!("{base}/api/users/{user}/documents/goals"))
        .json(&goals)
        .send()
        .await
        .unwrap();
    assert_eq!(saved.status(), StatusCode::NO_CONTENT);

    let stored: Value = client
        .get(format!("{base}/api/users/{user}/documents/goals"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored, goals);

    add_workout(
        &client,
        base,
        &user,
        json!({
            "date": "2024-06-05",
            "exercise": "Lunges",
            "sets": 3,
            "reps": 12,
            "duration_minutes": 10
        }),
    )
    .await;

    let stats: Value = client
        .get(format!("{base}/api/users/{user}/stats?as_of=2024-06-07"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["goal_progress"]["target_workouts"], 2);
    assert_eq!(stats["goal_progress"]["target_minutes"], 40);
    assert_eq!(stats["goal_progress"]["workout_progress"], 0.5);
    assert_eq!(stats["goal_progress"]["minutes_progress"], 0.25);

    let unknown_kind = client
        .get(format!("{base}/api/users/{user}/documents/secrets"))
        .send()
        .await
        .unwrap();
    assert!(unknown_kind.status().is_client_error());
}

#[tokio::test]
async fn http_suggestions_can_be_logged() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let base = server.base_url.as_str();
    let user = unique_user("erin");

    let offered: Value = client
        .get(format!("{base}/api/users/{user}/suggestions"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let names: Vec<&str> = offered
        .as_array()
        .unwrap()
        .iter()
        .map(|exercise| exercise["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Push-ups", "Squats", "Planks"]);

    let logged = client
        .post(format!("{base}/api/users/{user}/suggestions"))
        .json(&json!({ "exercise": "planks", "date": "2024-06-03" }))
        .send()
        .await
        .unwrap();
    assert_eq!(logged.status(), StatusCode::CREATED);
    let record: Value = logged.json().await.unwrap();
    assert_eq!(record["exercise"], "Planks");
    assert_eq!(record["date"], "2024-06-03");
    assert_eq!(record["duration_minutes"], 8);
    assert_eq!(record["notes"], "Suggested exercise");

    let not_offered = client
        .post(format!("{base}/api/users/{user}/suggestions"))
        .json(&json!({ "exercise": "Deadlifts" }))
        .send()
        .await
        .unwrap();
    assert_eq!(not_offered.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_corrupt_workouts_degrade_dashboard_but_fail_api() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let user = unique_user("frank");

    let user_dir = server.data_dir.join(&user);
    std::fs::create_dir_all(&user_dir).unwrap();
    std::fs::write(user_dir.join("workouts.json"), "[{").unwrap();

    let page = client
        .get(format!("{}/users/{user}", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(page.status(), StatusCode::OK);
    assert!(page.text().await.unwrap().contains("No workouts logged yet"));

    let api = client
        .get(format!("{}/api/users/{user}/workouts", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);

    assert_eq!(
        std::fs::read_to_string(user_dir.join("workouts.json")).unwrap(),
        "[{"
    );
}
