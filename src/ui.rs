use crate::models::{Profile, Username, WorkoutRecord, WorkoutSummary};

const RECENT_LIMIT: usize = 10;

pub fn render_dashboard(
    user: &Username,
    profile: Option<&Profile>,
    summary: &WorkoutSummary,
    records: &[WorkoutRecord],
) -> String {
    let display_name = profile
        .map(|profile| profile.name.as_str())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(user.as_str());

    DASHBOARD_HTML
        .replace("{{NAME}}", &escape_html(display_name))
        .replace("{{PERIOD}}", &summary.period_days.to_string())
        .replace("{{WORKOUTS}}", &summary.total_workouts.to_string())
        .replace("{{MINUTES}}", &summary.total_duration.to_string())
        .replace("{{AVERAGE}}", &format!("{:.1}", summary.avg_duration))
        .replace("{{STREAK}}", &summary.current_streak.to_string())
        .replace("{{CALORIES}}", &summary.total_calories.to_string())
        .replace(
            "{{FAVORITE}}",
            &escape_html(summary.most_common_exercise.as_deref().unwrap_or("N/A")),
        )
        .replace("{{ROWS}}", &recent_rows(records))
}

/// Newest first, capped at `RECENT_LIMIT`.
fn recent_rows(records: &[WorkoutRecord]) -> String {
    if records.is_empty() {
        return r#"<tr><td colspan="5" class="empty">No workouts logged yet</td></tr>"#.to_string();
    }

    let mut recent: Vec<&WorkoutRecord> = records.iter().collect();
    recent.sort_by(|a, b| (b.date, b.created_at).cmp(&(a.date, a.created_at)));

    recent
        .into_iter()
        .take(RECENT_LIMIT)
        .map(|record| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{} x {}</td><td>{}</td><td>{} min</td></tr>",
                record.date,
                escape_html(&record.exercise),
                record.sets,
                record.reps,
                if record.weight > 0.0 {
                    format!("{} kg", record.weight)
                } else {
                    "bodyweight".to_string()
                },
                record.duration_minutes,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Workout Dashboard</title>
  <style>
    :root {
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: #ffffff;
    }

    body {
      margin: 0;
      padding: 32px 18px;
      background: #f8f3e6;
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
    }

    .app {
      max-width: 860px;
      margin: 0 auto;
      display: grid;
      gap: 24px;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(150px, 1fr));
      gap: 16px;
    }

    .stat {
      background: var(--card);
      border-radius: 18px;
      padding: 18px;
    }

    .stat .label {
      display: block;
      font-size: 0.8rem;
      text-transform: uppercase;
      color: #8b857d;
    }

    .stat .value {
      font-size: 1.6rem;
      font-weight: 600;
      color: var(--accent-2);
    }

    .stat .value.streak {
      color: var(--accent);
    }

    table {
      width: 100%;
      border-collapse: collapse;
      background: var(--card);
      border-radius: 18px;
    }

    th, td {
      padding: 10px 14px;
      text-align: left;
    }

    td.empty {
      text-align: center;
      color: #8b857d;
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Hi, {{NAME}}</h1>
      <p>Last {{PERIOD}} days</p>
    </header>

    <section class="panel">
      <div class="stat"><span class="label">Workouts</span><span class="value">{{WORKOUTS}}</span></div>
      <div class="stat"><span class="label">Total minutes</span><span class="value">{{MINUTES}}</span></div>
      <div class="stat"><span class="label">Avg per session</span><span class="value">{{AVERAGE}}</span></div>
      <div class="stat"><span class="label">Current streak</span><span class="value streak">{{STREAK}}</span></div>
      <div class="stat"><span class="label">Calories (est.)</span><span class="value">{{CALORIES}}</span></div>
      <div class="stat"><span class="label">Favorite</span><span class="value">{{FAVORITE}}</span></div>
    </section>

    <section>
      <h2>Recent workouts</h2>
      <table>
        <thead>
          <tr><th>Date</th><th>Exercise</th><th>Sets x reps</th><th>Load</th><th>Duration</th></tr>
        </thead>
        <tbody>
{{ROWS}}
        </tbody>
      </table>
    </section>
  </main>
</body>
</html>
"#;
