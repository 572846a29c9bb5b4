//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `fridgeboard_core` linkage and print the persisted dashboard state.
//! - Keep output deterministic for quick local sanity checks; logs go to a
//!   file under the system temp dir.
//!
//! Usage: `fridgeboard_cli [db_path]` (default `fridgeboard.sqlite3`).

use fridgeboard_core::{
    default_log_level, init_logging, Dashboard, DashboardConfig, SqliteStorage,
};
use std::process::ExitCode;

const DEFAULT_DB_PATH: &str = "fridgeboard.sqlite3";
const LOG_DIR_NAME: &str = "fridgeboard-logs";

fn main() -> ExitCode {
    println!("fridgeboard_core ping={}", fridgeboard_core::ping());
    println!("fridgeboard_core version={}", fridgeboard_core::core_version());

    let log_dir = std::env::temp_dir().join(LOG_DIR_NAME);
    match log_dir.to_str().map(|dir| init_logging(default_log_level(), dir)) {
        Some(Ok(())) => println!("log_dir={}", log_dir.display()),
        Some(Err(err)) => eprintln!("logging disabled: {err}"),
        None => eprintln!("logging disabled: temp dir is not valid UTF-8"),
    }

    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
    let storage = match SqliteStorage::open(&db_path) {
        Ok(storage) => storage,
        Err(err) => {
            eprintln!("failed to open {db_path}: {err}");
            return ExitCode::FAILURE;
        }
    };
    let dashboard = match Dashboard::new(storage, DashboardConfig::default()) {
        Ok(dashboard) => dashboard,
        Err(err) => {
            eprintln!("invalid config: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = dashboard.bootstrap() {
        eprintln!("failed to load state: {err}");
        return ExitCode::FAILURE;
    }

    let state = dashboard.store().snapshot();
    let water = dashboard.health().water();
    println!("db_path={db_path}");
    println!("current_user={}", state.current_user);
    for user in dashboard.users().users() {
        let stats = dashboard.tasks().stats(Some(user));
        println!(
            "tasks user={} total={} completed={} pending={} overdue={}",
            user, stats.total, stats.completed, stats.pending, stats.overdue
        );
    }
    println!("water={}/{}", water.count, water.max);
    for (name, taken) in &state.medication {
        println!("medication name={name} taken={taken}");
    }
    ExitCode::SUCCESS
}
