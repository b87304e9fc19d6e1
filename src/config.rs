/// Runtime configuration for a tracker context

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::UserId;
use crate::session::TICK_PERIOD;

/// Prefix of the per-user storage key holding `UserGoals`
pub const USER_GOALS_KEY_PREFIX: &str = "userGoals";

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Account whose state this context works on
    pub user: UserId,
    /// Interval between session timer ticks
    pub tick_period: Duration,
}

impl TrackerConfig {
    pub fn for_user(user: UserId) -> Self {
        Self {
            user,
            ..Self::default()
        }
    }

    /// Storage key of this user's `UserGoals` document
    ///
    /// Scoped per user so two accounts on one device never read each other's state.
    pub fn storage_key(&self) -> String {
        format!("{}:{}", USER_GOALS_KEY_PREFIX, self.user)
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            user: UserId::anonymous(),
            tick_period: TICK_PERIOD,
        }
    }
}

/// Get the default database path with robust fallback strategy
pub fn default_database_path() -> Result<PathBuf, std::io::Error> {
    // Try various locations in order of preference
    let potential_paths = [
        // 1. User's data directory (platform-specific)
        dirs::data_dir().map(|mut p| {
            p.push("learning_tracker");
            p
        }),
        // 2. User's home directory
        dirs::home_dir().map(|mut p| {
            p.push(".learning_tracker");
            p
        }),
        // 3. Current working directory (last resort)
        std::env::current_dir().ok().map(|mut p| {
            p.push(".learning_tracker");
            p
        }),
    ];

    for potential_path in potential_paths.iter().flatten() {
        if std::fs::create_dir_all(potential_path).is_ok() {
            // Test if we can write to this directory
            let test_file = potential_path.join(".test_write");
            if std::fs::write(&test_file, "test").is_ok() {
                let _ = std::fs::remove_file(&test_file);
                return Ok(potential_path.join("tracker.db"));
            }
        }
    }

    // Ultimate fallback: use a temporary directory
    let mut temp_path = std::env::temp_dir();
    temp_path.push("learning_tracker");
    std::fs::create_dir_all(&temp_path)?;
    temp_path.push("tracker.db");

    tracing::warn!("Using temporary directory for database: {}", temp_path.display());
    Ok(temp_path)
}
