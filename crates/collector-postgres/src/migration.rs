use anyhow::{bail, Result};
use std::process::Command;
use tracing::debug;

/// Runs goose SQL migrations by spawning the goose binary.
///
/// The `events` schema lives in `migrations/` as plain goose-annotated SQL;
/// this wrapper only shells out, it does not parse migration files itself.
pub struct MigrationRunner {
    goose_binary_path: String,
    migrations_dir: String,
    dsn: String,
}

impl MigrationRunner {
    pub fn new(goose_binary_path: String, migrations_dir: String, dsn: String) -> Self {
        Self {
            goose_binary_path,
            migrations_dir,
            dsn,
        }
    }

    /// Apply all pending migrations (`goose ... postgres <dsn> up`).
    pub async fn run_migrations(&self) -> Result<()> {
        debug!(migrations_dir = %self.migrations_dir, "running migrations");

        let output = Command::new(&self.goose_binary_path)
            .arg("-dir")
            .arg(&self.migrations_dir)
            .arg("postgres")
            .arg(&self.dsn)
            .arg("up")
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            bail!("migration failed.\nstdout: {}\nstderr: {}", stdout, stderr);
        }

        debug!(
            output = %String::from_utf8_lossy(&output.stdout),
            "migrations completed"
        );
        Ok(())
    }

}
