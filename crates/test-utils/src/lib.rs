use std::sync::Once;

use poh::exec::Transport;
use tokio::process::Command;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable through which [`LocalShellTransport`] exposes the
/// server name to the command.
pub const SERVER_ENV: &str = "POH_SERVER";

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 10-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(10), f)
        .await
        .expect("Test timed out after 10 seconds")
}

/// Runs every unit locally through `sh -c`, with the server name in
/// `$POH_SERVER`. No network involved.
#[derive(Debug, Clone)]
pub struct LocalShellTransport {
    shell: String,
}

impl LocalShellTransport {
    pub fn new() -> Self {
        Self { shell: "sh".to_string() }
    }

    /// Use a program that does not exist, to exercise spawn failures.
    pub fn broken() -> Self {
        Self { shell: "/nonexistent/poh-test-shell".to_string() }
    }
}

impl Default for LocalShellTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LocalShellTransport {
    fn command(&self, server: &str, command: &str) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(command).env(SERVER_ENV, server);
        cmd
    }
}
