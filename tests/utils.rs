use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::Layer as _;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Run git in `dir`, failing on a non-zero exit status.
pub async fn git(dir: &Path, args: &[&str]) -> anyhow::Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .output()
        .await?;
    anyhow::ensure!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );

    Ok(String::from_utf8(output.stdout)?.trim_end().to_string())
}

/// Creates a git repository on `main` in the given directory.
///
/// Sets the identity needed for commits. The directory should already exist.
pub async fn create_git_repo(dir: &Path) -> anyhow::Result<()> {
    git(dir, &["init", "--initial-branch", "main"]).await?;
    git(dir, &["config", "user.name", "Test User"]).await?;
    git(dir, &["config", "user.email", "test@example.com"]).await?;
    git(dir, &["config", "commit.gpgsign", "false"]).await?;

    Ok(())
}

/// Writes a file and commits it, returning the new commit ID.
pub async fn commit_file(
    dir: &Path,
    file: &str,
    contents: &str,
    message: &str,
) -> anyhow::Result<String> {
    tokio::fs::write(dir.join(file), contents).await?;
    git(dir, &["add", file]).await?;
    git(dir, &["commit", "-m", message]).await?;

    git(dir, &["rev-parse", "HEAD"]).await
}

pub fn setup_logging() -> anyhow::Result<()> {
    let timer = tracing_subscriber::fmt::time::ChronoLocal::new("%H:%M:%S%.3f".into());
    let format = tracing_subscriber::fmt::format().with_timer(timer);
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;
    let subscriber = tracing_subscriber::fmt::layer()
        .event_format(format)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_test_writer()
        .with_filter(filter);
    tracing_subscriber::registry().with(subscriber).init();
    Ok(())
}

pub enum TestDir {
    Temp(tempfile::TempDir),
    Kept(std::path::PathBuf),
}

impl TestDir {
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = tempfile::tempdir()?;

        if std::env::var("DEBUG_TESTS").is_ok() {
            let path = temp_dir.keep();
            eprintln!("Test directory kept at: {}", path.display());
            Ok(TestDir::Kept(path))
        } else {
            Ok(TestDir::Temp(temp_dir))
        }
    }

    pub fn path(&self) -> &std::path::Path {
        match self {
            TestDir::Temp(t) => t.path(),
            TestDir::Kept(p) => p.as_path(),
        }
    }
}
