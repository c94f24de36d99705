use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gphotos_core::config::LoggingConfig;
use gphotos_core::{
    AuthFileCredentials, CredentialProvider, PhotoLibrary, PhotosClientBuilder, StaticToken,
    UploadConfig,
};
use gphotos_sync::{
    PathScanner, ProgressChannel, ProgressEvent, RunSummary, SyncError, SyncOrchestrator,
};
use tracing::{debug, info, warn};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "gphotos-upload")]
#[command(about = "Upload a directory of photos to Google Photos, one album per folder")]
#[command(version)]
struct Cli {
    /// Root directory, or the photos to upload with --album / --no-album
    paths: Vec<PathBuf>,

    /// Upload the given photos into this album
    #[arg(long, value_name = "NAME", conflicts_with = "no_album")]
    album: Option<String>,

    /// Upload the given photos as library items outside any album
    #[arg(long)]
    no_album: bool,

    /// Authorized-user JSON file holding the access token
    #[arg(long, value_name = "FILE", env = "GPHOTOS_AUTH_FILE")]
    auth: Option<PathBuf>,

    /// Bearer access token
    #[arg(long, env = "GPHOTOS_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Log level
    #[arg(short, long)]
    log_level: Option<String>,

    /// Attempts per remote call, including the first
    #[arg(long)]
    max_retries: Option<u32>,

    /// Seconds to wait between attempts
    #[arg(long, value_name = "SECS")]
    retry_delay: Option<u64>,

    /// Items per batch-create call (at most 50)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Photos Library API base URL
    #[arg(long, value_name = "URL")]
    api_base_url: Option<String>,

    /// Upload files in the root directory as loose library items
    #[arg(long)]
    upload_root_files: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn single_album_mode(&self) -> bool {
        self.album.is_some() || self.no_album
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_status(&e))
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    let _guard = init_logging(&config.logging)?;

    let credentials = credentials(&cli)?;
    let client = PhotosClientBuilder::new(config.api.base_url.clone(), credentials)
        .timeout(config.timeout())
        .build()
        .context("Failed to build Photos API client")?;
    let library: Arc<dyn PhotoLibrary> = Arc::new(client);

    let (reporter, channel) = ProgressChannel::new();
    let orchestrator = SyncOrchestrator::from_config(library, &config).with_reporter(reporter);

    let cancel = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, no new uploads will be started");
            cancel.cancel();
        }
    });
    let progress = tokio::spawn(log_progress(channel));

    let scanner = PathScanner::default();
    let summary = if cli.single_album_mode() {
        orchestrator
            .upload_files(&scanner, cli.album.as_deref(), &cli.paths)
            .await?
    } else {
        let root = root_directory(&cli.paths)?;
        info!(root = %root.display(), "Uploading directory");
        orchestrator.upload_directory(&scanner, root).await?
    };

    // Closes the progress channel
    drop(orchestrator);
    let _ = progress.await;

    print_summary(&summary, cli.json)?;

    Ok(if summary.is_successful() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn root_directory(paths: &[PathBuf]) -> Result<&Path, SyncError> {
    match paths {
        [root] => Ok(root.as_path()),
        [] => Err(SyncError::invalid_input("", "No directory specified")),
        [_, extra, ..] => Err(SyncError::invalid_input(
            extra,
            "Only one directory can be uploaded; use --album to upload individual photos",
        )),
    }
}

/// Defaults, then the config file, then `GPHOTOS_*` variables, then flags
fn load_config(cli: &Cli) -> Result<UploadConfig> {
    let mut config = match &cli.config {
        Some(path) => UploadConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => UploadConfig::default(),
    };
    config.apply_env()?;
    apply_flags(cli, &mut config);

    config.validate()?;
    Ok(config)
}

fn apply_flags(cli: &Cli, config: &mut UploadConfig) {
    if let Some(url) = &cli.api_base_url {
        config.api.base_url = url.clone();
    }
    if let Some(max_retries) = cli.max_retries {
        config.upload.max_retries = max_retries;
    }
    if let Some(delay) = cli.retry_delay {
        config.upload.retry_delay_secs = delay;
    }
    if let Some(batch_size) = cli.batch_size {
        config.upload.batch_size = batch_size;
    }
    if cli.upload_root_files {
        config.upload.upload_root_files = true;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(file) = &cli.log {
        config.logging.file = Some(file.clone());
    }
}

fn credentials(cli: &Cli) -> Result<Arc<dyn CredentialProvider>> {
    match (&cli.token, &cli.auth) {
        (Some(token), _) => Ok(Arc::new(StaticToken::new(token.clone()))),
        (None, Some(path)) => Ok(Arc::new(AuthFileCredentials::new(path.clone()))),
        (None, None) => anyhow::bail!(
            "No credentials given: pass --auth <file>, --token or set GPHOTOS_ACCESS_TOKEN"
        ),
    }
}

fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "gphotos_upload={0},gphotos_core={0},gphotos_sync={0}",
            config.level
        ))
    });

    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let file_name = path
                .file_name()
                .unwrap_or_else(|| OsStr::new("gphotos-upload.log"));

            let (writer, guard) = tracing_appender::non_blocking(rolling::never(dir, file_name));
            let layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

async fn log_progress(mut channel: ProgressChannel) {
    while let Some(event) = channel.recv().await {
        match event {
            ProgressEvent::AlbumStateChanged { album, state } => {
                debug!(album = %album, state = %state, "Album progress");
            }
            ProgressEvent::FileStaged { album, path, size } => {
                debug!(album = %album, path = %path, size, "Staged");
            }
            other => debug!(event = ?other, "Progress"),
        }
    }
}

fn print_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", summary.to_json()?);
    } else {
        print!("{}", summary.report());
    }
    Ok(())
}

/// 2 for bad input, 1 for everything else
fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<SyncError>() {
        Some(e) if e.is_fatal() => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_mode_args() {
        let cli = Cli::try_parse_from(["gphotos-upload", "/photos", "--max-retries", "5"]).unwrap();

        assert!(!cli.single_album_mode());
        assert_eq!(root_directory(&cli.paths).unwrap(), Path::new("/photos"));
        assert_eq!(cli.max_retries, Some(5));
    }

    #[test]
    fn test_single_album_args() {
        let cli = Cli::try_parse_from(["gphotos-upload", "--album", "Trip", "a.jpg", "b.jpg"]).unwrap();

        assert!(cli.single_album_mode());
        assert_eq!(cli.album.as_deref(), Some("Trip"));
        assert_eq!(cli.paths.len(), 2);
    }

    #[test]
    fn test_album_conflicts_with_no_album() {
        assert!(Cli::try_parse_from(["gphotos-upload", "--album", "Trip", "--no-album", "a.jpg"]).is_err());
    }

    #[test]
    fn test_root_directory_requires_exactly_one_path() {
        assert!(root_directory(&[]).is_err());
        let err = root_directory(&[PathBuf::from("/a"), PathBuf::from("/b")]).unwrap_err();
        assert!(matches!(err, SyncError::InvalidInput { ref path, .. } if path == Path::new("/b")));
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "gphotos-upload",
            "/photos",
            "--batch-size",
            "20",
            "--retry-delay",
            "0",
            "--log-level",
            "debug",
            "--upload-root-files",
        ])
        .unwrap();

        let mut config = UploadConfig::default();
        apply_flags(&cli, &mut config);
        config.validate().unwrap();

        assert_eq!(config.upload.batch_size, 20);
        assert_eq!(config.upload.retry_delay_secs, 0);
        assert_eq!(config.logging.level, "debug");
        assert!(config.upload.upload_root_files);
    }

    #[test]
    fn test_exit_codes() {
        let invalid: anyhow::Error = SyncError::invalid_input("/missing", "Directory does not exist").into();
        assert_eq!(exit_status(&invalid), 2);

        let other = anyhow::anyhow!("No credentials given");
        assert_eq!(exit_status(&other), 1);
    }
}
