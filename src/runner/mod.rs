pub mod context;
pub mod error;
pub mod events;
pub mod executor;
pub mod resolver;
pub mod scenario;
pub mod state;
pub mod suite;

use anyhow::Result;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use events::*;
pub use state::*;

use crate::driver::web::{BrowserType, WebDriverConfig, WebSessionFactory};
use crate::parser::yaml::parse_suite_file;
use suite::SuiteOrchestrator;

static CANCELLED: AtomicBool = AtomicBool::new(false);

pub fn is_cancelled() -> bool {
    CANCELLED.load(Ordering::SeqCst)
}

pub fn request_cancel() {
    CANCELLED.store(true, Ordering::SeqCst);
}

/// Install the Ctrl+C handler. Scenarios stop between steps, remaining
/// ones are marked skipped, and browser sessions are released before the
/// report is written.
pub fn install_interrupt_handler() -> Result<()> {
    ctrlc::set_handler(|| {
        println!("\n\n{} Interrupt received, stopping...", "⏹".yellow());
        request_cancel();
    })?;
    Ok(())
}

/// Options for a suite run
pub struct RunOptions {
    pub browser: Option<String>,
    pub headless: Option<bool>,
    pub base_url: Option<String>,
    pub output: PathBuf,
    pub report: bool,
    pub parallel: bool,
    pub snapshot: bool,
}

/// Run suite file(s) from a file or directory
pub async fn run_suites(path: &Path, opts: RunOptions) -> Result<()> {
    // Collect all suite files
    let mut all_files = Vec::new();
    if path.is_dir() {
        for entry in walkdir::WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map_or(false, |ext| ext == "yaml" || ext == "yml")
            })
        {
            all_files.push(entry.path().to_path_buf());
        }
    } else {
        all_files.push(path.to_path_buf());
    }

    if all_files.is_empty() {
        println!("{} No suite files found.", "ℹ".blue());
        return Ok(());
    }

    std::fs::create_dir_all(&opts.output)?;

    let (emitter, receiver) = EventEmitter::new();
    tokio::spawn(ConsoleEventListener::listen(receiver));

    let mut failed_total: u32 = 0;

    for file in &all_files {
        let mut suite = parse_suite_file(file)?;
        if opts.base_url.is_some() {
            suite.base_url = opts.base_url.clone();
        }

        let browser_name = opts
            .browser
            .clone()
            .or_else(|| suite.browser.clone())
            .unwrap_or_else(|| "chromium".to_string());

        let mut config = WebDriverConfig {
            browser_type: BrowserType::from_name(&browser_name),
            base_url: suite.base_url.clone(),
            ..WebDriverConfig::default()
        };
        if let Some(headless) = opts.headless {
            config.headless = headless;
        }

        let factory = Arc::new(WebSessionFactory::new(config));
        let orchestrator = SuiteOrchestrator::new(
            factory,
            emitter.clone(),
            opts.output.clone(),
            opts.snapshot,
            opts.parallel,
        );

        let session = orchestrator.run(&suite).await?;
        failed_total += session.summary().failed;

        let stem = file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("suite");
        let suite_name = suite.name.clone().unwrap_or_else(|| stem.to_string());
        let results = crate::report::build_results(&session, &suite_name);
        crate::report::write_all(&results, &opts.output, stem, opts.report)?;

        if is_cancelled() {
            break;
        }
    }

    // Give the console listener a beat to drain
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    if failed_total > 0 {
        anyhow::bail!("{} scenario(s) failed", failed_total);
    }
    Ok(())
}
