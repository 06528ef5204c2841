use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use shopcheck::{report, runner};

#[derive(Parser)]
#[command(name = "shopcheck")]
#[command(version = "0.1.0")]
#[command(about = "Storefront E2E scenario runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run suite file(s) or a directory of suites
    Run {
        /// Path to suite file or directory
        path: PathBuf,

        /// Browser type (chromium, firefox, webkit). Parsed from the suite
        /// file if not provided.
        #[arg(short, long)]
        browser: Option<String>,

        /// Run the browser headless
        #[arg(long, default_value = "false")]
        headless: bool,

        /// Override the suite's base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Output directory for results and artifacts
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Generate reports (JUnit, HTML) in addition to JSON results
        #[arg(long, default_value = "false")]
        report: bool,

        /// Run isolated groups on parallel browser sessions
        #[arg(long, default_value = "false")]
        parallel: bool,

        /// Capture a screenshot on every scenario failure
        #[arg(long, short = 's', default_value = "false")]
        snapshot: bool,
    },

    /// Generate report from saved results
    Report {
        /// Path to results JSON
        results: PathBuf,

        /// Output format (json, html, junit)
        #[arg(short, long, default_value = "html")]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            path,
            browser,
            headless,
            base_url,
            output,
            report,
            parallel,
            snapshot,
        } => {
            println!(
                "{} Running suites from: {}",
                "▶".green().bold(),
                path.display()
            );
            if let Some(ref b) = browser {
                println!("  Browser: {}", b.cyan());
            }
            if headless {
                println!("  Headless: {}", "Enabled".yellow());
            }
            if let Some(ref url) = base_url {
                println!("  Base URL: {}", url.cyan());
            }
            println!("  Output: {}", output.display().to_string().cyan());
            if parallel {
                println!("  Parallel: {}", "Enabled".yellow());
            }
            if report {
                println!("  Reports: {}", "Enabled".green());
            }
            if snapshot {
                println!("  Snapshots: {}", "Enabled".green());
            }

            runner::install_interrupt_handler()?;

            let opts = runner::RunOptions {
                browser,
                headless: if headless { Some(true) } else { None },
                base_url,
                output,
                report,
                parallel,
                snapshot,
            };
            runner::run_suites(&path, opts).await?;
        }

        Commands::Report {
            results,
            format,
            output,
        } => {
            report::generate_report(&results, &format, output.as_deref()).await?;
        }
    }

    Ok(())
}
