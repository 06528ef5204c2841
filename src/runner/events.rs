use super::state::{RunSummary, ScenarioStatus};
use tokio::sync::broadcast;

/// Run execution events for real-time console updates
#[derive(Debug, Clone)]
pub enum RunEvent {
    // Session events
    SessionStarted {
        session_id: String,
    },
    SessionFinished {
        summary: RunSummary,
    },

    // Group events
    GroupStarted {
        group_name: String,
        scenario_count: usize,
    },
    GroupFinished {
        group_name: String,
    },

    // Scenario events
    ScenarioStarted {
        scenario_name: String,
        group_name: String,
        step_count: usize,
    },
    ScenarioFinished {
        scenario_name: String,
        status: ScenarioStatus,
        message: Option<String>,
        duration_ms: Option<u64>,
    },

    // Step events
    StepStarted {
        scenario_name: String,
        index: usize,
        label: String,
    },
    StepPassed {
        scenario_name: String,
        index: usize,
        duration_ms: u64,
    },
    StepFailed {
        scenario_name: String,
        index: usize,
        error: String,
        duration_ms: u64,
    },
    StepSkipped {
        scenario_name: String,
        index: usize,
        reason: String,
    },

    // Log event for coordinated output
    Log {
        message: String,
    },
}

/// Event emitter for broadcasting run events
#[derive(Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<RunEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<RunEvent>) {
        let (sender, receiver) = broadcast::channel(100);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: RunEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }
}

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::time::Duration as StdDuration;

/// Console event listener printing real-time progress
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<RunEvent>) {
        use colored::Colorize;
        use indicatif::ProgressDrawTarget;
        use std::io::IsTerminal;

        // Hidden draw target when output is piped, to avoid escape codes
        let multi = if std::io::stdout().is_terminal() {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        // One spinner per in-flight step, keyed by scenario and index
        let mut spinners: HashMap<(String, usize), (ProgressBar, String)> = HashMap::new();

        while let Ok(event) = receiver.recv().await {
            match event {
                RunEvent::SessionStarted { session_id } => {
                    multi
                        .println(format!(
                            "\n{} Test session started: {}",
                            "▶".green().bold(),
                            session_id.cyan()
                        ))
                        .ok();
                }

                RunEvent::SessionFinished { summary } => {
                    for ((_, _), (pb, _)) in spinners.drain() {
                        pb.finish();
                    }
                    tokio::time::sleep(StdDuration::from_millis(200)).await;

                    println!("\n{} Test session finished", "■".blue().bold());
                    println!("  Groups: {}", summary.total_groups);
                    println!("  Scenarios: {}", summary.total_scenarios);
                    println!(
                        "  {} passed, {} failed, {} skipped",
                        summary.passed.to_string().green(),
                        summary.failed.to_string().red(),
                        summary.skipped.to_string().yellow()
                    );
                    if let Some(duration) = summary.total_duration_ms {
                        println!("  Duration: {}ms", duration);
                    }
                }

                RunEvent::GroupStarted {
                    group_name,
                    scenario_count,
                } => {
                    println!(
                        "\n{} Group: {} ({} scenarios)",
                        "●".blue(),
                        group_name.white().bold(),
                        scenario_count
                    );
                }

                RunEvent::GroupFinished { .. } => {}

                RunEvent::ScenarioStarted {
                    scenario_name,
                    step_count,
                    ..
                } => {
                    println!(
                        "  {} Scenario: {} ({} steps)",
                        "→".blue(),
                        scenario_name.white().bold(),
                        step_count
                    );
                }

                RunEvent::ScenarioFinished {
                    scenario_name,
                    status,
                    message,
                    duration_ms,
                } => {
                    let status_str = match status {
                        ScenarioStatus::Passed => "PASSED".green().bold(),
                        ScenarioStatus::Failed => "FAILED".red().bold(),
                        ScenarioStatus::Skipped => "SKIPPED".yellow().bold(),
                        _ => "UNKNOWN".white().bold(),
                    };
                    println!("  {} Scenario {} [{}]", "←".blue(), scenario_name, status_str);
                    if let Some(msg) = message {
                        println!("      {}", msg.dimmed());
                    }
                    if let Some(duration) = duration_ms {
                        println!("      Duration: {}ms", duration);
                    }
                }

                RunEvent::StepStarted {
                    scenario_name,
                    index,
                    label,
                } => {
                    let pb = multi.add(ProgressBar::new_spinner());
                    let style = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("      {spinner} {msg}")
                        .unwrap();
                    pb.set_style(style);

                    let body = format!("[{}] {}... ", index, label.dimmed());
                    pb.set_message(body.clone());
                    pb.enable_steady_tick(StdDuration::from_millis(100));

                    spinners.insert((scenario_name, index), (pb, body));
                }

                RunEvent::StepPassed {
                    scenario_name,
                    index,
                    duration_ms,
                } => {
                    if let Some((pb, body)) = spinners.remove(&(scenario_name, index)) {
                        pb.finish_and_clear();
                        tokio::time::sleep(StdDuration::from_millis(50)).await;
                        println!("      {} {}({}ms)", "✓".green(), body, duration_ms);
                    }
                }

                RunEvent::StepFailed {
                    scenario_name,
                    index,
                    error,
                    duration_ms,
                } => {
                    if let Some((pb, body)) = spinners.remove(&(scenario_name, index)) {
                        pb.finish_and_clear();
                        tokio::time::sleep(StdDuration::from_millis(50)).await;
                        println!("      {} {}({}ms)", "✗".red(), body, duration_ms);
                        println!("        {}", error.red());
                    }
                }

                RunEvent::StepSkipped {
                    scenario_name,
                    index,
                    reason,
                } => {
                    if let Some((pb, body)) = spinners.remove(&(scenario_name, index)) {
                        pb.finish_and_clear();
                        tokio::time::sleep(StdDuration::from_millis(50)).await;
                        println!("      {} {}({})", "○".yellow(), body, reason.dimmed());
                    }
                }

                RunEvent::Log { message } => {
                    multi.println(format!("      {}", message)).ok();
                }
            }
        }
    }
}
