use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

impl UiMode {
    fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        }
    }
}

/// Startup stage reporting on stderr: a spinner on a terminal, `==>` lines
/// otherwise. Decided once, when the UI is built.
#[derive(Clone, Debug)]
pub struct Ui {
    spinners: bool,
}

impl Ui {
    /// `stdout_redirected` keeps `auto` plain when the run's statistics are
    /// being piped somewhere.
    pub fn from_args(ui_flag: Option<&str>, stderr_is_tty: bool, stdout_redirected: bool) -> Self {
        let spinners = stderr_is_tty
            && match UiMode::from_flag(ui_flag) {
                UiMode::Pretty => true,
                UiMode::Auto => !stdout_redirected,
                UiMode::Plain => false,
            };
        Self { spinners }
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        let spinner = if self.spinners {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            spinner.set_style(
                ProgressStyle::with_template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.set_message(format!("{name}…"));
            Some(spinner)
        } else {
            eprintln!("==> {}", name);
            None
        };
        StageGuard {
            name: name.to_string(),
            started: Instant::now(),
            spinner,
            failed: false,
        }
    }
}

/// Closes a stage line when dropped.
pub struct StageGuard {
    name: String,
    started: Instant,
    spinner: Option<ProgressBar>,
    failed: bool,
}

impl StageGuard {
    /// Close the stage with a cross instead of a tick.
    pub fn fail(&mut self) {
        self.failed = true;
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let mark = if self.failed { "✘" } else { "✔" };
        let line = format!(
            "{} {} ({})",
            mark,
            self.name,
            format_elapsed(self.started.elapsed())
        );
        match &self.spinner {
            Some(spinner) => spinner.finish_with_message(line),
            None => eprintln!("{line}"),
        }
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    if elapsed.as_secs() >= 1 {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else {
        format!("{}ms", elapsed.as_millis())
    }
}
