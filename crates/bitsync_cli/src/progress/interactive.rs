use std::sync::Mutex;
use std::time::Duration;

use bitsync::sync::SyncProgress;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Bars live under a single lock.
#[derive(Default)]
struct ProgressState {
    /// Spinner shown while authenticating and listing repositories.
    discovery_bar: Option<ProgressBar>,
    /// One tick per finished or failed repository.
    repo_bar: Option<ProgressBar>,
    /// Slugs currently being synchronized, for the bar message.
    active: Vec<String>,
}

/// Interactive progress reporter using indicatif.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(ProgressState::default()),
        }
    }

    fn discovery_bar(&self, state: &mut ProgressState) -> ProgressBar {
        state
            .discovery_bar
            .get_or_insert_with(|| {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(Self::spinner_style());
                bar.set_prefix(format!("{:12}", "discover"));
                bar.enable_steady_tick(Duration::from_millis(100));
                bar
            })
            .clone()
    }

    fn set_active_message(state: &ProgressState) {
        if let Some(ref bar) = state.repo_bar {
            match state.active.as_slice() {
                [] => bar.set_message(String::new()),
                [only] => bar.set_message(only.clone()),
                [first, rest @ ..] => bar.set_message(format!("{first} (+{})", rest.len())),
            }
        }
    }

    pub fn handle(&self, event: SyncProgress) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            SyncProgress::Authenticated { account } => {
                self.discovery_bar(&mut state)
                    .set_message(format!("Authenticated as {account}"));
            }

            SyncProgress::DiscoveringRepositories { account } => {
                self.discovery_bar(&mut state)
                    .set_message(format!("Listing repositories of {account}..."));
            }

            SyncProgress::OutdatedRepositories { total, outdated } => {
                self.discovery_bar(&mut state).finish_with_message(format!(
                    "{outdated} of {total} repositories outdated"
                ));

                let bar = self.multi.add(ProgressBar::new(outdated as u64));
                bar.set_style(Self::bar_style());
                bar.set_prefix(format!("{:12}", "sync"));
                state.repo_bar = Some(bar);
            }

            SyncProgress::RepositoryStarted { slug, .. } => {
                state.active.push(slug);
                Self::set_active_message(&state);
            }

            SyncProgress::RepositoryFinished { slug } => {
                state.active.retain(|s| s != &slug);
                if let Some(ref bar) = state.repo_bar {
                    bar.inc(1);
                }
                Self::set_active_message(&state);
            }

            SyncProgress::RepositoryFailed { slug, error } => {
                state.active.retain(|s| s != &slug);
                if let Some(ref bar) = state.repo_bar {
                    bar.inc(1);
                }
                let _ = self.multi.println(format!("✗ {slug}: {error}"));
                Self::set_active_message(&state);
            }

            SyncProgress::Complete {
                synchronized,
                failed,
            } => {
                if let Some(ref bar) = state.repo_bar {
                    bar.finish_with_message(format!("{synchronized} synchronized, {failed} failed"));
                }
            }

            _ => {}
        }
    }

    pub fn finish(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ref pb) = state.discovery_bar
            && !pb.is_finished()
        {
            pb.finish_and_clear();
        }
        if let Some(ref pb) = state.repo_bar
            && !pb.is_finished()
        {
            pb.abandon();
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .expect("Invalid template")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .expect("Invalid template")
            .progress_chars("█▓░")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
