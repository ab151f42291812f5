//! Progress reporting while the gateway connects

use busgate_domain::GatewayState;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown between `init` and Ready
pub struct ReadySpinner {
    bar: ProgressBar,
}

impl ReadySpinner {
    /// A visible spinner, or a hidden one when `quiet` is set.
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        bar.set_style(Self::spinner_style());
        bar.set_prefix("busgate");
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    /// Message for a lifecycle state
    pub fn state_message(state: GatewayState, endpoint: &str) -> String {
        match state {
            GatewayState::Uninitialized | GatewayState::Initialized => {
                format!("Connecting to {}...", endpoint)
            }
            GatewayState::ConnectionOpen => "Signing in...".to_string(),
            GatewayState::Ready => "Ready".to_string(),
        }
    }

    pub fn update(&self, state: GatewayState, endpoint: &str) {
        self.bar.set_message(Self::state_message(state, endpoint));
    }

    pub fn finish_ready(&self, client_id: &str) {
        self.bar.finish_with_message(format!(
            "{} as {}",
            "Ready".green(),
            client_id.bold()
        ));
    }

    pub fn finish_with_error(&self, message: &str) {
        self.bar.abandon_with_message(format!("{} {}", "x".red(), message));
    }

    pub fn is_hidden(&self) -> bool {
        self.bar.is_hidden()
    }
}
