//! Interactive confirmations for the reconciliation engine.

use dialoguer::Confirm as Prompt;
use dialoguer::theme::ColorfulTheme;
use dist::reconcile::{Confirm, Question};

/// Asks on the terminal, unless told to assume yes.
#[derive(Debug, Clone, Copy)]
pub(super) struct Dialog {
    assume_yes: bool,
}

impl Dialog {
    /// `assume_yes` is combined with the `prompt.assume_yes` setting.
    pub(super) fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes: assume_yes || config::CONFIG.prompt.assume_yes,
        }
    }
}

impl Confirm for Dialog {
    async fn confirm(&mut self, question: Question, package: &str) -> bool {
        if self.assume_yes {
            tracing::info!(package, ?question, "assuming yes");
            return true;
        }
        let prompt = format!("{} {}", package, question);
        let answer = tokio::task::spawn_blocking(move || {
            super::logging::suspend(|| {
                Prompt::with_theme(&ColorfulTheme::default())
                    .with_prompt(prompt)
                    .default(false)
                    .interact()
                    .unwrap_or(false)
            })
        })
        .await;
        answer.unwrap_or_else(|e| {
            tracing::warn!(package, error = %e, "prompt failed, answering no");
            false
        })
    }
}
