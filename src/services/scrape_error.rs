use std::time::Duration;

use itertools::Itertools;

/// One failed acquisition strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedAttempt {
    pub provider: String,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("could not start a browser session, every strategy failed: {}", format_attempts(.attempts))]
    AcquisitionExhausted { attempts: Vec<FailedAttempt> },

    #[error("step '{step}' timed out after {}s: {reason}", .timeout.as_secs())]
    StepTimeout {
        step: String,
        timeout: Duration,
        reason: String,
    },

    #[error("browser command failed during '{step}': {reason}")]
    Browser { step: String, reason: String },

    #[error("{url} answered with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

fn format_attempts(attempts: &[FailedAttempt]) -> String {
    if attempts.is_empty() {
        return "no strategies configured".to_string();
    }
    attempts
        .iter()
        .map(|a| format!("{} ({})", a.provider, a.reason))
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_message_lists_every_attempt() {
        let err = ScrapeError::AcquisitionExhausted {
            attempts: vec![
                FailedAttempt {
                    provider: "managed driver".to_string(),
                    reason: "download failed".to_string(),
                },
                FailedAttempt {
                    provider: "system path".to_string(),
                    reason: "chromedriver not found".to_string(),
                },
            ],
        };

        assert_eq!(
            err.to_string(),
            "could not start a browser session, every strategy failed: \
             managed driver (download failed); system path (chromedriver not found)"
        );
    }

    #[test]
    fn step_timeout_message_names_the_step() {
        let err = ScrapeError::StepTimeout {
            step: "click Imports".to_string(),
            timeout: Duration::from_secs(20),
            reason: "no such element".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "step 'click Imports' timed out after 20s: no such element"
        );
    }
}
