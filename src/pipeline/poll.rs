//! Bounded fixed-delay polling as an explicit state machine.
//!
//! `Pending` advances one attempt at a time until it lands in exactly one of
//! the terminal states: `Succeeded` on the first attempt that observes a
//! value, `Exhausted` when every attempt came back empty, or `Failed` when the
//! final attempt itself errored.
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

#[derive(Debug)]
pub enum AwaitState<T> {
    Pending { attempt: u32 },
    Succeeded { attempts: u32, value: T },
    Exhausted { attempts: u32 },
    Failed { attempts: u32, cause: AppError },
}

impl<T> AwaitState<T> {
    pub fn start() -> Self {
        AwaitState::Pending { attempt: 0 }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AwaitState::Pending { .. })
    }

    /// Feed the outcome of one attempt. Terminal states ignore further input.
    pub fn advance(self, policy: &PollPolicy, observed: AppResult<Option<T>>) -> Self {
        let attempts = match self {
            AwaitState::Pending { attempt } => attempt + 1,
            terminal => return terminal,
        };
        let last = attempts >= policy.max_attempts;
        match observed {
            Ok(Some(value)) => AwaitState::Succeeded { attempts, value },
            Ok(None) if last => AwaitState::Exhausted { attempts },
            Ok(None) => AwaitState::Pending { attempt: attempts },
            Err(cause) if last => AwaitState::Failed { attempts, cause },
            Err(cause) => {
                tracing::warn!(attempt = attempts, error = %cause, "poll attempt failed, retrying");
                AwaitState::Pending { attempt: attempts }
            }
        }
    }

    pub fn into_result(self) -> AppResult<T> {
        match self {
            AwaitState::Succeeded { value, .. } => Ok(value),
            AwaitState::Exhausted { attempts } | AwaitState::Pending { attempt: attempts } => {
                Err(AppError::AwaitExhausted { attempts })
            }
            AwaitState::Failed { attempts, cause } => {
                Err(AppError::AwaitFailed { attempts, cause: Box::new(cause) })
            }
        }
    }
}

/// Drive `probe` until a terminal state, sleeping `policy.interval` after
/// every non-terminal attempt, faulted ones included. `probe` receives the
/// 1-based attempt number.
pub async fn run<T, F, Fut>(policy: &PollPolicy, mut probe: F) -> AwaitState<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AppResult<Option<T>>>,
{
    if policy.max_attempts == 0 {
        return AwaitState::Exhausted { attempts: 0 };
    }
    let mut state = AwaitState::start();
    loop {
        let attempt = match &state {
            AwaitState::Pending { attempt } => attempt + 1,
            _ => return state,
        };
        state = state.advance(policy, probe(attempt).await);
        if !state.is_terminal() {
            sleep(policy.interval).await;
        }
    }
}
