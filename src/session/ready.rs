// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! One-shot auth-ready gate.
//!
//! Phase moves `Uninitialized → Initializing → Ready` and never goes back.
//! Every transition runs inside a `watch` modify closure, so exactly one
//! caller observes the move to `Ready` no matter how the fallback timer,
//! the initial resolution and sign-in events interleave.

use std::sync::OnceLock;

use serde::Serialize;
use tokio::sync::watch;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Uninitialized,
    Initializing,
    Ready,
}

/// What drove the first transition to `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReadyCause {
    NoSession,
    SessionQueryFailed,
    ProfileResolved,
    Timeout,
    SignedIn,
    Login,
}

pub struct ReadyGate {
    phase: watch::Sender<SessionPhase>,
    cause: OnceLock<ReadyCause>,
}

impl ReadyGate {
    pub fn new() -> Self {
        Self {
            phase: watch::Sender::new(SessionPhase::Uninitialized),
            cause: OnceLock::new(),
        }
    }

    /// `Uninitialized → Initializing`. False if initialization already began.
    pub fn begin(&self) -> bool {
        self.phase.send_if_modified(|phase| {
            if *phase == SessionPhase::Uninitialized {
                *phase = SessionPhase::Initializing;
                true
            } else {
                false
            }
        })
    }

    /// Move to `Ready`. Returns true only for the call that made the
    /// transition; later calls change nothing.
    pub fn mark_ready(&self, cause: ReadyCause) -> bool {
        let transitioned = self.phase.send_if_modified(|phase| {
            if *phase == SessionPhase::Ready {
                return false;
            }
            *phase = SessionPhase::Ready;
            let _ = self.cause.set(cause);
            true
        });

        if transitioned {
            tracing::info!(?cause, "Auth ready");
        }
        transitioned
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == SessionPhase::Ready
    }

    pub fn cause(&self) -> Option<ReadyCause> {
        self.cause.get().copied()
    }

    /// Wait until the gate is `Ready`.
    pub async fn wait(&self) {
        let mut rx = self.phase.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting.
        let _ = rx.wait_for(|phase| *phase == SessionPhase::Ready).await;
    }
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn phases_advance_in_order() {
        let gate = ReadyGate::new();
        assert_eq!(gate.phase(), SessionPhase::Uninitialized);
        assert!(gate.begin());
        assert!(!gate.begin());
        assert_eq!(gate.phase(), SessionPhase::Initializing);
        assert!(gate.mark_ready(ReadyCause::NoSession));
        assert_eq!(gate.phase(), SessionPhase::Ready);
    }

    #[test]
    fn only_first_mark_ready_wins() {
        let gate = ReadyGate::new();
        gate.begin();
        assert!(gate.mark_ready(ReadyCause::ProfileResolved));
        assert!(!gate.mark_ready(ReadyCause::Timeout));
        assert!(gate.is_ready());
        assert_eq!(gate.cause(), Some(ReadyCause::ProfileResolved));
    }

    #[test]
    fn ready_cannot_go_back_to_initializing() {
        let gate = ReadyGate::new();
        gate.mark_ready(ReadyCause::SignedIn);
        assert!(!gate.begin());
        assert_eq!(gate.phase(), SessionPhase::Ready);
    }

    #[tokio::test]
    async fn wait_returns_once_ready() {
        let gate = Arc::new(ReadyGate::new());
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        gate.mark_ready(ReadyCause::Login);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_mark_ready_transitions_once() {
        let gate = Arc::new(ReadyGate::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move { gate.mark_ready(ReadyCause::SignedIn) }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
