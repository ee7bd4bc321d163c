use std::sync::atomic::{AtomicBool, Ordering};

use village_core::eligibility::{ActionTag, PhaseRequest};
use village_core::overlay::toast::NotificationKind;
use village_core::store::{ApplyOutcome, SessionStore};

use crate::error::ClientError;
use crate::session::Session;

/// Result of a user-initiated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Applied,
    /// No valid target was selected; nothing was sent.
    NoTarget,
    /// Another request from this session is still pending.
    Busy,
    /// The user declined the confirmation prompt.
    Declined,
    /// The control is not offered in the current state.
    NotAllowed,
    /// The session already ended.
    Ended,
    Failed(ClientError),
}

/// Yes/no prompt for destructive operations.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Holds the session's single in-flight slot until dropped.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Session {
    /// Send `action` against the selected target. The response snapshot is
    /// applied and the selection cleared whatever the server did with it.
    pub async fn submit_action(&self, action: ActionTag) -> SubmitOutcome {
        let ctx = &self.ctx;
        if ctx.cancel.is_cancelled() {
            return SubmitOutcome::Ended;
        }
        let target = ctx
            .store
            .read()
            .await
            .selected_target()
            .map(|p| p.username().to_string());
        let Some(target) = target else {
            ctx.notify("Select a target first", NotificationKind::Warning)
                .await;
            return SubmitOutcome::NoTarget;
        };
        let Some(_guard) = InFlightGuard::acquire(&ctx.in_flight) else {
            tracing::debug!(%action, "Request already in flight");
            return SubmitOutcome::Busy;
        };

        tracing::info!(room_id = ctx.room_id, %action, target = %target, "Submitting action");
        match ctx
            .api
            .submit_action(&ctx.creds, ctx.room_id, action, &target)
            .await
        {
            Ok(snapshot) => {
                ctx.apply(snapshot, "action").await;
                ctx.update(SessionStore::clear_selection).await;
                SubmitOutcome::Applied
            },
            Err(e) => self.fail(e, "Action failed").await,
        }
    }

    /// Ask the server for a phase transition. Landing on any phase other
    /// than `Ended` arms the decision timer.
    pub async fn submit_phase_change(&self, request: PhaseRequest) -> SubmitOutcome {
        let ctx = &self.ctx;
        if ctx.cancel.is_cancelled() {
            return SubmitOutcome::Ended;
        }
        let Some(_guard) = InFlightGuard::acquire(&ctx.in_flight) else {
            tracing::debug!(%request, "Request already in flight");
            return SubmitOutcome::Busy;
        };

        tracing::info!(room_id = ctx.room_id, %request, "Requesting phase change");
        match ctx
            .api
            .change_phase(&ctx.creds, ctx.room_id, request)
            .await
        {
            Ok(snapshot) => {
                let resulting = snapshot.current_phase;
                let applied = ctx.apply(snapshot, "phase").await == ApplyOutcome::Applied;
                if applied && request.arms_decision_timer(resulting) {
                    let seconds = ctx.settings.decision_timer_secs;
                    ctx.update(|store| store.start_timer(seconds)).await;
                    ctx.notify(
                        format!("{seconds} second decision timer started"),
                        NotificationKind::Info,
                    )
                    .await;
                }
                SubmitOutcome::Applied
            },
            Err(e) => self.fail(e, "Phase change failed").await,
        }
    }

    /// Trigger the advance control offered for the current phase.
    pub async fn advance_phase(&self) -> SubmitOutcome {
        let control = self.ctx.store.read().await.phase_control();
        match control {
            Some(control) => self.submit_phase_change(control.request).await,
            None => SubmitOutcome::NotAllowed,
        }
    }

    /// Remove `username` from the room after confirmation, then resync.
    pub async fn kick_player(&self, username: &str, confirm: &impl Confirm) -> SubmitOutcome {
        let ctx = &self.ctx;
        if ctx.cancel.is_cancelled() {
            return SubmitOutcome::Ended;
        }
        let allowed = {
            let store = ctx.store.read().await;
            store
                .snapshot()
                .and_then(|s| s.player_by_username(username))
                .is_some_and(|target| store.view().can_kick(target))
        };
        if !allowed {
            return SubmitOutcome::NotAllowed;
        }
        if !confirm.confirm(&format!("Kick {username} from the room?")) {
            return SubmitOutcome::Declined;
        }
        let Some(_guard) = InFlightGuard::acquire(&ctx.in_flight) else {
            return SubmitOutcome::Busy;
        };

        tracing::info!(room_id = ctx.room_id, target = %username, "Kicking player");
        match ctx.api.kick(&ctx.creds, ctx.room_id, username).await {
            Ok(()) => {
                ctx.notify(
                    format!("{username} was removed from the room"),
                    NotificationKind::Success,
                )
                .await;
                ctx.resync.notify_one();
                SubmitOutcome::Applied
            },
            Err(e) => self.fail(e, "Kick failed").await,
        }
    }

    async fn fail(&self, e: ClientError, fallback: &str) -> SubmitOutcome {
        if e == ClientError::Unauthorized {
            self.ctx.invalidate_login().await;
        } else {
            tracing::warn!(room_id = self.ctx.room_id, error = %e, "{fallback}");
            self.ctx
                .notify(e.user_message(fallback), NotificationKind::Error)
                .await;
        }
        SubmitOutcome::Failed(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_allows_one_holder() {
        let flag = AtomicBool::new(false);
        let first = InFlightGuard::acquire(&flag);
        assert!(first.is_some());
        assert!(InFlightGuard::acquire(&flag).is_none());
        drop(first);
        assert!(InFlightGuard::acquire(&flag).is_some());
    }

    #[test]
    fn closures_confirm() {
        let yes = |_: &str| true;
        let no = |prompt: &str| prompt.is_empty();
        assert!(yes.confirm("Kick bob?"));
        assert!(!no.confirm("Kick bob?"));
    }
}
