use crate::channel::{FetchState, Generation, Notification};
use crate::engine::CallStackFrame;
use crate::session::{Session, SessionId};

/// Call stack request prepared by [`CallStackChannel`].
#[derive(Clone, Debug, PartialEq)]
pub struct CallStackRequest {
    pub generation: Generation,
    pub session: SessionId,
}

/// What a call stack pane should show.
#[derive(Debug, PartialEq)]
pub enum CallStackView<'a> {
    /// There is no session at all.
    NoSession,
    /// Session exists but it is not paused, a stack can't be fetched.
    NotPaused,
    /// Last fetch failed. If a session is paused the next step retries a fetch.
    Failed { error: &'a str, retry_on_step: bool },
    /// Fetch in progress and there is nothing to show yet.
    Loading,
    /// Nothing fetched yet or an engine returned an empty stack.
    Empty,
    Ready(&'a [CallStackFrame]),
}

/// Call stack synchronized with session stops.
///
/// A request is issued when the pane is mounted, the session is paused and no request was
/// issued for the current value of the session event counter. While unmounted no requests
/// are issued, and on mount a request is issued immediately if held frames do not belong to
/// the current stop.
#[derive(Default)]
pub struct CallStackChannel {
    mounted: bool,
    session: Option<Session>,
    /// Event counter for which a current request was issued.
    requested_event: Option<u64>,
    /// Event counter the held frames belong to.
    fetched_event: Option<u64>,
    generation: Generation,
    state: FetchState<Vec<CallStackFrame>>,
}

impl CallStackChannel {
    /// Apply a new session snapshot.
    pub fn observe(&mut self, snapshot: Option<&Session>) -> Option<CallStackRequest> {
        let prev_id = self.session.as_ref().map(|s| s.id);
        if prev_id != snapshot.map(|s| s.id) {
            self.forget();
        }
        self.session = snapshot.cloned();

        let session = self.session.as_ref()?;
        // an event may advance while running, compare with the stop of the last request
        let new_stop = self.requested_event != Some(session.current_event);

        if self.mounted && session.is_paused() && new_stop {
            return self.issue();
        }
        None
    }

    /// Pane became visible.
    pub fn mount(&mut self) -> Option<CallStackRequest> {
        if self.mounted {
            return None;
        }
        self.mounted = true;

        let session = self.session.as_ref()?;
        let up_to_date = self.fetched_event == Some(session.current_event)
            && self.state.error.is_none();
        if session.is_paused() && !up_to_date {
            return self.issue();
        }
        None
    }

    /// Pane is hidden, held frames and a pending request are dropped.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.forget();
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn forget(&mut self) {
        self.generation.bump();
        self.state.reset();
        self.requested_event = None;
        self.fetched_event = None;
    }

    fn issue(&mut self) -> Option<CallStackRequest> {
        let session = self.session.as_ref()?;
        let request = CallStackRequest {
            generation: self.generation.bump(),
            session: session.id,
        };
        self.requested_event = Some(session.current_event);
        self.state.start();
        Some(request)
    }

    /// Return true if a response with `generation` is not superseded.
    pub fn is_current(&self, generation: Generation) -> bool {
        generation == self.generation && self.mounted
    }

    /// Apply response. Return a notification if a request failed.
    /// Responses for superseded requests are ignored.
    pub fn settle(
        &mut self,
        generation: Generation,
        result: Result<Vec<CallStackFrame>, String>,
    ) -> Option<Notification> {
        if !self.is_current(generation) {
            return None;
        }

        match result {
            Ok(frames) => {
                self.state.succeed(frames);
                self.fetched_event = self.requested_event;
                None
            }
            Err(e) => {
                let notification = Notification::error(format!("Failed to fetch call stack: {e}"));
                self.state.fail(e, false);
                self.fetched_event = None;
                Some(notification)
            }
        }
    }

    pub fn state(&self) -> &FetchState<Vec<CallStackFrame>> {
        &self.state
    }

    /// Instruction pointer of the innermost frame.
    pub fn innermost_ip(&self) -> Option<u64> {
        self.state.items().first().and_then(CallStackFrame::ip)
    }

    pub fn view(&self) -> CallStackView<'_> {
        let Some(session) = self.session.as_ref() else {
            return CallStackView::NoSession;
        };

        if let Some(ref error) = self.state.error {
            return CallStackView::Failed {
                error,
                retry_on_step: session.is_paused(),
            };
        }

        if !session.is_paused() {
            return CallStackView::NotPaused;
        }

        match self.state.items() {
            [] if self.state.loading => CallStackView::Loading,
            [] => CallStackView::Empty,
            frames => CallStackView::Ready(frames),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::channel::callstack::{CallStackChannel, CallStackView};
    use crate::engine::CallStackFrame;
    use crate::session::{Session, SessionId, SessionStatus};

    fn frame(num: u32, ip: &str) -> CallStackFrame {
        CallStackFrame {
            frame_number: num,
            instruction_pointer: ip.to_string(),
            stack_pointer: "0x7FFFFFFFE000".to_string(),
            frame_pointer: "0x7FFFFFFFE000".to_string(),
            symbol_info: None,
        }
    }

    fn session(id: SessionId, status: SessionStatus, event: u64) -> Session {
        Session {
            id,
            status,
            current_event: event,
        }
    }

    #[test]
    fn test_fetch_once_per_paused_event() {
        let id = SessionId::new();
        let mut channel = CallStackChannel::default();
        assert!(channel.mount().is_none());

        let snapshots = [
            session(id, SessionStatus::Paused, 1),
            session(id, SessionStatus::Running, 1),
            session(id, SessionStatus::Running, 1),
            session(id, SessionStatus::Paused, 2),
            session(id, SessionStatus::Paused, 2),
        ];

        let fetches = snapshots
            .iter()
            .filter_map(|s| channel.observe(Some(s)))
            .count();
        assert_eq!(fetches, 2);
    }

    #[test]
    fn test_fetch_when_event_advanced_while_running() {
        let id = SessionId::new();
        let mut channel = CallStackChannel::default();
        channel.mount();

        let req = channel
            .observe(Some(&session(id, SessionStatus::Paused, 1)))
            .unwrap();
        channel.settle(req.generation, Ok(vec![frame(0, "0x1000")]));

        assert!(channel
            .observe(Some(&session(id, SessionStatus::Running, 2)))
            .is_none());
        let req = channel
            .observe(Some(&session(id, SessionStatus::Paused, 2)))
            .unwrap();
        channel.settle(req.generation, Ok(vec![frame(0, "0x1005")]));
        assert_eq!(channel.view(), CallStackView::Ready(&[frame(0, "0x1005")][..]));
        assert_eq!(channel.innermost_ip(), Some(0x1005));
    }

    #[test]
    fn test_no_fetch_while_not_paused() {
        let id = SessionId::new();
        let mut channel = CallStackChannel::default();
        channel.mount();

        for event in 0..5 {
            assert!(channel
                .observe(Some(&session(id, SessionStatus::Running, event)))
                .is_none());
        }
        assert_eq!(channel.view(), CallStackView::NotPaused);
    }

    #[test]
    fn test_no_fetch_while_unmounted() {
        let id = SessionId::new();
        let mut channel = CallStackChannel::default();

        for event in 0..5 {
            assert!(channel
                .observe(Some(&session(id, SessionStatus::Paused, event)))
                .is_none());
        }
    }

    #[test]
    fn test_fetch_on_mount_while_paused() {
        let id = SessionId::new();
        let mut channel = CallStackChannel::default();
        channel.observe(Some(&session(id, SessionStatus::Paused, 3)));

        let req = channel.mount().unwrap();
        assert_eq!(req.session, id);
        assert_eq!(channel.view(), CallStackView::Loading);
        channel.settle(req.generation, Ok(vec![frame(0, "0x1000")]));
        assert_eq!(channel.view(), CallStackView::Ready(&[frame(0, "0x1000")][..]));

        // remount without new stops fetches again, frames were dropped on unmount
        channel.unmount();
        assert!(channel.mount().is_some());
    }

    #[test]
    fn test_pending_response_dropped_on_unmount() {
        let id = SessionId::new();
        let mut channel = CallStackChannel::default();
        channel.mount();
        let req = channel
            .observe(Some(&session(id, SessionStatus::Paused, 1)))
            .unwrap();

        channel.unmount();
        assert!(channel
            .settle(req.generation, Err("late".to_string()))
            .is_none());
        assert!(channel.state().data.is_none());
        assert!(channel.state().error.is_none());
    }

    #[test]
    fn test_failure_and_recovery_on_next_step() {
        let id = SessionId::new();
        let mut channel = CallStackChannel::default();
        channel.mount();

        let req = channel
            .observe(Some(&session(id, SessionStatus::Paused, 1)))
            .unwrap();
        channel.settle(req.generation, Ok(vec![frame(0, "0x1000")]));

        let req = channel
            .observe(Some(&session(id, SessionStatus::Paused, 2)))
            .unwrap();
        let notification = channel.settle(req.generation, Err("unwind failed".to_string()));
        assert!(notification.is_some());
        assert_eq!(
            channel.view(),
            CallStackView::Failed {
                error: "unwind failed",
                retry_on_step: true
            }
        );
        assert!(channel.state().items().is_empty());

        let req = channel
            .observe(Some(&session(id, SessionStatus::Paused, 3)))
            .unwrap();
        channel.settle(req.generation, Ok(vec![frame(0, "0x1005"), frame(1, "0x2000")]));
        assert_eq!(channel.innermost_ip(), Some(0x1005));
        assert!(matches!(channel.view(), CallStackView::Ready(frames) if frames.len() == 2));
    }

    #[test]
    fn test_stale_frames_hidden_when_running() {
        let id = SessionId::new();
        let mut channel = CallStackChannel::default();
        channel.mount();

        let req = channel
            .observe(Some(&session(id, SessionStatus::Paused, 1)))
            .unwrap();
        channel.settle(req.generation, Ok(vec![frame(0, "0x1000")]));

        channel.observe(Some(&session(id, SessionStatus::Running, 1)));
        assert_eq!(channel.view(), CallStackView::NotPaused);
    }

    #[test]
    fn test_session_change_discards_frames() {
        let mut channel = CallStackChannel::default();
        channel.mount();

        let old = SessionId::new();
        let req = channel
            .observe(Some(&session(old, SessionStatus::Paused, 7)))
            .unwrap();
        channel.settle(req.generation, Ok(vec![frame(0, "0x1000")]));

        let new = SessionId::new();
        let pending = channel
            .observe(Some(&session(new, SessionStatus::Running, 7)))
            .is_none();
        assert!(pending);
        assert!(channel.state().items().is_empty());

        // nothing was fetched for a new session yet
        let req = channel
            .observe(Some(&session(new, SessionStatus::Paused, 7)))
            .unwrap();
        assert_eq!(req.session, new);
        assert!(channel
            .observe(Some(&session(new, SessionStatus::Paused, 7)))
            .is_none());

        channel.observe(None);
        assert_eq!(channel.view(), CallStackView::NoSession);
    }
}
