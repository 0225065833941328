use crate::channel::{FetchState, Generation, Notification, ViewState};
use crate::engine::{Instruction, DISASM_WINDOW};
use crate::session::SessionId;

/// Disassembly request prepared by [`DisasmChannel`].
#[derive(Clone, Debug, PartialEq)]
pub struct DisasmRequest {
    pub generation: Generation,
    pub session: SessionId,
    pub address: u64,
    pub count: usize,
}

/// Disassembly window anchored at an address of a session.
///
/// A request is issued once per distinct `(session, address)` pair. Changing any of them
/// supersedes a pending request. Failures are not retried until the pair changes
/// (or an explicit [`DisasmChannel::reload`]).
pub struct DisasmChannel {
    session: Option<SessionId>,
    address: Option<u64>,
    window: usize,
    generation: Generation,
    state: FetchState<Vec<Instruction>>,
}

impl Default for DisasmChannel {
    fn default() -> Self {
        Self::new(DISASM_WINDOW)
    }
}

impl DisasmChannel {
    pub fn new(window: usize) -> Self {
        Self {
            session: None,
            address: None,
            window,
            generation: Generation::default(),
            state: FetchState::default(),
        }
    }

    /// Set a new target. Return a request if the target changed and is valid.
    pub fn retarget(
        &mut self,
        session: Option<SessionId>,
        address: Option<u64>,
    ) -> Option<DisasmRequest> {
        if self.session == session && self.address == address {
            return None;
        }
        self.session = session;
        self.address = address;
        self.issue()
    }

    /// Change only the session part of a target.
    pub fn set_session(&mut self, session: Option<SessionId>) -> Option<DisasmRequest> {
        self.retarget(session, self.address)
    }

    /// Change only the address part of a target.
    pub fn goto(&mut self, address: u64) -> Option<DisasmRequest> {
        self.retarget(self.session, Some(address))
    }

    /// Repeat request for a current target.
    pub fn reload(&mut self) -> Option<DisasmRequest> {
        self.issue()
    }

    fn issue(&mut self) -> Option<DisasmRequest> {
        let generation = self.generation.bump();

        let (Some(session), Some(address)) = (self.session, self.address.filter(|a| *a != 0))
        else {
            self.state.reset();
            return None;
        };

        // instructions of a previous target must not be shown as current
        self.state.reset();
        self.state.start();
        Some(DisasmRequest {
            generation,
            session,
            address,
            count: self.window,
        })
    }

    /// Apply response. Return a notification if a request failed.
    /// Responses for superseded requests are ignored.
    pub fn settle(
        &mut self,
        generation: Generation,
        result: Result<Vec<Instruction>, String>,
    ) -> Option<Notification> {
        if generation != self.generation {
            return None;
        }

        match result {
            Ok(instructions) => {
                self.state.succeed(instructions);
                None
            }
            Err(e) => {
                let notification = Notification::error(format!("Failed to fetch disassembly: {e}"));
                self.state.fail(e, false);
                Some(notification)
            }
        }
    }

    pub fn address(&self) -> Option<u64> {
        self.address
    }

    pub fn state(&self) -> &FetchState<Vec<Instruction>> {
        &self.state
    }

    pub fn view(&self) -> ViewState<'_, Instruction> {
        self.state.view()
    }
}

#[cfg(test)]
mod test {
    use crate::channel::disasm::DisasmChannel;
    use crate::channel::{NotificationKind, ViewState};
    use crate::engine::Instruction;
    use crate::session::SessionId;

    fn instr(address: &str) -> Instruction {
        Instruction {
            address: address.to_string(),
            symbol: String::new(),
            bytes: "90".to_string(),
            mnemonic: "nop".to_string(),
            op_str: String::new(),
        }
    }

    #[test]
    fn test_request_once_per_target() {
        let mut channel = DisasmChannel::new(16);
        let session = SessionId::new();

        let req = channel.retarget(Some(session), Some(0x401000)).unwrap();
        assert_eq!(req.address, 0x401000);
        assert_eq!(req.count, 16);
        assert_eq!(channel.view(), ViewState::Loading);

        assert!(channel.retarget(Some(session), Some(0x401000)).is_none());
        assert!(channel.goto(0x401000).is_none());
        assert!(channel.goto(0x402000).is_some());
    }

    #[test]
    fn test_guards() {
        let mut channel = DisasmChannel::default();
        let session = SessionId::new();

        assert!(channel.retarget(None, Some(0x401000)).is_none());
        assert!(channel.retarget(Some(session), None).is_none());
        assert!(channel.retarget(Some(session), Some(0)).is_none());
        assert_eq!(channel.view(), ViewState::Empty);
    }

    #[test]
    fn test_stale_response_ignored() {
        let mut channel = DisasmChannel::default();
        let session = SessionId::new();

        let first = channel.retarget(Some(session), Some(0x1000)).unwrap();
        let second = channel.goto(0x2000).unwrap();

        // newer request settles first, older one arrives late
        assert!(channel
            .settle(second.generation, Ok(vec![instr("0x2000")]))
            .is_none());
        assert!(channel
            .settle(first.generation, Err("late".to_string()))
            .is_none());

        assert_eq!(channel.view(), ViewState::Populated(&[instr("0x2000")][..]));
    }

    #[test]
    fn test_invalid_target_supersedes_pending() {
        let mut channel = DisasmChannel::default();
        let session = SessionId::new();

        let req = channel.retarget(Some(session), Some(0x1000)).unwrap();
        assert!(channel.set_session(None).is_none());
        channel.settle(req.generation, Ok(vec![instr("0x1000")]));

        assert_eq!(channel.view(), ViewState::Empty);
    }

    #[test]
    fn test_failure_clears_data_and_notifies_once() {
        let mut channel = DisasmChannel::default();
        let session = SessionId::new();

        let req = channel.retarget(Some(session), Some(0x1000)).unwrap();
        channel.settle(req.generation, Ok(vec![instr("0x1000")]));

        let req = channel.goto(0x401000).unwrap();
        let notification = channel
            .settle(req.generation, Err("engine busy".to_string()))
            .unwrap();
        assert_eq!(notification.kind, NotificationKind::Error);
        assert_eq!(notification.text, "Failed to fetch disassembly: engine busy");

        assert_eq!(channel.view(), ViewState::Error("engine busy"));
        assert!(channel.state().items().is_empty());

        // no automatic retry for the same target
        assert!(channel.goto(0x401000).is_none());
    }

    #[test]
    fn test_reload_retries_same_target() {
        let mut channel = DisasmChannel::default();
        let session = SessionId::new();

        let req = channel.retarget(Some(session), Some(0x1000)).unwrap();
        channel.settle(req.generation, Err("engine busy".to_string()));

        let retry = channel.reload().unwrap();
        assert!(retry.generation > req.generation);
        assert_eq!(retry.address, 0x1000);
        channel.settle(retry.generation, Ok(vec![instr("0x1000")]));
        assert_eq!(channel.state().error, None);
    }
}
