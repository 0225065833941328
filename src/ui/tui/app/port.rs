use crate::channel::Generation;
use crate::engine::{CallStackFrame, Instruction, LogEntry};
use crate::session::{Session, SessionWatcher};
use crate::ui::tui::proto::{ControlCommand, Response, Responses};
use tuirealm::listener::{ListenerResult, Poll};
use tuirealm::Event;

#[derive(Eq, Clone, PartialOrd, Debug)]
pub enum UserEvent {
    /// New session snapshot, `None` if there is no session.
    Session(Option<Session>),
    DisasmFetched(Generation, Result<Vec<Instruction>, String>),
    CallStackFetched(Generation, Result<Vec<CallStackFrame>, String>),
    LogsFetched(Generation, Result<Vec<LogEntry>, String>),
    LogsCleared(Result<(), String>),
    ControlFailed(ControlCommand, String),
}

impl PartialEq for UserEvent {
    fn eq(&self, other: &Self) -> bool {
        match self {
            UserEvent::Session(_) => matches!(other, UserEvent::Session(_)),
            UserEvent::DisasmFetched(_, _) => matches!(other, UserEvent::DisasmFetched(_, _)),
            UserEvent::CallStackFetched(_, _) => {
                matches!(other, UserEvent::CallStackFetched(_, _))
            }
            UserEvent::LogsFetched(_, _) => matches!(other, UserEvent::LogsFetched(_, _)),
            UserEvent::LogsCleared(_) => matches!(other, UserEvent::LogsCleared(_)),
            UserEvent::ControlFailed(_, _) => matches!(other, UserEvent::ControlFailed(_, _)),
        }
    }
}

impl From<Response> for UserEvent {
    fn from(response: Response) -> Self {
        match response {
            Response::Disasm(gen, result) => UserEvent::DisasmFetched(gen, result),
            Response::CallStack(gen, result) => UserEvent::CallStackFetched(gen, result),
            Response::Logs(gen, result) => UserEvent::LogsFetched(gen, result),
            Response::LogsCleared(result) => UserEvent::LogsCleared(result),
            Response::ControlFailed(cmd, err) => UserEvent::ControlFailed(cmd, err),
        }
    }
}

/// Emits a session snapshot every time a session feed changes.
pub struct SessionPort {
    watcher: SessionWatcher,
}

impl SessionPort {
    pub fn new(watcher: SessionWatcher) -> Self {
        Self { watcher }
    }
}

impl Poll<UserEvent> for SessionPort {
    fn poll(&mut self) -> ListenerResult<Option<Event<UserEvent>>> {
        Ok(self
            .watcher
            .changed()
            .map(|snapshot| Event::User(UserEvent::Session(snapshot))))
    }
}

/// Emits dispatcher responses.
pub struct ResponsesPort {
    responses: Responses,
}

impl ResponsesPort {
    pub fn new(responses: Responses) -> Self {
        Self { responses }
    }
}

impl Poll<UserEvent> for ResponsesPort {
    fn poll(&mut self) -> ListenerResult<Option<Event<UserEvent>>> {
        Ok(self
            .responses
            .poll()
            .map(|response| Event::User(response.into())))
    }
}
