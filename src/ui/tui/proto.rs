//! Request dispatching between panes and an engine.
//!
//! Every data channel has its own worker thread (lane), so a slow or failing request of one
//! pane never delays requests of another. Responses are tagged with a request generation
//! and returned through a single queue polled by the TUI event loop.

use crate::channel::callstack::CallStackRequest;
use crate::channel::disasm::DisasmRequest;
use crate::channel::logs::LogsRequest;
use crate::channel::Generation;
use crate::engine::{CallStackFrame, Control, Engine, Error, Instruction, LogEntry};
use log::{debug, error, warn};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use strum_macros::Display;

/// Session lifecycle command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ControlCommand {
    Step,
    Resume,
    Stop,
    Restart,
}

#[derive(Debug)]
pub enum Response {
    Disasm(Generation, Result<Vec<Instruction>, String>),
    CallStack(Generation, Result<Vec<CallStackFrame>, String>),
    Logs(Generation, Result<Vec<LogEntry>, String>),
    LogsCleared(Result<(), String>),
    ControlFailed(ControlCommand, String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Lane {
    Disasm,
    CallStack,
    Logs,
    Control,
}

type Task = dyn FnOnce() -> Option<Response> + Send;

enum Request {
    Exit,
    Task(Box<Task>),
}

struct Worker {
    requests: Sender<Request>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn(lane: Lane, responses: Sender<Response>) -> std::io::Result<Self> {
        let (requests, incoming) = channel::<Request>();
        let handle = thread::Builder::new()
            .name(format!("lane-{lane}"))
            .spawn(move || {
                while let Ok(Request::Task(task)) = incoming.recv() {
                    let Some(response) = task() else {
                        continue;
                    };
                    if responses.send(response).is_err() {
                        // nobody is waiting for responses anymore
                        break;
                    }
                }
                debug!(target: "tui", "{lane} lane stopped");
            })?;

        Ok(Self {
            requests,
            handle: Some(handle),
        })
    }

    fn stop(&mut self) {
        _ = self.requests.send(Request::Exit);
        if let Some(handle) = self.handle.take() {
            _ = handle.join();
        }
    }
}

/// Render engine error as a pane message.
fn render(op: &str, err: Error) -> String {
    if err.is_fatal() {
        error!(target: "engine", "{op}: {err:#}");
    } else {
        warn!(target: "engine", "{op}: {err:#}");
    }
    err.to_string()
}

/// Executes channel requests on per-lane worker threads.
pub struct Dispatcher {
    engine: Arc<dyn Engine>,
    control: Arc<dyn Control>,
    disasm: Worker,
    callstack: Worker,
    logs: Worker,
    ctl: Worker,
    /// Used to answer requests that a closed lane can't take.
    rejections: Sender<Response>,
}

impl Dispatcher {
    fn worker(&self, lane: Lane) -> &Worker {
        match lane {
            Lane::Disasm => &self.disasm,
            Lane::CallStack => &self.callstack,
            Lane::Logs => &self.logs,
            Lane::Control => &self.ctl,
        }
    }

    /// Queue a task on a lane. If the lane is closed, a response built by `reject`
    /// is returned instead, so a requester is never left waiting.
    fn send<F, R>(&self, lane: Lane, task: F, reject: R)
    where
        F: FnOnce() -> Option<Response> + Send + 'static,
        R: FnOnce(String) -> Response,
    {
        if self
            .worker(lane)
            .requests
            .send(Request::Task(Box::new(task)))
            .is_err()
        {
            let err = format!("{lane} lane is closed");
            warn!(target: "tui", "{err}, request dropped");
            _ = self.rejections.send(reject(err));
        }
    }

    pub fn fetch_disasm(&self, req: DisasmRequest) {
        let engine = self.engine.clone();
        let generation = req.generation;
        self.send(
            Lane::Disasm,
            move || {
                let result = engine
                    .get_disassembly(req.session, req.address, req.count)
                    .map_err(|e| render("get_disassembly", e));
                Some(Response::Disasm(req.generation, result))
            },
            |err| Response::Disasm(generation, Err(err)),
        );
    }

    pub fn fetch_callstack(&self, req: CallStackRequest) {
        let engine = self.engine.clone();
        let generation = req.generation;
        self.send(
            Lane::CallStack,
            move || {
                let result = engine
                    .get_session_callstack(req.session)
                    .map_err(|e| render("get_session_callstack", e));
                Some(Response::CallStack(req.generation, result))
            },
            |err| Response::CallStack(generation, Err(err)),
        );
    }

    pub fn fetch_logs(&self, req: LogsRequest) {
        let engine = self.engine.clone();
        let generation = req.generation;
        self.send(
            Lane::Logs,
            move || {
                let result = engine.get_logs().map_err(|e| render("get_logs", e));
                Some(Response::Logs(req.generation, result))
            },
            |err| Response::Logs(generation, Err(err)),
        );
    }

    /// Clear an engine log buffer. Runs on the logs lane, after all already issued polls.
    pub fn clear_logs(&self) {
        let engine = self.engine.clone();
        self.send(
            Lane::Logs,
            move || {
                let result = engine.clear_logs().map_err(|e| render("clear_logs", e));
                Some(Response::LogsCleared(result))
            },
            |err| Response::LogsCleared(Err(err)),
        );
    }

    /// Send lifecycle command to a session provider. Only failures are reported back,
    /// successful commands are observed through session snapshots.
    pub fn control(&self, cmd: ControlCommand) {
        let control = self.control.clone();
        self.send(
            Lane::Control,
            move || {
                let result = match cmd {
                    ControlCommand::Step => control.step(),
                    ControlCommand::Resume => control.resume(),
                    ControlCommand::Stop => control.stop(),
                    ControlCommand::Restart => control.restart(),
                };
                result
                    .err()
                    .map(|e| Response::ControlFailed(cmd, render(&cmd.to_string(), e)))
            },
            |err| Response::ControlFailed(cmd, err),
        );
    }

    /// Stop all lanes. Requests in progress are completed first.
    pub fn shutdown(&mut self) {
        self.disasm.stop();
        self.callstack.stop();
        self.logs.stop();
        self.ctl.stop();
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Receiving side of a dispatcher.
pub struct Responses {
    incoming: Receiver<Response>,
}

impl Responses {
    /// Return next response if there is one.
    pub fn poll(&self) -> Option<Response> {
        self.incoming.try_recv().ok()
    }

    /// Wait for a next response no longer than `timeout`.
    pub fn wait(&self, timeout: Duration) -> Option<Response> {
        match self.incoming.recv_timeout(timeout) {
            Ok(response) => Some(response),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

pub fn dispatcher(
    engine: Arc<dyn Engine>,
    control: Arc<dyn Control>,
) -> anyhow::Result<(Dispatcher, Responses)> {
    let (tx, incoming) = channel::<Response>();
    let dispatcher = Dispatcher {
        engine,
        control,
        disasm: Worker::spawn(Lane::Disasm, tx.clone())?,
        callstack: Worker::spawn(Lane::CallStack, tx.clone())?,
        logs: Worker::spawn(Lane::Logs, tx.clone())?,
        ctl: Worker::spawn(Lane::Control, tx.clone())?,
        rejections: tx,
    };
    Ok((dispatcher, Responses { incoming }))
}
