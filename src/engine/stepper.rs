//! Local engine over a static executable image.
//!
//! Execution is simulated: the program counter walks decoded instructions, direct calls and
//! returns maintain a shadow call stack. The engine is also a session provider - every stop
//! is published into a [`SessionFeed`] with an incremented event counter.

use crate::engine::image::{Disassembler, Image, RawInstruction};
use crate::engine::{format_address, CallStackFrame, Control, Engine, Error, Instruction, LogEntry};
use crate::log::LogBuffer;
use crate::session::{Session, SessionFeed, SessionId, SessionStatus};
use log::{debug, info, warn};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

const STACK_TOP: u64 = 0x7FFF_FFFF_E000;
/// Max number of instructions executed by a single `resume` command.
const RUN_LIMIT: usize = 0x1000;

struct ShadowFrame {
    return_address: u64,
    /// Stack pointer value after return address was pushed.
    frame_pointer: u64,
}

enum StepOutcome {
    Continue { entered_call: bool, returned: bool },
    Finished,
    LeftImage(u64),
}

struct Execution {
    session: Option<SessionId>,
    pc: u64,
    sp: u64,
    stack: Vec<ShadowFrame>,
}

pub struct ImageEngine {
    image: Image,
    disassembler: Disassembler,
    feed: SessionFeed,
    logs: LogBuffer,
    execution: Mutex<Execution>,
    run_delay: Duration,
}

impl ImageEngine {
    pub fn new(image: Image, feed: SessionFeed, logs: LogBuffer) -> Self {
        let entry = image.entry();
        Self {
            image,
            disassembler: Disassembler::new(),
            feed,
            logs,
            execution: Mutex::new(Execution {
                session: None,
                pc: entry,
                sp: STACK_TOP,
                stack: vec![],
            }),
            run_delay: Duration::from_millis(300),
        }
    }

    /// Set how long a session stays in the running state while executing `resume`.
    pub fn with_run_delay(self, run_delay: Duration) -> Self {
        Self { run_delay, ..self }
    }

    fn lock(&self) -> MutexGuard<'_, Execution> {
        self.execution.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a new paused session at the image entry point.
    pub fn start(&self) -> SessionId {
        let mut exec = self.lock();
        let id = SessionId::new();
        exec.session = Some(id);
        exec.pc = self.image.entry();
        exec.sp = STACK_TOP;
        exec.stack.clear();
        self.feed.publish(Some(Session::new(id)));
        info!(target: "engine", "session {id} started at {}", format_address(exec.pc));
        id
    }

    /// Current program counter.
    pub fn pc(&self) -> u64 {
        self.lock().pc
    }

    fn ensure_session(&self, exec: &Execution, session: SessionId) -> Result<(), Error> {
        match exec.session {
            None => Err(Error::NoSession),
            Some(id) if id != session => Err(Error::SessionMismatch(session)),
            Some(_) => Ok(()),
        }
    }

    fn ensure_paused(&self) -> Result<(), Error> {
        match self.feed.current() {
            None => Err(Error::NoSession),
            Some(s) if s.status == SessionStatus::Finished => Err(Error::ProgramFinished),
            Some(s) if !s.is_paused() => Err(Error::NotPaused),
            Some(_) => Ok(()),
        }
    }

    fn decode_at(&self, addr: u64) -> Result<RawInstruction, Error> {
        self.disassembler
            .decode(&self.image, addr, 1)?
            .into_iter()
            .next()
            .ok_or(Error::InvalidInstruction(addr))
    }

    /// Execute single instruction.
    fn execute(&self, exec: &mut Execution) -> Result<StepOutcome, Error> {
        let instr = self.decode_at(exec.pc)?;
        let next = instr.next_address();

        let mut entered_call = false;
        let mut returned = false;
        if instr.is_call() {
            match instr.direct_target() {
                Some(target) => {
                    exec.sp -= 8;
                    exec.stack.push(ShadowFrame {
                        return_address: next,
                        frame_pointer: exec.sp,
                    });
                    exec.pc = target;
                    entered_call = true;
                }
                // indirect calls are stepped over
                None => exec.pc = next,
            }
        } else if instr.is_ret() {
            let Some(frame) = exec.stack.pop() else {
                return Ok(StepOutcome::Finished);
            };
            exec.pc = frame.return_address;
            exec.sp += 8;
            returned = true;
        } else if instr.is_jmp() {
            exec.pc = instr.direct_target().unwrap_or(next);
        } else {
            exec.pc = next;
        }

        if !self.image.contains(exec.pc) {
            return Ok(StepOutcome::LeftImage(exec.pc));
        }

        Ok(StepOutcome::Continue {
            entered_call,
            returned,
        })
    }

    /// Publish stop after execution.
    fn publish_stop(&self, exec: &Execution, outcome: &StepOutcome) {
        match outcome {
            StepOutcome::Continue { .. } => {
                self.feed.update(|s| {
                    s.status = SessionStatus::Paused;
                    s.current_event += 1;
                });
                debug!(target: "engine", "stopped at {}", format_address(exec.pc));
            }
            StepOutcome::Finished => {
                self.feed.update(|s| {
                    s.status = SessionStatus::Finished;
                    s.current_event += 1;
                });
                info!(target: "engine", "program finished");
            }
            StepOutcome::LeftImage(addr) => {
                self.feed.update(|s| {
                    s.status = SessionStatus::Stopped;
                    s.current_event += 1;
                });
                warn!(target: "engine", "execution left the image at {}", format_address(*addr));
            }
        }
    }
}

impl Engine for ImageEngine {
    fn get_disassembly(
        &self,
        session: SessionId,
        address: u64,
        count: usize,
    ) -> Result<Vec<Instruction>, Error> {
        self.ensure_session(&self.lock(), session)?;
        debug!(target: "engine", "disassemble {count} instructions at {}", format_address(address));
        self.disassembler.window(&self.image, address, count)
    }

    fn get_session_callstack(&self, session: SessionId) -> Result<Vec<CallStackFrame>, Error> {
        let exec = self.lock();
        self.ensure_session(&exec, session)?;
        self.ensure_paused()?;

        let innermost = CallStackFrame {
            frame_number: 0,
            instruction_pointer: format_address(exec.pc),
            stack_pointer: format_address(exec.sp),
            frame_pointer: format_address(
                exec.stack
                    .last()
                    .map(|f| f.frame_pointer)
                    .unwrap_or(STACK_TOP),
            ),
            symbol_info: self.image.symbolize(exec.pc),
        };

        let outer = exec.stack.iter().enumerate().rev().map(|(idx, frame)| {
            let caller_fp = idx
                .checked_sub(1)
                .map(|i| exec.stack[i].frame_pointer)
                .unwrap_or(STACK_TOP);
            (frame, caller_fp)
        });

        let frames = std::iter::once(innermost)
            .chain(outer.enumerate().map(|(num, (frame, caller_fp))| CallStackFrame {
                frame_number: num as u32 + 1,
                instruction_pointer: format_address(frame.return_address),
                stack_pointer: format_address(frame.frame_pointer + 8),
                frame_pointer: format_address(caller_fp),
                symbol_info: self.image.symbolize(frame.return_address),
            }))
            .collect();

        Ok(frames)
    }

    fn get_logs(&self) -> Result<Vec<LogEntry>, Error> {
        Ok(self
            .logs
            .snapshot()
            .into_iter()
            .map(|line| LogEntry {
                level: line.level_name().to_string(),
                timestamp: line.time,
                message: format!("{}: {}", line.target, line.body),
            })
            .collect())
    }

    fn clear_logs(&self) -> Result<(), Error> {
        self.logs.clear();
        Ok(())
    }
}

impl Control for ImageEngine {
    fn step(&self) -> Result<(), Error> {
        let mut exec = self.lock();
        self.ensure_paused()?;
        let outcome = self.execute(&mut exec)?;
        self.publish_stop(&exec, &outcome);
        Ok(())
    }

    /// Run until the next function call or return.
    fn resume(&self) -> Result<(), Error> {
        self.ensure_paused()?;
        self.feed.update(|s| s.status = SessionStatus::Running);
        info!(target: "engine", "running");
        thread::sleep(self.run_delay);

        let mut exec = self.lock();
        let mut outcome = StepOutcome::Continue {
            entered_call: false,
            returned: false,
        };
        for _ in 0..RUN_LIMIT {
            outcome = match self.execute(&mut exec) {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.feed.update(|s| {
                        s.status = SessionStatus::Error(e.to_string());
                        s.current_event += 1;
                    });
                    return Err(e);
                }
            };
            match outcome {
                StepOutcome::Continue {
                    entered_call: false,
                    returned: false,
                } => continue,
                _ => break,
            }
        }

        self.publish_stop(&exec, &outcome);
        Ok(())
    }

    fn stop(&self) -> Result<(), Error> {
        let exec = self.lock();
        if exec.session.is_none() {
            return Err(Error::NoSession);
        }
        self.feed.update(|s| {
            s.status = SessionStatus::Stopped;
            s.current_event += 1;
        });
        info!(target: "engine", "session stopped at {}", format_address(exec.pc));
        Ok(())
    }

    fn restart(&self) -> Result<(), Error> {
        self.start();
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::engine::image::test::sample_image;
    use crate::engine::stepper::ImageEngine;
    use crate::engine::{Control, Engine, Error};
    use crate::log::LogBuffer;
    use crate::session::{SessionFeed, SessionId, SessionStatus};
    use std::time::Duration;

    fn engine() -> (ImageEngine, SessionFeed) {
        let feed = SessionFeed::default();
        let engine = ImageEngine::new(sample_image(), feed.clone(), LogBuffer::default())
            .with_run_delay(Duration::ZERO);
        (engine, feed)
    }

    #[test]
    fn test_step_through_call_and_return() {
        let (engine, feed) = engine();
        let id = engine.start();

        let stack = engine.get_session_callstack(id).unwrap();
        assert_eq!(stack.len(), 1);
        assert_eq!(stack[0].instruction_pointer, "0x1000");
        assert_eq!(stack[0].symbol_info.as_deref(), Some("_start"));

        engine.step().unwrap();
        assert_eq!(engine.pc(), 0x100a);
        assert_eq!(feed.current().unwrap().current_event, 1);

        let stack = engine.get_session_callstack(id).unwrap();
        assert_eq!(stack.len(), 2);
        assert_eq!(stack[0].symbol_info.as_deref(), Some("func"));
        assert_eq!(stack[1].frame_number, 1);
        assert_eq!(stack[1].instruction_pointer, "0x1005");
        assert_eq!(stack[1].symbol_info.as_deref(), Some("_start+0x5"));

        engine.step().unwrap();
        engine.step().unwrap();
        assert_eq!(engine.pc(), 0x1005);
        assert_eq!(engine.get_session_callstack(id).unwrap().len(), 1);

        engine.step().unwrap();
        engine.step().unwrap();
        let session = feed.current().unwrap();
        assert_eq!(session.status, SessionStatus::Finished);
        assert!(matches!(engine.step(), Err(Error::ProgramFinished)));
    }

    #[test]
    fn test_resume_runs_until_call() {
        let (engine, feed) = engine();
        engine.start();

        engine.resume().unwrap();
        assert_eq!(engine.pc(), 0x100a);
        let session = feed.current().unwrap();
        assert!(session.is_paused());
        assert_eq!(session.current_event, 1);

        // return from `func`
        engine.resume().unwrap();
        assert_eq!(engine.pc(), 0x1005);
        assert_eq!(feed.current().unwrap().current_event, 2);
    }

    #[test]
    fn test_callstack_requires_pause() {
        let (engine, _) = engine();
        let id = engine.start();
        engine.stop().unwrap();

        assert!(matches!(
            engine.get_session_callstack(id),
            Err(Error::NotPaused)
        ));
    }

    #[test]
    fn test_foreign_session_rejected() {
        let (engine, _) = engine();
        let id = engine.start();
        engine.restart().unwrap();

        assert!(matches!(
            engine.get_disassembly(id, 0x1000, 1),
            Err(Error::SessionMismatch(_))
        ));
        assert!(matches!(
            engine.get_disassembly(SessionId::new(), 0x1000, 1),
            Err(Error::SessionMismatch(_))
        ));
    }
}
