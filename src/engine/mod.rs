//! Debugger engine contract.
//!
//! Panes reach the engine only through [`Engine`] (data requests) and [`Control`]
//! (session lifecycle commands). All operations are fallible, errors are rendered as text
//! at the pane boundary.

mod error;
pub mod image;
pub mod stepper;

pub use error::Error;

use crate::session::SessionId;

/// Default number of instructions in a single disassembly window.
pub const DISASM_WINDOW: usize = 0x100;

/// Single decoded instruction.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd)]
pub struct Instruction {
    pub address: String,
    /// Symbol with offset (`main+0x1A`) or empty string if unknown.
    pub symbol: String,
    /// Hex encoded instruction bytes.
    pub bytes: String,
    pub mnemonic: String,
    pub op_str: String,
}

/// Call stack frame, frame number 0 is the innermost one.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd)]
pub struct CallStackFrame {
    pub frame_number: u32,
    pub instruction_pointer: String,
    pub stack_pointer: String,
    pub frame_pointer: String,
    pub symbol_info: Option<String>,
}

impl CallStackFrame {
    /// Parse instruction pointer back into an address.
    pub fn ip(&self) -> Option<u64> {
        parse_address(&self.instruction_pointer)
    }
}

/// Single engine log record.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd)]
pub struct LogEntry {
    pub timestamp: String,
    /// Level name, recognized names are `debug`, `info`, `warning` and `error`.
    pub level: String,
    pub message: String,
}

/// Data requests served by the engine.
pub trait Engine: Send + Sync {
    /// Return `count` instructions starting at `address`.
    fn get_disassembly(
        &self,
        session: SessionId,
        address: u64,
        count: usize,
    ) -> Result<Vec<Instruction>, Error>;

    /// Return call stack of a paused session.
    fn get_session_callstack(&self, session: SessionId) -> Result<Vec<CallStackFrame>, Error>;

    /// Return the whole log buffer.
    fn get_logs(&self) -> Result<Vec<LogEntry>, Error>;

    fn clear_logs(&self) -> Result<(), Error>;
}

/// Session lifecycle commands.
pub trait Control: Send + Sync {
    fn step(&self) -> Result<(), Error>;

    fn resume(&self) -> Result<(), Error>;

    fn stop(&self) -> Result<(), Error>;

    fn restart(&self) -> Result<(), Error>;
}

/// Format address in a way that is used by the engine (`0x401000`).
pub fn format_address(addr: u64) -> String {
    format!("{addr:#X}").replacen("0X", "0x", 1)
}

/// Parse address in hex (with or without `0x` prefix) representation.
pub fn parse_address(s: &str) -> Option<u64> {
    let s = s.trim();
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u64::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod test {
    use crate::engine::{format_address, parse_address};

    #[test]
    fn test_address_repr() {
        struct TestCase {
            input: &'static str,
            expected: Option<u64>,
        }

        let cases = [
            TestCase {
                input: "0x401000",
                expected: Some(0x401000),
            },
            TestCase {
                input: "401ABC",
                expected: Some(0x401ABC),
            },
            TestCase {
                input: " 0X10 ",
                expected: Some(0x10),
            },
            TestCase {
                input: "main",
                expected: None,
            },
            TestCase {
                input: "",
                expected: None,
            },
        ];

        for tc in cases {
            assert_eq!(parse_address(tc.input), tc.expected, "input: {}", tc.input);
        }

        assert_eq!(format_address(0x401ABC), "0x401ABC");
    }
}
