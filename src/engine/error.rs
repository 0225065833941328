use crate::session::SessionId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- generic errors --------------------------------------------
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("{0}")]
    Message(String),

    // --------------------------------- image errors ----------------------------------------------
    #[error("object file parsing error: {0}")]
    ObjParsing(#[from] object::Error),
    #[error("no executable code in image")]
    NoCode,
    #[error("no executable section at address {0:#X}")]
    UnknownAddress(u64),

    // --------------------------------- disasm ----------------------------------------------------
    #[error("install disassembler: {0}")]
    DisAsmInit(capstone::Error),
    #[error("instructions disassembly error: {0}")]
    DisAsm(capstone::Error),
    #[error("invalid instruction at {0:#X}")]
    InvalidInstruction(u64),

    // --------------------------------- session errors --------------------------------------------
    #[error("no active session")]
    NoSession,
    #[error("unknown session {0}")]
    SessionMismatch(SessionId),
    #[error("session must be paused")]
    NotPaused,
    #[error("program finished")]
    ProgramFinished,
}

impl Error {
    /// Return a hint to an interface - continue after error or stop whole process.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::IO(_) => false,
            Error::Message(_) => false,
            Error::UnknownAddress(_) => false,
            Error::DisAsm(_) => false,
            Error::InvalidInstruction(_) => false,
            Error::NoSession => false,
            Error::SessionMismatch(_) => false,
            Error::NotPaused => false,
            Error::ProgramFinished => false,

            // currently fatal errors
            Error::ObjParsing(_) => true,
            Error::NoCode => true,
            Error::DisAsmInit(_) => true,
        }
    }
}

#[macro_export]
macro_rules! _error {
    ($log_fn: path, $res: expr) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "panescope", "{:#}", e);
                None
            }
        }
    };
    ($log_fn: path, $res: expr, $msg: tt) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "panescope", concat!($msg, " {:#}"), e);
                None
            }
        }
    };
}

/// Transforms `Result` into `Option` and logs an error if it occurs.
#[macro_export]
macro_rules! weak_error {
    ($res: expr) => {
        $crate::_error!(log::warn, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::warn, $res, $msg)
    };
}

/// Transforms `Result` into `Option` and put error into debug logs if it occurs.
#[macro_export]
macro_rules! muted_error {
    ($res: expr) => {
        $crate::_error!(log::debug, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::debug, $res, $msg)
    };
}
