pub mod channel;
pub mod engine;
pub mod log;
pub mod session;
pub mod ui;
