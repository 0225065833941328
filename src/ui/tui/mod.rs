use crate::channel::Notification;
use crate::session::SessionWatcher;
use crate::ui::tui::app::Model;
use crate::ui::tui::components::status;
use crate::ui::tui::proto::{Dispatcher, Responses};
use log::error;
use std::sync::Arc;
use tuirealm::{Attribute, PollStrategy};

mod app;
pub mod components;
pub mod config;
pub mod proto;

pub use crate::ui::tui::app::port::UserEvent;

// Component ids for application
#[derive(Debug, Eq, PartialEq, Clone, Hash)]
pub enum Id {
    LeftTabs,

    CallStack,
    Logs,
    Asm,

    Status,
    GlobalControl,

    Input,
}

#[derive(Debug, PartialEq)]
pub enum Msg {
    None,
    AppClose,
    SwitchLeftTab,
    LeftWindowInFocus,
    AsmInFocus,
    /// Move disassembly window to an address and focus it.
    DisasmGoto(u64),
    /// Innermost frame of a freshly fetched call stack.
    InnermostFrame(u64),
    AddressInput,
    SearchInput,
    Input(String),
    InputCancel,
    Notify(Notification),
}

pub struct TuiApplication {
    dispatcher: Dispatcher,
    responses: Responses,
    session: SessionWatcher,
    address: Option<u64>,
}

impl TuiApplication {
    pub fn new(dispatcher: Dispatcher, responses: Responses, session: SessionWatcher) -> Self {
        Self {
            dispatcher,
            responses,
            session,
            address: None,
        }
    }

    /// Initial disassembly address, a session program counter is used if not set.
    pub fn with_address(self, address: Option<u64>) -> Self {
        Self { address, ..self }
    }

    pub fn run(self) -> anyhow::Result<()> {
        // disable default logger
        crate::log::disable();
        let result = self.run_inner();
        crate::log::enable();

        if let Err(ref e) = result {
            error!(target: "tui", "tui error: {e:#}");
        }
        result
    }

    fn run_inner(self) -> anyhow::Result<()> {
        let dispatcher = Arc::new(self.dispatcher);
        let mut model = Model::new(
            dispatcher.clone(),
            self.responses,
            self.session,
            self.address,
        )?;
        model.terminal.enter_alternate_screen()?;
        model.terminal.enable_raw_mode()?;

        while !model.quit {
            match model.app.tick(PollStrategy::Once) {
                Err(err) => {
                    let notification = Notification::error(format!("TUI error: {err}"));
                    model.app.attr(
                        &Id::Status,
                        Attribute::Custom(status::ATTR_NOTIFICATION),
                        status::notification_attr(&notification),
                    )?;
                    model.redraw = true;
                }
                Ok(messages) if !messages.is_empty() => {
                    // NOTE: redraw if at least one msg has been processed
                    model.redraw = true;
                    for msg in messages.into_iter() {
                        let mut msg = Some(msg);
                        while msg.is_some() {
                            msg = match model.update(msg) {
                                Ok(msg) => msg,
                                Err(e) => Some(Msg::Notify(Notification::error(e.to_string()))),
                            };
                        }
                    }
                }
                _ => {}
            }
            // Redraw
            if model.redraw {
                model.view();
                model.redraw = false;
            }
        }

        model.terminal.leave_alternate_screen()?;
        model.terminal.disable_raw_mode()?;
        model.terminal.clear_screen()?;

        // components hold dispatcher references, drop them before lanes are stopped
        drop(model);
        if let Ok(mut dispatcher) = Arc::try_unwrap(dispatcher) {
            dispatcher.shutdown();
        }

        Ok(())
    }
}
