use crate::ui::tui::app::port::UserEvent;
use crate::ui::tui::Msg;
use strum_macros::Display;
use tui_realm_stdlib::Radio;
use tuirealm::props::{Alignment, BorderType, Borders, Color};
use tuirealm::{Component, Event, MockComponent};

/// Windows of the left pane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display)]
pub enum LeftTabKind {
    #[default]
    #[strum(serialize = "Call stack")]
    CallStack,
    #[strum(serialize = "Logs")]
    Logs,
}

impl LeftTabKind {
    pub fn index(self) -> usize {
        match self {
            LeftTabKind::CallStack => 0,
            LeftTabKind::Logs => 1,
        }
    }

    pub fn next(self) -> Self {
        match self {
            LeftTabKind::CallStack => LeftTabKind::Logs,
            LeftTabKind::Logs => LeftTabKind::CallStack,
        }
    }
}

/// Tab switcher, selection is driven by a model through [`tuirealm::Attribute::Value`].
#[derive(MockComponent)]
pub struct LeftTab {
    component: Radio,
}

impl Default for LeftTab {
    fn default() -> Self {
        Self {
            component: Radio::default()
                .borders(
                    Borders::default()
                        .modifiers(BorderType::Rounded)
                        .color(Color::LightGreen),
                )
                .foreground(Color::LightGreen)
                .title("Window", Alignment::Center)
                .rewind(true)
                .choices(&["Call stack", "Logs"]),
        }
    }
}

impl Component<Msg, UserEvent> for LeftTab {
    fn on(&mut self, _: Event<UserEvent>) -> Option<Msg> {
        Some(Msg::None)
    }
}

#[cfg(test)]
mod test {
    use crate::ui::tui::components::tabs::LeftTabKind;

    #[test]
    fn test_tab_cycle() {
        let tab = LeftTabKind::default();
        assert_eq!(tab.index(), 0);
        assert_eq!(tab.next(), LeftTabKind::Logs);
        assert_eq!(tab.next().next(), tab);
        assert_eq!(LeftTabKind::Logs.to_string(), "Logs");
    }
}
