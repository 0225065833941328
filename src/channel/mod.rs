//! Data channels kept in sync with a debug session.
//!
//! Every channel (disassembly, call stack, logs) owns its own [`FetchState`] and a request
//! [`Generation`]. Channels never share state, a failure in one of them is not visible to
//! others. Channels do not perform requests by themselves: they return request descriptions
//! which are executed by a dispatcher, and receive responses back through `settle` methods.

pub mod callstack;
pub mod disasm;
pub mod logs;

/// Identity of the latest issued request of a channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// Make this generation newer, all responses for previous generations become stale.
    pub fn bump(&mut self) -> Generation {
        self.0 += 1;
        *self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd)]
pub enum NotificationKind {
    Success,
    Error,
}

/// User-visible notification (toast).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd)]
pub struct Notification {
    pub kind: NotificationKind,
    pub text: String,
}

impl Notification {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            text: text.into(),
        }
    }
}

/// Fetch result of a single channel.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

/// One of four mutually exclusive presentation states of a channel.
#[derive(Debug, PartialEq)]
pub enum ViewState<'a, T> {
    Loading,
    Error(&'a str),
    Empty,
    Populated(&'a [T]),
}

impl<T> FetchState<Vec<T>> {
    /// Request was sent.
    pub fn start(&mut self) {
        self.loading = true;
    }

    /// Successful response replaces data and clears an error.
    pub fn succeed(&mut self, data: Vec<T>) {
        self.data = Some(data);
        self.error = None;
        self.loading = false;
    }

    /// Failed response. Previous data is kept only if `keep_data` is set.
    pub fn fail(&mut self, error: String, keep_data: bool) {
        if !keep_data {
            self.data = None;
        }
        self.error = Some(error);
        self.loading = false;
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn items(&self) -> &[T] {
        self.data.as_deref().unwrap_or_default()
    }

    pub fn view(&self) -> ViewState<'_, T> {
        if let Some(ref err) = self.error {
            return ViewState::Error(err);
        }
        match self.data.as_deref() {
            Some([]) => ViewState::Empty,
            Some(items) => ViewState::Populated(items),
            None if self.loading => ViewState::Loading,
            None => ViewState::Empty,
        }
    }
}

#[cfg(test)]
mod test {
    use crate::channel::{FetchState, Generation, ViewState};

    #[test]
    fn test_generation_bump() {
        let mut gen = Generation::default();
        let first = gen.bump();
        let second = gen.bump();
        assert!(second > first);
        assert_eq!(gen, second);
    }

    #[test]
    fn test_view_states() {
        let mut state: FetchState<Vec<u32>> = FetchState::default();
        assert_eq!(state.view(), ViewState::Empty);

        state.start();
        assert_eq!(state.view(), ViewState::Loading);

        state.succeed(vec![]);
        assert_eq!(state.view(), ViewState::Empty);

        state.start();
        state.succeed(vec![1, 2]);
        assert_eq!(state.view(), ViewState::Populated(&[1, 2][..]));

        // prior data stays visible while a new request is in flight
        state.start();
        assert_eq!(state.view(), ViewState::Populated(&[1, 2][..]));

        state.fail("boom".to_string(), false);
        assert_eq!(state.view(), ViewState::Error("boom"));
        assert!(state.items().is_empty());

        state.succeed(vec![3]);
        assert_eq!(state.error, None);
        assert_eq!(state.view(), ViewState::Populated(&[3][..]));

        state.fail("again".to_string(), true);
        assert_eq!(state.items(), &[3]);
        assert_eq!(state.view(), ViewState::Error("again"));
    }
}
