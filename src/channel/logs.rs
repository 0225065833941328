use crate::channel::{FetchState, Generation, Notification};
use crate::engine::LogEntry;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::{Duration, Instant};
use strum_macros::{Display, EnumString};

/// Default period between two log polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Recognized log severities in ascending order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// Minimal severity filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LevelFilter {
    #[default]
    All,
    Min(LogLevel),
}

impl LevelFilter {
    /// Return true if entry with a `level` passes through the filter.
    /// Unknown levels pass only through [`LevelFilter::All`].
    pub fn matches(&self, level: &str) -> bool {
        match self {
            LevelFilter::All => true,
            LevelFilter::Min(threshold) => {
                LogLevel::from_str(level).is_ok_and(|level| level >= *threshold)
            }
        }
    }

    /// Next filter in `all -> debug -> info -> warning -> error -> all` order.
    pub fn cycle(self) -> Self {
        match self {
            LevelFilter::All => LevelFilter::Min(LogLevel::Debug),
            LevelFilter::Min(LogLevel::Debug) => LevelFilter::Min(LogLevel::Info),
            LevelFilter::Min(LogLevel::Info) => LevelFilter::Min(LogLevel::Warning),
            LevelFilter::Min(LogLevel::Warning) => LevelFilter::Min(LogLevel::Error),
            LevelFilter::Min(LogLevel::Error) => LevelFilter::All,
        }
    }
}

impl Display for LevelFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LevelFilter::All => f.write_str("all"),
            LevelFilter::Min(level) => write!(f, "{level}+"),
        }
    }
}

pub fn filter_by_level<'a>(
    entries: impl IntoIterator<Item = &'a LogEntry>,
    filter: LevelFilter,
) -> Vec<&'a LogEntry> {
    entries
        .into_iter()
        .filter(|entry| filter.matches(&entry.level))
        .collect()
}

/// Case-insensitive search over a message and a timestamp. Empty query matches everything.
pub fn filter_by_text<'a>(
    entries: impl IntoIterator<Item = &'a LogEntry>,
    query: &str,
) -> Vec<&'a LogEntry> {
    let query = query.to_lowercase();
    entries
        .into_iter()
        .filter(|entry| {
            query.is_empty()
                || entry.message.to_lowercase().contains(&query)
                || entry.timestamp.to_lowercase().contains(&query)
        })
        .collect()
}

/// Log poll request prepared by [`LogChannel`].
#[derive(Clone, Debug, PartialEq)]
pub struct LogsRequest {
    pub generation: Generation,
}

/// Replica of an engine log buffer.
///
/// While active the buffer is polled every `interval`, regardless of a session state.
/// Poll failures keep the last replica. A successful clear supersedes in-flight polls,
/// so entries that existed before the clear never come back.
pub struct LogChannel {
    active: bool,
    interval: Duration,
    last_poll: Option<Instant>,
    pending: Option<Generation>,
    generation: Generation,
    state: FetchState<Vec<LogEntry>>,
    level: LevelFilter,
    query: String,
}

impl Default for LogChannel {
    fn default() -> Self {
        Self::new(POLL_INTERVAL)
    }
}

impl LogChannel {
    pub fn new(interval: Duration) -> Self {
        Self {
            active: false,
            interval,
            last_poll: None,
            pending: None,
            generation: Generation::default(),
            state: FetchState::default(),
            level: LevelFilter::default(),
            query: String::new(),
        }
    }

    /// Start polling, first poll is requested immediately.
    pub fn activate(&mut self, now: Instant) -> Option<LogsRequest> {
        self.active = true;
        self.last_poll = None;
        self.tick(now)
    }

    /// Stop polling. Replica stays as is, a response of an in-flight poll is dropped.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.generation.bump();
        self.pending = None;
        self.state.loading = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Return a poll request if a poll is due.
    pub fn tick(&mut self, now: Instant) -> Option<LogsRequest> {
        if !self.active || self.pending.is_some() {
            return None;
        }
        if let Some(last) = self.last_poll {
            if now.saturating_duration_since(last) < self.interval {
                return None;
            }
        }

        self.last_poll = Some(now);
        let generation = self.generation.bump();
        self.pending = Some(generation);
        self.state.start();
        Some(LogsRequest { generation })
    }

    /// Apply poll response. A notification is returned only when a channel
    /// goes from healthy to failing.
    pub fn settle_poll(
        &mut self,
        generation: Generation,
        result: Result<Vec<LogEntry>, String>,
    ) -> Option<Notification> {
        if generation != self.generation {
            return None;
        }
        self.pending = None;

        match result {
            Ok(entries) => {
                self.state.succeed(entries);
                None
            }
            Err(e) => {
                let was_healthy = self.state.error.is_none();
                let notification = Notification::error(format!("Failed to fetch logs: {e}"));
                self.state.fail(e, true);
                was_healthy.then_some(notification)
            }
        }
    }

    /// Apply clear command response.
    pub fn settle_clear(&mut self, result: Result<(), String>) -> Notification {
        match result {
            Ok(()) => {
                // polls issued before the clear may carry removed entries
                self.generation.bump();
                self.pending = None;
                self.state.succeed(vec![]);
                Notification::success("Logs cleared successfully")
            }
            Err(e) => Notification::error(format!("Failed to clear logs: {e}")),
        }
    }

    pub fn state(&self) -> &FetchState<Vec<LogEntry>> {
        &self.state
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    pub fn set_level(&mut self, level: LevelFilter) {
        self.level = level;
    }

    pub fn cycle_level(&mut self) -> LevelFilter {
        self.level = self.level.cycle();
        self.level
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn total(&self) -> usize {
        self.state.items().len()
    }

    /// Filtered entries, most recent first.
    pub fn visible(&self) -> Vec<&LogEntry> {
        let mut entries = filter_by_text(
            filter_by_level(self.state.items(), self.level),
            &self.query,
        );
        entries.reverse();
        entries
    }

    pub fn summary(&self) -> String {
        format!("Showing {} of {} logs", self.visible().len(), self.total())
    }

    /// Copy for an empty list, `None` if there is something to show.
    pub fn empty_copy(&self) -> Option<&'static str> {
        if self.total() == 0 {
            if self.state.loading && self.state.data.is_none() {
                return Some("Loading logs...");
            }
            return Some("No logs available. Try using the debugger to generate some logs.");
        }
        if self.visible().is_empty() {
            return Some("No logs match the current filters.");
        }
        None
    }
}

#[cfg(test)]
mod test {
    use crate::channel::logs::{
        filter_by_level, filter_by_text, LevelFilter, LogChannel, LogLevel,
    };
    use crate::channel::NotificationKind;
    use crate::engine::LogEntry;
    use std::time::{Duration, Instant};

    fn entry(ts: &str, level: &str, message: &str) -> LogEntry {
        LogEntry {
            timestamp: ts.to_string(),
            level: level.to_string(),
            message: message.to_string(),
        }
    }

    fn sample() -> Vec<LogEntry> {
        vec![
            entry("2024-01-01T10:00:00", "debug", "engine: attach"),
            entry("2024-01-01T10:00:01", "INFO", "engine: breakpoint hit"),
            entry("2024-01-01T10:00:02", "warning", "tui: slow frame"),
            entry("2024-01-01T10:00:03", "error", "engine: read memory failed"),
            entry("2024-01-01T10:00:04", "trace", "session: event 5"),
            entry("2024-01-02T09:00:00", "Warning", "Engine: Detach"),
        ]
    }

    #[test]
    fn test_level_filter() {
        struct TestCase {
            filter: LevelFilter,
            level: &'static str,
            expected: bool,
        }
        let cases = [
            TestCase {
                filter: LevelFilter::All,
                level: "trace",
                expected: true,
            },
            TestCase {
                filter: LevelFilter::Min(LogLevel::Debug),
                level: "trace",
                expected: false,
            },
            TestCase {
                filter: LevelFilter::Min(LogLevel::Info),
                level: "INFO",
                expected: true,
            },
            TestCase {
                filter: LevelFilter::Min(LogLevel::Warning),
                level: "info",
                expected: false,
            },
            TestCase {
                filter: LevelFilter::Min(LogLevel::Warning),
                level: "Error",
                expected: true,
            },
            TestCase {
                filter: LevelFilter::Min(LogLevel::Error),
                level: "",
                expected: false,
            },
        ];

        for tc in cases {
            assert_eq!(tc.filter.matches(tc.level), tc.expected, "{}", tc.level);
        }
    }

    #[test]
    fn test_level_cycle() {
        let mut filter = LevelFilter::All;
        let mut seen = vec![];
        for _ in 0..5 {
            filter = filter.cycle();
            seen.push(filter.to_string());
        }
        assert_eq!(seen, ["debug+", "info+", "warning+", "error+", "all"]);
    }

    #[test]
    fn test_filters_commute() {
        let logs = sample();
        let queries = ["", "engine", "DETACH", "2024-01-02", "nothing"];
        let filters = [
            LevelFilter::All,
            LevelFilter::Min(LogLevel::Debug),
            LevelFilter::Min(LogLevel::Info),
            LevelFilter::Min(LogLevel::Warning),
            LevelFilter::Min(LogLevel::Error),
        ];

        for filter in filters {
            for query in queries {
                let lt = filter_by_level(filter_by_text(&logs, query), filter);
                let tl = filter_by_text(filter_by_level(&logs, filter), query);
                assert_eq!(lt, tl);
            }
        }
    }

    #[test]
    fn test_level_monotonicity() {
        let logs = sample();
        let levels = [
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warning,
            LogLevel::Error,
        ];
        for pair in levels.windows(2) {
            let lower = filter_by_level(&logs, LevelFilter::Min(pair[0]));
            let higher = filter_by_level(&logs, LevelFilter::Min(pair[1]));
            assert!(higher.iter().all(|e| lower.contains(e)));
        }
        let all = filter_by_level(&logs, LevelFilter::All);
        assert_eq!(all.len(), logs.len());
    }

    #[test]
    fn test_visible_most_recent_first() {
        let mut channel = LogChannel::default();
        let req = channel.activate(Instant::now()).unwrap();
        channel.settle_poll(
            req.generation,
            Ok(vec![
                entry("t1", "debug", "a"),
                entry("t2", "warning", "b"),
                entry("t3", "error", "c"),
            ]),
        );

        channel.set_level(LevelFilter::Min(LogLevel::Warning));
        let visible: Vec<_> = channel.visible().into_iter().map(|e| e.message.as_str()).collect();
        assert_eq!(visible, ["c", "b"]);
        assert_eq!(channel.summary(), "Showing 2 of 3 logs");

        channel.set_query("zzz");
        assert_eq!(
            channel.empty_copy(),
            Some("No logs match the current filters.")
        );
    }

    #[test]
    fn test_poll_schedule() {
        let mut channel = LogChannel::new(Duration::from_secs(2));
        let start = Instant::now();
        assert!(channel.tick(start).is_none());

        let req = channel.activate(start).unwrap();
        // no overlapping polls
        assert!(channel.tick(start + Duration::from_secs(3)).is_none());
        channel.settle_poll(req.generation, Ok(vec![]));

        assert!(channel.tick(start + Duration::from_secs(1)).is_none());
        assert!(channel.tick(start + Duration::from_secs(2)).is_some());

        channel.deactivate();
        assert!(channel.tick(start + Duration::from_secs(10)).is_none());
        assert_eq!(
            channel.empty_copy(),
            Some("No logs available. Try using the debugger to generate some logs.")
        );
    }

    #[test]
    fn test_reactivation_drops_in_flight_poll() {
        let mut channel = LogChannel::new(Duration::from_secs(2));
        let now = Instant::now();

        let stale = channel.activate(now).unwrap();
        channel.deactivate();
        assert!(!channel.is_active());
        assert!(!channel.state().loading);

        let req = channel.activate(now).unwrap();
        assert_ne!(req.generation, stale.generation);

        channel.settle_poll(stale.generation, Ok(vec![entry("t1", "info", "a")]));
        assert_eq!(channel.total(), 0);
        // a current poll is still pending
        assert!(channel.tick(now + Duration::from_secs(3)).is_none());

        channel.settle_poll(req.generation, Ok(vec![entry("t2", "info", "b")]));
        assert_eq!(channel.total(), 1);
    }

    #[test]
    fn test_poll_failure_keeps_replica() {
        let mut channel = LogChannel::new(Duration::ZERO);
        let now = Instant::now();

        let req = channel.activate(now).unwrap();
        channel.settle_poll(req.generation, Ok(vec![entry("t1", "info", "a")]));

        let req = channel.tick(now).unwrap();
        let notification = channel.settle_poll(req.generation, Err("gone".to_string()));
        assert_eq!(notification.unwrap().kind, NotificationKind::Error);
        assert_eq!(channel.total(), 1);
        assert_eq!(channel.state().error.as_deref(), Some("gone"));

        // already failing, no repeated notification
        let req = channel.tick(now).unwrap();
        assert!(channel
            .settle_poll(req.generation, Err("gone".to_string()))
            .is_none());

        let req = channel.tick(now).unwrap();
        channel.settle_poll(req.generation, Ok(vec![]));
        assert!(channel.state().error.is_none());
    }

    #[test]
    fn test_clear_discards_in_flight_poll() {
        let mut channel = LogChannel::new(Duration::ZERO);
        let now = Instant::now();

        let req = channel.activate(now).unwrap();
        channel.settle_poll(req.generation, Ok(vec![entry("t1", "info", "a")]));

        let in_flight = channel.tick(now).unwrap();
        let notification = channel.settle_clear(Ok(()));
        assert_eq!(notification.kind, NotificationKind::Success);
        assert_eq!(notification.text, "Logs cleared successfully");
        assert_eq!(channel.total(), 0);

        channel.settle_poll(in_flight.generation, Ok(vec![entry("t1", "info", "a")]));
        assert_eq!(channel.total(), 0);

        let req = channel.tick(now).unwrap();
        channel.settle_poll(req.generation, Ok(vec![entry("t2", "info", "b")]));
        assert_eq!(channel.total(), 1);

        let notification = channel.settle_clear(Err("denied".to_string()));
        assert_eq!(notification.text, "Failed to clear logs: denied");
        assert_eq!(channel.total(), 1);
    }
}
