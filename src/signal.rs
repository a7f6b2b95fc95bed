use std::fmt;

use tracing::warn;

/// Signal names the daemon understands, with their Linux numbers
static SIGNALS: &[(&str, i32)] = &[
    ("SIGABRT", 6),
    ("SIGALRM", 14),
    ("SIGBUS", 7),
    ("SIGCHLD", 17),
    ("SIGCLD", 17),
    ("SIGCONT", 18),
    ("SIGFPE", 8),
    ("SIGHUP", 1),
    ("SIGILL", 4),
    ("SIGINT", 2),
    ("SIGIO", 29),
    ("SIGIOT", 6),
    ("SIGKILL", 9),
    ("SIGPIPE", 13),
    ("SIGPOLL", 29),
    ("SIGPROF", 27),
    ("SIGPWR", 30),
    ("SIGQUIT", 3),
    ("SIGSEGV", 11),
    ("SIGSTKFLT", 16),
    ("SIGSTOP", 19),
    ("SIGSYS", 31),
    ("SIGTERM", 15),
    ("SIGTRAP", 5),
    ("SIGTSTP", 20),
    ("SIGTTIN", 21),
    ("SIGTTOU", 22),
    ("SIGUNUSED", 31),
    ("SIGURG", 23),
    ("SIGUSR1", 10),
    ("SIGUSR2", 12),
    ("SIGVTALRM", 26),
    ("SIGWINCH", 28),
    ("SIGXCPU", 24),
    ("SIGXFSZ", 25),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    name: &'static str,
    number: i32,
}

impl Signal {
    pub const KILL: Signal = Signal {
        name: "SIGKILL",
        number: 9,
    };

    /// Looks a signal up by mnemonic (`term`, `SIGTERM`, any case) or by number
    pub fn lookup(input: &str) -> Option<Signal> {
        let input = input.trim();

        if let Ok(number) = input.parse::<i32>() {
            return SIGNALS
                .iter()
                .find(|(_, n)| *n == number)
                .map(|&(name, number)| Signal { name, number });
        }

        let upper = input.to_ascii_uppercase();
        let wanted = if upper.starts_with("SIG") {
            upper
        } else {
            format!("SIG{}", upper)
        };

        SIGNALS
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|&(name, number)| Signal { name, number })
    }

    /// The signal to send for an optional user argument. Unknown names fall
    /// back to `SIGKILL` instead of failing.
    pub fn parse_or_default(input: Option<&str>) -> Signal {
        match input {
            None => Signal::KILL,
            Some(input) => Signal::lookup(input).unwrap_or_else(|| {
                warn!("unknown signal {:?}, sending {} instead", input, Signal::KILL);
                Signal::KILL
            }),
        }
    }

    /// Canonical name, e.g. `SIGTERM`; this is what the daemon receives
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Linux signal number
    pub fn number(&self) -> i32 {
        self.number
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
