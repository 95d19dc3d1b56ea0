use super::probe::PlatformProbe;

/// Signals that can be sent to a process. Platforms without a given signal
/// report it as unsupported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    Hangup,
    Interrupt,
    Quit,
    Illegal,
    Trap,
    Abort,
    IOT,
    Bus,
    FloatingPointException,
    Kill,
    User1,
    Segv,
    User2,
    Pipe,
    Alarm,
    Term,
    Child,
    Continue,
    Stop,
    TSTP,
    TTIN,
    TTOU,
    Urgent,
    XCPU,
    XFSZ,
    VirtualAlarm,
    Profiling,
    Winch,
    IO,
    Poll,
    Power,
    Sys,
}

impl Signal {
    pub fn name(self) -> &'static str {
        match self {
            Signal::Hangup => "SIGHUP",
            Signal::Interrupt => "SIGINT",
            Signal::Quit => "SIGQUIT",
            Signal::Illegal => "SIGILL",
            Signal::Trap => "SIGTRAP",
            Signal::Abort => "SIGABRT",
            Signal::IOT => "SIGIOT",
            Signal::Bus => "SIGBUS",
            Signal::FloatingPointException => "SIGFPE",
            Signal::Kill => "SIGKILL",
            Signal::User1 => "SIGUSR1",
            Signal::Segv => "SIGSEGV",
            Signal::User2 => "SIGUSR2",
            Signal::Pipe => "SIGPIPE",
            Signal::Alarm => "SIGALRM",
            Signal::Term => "SIGTERM",
            Signal::Child => "SIGCHLD",
            Signal::Continue => "SIGCONT",
            Signal::Stop => "SIGSTOP",
            Signal::TSTP => "SIGTSTP",
            Signal::TTIN => "SIGTTIN",
            Signal::TTOU => "SIGTTOU",
            Signal::Urgent => "SIGURG",
            Signal::XCPU => "SIGXCPU",
            Signal::XFSZ => "SIGXFSZ",
            Signal::VirtualAlarm => "SIGVTALRM",
            Signal::Profiling => "SIGPROF",
            Signal::Winch => "SIGWINCH",
            Signal::IO => "SIGIO",
            Signal::Poll => "SIGPOLL",
            Signal::Power => "SIGPWR",
            Signal::Sys => "SIGSYS",
        }
    }
}

/// What the platform did with a signal for an existing process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalOutcome {
    Delivered,
    Refused,
    /// The signal does not exist on this platform.
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KillResult {
    Success(u32, &'static str),
    Failed(u32, String),
    NotFound(u32),
}

pub fn kill_process<P: PlatformProbe + ?Sized>(
    probe: &mut P,
    pid: u32,
    signal: Signal,
) -> KillResult {
    let signal_name = signal.name();
    match probe.send_signal(pid, signal) {
        Some(SignalOutcome::Delivered) => KillResult::Success(pid, signal_name),
        Some(SignalOutcome::Refused) => {
            KillResult::Failed(pid, format!("Failed to send {signal_name} to PID {pid}"))
        }
        Some(SignalOutcome::Unsupported) => {
            // Signal not supported on this platform, fall back to a plain kill
            match probe.send_signal(pid, Signal::Kill) {
                Some(SignalOutcome::Delivered) => KillResult::Success(pid, Signal::Kill.name()),
                Some(_) => KillResult::Failed(
                    pid,
                    format!("Failed to kill PID {pid} (permission denied?)"),
                ),
                None => KillResult::NotFound(pid),
            }
        }
        None => KillResult::NotFound(pid),
    }
}
