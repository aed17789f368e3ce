//! Detached process handle
//!
//! A [`ProcessHandle`] owns one OS process from launch until it is dropped.
//! Background tasks own the child's pipes and the process object itself; they
//! report chunks and lifecycle notifications over a single ordered channel.
//! Every public operation first drains that channel under the handle's lock,
//! so state mutations are applied one at a time and readers always see a
//! consistent snapshot.

use std::fmt;
use std::process::ExitStatus;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, trace, warn};

use crate::{
    capture::{forward_stream, ProcessEvent, StreamKind, TextBuffer},
    config::{SpawnConfig, SpawnOverrides},
    error::ProcessError,
    probe::probe_pid,
    terminator::{default_terminator, PlatformTerminator},
};

/// Observed liveness of a handle's process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Running,
    NotRunning,
}

impl ProcessStatus {
    pub fn is_running(self) -> bool {
        self == ProcessStatus::Running
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessStatus::Running => "Running",
            ProcessStatus::NotRunning => "Not Running",
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a [`ProcessHandle::kill_process`] request
#[derive(Debug)]
pub enum KillOutcome {
    /// The handle never obtained a process
    NoProcess,
    /// The process was already gone; no termination request was issued
    AlreadyExited,
    /// The termination request was delivered
    Terminated,
    /// The termination request failed; the handle still reports not running
    Failed(ProcessError),
}

impl KillOutcome {
    pub fn is_terminated(&self) -> bool {
        matches!(self, KillOutcome::Terminated)
    }
}

/// Mutable state, only touched while holding the handle's lock
#[derive(Debug, Default)]
struct HandleState {
    running: bool,
    output: TextBuffer,
    last_error: Option<Arc<ProcessError>>,
    exit_status: Option<ExitStatus>,
    events: Option<UnboundedReceiver<ProcessEvent>>,
    /// Held open so a piped stdin does not hit EOF
    _stdin: Option<ChildStdin>,
}

impl HandleState {
    fn stop(&mut self) {
        self.running = false;
    }

    fn fail(&mut self, error: ProcessError) {
        self.stop();
        self.last_error = Some(Arc::new(error));
    }

    /// Apply every notification received so far, in arrival order
    fn drain(&mut self, pid: Option<u32>) {
        while let Some(events) = self.events.as_mut() {
            match events.try_recv() {
                Ok(event) => self.apply(pid, event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.events = None;
                    self.output.finish();
                }
            }
        }
    }

    fn apply(&mut self, pid: Option<u32>, event: ProcessEvent) {
        match event {
            ProcessEvent::Output { stream, data } => {
                trace!(pid = ?pid, %stream, bytes = data.len(), "Captured output");
                self.output.push(stream, &data);
            }
            ProcessEvent::Exited(status) => {
                info!(pid = ?pid, code = ?status.code(), "Process exited");
                self.output.finish();
                self.exit_status = Some(status);
                self.stop();
            }
            ProcessEvent::Failed(e) => {
                warn!(pid = ?pid, error = %e, "Process reported an error");
                self.fail(ProcessError::Runtime(e));
            }
        }
    }
}

/// Handle to one launched, possibly detached, child process
///
/// Construction never fails: spawn errors leave the handle in an inspectable
/// "not running" state with [`ProcessHandle::error`] set.
pub struct ProcessHandle {
    command: String,
    args: Vec<String>,
    config: SpawnConfig,
    pid: Option<u32>,
    terminator: Arc<dyn PlatformTerminator>,
    state: Mutex<HandleState>,
    tasks: Vec<AbortHandle>,
}

impl ProcessHandle {
    /// Launch `command` with the platform's default terminator
    ///
    /// Must be called from within a tokio runtime; otherwise the handle
    /// records [`ProcessError::NoRuntime`].
    pub fn spawn<I, S>(command: impl Into<String>, args: I, overrides: SpawnOverrides) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::spawn_with(command, args, overrides, default_terminator())
    }

    /// Launch `command` using `terminator` for [`ProcessHandle::kill_process`]
    pub fn spawn_with<I, S>(
        command: impl Into<String>,
        args: I,
        overrides: SpawnOverrides,
        terminator: Arc<dyn PlatformTerminator>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut handle = Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            config: SpawnConfig::from_overrides(&overrides),
            pid: None,
            terminator,
            state: Mutex::new(HandleState::default()),
            tasks: Vec::new(),
        };
        handle.start();
        handle
    }

    fn start(&mut self) {
        debug!(command = %self.command, args = ?self.args, "Spawning process");

        if self.command.trim().is_empty() {
            self.fail_start(ProcessError::InvalidConfig(
                "command must not be empty".to_string(),
            ));
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                self.fail_start(ProcessError::NoRuntime);
                return;
            }
        };

        let mut child = match self.build_command().spawn() {
            Ok(child) => child,
            Err(e) => {
                self.fail_start(ProcessError::SpawnFailed(e));
                return;
            }
        };

        let Some(pid) = child.id() else {
            self.fail_start(ProcessError::MissingPid);
            return;
        };
        self.pid = Some(pid);
        info!(pid = %pid, command = %self.command, "Process spawned");

        let (tx, rx) = mpsc::unbounded_channel();
        let mut readers = Vec::new();
        if self.config.captures_output() {
            if let Some(stdout) = child.stdout.take() {
                readers.push(runtime.spawn(forward_stream(pid, StreamKind::Stdout, stdout, tx.clone())));
            }
            if let Some(stderr) = child.stderr.take() {
                readers.push(runtime.spawn(forward_stream(pid, StreamKind::Stderr, stderr, tx.clone())));
            }
        } else {
            debug!(pid = %pid, "Output not captured");
        }
        let stdin = child.stdin.take();

        self.tasks = readers.iter().map(JoinHandle::abort_handle).collect();
        let supervisor = runtime.spawn(supervise(pid, child, readers, tx));
        self.tasks.push(supervisor.abort_handle());

        let state = self.state.get_mut();
        state.running = true;
        state.events = Some(rx);
        state._stdin = stdin;

        if self.config.detached {
            debug!(pid = %pid, "Process detached from parent lifetime");
        }
    }

    fn fail_start(&mut self, error: ProcessError) {
        warn!(command = %self.command, error = %error, "Failed to start process");
        self.state.get_mut().fail(error);
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .envs(&self.config.env)
            .stdin(self.config.stdin.to_stdio())
            .stdout(self.config.stdout.to_stdio())
            .stderr(self.config.stderr.to_stdio())
            .kill_on_drop(!self.config.detached);

        if let Some(ref dir) = self.config.working_dir {
            cmd.current_dir(dir);
        }

        #[cfg(unix)]
        if self.config.detached {
            // SAFETY: setsid is async-signal-safe and touches no parent state
            unsafe {
                cmd.pre_exec(|| {
                    nix::unistd::setsid()
                        .map(|_| ())
                        .map_err(std::io::Error::from)
                });
            }
        }

        #[cfg(windows)]
        {
            const DETACHED_PROCESS: u32 = 0x0000_0008;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;

            let flags = if self.config.detached {
                DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP
            } else if self.config.hide_window {
                CREATE_NO_WINDOW
            } else {
                0
            };
            cmd.creation_flags(flags);
        }

        cmd
    }

    /// Executable that was launched
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Arguments passed to the executable
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Resolved spawn configuration
    pub fn config(&self) -> &SpawnConfig {
        &self.config
    }

    /// OS process ID, set iff the process was created
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Process group ID; the child leads its own group when detached
    #[cfg(unix)]
    pub fn process_group(&self) -> Option<u32> {
        self.pid.filter(|_| self.config.detached)
    }

    /// Current liveness
    ///
    /// Never trusts the last exit notification alone: while the handle
    /// believes the process is running, the OS is probed and a failed probe
    /// flips the handle to not running for good.
    pub fn status(&self) -> ProcessStatus {
        let mut state = self.state.lock();
        state.drain(self.pid);

        let Some(pid) = self.pid else {
            return ProcessStatus::NotRunning;
        };
        if !state.running {
            return ProcessStatus::NotRunning;
        }

        match probe_pid(pid) {
            Ok(true) => ProcessStatus::Running,
            Ok(false) => {
                debug!(pid = %pid, "Liveness probe found process gone");
                state.stop();
                ProcessStatus::NotRunning
            }
            Err(e) => {
                warn!(pid = %pid, error = %e, "Liveness probe failed");
                state.stop();
                ProcessStatus::NotRunning
            }
        }
    }

    /// Everything captured from stdout and stderr so far
    pub fn output(&self) -> String {
        let mut state = self.state.lock();
        state.drain(self.pid);
        state.output.as_str().to_string()
    }

    /// Output captured after the first `offset` bytes
    ///
    /// Pass the byte length of text already consumed to follow a running
    /// process without copying the whole buffer on every poll.
    pub fn output_since(&self, offset: usize) -> String {
        let mut state = self.state.lock();
        state.drain(self.pid);
        state.output.since(offset).to_string()
    }

    /// Most recent spawn or runtime error
    pub fn error(&self) -> Option<Arc<ProcessError>> {
        let mut state = self.state.lock();
        state.drain(self.pid);
        state.last_error.clone()
    }

    /// Exit status, once the process has been reaped and its pipes closed
    pub fn exit_status(&self) -> Option<ExitStatus> {
        let mut state = self.state.lock();
        state.drain(self.pid);
        state.exit_status
    }

    /// Terminate the process and its descendants
    ///
    /// Best effort: does not wait for the tree to die and never panics.
    /// The handle reports not running afterwards regardless of the outcome;
    /// a process that already exited is left alone.
    pub fn kill_process(&self) -> KillOutcome {
        let Some(pid) = self.pid else {
            debug!(command = %self.command, "No process to kill or process ID is not available");
            return KillOutcome::NoProcess;
        };

        if !self.status().is_running() {
            debug!(pid = %pid, "Process already exited, skipping kill");
            return KillOutcome::AlreadyExited;
        }

        info!(pid = %pid, "Attempting to kill process tree");
        let result = self.terminator.terminate_tree(pid);
        self.state.lock().stop();

        match result {
            Ok(()) => {
                info!(pid = %pid, "Process tree killed");
                KillOutcome::Terminated
            }
            Err(e) => {
                warn!(pid = %pid, error = %e, "Failed to kill process tree");
                KillOutcome::Failed(e)
            }
        }
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("command", &self.command)
            .field("args", &self.args)
            .field("pid", &self.pid)
            .field("detached", &self.config.detached)
            .finish_non_exhaustive()
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        // Detached children outlive the handle; others are killed on drop
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Reap the child, wait for its pipes to close, then report the exit
async fn supervise(
    pid: u32,
    mut child: Child,
    readers: Vec<JoinHandle<()>>,
    tx: UnboundedSender<ProcessEvent>,
) {
    let status = child.wait().await;
    debug!(pid = %pid, "Process reaped, waiting for output to close");

    for reader in readers {
        let _ = reader.await;
    }

    let event = match status {
        Ok(status) => ProcessEvent::Exited(status),
        Err(e) => ProcessEvent::Failed(e),
    };
    let _ = tx.send(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct RecordingTerminator {
        calls: Mutex<Vec<u32>>,
    }

    impl PlatformTerminator for RecordingTerminator {
        fn terminate_tree(&self, pid: u32) -> crate::Result<()> {
            self.calls.lock().push(pid);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct FailingTerminator;

    impl PlatformTerminator for FailingTerminator {
        fn terminate_tree(&self, pid: u32) -> crate::Result<()> {
            Err(ProcessError::KillFailed {
                pid,
                reason: "permission denied".to_string(),
            })
        }
    }

    async fn wait_until(handle: &ProcessHandle, done: impl Fn(&ProcessHandle) -> bool) {
        for _ in 0..250 {
            if done(handle) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("condition not reached for {handle:?}");
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ProcessStatus::Running.to_string(), "Running");
        assert_eq!(ProcessStatus::NotRunning.to_string(), "Not Running");
    }

    #[test]
    fn test_spawn_without_runtime() {
        let handle = ProcessHandle::spawn("echo", ["hi"], SpawnOverrides::new());
        assert_eq!(handle.pid(), None);
        assert_eq!(handle.status(), ProcessStatus::NotRunning);
        assert!(matches!(
            handle.error().as_deref(),
            Some(ProcessError::NoRuntime)
        ));
    }

    #[tokio::test]
    async fn test_empty_command_is_invalid() {
        let handle = ProcessHandle::spawn("  ", Vec::<String>::new(), SpawnOverrides::new());
        assert_eq!(handle.status(), ProcessStatus::NotRunning);
        assert!(matches!(
            handle.error().as_deref(),
            Some(ProcessError::InvalidConfig(_))
        ));
        assert!(matches!(handle.kill_process(), KillOutcome::NoProcess));
    }

    #[cfg(unix)]
    #[test]
    fn test_drain_applies_events_in_order() {
        use std::os::unix::process::ExitStatusExt;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = HandleState {
            running: true,
            events: Some(rx),
            ..Default::default()
        };

        tx.send(ProcessEvent::Output { stream: StreamKind::Stdout, data: b"out ".to_vec() }).unwrap();
        tx.send(ProcessEvent::Output { stream: StreamKind::Stderr, data: b"err".to_vec() }).unwrap();
        state.drain(Some(1));
        assert_eq!(state.output.as_str(), "out err");
        assert!(state.running);

        tx.send(ProcessEvent::Exited(ExitStatus::from_raw(0))).unwrap();
        drop(tx);
        state.drain(Some(1));
        assert!(!state.running);
        assert_eq!(state.exit_status.and_then(|s| s.code()), Some(0));
        assert!(state.events.is_none());
    }

    #[test]
    fn test_drain_keeps_streams_decoding_separately() {
        let euro = "€".as_bytes();
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = HandleState {
            running: true,
            events: Some(rx),
            ..Default::default()
        };

        tx.send(ProcessEvent::Output { stream: StreamKind::Stdout, data: euro[..2].to_vec() }).unwrap();
        tx.send(ProcessEvent::Output { stream: StreamKind::Stderr, data: b"E".to_vec() }).unwrap();
        tx.send(ProcessEvent::Output { stream: StreamKind::Stdout, data: euro[2..].to_vec() }).unwrap();
        state.drain(Some(1));

        assert!(state.output.as_str().contains('€'));
        assert!(!state.output.as_str().contains(char::REPLACEMENT_CHARACTER));
    }

    fn split_into_chunks(text: &str, cuts: &[usize]) -> Vec<Vec<u8>> {
        let bytes = text.as_bytes();
        let mut points: Vec<usize> = cuts.iter().map(|cut| cut % (bytes.len() + 1)).collect();
        points.sort_unstable();
        points.dedup();

        let mut chunks = Vec::new();
        let mut start = 0;
        for point in points.into_iter().chain(std::iter::once(bytes.len())) {
            if point > start {
                chunks.push(bytes[start..point].to_vec());
                start = point;
            }
        }
        chunks
    }

    fn from_stdout(c: char) -> bool {
        c.is_ascii_lowercase() || c == '€' || c == 'é'
    }

    proptest::proptest! {
        #[test]
        fn prop_interleaved_streams_decode_independently(
            out_text in "[a-z€é]{0,16}",
            err_text in "[A-Z✓ü]{0,16}",
            out_cuts in proptest::collection::vec(0usize..64, 0..6),
            err_cuts in proptest::collection::vec(0usize..64, 0..6),
            order in proptest::collection::vec(proptest::bool::ANY, 0..24),
        ) {
            let mut out_chunks = split_into_chunks(&out_text, &out_cuts).into_iter();
            let mut err_chunks = split_into_chunks(&err_text, &err_cuts).into_iter();

            let (tx, rx) = mpsc::unbounded_channel();
            let mut state = HandleState {
                running: true,
                events: Some(rx),
                ..Default::default()
            };

            let mut sequence = Vec::new();
            for pick_stderr in order {
                if pick_stderr {
                    sequence.extend(err_chunks.next().map(|data| (StreamKind::Stderr, data)));
                } else {
                    sequence.extend(out_chunks.next().map(|data| (StreamKind::Stdout, data)));
                }
            }
            sequence.extend(out_chunks.map(|data| (StreamKind::Stdout, data)));
            sequence.extend(err_chunks.map(|data| (StreamKind::Stderr, data)));

            for (stream, data) in sequence {
                tx.send(ProcessEvent::Output { stream, data }).unwrap();
            }
            drop(tx);
            state.drain(Some(1));

            let captured = state.output.as_str();
            let stdout_seen: String = captured.chars().filter(|c| from_stdout(*c)).collect();
            let stderr_seen: String = captured.chars().filter(|c| !from_stdout(*c)).collect();
            proptest::prop_assert_eq!(stdout_seen, out_text);
            proptest::prop_assert_eq!(stderr_seen, err_text);
        }
    }

    #[test]
    fn test_runtime_error_is_recorded() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = HandleState {
            running: true,
            events: Some(rx),
            ..Default::default()
        };

        tx.send(ProcessEvent::Failed(std::io::Error::from(std::io::ErrorKind::BrokenPipe)))
            .unwrap();
        state.drain(Some(1));
        assert!(!state.running);
        assert!(matches!(
            state.last_error.as_deref(),
            Some(ProcessError::Runtime(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_kill_uses_injected_terminator() {
        let terminator = Arc::new(RecordingTerminator::default());
        let handle = ProcessHandle::spawn_with(
            "sleep",
            ["30"],
            SpawnOverrides::new(),
            terminator.clone(),
        );
        let pid = handle.pid().unwrap();
        assert_eq!(handle.status(), ProcessStatus::Running);

        assert!(handle.kill_process().is_terminated());
        assert_eq!(*terminator.calls.lock(), vec![pid]);
        // Intent recorded even though the recording terminator left it alive
        assert_eq!(handle.status(), ProcessStatus::NotRunning);

        crate::UnixGroupTerminator::new().terminate_tree(pid).unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_kill_failure_is_reported_not_raised() {
        let handle = ProcessHandle::spawn_with(
            "sleep",
            ["30"],
            SpawnOverrides::new(),
            Arc::new(FailingTerminator),
        );
        let pid = handle.pid().unwrap();

        let outcome = handle.kill_process();
        assert!(matches!(outcome, KillOutcome::Failed(ProcessError::KillFailed { .. })));
        assert_eq!(handle.status(), ProcessStatus::NotRunning);
        assert!(handle.error().is_none());

        crate::UnixGroupTerminator::new().terminate_tree(pid).unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_kill_skips_exited_process() {
        let terminator = Arc::new(RecordingTerminator::default());
        let handle = ProcessHandle::spawn_with(
            "true",
            Vec::<String>::new(),
            SpawnOverrides::new(),
            terminator.clone(),
        );
        wait_until(&handle, |h| !h.status().is_running()).await;

        assert!(matches!(handle.kill_process(), KillOutcome::AlreadyExited));
        assert!(terminator.calls.lock().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_detached_child_leads_own_group() {
        let handle = ProcessHandle::spawn("sleep", ["30"], SpawnOverrides::new());
        let pid = handle.pid().unwrap();
        assert_eq!(handle.process_group(), Some(pid));

        let pgid = nix::unistd::getpgid(Some(nix::unistd::Pid::from_raw(pid as i32))).unwrap();
        assert_eq!(pgid.as_raw() as u32, pid);

        assert!(handle.kill_process().is_terminated());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status_and_stderr_capture() {
        let handle = ProcessHandle::spawn(
            "sh",
            ["-c", "echo oops >&2; exit 3"],
            SpawnOverrides::new(),
        );
        wait_until(&handle, |h| h.exit_status().is_some()).await;

        assert_eq!(handle.exit_status().and_then(|s| s.code()), Some(3));
        assert_eq!(handle.output(), "oops\n");
        assert_eq!(handle.status(), ProcessStatus::NotRunning);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_output_since_returns_only_new_text() {
        let handle = ProcessHandle::spawn("sh", ["-c", "printf 'first\nsecond\n'"], SpawnOverrides::new());
        wait_until(&handle, |h| h.exit_status().is_some()).await;

        assert_eq!(handle.output_since(0), handle.output());
        assert_eq!(handle.output_since("first\n".len()), "second\n");
        assert_eq!(handle.output_since(handle.output().len()), "");
        assert_eq!(handle.output_since(usize::MAX), "");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ignored_streams_capture_nothing() {
        use crate::StdioMode;

        let overrides = SpawnOverrides::new()
            .stdout(StdioMode::Ignore)
            .stderr(StdioMode::Ignore);
        let handle = ProcessHandle::spawn("echo", ["hidden"], overrides);
        wait_until(&handle, |h| h.exit_status().is_some()).await;

        assert_eq!(handle.output(), "");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_working_dir_and_env() {
        let dir = std::env::temp_dir();
        let overrides = SpawnOverrides::new()
            .working_dir(&dir)
            .env("TETHER_TEST_VALUE", "42");
        let handle = ProcessHandle::spawn("sh", ["-c", "echo $TETHER_TEST_VALUE; pwd"], overrides);
        wait_until(&handle, |h| h.exit_status().is_some()).await;

        let output = handle.output();
        assert!(output.starts_with("42\n"));
        let expected = dir.canonicalize().unwrap();
        let printed = std::path::PathBuf::from(output.lines().nth(1).unwrap())
            .canonicalize()
            .unwrap();
        assert_eq!(printed, expected);
    }
}
