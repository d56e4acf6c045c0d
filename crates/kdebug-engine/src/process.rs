//! Spawns the proof engine subprocess and wires its three streams into the
//! rest of the workspace per the concurrency model: one blocking reader
//! thread per stdout/stderr, one process waiter, and one logic thread that
//! owns the scheduler and writes commands back to the engine's stdin.
//! Every worker loop runs through [`run_guarded`] so a panic or I/O error
//! on any one of them flips [`Life`] and unwinds the rest cleanly.
//!
//! The stdout/stderr parsers are shared (`Arc<Mutex<_>>`) between their
//! reader thread and the logic thread: the reader feeds bytes in, and the
//! logic thread calls `prepare_for_step`/`prepare_for_konfig` on the same
//! instance right before writing the command that makes the next bytes
//! meaningful, so no stale partial match from the previous round survives
//! into the next.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use kdebug_core::{run_guarded, Life};
use kdebug_graph::{parse_graph_file, UIGraph};
use kdebug_protocol::stdout::ParserEvent;
use kdebug_protocol::{OutputParser, StdErrParser};

use crate::bus::{bus, BusSender};
use crate::scheduler::{Event, ParserPrep, Scheduler};

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to spawn engine subprocess: {0}")]
    Spawn(#[source] io::Error),
    #[error("engine subprocess did not expose {0}")]
    MissingStream(&'static str),
    #[error("failed to create temporary graph directory or debug log: {0}")]
    Setup(#[source] io::Error),
    #[error("engine stdin is closed")]
    BrokenPipe,
    #[error(transparent)]
    Scheduler(#[from] crate::scheduler::SchedulerError),
}

/// Owns the subprocess, the temporary SVG directory, and the shared
/// liveness flag for the whole engine session.
pub struct EngineProcess {
    child: Child,
    life: Life,
    graph: Arc<Mutex<UIGraph>>,
    scheduler: Arc<Mutex<Scheduler>>,
    debug_log: Arc<Mutex<File>>,
    events: BusSender<Event>,
    tree_changes: crate::bus::BusReceiver<()>,
    _graph_dir: tempfile::TempDir,
    threads: Vec<JoinHandle<()>>,
}

impl EngineProcess {
    /// Spawns `argv` as the engine subprocess and starts every worker
    /// thread described in the concurrency model. The logic thread is
    /// started first per §5's startup ordering; producers are daemonized
    /// (spawned after, never joined on shutdown).
    pub fn spawn(argv: &[String], debug_log_path: &Path) -> Result<Self, ProcessError> {
        let graph_dir = tempfile::tempdir().map_err(ProcessError::Setup)?;
        let graph_svg_path = graph_dir.path().join("graph");

        let mut command = Command::new(&argv[0]);
        command.args(&argv[1..]);
        command.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = command.spawn().map_err(ProcessError::Spawn)?;

        let stdin = child.stdin.take().ok_or(ProcessError::MissingStream("stdin"))?;
        let stdout = child.stdout.take().ok_or(ProcessError::MissingStream("stdout"))?;
        let stderr = child.stderr.take().ok_or(ProcessError::MissingStream("stderr"))?;

        let debug_log = Arc::new(Mutex::new(File::create(debug_log_path).map_err(ProcessError::Setup)?));
        let life = Life::new();
        let graph = Arc::new(Mutex::new(UIGraph::new()));
        let stdin = Arc::new(Mutex::new(stdin));

        let (event_tx, event_rx) = bus::<Event>();
        let (tree_change_tx, tree_change_rx) = bus::<()>();
        let stdout_parser = Arc::new(Mutex::new(OutputParser::new()));
        let stderr_parser = Arc::new(Mutex::new(StdErrParser::new()));

        let mut scheduler = Scheduler::new(graph_svg_path.to_string_lossy().into_owned());
        scheduler.add_tree_listener(move || tree_change_tx.send(()));
        let scheduler = Arc::new(Mutex::new(scheduler));

        let logic_thread = spawn_logic_thread(
            event_rx,
            stdin,
            life.clone(),
            graph.clone(),
            scheduler.clone(),
            graph_svg_path,
            debug_log.clone(),
            stdout_parser.clone(),
            stderr_parser.clone(),
        );
        let stdout_thread =
            spawn_stdout_reader(stdout, life.clone(), event_tx.clone(), debug_log.clone(), stdout_parser);
        let stderr_thread = spawn_stderr_reader(stderr, life.clone(), event_tx.clone(), debug_log.clone(), stderr_parser);

        Ok(EngineProcess {
            child,
            life,
            graph,
            scheduler,
            debug_log,
            events: event_tx,
            tree_changes: tree_change_rx,
            _graph_dir: graph_dir,
            threads: vec![logic_thread, stdout_thread, stderr_thread],
        })
    }

    pub fn life(&self) -> &Life {
        &self.life
    }

    pub fn graph(&self) -> &Arc<Mutex<UIGraph>> {
        &self.graph
    }

    pub fn scheduler(&self) -> &Arc<Mutex<Scheduler>> {
        &self.scheduler
    }

    /// Blocks until the proof tree has changed at least once since the
    /// last call, for a UI thread's dispatch loop.
    pub fn wait_for_tree_change(&self) -> bool {
        self.tree_changes.recv_batch().is_some()
    }

    /// UI-driven: requests the configuration for `node_id` be fetched,
    /// resuming the scheduler immediately if it was idle.
    pub fn request_konfig(&self, node_id: u64) {
        self.events.send(Event::RequestKonfig(node_id));
    }

    /// Waits for the subprocess to exit, then joins every worker thread.
    /// Per §7, a non-zero exit is recorded to the debug log, not treated
    /// as a panic.
    ///
    /// The logic thread blocks in `recv_batch()` until every sender on its
    /// events bus is gone; the reader threads drop theirs on EOF once the
    /// child's pipes close, but `events` here is the last one standing, so
    /// it must be dropped explicitly before joining or the logic thread
    /// never wakes up to notice the child is gone.
    pub fn wait(self) -> io::Result<std::process::ExitStatus> {
        let EngineProcess { mut child, life, debug_log, events, threads, .. } = self;
        let status = child.wait()?;
        life.die();
        if !status.success() {
            if let Ok(mut log) = debug_log.lock() {
                let _ = writeln!(log, "[process] engine exited with {status}");
            }
        }
        drop(events);
        for handle in threads {
            let _ = handle.join();
        }
        Ok(status)
    }

    pub fn kill(&mut self) {
        let _ = self.child.kill();
        self.life.die();
    }
}

fn spawn_stdout_reader(
    mut stdout: impl Read + Send + 'static,
    life: Life,
    events: BusSender<Event>,
    debug_log: Arc<Mutex<File>>,
    parser: Arc<Mutex<OutputParser>>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let life_loop = life.clone();
        let _ = run_guarded(&life, "stdout-reader", move || -> Result<(), io::Error> {
            let mut byte = [0u8; 1];
            while life_loop.is_alive() {
                let n = stdout.read(&mut byte)?;
                if n == 0 {
                    break;
                }
                log_received(&debug_log, "stdout", &byte);
                let completed = parser.lock().expect("stdout parser mutex poisoned").process(byte[0]);
                for event in completed {
                    events.send(to_scheduler_event(event));
                }
            }
            Ok(())
        });
    })
}

pub(crate) fn to_scheduler_event(event: ParserEvent) -> Event {
    match event {
        ParserEvent::AtPrompt(id) => Event::AtPrompt(id),
        ParserEvent::Branches(step_count, children) => Event::Branches(step_count, children),
        ParserEvent::ProofEnd(step_count) => Event::ProofEnd(step_count),
        ParserEvent::Konfig(id, lines) => Event::Konfig(id, lines),
    }
}

fn spawn_stderr_reader(
    mut stderr: impl Read + Send + 'static,
    life: Life,
    events: BusSender<Event>,
    debug_log: Arc<Mutex<File>>,
    parser: Arc<Mutex<StdErrParser>>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let life_loop = life.clone();
        let _ = run_guarded(&life, "stderr-reader", move || -> Result<(), io::Error> {
            let mut byte = [0u8; 1];
            while life_loop.is_alive() {
                let n = stderr.read(&mut byte)?;
                if n == 0 {
                    break;
                }
                log_received(&debug_log, "stderr", &byte);
                let signal = parser.lock().expect("stderr parser mutex poisoned").process(byte[0]);
                if let Some(signal) = signal {
                    events.send(Event::EndStateSet(signal));
                }
            }
            Ok(())
        });
    })
}

#[allow(clippy::too_many_arguments)]
fn spawn_logic_thread(
    events: crate::bus::BusReceiver<Event>,
    stdin: Arc<Mutex<ChildStdin>>,
    life: Life,
    graph: Arc<Mutex<UIGraph>>,
    scheduler: Arc<Mutex<Scheduler>>,
    graph_svg_path: PathBuf,
    debug_log: Arc<Mutex<File>>,
    stdout_parser: Arc<Mutex<OutputParser>>,
    stderr_parser: Arc<Mutex<StdErrParser>>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let life_loop = life.clone();
        let _ = run_guarded(&life, "logic", move || -> Result<(), ProcessError> {
            while life_loop.is_alive() {
                let Some(batch) = events.recv_batch() else { break };
                for event in batch {
                    let reload_graph = matches!(event, Event::AtPrompt(_));
                    let dispatch = scheduler.lock().expect("scheduler mutex poisoned").handle(event)?;
                    if reload_graph {
                        reload_graph_if_present(&graph, &graph_svg_path);
                    }
                    if let Some(dispatch) = dispatch {
                        prepare_parsers(&stdout_parser, &stderr_parser, dispatch.prep);
                        send_dispatch(&stdin, &debug_log, &dispatch)?;
                    }
                }
            }
            send_exit(&stdin, &debug_log);
            Ok(())
        });
    })
}

fn prepare_parsers(stdout_parser: &Arc<Mutex<OutputParser>>, stderr_parser: &Arc<Mutex<StdErrParser>>, prep: ParserPrep) {
    let mut stdout_parser = stdout_parser.lock().expect("stdout parser mutex poisoned");
    let mut stderr_parser = stderr_parser.lock().expect("stderr parser mutex poisoned");
    match prep {
        ParserPrep::Step => {
            stdout_parser.prepare_for_step();
            stderr_parser.prepare_for_step();
        }
        ParserPrep::Konfig => {
            stdout_parser.prepare_for_konfig();
            stderr_parser.prepare_for_konfig();
        }
    }
}

fn send_dispatch(
    stdin: &Arc<Mutex<ChildStdin>>,
    debug_log: &Arc<Mutex<File>>,
    dispatch: &crate::scheduler::Dispatch,
) -> Result<(), ProcessError> {
    let mut guard = stdin.lock().expect("engine stdin mutex poisoned");
    for line in &dispatch.lines {
        writeln!(guard, "{line}").map_err(|_| ProcessError::BrokenPipe)?;
        log_sent(debug_log, line);
    }
    Ok(())
}

fn send_exit(stdin: &Arc<Mutex<ChildStdin>>, debug_log: &Arc<Mutex<File>>) {
    if let Ok(mut guard) = stdin.lock() {
        // A broken pipe here means the engine already exited; swallowed per §7.
        let _ = writeln!(guard, "exit");
    }
    log_sent(debug_log, "exit");
}

fn reload_graph_if_present(graph: &Arc<Mutex<UIGraph>>, svg_base_path: &Path) {
    let svg_path = svg_base_path.with_extension("svg");
    if let Ok(edges) = parse_graph_file(&svg_path) {
        if let Ok(mut g) = graph.lock() {
            g.set_graph(&edges);
        }
    }
}

fn log_sent(debug_log: &Arc<Mutex<File>>, line: &str) {
    if let Ok(mut log) = debug_log.lock() {
        let _ = writeln!(log, "> {line}");
    }
}

fn log_received(debug_log: &Arc<Mutex<File>>, stream: &'static str, bytes: &[u8]) {
    if let Ok(mut log) = debug_log.lock() {
        let _ = log.write_all(format!("< [{stream}] ").as_bytes());
        let _ = log.write_all(bytes);
        let _ = log.write_all(b"\n");
    }
}

/// Reads a previously written debug log back into lines, oldest first —
/// used by the CLI's post-mortem dump on a non-zero engine exit.
pub fn read_debug_log(path: &Path) -> io::Result<Vec<String>> {
    BufReader::new(File::open(path)?).lines().collect()
}
