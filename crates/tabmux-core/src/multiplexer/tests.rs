use super::*;
use crate::backend::ProcessControl;
use crate::config::WorkspaceConfig;
use crate::workspace::{FirstRootPicker, MockFolderPicker};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
struct SpawnRecord {
    session: SessionId,
    generation: u64,
    config: TerminalConfig,
    cwd: PathBuf,
    cols: u16,
    rows: u16,
}

#[derive(Debug, Default)]
struct FakeState {
    spawns: Vec<SpawnRecord>,
    writes: Vec<(SessionId, Vec<u8>)>,
    resizes: Vec<(SessionId, u16, u16)>,
    kills: Vec<(SessionId, u64)>,
    fail_spawns: bool,
}

#[derive(Debug, Clone, Default)]
struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    fn spawns(&self) -> Vec<SpawnRecord> {
        self.state.lock().unwrap().spawns.clone()
    }

    fn kills(&self) -> Vec<(SessionId, u64)> {
        self.state.lock().unwrap().kills.clone()
    }

    fn fail_spawns(&self, fail: bool) {
        self.state.lock().unwrap().fail_spawns = fail;
    }
}

#[derive(Debug)]
struct FakeProcess {
    session: SessionId,
    generation: u64,
    alive: bool,
    state: Arc<Mutex<FakeState>>,
}

impl ProcessControl for FakeProcess {
    fn write(&self, data: &[u8]) -> tabmux_pty::Result<()> {
        self.state
            .lock()
            .unwrap()
            .writes
            .push((self.session.clone(), data.to_vec()));
        Ok(())
    }

    fn resize(&mut self, cols: u16, rows: u16) -> tabmux_pty::Result<()> {
        self.state
            .lock()
            .unwrap()
            .resizes
            .push((self.session.clone(), cols, rows));
        Ok(())
    }

    fn kill(&mut self) {
        if self.alive {
            self.alive = false;
            self.state
                .lock()
                .unwrap()
                .kills
                .push((self.session.clone(), self.generation));
        }
    }

    fn is_alive(&self) -> bool {
        self.alive
    }
}

impl ProcessBackend for FakeBackend {
    fn spawn(
        &self,
        request: SpawnRequest<'_>,
        _events: mpsc::UnboundedSender<ProcessEvent<SessionId>>,
    ) -> tabmux_pty::Result<Box<dyn ProcessControl>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_spawns {
            return Err(tabmux_pty::Error::Spawn {
                program: request.config.program.clone(),
                message: "No such file or directory".into(),
            });
        }
        state.spawns.push(SpawnRecord {
            session: request.session.clone(),
            generation: request.generation,
            config: request.config.clone(),
            cwd: request.cwd.to_path_buf(),
            cols: request.cols,
            rows: request.rows,
        });
        Ok(Box::new(FakeProcess {
            session: request.session.clone(),
            generation: request.generation,
            alive: true,
            state: self.state.clone(),
        }))
    }
}

struct Harness {
    mux: Multiplexer,
    backend: FakeBackend,
    outbound: mpsc::UnboundedReceiver<OutboundMessage>,
    timers: mpsc::UnboundedReceiver<TimerFired<SessionId>>,
    _process: mpsc::UnboundedReceiver<ProcessEvent<SessionId>>,
}

impl Harness {
    fn new(config: CoreConfig) -> Self {
        Self::with_picker(config, Arc::new(FirstRootPicker))
    }

    fn with_picker(config: CoreConfig, picker: Arc<dyn FolderPicker>) -> Self {
        let backend = FakeBackend::default();
        let (outbox, outbound) = Outbox::channel();
        let (process_tx, process_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let mux = Multiplexer::new(
            config,
            Arc::new(backend.clone()),
            picker,
            outbox,
            process_tx,
            timer_tx,
        );
        Self {
            mux,
            backend,
            outbound,
            timers: timer_rx,
            _process: process_rx,
        }
    }

    fn drain(&mut self) -> Vec<OutboundMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.outbound.try_recv() {
            messages.push(message);
        }
        messages
    }

    fn outputs(&mut self) -> Vec<String> {
        self.drain()
            .into_iter()
            .filter_map(|m| match m {
                OutboundMessage::Output { data, .. } => Some(data),
                _ => None,
            })
            .collect()
    }

    fn assert_single_active(&self) {
        let active = self.mux.sessions().iter().filter(|s| s.is_active()).count();
        assert_eq!(active, 1, "expected exactly one active session");
    }

    fn output(&mut self, id: &SessionId, text: &str) {
        let generation = self.mux.get(id).unwrap().generation();
        self.mux.handle_process_event(ProcessEvent::Output {
            session: id.clone(),
            generation,
            data: text.as_bytes().to_vec(),
        });
    }
}

fn config() -> CoreConfig {
    let mut config = CoreConfig::default();
    config.terminal.launch = TerminalConfig::direct("claude", Vec::new());
    config
}

#[tokio::test]
async fn test_create_activates_new_session() {
    let mut h = Harness::new(config());
    let first = h.mux.create_session(config().terminal.launch, 100, 30, None).await;
    let second = h.mux.new_session().await;

    assert_eq!(h.mux.len(), 2);
    assert_eq!(h.mux.active_id(), Some(&second));
    assert!(!h.mux.get(&first).unwrap().is_active());
    assert_eq!(h.mux.get(&first).unwrap().name(), "Agent 1");
    assert_eq!(h.mux.get(&second).unwrap().name(), "Agent 2");

    let spawns = h.backend.spawns();
    assert_eq!(spawns.len(), 2);
    assert_eq!((spawns[1].cols, spawns[1].rows), (100, 30));
    assert_eq!(spawns[0].generation, 1);

    let messages = h.drain();
    assert!(matches!(&messages[0], OutboundMessage::SessionCreated { id, name, .. } if id == &first && name == "Agent 1"));
    assert!(matches!(&messages[1], OutboundMessage::SessionsUpdate { sessions } if sessions.len() == 1));
}

#[tokio::test]
async fn test_active_invariant_across_operations() {
    let mut h = Harness::new(config());
    let a = h.mux.new_session().await;
    h.assert_single_active();
    let b = h.mux.new_session().await;
    h.assert_single_active();
    let c = h.mux.new_session().await;
    h.assert_single_active();

    h.mux.switch_to(&a);
    h.assert_single_active();
    h.mux.close_session(&b).await;
    h.assert_single_active();
    h.mux.close_session(&a).await;
    h.assert_single_active();
    assert_eq!(h.mux.active_id(), Some(&c));
    h.mux.close_session(&c).await;
    h.assert_single_active();
    assert_eq!(h.mux.len(), 1);
}

#[tokio::test]
async fn test_closing_only_session_creates_exactly_one() {
    let mut h = Harness::new(config());
    let only = h.mux.new_session().await;
    h.drain();

    h.mux.close_session(&only).await;

    assert_eq!(h.mux.len(), 1);
    let replacement = h.mux.active_id().unwrap().clone();
    assert_ne!(replacement, only);
    assert_eq!(h.mux.get(&replacement).unwrap().name(), "Agent 2");
    assert_eq!(h.backend.kills(), vec![(only.clone(), 1)]);

    let messages = h.drain();
    assert!(matches!(&messages[0], OutboundMessage::SessionRemoved { id } if id == &only));
    let created = messages
        .iter()
        .filter(|m| matches!(m, OutboundMessage::SessionCreated { .. }))
        .count();
    assert_eq!(created, 1);
}

#[tokio::test]
async fn test_close_active_picks_most_recent() {
    let mut h = Harness::new(config());
    let a = h.mux.new_session().await;
    let b = h.mux.new_session().await;
    let c = h.mux.new_session().await;
    h.mux.switch_to(&b);
    h.drain();

    h.mux.close_session(&b).await;
    assert_eq!(h.mux.active_id(), Some(&c));
    let messages = h.drain();
    assert!(messages
        .iter()
        .any(|m| matches!(m, OutboundMessage::SessionSwitched { id } if id == &c)));

    h.mux.close_session(&c).await;
    assert_eq!(h.mux.active_id(), Some(&a));
}

#[tokio::test]
async fn test_close_inactive_keeps_active() {
    let mut h = Harness::new(config());
    let a = h.mux.new_session().await;
    let b = h.mux.new_session().await;

    h.mux.close_session(&a).await;
    assert_eq!(h.mux.active_id(), Some(&b));
    assert_eq!(h.mux.len(), 1);
}

#[tokio::test]
async fn test_unknown_ids_are_ignored() {
    let mut h = Harness::new(config());
    let a = h.mux.new_session().await;
    h.drain();

    let ghost = SessionId::from("ghost");
    h.mux.switch_to(&ghost);
    h.mux.close_session(&ghost).await;
    h.mux.write_input(&ghost, b"x");

    assert_eq!(h.mux.active_id(), Some(&a));
    assert!(h.drain().is_empty());
}

#[tokio::test]
async fn test_next_cycles_through_all_sessions() {
    let mut h = Harness::new(config());
    let ids = vec![
        h.mux.new_session().await,
        h.mux.new_session().await,
        h.mux.new_session().await,
    ];
    h.mux.switch_to(&ids[0]);

    let mut seen = Vec::new();
    for _ in 0..ids.len() {
        h.mux.next();
        seen.push(h.mux.active_id().unwrap().clone());
    }
    assert_eq!(seen, vec![ids[1].clone(), ids[2].clone(), ids[0].clone()]);

    h.mux.previous();
    assert_eq!(h.mux.active_id(), Some(&ids[2]));
}

#[tokio::test]
async fn test_navigation_with_single_session_is_noop() {
    let mut h = Harness::new(config());
    let only = h.mux.new_session().await;
    h.drain();
    h.mux.next();
    h.mux.previous();
    assert_eq!(h.mux.active_id(), Some(&only));
    assert!(h.drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_restart_suppresses_exit_within_grace_window() {
    let mut h = Harness::new(config());
    let id = h.mux.new_session().await;
    h.drain();

    h.mux.restart();
    assert_eq!(h.mux.get(&id).unwrap().generation(), 2);
    assert_eq!(h.backend.kills(), vec![(id.clone(), 1)]);
    let messages = h.drain();
    assert!(matches!(&messages[0], OutboundMessage::Clear { session_id } if session_id == &id));

    // The killed process reports its exit right away
    tokio::time::advance(Duration::from_millis(200)).await;
    h.mux.handle_process_event(ProcessEvent::Exited {
        session: id.clone(),
        generation: 1,
        code: None,
    });
    assert!(h.outputs().is_empty());

    // After the window exits are reported again
    tokio::time::advance(Duration::from_millis(1000)).await;
    h.mux.handle_process_event(ProcessEvent::Exited {
        session: id.clone(),
        generation: 2,
        code: Some(1),
    });
    assert_eq!(h.outputs(), vec![exit_message(Some(1))]);
}

#[tokio::test]
async fn test_restart_uses_current_configuration() {
    let mut h = Harness::new(config());
    let id = h.mux.new_session_with_command().await;

    let mut updated = config();
    updated.terminal.launch = TerminalConfig::shell("aider", vec!["--yes".into()]);
    updated.terminal.launch.auto_run = false;
    h.mux.apply_config(updated);

    // Running process untouched
    assert!(h.backend.kills().is_empty());
    assert_eq!(h.backend.spawns().len(), 1);

    h.mux.restart();
    let spawns = h.backend.spawns();
    assert_eq!(spawns.len(), 2);
    assert_eq!(spawns[1].session, id);
    assert_eq!(spawns[1].config.program, "aider");
    // Sessions opened with the command keep auto-running it
    assert!(spawns[1].config.auto_run);
}

#[tokio::test]
async fn test_new_session_with_command_forces_auto_run() {
    let mut base = config();
    base.terminal.launch = TerminalConfig::shell("claude", Vec::new());
    base.terminal.launch.auto_run = false;
    let mut h = Harness::new(base);

    h.mux.new_session().await;
    h.mux.new_session_with_command().await;
    let spawns = h.backend.spawns();
    assert!(!spawns[0].config.auto_run);
    assert!(spawns[1].config.auto_run);
}

#[tokio::test]
async fn test_spawn_failure_is_reported_in_session() {
    let mut h = Harness::new(config());
    h.backend.fail_spawns(true);
    let id = h.mux.new_session().await;

    let outputs = h.outputs();
    assert_eq!(outputs.len(), 1);
    assert!(outputs[0].contains("failed to start claude"));
    assert!(!h.mux.get(&id).unwrap().has_live_process());
    assert_eq!(h.mux.active_id(), Some(&id));

    // Input to an inert session is dropped silently
    h.mux.write_input(&id, b"hello");

    h.backend.fail_spawns(false);
    h.mux.restart();
    assert!(h.mux.get(&id).unwrap().has_live_process());
}

#[tokio::test]
async fn test_output_is_routed_and_stale_output_dropped() {
    let mut h = Harness::new(config());
    let id = h.mux.new_session().await;
    h.drain();

    h.output(&id, "hello\r\n");
    h.mux.handle_process_event(ProcessEvent::Output {
        session: id.clone(),
        generation: 99,
        data: b"old".to_vec(),
    });
    assert_eq!(h.outputs(), vec!["hello\r\n".to_string()]);
}

#[tokio::test]
async fn test_unexpected_exit_is_reported() {
    let mut h = Harness::new(config());
    let id = h.mux.new_session().await;
    h.drain();

    h.mux.handle_process_event(ProcessEvent::Exited {
        session: id.clone(),
        generation: 1,
        code: Some(0),
    });
    assert_eq!(h.outputs(), vec!["\r\n[process exited with code 0]\r\n".to_string()]);
    // The session stays open
    assert_eq!(h.mux.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_prompt_notification_round_trip() {
    let mut h = Harness::new(config());
    let id = h.mux.new_session().await;
    h.drain();

    h.output(&id, "Apply changes? [y/n] ");
    let fired = h.timers.recv().await.unwrap();
    h.mux.handle_timer(fired);
    assert!(h.mux.is_waiting(&id));

    let notifications: Vec<_> = h
        .drain()
        .into_iter()
        .filter(|m| matches!(m, OutboundMessage::Notification { .. }))
        .collect();
    assert_eq!(
        notifications,
        vec![OutboundMessage::Notification {
            session_id: id.clone(),
            show: true
        }]
    );

    h.mux.write_input(&id, b"y");
    assert_eq!(
        h.drain(),
        vec![OutboundMessage::Notification {
            session_id: id.clone(),
            show: false
        }]
    );
    let writes = h.backend.state.lock().unwrap().writes.clone();
    assert_eq!(writes, vec![(id.clone(), b"y".to_vec())]);
}

#[tokio::test(start_paused = true)]
async fn test_newer_output_keeps_session_idle() {
    let mut h = Harness::new(config());
    let id = h.mux.new_session().await;

    h.output(&id, "Continue? [y/n] ");
    tokio::time::advance(Duration::from_millis(100)).await;
    h.output(&id, "\r\nresuming build\r\nstep 1\r\nstep 2\r\nstep 3\r\nstep 4\r\n");

    tokio::time::advance(Duration::from_secs(1)).await;
    while let Ok(fired) = h.timers.try_recv() {
        h.mux.handle_timer(fired);
    }
    assert!(!h.mux.is_waiting(&id));
}

#[tokio::test(start_paused = true)]
async fn test_closed_session_ignores_pending_timer() {
    let mut h = Harness::new(config());
    let a = h.mux.new_session().await;
    h.mux.new_session().await;

    h.output(&a, "Continue? [y/n] ");
    h.mux.close_session(&a).await;
    h.mux.handle_timer(TimerFired { key: a.clone(), epoch: 1 });
    h.drain();
    assert!(!h.mux.is_waiting(&a));
}

#[tokio::test]
async fn test_resize_is_forwarded_and_remembered() {
    let mut h = Harness::new(config());
    let id = h.mux.new_session().await;
    h.mux.resize(&id, 132, 43);

    assert_eq!(h.mux.size(), (132, 43));
    let resizes = h.backend.state.lock().unwrap().resizes.clone();
    assert_eq!(resizes, vec![(id.clone(), 132, 43)]);

    h.mux.new_session().await;
    let spawns = h.backend.spawns();
    assert_eq!((spawns[1].cols, spawns[1].rows), (132, 43));
}

#[tokio::test]
async fn test_dispose_kills_everything() {
    let mut h = Harness::new(config());
    h.mux.new_session().await;
    h.mux.new_session().await;
    h.mux.dispose();

    assert!(h.mux.is_empty());
    assert_eq!(h.backend.kills().len(), 2);
}

#[tokio::test]
async fn test_multiple_roots_use_picker_and_accent() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let mut cfg = config();
    cfg.workspace = WorkspaceConfig {
        roots: vec![first.path().to_path_buf(), second.path().to_path_buf()],
    };

    let mut picker = MockFolderPicker::new();
    picker.expect_choose().times(1).returning(|_| Some(1));
    let mut h = Harness::with_picker(cfg, Arc::new(picker));

    let id = h.mux.new_session().await;
    let session = h.mux.get(&id).unwrap();
    assert_eq!(session.origin_index(), Some(1));
    assert_eq!(session.cwd(), second.path());
    assert_eq!(h.backend.spawns()[0].cwd, second.path());

    let snapshot = h.mux.snapshot();
    assert_eq!(
        snapshot[0].accent_color.as_deref(),
        Some(crate::session::ACCENT_COLORS[1])
    );
}
