use super::*;
use crate::parser::HelpFormat;
use crate::runner::MockHelpRunner;
use async_trait::async_trait;
use mockall::Sequence;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

const CLAP_HELP: &str = "\
Usage: mytool [OPTIONS]

Options:
  -c, --config <FILE>  Sets a custom config file
  -h, --help           Print help
";

/// Answers every probe with the same text after a short delay.
struct CountingRunner {
    calls: AtomicUsize,
    text: String,
}

impl CountingRunner {
    fn new(text: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            text: text.to_string(),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HelpRunner for CountingRunner {
    async fn run(&self, _program: &str, _help_arg: &str, _timeout: Duration) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(self.text.clone())
    }
}

fn engine(runner: Arc<dyn HelpRunner>) -> Arc<HelpEngine> {
    Arc::new(HelpEngine::new(runner, IntrospectConfig::default()))
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_lookups_share_one_probe() {
    let runner = CountingRunner::new(CLAP_HELP);
    let engine = engine(runner.clone());

    let (a, b) = tokio::join!(engine.get_help("mytool"), engine.get_help("mytool"));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(runner.calls(), 1);
    assert_eq!(a, b);
    assert_eq!(a.flags.len(), 2);
    assert_eq!(a.invocation.as_deref(), Some("--help"));
    assert_eq!(engine.cached_len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_fresh_result_is_served_from_cache() {
    let runner = CountingRunner::new(CLAP_HELP);
    let engine = engine(runner.clone());

    engine.get_help("mytool").await.unwrap();
    tokio::time::advance(Duration::from_secs(5 * 60)).await;
    engine.get_help("mytool").await.unwrap();

    assert_eq!(runner.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stale_result_is_refetched() {
    let runner = CountingRunner::new(CLAP_HELP);
    let engine = engine(runner.clone());

    engine.get_help("mytool").await.unwrap();
    tokio::time::advance(Duration::from_secs(11 * 60)).await;
    engine.get_help("mytool").await.unwrap();

    assert_eq!(runner.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_forces_refetch() {
    let runner = CountingRunner::new(CLAP_HELP);
    let engine = engine(runner.clone());

    engine.get_help("mytool").await.unwrap();
    engine.invalidate("mytool").await;
    engine.get_help("mytool").await.unwrap();
    assert_eq!(runner.calls(), 2);

    engine.clear_cache().await;
    assert_eq!(engine.cached_len().await, 0);
}

#[tokio::test]
async fn test_short_output_falls_back_to_next_invocation() {
    let mut runner = MockHelpRunner::new();
    let mut seq = Sequence::new();
    runner
        .expect_run()
        .withf(|program, arg, _| program == "mytool" && arg == "--help")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok("unknown option --help".to_string()));
    runner
        .expect_run()
        .withf(|_, arg, _| arg == "-h")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(CLAP_HELP.to_string()));

    let engine = engine(Arc::new(runner));
    let help = engine.get_help("mytool").await.unwrap();

    assert_eq!(help.invocation.as_deref(), Some("-h"));
    assert_eq!(help.format, Some(HelpFormat::Clap));
}

#[tokio::test]
async fn test_failed_probe_falls_back_to_next_invocation() {
    let mut runner = MockHelpRunner::new();
    let mut seq = Sequence::new();
    runner
        .expect_run()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Err(Error::Timeout(3000)));
    runner
        .expect_run()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(CLAP_HELP.to_string()));

    let engine = engine(Arc::new(runner));
    let help = engine.get_help("mytool").await.unwrap();
    assert_eq!(help.invocation.as_deref(), Some("-h"));
}

#[tokio::test]
async fn test_exhausted_probes_are_empty_and_not_cached() {
    let mut runner = MockHelpRunner::new();
    runner
        .expect_run()
        .times(HELP_INVOCATIONS.len() * 2)
        .returning(|_, _, _| Ok(String::new()));

    let engine = engine(Arc::new(runner));
    let help = engine.get_help("quiet").await.unwrap();
    assert!(help.is_empty());
    assert!(help.invocation.is_none());
    assert!(help.diagnostic.is_some());
    assert_eq!(engine.cached_len().await, 0);

    // Second call probes again
    engine.get_help("quiet").await.unwrap();
}

#[tokio::test]
async fn test_escape_sequences_are_stripped_before_parsing() {
    let mut runner = MockHelpRunner::new();
    runner.expect_run().times(1).returning(|_, _, _| {
        Ok("Usage: mytool [OPTIONS]\n\n\x1b[1mOptions:\x1b[0m\n  -q, --quiet  Say nothing at all, ever\n".to_string())
    });

    let engine = engine(Arc::new(runner));
    let help = engine.get_help("mytool").await.unwrap();
    assert_eq!(help.format, Some(HelpFormat::Clap));
    assert_eq!(help.flags[0].key(), "--quiet");
}

#[tokio::test]
async fn test_invalid_program_names_are_rejected() {
    let mut runner = MockHelpRunner::new();
    runner.expect_run().never();
    let engine = engine(Arc::new(runner));

    for name in ["", "rm -rf", "a;b", "$(id)", "x|y", "--help", "`id`"] {
        let result = engine.get_help(name).await;
        assert!(
            matches!(result, Err(Error::InvalidProgram(_))),
            "accepted {name:?}"
        );
    }
}

#[tokio::test]
async fn test_paths_and_dotted_names_are_accepted() {
    assert!(validate_program("/usr/bin/ls").is_ok());
    assert!(validate_program("deploy.py").is_ok());
    assert!(validate_program("kubectl-1.29").is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_debounce_runs_only_last_call() {
    let runner = CountingRunner::new(CLAP_HELP);
    let engine = engine(runner.clone());

    let first = tokio::spawn({
        let engine = engine.clone();
        async move { engine.get_debounced_help("mytool").await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = tokio::spawn({
        let engine = engine.clone();
        async move { engine.get_debounced_help("mytool").await }
    });

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert!(first.is_none());
    assert_eq!(second.map(|h| h.flags.len()), Some(2));
    assert_eq!(runner.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_debounce_separate_bursts_both_run() {
    let runner = CountingRunner::new(CLAP_HELP);
    let engine = engine(runner.clone());

    assert!(engine.get_debounced_help("mytool").await.unwrap().is_some());
    engine.invalidate("mytool").await;
    assert!(engine.get_debounced_help("mytool").await.unwrap().is_some());
    assert_eq!(runner.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_debounce_is_tracked_per_program() {
    let runner = CountingRunner::new(CLAP_HELP);
    let engine = engine(runner.clone());

    let (mytool, other) = tokio::join!(
        engine.get_debounced_help("mytool"),
        engine.get_debounced_help("othertool")
    );

    assert!(mytool.unwrap().is_some());
    assert!(other.unwrap().is_some());
    assert_eq!(runner.calls(), 2);
    assert_eq!(engine.cached_len().await, 2);
}

#[tokio::test(start_paused = true)]
async fn test_debounced_call_stays_pending_during_quiet_period() {
    use tokio_test::{assert_pending, task};

    let runner = CountingRunner::new(CLAP_HELP);
    let engine = engine(runner.clone());

    let mut call = task::spawn(engine.get_debounced_help("mytool"));
    assert_pending!(call.poll());
    tokio::time::advance(Duration::from_millis(100)).await;
    assert_pending!(call.poll());
    assert_eq!(runner.calls(), 0);
}
