//! End-to-end REPL scenarios
//!
//! Drives the real script engine through the REPL loop with the scripted
//! test host and an in-memory cluster.

use kubeplay::repl::{
    Evaluator, ExitReason, OutputStyle, ReplCore, Signal, ERROR_PREFIX, INTERRUPT_HINT,
};
use kubeplay::resource::ItemIdentity;
use kubeplay::script::ScriptEngine;
use kubeplay::test_utils::{pod, MockApi, TestHost};
use std::rc::Rc;

fn shell(cluster: Rc<MockApi>) -> ReplCore<ScriptEngine> {
    ReplCore::new(ScriptEngine::new(cluster, "kind-dev", "default").unwrap())
}

fn terminal(lines: &[&str]) -> TestHost {
    let mut host = TestHost::new();
    host.queue_inputs(lines.iter().copied());
    host
}

#[test]
fn test_get_then_logs() {
    let cluster = Rc::new(MockApi::new());
    cluster.push_list(vec![pod("default", "web")]);
    cluster.push_logs("listening on :8080\n");
    let mut terminal = terminal(&["pods.get(\"default\")", "pods[0].logs"]);

    let mut repl = shell(cluster.clone());
    let reason = repl.run(&mut terminal).unwrap();
    assert_eq!(reason, ExitReason::Eof);
    assert_eq!(reason.exit_code(), 0);

    assert!(terminal.errors().is_empty());
    assert_eq!(
        terminal.output_with_style(OutputStyle::Normal),
        vec!["#<Pods namespace=\"default\" items=1>", "listening on :8080\n"]
    );

    let requests = cluster.log_calls();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, ItemIdentity::new("default", "web"));
    assert_eq!(requests[0].1.container.as_deref(), Some("app"));

    let mut engine = repl.into_evaluator();
    assert_eq!(engine.eval("pods.length").unwrap().as_deref(), Some("1"));
}

#[test]
fn test_failed_get_leaves_pods_unfetched() {
    let cluster = Rc::new(MockApi::new());
    cluster.push_error("Failed to list pods: connection refused");
    let mut terminal = terminal(&["pods.get(\"default\")", "pods.length"]);

    let mut repl = shell(cluster);
    let reason = repl.run(&mut terminal).unwrap();
    assert_eq!(reason, ExitReason::Eof);

    assert_eq!(
        terminal.errors(),
        vec![format!("{}Failed to list pods: connection refused", ERROR_PREFIX)]
    );
    // The loop kept reading after the failure
    assert_eq!(terminal.output_with_style(OutputStyle::Normal), vec!["0"]);
    assert_eq!(terminal.prompts().len(), 3);

    let mut engine = repl.into_evaluator();
    assert_eq!(
        engine.eval("pods").unwrap().as_deref(),
        Some("#<Pods (not fetched)>")
    );
}

#[test]
fn test_failed_logs_raise_one_error() {
    let cluster = Rc::new(MockApi::new());
    cluster.push_list(vec![pod("default", "web")]);
    cluster.push_log_error("container \"app\" is waiting to start");
    let mut terminal = terminal(&["pods.get()", "let out = pods.logs; out"]);

    let mut repl = shell(cluster);
    repl.run(&mut terminal).unwrap();

    assert_eq!(
        terminal.errors(),
        vec![format!(
            "{}container \"app\" is waiting to start",
            ERROR_PREFIX
        )]
    );
    assert_eq!(terminal.output_with_style(OutputStyle::Normal).len(), 1);
}

#[test]
fn test_index_past_end_is_reported() {
    let cluster = Rc::new(MockApi::new());
    cluster.push_list(vec![pod("default", "web")]);
    let mut terminal = terminal(&["pods.get();", "pods[1]", "pods[-1]", "pods.length"]);

    let mut repl = shell(cluster);
    repl.run(&mut terminal).unwrap();

    assert_eq!(
        terminal.errors(),
        vec![
            format!("{}index 1 out of range for Pods with 1 items", ERROR_PREFIX),
            format!("{}index -1 out of range for Pods with 1 items", ERROR_PREFIX),
        ]
    );
    assert_eq!(terminal.output_with_style(OutputStyle::Normal), vec!["1"]);
}

#[test]
fn test_quit_skips_evaluation() {
    let cluster = Rc::new(MockApi::new());
    let mut terminal = terminal(&["  exit  ", "pods.get()"]);

    let mut repl = shell(cluster.clone());
    let reason = repl.run(&mut terminal).unwrap();

    assert_eq!(reason, ExitReason::UserExit);
    assert_eq!(reason.exit_code(), 0);
    assert!(terminal.output().is_empty());
    assert!(cluster.list_calls().is_empty());
}

#[test]
fn test_interrupt_then_continue() {
    let cluster = Rc::new(MockApi::new());
    let mut terminal = TestHost::new();
    terminal.queue_input("pods.get(\\");
    terminal.queue_signal(Signal::Interrupt);
    terminal.queue_input("namespace()");

    let mut repl = shell(cluster);
    let reason = repl.run(&mut terminal).unwrap();

    assert_eq!(reason, ExitReason::Eof);
    assert_eq!(terminal.output_with_style(OutputStyle::Info), vec![INTERRUPT_HINT]);
    assert_eq!(terminal.output_with_style(OutputStyle::Normal), vec!["default"]);
}

#[test]
fn test_read_failure_exits_non_zero() {
    let cluster = Rc::new(MockApi::new());
    let mut terminal = TestHost::new();
    terminal.queue_failure("stdin closed");
    terminal.queue_input("namespace()");

    let mut repl = shell(cluster);
    let reason = repl.run(&mut terminal).unwrap();

    assert_eq!(reason, ExitReason::InputFailure);
    assert_eq!(reason.exit_code(), 1);
    assert!(terminal.output_with_style(OutputStyle::Normal).is_empty());
    assert!(terminal.has_pending_input());
}

#[test]
fn test_namespace_switch_shows_in_prompt_state() {
    let cluster = Rc::new(MockApi::new());
    cluster.push_list(vec![pod("kube-system", "dns")]);
    let mut terminal = terminal(&["use_namespace(\"kube-system\");", "pods.get().namespace"]);

    let mut repl = shell(cluster.clone());
    repl.run(&mut terminal).unwrap();

    assert_eq!(repl.evaluator().namespace(), "kube-system");
    assert_eq!(
        terminal.output_with_style(OutputStyle::Normal),
        vec!["kube-system"]
    );
    assert_eq!(cluster.list_calls()[0].scope, "kube-system");
}
