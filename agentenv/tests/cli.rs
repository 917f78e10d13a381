//! CLI tests: spawn the `agentenv` binary against scratch workspaces.

use std::process::Command;

use agentenv::exit_codes;
use agentenv::io::config::{EnvConfig, config_path, load_config, write_config};
use agentenv::test_support::TestWorkspace;
use agentenv::tree::FileSystemTree;

fn agentenv(ws: &TestWorkspace) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_agentenv"));
    cmd.arg("--root").arg(ws.path());
    cmd
}

fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

#[test]
fn init_writes_default_config() {
    let ws = TestWorkspace::new().expect("workspace");
    let status = agentenv(&ws).arg("init").status().expect("agentenv init");
    assert_eq!(status.code(), Some(exit_codes::OK));
    let cfg = load_config(&config_path(ws.path())).expect("load");
    assert_eq!(cfg, EnvConfig::default());
}

#[test]
fn tree_prints_requested_node_as_json() {
    let ws = TestWorkspace::new().expect("workspace");
    ws.write("src/app.py", "a = 1\nb = 2\n").expect("seed");

    let output = agentenv(&ws)
        .args(["tree", "--path", "src/app.py"])
        .output()
        .expect("agentenv tree");
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let node: FileSystemTree = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(
        node,
        FileSystemTree::file("src/app.py", vec!["a = 1".to_string(), "b = 2".to_string()])
    );
}

#[test]
fn tree_with_unknown_path_is_invalid() {
    let ws = TestWorkspace::new().expect("workspace");
    let status = agentenv(&ws)
        .args(["tree", "--path", "nope.py"])
        .status()
        .expect("agentenv tree");
    assert_eq!(status.code(), Some(exit_codes::INVALID));
}

#[test]
fn lint_file_with_findings_exits_with_findings_code() {
    let ws = TestWorkspace::new().expect("workspace");
    let mut cfg = EnvConfig::default();
    cfg.linter.init_command = Vec::new();
    cfg.linter.file_command = sh("printf \"%s:3:1 F821 undefined name 'x'\\n\" \"$1\"; exit 1");
    write_config(&config_path(ws.path()), &cfg).expect("config");

    let output = agentenv(&ws)
        .args(["lint", "b.py"])
        .output()
        .expect("agentenv lint");
    assert_eq!(output.status.code(), Some(exit_codes::LINT_FINDINGS));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "b.py:3:1 F821 undefined name 'x'\n"
    );
}

#[test]
fn run_prints_command_output() {
    let ws = TestWorkspace::new().expect("workspace");
    let output = agentenv(&ws)
        .args(["run", "echo from-shell", "--timeout-ms", "5000"])
        .output()
        .expect("agentenv run");
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "from-shell\n");
}
