mod common;

use common::{TestEnv, DEAD_NODE};
use predicates::prelude::*;
use predicates::str::contains;

#[test]
fn no_subcommand_prints_help() {
    let env = TestEnv::new();
    env.cmd()
        .assert()
        .success()
        .stdout(contains("Usage"))
        .stdout(contains("listWallets"))
        .stdout(contains("geolocProfiles"))
        .stdout(contains(
            "current node: 'https://g1v1.p2p.legal/gva', current pod: 'https://g1.data.e-is.pro'.",
        ));
    assert!(env.ephemeral_keys().is_empty());
}

#[test]
fn version_flag_prints_the_package_version() {
    let env = TestEnv::new();
    env.cmd()
        .arg("-v")
        .assert()
        .success()
        .stdout(predicate::str::diff(format!("{}\n", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn first_run_seeds_the_settings_file() {
    let env = TestEnv::new();
    assert!(!env.settings_file().exists());
    env.cmd().arg("--version").assert().success();
    let seeded = std::fs::read_to_string(env.settings_file()).expect("settings seeded");
    assert!(seeded.contains("duniter"));
    assert!(seeded.contains("esnode"));
}

#[test]
fn environment_overrides_backend_addresses() {
    let env = TestEnv::new();
    env.cmd()
        .env("DUNITER", "http://ledger.test/")
        .env("ESNODE", "http://pod.test")
        .assert()
        .success()
        .stdout(contains(
            "current node: 'http://ledger.test/gva', current pod: 'http://pod.test'.",
        ));
}

#[test]
fn missing_keyfile_fails_before_any_network_call() {
    let env = TestEnv::new();
    env.cmd()
        .args(["-k", "/nowhere/me.dunikey", "-n", DEAD_NODE, "balance"])
        .assert()
        .code(1)
        .stderr(contains("The keyfile "))
        .stderr(contains("me.dunikey is not found."))
        .stderr(contains("127.0.0.1").not());
    assert!(env.ephemeral_keys().is_empty());
}

#[test]
fn keyfile_is_found_relative_to_home() {
    let env = TestEnv::new();
    std::fs::create_dir_all(env.home.join("keys")).expect("mkdir");
    std::fs::write(env.home.join("keys/me.dunikey"), "Type: PubSec\npub: nope\n")
        .expect("write keyfile");
    // Found under $HOME; the bogus pubkey is rejected before any request.
    env.cmd()
        .args(["-k", "/keys/me.dunikey", "-n", DEAD_NODE, "balance"])
        .assert()
        .code(1)
        .stderr(contains("invalid public key: nope"));
}

#[test]
fn backend_failure_exits_one_and_removes_the_throwaway_key() {
    let env = TestEnv::new();
    env.cmd()
        .args(["-n", DEAD_NODE, "listWallets", "-m"])
        .assert()
        .code(1)
        .stderr(contains("Failed to retrieve the list:"));
    assert!(env.ephemeral_keys().is_empty());
}

#[test]
fn single_dash_legacy_flags_are_accepted() {
    let env = TestEnv::new();
    env.cmd()
        .args(["-n", DEAD_NODE, "listWallets", "-nm", "-b"])
        .assert()
        .code(1)
        .stderr(contains("Failed to retrieve the list:"));
}

#[test]
fn broken_settings_only_block_real_commands() {
    let env = TestEnv::new();
    let settings = env.settings_file();
    std::fs::create_dir_all(settings.parent().expect("settings dir")).expect("mkdir");
    std::fs::write(&settings, "duniter = [\n").expect("write settings");

    env.cmd()
        .assert()
        .success()
        .stdout(contains("Usage"))
        .stderr(contains("settings unavailable"));
    env.cmd().arg("-v").assert().success();
    env.cmd()
        .args(["-n", DEAD_NODE, "listWallets"])
        .assert()
        .code(1)
        .stderr(contains("invalid settings file"));
}

#[test]
fn send_refuses_before_prompting() {
    let env = TestEnv::new();
    env.cmd()
        .args(["-n", DEAD_NODE, "send", "-d", "someone"])
        .write_stdin("My title\nMy body\n")
        .assert()
        .code(1)
        .stderr(contains("does not support"))
        .stderr(contains("Enter the message").not());
}

#[test]
fn geolocation_failure_exits_one() {
    let env = TestEnv::new();
    env.cmd()
        .args(["-n", DEAD_NODE, "geolocProfiles"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty());
    assert!(env.ephemeral_keys().is_empty());
}

#[test]
fn signing_commands_report_unsupported() {
    let env = TestEnv::new();
    for args in [
        vec!["erase"],
        vec!["pay", "-a", "1"],
        vec!["stars", "-p", "someone", "-n", "4"],
        vec!["send", "-d", "someone", "-t", "T", "-m", "M"],
    ] {
        env.cmd()
            .args(["-n", DEAD_NODE])
            .args(&args)
            .assert()
            .code(1)
            .stderr(contains("does not support"));
    }
    assert!(env.ephemeral_keys().is_empty());
}

#[test]
fn public_identifier_skips_key_generation() {
    let env = TestEnv::new();
    env.cmd()
        .args(["-n", DEAD_NODE, "history", "-p", "not-a-key"])
        .assert()
        .code(1)
        .stderr(contains("invalid public key: not-a-key"));
    assert!(env.ephemeral_keys().is_empty());
}

#[test]
fn usage_errors_exit_two() {
    let env = TestEnv::new();
    env.cmd().arg("send").assert().code(2);
    env.cmd().args(["balance", "-k", "x.dunikey"]).assert().code(2);
    env.cmd().arg("nosuchcommand").assert().code(2);
    env.cmd().args(["set", "--position", "1.0"]).assert().code(2);
}
