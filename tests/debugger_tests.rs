use assert_cmd::Command;
use predicates::str::{contains, diff};

fn debug(commands: &str) -> Command {
    let mut cmd = Command::cargo_bin("simpletron").unwrap();
    cmd.env_remove("SIMPLETRON_MEMORY")
        .env_remove("SIMPLETRON_TRACE")
        .arg("debug")
        .arg("tests/files/add.smp")
        .arg("--minimal")
        .arg("--command")
        .arg(commands);
    cmd
}

#[test]
fn continues_to_halt() {
    debug("continue")
        .assert()
        .success()
        .stdout(diff("8\n"))
        .stderr(contains("Executed 5 instructions."))
        .stderr(contains("Program halted."));
}

#[test]
fn steps_and_prints_registers() {
    debug("step;registers;step 2;registers;continue")
        .assert()
        .success()
        .stdout(diff("8\n"))
        .stderr(contains("ACC 5\nPC 01\nIR 2005\nOP LOAD\nOPERAND 05\n"))
        .stderr(contains("ACC 8\nPC 03\nIR 2107\nOP STORE\nOPERAND 07\n"));
}

#[test]
fn empty_command_steps_once() {
    debug(";;registers;quit")
        .assert()
        .success()
        .stdout(diff(""))
        .stderr(contains("ACC 8\nPC 02\n"))
        .stderr(contains("Stopped before program completion."));
}

#[test]
fn prints_memory() {
    debug("memory;continue")
        .assert()
        .success()
        .stderr(contains("00 2005\n01 3006\n"))
        .stderr(contains("07 0\n"));
}

#[test]
fn end_of_commands_continues() {
    debug("step").assert().success().stdout(diff("8\n"));
}

#[test]
fn reset_reloads_program() {
    debug("step 3;reset;registers;continue")
        .assert()
        .success()
        .stdout(diff("8\n"))
        .stderr(contains("Reset program to initial state."))
        .stderr(contains("ACC 0\nPC 00\nIR ----\n"));
}

#[test]
fn reports_bad_commands() {
    debug("jump 3;step 0;continue")
        .assert()
        .success()
        .stdout(diff("8\n"))
        .stderr(contains("Not a command: `jump`."))
        .stderr(contains("Step count must be a positive integer, not `0`."));
}

#[test]
fn prints_help_message() {
    debug("help;quit")
        .assert()
        .success()
        .stderr(contains(include_str!("../src/debugger/help.txt")));
}

#[test]
fn reads_commands_from_stdin() {
    let mut cmd = Command::cargo_bin("simpletron").unwrap();
    cmd.env_remove("SIMPLETRON_MEMORY")
        .env_remove("SIMPLETRON_TRACE")
        .arg("debug")
        .arg("tests/files/sum.smp")
        .arg("--minimal")
        .write_stdin("step 4\nregisters\nquit\n")
        .assert()
        .success()
        .stdout(diff("30\n"))
        .stderr(contains("ACC 30\nPC 04\n"));
}
