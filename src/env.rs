use std::{cell::RefCell, ffi::OsStr};

use miette::{bail, Result};

use crate::memory::Memory;

/// Largest memory accepted from `SIMPLETRON_MEMORY`.
pub const MAX_MEMORY_SIZE: usize = 10_000;

#[derive(Clone, Copy)]
struct Env {
    memory_size: usize,
    trace: bool,
}

thread_local! {
    /// Must only be mutated within `set_env`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

pub fn init() -> Result<()> {
    let value = Env {
        memory_size: memory_size_var("SIMPLETRON_MEMORY")?,
        trace: var_is("SIMPLETRON_TRACE", "1"),
    };
    set_env(value);
    Ok(())
}

/// Amount of memory cells given to the processor.
pub fn memory_size() -> usize {
    with_env(|env| env.memory_size)
}

/// Print registers and memory before every cycle of `run`.
pub fn is_trace_enabled() -> bool {
    with_env(|env| env.trace)
}

fn set_env(value: Env) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        let env = env.borrow();
        let env = env.unwrap_or_else(|| {
            panic!("tried to access environment state before initialization");
        });
        callback(&env)
    })
}

fn var_is(name: impl AsRef<OsStr>, value: impl AsRef<str>) -> bool {
    std::env::var(name.as_ref()).is_ok_and(|v| v == value.as_ref())
}

fn memory_size_var(name: &str) -> Result<usize> {
    let Ok(value) = std::env::var(name) else {
        return Ok(Memory::DEFAULT_SIZE);
    };
    match value.trim().parse::<usize>() {
        Ok(size) if (1..=MAX_MEMORY_SIZE).contains(&size) => Ok(size),
        _ => bail!(
            code = "env::memory_size",
            help = format!("set {name} to a whole number between 1 and {MAX_MEMORY_SIZE}"),
            "Invalid memory size '{value}'"
        ),
    }
}
