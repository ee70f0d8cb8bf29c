use std::fs;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use colored::Colorize;
use hotwatch::notify::Event;
use hotwatch::{
    blocking::{Flow, Hotwatch},
    EventKind,
};
use miette::{bail, IntoDiagnostic, Result};

use simpletron::{loader, Console, Debugger, DebuggerOptions, Output, Processor, Status};

/// Simpletron is a compiler and processor emulator for the Simpletron machine language.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.smp` file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run source `.smp` or compiled `.sml` file and output to terminal
    Run {
        /// `.smp` or `.sml` file to run
        name: PathBuf,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Run `.smp` or `.sml` file one instruction at a time
    Debug {
        /// `.smp` or `.sml` file to run
        name: PathBuf,
        /// Read debugger commands from argument
        #[arg(short, long)]
        command: Option<String>,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Create compiled `.sml` file to run later or view generated words
    Compile {
        /// `.smp` file to compile
        name: PathBuf,
        /// Destination to output `.sml` file
        dest: Option<PathBuf>,
    },
    /// Check a `.smp` file without running or writing output
    Check {
        /// File to check
        name: PathBuf,
    },
    /// Place a watch on a `.smp` file to receive constant compiler updates
    Watch {
        /// `.smp` file to watch
        name: PathBuf,
    },
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(simpletron::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;
    simpletron::env::init()?;

    let Some(command) = args.command else {
        if let Some(path) = args.path {
            return run(&path, None, false);
        }
        println!("\n~ simpletron v{VERSION} ~");
        println!("{SHORT_INFO}");
        return Ok(());
    };

    match command {
        Command::Run { name, minimal } => run(&name, None, minimal),
        Command::Debug {
            name,
            command,
            minimal,
        } => run(&name, Some(DebuggerOptions { command }), minimal),
        Command::Compile { name, dest } => {
            file_message(Green, "Compiling", &name);
            let contents = fs::read_to_string(&name).into_diagnostic()?;

            let start = Instant::now();
            let program = simpletron::compile(&contents)?;
            let elapsed = start.elapsed();

            let out_file_name = dest.unwrap_or_else(|| name.with_extension("sml"));
            let artifact = program.to_string();
            fs::write(&out_file_name, &artifact).into_diagnostic()?;

            message(Green, "Finished", &format!("compiled in {:.2?}", elapsed));
            file_message(Green, "Saved", &out_file_name);
            message(
                Cyan,
                "Size",
                &format!(
                    "{} bytes, {} words ({} instructions)",
                    artifact.len(),
                    program.len(),
                    program.instruction_count()
                ),
            );
            Ok(())
        }
        Command::Check { name } => {
            file_message(Green, "Checking", &name);
            let contents = fs::read_to_string(&name).into_diagnostic()?;
            simpletron::compile(&contents)?;
            message(Green, "Success", "no errors found!");
            Ok(())
        }
        Command::Watch { name } => {
            if !name.exists() {
                bail!("File does not exist. Exiting...")
            }
            // Vim breaks if watching a single file
            let folder_path = match name.parent() {
                Some(pth) if pth.is_dir() => pth.to_path_buf(),
                _ => Path::new(".").to_path_buf(),
            };

            // Clear screen and move cursor to top left
            print!("\x1B[2J\x1B[2;1H");
            file_message(Green, "Watching", &name);
            message(Cyan, "Help", "press CTRL+C to exit");

            let mut watcher =
                Hotwatch::new_with_custom_delay(Duration::from_millis(500)).into_diagnostic()?;

            watcher
                .watch(folder_path, move |event: Event| match event.kind {
                    // Watch remove for vim changes
                    EventKind::Modify(_) | EventKind::Remove(_) => {
                        print!("\x1B[2J\x1B[2;1H");
                        file_message(Green, "Watching", &name);
                        message(Green, "Re-checking", "file change detected");
                        message(Cyan, "Help", "press CTRL+C to exit");

                        // Makes reruns more obvious
                        sleep(Duration::from_millis(50));

                        let contents = match fs::read_to_string(&name) {
                            Ok(cts) => cts,
                            Err(e) => {
                                eprintln!("{e}. Exiting...");
                                std::process::exit(1)
                            }
                        };
                        match simpletron::compile(&contents) {
                            Ok(_) => message(Green, "Success", "no errors found!"),
                            Err(e) => println!("\n{:?}", e),
                        }
                        Flow::Continue
                    }
                    _ => Flow::Continue,
                })
                .into_diagnostic()?;
            watcher.run();
            Ok(())
        }
    }
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn message(color: MsgColor, left: &str, right: &str) {
    if Output::is_minimal() {
        return;
    }
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

fn run(name: &Path, debugger_opts: Option<DebuggerOptions>, minimal: bool) -> Result<()> {
    Output::set_minimal(minimal);

    let words = load(name)?;
    let mut processor = Processor::with_memory_size(
        simpletron::env::memory_size(),
        Console::new(minimal),
    );
    processor.load(words.iter().cloned()).into_diagnostic()?;

    message(MsgColor::Green, "Running", "loaded program");
    if let Some(opts) = debugger_opts {
        Debugger::new(opts, words)
            .run(&mut processor)
            .into_diagnostic()?;
    } else if simpletron::env::is_trace_enabled() {
        loop {
            let output = Output::Normal;
            output.print_registers(processor.registers());
            output.print_memory(processor.memory().cells());
            if processor.step().into_diagnostic()? == Status::Halted {
                break;
            }
        }
    } else {
        processor.run().into_diagnostic()?;
    }

    file_message(MsgColor::Green, "Completed", name);
    Ok(())
}

/// Compile source or read compiled words, depending on file extension.
fn load(name: &Path) -> Result<Vec<String>> {
    let Some(ext) = name.extension().and_then(|ext| ext.to_str()) else {
        bail!("File has no extension. Exiting...");
    };
    match ext {
        "sml" => {
            file_message(MsgColor::Green, "Loading", name);
            let contents = fs::read_to_string(name).into_diagnostic()?;
            loader::parse_words(&contents)
        }
        "smp" => {
            file_message(MsgColor::Green, "Compiling", name);
            let contents = fs::read_to_string(name).into_diagnostic()?;
            Ok(simpletron::compile(&contents)?.to_strings())
        }
        _ => bail!("File has unknown extension. Exiting..."),
    }
}

const SHORT_INFO: &str = r"
Welcome to simpletron, a compiler and processor emulator for the Simpletron machine language.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
