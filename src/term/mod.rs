use ansi_term::{Colour, Style};
use clu::lang::{open_brackets, Error, IncludeDir, Level};
use clu::mach::{Config, Output, Runtime};
use linefeed::{Interface, ReadResult};
use std::path::Path;
use std::sync::atomic::Ordering;
use tracing_subscriber::EnvFilter;

const PROMPT: &str = "> ";
const CONTINUE: &str = ". ";

pub fn main() {
    let filter = EnvFilter::try_from_env("CLU_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::default();
    let mut script = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            let path = match args.next() {
                Some(path) => path,
                None => return usage(),
            };
            config = match Config::load(&path) {
                Ok(config) => config,
                Err(error) => {
                    eprintln!("{}: {}", path, error);
                    std::process::exit(2);
                }
            };
        } else if arg.starts_with('-') || script.is_some() {
            return usage();
        } else {
            script = Some(arg);
        }
    }

    let mut runtime = Runtime::with_config(config);
    let interrupted = runtime.interrupt_handle();
    if let Err(error) = ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst)) {
        eprintln!("{}", error);
    }

    let result = match script {
        Some(path) => run_file(&mut runtime, &path),
        None => main_loop(&mut runtime),
    };
    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(error) => {
            eprintln!("{}", error);
            std::process::exit(2);
        }
    }
}

fn usage() {
    eprintln!("usage: clu [--config FILE] [SCRIPT]");
    std::process::exit(2);
}

fn run_file(runtime: &mut Runtime, path: &str) -> std::io::Result<bool> {
    let path = Path::new(path);
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy().to_string(),
        None => return Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no script file")),
    };
    runtime.set_includes(IncludeDir::new(dir));
    let mut out = std::io::stdout();
    if runtime.insert_file(&name, 0).is_ok() {
        let _ = runtime.run();
    }
    report(runtime, &mut out)?;
    Ok(!runtime.errors().has_failures())
}

fn main_loop(runtime: &mut Runtime) -> std::io::Result<bool> {
    let interface = Interface::new("clu")?;
    let mut out = std::io::stdout();
    let mut pending = String::new();
    loop {
        let prompt = if pending.is_empty() { PROMPT } else { CONTINUE };
        interface.set_prompt(prompt)?;
        let line = match interface.read_line()? {
            ReadResult::Input(line) => line,
            ReadResult::Signal(_) | ReadResult::Eof => break,
        };
        if !pending.is_empty() {
            pending.push('\n');
        }
        pending.push_str(&line);
        if open_brackets(&pending) > 0 {
            continue;
        }
        let text = std::mem::take(&mut pending);
        if text.trim().is_empty() {
            continue;
        }
        interface.add_history_unique(text.clone());
        runtime.interrupt_handle().store(false, Ordering::SeqCst);
        let _ = runtime.enter(&text);
        report(runtime, &mut out)?;
    }
    Ok(true)
}

/// Print the output records and diagnostics gathered since the last call.
fn report<W: std::io::Write>(runtime: &mut Runtime, out: &mut W) -> std::io::Result<()> {
    for output in runtime.take_output() {
        writeln!(out, "{}", decorate_output(&output))?;
    }
    for error in runtime.errors_mut().take() {
        writeln!(out, "{}", decorate_error(&error))?;
    }
    out.flush()
}

fn decorate_output(output: &Output) -> String {
    let mut s = format!("{} {}{}", output.name, output.relation, output.value);
    if !output.info.is_empty() {
        let info = format!("  [{} {}]", output.type_name, output.info);
        s.push_str(&Style::new().dimmed().paint(info).to_string());
    }
    s
}

fn decorate_error(error: &Error) -> String {
    let style = match error.level() {
        Level::Fatal | Level::Error => Colour::Red.bold(),
        Level::Warning => Colour::Yellow.normal(),
        Level::Internal => Style::new().dimmed(),
    };
    style.paint(error.to_string()).to_string()
}
