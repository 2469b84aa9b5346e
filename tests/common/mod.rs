use clu::mach::Runtime;

/// Output records and diagnostics gathered since the last call, one per
/// line.
pub fn exec(runtime: &mut Runtime) -> String {
    let mut s = String::new();
    for output in runtime.take_output() {
        s.push_str(&format!("{}\n", output));
    }
    for error in runtime.errors_mut().take() {
        s.push_str(&format!("{}\n", error));
    }
    s
}

/// Append `text` to the program, run it and gather what it printed.
pub fn enter(runtime: &mut Runtime, text: &str) -> String {
    let _ = runtime.enter(text);
    exec(runtime)
}

#[allow(dead_code)]
pub fn run(text: &str) -> String {
    enter(&mut Runtime::default(), text)
}
