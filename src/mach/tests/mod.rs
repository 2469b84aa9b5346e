use crate::mach::Runtime;

mod exec_test;
mod loop_test;

fn run(text: &str) -> String {
    run_with(&mut Runtime::default(), text)
}

fn run_with(runtime: &mut Runtime, text: &str) -> String {
    let mut s = String::new();
    let _ = runtime.enter(text);
    for output in runtime.take_output() {
        s.push_str(&format!("{}\n", output));
    }
    for error in runtime.errors_mut().take() {
        s.push_str(&format!("{}\n", error));
    }
    s
}
