//! Thin binary wrapper: wires `env_logger`, a `rustyline` editor, and the
//! `freqgen_console` library's [`App`] together into the read-eval-print
//! loop. All dispatch logic lives in the library so integration tests can
//! drive it without a terminal.

use freqgen_console::{default_store_path, dispatch, App};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

fn main() {
    env_logger::init();

    let mut app = App::new(default_store_path());
    app.boot();

    let mut editor = DefaultEditor::new().expect("failed to initialize line editor");
    loop {
        match editor.readline("ESP32> ") {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                dispatch(&mut app, &line);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                println!("Internal error: {e}");
                break;
            }
        }
    }
}
