/// Startup handshake on standard input.
///
/// When SLIME launches a backend itself it pipes a setup form into the
/// process, shaped like
/// `(progn ... (funcall (read-from-string "swank:start-server") "/path"))`,
/// and expects the server to drop its chosen port into that path. We read
/// one line, parse it with the wire reader, and pull the port-file path out
/// as the last element of the last sub-list. Anything unparseable falls
/// back to the command-line configuration.
use std::io::BufRead;
use std::path::PathBuf;
use swank_core::{read_str, unescape, Value};
use tracing::debug;

/// Read the setup line from standard input. Only called when stdin is not
/// a terminal.
pub fn read_setup_line() -> std::io::Result<String> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

/// Extract the port-file path from a setup form, if the line holds one.
pub fn port_file_from_setup_form(line: &str) -> Option<PathBuf> {
    let form = match read_str(line) {
        Ok(form) => form,
        Err(err) => {
            debug!("setup line did not parse: {err}");
            return None;
        }
    };
    let items = form.as_list()?;
    let last_sublist = items
        .iter()
        .rev()
        .find_map(|item| item.as_list())?;
    match last_sublist.last()? {
        Value::Str(path) => Some(PathBuf::from(unescape(path))),
        _ => None,
    }
}
