//! Default SWANK operation handlers.

use crate::protocol::{Session, CODING_SYSTEMS, PROTOCOL_VERSION};
use crate::registry::{HandlerError, HandlerResult};
use crate::value::Value;
use crate::writer::{self, plist};

/// Operations accepted but answered with `nil`. SLIME tolerates a `nil`
/// reply for all of these; real implementations can override any entry
/// through the registry.
pub const STUB_OPS: &[&str] = &[
    "swank_apropos_list_for_emacs",
    "swank_autodoc",
    "swank_buffer_first_change",
    "swank_compile_file_for_emacs",
    "swank_compile_string_for_emacs",
    "swank_completions",
    "swank_create_repl",
    "swank_debug_thread",
    "swank_describe_function",
    "swank_describe_symbol",
    "swank_disassemble",
    "swank_eval_and_grab_output",
    "swank_eval_in_frame",
    "swank_frame_call",
    "swank_frame_locals",
    "swank_frame_source_loc",
    "swank_fuzzy_completions",
    "swank_init_inspector",
    "swank_inspect",
    "swank_inspect_in_frame",
    "swank_inspect_nth_part",
    "swank_inspector_nth_action",
    "swank_inspector_pop",
    "swank_inspector_range",
    "swank_interrupt",
    "swank_invoke_abort",
    "swank_invoke_continue",
    "swank_invoke_nth_restart_for_emacs",
    "swank_invoke_restart",
    "swank_kill_thread",
    "swank_list_threads",
    "swank_load_file",
    "swank_macroexpand",
    "swank_macroexpand_all",
    "swank_op_arglist",
    "swank_operator_arglist",
    "swank_profile_report",
    "swank_profile_reset",
    "swank_profile_substring",
    "swank_profiled_functions",
    "swank_quit_inspector",
    "swank_quit_lisp",
    "swank_require",
    "swank_return_string",
    "swank_set_break",
    "swank_set_package",
    "swank_swank_require",
    "swank_throw_toplevel",
    "swank_toggle_profile",
    "swank_toggle_trace",
    "swank_undefine_function",
    "swank_unprofile_all",
    "swank_untrace_all",
    "swank_xref",
];

fn str_arg<'a>(args: &'a [Value], index: usize) -> Result<&'a str, HandlerError> {
    match args.get(index) {
        Some(Value::Str(s)) => Ok(s),
        Some(_) => Err(HandlerError::BadArgument(index, "string")),
        None => Err(HandlerError::MissingArgument(index)),
    }
}

/// `swank:connection-info`: the property list SLIME uses to set up the
/// session: process id, coding systems, implementation identity, machine
/// identity, package and prompt, protocol version.
pub fn connection_info(session: &Session, _args: &[Value]) -> HandlerResult {
    let info = session.evaluator.implementation();
    let host = sysinfo::System::host_name().unwrap_or_else(|| "localhost".to_string());
    let ip = session
        .local_addr
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let machine = std::env::consts::ARCH.to_uppercase();

    Ok(plist([
        (":pid", Value::Int(i64::from(std::process::id()))),
        (":style", Value::Nil),
        (
            ":encoding",
            plist([(
                ":coding-systems",
                Value::List(CODING_SYSTEMS.iter().map(Value::string).collect()),
            )]),
        ),
        (
            ":lisp-implementation",
            plist([
                (":type", Value::string(&info.kind)),
                (":name", Value::string(&info.name)),
                (":version", Value::string(&info.version)),
                (":program", Value::from(info.program.clone())),
            ]),
        ),
        (
            ":machine",
            plist([
                (":instance", Value::string(format!("{host} [{ip}]"))),
                (":type", Value::string(&machine)),
                (":version", Value::string(&machine)),
            ]),
        ),
        (
            ":package",
            plist([
                (":name", Value::string(&info.package)),
                (":prompt", Value::string(&info.prompt)),
            ]),
        ),
        (":version", Value::string(PROTOCOL_VERSION)),
    ]))
}

/// Evaluation family: `swank:interactive-eval`,
/// `swank:interactive-eval-region`, `swank:pprint-eval`, `swank:eval`.
/// One string argument, evaluated as host source; the display text comes
/// back as a string. Escapes are resolved before the evaluator sees the
/// source, since string contents are stored wire-raw.
pub fn interactive_eval(session: &Session, args: &[Value]) -> HandlerResult {
    let source = writer::unescape(str_arg(args, 0)?);
    let text = session.evaluator.eval(&source)?;
    Ok(Value::string(&text))
}

/// `swank:simple-completions`: `((candidates ...) common-prefix)`. The second
/// wire argument (the package) is ignored.
pub fn simple_completions(session: &Session, args: &[Value]) -> HandlerResult {
    let prefix = str_arg(args, 0)?;
    let matches = session.evaluator.complete(prefix);
    let common = if matches.is_empty() {
        prefix.to_string()
    } else {
        longest_common_prefix(&matches)
    };
    Ok(Value::List(vec![
        Value::List(matches.iter().map(Value::string).collect()),
        Value::string(&common),
    ]))
}

fn longest_common_prefix(items: &[String]) -> String {
    let mut prefix = items[0].clone();
    for item in &items[1..] {
        let common = prefix
            .chars()
            .zip(item.chars())
            .take_while(|(a, b)| a == b)
            .count();
        prefix.truncate(prefix.chars().take(common).map(char::len_utf8).sum());
    }
    prefix
}
