//! FTP Command parsing
//!
//! Splits raw control lines into verb and argument.

use std::borrow::Cow;

/// Split a control line into its upper-cased verb and trimmed argument.
///
/// The line terminator may or may not still be attached.
pub fn split_command_line(line: &str) -> (String, &str) {
    let trimmed = line.trim_end_matches(['\r', '\n']).trim_start();
    let mut parts = trimmed.splitn(2, ' ');
    let verb = parts.next().unwrap_or("").trim().to_ascii_uppercase();
    let arg = parts.next().unwrap_or("").trim();
    (verb, arg)
}

/// Control line suitable for logging, with PASS arguments masked
pub fn loggable_line(line: &str) -> Cow<'_, str> {
    let (verb, arg) = split_command_line(line);
    if verb == "PASS" && !arg.is_empty() {
        Cow::Borrowed("PASS ****")
    } else {
        Cow::Borrowed(line.trim_end_matches(['\r', '\n']))
    }
}
