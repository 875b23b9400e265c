//! ANSI SGR color codes used to colorize transcript output.

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[92m";
pub const YELLOW: &str = "\x1b[33m";
pub const BLUE: &str = "\x1b[94m";
pub const RESET: &str = "\x1b[0m";

/// Wrap `text` in `color`/reset, unless colorization is disabled.
pub fn colorize(enabled: bool, color: &str, text: &str) -> String {
    if enabled {
        format!("{color}{text}{RESET}")
    } else {
        text.to_string()
    }
}

/// Color for an HTTP status code, per the response status-class table.
pub fn status_color(code: u16) -> &'static str {
    match code {
        200..=299 => GREEN,
        300..=499 => YELLOW,
        _ => RED,
    }
}
