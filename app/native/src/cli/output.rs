//! CLI output formatting utilities.
//!
//! - Status tables
//! - JSON syntax highlighting
//! - Fire outcomes

use std::time::{SystemTime, UNIX_EPOCH};

use colored::Colorize;
use tabled::settings::object::Columns;
use tabled::settings::{Modify, Style, Width};
use tabled::{Table, Tabled};

/// Prints JSON with syntax highlighting.
///
/// Keys are cyan, strings green, numbers yellow, booleans and null magenta.
pub fn print_highlighted_json(value: &serde_json::Value) {
    println!("{}", highlight_json(value));
}

/// Renders `value` as pretty-printed, colorized JSON.
#[must_use]
pub fn highlight_json(value: &serde_json::Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value, 0);
    out
}

fn write_value(out: &mut String, value: &serde_json::Value, depth: usize) {
    use serde_json::Value;

    match value {
        Value::Null => out.push_str(&"null".magenta().to_string()),
        Value::Bool(b) => out.push_str(&b.to_string().magenta().to_string()),
        Value::Number(n) => out.push_str(&n.to_string().yellow().to_string()),
        Value::String(s) => out.push_str(&quote(s).green().to_string()),
        Value::Array(items) if items.is_empty() => out.push_str("[]"),
        Value::Object(map) if map.is_empty() => out.push_str("{}"),
        Value::Array(items) => {
            out.push_str(&"[".bold().to_string());
            for (i, item) in items.iter().enumerate() {
                open_line(out, i, depth + 1);
                write_value(out, item, depth + 1);
            }
            close_line(out, depth, "]");
        }
        Value::Object(map) => {
            out.push_str(&"{".bold().to_string());
            for (i, (key, item)) in map.iter().enumerate() {
                open_line(out, i, depth + 1);
                out.push_str(&quote(key).cyan().to_string());
                out.push_str(": ");
                write_value(out, item, depth + 1);
            }
            close_line(out, depth, "}");
        }
    }
}

fn open_line(out: &mut String, index: usize, depth: usize) {
    if index > 0 {
        out.push(',');
    }
    out.push('\n');
    out.push_str(&"  ".repeat(depth));
}

fn close_line(out: &mut String, depth: usize, bracket: &str) {
    out.push('\n');
    out.push_str(&"  ".repeat(depth));
    out.push_str(&bracket.bold().to_string());
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

/// One row of the status table.
#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Prints a status report returned by the daemon as a table.
pub fn print_status(data: &serde_json::Value) {
    let scheduler = &data["scheduler"];
    let credentials = &data["credentials"];
    let mut rows = Vec::new();

    if scheduler.is_null() {
        rows.push(StatusRow { field: "Scheduler", value: "busy changing wallpaper".yellow().to_string() });
    } else {
        rows.push(StatusRow { field: "Phase", value: json_str(&scheduler["phase"]) });
        rows.push(StatusRow { field: "Interval", value: json_str(&scheduler["interval"]).bold().to_string() });
        rows.push(StatusRow {
            field: "Next change",
            value: scheduler["nextFireUnixTime"]
                .as_f64()
                .map_or_else(|| "as soon as possible".to_string(), format_next_fire),
        });
        rows.push(StatusRow {
            field: "Retry owed",
            value: format_bool(scheduler["lastFailureWasConnectivity"].as_bool().unwrap_or(false)),
        });
        rows.push(StatusRow {
            field: "Wallpaper",
            value: scheduler["lastWallpaperPath"].as_str().unwrap_or("-").to_string(),
        });
    }

    let status = json_str(&credentials["status"]);
    let status = match status.as_str() {
        "valid" => status.green().to_string(),
        "validating" | "unknown" => status.yellow().to_string(),
        _ => status.red().to_string(),
    };
    rows.push(StatusRow { field: "Access key", value: status });
    rows.push(StatusRow {
        field: "Active key",
        value: credentials["activeCredential"].as_str().unwrap_or("-").to_string(),
    });

    let connectivity = json_str(&data["connectivity"]);
    rows.push(StatusRow {
        field: "Network",
        value: if connectivity == "connected" {
            connectivity.green().to_string()
        } else {
            connectivity.red().to_string()
        },
    });

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::last()).with(Width::truncate(60).suffix("…")))
        .to_string();

    println!("{}", "Backdrop".bold());
    println!("{table}");

    if let Some(message) = data["message"].as_str() {
        println!("{} {message}", "!".yellow().bold());
    }
}

/// Prints the result of an out-of-band wallpaper change.
pub fn print_fire_outcome(data: &serde_json::Value) {
    match data["result"].as_str() {
        Some("applied") => {
            println!("{} {}", "Wallpaper changed:".green(), data["path"].as_str().unwrap_or_default());
        }
        Some("deferred") => println!("{}", "Offline, the change will run when the network returns.".yellow()),
        _ => println!("{} {}", "Error:".red(), data["message"].as_str().unwrap_or("unknown failure")),
    }
}

fn json_str(value: &serde_json::Value) -> String { value.as_str().unwrap_or("-").to_string() }

fn format_next_fire(deadline: f64) -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0.0, |d| d.as_secs_f64());
    format!("in {}", format_remaining(deadline - now))
}

/// Formats a number of seconds as a short human readable span.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_remaining(secs: f64) -> String {
    if !secs.is_finite() || secs <= 0.0 {
        return "moments".to_string();
    }

    let total = secs.round() as u64;
    let (days, hours, minutes, seconds) = (total / 86_400, (total % 86_400) / 3600, (total % 3600) / 60, total % 60);

    match (days, hours, minutes) {
        (0, 0, 0) => format!("{seconds}s"),
        (0, 0, m) => format!("{m}m {seconds}s"),
        (0, h, m) => format!("{h}h {m}m"),
        (d, h, _) => format!("{d}d {h}h"),
    }
}

/// Formats a boolean as a colored string.
#[must_use]
pub fn format_bool(value: bool) -> String {
    if value {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}
