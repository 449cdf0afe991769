//! Reply text for finished external jobs.

use crate::{ExecutionOutput, ExternalError};

/// Longest code-execution response (excluding the `nick: ` prefix).
pub const MAX_EXECUTION_REPLY_CHARS: usize = 322;

const TRUNCATION_SUFFIX: &str = "... (result truncated)";
const CPU_LIMIT_REPLY: &str = "Your code exceeded set CPU limits";

pub fn render_publish_reply(speaker: &str, result: &Result<String, ExternalError>) -> String {
    match result {
        Ok(url) => format!("{speaker}: Post published! Check it out at {url}"),
        Err(error) => format!("{speaker}: I couldn't publish that ({error})"),
    }
}

/// Flattens sandbox output into one line: stderr wins over stdout, tabs are
/// dropped, blank lines removed, and lines joined with `, `.
pub fn render_execution_reply(
    speaker: &str,
    result: &Result<ExecutionOutput, ExternalError>,
    cpu_limit_marker: &str,
) -> String {
    let raw = match result {
        Ok(output) if output.stderr.is_empty() => output.stdout.clone(),
        Ok(output) if !cpu_limit_marker.is_empty() && output.stderr.starts_with(cpu_limit_marker) => {
            CPU_LIMIT_REPLY.to_string()
        }
        Ok(output) => format!("Error: {}", output.stderr),
        Err(ExternalError::TimedOut(_)) => return render_execution_timeout_reply(speaker),
        Err(error) => format!("Error: {error}"),
    };

    let flattened = raw
        .replace('\t', "")
        .split('\n')
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    format!("{speaker}: {}", truncate_response(&flattened))
}

pub fn render_execution_timeout_reply(speaker: &str) -> String {
    format!("{speaker}: Your code timed out")
}

fn truncate_response(response: &str) -> String {
    if response.chars().count() <= MAX_EXECUTION_REPLY_CHARS {
        return response.to_string();
    }
    let keep = MAX_EXECUTION_REPLY_CHARS - TRUNCATION_SUFFIX.chars().count();
    let mut truncated = response.chars().take(keep).collect::<String>();
    truncated.push_str(TRUNCATION_SUFFIX);
    truncated
}
