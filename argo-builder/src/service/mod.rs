//! Service layer
//!
//! Services wrap the external tools a build run drives: the registry login
//! and the image build engine. The orchestrator only sees their traits, so
//! tests can substitute doubles without a container runtime.

mod build_engine;
mod registry_login;

use std::process::Output;

// Re-export traits
pub use build_engine::BuildEngine;
pub use registry_login::RegistryLogin;

// Re-export implementations and their types
pub use build_engine::{
    BuildArg, BuildRequest, DockerBuildEngine, EngineError, PublishedImage,
    build_args_from_secrets,
};
pub use registry_login::{CliRegistryLogin, LoginError};

/// Most process output carried in an error message
const MAX_ERROR_OUTPUT: usize = 4 * 1024;

/// Joins the trimmed stdout and stderr of a finished process
fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    [stdout.trim(), stderr.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Last `MAX_ERROR_OUTPUT` bytes of `text`, cut on a char boundary
fn output_tail(text: &str) -> String {
    if text.len() <= MAX_ERROR_OUTPUT {
        return text.to_string();
    }

    let mut start = text.len() - MAX_ERROR_OUTPUT;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_tail_keeps_short_output() {
        assert_eq!(output_tail("error: failed to solve"), "error: failed to solve");
    }

    #[test]
    fn test_output_tail_keeps_the_end() {
        let text = format!("{}ERROR: last line", "x".repeat(10 * MAX_ERROR_OUTPUT));

        let tail = output_tail(&text);

        assert!(tail.len() <= MAX_ERROR_OUTPUT + 3);
        assert!(tail.starts_with("..."));
        assert!(tail.ends_with("ERROR: last line"));
    }

    #[test]
    fn test_output_tail_respects_char_boundaries() {
        // 3-byte chars never line up with the cut point
        let text = "\u{20ac}".repeat(MAX_ERROR_OUTPUT);

        let tail = output_tail(&text);

        assert!(tail.len() <= MAX_ERROR_OUTPUT + 3);
        assert!(tail["...".len()..].chars().all(|c| c == '\u{20ac}'));
    }
}
