//! Policy-rule status probe, run once per project directory.

use crate::workspace::RuleStatus;

use super::run_capture;

pub fn probe(command: &[String], path: &str) -> Option<RuleStatus> {
    let output = run_capture(command, Some(path))?;
    parse_output(&output)
}

/// The tool prints a single word; only the first non-empty line counts.
pub fn parse_output(output: &str) -> Option<RuleStatus> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(RuleStatus::parse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_word() {
        assert_eq!(parse_output("hot\n"), Some(RuleStatus::Hot));
        assert_eq!(parse_output("\n  Cold  \nextra"), Some(RuleStatus::Cold));
        assert_eq!(parse_output("excluded"), Some(RuleStatus::Excluded));
        assert_eq!(parse_output("none"), Some(RuleStatus::None));
    }

    #[test]
    fn unknown_output_is_unset() {
        assert_eq!(parse_output(""), None);
        assert_eq!(parse_output("lukewarm"), None);
    }

    #[test]
    fn missing_tool_is_unset() {
        let command = vec!["definitely-not-a-real-rules-tool".to_string()];
        assert_eq!(probe(&command, "/"), None);
    }
}
