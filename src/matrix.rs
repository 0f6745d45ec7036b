//! CI version-matrix generation
//!
//! Each ecosystem maps a declared version constraint onto the release lines a CI
//! matrix should exercise. Terraform, PHP and Swift share a table-driven policy
//! (supported lines, EOL clamp, fallback lists); Elixir and Scala use fixed
//! per-release windows.

/// Table-driven matrix policy for one ecosystem
#[derive(Debug, Clone, Copy)]
pub struct VersionPolicy {
    /// JSON key used in the matrix fragment, e.g. `terraform-version`
    pub key: &'static str,
    /// Supported release lines, ascending
    pub supported: &'static [&'static str],
    /// Used when the constraint cannot be interpreted or is newer than any known line
    pub recent: &'static [&'static str],
    /// Used when no constraint was declared
    pub when_empty: &'static [&'static str],
}

pub const TERRAFORM: VersionPolicy = VersionPolicy {
    key: "terraform-version",
    supported: &["1.5", "1.6", "1.7", "1.8", "1.9", "1.10"],
    recent: &["1.8", "1.9", "1.10"],
    when_empty: &["1.8", "1.9", "1.10"],
};

pub const PHP: VersionPolicy = VersionPolicy {
    key: "php-version",
    supported: &["8.1", "8.2", "8.3"],
    recent: &["8.1", "8.2", "8.3"],
    when_empty: &["8.1", "8.2", "8.3"],
};

pub const SWIFT: VersionPolicy = VersionPolicy {
    key: "swift-version",
    supported: &["5.9", "5.10", "5.11", "6.0", "6.1"],
    recent: &["5.10", "5.11", "6.0", "6.1"],
    when_empty: &["5.9", "5.10"],
};

impl VersionPolicy {
    /// Maps a constraint to the ascending, deduplicated list of lines to test.
    ///
    /// Floors older than the oldest supported line are clamped up to it.
    pub fn matrix(&self, constraint: &str) -> Vec<String> {
        if constraint.trim().is_empty() {
            return owned(self.when_empty);
        }

        let floor = match parse_major_minor(strip_operators(constraint)) {
            Some(floor) => floor,
            None => return owned(self.recent),
        };

        let mut lines: Vec<((u64, u64), &str)> = self
            .supported
            .iter()
            .filter_map(|line| parse_major_minor(line).map(|v| (v, *line)))
            .collect();
        lines.sort_by_key(|(v, _)| *v);
        lines.dedup_by_key(|(v, _)| *v);

        let selected: Vec<String> = lines
            .iter()
            .filter(|(v, _)| *v >= floor)
            .map(|(_, line)| line.to_string())
            .collect();

        if selected.is_empty() {
            owned(self.recent)
        } else {
            selected
        }
    }

    /// Matrix plus its JSON fragment
    pub fn matrix_with_json(&self, constraint: &str) -> (Vec<String>, String) {
        let versions = self.matrix(constraint);
        let json = matrix_json(self.key, &versions);
        (versions, json)
    }
}

pub fn terraform_matrix(constraint: &str) -> Vec<String> {
    TERRAFORM.matrix(constraint)
}

pub fn php_matrix(constraint: &str) -> Vec<String> {
    PHP.matrix(constraint)
}

pub fn swift_matrix(tools_version: &str) -> Vec<String> {
    SWIFT.matrix(tools_version)
}

/// Elixir: a three-release window around the declared minimum
pub fn elixir_matrix(requirement: &str) -> Vec<String> {
    let window: &[&str] = match parse_major_minor(strip_operators(requirement)) {
        Some((1, 16)) => &["1.16", "1.17"],
        Some((1, 15)) => &["1.15", "1.16", "1.17"],
        Some((1, 14)) => &["1.14", "1.15", "1.16"],
        Some((1, 13)) => &["1.13", "1.14", "1.15"],
        Some((1, 12)) => &["1.12", "1.13", "1.14"],
        _ => &["1.14", "1.15", "1.16"],
    };
    owned(window)
}

/// Scala: binary-compatible neighbours of the declared `scalaVersion`
pub fn scala_matrix(scala_version: &str) -> Vec<String> {
    let version = scala_version.trim();
    match parse_major_minor(version) {
        Some((3, _)) => owned(&["3.3", "3.4"]),
        Some((2, 13)) => owned(&["2.13"]),
        Some((2, 12)) => owned(&["2.12", "2.13"]),
        Some((2, 11)) => owned(&["2.11", "2.12"]),
        _ if version.is_empty() => Vec::new(),
        _ => vec![version.to_string()],
    }
}

/// Wraps every entry in double quotes
pub fn quote_strings(items: &[String]) -> Vec<String> {
    items.iter().map(|item| format!("\"{}\"", item)).collect()
}

/// Renders `{"<key>": ["a", "b"]}` for embedding in generated workflow config
pub fn matrix_json(key: &str, versions: &[String]) -> String {
    format!("{{\"{}\": [{}]}}", key, quote_strings(versions).join(", "))
}

/// Removes leading comparison operators and keeps the first constraint term
pub fn strip_operators(constraint: &str) -> &str {
    let mut rest = constraint.trim();
    loop {
        let before = rest.len();
        for op in [">=", "<=", "~>", "==", "!=", ">", "<", "^", "~", "=", "v"] {
            if let Some(stripped) = rest.strip_prefix(op) {
                rest = stripped.trim_start();
                break;
            }
        }
        if rest.len() == before {
            break;
        }
    }

    let end = rest
        .find(|c: char| c == ',' || c == '|' || c.is_whitespace())
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Parses `major.minor` (patch and suffixes ignored); a bare major gives minor 0
pub fn parse_major_minor(version: &str) -> Option<(u64, u64)> {
    let mut parts = version.trim().split('.');
    let major = parts.next()?.parse::<u64>().ok()?;
    let minor = match parts.next() {
        Some(part) => {
            let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                return None;
            }
            digits.parse::<u64>().ok()?
        }
        None => 0,
    };
    Some((major, minor))
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    const ALL_TERRAFORM: &[&str] = &["1.5", "1.6", "1.7", "1.8", "1.9", "1.10"];

    #[parameterized(
        floor_1_5 = { ">= 1.5.0", ALL_TERRAFORM },
        eol_1_0 = { ">= 1.0.0", ALL_TERRAFORM },
        pessimistic_1_5 = { "~> 1.5.0", ALL_TERRAFORM },
        pessimistic_1_3 = { "~> 1.3", ALL_TERRAFORM },
        legacy_0_15 = { ">= 0.15.0", ALL_TERRAFORM },
        floor_1_8 = { ">=1.8", &["1.8", "1.9", "1.10"] },
        unknown = { ">= 99.0", &["1.8", "1.9", "1.10"] },
        empty = { "", &["1.8", "1.9", "1.10"] },
        garbage = { "latest", &["1.8", "1.9", "1.10"] },
    )]
    fn test_terraform_matrix(constraint: &str, expected: &[&str]) {
        assert_eq!(terraform_matrix(constraint), owned(expected));
    }

    #[parameterized(
        swift_5_9 = { "5.9", &["5.9", "5.10", "5.11", "6.0", "6.1"] },
        swift_5_7 = { "5.7", &["5.9", "5.10", "5.11", "6.0", "6.1"] },
        swift_5_5 = { "5.5", &["5.9", "5.10", "5.11", "6.0", "6.1"] },
        swift_5_10 = { "5.10", &["5.10", "5.11", "6.0", "6.1"] },
        unknown = { "99.0", &["5.10", "5.11", "6.0", "6.1"] },
        empty = { "", &["5.9", "5.10"] },
    )]
    fn test_swift_matrix(tools_version: &str, expected: &[&str]) {
        assert_eq!(swift_matrix(tools_version), owned(expected));
    }

    #[parameterized(
        caret_8_1 = { "^8.1", &["8.1", "8.2", "8.3"] },
        tilde_8_2 = { "~8.2", &["8.2", "8.3"] },
        floor_7_4 = { ">=7.4", &["8.1", "8.2", "8.3"] },
        union = { "^8.2 || ^8.3", &["8.2", "8.3"] },
        empty = { "", &["8.1", "8.2", "8.3"] },
    )]
    fn test_php_matrix(constraint: &str, expected: &[&str]) {
        assert_eq!(php_matrix(constraint), owned(expected));
    }

    #[parameterized(
        elixir_1_16 = { "~> 1.16", &["1.16", "1.17"] },
        elixir_1_15 = { "~> 1.15", &["1.15", "1.16", "1.17"] },
        elixir_1_14 = { ">= 1.14.0", &["1.14", "1.15", "1.16"] },
        elixir_1_13 = { "~> 1.13", &["1.13", "1.14", "1.15"] },
        elixir_1_12 = { "~> 1.12", &["1.12", "1.13", "1.14"] },
        other = { "~> 1.9", &["1.14", "1.15", "1.16"] },
    )]
    fn test_elixir_matrix(requirement: &str, expected: &[&str]) {
        assert_eq!(elixir_matrix(requirement), owned(expected));
    }

    #[parameterized(
        scala_3 = { "3.3.1", &["3.3", "3.4"] },
        scala_2_13 = { "2.13.12", &["2.13"] },
        scala_2_12 = { "2.12.18", &["2.12", "2.13"] },
        scala_2_11 = { "2.11.12", &["2.11", "2.12"] },
        other = { "2.10.7", &["2.10.7"] },
    )]
    fn test_scala_matrix(version: &str, expected: &[&str]) {
        assert_eq!(scala_matrix(version), owned(expected));
    }

    #[test]
    fn test_quote_strings() {
        let input = owned(&["1.5", "1.6", "1.7"]);
        assert_eq!(quote_strings(&input), vec!["\"1.5\"", "\"1.6\"", "\"1.7\""]);
    }

    #[test]
    fn test_matrix_json_is_valid_json() {
        let (versions, json) = TERRAFORM.matrix_with_json("");
        assert_eq!(json, r#"{"terraform-version": ["1.8", "1.9", "1.10"]}"#);

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["terraform-version"].as_array().unwrap().len(), versions.len());
    }

    #[test]
    fn test_strip_operators() {
        assert_eq!(strip_operators(">= 1.5.0"), "1.5.0");
        assert_eq!(strip_operators("~> 1.3"), "1.3");
        assert_eq!(strip_operators("^8.1|^8.2"), "8.1");
        assert_eq!(strip_operators(">= 1.0, < 2.0"), "1.0");
        assert_eq!(strip_operators("v5.9"), "5.9");
    }

    #[test]
    fn test_parse_major_minor() {
        assert_eq!(parse_major_minor("1.10"), Some((1, 10)));
        assert_eq!(parse_major_minor("8"), Some((8, 0)));
        assert_eq!(parse_major_minor("1.5.0-beta"), Some((1, 5)));
        assert_eq!(parse_major_minor("1.x"), None);
        assert_eq!(parse_major_minor("latest"), None);
    }
}
