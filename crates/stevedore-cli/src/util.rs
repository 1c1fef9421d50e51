//! Shared utility functions for CLI commands

use stevedore_core::Labels;

use crate::error::{CliError, Result};

/// Format a byte size as a human-readable string
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Safely truncate a hash string to a maximum length
#[must_use]
pub fn truncate_hash(hash: &str, max_len: usize) -> &str {
    let end = hash.len().min(max_len);
    &hash[..end]
}

/// Parse `key=value` label arguments, keeping their order
pub fn parse_labels(args: &[String]) -> Result<Labels> {
    let mut labels = Labels::new();
    for arg in args {
        let (key, value) = arg
            .split_once('=')
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| CliError::input(format!("invalid label '{}', expected key=value", arg)))?;
        labels.insert(key.to_string(), value.to_string());
    }
    Ok(labels)
}

/// Render labels as `k=v,k=v`
pub fn format_labels(labels: &Labels) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5242880), "5.00 MB");
        assert_eq!(format_size(1073741824), "1.00 GB");
    }

    #[test]
    fn test_truncate_hash() {
        assert_eq!(truncate_hash("abcdef1234567890", 8), "abcdef12");
        assert_eq!(truncate_hash("abc", 16), "abc");
    }

    #[test]
    fn test_parse_labels() {
        let labels = parse_labels(&["purpose=runtime".to_string(), "empty=".to_string()]).unwrap();
        assert_eq!(format_labels(&labels), "purpose=runtime,empty=");

        assert!(parse_labels(&["novalue".to_string()]).is_err());
        assert!(parse_labels(&["=value".to_string()]).is_err());
    }
}
