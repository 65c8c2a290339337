//! Typed environment variable readers shared by the config sections.

use anyhow::{Context, Result};
use std::env;

pub fn parse_u32(key: &str, default: u32) -> Result<u32> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse::<u32>()
        .context(format!("Failed to parse {}", key))
}

pub fn parse_u64(key: &str, default: u64) -> Result<u64> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse::<u64>()
        .context(format!("Failed to parse {}", key))
}

pub fn parse_usize(key: &str, default: usize) -> Result<usize> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse::<usize>()
        .context(format!("Failed to parse {}", key))
}

pub fn parse_f64(key: &str, default: f64) -> Result<f64> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse::<f64>()
        .context(format!("Failed to parse {}", key))
}

pub fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .to_lowercase()
        .parse::<bool>()
        .unwrap_or(default)
}

/// Non-empty, trimmed value of `key`
pub fn optional_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
