// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Default configuration file location.

use std::path::PathBuf;

const CONFIG_FILE: &str = "config.json";

/// `$XDG_CONFIG_HOME/printdown/config.json`, falling back to
/// `~/.config/printdown/config.json`.  `None` when neither variable is set.
pub fn default_config_path() -> Option<PathBuf> {
    config_path_from(|key| std::env::var(key).ok())
}

fn config_path_from<F>(lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let base = match lookup("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        Some(xdg) => PathBuf::from(xdg),
        None => PathBuf::from(lookup("HOME")?).join(".config"),
    };
    Some(base.join("printdown").join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xdg_takes_precedence() {
        let path = config_path_from(|key| match key {
            "XDG_CONFIG_HOME" => Some("/etc/xdg".into()),
            "HOME" => Some("/home/pos".into()),
            _ => None,
        });
        assert_eq!(path, Some(PathBuf::from("/etc/xdg/printdown/config.json")));
    }

    #[test]
    fn home_fallback() {
        let path = config_path_from(|key| (key == "HOME").then(|| "/home/pos".to_string()));
        assert_eq!(
            path,
            Some(PathBuf::from("/home/pos/.config/printdown/config.json"))
        );
    }

    #[test]
    fn no_environment_no_path() {
        assert_eq!(config_path_from(|_| None), None);
    }
}
