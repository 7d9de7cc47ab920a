use serde::{Deserialize, Serialize};

/// Terminal session configuration.
///
/// Passed to `PtySession` at creation; the FFI layer accepts it as a JSON
/// string. Geometry and shell are explicit here so sessions stay testable
/// with alternate shells and sizes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Path to the shell executable.
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Arguments passed to the shell. `-l` gives a login shell.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    #[serde(default = "default_cols")]
    pub cols: u16,
    #[serde(default = "default_rows")]
    pub rows: u16,
    /// Value exported as `TERM` in the child environment.
    #[serde(default = "default_term")]
    pub term: String,
}

fn default_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "/bin/zsh".to_string())
}

fn default_args() -> Vec<String> {
    vec!["-l".to_string()]
}

fn default_cols() -> u16 {
    80
}

fn default_rows() -> u16 {
    24
}

fn default_term() -> String {
    "xterm-256color".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            args: default_args(),
            cols: default_cols(),
            rows: default_rows(),
            term: default_term(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.cols, 80);
        assert_eq!(config.rows, 24);
        assert_eq!(config.term, "xterm-256color");
        assert_eq!(config.args, vec!["-l".to_string()]);
        assert!(!config.shell.is_empty());
    }

    #[test]
    fn test_partial_json() {
        // FFI callers may send only the fields they care about
        let config: SessionConfig = serde_json::from_str(r#"{"cols": 120, "rows": 40}"#).unwrap();
        assert_eq!(config.cols, 120);
        assert_eq!(config.rows, 40);
        assert_eq!(config.term, "xterm-256color");
    }

    #[test]
    fn test_json_round_trip() {
        let config = SessionConfig {
            shell: "/bin/sh".to_string(),
            args: vec![],
            cols: 100,
            rows: 30,
            term: "xterm".to_string(),
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: SessionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.shell, "/bin/sh");
        assert_eq!(back.cols, 100);
    }
}
