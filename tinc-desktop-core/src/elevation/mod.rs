//! Privilege elevation
//!
//! Chooses how a command line gets re-run with administrator rights, and
//! whether that is needed at all.

use tracing::debug;

/// Graphical sudo front-ends, tried in order before falling back to sudo
pub const GRAPHICAL_FRONTENDS: &[&str] = &["gksu", "gksudo", "kdesu", "kdesudo"];

/// Fallback elevation tool on Linux and BSDs
pub const DEFAULT_TOOL: &str = "sudo";

/// Platform strategy wrapping a command line for elevated execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elevation {
    /// Run the command unchanged
    None,
    /// Graphical sudo front-end if one is installed, else `sudo`
    Sudo,
    /// `osascript ... with administrator privileges`
    AppleScript,
    /// `runas /user:administrator`
    RunAs,
}

impl Elevation {
    /// Strategy for the platform this binary was built for
    pub fn detect() -> Self {
        if cfg!(target_os = "macos") {
            Elevation::AppleScript
        } else if cfg!(windows) {
            Elevation::RunAs
        } else {
            Elevation::Sudo
        }
    }

    /// Wrap `args` (program first) probing the search path for tools
    pub fn wrap(&self, args: &[String]) -> Vec<String> {
        self.wrap_with(args, |tool| which::which(tool).is_ok())
    }

    /// Wrap `args` using `probe` to decide whether a tool is installed
    pub fn wrap_with<F>(&self, args: &[String], probe: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        match self {
            Elevation::None => args.to_vec(),
            Elevation::Sudo => {
                let mut wrapped = Vec::with_capacity(args.len() + 2);
                match GRAPHICAL_FRONTENDS.iter().find(|&&tool| probe(tool)) {
                    Some(tool) => {
                        debug!("Elevating with {}", tool);
                        wrapped.push(tool.to_string());
                        // front-ends take the command after a separator
                        wrapped.push("--".to_string());
                    }
                    None => {
                        debug!(
                            "No graphical front-end found, elevating with {}",
                            DEFAULT_TOOL
                        );
                        wrapped.push(DEFAULT_TOOL.to_string());
                    }
                }
                wrapped.extend(args.iter().cloned());
                wrapped
            }
            Elevation::AppleScript => {
                // `do shell script` hands the string to /bin/sh
                let script = format!(
                    "do shell script {} with administrator privileges",
                    quote(&join_shell_quoted(args))
                );
                vec!["osascript".to_string(), "-e".to_string(), script]
            }
            Elevation::RunAs => vec![
                "runas".to_string(),
                "/user:administrator".to_string(),
                quote(&join_quoted(args)),
            ],
        }
    }
}

/// Whether the spawner runs daemons in this process or in an elevated child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Already privileged: run the daemon in-process
    SameProcess,
    /// Not privileged: re-run this executable elevated
    SubProcess,
}

impl ExecutionMode {
    /// Decide from the privileges of the current process
    #[cfg(unix)]
    pub fn detect() -> Self {
        if nix::unistd::geteuid().is_root() {
            ExecutionMode::SameProcess
        } else {
            ExecutionMode::SubProcess
        }
    }

    /// Decide from the privileges of the current process
    ///
    /// The daemon brings its own elevation on Windows.
    #[cfg(not(unix))]
    pub fn detect() -> Self {
        ExecutionMode::SameProcess
    }
}

fn join_quoted(args: &[String]) -> String {
    args.iter()
        .map(|a| quote(a))
        .collect::<Vec<_>>()
        .join(" ")
}

fn join_shell_quoted(args: &[String]) -> String {
    args.iter()
        .map(|a| shell_quote(a))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Single-quote `s` for a POSIX shell, so nothing in it gets expanded
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Double-quote `s`, escaping backslashes and quotes
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Vec<String> {
        vec![
            "/usr/bin/tinc-desktop".to_string(),
            "--network".to_string(),
            "office".to_string(),
        ]
    }

    #[test]
    fn test_default_tool_without_frontends() {
        let wrapped = Elevation::Sudo.wrap_with(&args(), |_| false);
        assert_eq!(
            wrapped,
            vec!["sudo", "/usr/bin/tinc-desktop", "--network", "office"]
        );
    }

    #[test]
    fn test_first_frontend_wins() {
        let wrapped =
            Elevation::Sudo.wrap_with(&args(), |tool| tool == "kdesu" || tool == "gksudo");
        assert_eq!(
            wrapped,
            vec!["gksudo", "--", "/usr/bin/tinc-desktop", "--network", "office"]
        );
    }

    #[test]
    fn test_none_passes_through() {
        assert_eq!(Elevation::None.wrap_with(&args(), |_| true), args());
    }

    #[test]
    fn test_applescript_quotes_twice() {
        let wrapped =
            Elevation::AppleScript.wrap_with(&["/Apps/tinc desktop".to_string()], |_| false);
        assert_eq!(wrapped[0], "osascript");
        assert_eq!(wrapped[1], "-e");
        assert_eq!(
            wrapped[2],
            r#"do shell script "'/Apps/tinc desktop'" with administrator privileges"#
        );
    }

    #[test]
    fn test_applescript_keeps_shell_syntax_literal() {
        let args = vec![
            "echo".to_string(),
            "$(id -u)".to_string(),
            "`id -u`".to_string(),
            "$HOME".to_string(),
            "it's".to_string(),
        ];
        let wrapped = Elevation::AppleScript.wrap_with(&args, |_| false);
        assert_eq!(
            wrapped[2],
            r#"do shell script "'echo' '$(id -u)' '`id -u`' '$HOME' 'it'\\''s'" with administrator privileges"#
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_quote_survives_sh() {
        let args = vec![
            "printf".to_string(),
            "%s|".to_string(),
            "$(echo INJECTED)".to_string(),
            "`echo INJECTED`".to_string(),
            "a b".to_string(),
            "it's".to_string(),
        ];
        let output = std::process::Command::new("sh")
            .arg("-c")
            .arg(join_shell_quoted(&args))
            .output()
            .unwrap();
        assert_eq!(
            String::from_utf8_lossy(&output.stdout),
            "$(echo INJECTED)|`echo INJECTED`|a b|it's|"
        );
    }

    #[test]
    fn test_runas() {
        let wrapped = Elevation::RunAs
            .wrap_with(&["C:\\tinc.exe".to_string(), "-n".to_string()], |_| false);
        assert_eq!(
            wrapped,
            vec![
                "runas".to_string(),
                "/user:administrator".to_string(),
                r#""\"C:\\\\tinc.exe\" \"-n\"""#.to_string(),
            ]
        );
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote(r#"a"b\c"#), r#""a\"b\\c""#);
    }
}
