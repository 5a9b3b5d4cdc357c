//! Pattern-based parser for tincd log output
//!
//! Extracts peer connection changes from tincd's stderr using regex patterns

use regex::Regex;

/// Peer-relevant events found in a log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// A meta connection to a peer finished authentication
    Activated { name: String, address: String },

    /// A meta connection to a peer was closed
    Closed { name: String, address: String },

    /// The daemon finished initialisation
    Ready,

    /// Anything else
    Other,
}

/// Parser for tincd log lines
pub struct OutputParser {
    /// Pattern for "Connection with alpha (10.0.0.2 port 655) activated"
    activated_pattern: Regex,
    /// Pattern for "Closing connection with alpha (10.0.0.2 port 655)"
    closing_pattern: Regex,
    /// Pattern for "Ready"
    ready_pattern: Regex,
}

impl OutputParser {
    /// Create a new OutputParser with compiled regex patterns
    pub fn new() -> Self {
        Self {
            activated_pattern: Regex::new(r"Connection with (\S+) \(([^)]*)\) activated")
                .expect("Failed to compile activated pattern"),
            closing_pattern: Regex::new(r"Closing connection with (\S+) \(([^)]*)\)")
                .expect("Failed to compile closing pattern"),
            ready_pattern: Regex::new(r"^(?:\S+\s+)*Ready$")
                .expect("Failed to compile ready pattern"),
        }
    }

    /// Parse one log line
    pub fn parse_line(&self, line: &str) -> PeerEvent {
        let line = line.trim();

        if let Some(captures) = self.activated_pattern.captures(line) {
            return PeerEvent::Activated {
                name: captures[1].to_string(),
                address: captures[2].to_string(),
            };
        }

        if let Some(captures) = self.closing_pattern.captures(line) {
            return PeerEvent::Closed {
                name: captures[1].to_string(),
                address: captures[2].to_string(),
            };
        }

        if self.ready_pattern.is_match(line) {
            return PeerEvent::Ready;
        }

        PeerEvent::Other
    }
}

impl Default for OutputParser {
    fn default() -> Self {
        Self::new()
    }
}
