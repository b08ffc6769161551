//! Browser launching and search URL construction.

use crate::{Error, Result};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

pub const YOUTUBE_URL: &str = "https://www.youtube.com";
pub const GOOGLE_URL: &str = "https://www.google.com";
pub const GITHUB_URL: &str = "https://github.com";

const SEARCH_TEMPLATE: &str = "https://www.google.com/search?q=";
const VIDEO_SEARCH_TEMPLATE: &str = "https://www.youtube.com/results?search_query=";

/// Something that can show a URL to the user.
pub trait Browser {
    fn open(&self, url: &str) -> Result<()>;
}

/// Opens URLs with the platform's default handler.
pub struct SystemBrowser;

impl SystemBrowser {
    pub fn new() -> Self {
        Self
    }

    fn command(url: &str) -> Command {
        if cfg!(target_os = "macos") {
            let mut cmd = Command::new("open");
            cmd.arg(url);
            cmd
        } else if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", "", url]);
            cmd
        } else {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(url);
            cmd
        }
    }
}

impl Default for SystemBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        tracing::info!(%url, "opening browser");
        spawn_reaped(Self::command(url))
            .map(|_| ())
            .map_err(|e| Error::Browser(format!("failed to launch browser for {}: {}", url, e)))
    }
}

/// Starts `cmd` with its output discarded and waits for it on a helper thread,
/// so the opener never lingers as a zombie.
fn spawn_reaped(mut cmd: Command) -> std::io::Result<JoinHandle<Option<ExitStatus>>> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(thread::spawn(move || child.wait().ok()))
}

/// Percent-encodes a query for a URL, using `+` for spaces.
pub fn encode_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|word| urlencoding::encode(word).into_owned())
        .collect::<Vec<_>>()
        .join("+")
}

pub fn build_search_url(query: &str) -> String {
    format!("{}{}", SEARCH_TEMPLATE, encode_query(query))
}

pub fn build_video_search_url(query: &str) -> String {
    format!("{}{}", VIDEO_SEARCH_TEMPLATE, encode_query(query))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_uses_plus_for_spaces() {
        assert_eq!(
            build_search_url("rust borrow checker"),
            "https://www.google.com/search?q=rust+borrow+checker"
        );
    }

    #[test]
    fn video_search_url() {
        assert_eq!(
            build_video_search_url("lofi beats"),
            "https://www.youtube.com/results?search_query=lofi+beats"
        );
    }

    #[test]
    fn reserved_characters_are_escaped() {
        assert_eq!(encode_query("c++ & rust?"), "c%2B%2B+%26+rust%3F");
    }

    #[test]
    fn repeated_spaces_collapse() {
        assert_eq!(encode_query("  a   b "), "a+b");
    }

    #[cfg(unix)]
    #[test]
    fn launched_opener_is_waited_for() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "exit 3"]);
        let status = spawn_reaped(cmd).unwrap().join().unwrap();
        assert_eq!(status.and_then(|s| s.code()), Some(3));
    }

    #[test]
    fn missing_opener_is_an_error() {
        assert!(spawn_reaped(Command::new("/nonexistent/opener")).is_err());
    }
}
