//! System clipboard access through the platform's helper program.

use crate::domain::error::{FzfuiError, Result};
use crate::infrastructure::paths::find_in_path;
use crate::infrastructure::process::spawn_tool;
use std::io::Write;
use std::process::{Command, Stdio};

/// A clipboard helper program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardTool {
    /// macOS `pbcopy`.
    Pbcopy,
    /// X11 `xclip`.
    Xclip,
    /// X11 `xsel`.
    Xsel,
    /// Wayland `wl-copy`.
    WlCopy,
}

/// Linux helpers in order of preference.
const LINUX_TOOLS: [ClipboardTool; 3] = [
    ClipboardTool::Xclip,
    ClipboardTool::Xsel,
    ClipboardTool::WlCopy,
];

impl ClipboardTool {
    /// Program and arguments that read the clipboard contents from stdin.
    #[must_use]
    pub const fn argv(self) -> &'static [&'static str] {
        match self {
            Self::Pbcopy => &["pbcopy"],
            Self::Xclip => &["xclip", "-selection", "clipboard"],
            Self::Xsel => &["xsel", "--clipboard", "--input"],
            Self::WlCopy => &["wl-copy"],
        }
    }

    /// Picks the helper for `os` (as in [`std::env::consts::OS`]), asking
    /// `available` whether a program is installed.
    ///
    /// # Errors
    ///
    /// [`FzfuiError::Clipboard`] when no helper applies.
    ///
    /// ```
    /// use fzfui::clipboard::ClipboardTool;
    ///
    /// assert_eq!(ClipboardTool::detect("macos", |_| false)?, ClipboardTool::Pbcopy);
    /// assert_eq!(ClipboardTool::detect("linux", |p| p == "wl-copy")?, ClipboardTool::WlCopy);
    /// assert!(ClipboardTool::detect("windows", |_| true).is_err());
    /// # Ok::<(), fzfui::FzfuiError>(())
    /// ```
    pub fn detect<F>(os: &str, available: F) -> Result<Self>
    where
        F: Fn(&str) -> bool,
    {
        match os {
            "macos" => Ok(Self::Pbcopy),
            "linux" | "freebsd" | "openbsd" | "netbsd" => LINUX_TOOLS
                .into_iter()
                .find(|tool| available(tool.argv()[0]))
                .ok_or_else(|| {
                    FzfuiError::Clipboard(
                        "No clipboard tool found (install xclip, xsel, or wl-copy)".to_string(),
                    )
                }),
            other => Err(FzfuiError::Clipboard(format!(
                "Clipboard not supported on {other}"
            ))),
        }
    }

    /// Writes `text` to the clipboard with this helper.
    ///
    /// # Errors
    ///
    /// `ToolNotFound` if the helper vanished, `Clipboard` if it fails.
    pub fn copy(self, text: &str) -> Result<()> {
        let argv = self.argv();
        let mut command = Command::new(argv[0]);
        command
            .args(&argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        let mut child = spawn_tool(&mut command, argv[0])?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }
        let status = child.wait()?;
        if status.success() {
            tracing::debug!(tool = argv[0], bytes = text.len(), "copied to clipboard");
            Ok(())
        } else {
            Err(FzfuiError::Clipboard(format!("{} exited with {status}", argv[0])))
        }
    }
}

/// Copies `text` to the system clipboard.
///
/// # Errors
///
/// See [`ClipboardTool::detect`] and [`ClipboardTool::copy`].
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let search_path = std::env::var("PATH").ok();
    let tool = ClipboardTool::detect(std::env::consts::OS, |program| {
        find_in_path(program, search_path.as_deref()).is_some()
    })?;
    tool.copy(text)
}
