use regex::bytes::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

// CSI sequences: colors, cursor movement, erase.
#[allow(clippy::expect_used)]
static ANSI_CSI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]").expect("ANSI pattern is valid"));

/// Remove ANSI control sequences from terminal output.
///
/// Works per buffer: a sequence split across two writes is left as-is.
#[must_use]
pub fn strip_ansi(data: &[u8]) -> Cow<'_, [u8]> {
    ANSI_CSI.replace_all(data, &b""[..])
}
