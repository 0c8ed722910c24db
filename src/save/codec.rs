//! File name codec
//!
//! Maps a [`SaveIdentity`] to and from its on-disk file name:
//!
//! ```text
//! {nickname}_{ticks}{extension}      e.g. AutoSave_637671744000000000.sav.json
//! ```
//!
//! Decoding is greedy on the nickname. Extensions are not allowed to contain
//! `_`, so the last `_<digits>` in front of the extension is always the
//! timestamp separator and nicknames that themselves end in `_<digits>`
//! still decode exactly.

use regex_lite::Regex;
use std::sync::LazyLock;

use super::error::{Result, SaveError};
use super::types::{SaveIdentity, Tick};

/// Characters that no mainstream filesystem accepts in an entry name
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Windows device names, reserved whatever extension follows them
const DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Longest nickname accepted, leaving room for the tick and extension
/// inside a 255 byte file name
pub const MAX_NICKNAME_LEN: usize = 200;

static FILE_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<nickname>.+)_(?P<ticks>[0-9]+)(?P<extension>\..*)$")
        .expect("file name pattern is valid")
});

/// Encodes an identity as a file name. Never fails.
pub fn encode(identity: &SaveIdentity) -> String {
    format!(
        "{}_{}{}",
        identity.nickname, identity.timestamp, identity.extension
    )
}

/// Decodes a file name back into an identity
///
/// Fails with [`SaveError::Format`] if the name is not
/// `{nickname}_{ticks}{extension}` or the tick does not fit in 64 bits.
pub fn decode(file_name: &str) -> Result<SaveIdentity> {
    let format_error = || SaveError::Format {
        file_name: file_name.to_string(),
    };

    let captures = FILE_NAME_PATTERN
        .captures(file_name)
        .ok_or_else(format_error)?;

    let ticks = captures["ticks"]
        .parse::<u64>()
        .map_err(|_| format_error())?;

    Ok(SaveIdentity {
        nickname: captures["nickname"].to_string(),
        timestamp: Tick::new(ticks),
        extension: captures["extension"].to_string(),
    })
}

fn is_device_name(stem: &str) -> bool {
    let stem = stem.trim_end_matches(' ');
    DEVICE_NAMES.iter().any(|device| device.eq_ignore_ascii_case(stem))
}

/// Checks that a nickname can safely be embedded in a file name
///
/// A nickname never ends the file name (`_{ticks}{extension}` follows it),
/// so a trailing `.` or space is harmless. Windows does refuse any name
/// whose part before the first `.` is a device name, which a nickname such
/// as `NUL.backup` would produce.
///
/// Returns the nickname unchanged when valid.
pub fn validate_nickname(nickname: &str) -> Result<&str> {
    let invalid = |reason| SaveError::InvalidNickname {
        nickname: nickname.to_string(),
        reason,
    };

    if nickname.trim().is_empty() {
        return Err(invalid("nickname is empty"));
    }
    if nickname.len() > MAX_NICKNAME_LEN {
        return Err(invalid("nickname is too long"));
    }
    if nickname.chars().any(char::is_control) {
        return Err(invalid("nickname contains control characters"));
    }
    if nickname.contains(RESERVED_CHARS) {
        return Err(invalid("nickname contains characters reserved by the filesystem"));
    }
    if nickname
        .split_once('.')
        .is_some_and(|(stem, _)| is_device_name(stem))
    {
        return Err(invalid("nickname starts with a reserved device name"));
    }

    Ok(nickname)
}

/// Checks that an extension starts with '.' and decodes unambiguously
pub fn validate_extension(extension: &str) -> Result<&str> {
    let invalid = |reason| SaveError::InvalidExtension {
        extension: extension.to_string(),
        reason,
    };

    if !extension.starts_with('.') {
        return Err(invalid("extension must start with '.'"));
    }
    if extension.len() < 2 {
        return Err(invalid("extension is empty"));
    }
    if extension.contains('_') {
        return Err(invalid("extension may not contain '_'"));
    }
    if extension
        .chars()
        .any(|c| c.is_control() || c.is_whitespace() || RESERVED_CHARS.contains(&c))
    {
        return Err(invalid("extension contains characters reserved by the filesystem"));
    }
    if extension.ends_with('.') {
        return Err(invalid("extension may not end with '.'"));
    }

    Ok(extension)
}

/// Directory listing pattern matching every save of one nickname
///
/// The pattern also matches longer nicknames sharing the prefix, so
/// callers must still compare decoded nicknames.
pub fn search_pattern(nickname: &str, extension: &str) -> String {
    format!("{nickname}_*{extension}")
}
