//! Name- and content-based heuristics for disguised payloads

use regex::bytes::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Bytes of leading content searched for embedded markup
pub const CONTENT_WINDOW: usize = 8 * 1024;

/// Extensions rejected regardless of content: native executables, server-side
/// scripts and markup that can carry script
const DANGEROUS_EXTENSIONS: &[&str] = &[
    // Native executables and installers
    "exe", "dll", "com", "scr", "msi", "bat", "cmd", "pif", "cpl", "sys", "app", "deb", "rpm",
    "bin", "so", "dylib", "elf",
    // Shell and interpreted scripts
    "sh", "bash", "zsh", "ps1", "psm1", "vbs", "vbe", "wsf", "js", "jse", "jar", "py", "pl",
    "rb", "cgi", "lua",
    // Server-side templates
    "php", "php3", "php4", "php5", "php7", "phtml", "phar", "asp", "aspx", "ashx", "jsp", "jspx",
    // Markup evaluated by browsers
    "svg", "svgz", "html", "htm", "xhtml", "shtml", "hta",
];

static EMBEDDED_SCRIPT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)<script|javascript:|vbscript:|\bon(?:load|error|click|dblclick|mouseover|mouseout|mousedown|mouseup|focus|blur|submit|change|input|keydown|keyup|keypress|abort|unload|resize|toggle|animationstart|pageshow)\s*=|<iframe|<embed|<object|\beval\s*\(|<\?php",
    )
    .map_err(|e| tracing::error!(error = %e, "Failed to compile embedded script pattern"))
    .ok()
});

/// Server-side extensions that web servers may still execute when followed by
/// another extension, as in `shell.php.jpg`
const SERVER_SCRIPT_EXTENSIONS: &[&str] = &[
    "php", "php3", "php4", "php5", "php7", "phtml", "phar", "asp", "aspx", "ashx", "jsp", "jspx",
    "cgi",
];

/// Dangerous extension carried by the name
///
/// The final extension is checked against the full list. Inner segments only
/// count when they are server-side script extensions, so `example.com.png` passes
/// while `shell.php.jpg` does not.
pub fn dangerous_extension(filename: &str) -> Option<String> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let segments: Vec<String> = name
        .split('.')
        .skip(1)
        .map(|segment| segment.trim().to_lowercase())
        .collect();
    let (last, inner) = segments.split_last()?;

    inner
        .iter()
        .find(|segment| SERVER_SCRIPT_EXTENSIONS.contains(&segment.as_str()))
        .or_else(|| DANGEROUS_EXTENSIONS.contains(&last.as_str()).then_some(last))
        .cloned()
}

/// Distinct script-like markers in the first [`CONTENT_WINDOW`] bytes, lower-cased
pub fn embedded_scripts(data: &[u8]) -> Vec<String> {
    let Some(pattern) = EMBEDDED_SCRIPT.as_ref() else {
        return Vec::new();
    };
    let window = &data[..data.len().min(CONTENT_WINDOW)];

    pattern
        .find_iter(window)
        .map(|m| {
            String::from_utf8_lossy(m.as_bytes())
                .to_lowercase()
                .split_whitespace()
                .collect::<String>()
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Executable format named by the leading bytes, whatever the declared type
pub fn executable_header(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(b"MZ") {
        return Some("Windows PE");
    }
    if data.starts_with(b"\x7fELF") {
        return Some("ELF");
    }
    match data.get(..4)? {
        [0xFE, 0xED, 0xFA, 0xCE]
        | [0xFE, 0xED, 0xFA, 0xCF]
        | [0xCE, 0xFA, 0xED, 0xFE]
        | [0xCF, 0xFA, 0xED, 0xFE] => Some("Mach-O"),
        [0xCA, 0xFE, 0xBA, 0xBE] => Some("Mach-O universal"),
        _ => None,
    }
}
