//! File kind classification and human-readable sizes.

use std::path::Path;

use indexfo_protocol::FileKind;

/// Binary size units, smallest first.
const SIZE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Classify a file by the extension of `name`.
///
/// Matching is case-insensitive on the last extension. Names without a
/// known extension are [`FileKind::Generic`].
pub fn classify(name: &str) -> FileKind {
    let ext = match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return FileKind::Generic,
    };

    match ext.as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" | "svg" | "ico" | "tif" | "tiff"
        | "avif" | "heic" => FileKind::Image,
        "pdf" | "doc" | "docx" | "ppt" | "pptx" | "xls" | "xlsx" | "odt" | "ods" | "odp"
        | "rtf" | "epub" => FileKind::Document,
        "txt" | "md" | "json" | "xml" | "csv" | "log" | "yaml" | "yml" | "toml" | "ini" => {
            FileKind::Text
        }
        "rs" | "py" | "js" | "ts" | "c" | "h" | "cpp" | "hpp" | "go" | "java" | "kt" | "rb"
        | "php" | "sh" | "html" | "htm" | "css" | "sql" | "lua" | "swift" => FileKind::Code,
        "zip" | "rar" | "7z" | "tar" | "gz" | "tgz" | "bz2" | "xz" | "zst" => FileKind::Archive,
        "mp4" | "avi" | "mkv" | "mov" | "wmv" | "webm" | "flv" | "m4v" => FileKind::Video,
        "mp3" | "wav" | "flac" | "aac" | "ogg" | "m4a" | "opus" | "wma" => FileKind::Audio,
        "exe" | "msi" | "dmg" | "deb" | "rpm" | "appimage" | "apk" => FileKind::Executable,
        _ => FileKind::Generic,
    }
}

/// Format a byte count with 1024-based units.
///
/// Counts below 1 KB print as whole bytes. Larger values are rounded to two
/// decimals with trailing zeros removed; a value that rounds up to 1024 of a
/// unit moves to the next unit.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let mut rounded = (value * 100.0).round() / 100.0;
    if rounded >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        rounded = (rounded / 1024.0 * 100.0).round() / 100.0;
        unit += 1;
    }

    let text = format!("{:.2}", rounded);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", text, SIZE_UNITS[unit])
}
