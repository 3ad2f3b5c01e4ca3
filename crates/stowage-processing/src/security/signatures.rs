//! Magic-byte detection over the leading bytes of a file
//!
//! This is a heuristic, not full sniffing: content that matches nothing here
//! yields `None`, which callers must read as "no opinion".

/// Number of leading bytes examined
pub const SIGNATURE_WINDOW: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Jpeg,
    Png,
    Gif,
    WebP,
    Avif,
    Heic,
    Bmp,
    Tiff,
    Ico,
    Pdf,
    Zip,
    Gzip,
    /// ISO-BMFF video/audio (mp4, mov, m4a)
    IsoMedia,
    Wav,
    Avi,
    Ebml,
    Mp3,
}

impl FileKind {
    pub fn name(self) -> &'static str {
        match self {
            FileKind::Jpeg => "jpeg",
            FileKind::Png => "png",
            FileKind::Gif => "gif",
            FileKind::WebP => "webp",
            FileKind::Avif => "avif",
            FileKind::Heic => "heic",
            FileKind::Bmp => "bmp",
            FileKind::Tiff => "tiff",
            FileKind::Ico => "ico",
            FileKind::Pdf => "pdf",
            FileKind::Zip => "zip",
            FileKind::Gzip => "gzip",
            FileKind::IsoMedia => "iso-media",
            FileKind::Wav => "wav",
            FileKind::Avi => "avi",
            FileKind::Ebml => "matroska/webm",
            FileKind::Mp3 => "mp3",
        }
    }
}

/// Plain prefix signatures
const PREFIXES: &[(&[u8], FileKind)] = &[
    (&[0xFF, 0xD8, 0xFF], FileKind::Jpeg),
    (&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A], FileKind::Png),
    (b"GIF87a", FileKind::Gif),
    (b"GIF89a", FileKind::Gif),
    (b"BM", FileKind::Bmp),
    (&[0x49, 0x49, 0x2A, 0x00], FileKind::Tiff),
    (&[0x4D, 0x4D, 0x00, 0x2A], FileKind::Tiff),
    (&[0x00, 0x00, 0x01, 0x00], FileKind::Ico),
    (b"%PDF-", FileKind::Pdf),
    (&[0x50, 0x4B, 0x03, 0x04], FileKind::Zip),
    (&[0x50, 0x4B, 0x05, 0x06], FileKind::Zip),
    (&[0x1F, 0x8B], FileKind::Gzip),
    (&[0x1A, 0x45, 0xDF, 0xA3], FileKind::Ebml),
    (b"ID3", FileKind::Mp3),
    (&[0xFF, 0xFB], FileKind::Mp3),
    (&[0xFF, 0xF3], FileKind::Mp3),
];

/// Detect the file type from its leading bytes
pub fn detect(data: &[u8]) -> Option<FileKind> {
    let window = &data[..data.len().min(SIGNATURE_WINDOW)];

    // RIFF container: "RIFF" <size:4> <form type:4>
    if window.len() >= 12 && &window[0..4] == b"RIFF" {
        return match &window[8..12] {
            b"WEBP" => Some(FileKind::WebP),
            b"WAVE" => Some(FileKind::Wav),
            b"AVI " => Some(FileKind::Avi),
            _ => None,
        };
    }

    // ISO-BMFF: <box size:4> "ftyp" <major brand:4>
    if window.len() >= 12 && &window[4..8] == b"ftyp" {
        return Some(match &window[8..12] {
            b"avif" | b"avis" => FileKind::Avif,
            b"heic" | b"heix" | b"hevc" | b"mif1" | b"msf1" => FileKind::Heic,
            _ => FileKind::IsoMedia,
        });
    }

    PREFIXES
        .iter()
        .find(|(magic, _)| window.starts_with(magic))
        .map(|(_, kind)| *kind)
}

/// Signatures a file with this extension may carry; `None` for unknown extensions
pub fn expected_for_extension(extension: &str) -> Option<&'static [FileKind]> {
    let kinds: &'static [FileKind] = match extension {
        "jpg" | "jpeg" | "jpe" => &[FileKind::Jpeg],
        "png" => &[FileKind::Png],
        "gif" => &[FileKind::Gif],
        "webp" => &[FileKind::WebP],
        "avif" => &[FileKind::Avif],
        "heic" | "heif" => &[FileKind::Heic],
        "bmp" => &[FileKind::Bmp],
        "tif" | "tiff" => &[FileKind::Tiff],
        "ico" => &[FileKind::Ico],
        "pdf" => &[FileKind::Pdf],
        "zip" | "docx" | "xlsx" | "pptx" => &[FileKind::Zip],
        "gz" | "tgz" => &[FileKind::Gzip],
        "mp4" | "m4v" | "m4a" | "mov" => &[FileKind::IsoMedia],
        "wav" => &[FileKind::Wav],
        "avi" => &[FileKind::Avi],
        "webm" | "mkv" => &[FileKind::Ebml],
        "mp3" => &[FileKind::Mp3],
        _ => return None,
    };
    Some(kinds)
}
