//! Binary-vs-text classification by path extension (spec.md §4.4).

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// The canonical list of binary file extensions (images, audio, video,
/// archives, executables, fonts, office documents, etc.), plus the two
/// additions this crate makes for modern packaged artifacts: `wasm` and
/// `node`.
const BINARY_EXTENSIONS: &[&str] = &[
    "3dm", "3ds", "3g2", "3gp", "7z", "a", "aac", "adp", "ai", "aif", "aiff", "alz", "ape", "apk",
    "ar", "arj", "asf", "au", "avi", "bak", "baml", "bh", "bin", "bk", "bmp", "btif", "bz2",
    "bzip2", "cab", "caf", "cgm", "class", "cmx", "cpio", "cr2", "crt", "cso", "cur", "dat",
    "ddeb", "deb", "dex", "djvu", "dll", "dmg", "dng", "doc", "docm", "docx", "dot", "dotm", "ds_store",
    "dsk", "dts", "dtshd", "dvb", "dwg", "dxf", "ecelp4800", "ecelp7470", "ecelp9600", "egg",
    "eol", "eot", "epub", "exe", "f4v", "fbs", "fh", "fla", "flac", "fli", "flv", "fpx", "fst",
    "fvt", "g3", "gh", "gif", "graffle", "gz", "gzip", "h261", "h263", "h264", "icns", "ico",
    "ief", "img", "ipa", "iso", "jar", "jpeg", "jpg", "jpgv", "jpm", "jxr", "key", "ktx", "lha",
    "lib", "lvp", "lz", "lzh", "lzma", "lzo", "m3u", "m4a", "m4v", "mar", "mdi", "mht", "mid",
    "midi", "mj2", "mka", "mkv", "mmr", "mng", "mobi", "mov", "movie", "mp3", "mp4", "mp4a",
    "mpeg", "mpg", "mpga", "mxu", "nef", "npx", "numbers", "nupkg", "o", "oga", "ogg", "ogv",
    "otf", "pages", "pbm", "pcx", "pdb", "pdf", "pea", "pgm", "pic", "png", "pnm", "pot", "potm",
    "potx", "ppa", "ppam", "ppm", "pps", "ppsm", "ppsx", "ppt", "pptm", "pptx", "psd", "pya",
    "pyc", "pyo", "pyv", "qt", "rar", "ras", "raw", "rgb", "rip", "rlc", "rmf", "rmvb", "rpm",
    "rtf", "rz", "s3m", "s7z", "scpt", "sgi", "shar", "sketch", "slk", "smv", "snap", "snk",
    "so", "sub", "suo", "swf", "tar", "tbz", "tbz2", "tga", "tgz", "thmx", "tif", "tiff", "tlz",
    "ttc", "ttf", "txz", "udf", "uvh", "uvi", "uvm", "uvp", "uvs", "uvu", "viv", "vob", "war",
    "wav", "wax", "wbmp", "wdp", "weba", "webm", "webp", "whl", "wim", "wm", "wma", "wmv", "wmx",
    "woff", "woff2", "wvx", "xbm", "xif", "xla", "xlam", "xls", "xlsb", "xlsm", "xlsx", "xlt",
    "xltm", "xltx", "xm", "xmind", "xpi", "xpm", "xwd", "xz", "z", "zip", "zipx",
    "avif", "heic", "heif", "psp", "indd", "ps", "eps", "blend", "fbx", "obj", "stl", "glb",
    "dds", "tga", "pak", "vpk", "nds", "3dsx", "cia", "xci", "nsp", "wasm", "node",
];

static EXTENSION_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| BINARY_EXTENSIONS.iter().copied().collect());

fn extension_of(path: &str) -> Option<&str> {
    let name = match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    };

    if name.is_empty() {
        return None;
    }

    match name.rfind('.') {
        Some(0) => {
            // Dotfile semantics: a leading-dot filename like `.gitignore`
            // yields extension `gitignore`, not empty.
            let rest = &name[1..];
            if rest.is_empty() {
                None
            } else {
                Some(rest)
            }
        }
        Some(idx) => {
            let ext = &name[idx + 1..];
            if ext.is_empty() {
                None
            } else {
                Some(ext)
            }
        }
        None => None,
    }
}

/// `true` iff `ext` (case-insensitively) is in the binary extension table.
pub fn is_binary_extension(ext: &str) -> bool {
    EXTENSION_SET.contains(ext.to_ascii_lowercase().as_str())
}

/// `true` iff `path`'s extension marks it as binary. Non-strings aren't
/// representable in Rust's `&str` API, so this simply returns `false` for
/// empty paths and paths with no extension, matching the source behavior
/// for those inputs.
pub fn is_binary_path(path: &str) -> bool {
    if path.is_empty() {
        return false;
    }
    match extension_of(path) {
        Some(ext) => is_binary_extension(ext),
        None => false,
    }
}

/// `true` if `text` overrides classification, or the path isn't binary.
pub fn should_print_patch(path: &str, text: bool) -> bool {
    text || !is_binary_path(path)
}

/// An independent copy of the master extension table; mutating the
/// returned `Vec` has no effect on future classification calls.
pub fn all_extensions() -> Vec<String> {
    BINARY_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}
