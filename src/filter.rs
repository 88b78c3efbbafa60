//! Path and content classification for archive entries.
//!
//! Packages ship plenty of files nobody wants to review: vendored
//! dependencies, lockfiles, editor droppings and media. Paths are classified
//! against static tables; raw bytes are sniffed for NUL bytes.

/// Directory names that exclude every path passing through them.
const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    "vendor",
    ".git",
    ".svn",
    ".hg",
    "bower_components",
    ".idea",
    ".vscode",
    "__pycache__",
    ".cache",
];

/// Lockfiles and OS artifacts, matched on the exact file name.
const EXCLUDED_FILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "composer.lock",
    "Gemfile.lock",
    "poetry.lock",
    "flake.lock",
    "Cargo.lock",
    "mix.lock",
    "pubspec.lock",
    "Podfile.lock",
    ".DS_Store",
    "Thumbs.db",
];

const BINARY_EXTENSIONS: &[&str] = &[
    // images
    "png", "jpg", "jpeg", "gif", "ico", "webp", "avif", "svg", "bmp", "tiff",
    // fonts
    "woff", "woff2", "ttf", "eot", "otf",
    // documents and archives
    "pdf", "zip", "tar", "gz", "rar", "7z",
    // native and data
    "exe", "dll", "so", "dylib", "bin", "dat", "db", "sqlite",
    // audio and video
    "mp3", "mp4", "wav", "ogg", "webm", "avi", "mov", "flv", "swf",
    // design
    "psd", "ai", "eps",
    // compiled
    "class", "jar", "war", "pyc", "pyo", "o", "a", "lib", "obj",
];

const MINIFIED_SUFFIXES: &[&str] = &[
    ".min.js",
    ".min.css",
    ".bundle.js",
    "-min.js",
    ".prod.js",
    ".js.map",
    ".mjs.map",
    ".cjs.map",
    ".ts.map",
    ".mts.map",
    ".cts.map",
    ".css.map",
];

/// Only this many leading bytes are inspected when sniffing content.
pub const SNIFF_WINDOW: usize = 8000;

/// Outcome of [`classify_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathClass {
    pub include: bool,
    pub is_binary: bool,
    pub is_minified: bool,
}

impl PathClass {
    const EXCLUDED: PathClass = PathClass {
        include: false,
        is_binary: false,
        is_minified: false,
    };
}

/// Classify a normalized, forward-slash path.
///
/// Exclusion (by directory component, then by file name) is a hard veto.
/// Binary status comes from the extension; callers OR it with
/// [`is_binary_content`]. Minified status is metadata only and never affects
/// inclusion.
pub fn classify_path(path: &str) -> PathClass {
    if path.split('/').any(|part| EXCLUDED_DIRS.contains(&part)) {
        return PathClass::EXCLUDED;
    }

    let file_name = path.rsplit('/').next().unwrap_or(path);
    if EXCLUDED_FILES.contains(&file_name) {
        return PathClass::EXCLUDED;
    }

    // Final dot-segment; a name without dots is its own extension.
    let extension = file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    PathClass {
        include: true,
        is_binary: BINARY_EXTENSIONS.contains(&extension.as_str()),
        is_minified: MINIFIED_SUFFIXES
            .iter()
            .any(|suffix| file_name.ends_with(suffix)),
    }
}

/// NUL-byte heuristic: two or more NULs in the first [`SNIFF_WINDOW`] bytes
/// marks the content as binary.
pub fn is_binary_content(content: &[u8]) -> bool {
    let window = &content[..content.len().min(SNIFF_WINDOW)];
    window.iter().filter(|&&b| b == 0).take(2).count() > 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("node_modules/foo/index.js")]
    #[case("lib/vendor/autoload.php")]
    #[case(".git/config")]
    #[case("src/__pycache__/mod.pyc")]
    #[case("package-lock.json")]
    #[case("nested/dir/yarn.lock")]
    #[case("assets/.DS_Store")]
    fn excluded_paths(#[case] path: &str) {
        assert_eq!(classify_path(path), PathClass::EXCLUDED);
    }

    #[rstest]
    #[case("logo.png", true)]
    #[case("fonts/Icon.WOFF2", true)]
    #[case("lib/native.so", true)]
    #[case("README.md", false)]
    #[case("src/index.ts", false)]
    #[case("vendored.js", false)]
    fn binary_by_extension(#[case] path: &str, #[case] binary: bool) {
        let class = classify_path(path);
        assert!(class.include);
        assert_eq!(class.is_binary, binary);
    }

    #[rstest]
    #[case("dist/app.min.js", true)]
    #[case("dist/app.min.css", true)]
    #[case("dist/app.bundle.js", true)]
    #[case("jquery-min.js", true)]
    #[case("react.prod.js", true)]
    #[case("index.mjs.map", true)]
    #[case("style.css.map", true)]
    #[case("data.json.map", false)]
    #[case("admin.js", false)]
    fn minified_is_metadata_only(#[case] path: &str, #[case] minified: bool) {
        let class = classify_path(path);
        assert!(class.include);
        assert_eq!(class.is_minified, minified);
    }

    #[test]
    fn single_nul_is_text() {
        assert!(!is_binary_content(b"hello\0world"));
    }

    #[test]
    fn two_nuls_are_binary() {
        assert!(is_binary_content(b"\0hello\0"));
    }

    #[test]
    fn nuls_past_the_window_are_ignored() {
        let mut content = vec![b'a'; SNIFF_WINDOW];
        content.extend_from_slice(&[0, 0, 0]);
        assert!(!is_binary_content(&content));

        content[SNIFF_WINDOW - 1] = 0;
        content[SNIFF_WINDOW - 2] = 0;
        assert!(is_binary_content(&content));
    }
}
