mod common;

use common::{ZipBuilder, ZipMember, crc32, deflate};
use pkgdiff::{ArchiveExtractor, ArchiveFormat, ErrorKind, ExtractLimits, FileTree};
use pretty_assertions::assert_eq;

fn extract_with(data: &[u8], limits: ExtractLimits) -> pkgdiff::Result<FileTree> {
    ArchiveExtractor::new(limits).extract(data, ArchiveFormat::Zip)
}

fn extract(data: &[u8]) -> FileTree {
    extract_with(data, ExtractLimits::default()).unwrap()
}

fn paths(tree: &FileTree) -> Vec<&str> {
    tree.paths().collect()
}

#[test]
fn plugin_zip_layout() {
    let archive = ZipBuilder::new()
        .dir("akismet/")
        .dir("akismet/views/")
        .file("akismet/akismet.php", b"<?php\n// Plugin Name: Akismet\n")
        .stored("akismet/views/config.php", b"<?php echo 1;\n")
        .finish();

    let tree = extract(&archive);
    assert_eq!(paths(&tree), vec!["akismet.php", "views/config.php"]);
    assert_eq!(
        tree.get("akismet.php").unwrap().content.as_deref(),
        Some("<?php\n// Plugin Name: Akismet\n")
    );
}

#[test]
fn filter_applies_to_zip_entries() {
    let archive = ZipBuilder::new()
        .file("plugin/vendor/autoload.php", b"<?php")
        .file("plugin/composer.lock", b"{}")
        .file("plugin/.DS_Store", b"junk")
        .file("plugin/assets/icon.svg", b"<svg/>")
        .file("plugin/assets/banner.jpg", b"jpeg")
        .finish();

    let tree = extract(&archive);
    assert_eq!(paths(&tree), vec!["assets/banner.jpg", "assets/icon.svg"]);
    assert!(tree.get("assets/banner.jpg").unwrap().is_binary);
}

#[test]
fn oversized_entry_is_skipped_without_inflating() {
    // 4 MiB of zeroes: small on disk, over the per-file cap once inflated.
    let huge = vec![0u8; 4 * 1024 * 1024];
    let archive = ZipBuilder::new()
        .file("plugin/huge.txt", &huge)
        .file("plugin/small.txt", b"ok")
        .finish();

    // Inflating the big entry would also blow the decompression budget, so
    // a clean result proves it was never decompressed.
    let limits = ExtractLimits {
        max_decompressed_size: 1024,
        ..ExtractLimits::default()
    };
    let tree = extract_with(&archive, limits).unwrap();
    assert_eq!(paths(&tree), vec!["small.txt"]);
}

#[test]
fn declared_size_alone_excludes_an_entry() {
    let zeros = vec![0u8; 2 * 1024 * 1024];
    let archive = ZipBuilder::new()
        // Real deflate data that would overrun the budget below if inflated.
        .member(ZipMember {
            name: "plugin/claims-big.js".into(),
            method: 8,
            flags: 0,
            crc32: crc32(&zeros),
            uncompressed_size: 10 * 1024 * 1024,
            payload: deflate(&zeros),
        })
        // Not a deflate stream at all.
        .member(ZipMember {
            name: "plugin/garbage.js".into(),
            method: 8,
            flags: 0,
            crc32: 0,
            uncompressed_size: 10 * 1024 * 1024,
            payload: vec![0xFF; 16],
        })
        .file("plugin/kept.js", b"ok")
        .finish();

    let limits = ExtractLimits {
        max_decompressed_size: 1024,
        ..ExtractLimits::default()
    };
    let tree = extract_with(&archive, limits).unwrap();
    assert_eq!(paths(&tree), vec!["kept.js"]);
}

#[test]
fn entry_inflating_past_its_declared_size_is_a_bomb() {
    let data = vec![b'a'; 64 * 1024];
    let archive = ZipBuilder::new()
        .member(ZipMember {
            name: "plugin/liar.txt".into(),
            method: 8,
            flags: 0,
            crc32: crc32(&data),
            uncompressed_size: 100,
            payload: deflate(&data),
        })
        .finish();

    let err = extract_with(&archive, ExtractLimits::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DecompressionTooLarge);
}

#[test]
fn shared_budget_across_entries() {
    let chunk = vec![b'z'; 300 * 1024];
    let mut builder = ZipBuilder::new();
    for i in 0..4 {
        builder = builder.file(&format!("plugin/part{i}.txt"), &chunk);
    }
    let limits = ExtractLimits {
        max_decompressed_size: 1024 * 1024,
        ..ExtractLimits::default()
    };

    let err = extract_with(&builder.finish(), limits).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DecompressionTooLarge);
}

#[test]
fn unreadable_entries_are_skipped() {
    let good = b"fine";
    let archive = ZipBuilder::new()
        .member(ZipMember {
            name: "plugin/secret.php".into(),
            method: 8,
            flags: 0x0001,
            crc32: crc32(good),
            uncompressed_size: good.len() as u32,
            payload: deflate(good),
        })
        .member(ZipMember {
            name: "plugin/lzma.php".into(),
            method: 14,
            flags: 0,
            crc32: crc32(good),
            uncompressed_size: good.len() as u32,
            payload: good.to_vec(),
        })
        .member(ZipMember {
            name: "plugin/corrupt.php".into(),
            method: 0,
            flags: 0,
            crc32: crc32(good) ^ 1,
            uncompressed_size: good.len() as u32,
            payload: good.to_vec(),
        })
        .file("plugin/ok.php", good)
        .finish();

    assert_eq!(paths(&extract(&archive)), vec!["ok.php"]);
}

#[test]
fn file_cap_applies() {
    let mut builder = ZipBuilder::new();
    for i in 0..8 {
        builder = builder.file(&format!("plugin/f{i}.php"), b"<?php");
    }
    let limits = ExtractLimits {
        max_files: 5,
        ..ExtractLimits::default()
    };

    assert_eq!(extract_with(&builder.finish(), limits).unwrap().len(), 5);
}

#[test]
fn truncated_archive_is_malformed() {
    let mut archive = ZipBuilder::new().file("plugin/a.php", b"<?php").finish();
    archive.truncate(archive.len() - 30);

    let err = extract_with(&archive, ExtractLimits::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedArchive);
}

#[test]
fn raw_size_ceiling_comes_first() {
    let archive = ZipBuilder::new().stored("plugin/a.txt", &[b'a'; 4096]).finish();
    let limits = ExtractLimits {
        max_archive_size: 1024,
        ..ExtractLimits::default()
    };

    let err = extract_with(&archive, limits).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArchiveTooLarge);
}
