//! Main entry point for the pkgdiff CLI application.
//!
//! Resolves package versions through a registry (or reads two archives from
//! disk), diffs them and prints the result as unified text, a stat summary
//! or JSON.

use std::fmt::Write as _;
use std::process::ExitCode;

use anyhow::{Result, anyhow};
use clap::Parser;

use pkgdiff::{
    ArchiveFormat, ByteSource, Cli, Command, DiffFile, DiffResult, Error, FileStatus, HttpSource,
    LineKind, LocalSource, PackageComparer, PackageType, build_client, compare_archives,
    registry_for,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", render_error(&err));
            ExitCode::FAILURE
        }
    }
}

/// The error message, followed by the available versions when a requested
/// version does not exist.
fn render_error(err: &anyhow::Error) -> String {
    let mut out = format!("Error: {err:#}\n");
    if let Some(Error::VersionNotFound { name, available, .. }) = err.downcast_ref::<Error>() {
        let _ = writeln!(out, "Available versions of {name}:");
        for version in available {
            let _ = writeln!(out, "  {version}");
        }
    }
    out
}

async fn run(cli: &Cli) -> Result<()> {
    let config = cli.config();

    let result = match &cli.command {
        Command::Npm(args) | Command::Wp(args) => {
            let package_type = match cli.command {
                Command::Npm(_) => PackageType::Npm,
                _ => PackageType::Wp,
            };
            let (from, to) = args.versions().map_err(|e| anyhow!(e))?;

            let client = build_client(config.fetch_timeout)?;
            let comparer = PackageComparer::new(
                registry_for(package_type, &config, client.clone()),
                Box::new(HttpSource::new(client, config.limits.max_archive_size)),
                config.limits,
                config.diff,
            );
            comparer.compare(&args.name, &from, &to).await?
        }
        Command::Versions { registry, name } => {
            let client = build_client(config.fetch_timeout)?;
            let registry = registry_for(*registry, &config, client);
            for version in registry.list_versions(name).await? {
                println!("{version}");
            }
            return Ok(());
        }
        Command::Local { old, new, format } => {
            let format = ArchiveFormat::from(*format);
            let (old_bytes, new_bytes) =
                tokio::try_join!(LocalSource.fetch(old), LocalSource.fetch(new))?;
            let package_type = match format {
                ArchiveFormat::TarGzip => PackageType::Npm,
                ArchiveFormat::Zip => PackageType::Wp,
            };
            compare_archives(
                &old_bytes,
                &new_bytes,
                format,
                package_type,
                "local",
                old,
                new,
                config.limits,
                config.diff,
            )?
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if cli.stat {
        print!("{}", render_stat(&result));
    } else {
        print!("{}", render_unified(&result));
    }
    Ok(())
}

fn status_letter(status: FileStatus) -> char {
    match status {
        FileStatus::Added => 'A',
        FileStatus::Deleted => 'D',
        FileStatus::Modified => 'M',
    }
}

fn summary(result: &DiffResult) -> String {
    let stats = &result.stats;
    format!(
        " {} file{} changed, {} insertion{}(+), {} deletion{}(-)\n",
        stats.files,
        plural(stats.files),
        stats.insertions,
        plural(stats.insertions),
        stats.deletions,
        plural(stats.deletions)
    )
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// One line per file plus the totals.
fn render_stat(result: &DiffResult) -> String {
    let mut out = String::new();
    for file in &result.files {
        let _ = write!(out, "{} {}", status_letter(file.status), file.path);
        if file.is_binary {
            out.push_str(" (binary)");
        } else {
            let _ = write!(out, " +{} -{}", file.insertions(), file.deletions());
        }
        if file.is_minified {
            out.push_str(" (minified)");
        }
        out.push('\n');
    }
    out.push_str(&summary(result));
    out
}

/// Git-style unified diff of every file, followed by the totals.
fn render_unified(result: &DiffResult) -> String {
    let mut out = String::new();
    for file in &result.files {
        render_file(&mut out, file);
    }
    out.push_str(&summary(result));
    out
}

fn render_file(out: &mut String, file: &DiffFile) {
    let path = &file.path;
    let _ = writeln!(out, "diff --git a/{path} b/{path}");
    match file.status {
        FileStatus::Added => out.push_str("new file\n"),
        FileStatus::Deleted => out.push_str("deleted file\n"),
        FileStatus::Modified => {}
    }
    if file.is_binary {
        let _ = writeln!(out, "Binary files a/{path} and b/{path} differ");
        return;
    }
    if file.hunks.is_empty() {
        return;
    }

    let old_name = match file.status {
        FileStatus::Added => "/dev/null".to_string(),
        _ => format!("a/{path}"),
    };
    let new_name = match file.status {
        FileStatus::Deleted => "/dev/null".to_string(),
        _ => format!("b/{path}"),
    };
    let _ = writeln!(out, "--- {old_name}");
    let _ = writeln!(out, "+++ {new_name}");

    for hunk in &file.hunks {
        let _ = writeln!(
            out,
            "@@ -{},{} +{},{} @@",
            hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
        );
        for line in &hunk.lines {
            let marker = match line.kind {
                LineKind::Context => ' ',
                LineKind::Add => '+',
                LineKind::Delete => '-',
            };
            let _ = writeln!(out, "{marker}{}", line.content);
        }
    }
}
