// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagelink contributors

//! Inspect command - show inode and link status

use colored::Colorize;
use miette::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::OutputFormat;
use crate::system::System;

/// Link status of one path
#[derive(Debug, Serialize)]
pub struct PathReport {
    pub path: PathBuf,
    pub inode: Option<u64>,
    pub is_symlink: bool,
    pub is_hardlink: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PathReport {
    /// Collect the status of `path`
    pub fn collect(path: &Path) -> Self {
        let is_symlink = System::is_symlink(path);
        let (inode, inode_err) = match System::inode(path) {
            Ok(inode) => (Some(inode), None),
            Err(e) => (None, Some(e.to_string())),
        };
        let (is_hardlink, link_err) = match System::is_hardlink(path) {
            Ok(linked) => (Some(linked), None),
            Err(e) => (None, Some(e.to_string())),
        };

        Self {
            path: path.to_path_buf(),
            inode,
            is_symlink,
            is_hardlink,
            error: inode_err.or(link_err),
        }
    }
}

/// Run the inspect command
pub fn run(paths: Vec<PathBuf>, format: OutputFormat, _verbose: bool) -> Result<()> {
    let reports: Vec<PathReport> = paths.iter().map(|p| PathReport::collect(p)).collect();

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&reports)
                .map_err(|e| miette::miette!("Failed to serialize report: {}", e))?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            for report in &reports {
                print_report(report);
            }
        }
    }

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        return Err(miette::miette!("{} path(s) could not be inspected", failed));
    }

    Ok(())
}

fn print_report(report: &PathReport) {
    println!("{}", report.path.display().to_string().bold());

    match report.inode {
        Some(inode) => println!("  inode:     {}", inode),
        None => println!("  inode:     {}", "-".dimmed()),
    }
    println!("  symlink:   {}", yes_no(Some(report.is_symlink)));
    println!("  hardlink:  {}", yes_no(report.is_hardlink));

    if let Some(error) = &report.error {
        println!("  {} {}", "✗".red(), error.dimmed());
    }
}

fn yes_no(value: Option<bool>) -> colored::ColoredString {
    match value {
        Some(true) => "yes".green(),
        Some(false) => "no".normal(),
        None => "-".dimmed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    #[test]
    fn test_report_for_hardlinked_file() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "hello").unwrap();
        std::fs::hard_link(&a, &b).unwrap();

        let report = PathReport::collect(&b);
        assert_eq!(report.is_hardlink, Some(true));
        assert!(!report.is_symlink);
        assert!(report.inode.is_some());
        assert!(report.error.is_none());
    }

    #[test]
    fn test_report_for_missing_path() {
        let dir = TempDir::new().unwrap();
        let report = PathReport::collect(&dir.path().join("nope"));

        assert!(!report.is_symlink);
        assert_eq!(report.inode, None);
        assert_eq!(report.is_hardlink, None);
        assert!(report.error.is_some());
    }
}
