//! 运行结果.

use bone_berry::dataset::VerifySummary;
use bone_berry::RunReport;
use std::io::{self, Write};
use std::path::Path;

const S4: &str = "    ";

/// 将 `report` 的汇总写进 `w` 中.
fn describe_into<W: Write>(report: &RunReport, w: &mut W) -> io::Result<()> {
    writeln!(w, "Classes ({}):", report.vocabulary.len())?;
    for (name, id) in report.vocabulary.iter() {
        writeln!(w, "{S4}{id:>3}: {name}")?;
    }
    writeln!(w, "Processed cases: {}", report.processed())?;
    writeln!(w, "{S4}Saved: {}", report.entries.len())?;
    writeln!(w, "{S4}Failed: {}", report.failures.len())?;
    writeln!(w, "{S4}Skipped by name: {}", report.skipped)?;
    for (kind, n) in report.failure_counts() {
        writeln!(w, "{S4}{S4}{kind}: {n}")?;
    }
    if !report.warnings.is_empty() {
        writeln!(w, "Warnings: {}", report.warnings.len())?;
        for warning in &report.warnings {
            writeln!(w, "{S4}{warning}")?;
        }
    }
    match &report.manifest_path {
        Some(p) => write!(w, "Manifest: {}", p.display()),
        None => write!(w, "Manifest: /"),
    }
}

/// 将失败病例逐个写进 `w` 中.
fn failures_into<W: Write>(report: &RunReport, w: &mut W) -> io::Result<()> {
    writeln!(w, "Failed cases:")?;
    for f in &report.failures {
        writeln!(w, "{S4}[{}] {}/{}: {}", f.error.kind(), f.subject, f.case, f.error)?;
    }
    Ok(())
}

/// 打印组装结果.
pub fn print_report(report: &RunReport) {
    utils::sep();
    let mut out = io::stdout().lock();
    let mut ans = describe_into(report, &mut out).and_then(|_| writeln!(out));
    if ans.is_ok() && !report.failures.is_empty() {
        ans = utils::sep_to(&mut out).and_then(|_| failures_into(report, &mut out));
    }
    if let Err(e) = ans {
        log::error!("cannot print report: {e}");
    }
    drop(out);
    utils::sep();
}

/// 打印校验结果.
pub fn print_verify(task_dir: &Path, s: &VerifySummary) {
    utils::sep();
    println!("Dataset: {}", task_dir.display());
    println!("{S4}Images: {}", s.images);
    println!("{S4}Labels: {}", s.labels);
    println!("{S4}numTraining: {}", s.num_training);
    println!("{S4}Classes: {}", s.classes);
    if !s.is_consistent() {
        log::warn!(
            "counts differ: {} image(s), {} label(s), numTraining {}",
            s.images,
            s.labels,
            s.num_training
        );
    }
    utils::sep();
}
