//! 程序运行函数.

use crate::result;
use crate::{AssembleArgs, Preset};
use bone_berry::consts::{PELVIS_THIGHS_CASE, PELVIS_THIGHS_LABELS};
use bone_berry::dataset::{DatasetLayout, LabelFilter};
use bone_berry::{AssembleConfig, AssembleError, Assembler};
use std::collections::BTreeSet;
use std::path::Path;
use std::process::ExitCode;
use utils::loader;

/// 由命令行参数构建组装配置.
pub fn config_from(args: AssembleArgs) -> AssembleConfig {
    let corpus = args
        .corpus
        .unwrap_or_else(loader::corpus_dir_from_env_or_home);

    let mut allow: BTreeSet<String> = args.allow.into_iter().collect();
    let mut case_filter = None;
    if let Some(Preset::PelvisThighs) = args.preset {
        allow.extend(PELVIS_THIGHS_LABELS.iter().cloned());
        case_filter = Some(PELVIS_THIGHS_CASE.to_string());
    }
    if args.case_contains.is_some() {
        case_filter = args.case_contains;
    }
    let filter = if allow.is_empty() {
        LabelFilter::Unrestricted
    } else {
        LabelFilter::AllowList(allow)
    };

    AssembleConfig::new(corpus, args.out.task_dir())
        .with_filter(filter)
        .with_case_filter(case_filter)
        .with_case_prefix(args.prefix)
        .with_modality(args.modality)
}

/// 组装数据集. 没有任何存活病例时返回失败.
pub fn assemble(config: AssembleConfig) -> ExitCode {
    println!(
        "Assembling {} -> {}",
        config.corpus_root.display(),
        config.task_dir.display()
    );

    match Assembler::new(config).run() {
        Ok(report) => {
            result::print_report(&report);
            ExitCode::SUCCESS
        }
        Err(AssembleError::NoSurvivingCases { report }) => {
            result::print_report(&report);
            eprintln!("ERROR: No training data created!");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}

/// 校验数据集目录. 计数不一致只给出警告.
pub fn verify(task_dir: &Path) -> ExitCode {
    match DatasetLayout::new(task_dir).verify() {
        Ok(summary) => {
            result::print_verify(task_dir, &summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}
