//! 对 `bone-berry::dataset` 的更一层封装. 提供默认的语料与输出路径.

use bone_berry::dataset::home_dataset_dir_with;
use std::env;
use std::path::PathBuf;

/// 语料根目录环境变量.
pub const CORPUS_DIR_ENV: &str = "BONE_CORPUS_DIR";

/// 输出根目录环境变量.
pub const OUTPUT_DIR_ENV: &str = "BONE_OUTPUT_DIR";

/// 优先读取环境变量 `var`, 否则使用 `$HOME/dataset/{rest}`.
/// 无法确定用户主目录时, 退化为当前目录下的 `dataset/{rest}`.
fn from_env_or_home(var: &str, rest: &str) -> PathBuf {
    match env::var(var) {
        Ok(d) if !d.is_empty() => PathBuf::from(d),
        _ => home_dataset_dir_with([rest]).unwrap_or_else(|| ["dataset", rest].iter().collect()),
    }
}

/// 获取语料根目录.
///
/// 1. 若环境变量 `$BONE_CORPUS_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/CV Dataset`.
pub fn corpus_dir_from_env_or_home() -> PathBuf {
    from_env_or_home(CORPUS_DIR_ENV, "CV Dataset")
}

/// 获取输出根目录 (nnU-Net 的 `nnUNet_raw`).
///
/// 1. 若环境变量 `$BONE_OUTPUT_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/nnUNet_raw`.
pub fn output_dir_from_env_or_home() -> PathBuf {
    from_env_or_home(OUTPUT_DIR_ENV, "nnUNet_raw")
}
