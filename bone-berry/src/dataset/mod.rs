//! 语料与输出数据集操作.

use std::path::{Path, PathBuf};

mod discover;
mod label;
mod manifest;
mod resolve;
mod rules;
mod vocab;

pub use discover::{CaseFolder, Discoverer, Subject};
pub use label::{has_labels, list_labels, BoneLabel};
pub use manifest::{ClassMap, DatasetLayout, DatasetManifest, ManifestEntry, VerifySummary};
pub use resolve::RawResolver;
pub use rules::{Conventions, MatchRule, Pattern, Role};
pub use vocab::{LabelFilter, Vocabulary};

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}
