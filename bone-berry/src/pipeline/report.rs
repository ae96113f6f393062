//! 运行报告.

use crate::dataset::{ManifestEntry, Vocabulary};
use crate::error::{CaseError, CaseWarning};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// 单个失败病例.
#[derive(Debug)]
pub struct CaseFailure {
    /// 受试者名.
    pub subject: String,

    /// 病例名.
    pub case: String,

    /// 失败原因.
    pub error: CaseError,
}

/// 一次完整运行的汇总.
#[derive(Debug, Default)]
pub struct RunReport {
    /// 本次运行使用的类别表.
    pub vocabulary: Vocabulary,

    /// 存活病例, 按病例 id 顺序.
    pub entries: Vec<ManifestEntry>,

    /// 失败病例, 按处理顺序.
    pub failures: Vec<CaseFailure>,

    /// 非致命警告.
    pub warnings: Vec<CaseWarning>,

    /// 因病例名过滤而静默跳过的病例数.
    pub skipped: usize,

    /// 写出的描述文件. 没有存活病例时为 `None`.
    pub manifest_path: Option<PathBuf>,
}

impl RunReport {
    /// 以冻结的类别表开始一份报告.
    pub fn new(vocabulary: Vocabulary, skipped: usize) -> Self {
        Self {
            vocabulary,
            skipped,
            ..Default::default()
        }
    }

    /// 处理过的病例总数 (不含被跳过的).
    #[inline]
    pub fn processed(&self) -> usize {
        self.entries.len() + self.failures.len()
    }

    /// 按错误种类统计失败病例数.
    pub fn failure_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut ans = BTreeMap::new();
        for f in &self.failures {
            *ans.entry(f.error.kind()).or_insert(0) += 1;
        }
        ans
    }
}
