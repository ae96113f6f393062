//! 运行时错误.
//!
//! 单个病例内的错误 ([`CaseError`]) 只会终止该病例的处理, 由流水线收集进
//! [`RunReport`](crate::pipeline::RunReport); 只有 [`AssembleError`] 会终止整次运行.

use crate::pipeline::RunReport;
use itertools::Itertools;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 读取或写入体数据时的错误.
#[derive(Error, Debug)]
pub enum VolumeError {
    /// 底层 I/O 错误.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// nifti 读写错误.
    #[error("NIfTI error: {0}")]
    Nifti(#[from] nifti::NiftiError),

    /// NRRD 头部格式错误.
    #[error("malformed NRRD header: {0}")]
    NrrdHeader(String),

    /// NRRD 中暂不支持的特性.
    #[error("unsupported NRRD feature: {0}")]
    NrrdUnsupported(String),

    /// 数据体字节数不足.
    #[error("volume data truncated: expected {expected} bytes, found {found}")]
    Truncated {
        /// 期望字节数.
        expected: usize,
        /// 实际字节数.
        found: usize,
    },

    /// 不是三维体数据.
    #[error("expected a 3D volume, found shape {0:?}")]
    NotVolume3d(Vec<usize>),
}

/// 病例缺少可用标签的具体原因.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LabelShortfall {
    /// 病例中没有任何标签出现在全局类别表中.
    NoneInVocabulary,

    /// 过滤模式下, 病例的标签名集合与允许列表不完全相同.
    NotExactAllowList {
        /// 允许列表中有, 但病例缺少的标签.
        missing: Vec<String>,
        /// 病例中有, 但不在允许列表中的标签.
        extra: Vec<String>,
    },
}

impl fmt::Display for LabelShortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoneInVocabulary => write!(f, "no label file matches the vocabulary"),
            Self::NotExactAllowList { missing, extra } => write!(
                f,
                "label set differs from the allow-list (missing: [{}], extra: [{}])",
                missing.iter().join(", "),
                extra.iter().join(", ")
            ),
        }
    }
}

/// 单个病例处理失败的原因.
#[derive(Error, Debug)]
pub enum CaseError {
    /// 找不到与病例对应的原始扫描目录.
    #[error("no raw study directory resolves for case `{case}`")]
    MissingRawVolume {
        /// 病例名.
        case: String,
    },

    /// 原始扫描目录中没有合格的原始扫描文件.
    #[error("no raw volume file in {}", dir.display())]
    NoRawFile {
        /// 原始扫描目录.
        dir: PathBuf,
    },

    /// 病例没有可以合并的标签.
    #[error("no usable labels: {0}")]
    NoLabelsForCase(LabelShortfall),

    /// 所有候选标签在重采样后都为空.
    #[error("every candidate label mask is empty")]
    EmptyMergedVolume,

    /// 读取体数据失败.
    #[error("failed to load {}: {source}", path.display())]
    VolumeLoad {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: VolumeError,
    },

    /// 写出体数据失败.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: VolumeError,
    },
}

impl CaseError {
    /// 错误种类名, 用于汇总统计.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingRawVolume { .. } => "MissingRawVolume",
            Self::NoRawFile { .. } => "NoRawFile",
            Self::NoLabelsForCase(_) => "NoLabelsForCase",
            Self::EmptyMergedVolume => "EmptyMergedVolume",
            Self::VolumeLoad { .. } => "VolumeLoad",
            Self::Write { .. } => "Write",
        }
    }
}

/// 单个病例处理过程中的非致命警告.
#[derive(Clone, Debug, PartialEq)]
pub enum CaseWarning {
    /// 原始扫描头部缺少完整的空间信息, 仿射矩阵退化为单位阵或部分矩阵.
    AffineCompute {
        /// 原始扫描文件.
        path: PathBuf,
        /// 缺失或无法解析的字段说明.
        detail: String,
    },
}

impl fmt::Display for CaseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AffineCompute { path, detail } => write!(
                f,
                "AffineComputeWarning for {}: {detail}",
                path.display()
            ),
        }
    }
}

/// 终止整次运行的错误.
#[derive(Error, Debug)]
pub enum AssembleError {
    /// 语料根目录无法读取.
    #[error("cannot read corpus root {}: {source}", path.display())]
    CorpusUnreadable {
        /// 语料根目录.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: io::Error,
    },

    /// 无法创建输出目录.
    #[error("cannot create output directory {}: {source}", path.display())]
    OutputDir {
        /// 输出目录.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: io::Error,
    },

    /// 写出数据集描述文件失败.
    #[error("cannot write manifest {}: {source}", path.display())]
    Manifest {
        /// 描述文件路径.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: io::Error,
    },

    /// 整个语料处理完毕后没有任何存活病例. 此时不会写出描述文件.
    #[error("no training cases created ({} cases failed)", report.failures.len())]
    NoSurvivingCases {
        /// 本次运行的完整报告.
        report: Box<RunReport>,
    },
}

/// 校验数据集目录时的错误.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// 数据集目录结构不完整.
    #[error("dataset structure incomplete: {} is missing", .0.display())]
    Missing(PathBuf),

    /// 没有任何训练数据.
    #[error("no training data found (images: {images}, labels: {labels})")]
    Empty {
        /// 图像个数.
        images: usize,
        /// 标签个数.
        labels: usize,
    },

    /// 底层 I/O 错误.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// 描述文件无法解析.
    #[error("cannot parse manifest: {0}")]
    Json(#[from] serde_json::Error),
}
