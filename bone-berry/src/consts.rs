//! 通用常量.

use once_cell::sync::Lazy;
use std::collections::BTreeSet;

/// 目录与文件命名约定的默认标记.
pub mod marker {
    /// 变换后骨骼标签目录名后缀.
    pub const TRANSFORMED_LABELS: &str = "_Segs_Transformed";

    /// 病例 (分割实例) 目录名后缀. 同时也用于排除原始扫描目录下的分割文件.
    pub const SEGMENTATION: &str = "_Segmentation";

    /// 骨骼标签文件扩展名.
    pub const LABEL_EXT: &str = ".nii.gz";

    /// 原始扫描文件扩展名.
    pub const RAW_EXT: &str = ".nrrd";

    /// 骨骼名与编号之间的分隔.
    pub const LABEL_ID: &str = "_label";

    /// 由病例名推导原始扫描目录名时, 截断用的分隔符.
    pub const STUDY_SEPARATOR: char = '-';
}

/// 背景类别 id. 永远不会分配给任何骨骼.
pub const BACKGROUND_ID: u32 = 0;

/// 背景类别在 `dataset.json` 中的名称.
pub const BACKGROUND_NAME: &str = "background";

/// 输出数据集文件格式.
pub const FILE_ENDING: &str = ".nii.gz";

/// 默认扫描模态.
pub const DEFAULT_MODALITY: &str = "CT";

/// 默认病例 id 前缀.
pub const DEFAULT_CASE_PREFIX: &str = "PELVISTHIGHS";

/// 默认数据集目录名.
pub const DEFAULT_DATASET_NAME: &str = "Dataset001_PelvisThighs";

/// 训练图像子目录.
pub const IMAGES_TR: &str = "imagesTr";

/// 训练标签子目录.
pub const LABELS_TR: &str = "labelsTr";

/// 数据集描述文件名.
pub const MANIFEST_NAME: &str = "dataset.json";

/// 骨盆-大腿数据集使用的 8 个标签.
pub static PELVIS_THIGHS_LABELS: Lazy<BTreeSet<String>> = Lazy::new(|| {
    [
        "Femur_L",
        "Femur_R",
        "Hip_L",
        "Hip_R",
        "Patella_L",
        "Patella_R",
        "Sacrum",
        "Threshold-200-MAX",
    ]
    .into_iter()
    .map(String::from)
    .collect()
});

/// 骨盆-大腿病例名中的标识子串.
pub const PELVIS_THIGHS_CASE: &str = "Pelvis-Thighs";
