//! 目录与文件的命名约定.
//!
//! 每条约定是一条 `(角色, 匹配规则)`, 所有名称判断都通过 [`Conventions::matches`] 统一完成.

use crate::consts::marker;

/// 目录或文件在语料中扮演的角色.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Role {
    /// 变换后骨骼标签目录.
    TransformedLabels,

    /// 病例目录.
    Case,

    /// 单个骨骼的标签文件.
    LabelFile,

    /// 原始扫描文件.
    RawFile,
}

/// 名称匹配模式.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Pattern {
    /// 以给定字符串结尾.
    Suffix(String),

    /// 包含给定字符串.
    Contains(String),
}

impl Pattern {
    /// 判断 `name` 是否匹配.
    #[inline]
    pub fn test(&self, name: &str) -> bool {
        match self {
            Self::Suffix(s) => name.ends_with(s.as_str()),
            Self::Contains(s) => name.contains(s.as_str()),
        }
    }
}

/// 一条命名约定: 满足 `require` 且不满足 `reject` 的名称拥有角色 `role`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatchRule {
    /// 角色.
    pub role: Role,

    /// 必须满足的模式.
    pub require: Pattern,

    /// 不得满足的模式.
    pub reject: Option<Pattern>,
}

impl MatchRule {
    /// 判断 `name` 是否满足该约定.
    #[inline]
    pub fn accepts(&self, name: &str) -> bool {
        self.require.test(name) && !self.reject.as_ref().is_some_and(|p| p.test(name))
    }
}

/// 语料命名约定的全集.
#[derive(Clone, Debug)]
pub struct Conventions {
    rules: Vec<MatchRule>,
    case_marker: String,
    label_ext: String,
    label_id: String,
    separator: char,
}

impl Default for Conventions {
    fn default() -> Self {
        Self::new(
            marker::TRANSFORMED_LABELS,
            marker::SEGMENTATION,
            marker::LABEL_EXT,
            marker::RAW_EXT,
        )
    }
}

impl Conventions {
    /// 由四个标记构建约定表:
    ///
    /// 1. 以 `transformed` 结尾的目录是变换后标签目录;
    /// 2. 以 `segmentation` 结尾的目录是病例目录;
    /// 3. 以 `label_ext` 结尾的文件是骨骼标签;
    /// 4. 以 `raw_ext` 结尾且不含 `segmentation` 的文件是原始扫描.
    pub fn new(transformed: &str, segmentation: &str, label_ext: &str, raw_ext: &str) -> Self {
        let suffix = |s: &str| Pattern::Suffix(s.to_string());
        let rules = vec![
            MatchRule {
                role: Role::TransformedLabels,
                require: suffix(transformed),
                reject: None,
            },
            MatchRule {
                role: Role::Case,
                require: suffix(segmentation),
                reject: None,
            },
            MatchRule {
                role: Role::LabelFile,
                require: suffix(label_ext),
                reject: None,
            },
            MatchRule {
                role: Role::RawFile,
                require: suffix(raw_ext),
                reject: Some(Pattern::Contains(segmentation.to_string())),
            },
        ];
        Self {
            rules,
            case_marker: segmentation.to_string(),
            label_ext: label_ext.to_string(),
            label_id: marker::LABEL_ID.to_string(),
            separator: marker::STUDY_SEPARATOR,
        }
    }

    /// 替换由病例名推导原始扫描目录名时使用的分隔符.
    #[inline]
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// 追加一条约定. 同一角色的多条约定满足任意一条即可.
    pub fn with_rule(mut self, rule: MatchRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// 分隔符.
    #[inline]
    pub fn separator(&self) -> char {
        self.separator
    }

    /// 判断名称 `name` 是否拥有角色 `role`.
    pub fn matches(&self, role: Role, name: &str) -> bool {
        self.rules
            .iter()
            .filter(|r| r.role == role)
            .any(|r| r.accepts(name))
    }

    /// 去掉病例名末尾的病例标记, 得到原始扫描目录的基本名.
    #[inline]
    pub fn case_base_name<'a>(&self, case_name: &'a str) -> &'a str {
        case_name
            .strip_suffix(self.case_marker.as_str())
            .unwrap_or(case_name)
    }

    /// 从标签文件名提取骨骼名: 去掉扩展名, 再从第一个 `_label` 处截断.
    ///
    /// `Femur_L_label3.nii.gz` -> `Femur_L`.
    pub fn label_name<'a>(&self, file_name: &'a str) -> &'a str {
        let stem = file_name
            .strip_suffix(self.label_ext.as_str())
            .unwrap_or(file_name);
        match stem.split_once(self.label_id.as_str()) {
            Some((name, _)) => name,
            None => stem,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Conventions, MatchRule, Pattern, Role};

    #[test]
    fn test_default_roles() {
        let c = Conventions::default();
        assert!(c.matches(Role::TransformedLabels, "SMIR.Body.001_Segs_Transformed"));
        assert!(!c.matches(Role::TransformedLabels, "SMIR.Body.001_Extracted_Segs"));
        assert!(c.matches(Role::Case, "SMIR.Body.001.Pelvis-Thighs_Segmentation"));
        assert!(c.matches(Role::LabelFile, "Hip_R_label2.nii.gz"));
        assert!(!c.matches(Role::LabelFile, "Hip_R_label2.nrrd"));

        assert!(c.matches(Role::RawFile, "SMIR.Body.001.nrrd"));
        assert!(!c.matches(Role::RawFile, "Pelvis_Segmentation.seg.nrrd"));
        assert!(!c.matches(Role::RawFile, "SMIR.Body.001.nii.gz"));
    }

    #[test]
    fn test_label_name() {
        let c = Conventions::default();
        assert_eq!(c.label_name("Femur_L_label3.nii.gz"), "Femur_L");
        assert_eq!(c.label_name("Threshold-200-MAX_label8.nii.gz"), "Threshold-200-MAX");
        assert_eq!(c.label_name("Sacrum_label.nii.gz"), "Sacrum");
        assert_eq!(c.label_name("Tibia.nii.gz"), "Tibia");
        assert_eq!(c.label_name("Rib_label_copy_label4.nii.gz"), "Rib");
    }

    #[test]
    fn test_case_base_name() {
        let c = Conventions::default();
        assert_eq!(
            c.case_base_name("SMIR.Body.001.Pelvis-Thighs_Segmentation"),
            "SMIR.Body.001.Pelvis-Thighs"
        );
        assert_eq!(c.case_base_name("Study_Segs_Transformed"), "Study_Segs_Transformed");
    }

    #[test]
    fn test_custom_markers() {
        let c = Conventions::new("-Segs_Transformed", "-seg", ".nii", ".mha").with_separator('.');
        assert!(c.matches(Role::TransformedLabels, "a-Segs_Transformed"));
        assert!(c.matches(Role::RawFile, "scan.mha"));
        assert!(!c.matches(Role::RawFile, "scan-seg.mha"));
        assert_eq!(c.separator(), '.');
        assert_eq!(c.label_name("Femur_label1.nii"), "Femur");
    }

    #[test]
    fn test_extra_raw_rule() {
        let c = Conventions::default().with_rule(MatchRule {
            role: Role::RawFile,
            require: Pattern::Suffix(".nii.gz".to_string()),
            reject: Some(Pattern::Contains("_Segmentation".to_string())),
        });
        assert!(c.matches(Role::RawFile, "SMIR.Body.001.nii.gz"));
        assert!(c.matches(Role::RawFile, "SMIR.Body.001.nrrd"));
        assert!(!c.matches(Role::RawFile, "Pelvis_Segmentation.nii.gz"));
        assert!(!c.matches(Role::LabelFile, "SMIR.Body.001.nrrd"));
    }
}
