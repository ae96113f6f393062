//! 单个病例的标签合并与空间对齐.
//!
//! 病例的每个骨骼标签都会被加载、必要时最近邻重采样到参考网格, 再按类别 id
//! 绘制进同一个多类别标签体. 重叠体素以最后绘制者为准, 绘制顺序即病例标签列表的顺序
//! (发现阶段按文件名升序排列).

use crate::data::{BoneMask, MergedVolume, ReferenceGrid};
use crate::dataset::{BoneLabel, Vocabulary};
use crate::error::{CaseError, LabelShortfall, VolumeError};
use crate::ClassId;
use std::collections::BTreeSet;

/// 骨骼标签体数据的来源.
pub trait MaskSource {
    /// 加载 `label` 对应的二值标签.
    fn load(&self, label: &BoneLabel) -> Result<BoneMask, VolumeError>;
}

/// 从 nifti 文件加载标签.
#[derive(Copy, Clone, Debug, Default)]
pub struct NiftiMasks;

impl MaskSource for NiftiMasks {
    #[inline]
    fn load(&self, label: &BoneLabel) -> Result<BoneMask, VolumeError> {
        BoneMask::open(label.path())
    }
}

/// 单个病例的合并结果.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// 合并后的多类别标签体, 定义在病例的参考网格上.
    pub volume: MergedVolume,

    /// 实际贡献了前景体素的骨骼名.
    pub used: BTreeSet<String>,

    /// 因形状不一致而被重采样的标签个数.
    pub resampled: usize,
}

/// 标签合并器. 持有冻结的全局类别表.
#[derive(Debug)]
pub struct LabelMerger<'v, S = NiftiMasks> {
    vocab: &'v Vocabulary,
    source: S,
}

impl<'v> LabelMerger<'v> {
    /// 从 nifti 文件读取标签的合并器.
    #[inline]
    pub fn new(vocab: &'v Vocabulary) -> Self {
        Self::with_source(vocab, NiftiMasks)
    }
}

impl<'v, S: MaskSource> LabelMerger<'v, S> {
    /// 使用自定义标签来源.
    #[inline]
    pub fn with_source(vocab: &'v Vocabulary, source: S) -> Self {
        Self { vocab, source }
    }

    /// 将 `labels` 依次合并到 `grid` 上.
    ///
    /// 不在类别表中的标签被静默忽略. 没有任何标签在类别表中时返回
    /// [`CaseError::NoLabelsForCase`]; 所有候选标签都为空时返回
    /// [`CaseError::EmptyMergedVolume`].
    pub fn merge(
        &self,
        labels: &[BoneLabel],
        grid: &ReferenceGrid,
    ) -> Result<MergeOutcome, CaseError> {
        let wanted: Vec<(&BoneLabel, ClassId)> = labels
            .iter()
            .filter_map(|l| self.vocab.id(l.name()).map(|id| (l, id)))
            .collect();
        if wanted.is_empty() {
            return Err(CaseError::NoLabelsForCase(LabelShortfall::NoneInVocabulary));
        }

        let mut volume = MergedVolume::zeros(grid, self.vocab.max_id());
        let mut used = BTreeSet::new();
        let mut resampled = 0;
        for (label, id) in wanted {
            let mask = self
                .source
                .load(label)
                .map_err(|source| CaseError::VolumeLoad {
                    path: label.path().to_owned(),
                    source,
                })?;
            let mask = if mask.shape() != grid.shape {
                log::debug!(
                    "resampling {} from {:?} to {:?}",
                    label.path().display(),
                    mask.shape(),
                    grid.shape
                );
                resampled += 1;
                mask.resampled_to(grid.shape)
            } else {
                mask
            };

            if volume.paint(mask.data(), id) > 0 {
                used.insert(label.name().to_string());
            } else {
                log::debug!("label {} is empty", label.path().display());
            }
        }

        if used.is_empty() {
            return Err(CaseError::EmptyMergedVolume);
        }
        Ok(MergeOutcome {
            volume,
            used,
            resampled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GridAttr;
    use ndarray::{s, Array3};
    use std::collections::HashMap;
    use std::path::PathBuf;

    /// 以路径为键的内存标签来源.
    #[derive(Default)]
    struct MemMasks(HashMap<PathBuf, BoneMask>);

    impl MemMasks {
        fn add(&mut self, name: &str, data: Array3<u8>) -> BoneLabel {
            let label = BoneLabel::new(name, format!("/mem/{name}_label1.nii.gz"));
            self.0
                .insert(label.path().to_owned(), BoneMask::from_data(data));
            label
        }
    }

    impl MaskSource for MemMasks {
        fn load(&self, label: &BoneLabel) -> Result<BoneMask, VolumeError> {
            self.0.get(label.path()).cloned().ok_or_else(|| {
                VolumeError::Io(std::io::Error::from(std::io::ErrorKind::NotFound))
            })
        }
    }

    fn block(shape: (usize, usize, usize), x: std::ops::Range<usize>) -> Array3<u8> {
        let mut a = Array3::zeros(shape);
        a.slice_mut(s![x, .., ..]).fill(1);
        a
    }

    #[test]
    fn test_last_writer_wins() {
        let vocab = Vocabulary::from_names(["Femur_L", "Hip_L"]);
        let grid = ReferenceGrid::identity((6, 2, 2));
        let mut src = MemMasks::default();
        let femur = src.add("Femur_L", block((6, 2, 2), 0..4));
        let hip = src.add("Hip_L", block((6, 2, 2), 2..6));
        let merger = LabelMerger::with_source(&vocab, src);

        let a = merger.merge(&[femur.clone(), hip.clone()], &grid).unwrap();
        assert_eq!(a.volume.class_at((3, 0, 0)), 2);
        assert_eq!(a.volume.class_at((1, 0, 0)), 1);
        assert_eq!(a.volume.class_at((5, 1, 1)), 2);

        let b = merger.merge(&[hip, femur], &grid).unwrap();
        assert_eq!(b.volume.class_at((3, 0, 0)), 1);
        assert_eq!(b.volume.class_at((5, 1, 1)), 2);
        assert_eq!(b.used.len(), 2);
        assert_eq!(b.volume.shape(), grid.shape);
    }

    #[test]
    fn test_labels_outside_vocabulary() {
        let vocab = Vocabulary::from_names(["Sacrum"]);
        let grid = ReferenceGrid::identity((2, 2, 2));
        let mut src = MemMasks::default();
        let patella = src.add("Patella_L", Array3::ones((2, 2, 2)));
        let sacrum = src.add("Sacrum", Array3::zeros((2, 2, 2)));
        let merger = LabelMerger::with_source(&vocab, src);

        assert!(matches!(
            merger.merge(&[patella.clone()], &grid),
            Err(CaseError::NoLabelsForCase(LabelShortfall::NoneInVocabulary))
        ));
        assert!(matches!(
            merger.merge(&[patella, sacrum], &grid),
            Err(CaseError::EmptyMergedVolume)
        ));
    }

    #[test]
    fn test_resample_to_reference_grid() {
        let vocab = Vocabulary::from_names(["Femur_R"]);
        let grid = ReferenceGrid::identity((100, 100, 50));
        let mut src = MemMasks::default();
        let mut mask = Array3::zeros((50, 50, 50));
        mask.slice_mut(s![10..20, 10..20, 5..15]).fill(1);
        let femur = src.add("Femur_R", mask);
        let merger = LabelMerger::with_source(&vocab, src);

        let out = merger.merge(&[femur], &grid).unwrap();
        assert_eq!(out.volume.shape(), (100, 100, 50));
        assert_eq!(out.resampled, 1);
        assert!(out.volume.count(1) > 0);
        assert_eq!(out.volume.count(1) + out.volume.count(0), 100 * 100 * 50);
    }

    #[test]
    fn test_missing_mask_fails_case() {
        let vocab = Vocabulary::from_names(["Hip_R"]);
        let grid = ReferenceGrid::identity((2, 2, 2));
        let merger = LabelMerger::with_source(&vocab, MemMasks::default());
        let ghost = BoneLabel::new("Hip_R", "/mem/none.nii.gz");
        assert!(matches!(
            merger.merge(&[ghost], &grid),
            Err(CaseError::VolumeLoad { .. })
        ));
    }
}
