//! 体数据的持久化存储.

use super::{BoneMask, ClassVolume, GridAttr, MergedVolume, RawScan, ReferenceGrid};
use crate::error::VolumeError;
use nifti::writer::WriterOptions;
use std::path::Path;

/// 表明一个可以按 nifti 格式持久化存储的体数据对象.
///
/// 文件名以 `.gz` 结尾时会自动压缩. header 由对象的参考网格生成
/// (见 [`ReferenceGrid::nifti_header`]), 因此同一网格上的图像和标签拥有完全相同的空间信息.
pub trait NiftiWrite {
    /// 保存到 `path` 路径.
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), VolumeError>;
}

impl NiftiWrite for RawScan {
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), VolumeError> {
        let header = self.grid().nifti_header();
        WriterOptions::new(path.as_ref())
            .reference_header(&header)
            .write_nifti(&self.data())?;
        Ok(())
    }
}

impl NiftiWrite for MergedVolume {
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), VolumeError> {
        let header = self.grid().nifti_header();
        let writer = WriterOptions::new(path.as_ref()).reference_header(&header);
        match self.classes() {
            ClassVolume::U8(a) => writer.write_nifti(a)?,
            ClassVolume::U16(a) => writer.write_nifti(a)?,
            ClassVolume::U32(a) => writer.write_nifti(a)?,
        }
        Ok(())
    }
}

/// 以单位仿射变换保存.
impl NiftiWrite for BoneMask {
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), VolumeError> {
        let header = ReferenceGrid::identity(self.shape()).nifti_header();
        WriterOptions::new(path.as_ref())
            .reference_header(&header)
            .write_nifti(&self.data())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Affine;
    use ndarray::Array3;

    #[test]
    fn test_merged_and_scan_share_grid() {
        let dir = tempfile::tempdir().unwrap();
        let affine = Affine::from_parts(
            [[0.75, 0.0, 0.0], [0.0, 0.75, 0.0], [0.0, 0.0, 2.0]],
            [-100.0, -120.0, 40.0],
        );
        let scan = RawScan::from_parts(Array3::from_elem((3, 4, 2), -50.0), affine);
        let mut merged = MergedVolume::zeros(scan.grid(), 2);
        let mut mask = Array3::<u8>::zeros((3, 4, 2));
        mask[(1, 2, 1)] = 1;
        merged.paint(mask.view(), 2);

        let img = dir.path().join("CASE_001_0000.nii.gz");
        let lbl = dir.path().join("CASE_001.nii.gz");
        scan.save(&img).unwrap();
        merged.save(&lbl).unwrap();

        let scan_back = RawScan::open(&img).unwrap();
        assert!(scan_back.affine_issues().is_empty());
        assert_eq!(scan_back.grid(), scan.grid());
        assert_eq!(scan_back[(2, 3, 1)], -50.0);

        let lbl_back = BoneMask::open(&lbl).unwrap();
        assert_eq!(lbl_back.shape(), (3, 4, 2));
        assert_eq!(lbl_back.count(), 1);
        assert_eq!(lbl_back[(1, 2, 1)], 1);
    }
}
