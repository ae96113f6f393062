use std::ops::Index;
use std::path::Path;

use ndarray::{Array3, ArrayD, ArrayView, Axis, Ix3};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::error::VolumeError;
use crate::Idx3d;

mod affine;
pub mod merged;
pub mod nrrd;
pub mod resample;
mod save;

pub use affine::Affine;
pub use merged::{ClassVolume, ElemWidth, MergedVolume};
pub use nrrd::NrrdVolume;
pub use save::NiftiWrite;

/// 参考网格: 体素形状和仿射变换.
///
/// 合并后的标签体总是使用其原始扫描的参考网格, 而不是任何单个标签文件的网格.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ReferenceGrid {
    /// 体素形状, `(x, y, z)`.
    pub shape: Idx3d,

    /// 体素坐标到物理坐标的仿射变换.
    pub affine: Affine,
}

impl ReferenceGrid {
    /// 构建参考网格.
    #[inline]
    pub fn new(shape: Idx3d, affine: Affine) -> Self {
        Self { shape, affine }
    }

    /// 单位仿射变换的网格.
    #[inline]
    pub fn identity(shape: Idx3d) -> Self {
        Self::new(shape, Affine::IDENTITY)
    }

    /// 生成与该网格一致的 nifti header. 仿射矩阵写入 sform, 体素分辨率写入 pixdim.
    ///
    /// 维数、数据类型等字段由写出时的数据决定.
    pub fn nifti_header(&self) -> NiftiHeader {
        let mut header = NiftiHeader::default();
        let (x, y, z) = self.shape;
        header.dim[0] = 3;
        header.dim[1] = x as _;
        header.dim[2] = y as _;
        header.dim[3] = z as _;

        let [sx, sy, sz] = self.affine.spacing();
        header.pixdim[0] = 1.0;
        header.pixdim[1] = sx as f32;
        header.pixdim[2] = sy as f32;
        header.pixdim[3] = sz as f32;

        let [rx, ry, rz] = self.affine.srows();
        header.srow_x = rx;
        header.srow_y = ry;
        header.srow_z = rz;
        // NIFTI_XFORM_SCANNER_ANAT
        header.sform_code = 1;
        header.qform_code = 0;
        // NIFTI_UNITS_MM
        header.xyzt_units = 2;
        header.scl_slope = 1.0;
        header.scl_inter = 0.0;
        header
    }
}

/// 定义在参考网格上的体数据的共用属性.
pub trait GridAttr {
    /// 获取参考网格.
    fn grid(&self) -> &ReferenceGrid;

    /// 获取数据形状大小.
    #[inline]
    fn shape(&self) -> Idx3d {
        self.grid().shape
    }

    /// 获取仿射变换.
    #[inline]
    fn affine(&self) -> &Affine {
        &self.grid().affine
    }

    /// 获取单个体素分辨率, 以毫米为单位, 按 `(x, y, z)` 排列.
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        self.affine().spacing()
    }
}

/// 读取 nifti 文件为 `(x, y, z)` 三维数组. 尾部长度为 1 的多余维度会被去掉.
fn read_nifti_3d(path: &Path) -> Result<(NiftiHeader, Array3<f32>), VolumeError> {
    let obj = ReaderOptions::new().read_file(path)?;
    let header = obj.header().clone();
    let mut data: ArrayD<f32> = obj.into_volume().into_ndarray::<f32>()?;

    while data.ndim() > 3 && data.shape()[data.ndim() - 1] == 1 {
        let last = data.ndim() - 1;
        data = data.index_axis_move(Axis(last), 0);
    }
    let shape = data.shape().to_vec();
    let data = data
        .into_dimensionality::<Ix3>()
        .map_err(|_| VolumeError::NotVolume3d(shape))?;
    Ok((header, data))
}

#[inline]
fn has_suffix_ignore_case(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.to_ascii_lowercase().ends_with(suffix))
}

/// 原始 CT 扫描. 体素值以 `f32` 保存, 并携带参考网格.
#[derive(Debug, Clone)]
pub struct RawScan {
    grid: ReferenceGrid,
    data: Array3<f32>,
    affine_issues: Vec<String>,
}

impl GridAttr for RawScan {
    #[inline]
    fn grid(&self) -> &ReferenceGrid {
        &self.grid
    }
}

impl Index<Idx3d> for RawScan {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl RawScan {
    /// 打开原始扫描. `.nii`/`.nii.gz` 文件按 nifti 读取, 其余按 NRRD 读取.
    ///
    /// 头部缺少空间信息不会导致失败: 仿射矩阵会退化, 缺失项可由
    /// [`affine_issues`](Self::affine_issues) 获取.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VolumeError> {
        let path = path.as_ref();
        if has_suffix_ignore_case(path, ".nii") || has_suffix_ignore_case(path, ".nii.gz") {
            let (header, data) = read_nifti_3d(path)?;
            let (affine, affine_issues) = if header.sform_code > 0 {
                (
                    Affine::from_srows([header.srow_x, header.srow_y, header.srow_z]),
                    vec![],
                )
            } else {
                let [_, x, y, z, ..] = header.pixdim;
                (
                    Affine::from_spacing([x as f64, y as f64, z as f64].map(f64::abs)),
                    vec!["sform missing, using pixdim only".to_string()],
                )
            };
            return Ok(Self::from_parts(data, affine).with_issues(affine_issues));
        }

        let vol = NrrdVolume::open(path)?;
        let (affine, affine_issues) = vol.header.affine();
        Ok(Self::from_parts(vol.data, affine).with_issues(affine_issues))
    }

    /// 由数据和仿射变换直接创建.
    pub fn from_parts(data: Array3<f32>, affine: Affine) -> Self {
        Self {
            grid: ReferenceGrid::new(data.dim(), affine),
            data,
            affine_issues: vec![],
        }
    }

    #[inline]
    fn with_issues(mut self, issues: Vec<String>) -> Self {
        self.affine_issues = issues;
        self
    }

    /// 计算仿射矩阵时缺失或无法解析的头部字段. 为空表示仿射矩阵完整.
    #[inline]
    pub fn affine_issues(&self) -> &[String] {
        &self.affine_issues
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, f32, Ix3> {
        self.data.view()
    }
}

/// 单个骨骼的二值标签. 正值体素记为 1, 其余为 0.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneMask {
    data: Array3<u8>,
}

impl Index<Idx3d> for BoneMask {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl BoneMask {
    /// 打开 nifti 格式的骨骼标签并二值化.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VolumeError> {
        let (_, data) = read_nifti_3d(path.as_ref())?;
        Ok(Self::from_data(data.mapv(|v| u8::from(v > 0.0))))
    }

    /// 由任意整数标签数据创建. 正值体素记为 1.
    pub fn from_data(data: Array3<u8>) -> Self {
        Self {
            data: data.mapv(|v| u8::from(v > 0)),
        }
    }

    /// 获取数据形状大小.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获取前景体素个数.
    #[inline]
    pub fn count(&self) -> usize {
        self.data.iter().filter(|p| **p > 0).count()
    }

    /// 是否没有任何前景体素.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|p| *p == 0)
    }

    /// 最近邻重采样到 `shape`. 形状已一致时直接返回自身.
    pub fn resampled_to(self, shape: Idx3d) -> Self {
        if self.shape() == shape {
            return self;
        }
        Self {
            data: resample::resample_nearest(self.data.view(), shape),
        }
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, u8, Ix3> {
        self.data.view()
    }
}
