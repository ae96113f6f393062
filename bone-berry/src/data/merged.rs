//! 多类别合并标签体.

use super::{GridAttr, ReferenceGrid};
use crate::{ClassId, Idx3d};
use ndarray::{Array3, ArrayView3, Zip};

/// 合并标签体的元素位宽. 取能容纳最大类别 id 的最小无符号整数.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum ElemWidth {
    /// `u8`, 最大 id 不超过 255.
    U8,
    /// `u16`, 最大 id 不超过 65535.
    U16,
    /// `u32`.
    U32,
}

impl ElemWidth {
    /// 根据最大类别 id 选择位宽.
    #[inline]
    pub const fn for_max_id(max_id: ClassId) -> Self {
        if max_id <= u8::MAX as ClassId {
            Self::U8
        } else if max_id <= u16::MAX as ClassId {
            Self::U16
        } else {
            Self::U32
        }
    }
}

/// 类别 id 三维数组.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassVolume {
    /// 单字节类别 id.
    U8(Array3<u8>),
    /// 双字节类别 id.
    U16(Array3<u16>),
    /// 四字节类别 id.
    U32(Array3<u32>),
}

macro_rules! each_volume {
    ($vol: expr, $arr: ident => $body: expr) => {
        match $vol {
            ClassVolume::U8($arr) => $body,
            ClassVolume::U16($arr) => $body,
            ClassVolume::U32($arr) => $body,
        }
    };
}

impl ClassVolume {
    /// 创建全背景数组.
    pub fn zeros(shape: Idx3d, width: ElemWidth) -> Self {
        match width {
            ElemWidth::U8 => Self::U8(Array3::zeros(shape)),
            ElemWidth::U16 => Self::U16(Array3::zeros(shape)),
            ElemWidth::U32 => Self::U32(Array3::zeros(shape)),
        }
    }

    /// 元素位宽.
    #[inline]
    pub fn width(&self) -> ElemWidth {
        match self {
            Self::U8(_) => ElemWidth::U8,
            Self::U16(_) => ElemWidth::U16,
            Self::U32(_) => ElemWidth::U32,
        }
    }

    /// 数组形状.
    #[inline]
    pub fn dim(&self) -> Idx3d {
        each_volume!(self, a => a.dim())
    }

    /// 获取 `pos` 处的类别 id. 越界时 panic.
    #[inline]
    pub fn get(&self, pos: Idx3d) -> ClassId {
        each_volume!(self, a => a[pos] as ClassId)
    }

    /// 获取类别 id 为 `id` 的体素个数.
    pub fn count(&self, id: ClassId) -> usize {
        each_volume!(self, a => a.iter().filter(|p| **p as ClassId == id).count())
    }

    /// 将 `mask` 中为正的位置写为 `id`, 覆盖之前写入的任何值. 返回写入的体素个数.
    ///
    /// `id` 必须能被当前位宽容纳, 且 `mask` 形状必须与自身一致, 否则 panic.
    fn paint(&mut self, mask: ArrayView3<u8>, id: ClassId) -> usize {
        assert!(self.width() >= ElemWidth::for_max_id(id), "类别 id `{id}` 超出位宽");
        let mut painted = 0usize;
        each_volume!(self, a => {
            Zip::from(a).and(&mask).for_each(|dst, &m| {
                if m > 0 {
                    *dst = id as _;
                    painted += 1;
                }
            })
        });
        painted
    }
}

/// 绑定到参考网格的多类别标签体.
///
/// 形状和仿射变换总是取自参考网格 (即原始扫描).
#[derive(Debug, Clone, PartialEq)]
pub struct MergedVolume {
    grid: ReferenceGrid,
    classes: ClassVolume,
}

impl GridAttr for MergedVolume {
    #[inline]
    fn grid(&self) -> &ReferenceGrid {
        &self.grid
    }
}

impl MergedVolume {
    /// 在 `grid` 上创建全背景的合并标签体. 位宽由 `max_id` 决定.
    pub fn zeros(grid: &ReferenceGrid, max_id: ClassId) -> Self {
        Self {
            grid: *grid,
            classes: ClassVolume::zeros(grid.shape, ElemWidth::for_max_id(max_id)),
        }
    }

    /// 将 `mask` 中为正的位置写为类别 `id`. 返回写入的体素个数.
    ///
    /// 重叠区域以最后一次写入为准: 调用顺序决定重叠体素的类别.
    ///
    /// # 注意
    ///
    /// 1. `mask` 形状必须与参考网格一致, 否则程序 panic.
    /// 2. `id` 必须不超过创建时给出的 `max_id` 对应的位宽, 否则程序 panic.
    pub fn paint(&mut self, mask: ArrayView3<u8>, id: ClassId) -> usize {
        assert_eq!(mask.dim(), self.grid.shape, "标签与参考网格形状不一致");
        self.classes.paint(mask, id)
    }

    /// 获取 `pos` 处的类别 id. 越界时 panic.
    #[inline]
    pub fn class_at(&self, pos: Idx3d) -> ClassId {
        self.classes.get(pos)
    }

    /// 获取类别 id 为 `id` 的体素个数.
    #[inline]
    pub fn count(&self, id: ClassId) -> usize {
        self.classes.count(id)
    }

    /// 底层类别数组.
    #[inline]
    pub fn classes(&self) -> &ClassVolume {
        &self.classes
    }

    /// 元素位宽.
    #[inline]
    pub fn width(&self) -> ElemWidth {
        self.classes.width()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Affine;
    use ndarray::s;

    #[test]
    fn test_elem_width() {
        assert_eq!(ElemWidth::for_max_id(0), ElemWidth::U8);
        assert_eq!(ElemWidth::for_max_id(255), ElemWidth::U8);
        assert_eq!(ElemWidth::for_max_id(256), ElemWidth::U16);
        assert_eq!(ElemWidth::for_max_id(65535), ElemWidth::U16);
        assert_eq!(ElemWidth::for_max_id(65536), ElemWidth::U32);
    }

    #[test]
    fn test_paint_last_writer_wins() {
        let grid = ReferenceGrid::new((4, 4, 1), Affine::from_spacing([1.0, 1.0, 2.0]));
        let mut a = Array3::<u8>::zeros((4, 4, 1));
        a.slice_mut(s![0..3, .., ..]).fill(1);
        let mut b = Array3::<u8>::zeros((4, 4, 1));
        b.slice_mut(s![2..4, .., ..]).fill(1);

        let mut ab = MergedVolume::zeros(&grid, 2);
        assert_eq!(ab.paint(a.view(), 1), 12);
        assert_eq!(ab.paint(b.view(), 2), 8);
        assert_eq!(ab.class_at((2, 0, 0)), 2);

        let mut ba = MergedVolume::zeros(&grid, 2);
        ba.paint(b.view(), 2);
        ba.paint(a.view(), 1);
        assert_eq!(ba.class_at((2, 0, 0)), 1);

        assert_eq!(ab.grid(), &grid);
        assert_eq!(ab.count(0), 0);
        assert_eq!(ab.count(1) + ab.count(2), 16);
    }

    #[test]
    fn test_wide_ids() {
        let grid = ReferenceGrid::identity((2, 2, 2));
        let mut v = MergedVolume::zeros(&grid, 300);
        assert_eq!(v.width(), ElemWidth::U16);
        v.paint(Array3::<u8>::ones((2, 2, 2)).view(), 300);
        assert_eq!(v.class_at((1, 1, 1)), 300);
    }

    #[test]
    #[should_panic]
    fn test_paint_shape_mismatch() {
        let grid = ReferenceGrid::identity((2, 2, 2));
        let mut v = MergedVolume::zeros(&grid, 1);
        v.paint(Array3::<u8>::ones((2, 2, 3)).view(), 1);
    }
}
