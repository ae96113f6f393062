//! 标签体数据的最近邻重采样.
//!
//! 标签值是离散的类别, 因此这里只提供最近邻插值: 输出中的每个值都直接取自输入,
//! 不会产生输入中不存在的值.

use crate::Idx3d;
use ndarray::{s, Array3, ArrayView3};
use num::Zero;

/// 输出第 `out` 个位置在长度为 `in_len` 的输入轴上对应的最近邻下标.
///
/// 两端对齐: 输出首尾分别映射到输入首尾.
#[inline]
fn nearest_source(out: usize, in_len: usize, out_len: usize) -> usize {
    if in_len <= 1 || out_len <= 1 {
        return 0;
    }
    let pos = out as f64 * (in_len - 1) as f64 / (out_len - 1) as f64;
    (pos.round() as usize).min(in_len - 1)
}

/// 按各轴缩放系数 `factors` 进行最近邻缩放.
///
/// 输出形状为 `round(in_len * factor)`. 由于舍入, 输出形状可能与期望形状相差一个体素,
/// 可再用 [`fit_to_shape`] 修正.
pub fn zoom_nearest<T: Copy + Zero>(src: ArrayView3<T>, factors: [f64; 3]) -> Array3<T> {
    let (x, y, z) = src.dim();
    let out_len = |n: usize, f: f64| ((n as f64) * f).round().max(0.0) as usize;
    let out_shape = (out_len(x, factors[0]), out_len(y, factors[1]), out_len(z, factors[2]));

    if x == 0 || y == 0 || z == 0 {
        return Array3::zeros(out_shape);
    }

    let map = |n: usize, m: usize| -> Vec<usize> { (0..m).map(|o| nearest_source(o, n, m)).collect() };
    let (mx, my, mz) = (map(x, out_shape.0), map(y, out_shape.1), map(z, out_shape.2));

    Array3::from_shape_fn(out_shape, |(i, j, k)| src[(mx[i], my[j], mz[k])])
}

/// 将 `src` 裁剪或补零到 `shape`. 保留两者左上角 (下标 0 起) 的重叠区域.
pub fn fit_to_shape<T: Copy + Zero>(src: ArrayView3<T>, shape: Idx3d) -> Array3<T> {
    if src.dim() == shape {
        return src.to_owned();
    }
    let (x, y, z) = src.dim();
    let (a, b, c) = (x.min(shape.0), y.min(shape.1), z.min(shape.2));

    let mut out = Array3::zeros(shape);
    out.slice_mut(s![..a, ..b, ..c])
        .assign(&src.slice(s![..a, ..b, ..c]));
    out
}

/// 将 `src` 最近邻重采样到 `shape`, 并保证输出形状与 `shape` 完全一致.
pub fn resample_nearest<T: Copy + Zero>(src: ArrayView3<T>, shape: Idx3d) -> Array3<T> {
    let (x, y, z) = src.dim();
    if (x, y, z) == shape {
        return src.to_owned();
    }
    let factor = |target: usize, n: usize| if n == 0 { 0.0 } else { target as f64 / n as f64 };
    let zoomed = zoom_nearest(src, [factor(shape.0, x), factor(shape.1, y), factor(shape.2, z)]);
    fit_to_shape(zoomed.view(), shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use std::collections::BTreeSet;

    fn distinct(a: &Array3<u8>) -> BTreeSet<u8> {
        a.iter().copied().collect()
    }

    #[test]
    fn test_upsample_halved_grid() {
        // (50, 50, 50) -> (100, 100, 50).
        let mut src = Array3::<u8>::zeros((50, 50, 50));
        src.slice_mut(s![10..20, 10..20, 5..15]).fill(1);
        let out = resample_nearest(src.view(), (100, 100, 50));

        assert_eq!(out.dim(), (100, 100, 50));
        assert_eq!(out[(0, 0, 0)], 0);
        assert_eq!(out[(30, 30, 10)], 1);
        assert_eq!(distinct(&out), distinct(&src));

        // 体素个数只是近似保持: 面内放大 4 倍.
        let before = src.iter().filter(|v| **v == 1).count() as f64;
        let after = out.iter().filter(|v| **v == 1).count() as f64;
        assert!((after / before - 4.0).abs() < 0.5);
    }

    #[test]
    fn test_never_introduces_new_values() {
        let src = Array3::from_shape_fn((7, 5, 3), |(i, j, k)| [0u8, 3, 9][(i + 2 * j + k) % 3]);
        for shape in [(3, 3, 3), (11, 4, 9), (1, 1, 1), (14, 10, 6)] {
            let out = resample_nearest(src.view(), shape);
            assert_eq!(out.dim(), shape);
            assert!(distinct(&out).is_subset(&distinct(&src)));
        }
    }

    #[test]
    fn test_zoom_endpoints_aligned() {
        let src = Array3::from_shape_fn((4, 1, 1), |(i, _, _)| i as u8 + 1);
        let out = zoom_nearest(src.view(), [2.0, 1.0, 1.0]);
        assert_eq!(out.dim(), (8, 1, 1));
        assert_eq!(out[(0, 0, 0)], 1);
        assert_eq!(out[(7, 0, 0)], 4);
    }

    #[test]
    fn test_fit_crop_and_pad() {
        let src = Array3::<u8>::ones((3, 5, 2));
        let out = fit_to_shape(src.view(), (4, 4, 2));
        assert_eq!(out.dim(), (4, 4, 2));
        assert_eq!(out[(2, 3, 1)], 1);
        // 补零部分.
        assert_eq!(out[(3, 0, 0)], 0);
        assert_eq!(out.iter().filter(|v| **v == 1).count(), 3 * 4 * 2);
    }
}
