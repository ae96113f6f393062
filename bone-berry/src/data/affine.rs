//! 体素坐标到物理空间坐标的仿射变换.

/// 4x4 齐次仿射矩阵. 左上 3x3 块的第 `i` 列是第 `i` 个体素轴在物理空间中的方向向量
/// (长度即体素分辨率), 最后一列前三项为原点.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Affine([[f64; 4]; 4]);

impl Default for Affine {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    /// 单位变换.
    pub const IDENTITY: Affine = Affine([
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]);

    /// 由三个轴方向向量和原点构建. `directions[i]` 是第 `i` 个体素轴的方向向量.
    pub fn from_parts(directions: [[f64; 3]; 3], origin: [f64; 3]) -> Self {
        let mut m = Self::IDENTITY.0;
        for (axis, dir) in directions.iter().enumerate() {
            for (row, v) in dir.iter().enumerate() {
                m[row][axis] = *v;
            }
        }
        for (row, v) in origin.iter().enumerate() {
            m[row][3] = *v;
        }
        Self(m)
    }

    /// 由 nifti header 的 `srow_{x, y, z}` 三行构建.
    pub fn from_srows(rows: [[f32; 4]; 3]) -> Self {
        let mut m = Self::IDENTITY.0;
        for (row, src) in rows.iter().enumerate() {
            for (col, v) in src.iter().enumerate() {
                m[row][col] = *v as f64;
            }
        }
        Self(m)
    }

    /// 由各轴体素分辨率构建对角变换.
    pub fn from_spacing([x, y, z]: [f64; 3]) -> Self {
        Self::from_parts([[x, 0.0, 0.0], [0.0, y, 0.0], [0.0, 0.0, z]], [0.0; 3])
    }

    /// 第 `axis` 个体素轴的方向向量.
    #[inline]
    pub fn direction(&self, axis: usize) -> [f64; 3] {
        [self.0[0][axis], self.0[1][axis], self.0[2][axis]]
    }

    /// 原点.
    #[inline]
    pub fn origin(&self) -> [f64; 3] {
        [self.0[0][3], self.0[1][3], self.0[2][3]]
    }

    /// 各体素轴的分辨率, 即方向向量的模长.
    pub fn spacing(&self) -> [f64; 3] {
        [0, 1, 2].map(|axis| {
            let d = self.direction(axis);
            d.iter().map(|v| v * v).sum::<f64>().sqrt()
        })
    }

    /// 将体素坐标 `ijk` 变换到物理空间.
    pub fn apply(&self, ijk: [f64; 3]) -> [f64; 3] {
        [0, 1, 2].map(|row| {
            let r = &self.0[row];
            r[0] * ijk[0] + r[1] * ijk[1] + r[2] * ijk[2] + r[3]
        })
    }

    /// 转换为 nifti header 的 `srow_{x, y, z}`.
    pub fn srows(&self) -> [[f32; 4]; 3] {
        [0, 1, 2].map(|row| self.0[row].map(|v| v as f32))
    }
}

#[cfg(test)]
mod tests {
    use super::Affine;

    #[test]
    fn test_from_parts_columns() {
        let a = Affine::from_parts(
            [[0.5, 0.0, 0.0], [0.0, 0.0, 2.0], [0.0, -1.5, 0.0]],
            [10.0, 20.0, 30.0],
        );
        assert_eq!(a.direction(1), [0.0, 0.0, 2.0]);
        assert_eq!(a.origin(), [10.0, 20.0, 30.0]);
        assert_eq!(a.spacing(), [0.5, 2.0, 1.5]);
        assert_eq!(a.apply([2.0, 1.0, 1.0]), [11.0, 18.5, 32.0]);
    }

    #[test]
    fn test_srows_round_trip() {
        let a = Affine::from_spacing([0.75, 0.75, 3.0]);
        assert_eq!(Affine::from_srows(a.srows()), a);
        assert_eq!(Affine::default(), Affine::IDENTITY);
    }
}
