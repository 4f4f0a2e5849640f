//! 3×3×3 邻域.
//!
//! 邻域内 27 个位置按 `(dz, dh, dw)` 字典序编号, 编号为
//! `(dz + 1) * 9 + (dh + 1) * 3 + (dw + 1)`. 中心体素编号为 [`CENTER`].
//!
//! 越界的邻居被视为不存在 (零填充): 既不参与读取, 也不会被写入.

use crate::Idx3d;
use itertools::iproduct;
use once_cell::sync::Lazy;

/// 邻域大小.
pub const NEIGHBOURHOOD_SIZE: usize = 27;

/// 中心体素在邻域中的编号.
pub const CENTER: usize = 13;

/// 邻域偏移量 `(dz, dh, dw)`, 下标即邻域编号.
pub static OFFSETS: Lazy<[(isize, isize, isize); NEIGHBOURHOOD_SIZE]> = Lazy::new(|| {
    let mut offsets = [(0, 0, 0); NEIGHBOURHOOD_SIZE];
    for (i, (dz, dh, dw)) in iproduct!(-1..=1, -1..=1, -1..=1).enumerate() {
        offsets[i] = (dz, dh, dw);
    }
    offsets
});

/// 获取邻域编号为 `i` 的位置相对中心的偏移量.
#[inline]
pub fn offset(i: usize) -> (isize, isize, isize) {
    OFFSETS[i]
}

/// 将 `pos` 按 `(dz, dh, dw)` 平移. 越出 `shape` 时返回 `None`.
#[inline]
pub fn shift(pos: Idx3d, (dz, dh, dw): (isize, isize, isize), shape: Idx3d) -> Option<Idx3d> {
    let z = pos.0.checked_add_signed(dz)?;
    let h = pos.1.checked_add_signed(dh)?;
    let w = pos.2.checked_add_signed(dw)?;
    (z < shape.0 && h < shape.1 && w < shape.2).then_some((z, h, w))
}

/// 遍历 `pos` 在 `shape` 内的 3×3×3 邻居 (包括 `pos` 自身), 产出 `(邻域编号, 索引)`.
pub fn neighbours(pos: Idx3d, shape: Idx3d) -> impl Iterator<Item = (usize, Idx3d)> {
    OFFSETS
        .iter()
        .enumerate()
        .filter_map(move |(i, d)| shift(pos, *d, shape).map(|p| (i, p)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_table() {
        assert_eq!(offset(CENTER), (0, 0, 0));
        assert_eq!(offset(0), (-1, -1, -1));
        assert_eq!(offset(26), (1, 1, 1));
        assert_eq!(offset(4), (-1, 0, 0));
        assert_eq!(offset(12), (0, 0, -1));
    }

    #[test]
    fn test_neighbours_clipped() {
        let shape = (5, 5, 5);
        assert_eq!(neighbours((2, 2, 2), shape).count(), 27);
        assert_eq!(neighbours((0, 0, 0), shape).count(), 8);
        assert_eq!(neighbours((0, 2, 2), shape).count(), 18);
        assert_eq!(neighbours((4, 4, 2), shape).count(), 12);
        assert!(neighbours((0, 0, 0), shape).any(|(i, p)| i == CENTER && p == (0, 0, 0)));
    }

    #[test]
    fn test_single_voxel_volume() {
        let v: Vec<_> = neighbours((0, 0, 0), (1, 1, 1)).collect();
        assert_eq!(v, vec![(CENTER, (0, 0, 0))]);
    }
}
