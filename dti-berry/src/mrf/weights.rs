//! MRF 邻域权重.

use super::ClassModel;
use crate::neighbour::{offset, CENTER, NEIGHBOURHOOD_SIZE};

/// 原始 3×3×3 权重表, 按 `[dz + 1][dh + 1][dw + 1]` 索引.
pub type RawWeights = [[[f64; 3]; 3]; 3];

/// 默认原始权重. 同一水平切片内的邻居权重更高, 中心为 0.
pub const DEFAULT_RAW_WEIGHTS: RawWeights = [
    [[1.0, 1.5, 1.0], [1.5, 1.0, 1.5], [1.0, 1.5, 1.0]],
    [[1.5, 2.0, 1.5], [2.0, 0.0, 2.0], [1.5, 2.0, 1.5]],
    [[1.0, 1.5, 1.0], [1.5, 1.0, 1.5], [1.0, 1.5, 1.0]],
];

/// 归一化后的 27 邻域权重, 下标为邻域编号 (见 [`crate::neighbour`]).
///
/// 中心权重恒为 0.
#[derive(Clone, Debug, PartialEq)]
pub struct NeighborhoodWeights {
    weights: [f64; NEIGHBOURHOOD_SIZE],
}

impl NeighborhoodWeights {
    /// 由原始权重表与类别模型构造. 设 `m` 为全部质心的算术平均值,
    /// 则 `w_i = raw_i * m / (2 * Σ raw)`.
    ///
    /// 中心权重在求和之前即被置为 0. 原始权重之和为 0 时, 全部权重为 0.
    pub fn normalized(raw: &RawWeights, model: &ClassModel) -> Self {
        let mut weights = [0.0; NEIGHBOURHOOD_SIZE];
        for (i, w) in weights.iter_mut().enumerate() {
            let (dz, dh, dw) = offset(i);
            *w = raw[(dz + 1) as usize][(dh + 1) as usize][(dw + 1) as usize];
        }
        weights[CENTER] = 0.0;

        let total: f64 = weights.iter().sum();
        if total != 0.0 {
            let scale = model.mean_centroid() / (2.0 * total);
            weights.iter_mut().for_each(|w| *w *= scale);
        }
        Self { weights }
    }

    /// 使用 [`DEFAULT_RAW_WEIGHTS`] 构造.
    #[inline]
    pub fn for_model(model: &ClassModel) -> Self {
        Self::normalized(&DEFAULT_RAW_WEIGHTS, model)
    }

    /// 获取邻域编号为 `i` 的权重.
    #[inline]
    pub fn get(&self, i: usize) -> f64 {
        self.weights[i]
    }

    /// 以切片形式获取全部权重.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.weights
    }

    /// 全部权重之和.
    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }
}
