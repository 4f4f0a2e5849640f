//! 马尔可夫随机场 (MRF) 松弛.
//!
//! 以迭代条件模式 (ICM) 对类别标签做空间平滑. 对体素值为 `x` 的体素, 类别 `k` 的代价为
//!
//! ```text
//! cost_k = |x - c_k| + s * Σ { w_i : 邻居 i 在体内, 且 label_i != k }
//! ```
//!
//! 其中 `c_k` 为第 `k` 类的质心, `s` 为平滑因子, `w_i` 为 [`NeighborhoodWeights`].
//! 体素被重新分配到代价最小的类别, 代价相同时取编号较小者.
//!
//! 每轮迭代读取上一轮的完整标签快照并写入新缓冲区. 当某轮改变标签的体素比例
//! 不超过误差容忍度, 或迭代次数达到上限时停止. 两者同时满足时报告前者.

use crate::consts::{
    DEFAULT_MRF_ERROR_TOLERANCE, DEFAULT_MRF_MAX_ITERATIONS, DEFAULT_MRF_SMOOTHING,
};
use crate::data::for_each_voxel_mut;
use crate::neighbour::neighbours;
use crate::{DtiMap, LabelVolume, NiftiHeaderAttr, SegError, SegResult};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod weights;

pub use weights::{NeighborhoodWeights, RawWeights, DEFAULT_RAW_WEIGHTS};

/// 类别模型: 按类别编号排列的质心.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClassModel {
    centroids: Vec<f64>,
}

impl ClassModel {
    /// 以质心列表创建类别模型. 第 `k` 个质心即第 `k` 类.
    ///
    /// # 错误
    ///
    /// 1. 质心为空时返回 [`SegError::NoClasses`].
    /// 2. 类别数超过 255 时返回 [`SegError::TooManyClasses`].
    /// 3. 存在非有限质心时返回 [`SegError::NonFiniteCentroid`].
    pub fn new(centroids: Vec<f64>) -> SegResult<Self> {
        if centroids.is_empty() {
            return Err(SegError::NoClasses);
        }
        if centroids.len() > u8::MAX as usize {
            return Err(SegError::TooManyClasses(centroids.len()));
        }
        if let Some(k) = centroids.iter().position(|c| !c.is_finite()) {
            return Err(SegError::NonFiniteCentroid(k));
        }
        Ok(Self { centroids })
    }

    /// 类别数.
    #[inline]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    /// 全部质心.
    #[inline]
    pub fn centroids(&self) -> &[f64] {
        &self.centroids
    }

    /// 质心的算术平均值.
    pub fn mean_centroid(&self) -> f64 {
        self.centroids.iter().sum::<f64>() / self.len() as f64
    }

    /// 距离 `x` 最近的质心编号. 距离相同时取编号较小者.
    pub fn nearest(&self, x: f64) -> u8 {
        let mut best = (0, f64::INFINITY);
        for (k, c) in self.centroids.iter().enumerate() {
            let d = (x - c).abs();
            if d < best.1 {
                best = (k, d);
            }
        }
        best.0 as u8
    }
}

/// MRF 迭代参数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MrfParams {
    /// 最大迭代次数.
    pub max_iterations: u32,

    /// 误差容忍度: 单轮改变标签的体素比例不超过该值时停止.
    pub error_tolerance: f64,

    /// 平滑因子, 即空间项相对数据项的权重.
    pub smoothing_factor: f64,
}

impl Default for MrfParams {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MRF_MAX_ITERATIONS,
            error_tolerance: DEFAULT_MRF_ERROR_TOLERANCE,
            smoothing_factor: DEFAULT_MRF_SMOOTHING,
        }
    }
}

/// MRF 停止原因.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StopCondition {
    /// 达到最大迭代次数.
    MaximumIterations,

    /// 改变比例不超过误差容忍度.
    ErrorTolerance,
}

impl fmt::Display for StopCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopCondition::MaximumIterations => "MaximumNumberOfIterations",
            StopCondition::ErrorTolerance => "ErrorTolerance",
        })
    }
}

/// MRF 运行结果.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MrfReport {
    /// 实际迭代次数.
    pub iterations: u32,

    /// 停止原因.
    pub stop: StopCondition,

    /// 最后一轮改变标签的体素比例.
    pub changed_fraction: f64,
}

impl fmt::Display for MrfReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} iterations, stopped by {} (changed fraction = {:e})",
            self.iterations, self.stop, self.changed_fraction
        )
    }
}

/// MRF 松弛器.
#[derive(Clone, Debug)]
pub struct MrfRelaxation {
    model: ClassModel,
    weights: NeighborhoodWeights,
    params: MrfParams,
}

impl MrfRelaxation {
    /// 以默认邻域权重创建松弛器.
    pub fn new(model: ClassModel, params: MrfParams) -> Self {
        let weights = NeighborhoodWeights::for_model(&model);
        Self::with_weights(model, weights, params)
    }

    /// 以给定邻域权重创建松弛器.
    pub fn with_weights(
        model: ClassModel,
        weights: NeighborhoodWeights,
        params: MrfParams,
    ) -> Self {
        Self {
            model,
            weights,
            params,
        }
    }

    /// 获取类别模型.
    #[inline]
    pub fn model(&self) -> &ClassModel {
        &self.model
    }

    /// 获取邻域权重.
    #[inline]
    pub fn weights(&self) -> &NeighborhoodWeights {
        &self.weights
    }

    /// 以最近质心为初始标签, 对 `feature` 执行松弛.
    pub fn run(&self, feature: &DtiMap) -> SegResult<(LabelVolume, MrfReport)> {
        let initial = feature.data().mapv(|x| self.model.nearest(x as f64));
        let initial = LabelVolume::with_header_of(feature, initial)?;
        self.relax(feature, &initial)
    }

    /// 以 `initial` 为初始标签, 对 `feature` 执行松弛.
    ///
    /// `initial` 中不小于类别数的标签值不属于任何类别, 它们在第一轮即被重新分配.
    pub fn relax(
        &self,
        feature: &DtiMap,
        initial: &LabelVolume,
    ) -> SegResult<(LabelVolume, MrfReport)> {
        feature.check_aligned(initial)?;

        let shape = feature.shape();
        let total = feature.size().max(1) as f64;
        let x = feature.data();
        let classes = self.model.len();
        let s = self.params.smoothing_factor;

        let mut current = initial.data().to_owned();
        let mut report = MrfReport {
            iterations: 0,
            stop: StopCondition::MaximumIterations,
            changed_fraction: 0.0,
        };
        while report.iterations < self.params.max_iterations {
            let snapshot = current.view();
            let changed = AtomicUsize::new(0);
            let mut next = current.clone();

            for_each_voxel_mut(&mut next, |pos, v| {
                let value = x[pos] as f64;
                let mut best = (0, f64::INFINITY);
                for k in 0..classes {
                    let penalty: f64 = neighbours(pos, shape)
                        .filter(|(_, n)| snapshot[*n] as usize != k)
                        .map(|(i, _)| self.weights.get(i))
                        .sum();
                    let cost = (value - self.model.centroids[k]).abs() + s * penalty;
                    if cost < best.1 {
                        best = (k, cost);
                    }
                }
                let label = best.0 as u8;
                if *v != label {
                    *v = label;
                    changed.fetch_add(1, Ordering::Relaxed);
                }
            });

            current = next;
            report.iterations += 1;
            report.changed_fraction = changed.into_inner() as f64 / total;
            log::debug!(
                "MRF iteration {}: changed fraction = {:e}",
                report.iterations,
                report.changed_fraction
            );
            if report.changed_fraction <= self.params.error_tolerance {
                report.stop = StopCondition::ErrorTolerance;
                break;
            }
        }

        log::info!("MRF relaxation: {report}");
        let label = LabelVolume::with_header_of(feature, current)?;
        Ok((label, report))
    }
}
