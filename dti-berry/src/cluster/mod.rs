//! 一维标量 k-means.
//!
//! 为 MRF 松弛与聚类分割提供类别质心. 算法为标准 Lloyd 迭代, 以调用方给定的初始均值为种子,
//! 类别顺序始终与种子顺序一致.

use crate::consts::DEFAULT_INITIAL_MEANS;
use crate::mrf::ClassModel;
use crate::{DtiMap, LabelVolume, SegResult};
use itertools::Itertools;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// k-means 选项.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KMeansOptions {
    /// 初始均值, 决定类别数与类别顺序.
    pub initial_means: Vec<f64>,

    /// 最大迭代次数.
    pub max_iterations: u32,

    /// 所有均值的移动量均不超过该值时停止.
    pub tolerance: f64,
}

impl Default for KMeansOptions {
    fn default() -> Self {
        Self {
            initial_means: DEFAULT_INITIAL_MEANS.to_vec(),
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

impl KMeansOptions {
    /// 以初始均值创建选项, 其余参数取默认值.
    pub fn with_means(initial_means: Vec<f64>) -> Self {
        Self {
            initial_means,
            ..Default::default()
        }
    }
}

/// k-means 结果.
#[derive(Clone, Debug)]
pub struct KMeansResult {
    /// 最终类别模型.
    pub model: ClassModel,

    /// 每个体素的最近均值编号.
    pub labels: LabelVolume,

    /// 实际迭代次数.
    pub iterations: u32,
}

impl KMeansResult {
    /// 最终均值.
    #[inline]
    pub fn means(&self) -> &[f64] {
        self.model.centroids()
    }
}

/// 对 `map` 的全部体素做一维 k-means.
///
/// 某一类在迭代中变为空时保留其原有均值. 初始均值为空时返回 [`crate::SegError::NoClasses`].
pub fn kmeans(map: &DtiMap, options: &KMeansOptions) -> SegResult<KMeansResult> {
    let mut model = ClassModel::new(options.initial_means.clone())?;
    let values = map.data();
    let k = model.len();

    let mut iterations = 0;
    while iterations < options.max_iterations {
        iterations += 1;

        let mut sums = vec![0.0; k];
        let mut counts = vec![0usize; k];
        for x in values.iter() {
            let x = *x as f64;
            let c = model.nearest(x) as usize;
            sums[c] += x;
            counts[c] += 1;
        }

        let means = model
            .centroids()
            .iter()
            .zip_eq(sums.iter().zip(counts.iter()))
            .enumerate()
            .map(|(c, (old, (sum, count)))| {
                if *count == 0 {
                    log::warn!("k-means class #{c} became empty, keeping mean {old}");
                    *old
                } else {
                    sum / *count as f64
                }
            })
            .collect_vec();
        let shift = model
            .centroids()
            .iter()
            .zip(means.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);

        model = ClassModel::new(means)?;
        log::debug!("k-means iteration {iterations}: max shift = {shift:e}");
        if shift <= options.tolerance {
            break;
        }
    }

    let labels = values.mapv(|x| model.nearest(x as f64));
    let labels = LabelVolume::with_header_of(map, labels)?;
    log::info!(
        "k-means finished in {iterations} iterations, means = {:?}",
        model.centroids()
    );
    Ok(KMeansResult {
        model,
        labels,
        iterations,
    })
}
