//! 单体素统计判定.
//!
//! 对每个脑内体素 `p` 计算
//!
//! ```text
//! z(p) = (subject(p) - mean(p)) / std(p)
//! ```
//!
//! 再按图类型的异常方向 ([`crate::Abnormality`]) 与阈值比较.
//!
//! 1. 被试图体素值为 `0` 的位置被视为脑外, 永远不参与检验.
//! 2. `std(p) == 0` 的位置永远不会被判为异常, 也不会产生错误.
//! 3. [`MapType::ParallelDiffusivity`] 没有判定规则, 任何体素都不会被判为异常.

use crate::consts::label::*;
use crate::data::for_each_voxel_mut;
use crate::template::StatTemplate;
use crate::{DtiMap, LabelVolume, MapType, NiftiHeaderAttr, SegResult};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 计算 z 分数. 标准差为 0 时返回 `None`.
#[inline]
pub fn z_score(value: f64, mean: f64, std: f64) -> Option<f64> {
    (std != 0.0).then(|| (value - mean) / std)
}

/// 按图类型 `map` 判定统计量 `z` 在阈值 `threshold` 下是否异常.
///
/// 该函数关于 `threshold` 单调: 提高阈值不会让原本正常的体素变为异常.
#[inline]
pub fn local_decision(z: f64, threshold: f64, map: MapType) -> bool {
    map.abnormality().holds(z, threshold)
}

/// 单体素判定规则: 图类型与阈值.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VoxelDecision {
    /// 被试图类型.
    pub map: MapType,

    /// 判定阈值 (z 或 t 分数), 非负.
    pub threshold: f64,
}

impl VoxelDecision {
    /// 创建判定规则.
    pub fn new(map: MapType, threshold: f64) -> Self {
        Self { map, threshold }
    }

    /// 判定体素值 `value` 相对模板 `(mean, std)` 是否异常.
    ///
    /// `value == 0` (脑外) 或 `std == 0` 时返回 `false`.
    #[inline]
    pub fn is_abnormal(&self, value: f32, mean: f32, std: f32) -> bool {
        if value == 0.0 {
            return false;
        }
        z_score(value as f64, mean as f64, std as f64)
            .map_or(false, |z| local_decision(z, self.threshold, self.map))
    }

    /// 对整个被试图做单轮扫描, 返回 `{0, 1}` 标签.
    ///
    /// 输入数据不会被修改.
    pub fn decide(
        &self,
        subject: &DtiMap,
        template: &StatTemplate,
    ) -> SegResult<(LabelVolume, DecisionReport)> {
        let mut label = LabelVolume::background_like(subject);
        let report = self.mark_into(subject, template, &mut label)?;
        Ok((label, report))
    }

    /// 在已有标签 `label` 上将异常体素置为 `1`. 其余体素保持不变.
    pub fn mark_into(
        &self,
        subject: &DtiMap,
        template: &StatTemplate,
        label: &mut LabelVolume,
    ) -> SegResult<DecisionReport> {
        template.check_aligned(subject)?;
        subject.check_aligned(label)?;

        let (x, mean, std) = (subject.data(), template.mean.data(), template.std.data());
        let tested = AtomicUsize::new(0);
        let abnormal = AtomicUsize::new(0);

        let mut buffer = label.data().to_owned();
        for_each_voxel_mut(&mut buffer, |pos, v| {
            if x[pos] == 0.0 {
                return;
            }
            tested.fetch_add(1, Ordering::Relaxed);
            if self.is_abnormal(x[pos], mean[pos], std[pos]) {
                abnormal.fetch_add(1, Ordering::Relaxed);
                *v = LESION_CANDIDATE;
            }
        });
        label.data_mut().assign(&buffer);

        let report = DecisionReport {
            voxels: subject.size(),
            tested: tested.into_inner(),
            abnormal: abnormal.into_inner(),
        };
        log::info!("{} single pass: {report}", self.map);
        Ok(report)
    }
}

/// 单轮扫描统计.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecisionReport {
    /// 体素总数.
    pub voxels: usize,

    /// 参与检验的 (脑内) 体素个数.
    pub tested: usize,

    /// 被判为异常的体素个数.
    pub abnormal: usize,
}

impl fmt::Display for DecisionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} tested voxels abnormal ({} voxels in total)",
            self.abnormal, self.tested, self.voxels
        )
    }
}
