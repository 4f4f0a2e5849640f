//! 病灶增强: 差异图, sigmoid 变换与直方图阈值.
//!
//! 直方图只统计体素值非零 (脑内) 的体素, 柱数为 [`HISTOGRAM_LEVELS`].

use crate::consts::HISTOGRAM_LEVELS;
use crate::{DtiMap, MapType, NiftiHeaderAttr, SegResult};

mod sigmoid;
mod threshold;

pub use sigmoid::Sigmoid;
pub use threshold::ThresholdMethod;

/// 计算差异图 `minuend - subtrahend`. 两者必须对齐, 结果沿用 `subtrahend` 的元信息.
pub fn difference(minuend: &DtiMap, subtrahend: &DtiMap) -> SegResult<DtiMap> {
    minuend.check_aligned(subtrahend)?;
    let data = &minuend.data() - &subtrahend.data();
    DtiMap::with_header(subtrahend.header(), data)
}

/// 由差异图 `diff` (`模板均值 - 被试`) 计算 `[0, 1]` 范围的病灶对比图.
///
/// 1. 落在 `map` 的差异区间 ([`MapType::difference_window`]) 之外的体素置为 0;
/// 2. 取绝对值;
/// 3. 线性拉伸到 `[0, 1]`. 全图取值相同时输出全 0.
///
/// 结果中越接近 1 的体素越可能是病灶, 与图类型无关.
pub fn lesion_contrast(diff: &DtiMap, map: MapType) -> SegResult<DtiMap> {
    let (lo, hi) = map.difference_window();
    let clipped = diff.data().mapv(|v| {
        let x = v as f64;
        if (lo..=hi).contains(&x) {
            x.abs()
        } else {
            0.0
        }
    });

    let (min, max) = clipped
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(a, b), v| (a.min(*v), b.max(*v)));
    let data = if max > min {
        clipped.mapv(|v| ((v - min) / (max - min)) as f32)
    } else {
        clipped.mapv(|_| 0.0)
    };
    log::debug!("{map} lesion contrast rescaled from [{min}, {max}]");
    DtiMap::with_header(diff.header(), data)
}

/// 非零体素值的等宽直方图.
#[derive(Clone, Debug)]
pub struct Histogram {
    min: f64,
    max: f64,
    counts: Vec<f64>,
}

impl Histogram {
    /// 统计 `map` 的非零体素. 没有非零有限体素时返回 `None`.
    pub fn of_non_zero(map: &DtiMap, levels: usize) -> Option<Self> {
        let values = || {
            map.data()
                .into_iter()
                .map(|v| *v as f64)
                .filter(|v| *v != 0.0 && v.is_finite())
        };
        let (min, max) = values().fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;

        let levels = levels.max(1);
        let mut counts = vec![0.0; levels];
        let width = (max - min) / levels as f64;
        for v in values() {
            let bin = if width > 0.0 {
                (((v - min) / width) as usize).min(levels - 1)
            } else {
                0
            };
            counts[bin] += 1.0;
        }
        Some(Self { min, max, counts })
    }

    /// 最小非零值.
    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大非零值.
    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// 各柱计数.
    #[inline]
    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    /// 第 `bin` 柱的上边界.
    #[inline]
    pub fn upper_edge(&self, bin: usize) -> f64 {
        let width = (self.max - self.min) / self.counts.len() as f64;
        self.min + (bin + 1) as f64 * width
    }

    /// 用 `method` 计算阈值. 所有非零值相同时返回该值.
    pub fn threshold(&self, method: ThresholdMethod) -> f64 {
        if self.max == self.min {
            return self.min;
        }
        match method.bin(&self.counts) {
            Some(bin) => self.upper_edge(bin),
            None => self.min,
        }
    }
}

/// 在 `map` 的非零体素上用 `method` 计算阈值. 没有非零体素时返回 `None`.
pub fn threshold(map: &DtiMap, method: ThresholdMethod) -> Option<f64> {
    Histogram::of_non_zero(map, HISTOGRAM_LEVELS).map(|h| h.threshold(method))
}

/// 由阈值算法推导输出范围为 `[0, 1]` 的最优 sigmoid 参数.
///
/// 设阈值为 `t`, 则 `beta = t`, `alpha = (高于 t 的均值 - 不高于 t 的均值) / 6`.
/// 某一侧为空或两侧均值相同时, `alpha = (max - min) / 12`.
/// 没有非零体素, 或全部非零体素取值相同时返回 `None`.
pub fn optimum_sigmoid(map: &DtiMap, method: ThresholdMethod) -> Option<Sigmoid> {
    let hist = Histogram::of_non_zero(map, HISTOGRAM_LEVELS)?;
    if hist.max() == hist.min() {
        return None;
    }
    let t = hist.threshold(method);

    let (mut below, mut above) = ((0.0, 0usize), (0.0, 0usize));
    for v in map.data().iter().map(|v| *v as f64) {
        if v == 0.0 || !v.is_finite() {
            continue;
        }
        let side = if v <= t { &mut below } else { &mut above };
        side.0 += v;
        side.1 += 1;
    }

    let spread = match (below, above) {
        ((lo, nl), (hi, nh)) if nl > 0 && nh > 0 => hi / nh as f64 - lo / nl as f64,
        _ => 0.0,
    };
    let alpha = if spread > 0.0 {
        spread / 6.0
    } else {
        (hist.max() - hist.min()) / 12.0
    };
    let sigmoid = Sigmoid::unit(alpha, t);
    log::info!("{method} threshold = {t}, sigmoid alpha = {alpha}");
    Some(sigmoid)
}
