//! 直方图阈值算法.
//!
//! 全部算法在归一化直方图上按柱编号工作, 返回阈值柱编号 `t`:
//! 编号不超过 `t` 的柱为 "低类", 其余为 "高类".

use crate::{SegError, SegResult};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 直方图阈值算法.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ThresholdMethod {
    /// Kapur 最大熵.
    MaxEntropy,

    /// Otsu 最大类间方差.
    Otsu,

    /// 二阶 Rényi 熵.
    Renyi,

    /// Tsai 矩保持.
    Moments,

    /// 迭代类间均值 (Ridler-Calvard).
    IsoData,

    /// Yen 最大相关性.
    Yen,
}

impl ThresholdMethod {
    /// 全部阈值算法.
    pub const ALL: [ThresholdMethod; 6] = [
        ThresholdMethod::MaxEntropy,
        ThresholdMethod::Otsu,
        ThresholdMethod::Renyi,
        ThresholdMethod::Moments,
        ThresholdMethod::IsoData,
        ThresholdMethod::Yen,
    ];

    /// 字符串记号.
    #[inline]
    pub const fn token(&self) -> &'static str {
        match self {
            ThresholdMethod::MaxEntropy => "MaxEntropy",
            ThresholdMethod::Otsu => "Otsu",
            ThresholdMethod::Renyi => "Renyi",
            ThresholdMethod::Moments => "Moments",
            ThresholdMethod::IsoData => "IsoData",
            ThresholdMethod::Yen => "Yen",
        }
    }

    /// 在直方图 `hist` 上计算阈值柱编号. 直方图少于两柱或全空时返回 `None`.
    pub fn bin(&self, hist: &[f64]) -> Option<usize> {
        let total: f64 = hist.iter().sum();
        if hist.len() < 2 || total <= 0.0 {
            return None;
        }
        let p: Vec<f64> = hist.iter().map(|h| h / total).collect();
        match self {
            ThresholdMethod::MaxEntropy => max_entropy(&p),
            ThresholdMethod::Otsu => otsu(&p),
            ThresholdMethod::Renyi => renyi(&p),
            ThresholdMethod::Moments => moments(&p),
            ThresholdMethod::IsoData => iso_data(&p),
            ThresholdMethod::Yen => yen(&p),
        }
    }
}

impl fmt::Display for ThresholdMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for ThresholdMethod {
    type Err = SegError;

    fn from_str(s: &str) -> SegResult<Self> {
        ThresholdMethod::ALL
            .into_iter()
            .find(|m| m.token() == s)
            .ok_or_else(|| SegError::UnknownThresholdMethod(s.to_string()))
    }
}

/// 累积概率.
fn cumulative(p: &[f64]) -> Vec<f64> {
    p.iter()
        .scan(0.0, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

/// 在 `t ∈ [0, L - 2]` 中取 `score(t)` 最大者. 并列时取最小的 `t`, 非有限分数被忽略.
fn arg_max<F: Fn(usize) -> f64>(len: usize, score: F) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for t in 0..len - 1 {
        let s = score(t);
        if !s.is_finite() {
            continue;
        }
        if best.map_or(true, |(_, b)| s > b) {
            best = Some((t, s));
        }
    }
    best.map(|(t, _)| t)
}

fn otsu(p: &[f64]) -> Option<usize> {
    let cum = cumulative(p);
    let cum_mean: Vec<f64> = p
        .iter()
        .enumerate()
        .scan(0.0, |acc, (i, v)| {
            *acc += i as f64 * v;
            Some(*acc)
        })
        .collect();
    let mu = cum_mean[p.len() - 1];
    arg_max(p.len(), |t| {
        let w0 = cum[t];
        let w1 = 1.0 - w0;
        if w0 <= 0.0 || w1 <= 0.0 {
            return f64::NAN;
        }
        let d = mu * w0 - cum_mean[t];
        d * d / (w0 * w1)
    })
}

/// 一段概率的 Shannon 熵, 以该段总概率归一化.
fn entropy(p: &[f64], mass: f64) -> f64 {
    p.iter()
        .filter(|v| **v > 0.0)
        .map(|v| {
            let q = v / mass;
            -q * q.ln()
        })
        .sum()
}

/// 以 `t` 切分后两段的总概率. 直接求和, 避免 `1 - cum` 在尾部的舍入误差.
fn split_mass(p: &[f64], t: usize) -> (f64, f64) {
    (p[..=t].iter().sum(), p[t + 1..].iter().sum())
}

fn max_entropy(p: &[f64]) -> Option<usize> {
    arg_max(p.len(), |t| {
        let (lo, hi) = split_mass(p, t);
        if lo <= 0.0 || hi <= 0.0 {
            return f64::NAN;
        }
        entropy(&p[..=t], lo) + entropy(&p[t + 1..], hi)
    })
}

fn renyi(p: &[f64]) -> Option<usize> {
    let collision = |s: &[f64], mass: f64| -> f64 {
        -s.iter().map(|v| (v / mass).powi(2)).sum::<f64>().ln()
    };
    arg_max(p.len(), |t| {
        let (lo, hi) = split_mass(p, t);
        if lo <= 0.0 || hi <= 0.0 {
            return f64::NAN;
        }
        collision(&p[..=t], lo) + collision(&p[t + 1..], hi)
    })
}

fn yen(p: &[f64]) -> Option<usize> {
    let sq: Vec<f64> = p.iter().map(|v| v * v).collect();
    arg_max(p.len(), |t| {
        let (lo, hi) = split_mass(p, t);
        let (sq_lo, sq_hi) = split_mass(&sq, t);
        if lo <= 0.0 || hi <= 0.0 || sq_lo <= 0.0 || sq_hi <= 0.0 {
            return f64::NAN;
        }
        -(sq_lo * sq_hi).ln() + 2.0 * (lo * hi).ln()
    })
}

fn iso_data(p: &[f64]) -> Option<usize> {
    let mean_of = |s: &[f64], offset: usize| -> Option<f64> {
        let mass: f64 = s.iter().sum();
        (mass > 0.0).then(|| {
            s.iter()
                .enumerate()
                .map(|(i, v)| (i + offset) as f64 * v)
                .sum::<f64>()
                / mass
        })
    };
    let last = p.len() - 2;
    let mut t = mean_of(p, 0)?.floor().min(last as f64) as usize;
    // 阈值在有限个柱上单调收敛, 柱数即为迭代上界.
    for _ in 0..p.len() {
        let lo = mean_of(&p[..=t], 0);
        let hi = mean_of(&p[t + 1..], t + 1);
        let next = match (lo, hi) {
            (Some(a), Some(b)) => ((a + b) / 2.0).floor().min(last as f64) as usize,
            _ => break,
        };
        if next == t {
            break;
        }
        t = next;
    }
    Some(t)
}

fn moments(p: &[f64]) -> Option<usize> {
    let moment = |k: i32| -> f64 {
        p.iter()
            .enumerate()
            .map(|(i, v)| (i as f64).powi(k) * v)
            .sum()
    };
    let (m1, m2, m3) = (moment(1), moment(2), moment(3));
    let cd = m2 - m1 * m1;
    if cd <= 0.0 {
        return None;
    }
    let c0 = (-m2 * m2 + m1 * m3) / cd;
    let c1 = (m1 * m2 - m3) / cd;
    let disc = (c1 * c1 - 4.0 * c0).max(0.0).sqrt();
    let z0 = 0.5 * (-c1 - disc);
    let z1 = 0.5 * (-c1 + disc);
    if z1 == z0 {
        return None;
    }
    // 低类应占的概率.
    let p0 = (z1 - m1) / (z1 - z0);
    let cum = cumulative(p);
    let t = cum.iter().position(|c| *c >= p0).unwrap_or(p.len() - 1);
    Some(t.min(p.len() - 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 两个分离的高斯峰: 中心分别在 20 与 90 柱.
    fn bimodal() -> Vec<f64> {
        (0..128)
            .map(|i| {
                let a = (-((i as f64 - 20.0) / 5.0).powi(2)).exp();
                let b = 0.5 * (-((i as f64 - 90.0) / 6.0).powi(2)).exp();
                a + b
            })
            .collect()
    }

    #[test]
    fn test_tokens() {
        for m in ThresholdMethod::ALL {
            assert_eq!(m.to_string().parse::<ThresholdMethod>().unwrap(), m);
        }
        assert!(matches!(
            "Triangle".parse::<ThresholdMethod>(),
            Err(SegError::UnknownThresholdMethod(_))
        ));
    }

    #[test]
    fn test_bimodal_split() {
        let hist = bimodal();
        for m in ThresholdMethod::ALL {
            let t = m.bin(&hist).unwrap();
            assert!((25..85).contains(&t), "{m} threshold {t} is not between peaks");
        }
    }

    #[test]
    fn test_degenerate_histograms() {
        for m in ThresholdMethod::ALL {
            assert_eq!(m.bin(&[0.0; 16]), None);
            assert_eq!(m.bin(&[3.0]), None);
        }
    }

    #[test]
    fn test_two_bins() {
        assert_eq!(ThresholdMethod::Otsu.bin(&[5.0, 5.0]), Some(0));
        assert_eq!(ThresholdMethod::IsoData.bin(&[5.0, 5.0]), Some(0));
    }
}
