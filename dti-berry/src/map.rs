//! DTI 标量图类型与模板分辨率.

use crate::{SegError, SegResult};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 病灶在某类标量图上的表现方向.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Abnormality {
    /// 病灶表现为显著降低, 即 `z <= -threshold`.
    Decrease,

    /// 病灶表现为显著升高, 即 `z >= threshold`.
    Increase,

    /// 没有判定规则. 该类图上的任何体素都不会被判为异常.
    Undefined,
}

impl Abnormality {
    /// 按该方向判定统计量 `z` 在阈值 `threshold` 下是否异常.
    #[inline]
    pub fn holds(&self, z: f64, threshold: f64) -> bool {
        match self {
            Abnormality::Decrease => z <= -threshold,
            Abnormality::Increase => z >= threshold,
            Abnormality::Undefined => false,
        }
    }
}

/// DTI 标量图类型.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MapType {
    /// 各向异性分数 (FA).
    FractionalAnisotropy,

    /// 平均扩散率 (MD).
    MeanDiffusivity,

    /// 相对各向异性 (RA).
    RelativeAnisotropy,

    /// 垂直扩散率.
    PerpendicularDiffusivity,

    /// 平行扩散率.
    ParallelDiffusivity,

    /// 体积比 (VR).
    VolumeRatio,
}

impl MapType {
    /// 全部图类型.
    pub const ALL: [MapType; 6] = [
        MapType::FractionalAnisotropy,
        MapType::MeanDiffusivity,
        MapType::RelativeAnisotropy,
        MapType::PerpendicularDiffusivity,
        MapType::ParallelDiffusivity,
        MapType::VolumeRatio,
    ];

    /// 该类图上病灶的表现方向.
    ///
    /// 平行扩散率没有判定规则, 返回 [`Abnormality::Undefined`].
    #[inline]
    pub const fn abnormality(&self) -> Abnormality {
        match self {
            MapType::FractionalAnisotropy | MapType::RelativeAnisotropy => Abnormality::Decrease,
            MapType::MeanDiffusivity | MapType::PerpendicularDiffusivity | MapType::VolumeRatio => {
                Abnormality::Increase
            }
            MapType::ParallelDiffusivity => Abnormality::Undefined,
        }
    }

    /// 差异图 `模板均值 - 被试` 上可能对应病灶的取值区间 `[lo, hi]`.
    ///
    /// 病灶表现为降低的图保留 `[0, 1]`, 其余保留 `[-1, 0]`.
    #[inline]
    pub const fn difference_window(&self) -> (f64, f64) {
        match self {
            MapType::FractionalAnisotropy | MapType::RelativeAnisotropy => (0.0, 1.0),
            MapType::MeanDiffusivity
            | MapType::PerpendicularDiffusivity
            | MapType::ParallelDiffusivity
            | MapType::VolumeRatio => (-1.0, 0.0),
        }
    }

    /// 命令行与配置文件中使用的字符串记号.
    #[inline]
    pub const fn token(&self) -> &'static str {
        match self {
            MapType::FractionalAnisotropy => "FractionalAnisotropy",
            MapType::MeanDiffusivity => "MeanDiffusivity",
            MapType::RelativeAnisotropy => "RelativeAnisotropy",
            MapType::PerpendicularDiffusivity => "PerpendicularDiffusivity",
            MapType::ParallelDiffusivity => "ParallelDiffusivity",
            MapType::VolumeRatio => "VolumeRatio",
        }
    }
}

impl fmt::Display for MapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for MapType {
    type Err = SegError;

    fn from_str(s: &str) -> SegResult<Self> {
        MapType::ALL
            .into_iter()
            .find(|m| m.token() == s)
            .ok_or_else(|| SegError::UnknownMapType(s.to_string()))
    }
}

/// 统计模板的体素分辨率.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Resolution {
    /// 1mm 各向同性.
    Mm1,

    /// 2mm 各向同性.
    Mm2,
}

impl Resolution {
    /// 字符串记号, 同时也是模板文件名的后缀.
    #[inline]
    pub const fn token(&self) -> &'static str {
        match self {
            Resolution::Mm1 => "1mm",
            Resolution::Mm2 => "2mm",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Resolution {
    type Err = SegError;

    fn from_str(s: &str) -> SegResult<Self> {
        match s {
            "1mm" => Ok(Resolution::Mm1),
            "2mm" => Ok(Resolution::Mm2),
            _ => Err(SegError::UnknownResolution(s.to_string())),
        }
    }
}
