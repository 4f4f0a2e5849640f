//! 统计模板.
//!
//! 一份统计模板给出参考人群在每个体素上的均值与标准差. 模板有两种存储形式:
//!
//! 1. [`TemplateKind::MeanStd`]: 均值图与标准差图各一个 3D 文件.
//! 2. [`TemplateKind::SampleStack`]: 一个 4D 文件, 第 4 维为参考样本,
//!   读取时逐体素归约为均值与 (总体) 标准差. 按向量像素存储的 5D 文件
//!   (`[W, H, z, 1, N]`) 同样可以读取.
//!
//! 模板文件的位置由 [`TemplateStore`] 显式给出, 该模块不读取任何环境变量.

use crate::{DtiMap, MapType, NiftiHeaderAttr, Resolution, SegError, SegResult};
use std::fmt;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod stack;

/// 模板存储形式.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TemplateKind {
    /// 均值/标准差文件对 (ICBM 131 例).
    MeanStd,

    /// 4D 样本栈 (ICBM 20 例, 16 样本).
    SampleStack,
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TemplateKind::MeanStd => "mean/std",
            TemplateKind::SampleStack => "sample stack",
        })
    }
}

/// 一份统计模板对应的文件.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TemplateFiles {
    /// 均值图与标准差图.
    MeanStd {
        /// 均值图路径.
        mean: PathBuf,
        /// 标准差图路径.
        std: PathBuf,
    },

    /// 4D 样本栈.
    SampleStack(PathBuf),
}

/// 统计模板目录.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TemplateStore {
    /// 模板根目录, 所有模板文件直接位于该目录下.
    pub root: PathBuf,

    /// 模板分辨率.
    pub resolution: Resolution,
}

impl TemplateStore {
    /// 创建新的模板目录配置.
    pub fn new<P: Into<PathBuf>>(root: P, resolution: Resolution) -> Self {
        Self {
            root: root.into(),
            resolution,
        }
    }

    /// 获取 `(map, kind)` 模板的文件名. 没有对应模板时返回 `None`.
    pub fn file_names(&self, map: MapType, kind: TemplateKind) -> Option<TemplateFiles> {
        use MapType::*;

        let res = self.resolution.token();
        match kind {
            TemplateKind::MeanStd => {
                let key = match map {
                    FractionalAnisotropy => "FA",
                    MeanDiffusivity => "MD",
                    RelativeAnisotropy => "RA",
                    PerpendicularDiffusivity => "PerpDiff",
                    VolumeRatio => "VR",
                    ParallelDiffusivity => return None,
                };
                Some(TemplateFiles::MeanStd {
                    mean: self.root.join(format!("USP-ICBM-{key}mean-131-{res}.nii.gz")),
                    std: self.root.join(format!("USP-ICBM-{key}std-131-{res}.nii.gz")),
                })
            }
            TemplateKind::SampleStack => {
                let key = match map {
                    FractionalAnisotropy => "FA",
                    MeanDiffusivity => "MD",
                    RelativeAnisotropy => "RA",
                    PerpendicularDiffusivity => "PerD",
                    ParallelDiffusivity => "ParD",
                    VolumeRatio => return None,
                };
                Some(TemplateFiles::SampleStack(
                    self.root
                        .join(format!("USP-ICBM-20-N16-stat{key}-{res}.nii.gz")),
                ))
            }
        }
    }

    /// 获取 `(map, kind)` 模板的文件名. 没有对应模板时返回 [`SegError::NoTemplate`].
    pub fn locate(&self, map: MapType, kind: TemplateKind) -> SegResult<TemplateFiles> {
        self.file_names(map, kind).ok_or(SegError::NoTemplate {
            map,
            resolution: self.resolution,
            kind,
        })
    }

    /// 读取 `(map, kind)` 模板.
    pub fn load(&self, map: MapType, kind: TemplateKind) -> SegResult<StatTemplate> {
        let template = match self.locate(map, kind)? {
            TemplateFiles::MeanStd { mean, std } => StatTemplate::open(mean, std)?,
            TemplateFiles::SampleStack(path) => StatTemplate::open_stack(path)?,
        };
        log::info!(
            "Loaded {kind} template for {map} at {}, shape = {:?}",
            self.resolution,
            template.mean.shape()
        );
        Ok(template)
    }
}

/// 统计模板: 逐体素的均值图与标准差图. 两者总是对齐的.
#[derive(Debug, Clone)]
pub struct StatTemplate {
    /// 均值图.
    pub mean: DtiMap,

    /// 标准差图.
    pub std: DtiMap,
}

impl StatTemplate {
    /// 由已经读入内存的均值图与标准差图构造模板. 两者未对齐时返回错误.
    pub fn new(mean: DtiMap, std: DtiMap) -> SegResult<Self> {
        mean.check_aligned(&std)?;
        Ok(Self { mean, std })
    }

    /// 读取均值/标准差文件对.
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(mean: P, std: Q) -> SegResult<Self> {
        Self::new(DtiMap::open(mean)?, DtiMap::open(std)?)
    }

    /// 读取 4D 样本栈, 逐体素归约为均值与总体标准差.
    pub fn open_stack<P: AsRef<Path>>(path: P) -> SegResult<Self> {
        stack::reduce_stack_file(path.as_ref())
    }

    /// 检查模板与被试图是否位于同一体素空间.
    #[inline]
    pub fn check_aligned<O: NiftiHeaderAttr + ?Sized>(&self, subject: &O) -> SegResult<()> {
        self.mean.check_aligned(subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_std_file_names() {
        let store = TemplateStore::new("/data/tpl", Resolution::Mm1);
        let files = store
            .locate(MapType::PerpendicularDiffusivity, TemplateKind::MeanStd)
            .unwrap();
        assert_eq!(
            files,
            TemplateFiles::MeanStd {
                mean: PathBuf::from("/data/tpl/USP-ICBM-PerpDiffmean-131-1mm.nii.gz"),
                std: PathBuf::from("/data/tpl/USP-ICBM-PerpDiffstd-131-1mm.nii.gz"),
            }
        );
    }

    #[test]
    fn test_stack_file_names() {
        let store = TemplateStore::new("/data/tpl", Resolution::Mm2);
        let files = store
            .locate(MapType::ParallelDiffusivity, TemplateKind::SampleStack)
            .unwrap();
        assert_eq!(
            files,
            TemplateFiles::SampleStack(PathBuf::from(
                "/data/tpl/USP-ICBM-20-N16-statParD-2mm.nii.gz"
            ))
        );
    }

    #[test]
    fn test_missing_templates() {
        let store = TemplateStore::new("/data/tpl", Resolution::Mm2);
        let err = store
            .locate(MapType::ParallelDiffusivity, TemplateKind::MeanStd)
            .unwrap_err();
        assert!(matches!(err, SegError::NoTemplate { .. }));
        assert!(!err.is_io());
        assert!(store
            .locate(MapType::VolumeRatio, TemplateKind::SampleStack)
            .is_err());
        for map in MapType::ALL {
            let both = [TemplateKind::MeanStd, TemplateKind::SampleStack]
                .into_iter()
                .filter(|k| store.file_names(map, *k).is_some())
                .count();
            assert!(both >= 1, "{map} has no template at all");
        }
    }
}
