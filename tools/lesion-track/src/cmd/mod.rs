//! 子命令.

use crate::error::{ToolError, ToolResult};
use clap::Args;
use dti_berry::enhance::ThresholdMethod;
use dti_berry::template::{StatTemplate, TemplateKind};
use dti_berry::{MapType, Resolution};
use std::path::PathBuf;
use utils::loader;

mod cluster;
mod lsdp;
mod mrf;
mod sdp;

pub use cluster::Cluster;
pub use lsdp::Lsdp;
pub use mrf::Mrf;
pub use sdp::Sdp;

/// 统计模板来源.
///
/// 显式给出 `--mean/--std` 或 `--stack` 时直接读取对应文件, 否则按图类型与分辨率在模板目录中查找.
#[derive(Args, Debug)]
pub struct TemplateArgs {
    /// 被试图类型 (FractionalAnisotropy, MeanDiffusivity, ...).
    #[arg(long = "map-type", short = 'm', value_parser = map_type)]
    pub map: MapType,

    /// 模板分辨率 (1mm 或 2mm).
    #[arg(long, short = 'r', default_value = "1mm", value_parser = resolution)]
    pub resolution: Resolution,

    /// 模板目录. 缺省时依次尝试 `$MSLESION_TEMPLATE_DIR` 与用户主目录下的默认位置.
    #[arg(long = "template-dir")]
    pub template_dir: Option<PathBuf>,

    /// 均值模板文件.
    #[arg(long, requires = "std", conflicts_with = "stack")]
    pub mean: Option<PathBuf>,

    /// 标准差模板文件.
    #[arg(long, requires = "mean", conflicts_with = "stack")]
    pub std: Option<PathBuf>,

    /// 4D 样本栈模板文件.
    #[arg(long)]
    pub stack: Option<PathBuf>,
}

impl TemplateArgs {
    /// 读取统计模板. `kind` 为未显式给出文件时在模板目录中查找的模板种类.
    pub fn load(&self, kind: TemplateKind) -> ToolResult<StatTemplate> {
        if let (Some(mean), Some(std)) = (&self.mean, &self.std) {
            return Ok(StatTemplate::open(mean, std)?);
        }
        if let Some(stack) = &self.stack {
            return Ok(StatTemplate::open_stack(stack)?);
        }
        let store = loader::template_store(self.template_dir.clone(), self.resolution)
            .ok_or(ToolError::NoTemplateDir(loader::TEMPLATE_DIR_ENV))?;
        Ok(store.load(self.map, kind)?)
    }
}

fn map_type(s: &str) -> Result<MapType, String> {
    s.parse().map_err(|e| format!("{e}"))
}

fn resolution(s: &str) -> Result<Resolution, String> {
    s.parse().map_err(|e| format!("{e}"))
}

fn threshold_method(s: &str) -> Result<ThresholdMethod, String> {
    s.parse().map_err(|e| format!("{e}"))
}

/// 非负有限阈值.
fn score_threshold(s: &str) -> Result<f64, String> {
    let t: f64 = s
        .parse()
        .map_err(|_| format!("`{s}` is not a legal score threshold"))?;
    if !t.is_finite() || t < 0.0 {
        return Err(format!(
            "score threshold must be finite and non-negative, but got `{t}`"
        ));
    }
    Ok(t)
}

/// 有限实数.
fn finite(s: &str) -> Result<f64, String> {
    let v: f64 = s
        .parse()
        .map_err(|_| format!("`{s}` is not a legal number"))?;
    if !v.is_finite() {
        return Err(format!("`{s}` is not a finite number"));
    }
    Ok(v)
}

/// 非负有限实数.
fn non_negative(s: &str) -> Result<f64, String> {
    let v = finite(s)?;
    if v < 0.0 {
        return Err(format!("value must be non-negative, but got `{v}`"));
    }
    Ok(v)
}

/// 非零有限实数.
fn non_zero(s: &str) -> Result<f64, String> {
    let v = finite(s)?;
    if v == 0.0 {
        return Err("value must not be zero".to_string());
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_parsers() {
        assert_eq!(score_threshold("2.5"), Ok(2.5));
        assert!(score_threshold("-1").is_err());
        assert!(score_threshold("nan").is_err());
        assert!(score_threshold("abc").is_err());
        assert_eq!(map_type("VolumeRatio"), Ok(MapType::VolumeRatio));
        assert!(map_type("VR").is_err());
        assert_eq!(resolution("2mm"), Ok(Resolution::Mm2));
        assert_eq!(threshold_method("Yen"), Ok(ThresholdMethod::Yen));
        assert!(non_zero("0").is_err());
        assert!(non_negative("-0.5").is_err());
        assert_eq!(finite("-0.5"), Ok(-0.5));
    }
}
