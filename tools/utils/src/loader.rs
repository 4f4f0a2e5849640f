//! 对 `dti-berry::template` 的更一层封装. 提供从环境定位模板目录的加载器.

use dti_berry::template::TemplateStore;
use dti_berry::Resolution;
use std::env;
use std::path::PathBuf;

/// 指定模板目录的环境变量.
pub const TEMPLATE_DIR_ENV: &str = "MSLESION_TEMPLATE_DIR";

/// 模板目录相对用户主目录的默认位置.
const HOME_TEMPLATE_DIR: [&str; 2] = [
    "MSLesionTrack-Data",
    "StatisticalBrainSegmentation-Templates",
];

/// 获取 `$HOME/MSLesionTrack-Data/StatisticalBrainSegmentation-Templates`.
/// 无法确定用户主目录时返回 `None`.
pub fn home_template_dir() -> Option<PathBuf> {
    let mut d = dirs::home_dir()?;
    d.extend(HOME_TEMPLATE_DIR);
    Some(d)
}

/// 获取统计模板目录.
///
/// 1. 若 `explicit` 非空, 则返回其值;
/// 2. 否则, 若环境变量 `$MSLESION_TEMPLATE_DIR` 非空, 则返回其值;
/// 3. 否则, 返回 `$HOME/MSLesionTrack-Data/StatisticalBrainSegmentation-Templates`.
pub fn template_dir_from_env_or_home(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }
    match env::var(TEMPLATE_DIR_ENV) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => home_template_dir(),
    }
}

/// 获取分辨率为 `resolution` 的模板目录配置. 规则同 [`template_dir_from_env_or_home`].
pub fn template_store(
    explicit: Option<PathBuf>,
    resolution: Resolution,
) -> Option<TemplateStore> {
    let root = template_dir_from_env_or_home(explicit)?;
    log::debug!("Using template directory {}", root.display());
    Some(TemplateStore::new(root, resolution))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_dir_wins() {
        let d = template_dir_from_env_or_home(Some(PathBuf::from("/tmp/tpl"))).unwrap();
        assert_eq!(d, PathBuf::from("/tmp/tpl"));
    }

    #[test]
    fn test_home_dir_suffix() {
        if let Some(d) = home_template_dir() {
            assert!(d.ends_with("MSLesionTrack-Data/StatisticalBrainSegmentation-Templates"));
        }
    }
}
