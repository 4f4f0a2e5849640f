//! 运行时错误.

use crate::template::TemplateKind;
use crate::{Idx3d, MapType, Resolution};
use thiserror::Error;

/// 分割流程的统一错误类型.
///
/// 除 [`SegError::Nifti`] 与 [`SegError::Io`] 外, 其余均为配置错误:
/// 它们在任何输出写入之前被发现.
#[derive(Debug, Error)]
pub enum SegError {
    /// 未知的图类型字符串.
    #[error("unknown map type `{0}`")]
    UnknownMapType(String),

    /// 未知的模板分辨率字符串.
    #[error("unknown resolution `{0}`, expected `1mm` or `2mm`")]
    UnknownResolution(String),

    /// 未知的阈值算法字符串.
    #[error("unknown threshold method `{0}`")]
    UnknownThresholdMethod(String),

    /// 该 (图类型, 分辨率, 模板种类) 组合没有对应模板.
    #[error("no {kind} template for {map} at {resolution}")]
    NoTemplate {
        /// 图类型.
        map: MapType,
        /// 模板分辨率.
        resolution: Resolution,
        /// 模板种类.
        kind: TemplateKind,
    },

    /// 类别数为 0.
    #[error("number of classes must be positive")]
    NoClasses,

    /// 类别数超出 `u8` 标签可表示范围.
    #[error("{0} classes cannot be encoded in an 8-bit label volume")]
    TooManyClasses(usize),

    /// 第 `.0` 个质心不是有限值.
    #[error("centroid #{0} is not finite")]
    NonFiniteCentroid(usize),

    /// 参与同一计算的体素数据没有对齐.
    #[error("volumes are not aligned: {what}")]
    Misaligned {
        /// 不一致的具体项.
        what: String,
    },

    /// 文件体素个数与 header 声明的 3D 形状不符 (如多帧 4D 数据).
    #[error("expected a 3D volume of shape {1:?}, got {0} voxels")]
    NotAVolume(usize, Idx3d),

    /// 样本栈模板不包含任何样本.
    #[error("sample stack template holds no samples")]
    EmptyStack,

    /// 样本栈模板既不是 `[W, H, z, N]` 也不是 `[W, H, z, 1, N]`.
    #[error("sample stack template must be [W, H, z, (1,) N], got {0} dimensions")]
    BadStackShape(usize),

    /// nifti 读写错误.
    #[error("nifti I/O failed: {0}")]
    Nifti(#[from] nifti::NiftiError),

    /// 其它底层 I/O 错误.
    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl SegError {
    /// 是否是读写类错误 (而非配置错误).
    #[inline]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Nifti(_) | Self::Io(_))
    }
}

/// 分割流程的运行时结果.
pub type SegResult<T> = Result<T, SegError>;
