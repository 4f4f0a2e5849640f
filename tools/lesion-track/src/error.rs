//! 命令行错误.

use dti_berry::enhance::ThresholdMethod;
use dti_berry::SegError;
use thiserror::Error;

/// 子命令运行错误.
#[derive(Debug, Error)]
pub enum ToolError {
    /// 核心库错误.
    #[error(transparent)]
    Seg(#[from] SegError),

    /// 既没有显式给出模板文件, 也无法定位模板目录.
    #[error("cannot locate template directory, use --template-dir or ${0}")]
    NoTemplateDir(&'static str),

    /// 输入图没有可用于推导 sigmoid 参数的非零体素.
    #[error("cannot derive sigmoid parameters with {0}: no contrast among non-zero voxels")]
    NoSigmoid(ThresholdMethod),

    /// 报告输出失败.
    #[error("failed to print report: {0}")]
    Report(#[from] std::io::Error),
}

impl ToolError {
    /// 进程退出码. 配置错误为 2, 读写错误为 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            ToolError::Seg(e) if e.is_io() => 1,
            ToolError::Report(_) => 1,
            _ => 2,
        }
    }
}

/// 子命令运行结果.
pub type ToolResult<T> = Result<T, ToolError>;
