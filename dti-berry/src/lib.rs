#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 基于统计模板 (均值/标准差) 与马尔可夫随机场 (MRF),
//! 为脑部 DTI 标量图 (FA, MD, RA, ...) 提供病灶似然标注的基础算法.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 所有参与同一次计算的体素数据必须已经配准到同一空间 (形状, 分辨率, 原点一致).
//!   该 crate **不做** 任何重采样, 不一致时直接返回 [`SegError::Misaligned`].
//! 2. 体素值 `0` 被视为 "脑外" 哨兵值, 永远不参与统计检验.
//! 3. 图像读写由 `nifti` crate 完成, 数据在内存中统一按 `(z, h, w)` 组织.
//!
//! # 功能概览
//!
//! ### 单体素统计判定 ✅
//!
//! 给定被试图与模板 (均值, 标准差), 计算 z 分数并按图类型的异常方向判定.
//!
//! 实现位于 `dti-berry/src/decision`.
//!
//! ### 3×3×3 邻域多轮传播 ✅
//!
//! 从已有 (如 FLAIR) 病灶标签出发, 在邻域中寻找统计异常体素并逐轮扩张.
//! 输出三值标签: 0 背景, 1 新发现, 2 继承自先验标签.
//!
//! 实现位于 `dti-berry/src/propagate`.
//!
//! ### MRF 松弛 (ICM) ✅
//!
//! 以聚类质心为数据项, 以加权 3×3×3 邻域为平滑项, 迭代至收敛或达到最大轮数.
//!
//! 实现位于 `dti-berry/src/mrf`.
//!
//! ### 标量 k-means, sigmoid 增强与直方图阈值 ✅
//!
//! 为 MRF 和聚类分割提供质心与增强后的输入.
//!
//! 实现位于 `dti-berry/src/cluster` 和 `dti-berry/src/enhance`.
//!
//! ### 双缓冲 ✅
//!
//! 所有整卷扫描都读取上一轮的不可变快照, 写入新缓冲区, 轮末交换.
//! 因此开启 `rayon` feature 与否, 结果完全一致.

/// 三维索引 `(z, h, w)`, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 3D nii 文件基础数据结构.
mod data;

pub use data::{neighbour, DtiMap, LabelVolume, NiftiHeaderAttr};

pub mod consts;

mod error;

pub use error::{SegError, SegResult};

mod map;

pub use map::{Abnormality, MapType, Resolution};

pub mod template;

pub mod decision;

pub mod propagate;

pub mod mrf;

pub mod cluster;

pub mod enhance;

pub mod prelude;
