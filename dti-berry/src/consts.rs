//! 通用常量.

/// 标签值.
pub mod label {
    /// 背景 (从未被标注) 体素的标签值.
    pub const LESION_BACKGROUND: u8 = 0;

    /// 由统计检验新发现的候选病灶体素的标签值.
    pub const LESION_CANDIDATE: u8 = 1;

    /// 继承自先验标签 (如 FLAIR 分割) 的病灶体素的标签值.
    pub const LESION_PRIOR: u8 = 2;

    /// 体素是否是背景?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        matches!(p, LESION_BACKGROUND)
    }

    /// 体素是否是新发现的候选病灶?
    #[inline]
    pub const fn is_candidate(p: u8) -> bool {
        matches!(p, LESION_CANDIDATE)
    }

    /// 体素是否继承自先验标签?
    #[inline]
    pub const fn is_prior(p: u8) -> bool {
        matches!(p, LESION_PRIOR)
    }
}

/// 邻域传播默认轮数.
pub const DEFAULT_PROPAGATION_ROUNDS: u32 = 5;

/// MRF 默认最大迭代次数.
pub const DEFAULT_MRF_MAX_ITERATIONS: u32 = 30;

/// MRF 默认误差容忍度 (每轮改变标签的体素比例).
pub const DEFAULT_MRF_ERROR_TOLERANCE: f64 = 1e-7;

/// MRF 默认平滑因子.
pub const DEFAULT_MRF_SMOOTHING: f64 = 1.0;

/// MRF 工具默认的 k-means 初始均值 (背景, 正常白质, 病灶).
pub const DEFAULT_INITIAL_MEANS: [f64; 3] = [0.0, 0.1, 0.4];

/// 直方图阈值算法使用的直方图柱数.
pub const HISTOGRAM_LEVELS: usize = 128;

/// 对齐检查时允许的体素分辨率误差, 以毫米为单位.
pub const SPACING_TOLERANCE_MM: f64 = 1e-4;

/// 对齐检查时允许的原点误差, 以毫米为单位.
pub const ORIGIN_TOLERANCE_MM: f64 = 1e-3;

/// 统计检验 (z 或 t 分数) 默认阈值.
pub const DEFAULT_SCORE_THRESHOLD: f64 = 2.5;
