use super::{finite, non_negative};
use crate::error::ToolResult;
use crate::result::{self, Report};
use clap::Args;
use dti_berry::cluster::{kmeans, KMeansOptions};
use dti_berry::consts::{
    DEFAULT_MRF_ERROR_TOLERANCE, DEFAULT_MRF_MAX_ITERATIONS, DEFAULT_MRF_SMOOTHING,
};
use dti_berry::mrf::{MrfParams, MrfRelaxation};
use dti_berry::DtiMap;
use std::path::PathBuf;

/// MRF 平滑参数.
#[derive(Args, Debug)]
pub struct MrfArgs {
    /// MRF 最大迭代次数.
    #[arg(long = "max-iterations", default_value_t = DEFAULT_MRF_MAX_ITERATIONS)]
    pub max_iterations: u32,

    /// MRF 误差容忍度.
    #[arg(long, default_value_t = DEFAULT_MRF_ERROR_TOLERANCE, value_parser = non_negative)]
    pub tolerance: f64,

    /// MRF 平滑因子.
    #[arg(long, default_value_t = DEFAULT_MRF_SMOOTHING, value_parser = non_negative)]
    pub smoothing: f64,
}

impl MrfArgs {
    pub fn params(&self) -> MrfParams {
        MrfParams {
            max_iterations: self.max_iterations,
            error_tolerance: self.tolerance,
            smoothing_factor: self.smoothing,
        }
    }
}

/// k-means 聚类后做 MRF 松弛, 输出 `{0..K-1}` 标签.
#[derive(Args, Debug)]
pub struct Mrf {
    /// 输入标量图.
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// 输出标签文件 (.nii 或 .nii.gz).
    #[arg(long, short = 'o')]
    output: PathBuf,

    /// k-means 初始均值, 以逗号分隔. 类别数即为其个数.
    #[arg(long = "init-means", value_delimiter = ',', default_value = "0.0,0.1,0.4",
          value_parser = finite)]
    init_means: Vec<f64>,

    #[command(flatten)]
    mrf: MrfArgs,
}

impl Mrf {
    pub fn run(&self) -> ToolResult<()> {
        let map = DtiMap::open(&self.input)?;

        let clusters = kmeans(&map, &KMeansOptions::with_means(self.init_means.clone()))?;
        let relaxation = MrfRelaxation::new(clusters.model.clone(), self.mrf.params());
        let (label, report) = relaxation.relax(&map, &clusters.labels)?;
        label.save(&self.output)?;
        log::info!("Label written to {}", self.output.display());

        Report::new()
            .section(|w| result::describe_means_into(clusters.means(), clusters.iterations, w))?
            .section(|w| result::describe_mrf_into(&report, w))?
            .section(|w| result::describe_labels_into(&label, clusters.means().len(), w))?
            .print()?;
        Ok(())
    }
}
