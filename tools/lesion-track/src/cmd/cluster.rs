use super::mrf::MrfArgs;
use super::{finite, non_zero, threshold_method, TemplateArgs};
use crate::error::{ToolError, ToolResult};
use crate::result::{self, Report};
use clap::Args;
use dti_berry::cluster::{kmeans, KMeansOptions};
use dti_berry::enhance::{self, Sigmoid, ThresholdMethod};
use dti_berry::mrf::MrfRelaxation;
use dti_berry::template::TemplateKind;
use dti_berry::DtiMap;
use std::path::PathBuf;

/// 差异图 + 按图类型方向的病灶对比 + sigmoid 增强 + k-means (+ MRF) 聚类分割,
/// 输出 `{0..K-1}` 标签.
#[derive(Args, Debug)]
pub struct Cluster {
    /// 被试 DTI 标量图. 应已与均值模板做过直方图匹配.
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// 输出标签文件 (.nii 或 .nii.gz).
    #[arg(long, short = 'o')]
    output: PathBuf,

    #[command(flatten)]
    template: TemplateArgs,

    /// sigmoid 过渡带宽度, 作用于 `[0, 1]` 的病灶对比图. 须与 `--beta` 同时给出.
    #[arg(long, requires = "beta", allow_hyphen_values = true, value_parser = non_zero)]
    alpha: Option<f64>,

    /// sigmoid 过渡中心. 须与 `--alpha` 同时给出.
    #[arg(long, requires = "alpha", allow_hyphen_values = true, value_parser = finite)]
    beta: Option<f64>,

    /// 未显式给出 sigmoid 参数时, 用于推导参数的直方图阈值算法.
    #[arg(long = "threshold-method", default_value = "Otsu", value_parser = threshold_method)]
    threshold_method: ThresholdMethod,

    /// k-means 初始均值, 以逗号分隔. 类别数即为其个数.
    #[arg(long = "init-means", value_delimiter = ',', default_value = "0.0,1.0",
          value_parser = finite)]
    init_means: Vec<f64>,

    /// 对聚类结果再做 MRF 平滑.
    #[arg(long = "mrf")]
    with_mrf: bool,

    #[command(flatten)]
    mrf: MrfArgs,
}

impl Cluster {
    /// 显式给出的, 或由阈值算法推导的 sigmoid 变换. 第二项表示是否为推导所得.
    fn sigmoid(&self, contrast: &DtiMap) -> ToolResult<(Sigmoid, bool)> {
        match (self.alpha, self.beta) {
            (Some(alpha), Some(beta)) => Ok((Sigmoid::unit(alpha, beta), false)),
            _ => enhance::optimum_sigmoid(contrast, self.threshold_method)
                .map(|s| (s, true))
                .ok_or(ToolError::NoSigmoid(self.threshold_method)),
        }
    }

    pub fn run(&self) -> ToolResult<()> {
        let template = self.template.load(TemplateKind::MeanStd)?;
        let subject = DtiMap::open(&self.input)?;
        template.check_aligned(&subject)?;

        let diff = enhance::difference(&template.mean, &subject)?;
        let contrast = enhance::lesion_contrast(&diff, self.template.map)?;
        let (sigmoid, derived) = self.sigmoid(&contrast)?;
        let enhanced = sigmoid.enhance(&contrast)?;

        let clusters = kmeans(&enhanced, &KMeansOptions::with_means(self.init_means.clone()))?;
        let classes = clusters.means().len();

        let mut report = Report::new();
        if derived {
            report.section(|w| result::describe_sigmoid_into(&sigmoid, w))?;
        }
        report.section(|w| result::describe_means_into(clusters.means(), clusters.iterations, w))?;

        let label = if self.with_mrf {
            let relaxation = MrfRelaxation::new(clusters.model.clone(), self.mrf.params());
            let (label, mrf) = relaxation.relax(&enhanced, &clusters.labels)?;
            report.section(|w| result::describe_mrf_into(&mrf, w))?;
            label
        } else {
            clusters.labels
        };
        label.save(&self.output)?;
        log::info!("Label written to {}", self.output.display());

        report
            .section(|w| result::describe_labels_into(&label, classes, w))?
            .print()?;
        Ok(())
    }
}
