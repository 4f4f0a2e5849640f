use super::{score_threshold, TemplateArgs};
use crate::error::ToolResult;
use crate::result::{self, Report};
use clap::Args;
use dti_berry::consts::{DEFAULT_PROPAGATION_ROUNDS, DEFAULT_SCORE_THRESHOLD};
use dti_berry::decision::VoxelDecision;
use dti_berry::propagate::{NeighborhoodPropagator, PropagationConfig, PropagationMode};
use dti_berry::template::TemplateKind;
use dti_berry::{DtiMap, LabelVolume};
use std::path::PathBuf;

/// 以先验病灶标签为起点的 3×3×3 邻域传播, 输出 `{0, 1, 2}` 标签.
#[derive(Args, Debug)]
pub struct Lsdp {
    /// 被试 DTI 标量图.
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// 先验病灶标签 (如 FLAIR 分割结果). 任何非零值都视为病灶.
    #[arg(long, short = 'p')]
    prior: PathBuf,

    /// 输出标签文件 (.nii 或 .nii.gz).
    #[arg(long, short = 'o')]
    output: PathBuf,

    #[command(flatten)]
    template: TemplateArgs,

    /// t 分数阈值.
    #[arg(long = "t-threshold", short = 't', default_value_t = DEFAULT_SCORE_THRESHOLD,
          value_parser = score_threshold)]
    t_threshold: f64,

    /// 传播轮数.
    #[arg(long, default_value_t = DEFAULT_PROPAGATION_ROUNDS)]
    rounds: u32,

    /// 只以先验标签为活跃中心, 不随轮次扩张.
    #[arg(long)]
    anchored: bool,
}

impl Lsdp {
    pub fn run(&self) -> ToolResult<()> {
        let template = self.template.load(TemplateKind::MeanStd)?;
        let subject = DtiMap::open(&self.input)?;
        let prior = LabelVolume::open(&self.prior)?;

        let config = PropagationConfig {
            rounds: self.rounds,
            mode: if self.anchored {
                PropagationMode::Anchored
            } else {
                PropagationMode::Grow
            },
        };
        let rule = VoxelDecision::new(self.template.map, self.t_threshold);
        let (label, report) =
            NeighborhoodPropagator::new(rule, config).run(&subject, &template, &prior)?;
        label.save(&self.output)?;
        log::info!("Label written to {}", self.output.display());

        Report::new()
            .section(|w| result::describe_propagation_into(&report, w))?
            .section(|w| result::describe_labels_into(&label, 3, w))?
            .print()?;
        Ok(())
    }
}
