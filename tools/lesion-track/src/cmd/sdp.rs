use super::{score_threshold, TemplateArgs};
use crate::error::ToolResult;
use crate::result::{self, Report};
use clap::Args;
use dti_berry::consts::DEFAULT_SCORE_THRESHOLD;
use dti_berry::decision::VoxelDecision;
use dti_berry::template::TemplateKind;
use dti_berry::DtiMap;
use std::path::PathBuf;

/// 单轮 z 分数判定, 输出 `{0, 1}` 标签.
#[derive(Args, Debug)]
pub struct Sdp {
    /// 被试 DTI 标量图.
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// 输出标签文件 (.nii 或 .nii.gz).
    #[arg(long, short = 'o')]
    output: PathBuf,

    #[command(flatten)]
    template: TemplateArgs,

    /// z 分数阈值.
    #[arg(long = "z-threshold", short = 'z', default_value_t = DEFAULT_SCORE_THRESHOLD,
          value_parser = score_threshold)]
    z_threshold: f64,
}

impl Sdp {
    pub fn run(&self) -> ToolResult<()> {
        let template = self.template.load(TemplateKind::SampleStack)?;
        let subject = DtiMap::open(&self.input)?;

        let rule = VoxelDecision::new(self.template.map, self.z_threshold);
        let (label, report) = rule.decide(&subject, &template)?;
        label.save(&self.output)?;
        log::info!("Label written to {}", self.output.display());

        Report::new()
            .section(|w| result::describe_decision_into(&report, w))?
            .section(|w| result::describe_labels_into(&label, 2, w))?
            .print()?;
        Ok(())
    }
}
