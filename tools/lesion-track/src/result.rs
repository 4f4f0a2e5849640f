//! 运行结果报告.
//!
//! 报告总是写到标准输出, 与日志等级无关.

use dti_berry::decision::DecisionReport;
use dti_berry::enhance::Sigmoid;
use dti_berry::mrf::MrfReport;
use dti_berry::propagate::PropagationReport;
use dti_berry::LabelVolume;
use std::io::{self, Write};

const S4: &str = "    ";

/// 将 k-means 估计均值写进 `w` 中.
pub fn describe_means_into<W: Write>(
    means: &[f64],
    iterations: u32,
    w: &mut W,
) -> io::Result<()> {
    writeln!(w, "k-means converged in {iterations} iterations:")?;
    for (i, m) in means.iter().enumerate() {
        writeln!(w, "{S4}cluster[{i}]{S4}estimated mean : {m}")?;
    }
    Ok(())
}

/// 将 MRF 迭代结果写进 `w` 中.
pub fn describe_mrf_into<W: Write>(r: &MrfReport, w: &mut W) -> io::Result<()> {
    writeln!(w, "MRF relaxation:")?;
    writeln!(w, "{S4}Number of Iterations : {}", r.iterations)?;
    writeln!(w, "{S4}Stop condition: {}", r.stop)?;
    writeln!(w, "{S4}Last changed fraction: {:e}", r.changed_fraction)
}

/// 将最优 sigmoid 参数写进 `w` 中.
pub fn describe_sigmoid_into<W: Write>(s: &Sigmoid, w: &mut W) -> io::Result<()> {
    writeln!(w, "Optimum [Alpha,Beta] = [ {} , {} ]", s.alpha, s.beta)
}

/// 将单轮判定结果写进 `w` 中.
pub fn describe_decision_into<W: Write>(r: &DecisionReport, w: &mut W) -> io::Result<()> {
    writeln!(w, "Single pass decision:")?;
    writeln!(w, "{S4}Voxels: {}", r.voxels)?;
    writeln!(w, "{S4}Tested (in brain): {}", r.tested)?;
    writeln!(w, "{S4}Abnormal: {}", r.abnormal)
}

/// 将邻域传播结果写进 `w` 中.
pub fn describe_propagation_into<W: Write>(
    r: &PropagationReport,
    w: &mut W,
) -> io::Result<()> {
    writeln!(w, "Neighborhood propagation:")?;
    writeln!(w, "{S4}Rounds: {}", r.rounds)?;
    writeln!(w, "{S4}Newly discovered: {}", r.candidates)?;
    writeln!(w, "{S4}Carried over: {}", r.carried)
}

/// 将标签中前 `classes` 个标签值的体素个数写进 `w` 中.
pub fn describe_labels_into<W: Write>(
    label: &LabelVolume,
    classes: usize,
    w: &mut W,
) -> io::Result<()> {
    writeln!(w, "Label counts:")?;
    for k in 0..classes.min(u8::MAX as usize + 1) {
        writeln!(w, "{S4}[{k}]: {}", label.count(k as u8))?;
    }
    Ok(())
}

/// 运行报告: 一组分节, 打印时以分隔线隔开.
#[derive(Default)]
pub struct Report {
    sections: Vec<Vec<u8>>,
}

impl Report {
    /// 创建空报告.
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一节. `f` 负责写入该节内容.
    pub fn section<F>(&mut self, f: F) -> io::Result<&mut Self>
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buf = Vec::with_capacity(256);
        f(&mut buf)?;
        self.sections.push(buf);
        Ok(self)
    }

    /// 将全部分节写到标准输出.
    pub fn print(&self) -> io::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        utils::sep_to(&mut out)?;
        for s in self.sections.iter() {
            out.write_all(s)?;
            utils::sep_to(&mut out)?;
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dti_berry::mrf::StopCondition;

    #[test]
    fn test_report_contents() {
        let mut report = Report::new();
        report
            .section(|w| describe_means_into(&[0.0, 0.25], 4, w))
            .unwrap()
            .section(|w| {
                describe_mrf_into(
                    &MrfReport {
                        iterations: 7,
                        stop: StopCondition::ErrorTolerance,
                        changed_fraction: 0.0,
                    },
                    w,
                )
            })
            .unwrap()
            .section(|w| describe_sigmoid_into(&Sigmoid::unit(0.5, 0.25), w))
            .unwrap();

        let text: Vec<String> = report
            .sections
            .iter()
            .map(|s| String::from_utf8(s.clone()).unwrap())
            .collect();
        assert!(text[0].contains("cluster[1]") && text[0].contains("0.25"));
        assert!(text[1].contains("Number of Iterations : 7"));
        assert!(text[1].contains("ErrorTolerance"));
        assert_eq!(text[2], "Optimum [Alpha,Beta] = [ 0.5 , 0.25 ]\n");
    }
}
