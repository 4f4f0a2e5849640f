//! 3×3×3 邻域多轮传播.
//!
//! 以先验病灶标签 (如 FLAIR 分割结果) 为起点, 在其 3×3×3 邻域中寻找统计异常的体素.
//! 每一轮中, 对每个 "活跃中心" `c` 的 27 个邻居 `n` (包括 `c` 自身):
//!
//! 1. 若 `n` 在先验标签中非零, 则输出 [`LESION_PRIOR`];
//! 2. 否则若 `n` 通过统计检验, 则输出 [`LESION_CANDIDATE`];
//! 3. 否则 `n` 保持不变.
//!
//! 轮数固定, 不会因为结果稳定而提前退出. 每轮读取上一轮的快照, 写入新缓冲区,
//! 因此结果与体素访问顺序无关.
//!
//! 越界邻居视为不存在: 不参与检验, 也不会被写入.

use crate::consts::label::*;
use crate::consts::DEFAULT_PROPAGATION_ROUNDS;
use crate::data::for_each_voxel_mut;
use crate::decision::VoxelDecision;
use crate::neighbour::neighbours;
use crate::template::StatTemplate;
use crate::{DtiMap, Idx3d, LabelVolume, NiftiHeaderAttr, SegResult};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 活跃中心集合的更新方式.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PropagationMode {
    /// 第 N+1 轮的活跃中心为先验标签非零体素, 加上前 N 轮标注过的全部体素.
    /// 每轮最多向外扩张一个邻域半径.
    #[default]
    Grow,

    /// 活跃中心始终为先验标签非零体素. 标注范围不会超出先验标签的一个邻域半径.
    Anchored,
}

/// 邻域传播配置.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PropagationConfig {
    /// 传播轮数.
    pub rounds: u32,

    /// 活跃中心更新方式.
    pub mode: PropagationMode,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_PROPAGATION_ROUNDS,
            mode: PropagationMode::default(),
        }
    }
}

/// 传播结果统计.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PropagationReport {
    /// 实际执行的轮数.
    pub rounds: u32,

    /// 新发现 (标签 1) 的体素个数.
    pub candidates: usize,

    /// 继承自先验标签 (标签 2) 的体素个数.
    pub carried: usize,
}

impl fmt::Display for PropagationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rounds, {} candidate voxels, {} carried voxels",
            self.rounds, self.candidates, self.carried
        )
    }
}

/// 邻域传播器.
#[derive(Copy, Clone, Debug)]
pub struct NeighborhoodPropagator {
    rule: VoxelDecision,
    config: PropagationConfig,
}

impl NeighborhoodPropagator {
    /// 以判定规则 `rule` 与配置 `config` 创建传播器.
    pub fn new(rule: VoxelDecision, config: PropagationConfig) -> Self {
        Self { rule, config }
    }

    /// 获取判定规则.
    #[inline]
    pub fn rule(&self) -> &VoxelDecision {
        &self.rule
    }

    /// 获取配置.
    #[inline]
    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    /// 从先验标签 `prior` 出发执行全部轮次, 返回 `{0, 1, 2}` 标签.
    ///
    /// 先验标签中任何非零值都视为病灶. 输入数据不会被修改.
    pub fn run(
        &self,
        subject: &DtiMap,
        template: &StatTemplate,
        prior: &LabelVolume,
    ) -> SegResult<(LabelVolume, PropagationReport)> {
        template.check_aligned(subject)?;
        subject.check_aligned(prior)?;

        if prior.foreground_count() == 0 {
            log::warn!("Prior label has no lesion voxel, nothing will be propagated");
        }

        let shape = subject.shape();
        let (x, mean, std) = (subject.data(), template.mean.data(), template.std.data());
        let prior_data = prior.data();
        let grow = self.config.mode == PropagationMode::Grow;

        let mut current = LabelVolume::background_like(subject).into_data();
        for round in 1..=self.config.rounds {
            let snapshot = current.view();
            let changed = AtomicUsize::new(0);
            let mut next = current.clone();

            let is_active = |c: Idx3d| prior_data[c] != 0 || (grow && snapshot[c] != 0);
            for_each_voxel_mut(&mut next, |pos, v| {
                if !neighbours(pos, shape).any(|(_, c)| is_active(c)) {
                    return;
                }
                if prior_data[pos] != 0 {
                    if *v != LESION_PRIOR {
                        *v = LESION_PRIOR;
                        changed.fetch_add(1, Ordering::Relaxed);
                    }
                } else if is_background(*v)
                    && self.rule.is_abnormal(x[pos], mean[pos], std[pos])
                {
                    *v = LESION_CANDIDATE;
                    changed.fetch_add(1, Ordering::Relaxed);
                }
            });

            log::debug!(
                "Propagation round {round}/{}: {} voxels labelled",
                self.config.rounds,
                changed.into_inner()
            );
            current = next;
        }

        let label = LabelVolume::with_header_of(subject, current)?;
        let [_, candidates, carried] = label.numeric_statistics();
        let report = PropagationReport {
            rounds: self.config.rounds,
            candidates,
            carried,
        };
        log::info!("{} propagation: {report}", self.rule.map);
        Ok((label, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbour::{offset, shift, NEIGHBOURHOOD_SIZE};
    use crate::MapType;
    use ndarray::Array3;

    const SHAPE: Idx3d = (5, 5, 5);

    fn fake(data: Array3<f32>) -> DtiMap {
        DtiMap::fake(data, [1.0; 3])
    }

    /// `abnormal` 中的位置取值 0.1 (FA 下 z = -4), 其余取值 0.5 (z = 0).
    fn scene(abnormal: &[Idx3d]) -> (DtiMap, StatTemplate) {
        let subject = Array3::from_shape_fn(SHAPE, |p| {
            if abnormal.contains(&p) {
                0.1
            } else {
                0.5
            }
        });
        let template = StatTemplate::new(
            fake(Array3::from_elem(SHAPE, 0.5)),
            fake(Array3::from_elem(SHAPE, 0.1)),
        )
        .unwrap();
        (fake(subject), template)
    }

    fn prior_at(points: &[Idx3d]) -> LabelVolume {
        let mut label = LabelVolume::fake(Array3::zeros(SHAPE), [1.0; 3]);
        for p in points {
            label[*p] = 1;
        }
        label
    }

    fn propagator(rounds: u32, mode: PropagationMode) -> NeighborhoodPropagator {
        NeighborhoodPropagator::new(
            VoxelDecision::new(MapType::FractionalAnisotropy, 2.0),
            PropagationConfig { rounds, mode },
        )
    }

    #[test]
    fn test_single_round() {
        let abnormal = [(2, 1, 1), (3, 3, 3), (2, 2, 3), (0, 0, 0), (4, 4, 4), (1, 2, 2)];
        let (subject, template) = scene(&abnormal);
        let prior = prior_at(&[(2, 2, 2), (1, 2, 2)]);

        let (label, report) = propagator(1, PropagationMode::Grow)
            .run(&subject, &template, &prior)
            .unwrap();

        let mut expected = Array3::<u8>::zeros(SHAPE);
        expected[(2, 2, 2)] = LESION_PRIOR;
        expected[(1, 2, 2)] = LESION_PRIOR;
        for p in [(2, 1, 1), (3, 3, 3), (2, 2, 3)] {
            expected[p] = LESION_CANDIDATE;
        }
        assert_eq!(label.data(), expected.view());
        assert_eq!(
            report,
            PropagationReport {
                rounds: 1,
                candidates: 3,
                carried: 2,
            }
        );
    }

    /// 中心 `(2, 2, 2)` 的 27 邻域中, 编号为 3 的倍数的位置取 0.1 (z = -4),
    /// 其余取 0.45 (z = -0.5). 邻域之外全部取 0.1.
    fn centered_scene() -> (DtiMap, StatTemplate) {
        let subject = Array3::from_shape_fn(SHAPE, |p| {
            let index = (0..NEIGHBOURHOOD_SIZE)
                .find(|i| shift((2, 2, 2), offset(*i), SHAPE) == Some(p));
            match index {
                Some(i) if i % 3 == 0 => 0.1,
                Some(_) => 0.45,
                None => 0.1,
            }
        });
        let template = StatTemplate::new(
            fake(Array3::from_elem(SHAPE, 0.5)),
            fake(Array3::from_elem(SHAPE, 0.1)),
        )
        .unwrap();
        (fake(subject), template)
    }

    #[test]
    fn test_single_center_prior_one_round() {
        let (subject, template) = centered_scene();
        let prior = prior_at(&[(2, 2, 2)]);
        let (label, report) = propagator(1, PropagationMode::Grow)
            .run(&subject, &template, &prior)
            .unwrap();

        let mut expected = Array3::<u8>::zeros(SHAPE);
        for i in (0..NEIGHBOURHOOD_SIZE).filter(|i| i % 3 == 0) {
            expected[shift((2, 2, 2), offset(i), SHAPE).unwrap()] = LESION_CANDIDATE;
        }
        // 中心 (编号 13) 统计上正常, 继承先验标签.
        expected[(2, 2, 2)] = LESION_PRIOR;
        assert_eq!(label.data(), expected.view());
        assert_eq!(report.candidates, 9);
        assert_eq!(report.carried, 1);
    }

    #[test]
    fn test_single_center_prior_with_prior_neighbour() {
        let (subject, template) = centered_scene();
        // (2, 2, 3) 的编号为 14, 统计上正常, 但带有先验标签.
        let prior = prior_at(&[(2, 2, 2), (2, 2, 3)]);
        let (label, report) = propagator(1, PropagationMode::Grow)
            .run(&subject, &template, &prior)
            .unwrap();

        assert_eq!(label[(2, 2, 2)], LESION_PRIOR);
        assert_eq!(label[(2, 2, 3)], LESION_PRIOR);
        assert_eq!(report.carried, 2);
        let reach = |p: Idx3d| {
            neighbours(p, SHAPE).any(|(_, c)| c == (2, 2, 2) || c == (2, 2, 3))
        };
        for (p, v) in label.data().indexed_iter() {
            if *v == LESION_CANDIDATE {
                assert!(reach(p), "{p:?} is not adjacent to any prior voxel");
                assert_eq!(subject[p], 0.1);
            } else if *v == LESION_BACKGROUND && subject[p] == 0.1 {
                assert!(!reach(p), "{p:?} should have been labelled");
            }
        }
    }

    #[test]
    fn test_grow_and_anchored() {
        let abnormal = [(2, 2, 3), (2, 2, 4), (3, 3, 3), (4, 4, 4), (0, 0, 0)];
        let (subject, template) = scene(&abnormal);
        let prior = prior_at(&[(2, 2, 2)]);

        let (grown, _) = propagator(2, PropagationMode::Grow)
            .run(&subject, &template, &prior)
            .unwrap();
        assert_eq!(grown[(4, 4, 4)], LESION_CANDIDATE);
        assert_eq!(grown[(2, 2, 4)], LESION_CANDIDATE);
        assert_eq!(grown[(0, 0, 0)], LESION_BACKGROUND);

        let (anchored, report) = propagator(5, PropagationMode::Anchored)
            .run(&subject, &template, &prior)
            .unwrap();
        assert_eq!(anchored[(4, 4, 4)], LESION_BACKGROUND);
        assert_eq!(anchored[(2, 2, 4)], LESION_BACKGROUND);
        assert_eq!(anchored[(3, 3, 3)], LESION_CANDIDATE);
        assert_eq!(report.candidates, 2);
        assert_eq!(report.carried, 1);
    }

    #[test]
    fn test_background_prior_never_triggers() {
        let everywhere: Vec<Idx3d> = ndarray::indices(SHAPE).into_iter().collect();
        let (subject, template) = scene(&everywhere);
        let prior = prior_at(&[]);
        let (label, report) = propagator(5, PropagationMode::Grow)
            .run(&subject, &template, &prior)
            .unwrap();
        assert_eq!(label.foreground_count(), 0);
        assert_eq!(report.rounds, 5);
    }

    #[test]
    fn test_brain_mask_sentinel() {
        let (subject, template) = scene(&[]);
        let mut data = subject.into_data();
        data[(2, 2, 3)] = 0.0;
        let subject = fake(data);
        let prior = prior_at(&[(2, 2, 2)]);
        let (label, _) = propagator(1, PropagationMode::Grow)
            .run(&subject, &template, &prior)
            .unwrap();
        // 0 为脑外哨兵值, 即使 z = -5 也不参与检验.
        assert_eq!(label[(2, 2, 3)], LESION_BACKGROUND);
        assert_eq!(label.numeric_statistics(), [124, 0, 1]);
    }

    #[test]
    fn test_boundary_center() {
        let (subject, template) = scene(&[(0, 0, 1), (0, 1, 1), (1, 1, 1), (2, 2, 2)]);
        let prior = prior_at(&[(0, 0, 0)]);
        let (label, report) = propagator(1, PropagationMode::Grow)
            .run(&subject, &template, &prior)
            .unwrap();
        assert_eq!(label[(0, 0, 0)], LESION_PRIOR);
        assert_eq!(report.candidates, 3);
        assert_eq!(label[(2, 2, 2)], LESION_BACKGROUND);
    }
}
