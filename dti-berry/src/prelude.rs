//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx3d;

pub use crate::{DtiMap, LabelVolume, NiftiHeaderAttr};
pub use crate::{SegError, SegResult};

pub use crate::{Abnormality, MapType, Resolution};

pub use crate::consts::label::{LESION_BACKGROUND, LESION_CANDIDATE, LESION_PRIOR};

pub use crate::template::{StatTemplate, TemplateKind, TemplateStore};

pub use crate::decision::{local_decision, z_score, DecisionReport, VoxelDecision};

pub use crate::propagate::{
    NeighborhoodPropagator, PropagationConfig, PropagationMode, PropagationReport,
};

pub use crate::mrf::{
    ClassModel, MrfParams, MrfRelaxation, MrfReport, NeighborhoodWeights, StopCondition,
};

pub use crate::cluster::{kmeans, KMeansOptions, KMeansResult};

pub use crate::enhance::{Sigmoid, ThresholdMethod};
