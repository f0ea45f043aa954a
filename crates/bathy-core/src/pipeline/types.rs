use crate::div::DivCoefficient;
use crate::io::report_io::{SampleCounts, SceneSummary};
use crate::raster::Image;
use crate::regress::AccuracyMetrics;
use crate::render::Layer;
use crate::report::ComparisonReport;

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Loading,
    CloudMasking,
    WaterMasking,
    DepthInvariant,
    ReferenceSampling,
    Regression,
    Comparison,
    Writing,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 8] = [
        Self::Loading,
        Self::CloudMasking,
        Self::WaterMasking,
        Self::DepthInvariant,
        Self::ReferenceSampling,
        Self::Regression,
        Self::Comparison,
        Self::Writing,
    ];
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "Loading imagery"),
            Self::CloudMasking => write!(f, "Masking clouds"),
            Self::WaterMasking => write!(f, "Classifying water"),
            Self::DepthInvariant => write!(f, "Computing depth-invariant indices"),
            Self::ReferenceSampling => write!(f, "Sampling reference depths"),
            Self::Regression => write!(f, "Training bathymetry model"),
            Self::Comparison => write!(f, "Comparing with reference"),
            Self::Writing => write!(f, "Writing output"),
        }
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started.
    fn begin_stage(&self, _stage: PipelineStage) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter, used when `run_pipeline` delegates.
pub(super) struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Ordered layers produced while the pipeline ran.
#[derive(Clone, Debug, Default)]
pub struct Artifacts {
    layers: Vec<Layer>,
}

impl Artifacts {
    pub fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn get(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Everything a pipeline run produced.
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    pub scene: SceneSummary,
    pub coefficients: Vec<DivCoefficient>,
    pub samples: SampleCounts,
    pub metrics: AccuracyMetrics,
    pub predicted: Image,
    pub difference: Image,
    pub comparison: ComparisonReport,
    pub artifacts: Artifacts,
}
