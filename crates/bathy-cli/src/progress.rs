use bathy_core::pipeline::{PipelineStage, ProgressReporter};
use indicatif::{ProgressBar, ProgressStyle};

/// Terminal progress bar advanced once per pipeline stage.
pub struct BarProgressReporter {
    bar: ProgressBar,
}

impl BarProgressReporter {
    pub fn new() -> anyhow::Result<Self> {
        let bar = ProgressBar::new(PipelineStage::ALL.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg:36} [{bar:40}] {pos}/{len}")?
                .progress_chars("=> "),
        );
        Ok(Self { bar })
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("Done");
    }
}

impl ProgressReporter for BarProgressReporter {
    fn begin_stage(&self, stage: PipelineStage) {
        self.bar.set_message(stage.to_string());
    }

    fn finish_stage(&self) {
        self.bar.inc(1);
    }
}
