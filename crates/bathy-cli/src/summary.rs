use std::path::PathBuf;

use bathy_core::pipeline::config::SceneSelection;
use bathy_core::pipeline::{PipelineConfig, PipelineOutput};
use console::Style;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

fn underline(s: &Styles, title: &str) {
    println!("  {}", s.title.apply_to(title));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(title.chars().count())));
    println!();
}

pub fn print_pipeline_summary(config: &PipelineConfig) {
    let s = Styles::new();

    println!();
    underline(&s, "Bathymetry Pipeline");

    println!(
        "  {:<14}{}",
        s.label.apply_to("Catalog"),
        s.path.apply_to(config.sources.catalog.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(config.output.directory.display())
    );
    println!();

    let src = &config.sources;
    println!("  {}", s.header.apply_to("Imagery"));
    println!("    {:<12}{}", s.label.apply_to("Optical"), s.value.apply_to(&src.optical));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Dates"),
        s.value.apply_to(format!("{} .. {}", src.start_date, src.end_date))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Clouds"),
        s.value.apply_to(format!("< {:.0}%", src.max_cloud_cover))
    );
    let selection = match src.scene_selection {
        SceneSelection::First => "first",
        SceneSelection::LeastCloudy => "least cloudy",
    };
    println!("    {:<12}{}", s.label.apply_to("Scene"), s.method.apply_to(selection));
    println!("    {:<12}{}", s.label.apply_to("Reference"), s.value.apply_to(&src.reference));
    println!();

    println!("  {}", s.header.apply_to("Water mask"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Index"),
        s.method.apply_to(format!(
            "MNDWI ({}, {})",
            config.water.green_band, config.water.swir_band
        ))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Training"),
        s.value.apply_to(format!(
            "{} land / {} water",
            config.water.land_points.len(),
            config.water.water_points.len()
        ))
    );
    println!();

    println!("  {}", s.header.apply_to("Depth-invariant index"));
    let pairs: Vec<String> = config.div.pairs.iter().map(|p| p.name()).collect();
    println!("    {:<12}{}", s.label.apply_to("Pairs"), s.value.apply_to(pairs.join(", ")));
    println!();

    let r = &config.reference;
    println!("  {}", s.header.apply_to("Regression"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Points"),
        s.value.apply_to(format!("{} (seed {})", r.num_points, r.seed))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Train"),
        s.value.apply_to(format!("{:.0}%", r.train_fraction * 100.0))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Trees"),
        s.method.apply_to(config.regression.forest.num_trees)
    );
    println!();

    if !config.output.render_layers {
        println!(
            "  {:<14}{}",
            s.header.apply_to("Rendering"),
            s.disabled.apply_to("disabled")
        );
        println!();
    }
}

pub fn print_result_summary(output: &PipelineOutput, written: &[PathBuf]) {
    let s = Styles::new();

    println!();
    underline(&s, "Results");

    println!(
        "  {:<14}{}",
        s.label.apply_to("Scene"),
        s.value.apply_to(format!(
            "{} ({}, {:.1}% cloud)",
            output.scene.id, output.scene.date, output.scene.cloud_cover
        ))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Points"),
        s.value.apply_to(format!(
            "{} sampled, {} training, {} validation",
            output.samples.reference_points,
            output.samples.training_points,
            output.samples.validation_points
        ))
    );
    println!();

    println!("  {}", s.header.apply_to("DIV coefficients"));
    for c in &output.coefficients {
        println!(
            "    {:<12}{}",
            s.label.apply_to(&c.band),
            s.value.apply_to(format!("{:.4}", c.ratio))
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Accuracy"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("R²"),
        s.value.apply_to(format!("{:.4}", output.metrics.r_squared))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("RMSE"),
        s.value.apply_to(format!("{:.4}", output.metrics.rmse))
    );
    match &output.comparison.scatter {
        Some(scatter) => {
            let t = &scatter.trendline;
            println!(
                "    {:<12}{}",
                s.label.apply_to("Trendline"),
                s.value.apply_to(format!(
                    "y = {:.3}x {:+.3} (r² {:.3})",
                    t.slope, t.intercept, t.r_squared
                ))
            );
        }
        None => println!(
            "    {:<12}{}",
            s.label.apply_to("Trendline"),
            s.disabled.apply_to("undefined")
        ),
    }
    println!();

    if !written.is_empty() {
        println!("  {}", s.header.apply_to("Written"));
        for path in written {
            println!("    {}", s.path.apply_to(path.display()));
        }
        println!();
    }
}
