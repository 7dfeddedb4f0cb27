// File: crates/demo/src/main.rs
// Summary: Demo runs the stacked pipeline over date-keyed CSV files and prints grouped totals and moving averages.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use chart_pipeline::{
    init_tracing, layer_moving_average, listener, load_config, stacked_pipeline, DataUpdate, Groupable, PipelineConfig,
    Stage, ViewState,
};

const SAMPLE_CSV: &str = "\
date,java,xml,txt
18/01/2013,1,11,111
19/01/2013,2,22,222
20/01/2013,3,33,333
";

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1).peekable();
    let config = match args.peek().map(String::as_str) {
        Some("--config") => {
            args.next();
            let path = args.next().context("--config requires a path")?;
            load_config(&path).with_context(|| format!("failed to load config '{path}'"))?
        }
        _ => PipelineConfig::default(),
    };
    init_tracing(&config.logging)?;

    let mut inputs = Vec::new();
    for raw in args {
        let (path, used_alt) = resolve_path(&raw)?;
        if used_alt {
            warn!(requested = %raw, using = %path.display(), "swapped .csv/.cvs extension");
        }
        let text = std::fs::read_to_string(&path).with_context(|| format!("failed to read '{}'", path.display()))?;
        inputs.push(text);
    }
    if inputs.is_empty() {
        println!("No input files given; using built-in sample.");
        inputs.push(SAMPLE_CSV.to_string());
    }
    let raw: Vec<&str> = inputs.iter().map(String::as_str).collect();
    info!(datasets = raw.len(), threshold = config.auto_group_threshold, "running stacked pipeline");

    let pipeline = stacked_pipeline(&raw, &config).context("failed to build pipeline")?;
    let latest: Rc<RefCell<Option<DataUpdate>>> = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&latest);
    pipeline.on_update(vec![listener(move |update: &DataUpdate| {
        *sink.borrow_mut() = Some(update.clone());
        Ok(())
    })]);

    pipeline.send_update()?;
    report("initial", &latest.borrow())?;

    for index in 0..pipeline.grouping.group_functions().len() {
        pipeline.group_by(index)?;
        report(&format!("grouped by #{index}"), &latest.borrow())?;
    }

    if let Some(&p) = config.percentile_options.last() {
        pipeline.set_percentile(p)?;
        report(&format!("percentile {:.1}%", p * 100.0), &latest.borrow())?;
    }
    Ok(())
}

fn report(label: &str, update: &Option<DataUpdate>) -> Result<()> {
    let update = update.as_ref().context("pipeline produced no update")?;
    let grouping = update.grouping()?;
    println!(
        "== {label}: {} rows, {} categories, bucket {:?}",
        update.data.len(),
        update.categories.len(),
        grouping.bucket().granularity()
    );
    if let Some(view) = ViewState::from_stacked(update.stacked()?) {
        println!("   x: {} .. {}, max stack {:.2}", view.x_min.date(), view.x_max.date(), view.y_max);
    }
    for layer in update.stacked()? {
        let total: f64 = layer.points.iter().map(|p| p.y).sum();
        let averages = layer_moving_average(layer, grouping.bucket(), None);
        match averages.last() {
            Some(last) => println!("   {:<12} total {:>10.2}  moving avg {:.2}", layer.category, total, last.mean),
            None => println!("   {:<12} total {:>10.2}", layer.category, total),
        }
    }
    Ok(())
}

/// Resolve `raw` as given, or with its `.csv`/`.cvs` extension swapped.
fn resolve_path(raw: &str) -> Result<(PathBuf, bool)> {
    let path = Path::new(raw);
    if path.exists() {
        return Ok((path.to_path_buf(), false));
    }
    let alt = match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => path.with_extension("cvs"),
        Some("cvs") => path.with_extension("csv"),
        _ => anyhow::bail!("input file '{raw}' not found"),
    };
    if alt.exists() {
        Ok((alt, true))
    } else {
        anyhow::bail!("input file '{raw}' not found")
    }
}
