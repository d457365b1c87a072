mod app;
mod elementfilter;
mod mapdata;

use anyhow::{Context, Result};
use clap::Parser;

use app::{Cli, element_ref, evaluate, load_elements, load_filter_text};
use elementfilter::parse_element_filter_expression;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let filter_text = load_filter_text(&cli)?;
    let expr = parse_element_filter_expression(&filter_text)
        .with_context(|| format!("CLI: Invalid filter '{}'", filter_text.trim()))?;
    tracing::info!("Filter: {}", expr);

    if cli.overpass {
        print!("{}", expr.to_overpass_ql_string());
        return Ok(());
    }

    match &cli.elements {
        Some(path) => {
            let elements = load_elements(path)?;
            let start = std::time::Instant::now();
            let matching = evaluate(&expr, &elements);
            tracing::info!(
                "Matched {} of {} elements in {:.2}ms",
                matching.len(),
                elements.len(),
                start.elapsed().as_secs_f64() * 1000.0
            );
            for element in matching {
                println!("{}", element_ref(element));
            }
        }
        // no elements given: just echo the normalized filter
        None => println!("{expr}"),
    }

    Ok(())
}
