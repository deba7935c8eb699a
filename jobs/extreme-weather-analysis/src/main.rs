use anyhow::Result;
use clap::Parser;
use vedur::extreme::ExtremeWeatherJob;
use vedur::{AnalysisConfig, JobRuntime};

#[derive(Parser, Debug)]
#[command(about = "Extreme-weather risk statistics by location")]
struct Args {
    /// Input directory of newline-delimited weather observations
    #[arg(long)]
    input: String,
    /// Output directory
    #[arg(long)]
    output: String,
    /// Minimum daily precipitation (mm) for an extreme precipitation event
    #[arg(long, default_value_t = AnalysisConfig::default().precip_extreme_threshold)]
    precip_extreme_threshold: f64,
    /// Minimum daily max windspeed (km/h) for an extreme wind event
    #[arg(long, default_value_t = AnalysisConfig::default().wind_extreme_threshold)]
    wind_extreme_threshold: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();
    let mut runtime = JobRuntime::new();
    runtime.add_input(&args.input);
    runtime.set_output(&args.output);
    runtime.run(ExtremeWeatherJob::new(
        args.precip_extreme_threshold,
        args.wind_extreme_threshold,
    ))?;
    Ok(())
}
