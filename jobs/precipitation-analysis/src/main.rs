use anyhow::Result;
use clap::Parser;
use vedur::precipitation::PrecipitationJob;
use vedur::{AnalysisConfig, JobRuntime};

#[derive(Parser, Debug)]
#[command(about = "Precipitation statistics by country")]
struct Args {
    /// Input directory of newline-delimited weather observations
    #[arg(long)]
    input: String,
    /// Output directory
    #[arg(long)]
    output: String,
    /// Minimum daily precipitation (mm) for a day to count as rainy
    #[arg(long, default_value_t = AnalysisConfig::default().min_precipitation)]
    min_precipitation: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();
    let mut runtime = JobRuntime::new();
    runtime.add_input(&args.input);
    runtime.set_output(&args.output);
    runtime.run(PrecipitationJob::new(args.min_precipitation))?;
    Ok(())
}
