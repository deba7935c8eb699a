use anyhow::Result;
use clap::Parser;
use vedur::temperature::TemperatureJob;
use vedur::{AnalysisConfig, Granularity, JobRuntime};

#[derive(Parser, Debug)]
#[command(about = "Temperature statistics by climate zone")]
struct Args {
    /// Input directory of newline-delimited weather observations
    #[arg(long)]
    input: String,
    /// Output directory
    #[arg(long)]
    output: String,
    /// Key composition: all, seasonal or monthly
    #[arg(long, value_enum, default_value_t = AnalysisConfig::default().granularity)]
    granularity: Granularity,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();
    let mut runtime = JobRuntime::new();
    runtime.add_input(&args.input);
    runtime.set_output(&args.output);
    runtime.run(TemperatureJob::new(args.granularity))?;
    Ok(())
}
