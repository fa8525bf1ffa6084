use clap::Parser;
use sync_media::args::{Args, Command, SourceArgs, SyncArgs};
use sync_media::filename::FilenameDecoder;
use sync_media::processor::Processor;
use sync_media::walker;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns whether the run completed its walk
fn run(args: Args) -> anyhow::Result<bool> {
    match args.command {
        Command::Sync(sync) => run_sync(sync),
        Command::Scan(source) => run_scan(source),
    }
}

fn run_sync(sync: SyncArgs) -> anyhow::Result<bool> {
    let config = sync.into_config()?;
    let processor = Processor::new(config)?;

    let report = processor.run();
    report.print_summary();

    Ok(report.is_success())
}

fn run_scan(source: SourceArgs) -> anyhow::Result<bool> {
    source.validate()?;
    let decoder = FilenameDecoder::new(&source.extensions)?;

    let records = walker::scan(&source.dir, &decoder)?;
    for record in &records {
        println!("{}\t{}\t{}", record.normalized_timestamp, record.title, record.file_name);
    }
    println!();
    println!("Found {} media files in {}", records.len(), source.dir.display());

    Ok(true)
}
