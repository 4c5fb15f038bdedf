use std::process::ExitCode;
use std::sync::Arc;

use dotenvy::dotenv;
use log::{error, info};

use pow_chain::{
    BlockHasher, Blockchain, Miner, ScheduleConfig, Sha256Hasher, run_schedule,
    report::LogSink,
};

fn main() -> ExitCode {
    let _ = dotenv();
    env_logger::init();

    let config = ScheduleConfig::from_env();
    let hasher: Arc<dyn BlockHasher> = Arc::new(Sha256Hasher);
    if let Err(e) = config.validate(hasher.hex_len()) {
        error!("invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    println!(
        "⛏️ Mining difficulties {}..={} ({} blocks each) on {} workers",
        config.min_difficulty,
        config.max_difficulty,
        config.blocks_per_difficulty,
        config.miner.worker_count
    );

    let miner = Miner::from_config(hasher, &config.miner);
    let mut chain = Blockchain::new(miner).with_sink(LogSink);

    let summaries = match run_schedule(&mut chain, &config) {
        Ok(summaries) => summaries,
        Err(e) => {
            error!("schedule aborted at height {}: {e}", chain.len());
            return ExitCode::FAILURE;
        }
    };

    info!(
        "chain height {} valid={}",
        chain.len(),
        chain.is_valid_chain()
    );
    match serde_json::to_string_pretty(&summaries) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            error!("failed to serialize summary: {e}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
