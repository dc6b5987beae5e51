use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hoopow::core::params::{LOOKUP_TABLE_SIZE, MAX_BLOCK_LEVEL};
use hoopow::core::types::{parse_header_json, BlockHeader, Header};
use hoopow::miner::{self, MineResult, MinerConfig};
use hoopow::pow::lookup::LookupTable;
use hoopow::pow::{self, PowVariant, State};

#[derive(Parser)]
#[command(name = "hoopow", version = "1.0.6")]
#[command(about = "Hoopow - proof-of-work evaluation for DAG block headers")]
struct Cli {
    /// Maximum block level used by `level`
    #[arg(long, global = true, default_value_t = MAX_BLOCK_LEVEL)]
    max_level: u32,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one lookup table entry
    Table {
        #[arg(short, long, default_value_t = 0)]
        index: usize,
    },
    /// Compute the work value of a header
    Work {
        /// Header JSON file
        #[arg(long)]
        header: PathBuf,
        #[arg(short, long, default_value = "original")]
        variant: PowVariant,
    },
    /// Check a header's PoW against its bits field
    Check {
        #[arg(long)]
        header: PathBuf,
    },
    /// Compute a header's DAG block level
    Level {
        #[arg(long)]
        header: PathBuf,
    },
    /// Search nonces until the header meets its target
    Mine {
        #[arg(long)]
        header: PathBuf,
        /// Mining threads (0 = all cores)
        #[arg(short, long, default_value_t = 0)]
        threads: usize,
        #[arg(short, long, default_value = "original")]
        variant: PowVariant,
    },
}

fn load_header(path: &Path) -> Header {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("❌ Cannot read {}: {}", path.display(), e);
            std::process::exit(1);
        }
    };
    match parse_header_json(&json) {
        Ok(header) => header,
        Err(e) => {
            eprintln!("❌ {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hoopow=info".parse().expect("static directive")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Table { index } => {
            if index >= LOOKUP_TABLE_SIZE {
                eprintln!("❌ Index must be below {}", LOOKUP_TABLE_SIZE);
                std::process::exit(1);
            }
            let table = LookupTable::global();
            println!("📋 table[{}] = {:#018x}", index, table.get(index));
        }

        Commands::Work { header, variant } => {
            let mut header = load_header(&header);
            let state: State = State::new(&mut header);
            let work = state.calculate_work(variant);
            println!("🔢 Work ({})", variant);
            println!("  Pre-PoW hash: {}", hex::encode(state.pre_pow_hash()));
            println!("  Work value:   {:064x}", work);
            println!("  Bit length:   {}", work.bits());
            match state.target() {
                Some(target) => println!("  Target:       {:064x}", target),
                None => println!("  Target:       negative"),
            }
            println!("  Meets target: {}", state.meets_target(&work));
        }

        Commands::Check { header } => {
            let mut header = load_header(&header);
            if pow::check_proof_of_work_by_bits(&mut header) {
                println!("✅ Valid PoW for {}", header);
            } else {
                println!("❌ Insufficient PoW for {}", header);
                std::process::exit(1);
            }
        }

        Commands::Level { header } => {
            let header = load_header(&header);
            let level = pow::block_level(&header, cli.max_level);
            println!("📶 Block level: {} (max {})", level, cli.max_level);
        }

        Commands::Mine { header, threads, variant } => {
            let mut header = load_header(&header);
            let threads = if threads == 0 { num_cpus::get() } else { threads };
            let state: State = State::new(&mut header);

            let stop = Arc::new(AtomicBool::new(false));
            let handler_stop = stop.clone();
            if let Err(e) = ctrlc::set_handler(move || handler_stop.store(true, Ordering::Relaxed)) {
                tracing::warn!("Could not install Ctrl-C handler: {}", e);
            }

            println!("⛏️  Difficulty: {}", state.difficulty());
            let config = MinerConfig { threads, variant };
            match miner::mine(state, &config, stop) {
                MineResult::Found { nonce, work } => {
                    header.set_nonce(nonce);
                    println!("✅ Found nonce {} (work {:064x})", nonce, work);
                    match serde_json::to_string_pretty(&header) {
                        Ok(json) => println!("{}", json),
                        Err(e) => eprintln!("❌ {}", e),
                    }
                }
                MineResult::Cancelled => {
                    println!("🛑 Mining cancelled.");
                    std::process::exit(1);
                }
            }
        }
    }
}
