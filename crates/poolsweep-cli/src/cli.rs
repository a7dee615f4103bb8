//! Command-line interface.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use poolsweep_core::{
    ConnectionSettings, RangeDefaults, RunConfig, StoreKind, Suite, WorkloadMatrix,
    DEFAULT_POOL_SIZES,
};
use std::path::PathBuf;
use std::time::Duration;

/// Drive database connection pools with concurrent load and record
/// per-second throughput for every pool size and workload shape.
#[derive(Parser, Debug)]
#[command(name = "poolsweep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
    # Preview the sweep without touching any store
    poolsweep plan --store sqlite,postgres

    # Full sweep against PostgreSQL on a remote host
    poolsweep run --store postgres --host db1 --postgres-url postgres://bench:bench@{host}/demo

    # Short smoke run against the in-process store
    poolsweep run --store memory --pool-sizes 1,2 --window 5 --warmup-first 0 --warmup 0
")]
pub struct Cli {
    /// Verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute the sweep, writing one CSV per workload
    Run(RunArgs),

    /// Print the sweep plan and which workloads are already recorded
    Plan(PlanArgs),
}

/// Options shared by every subcommand that expands a sweep.
#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    /// Stores to drive (repeatable or comma-separated): memory, sqlite, postgres, mysql
    #[arg(short, long = "store", value_delimiter = ',', required = true)]
    pub stores: Vec<StoreKind>,

    /// Host identifier; names the artifact directory and fills `{host}` in URLs
    #[arg(long, env = "POOLSWEEP_HOST", default_value = "localhost")]
    pub host: String,

    /// Root directory for result artifacts
    #[arg(short, long, env = "POOLSWEEP_OUTPUT", default_value = "data")]
    pub output: PathBuf,

    /// Shape suite: complex or select-lite
    #[arg(long, default_value = "complex")]
    pub suite: Suite,

    /// Pool sizes to sweep, ascending (defaults to 1..=16 then up to 256)
    #[arg(long, value_delimiter = ',')]
    pub pool_sizes: Option<Vec<u32>>,

    /// Skip the mixed read/write shapes
    #[arg(long)]
    pub simple_only: bool,

    /// Run an insert-only pass over every pool size before the full pass
    #[arg(long)]
    pub insert_first: bool,

    /// Upper bound for point and aggregate read keys
    #[arg(long, default_value_t = RangeDefaults::default().read_range)]
    pub read_range: u32,

    /// Upper bound for update keys
    #[arg(long, default_value_t = RangeDefaults::default().update_range)]
    pub update_range: u32,

    /// Rows covered by one aggregate read
    #[arg(long, default_value_t = RangeDefaults::default().read_sample_size)]
    pub read_size: u32,
}

impl SweepArgs {
    pub fn ranges(&self) -> RangeDefaults {
        RangeDefaults {
            read_range: self.read_range,
            update_range: self.update_range,
            read_sample_size: self.read_size,
        }
    }

    /// Matrix for these options; `config` supplies the shape restrictions.
    pub fn matrix(&self, config: &RunConfig) -> WorkloadMatrix {
        let pool_sizes = self
            .pool_sizes
            .clone()
            .unwrap_or_else(|| DEFAULT_POOL_SIZES.to_vec());
        WorkloadMatrix::from_config(self.stores.clone(), config)
            .with_pool_sizes(pool_sizes)
            .with_suite(self.suite)
    }

    /// Configuration with only the sweep-shape fields filled in.
    pub fn base_config(&self) -> RunConfig {
        RunConfig {
            host: self.host.clone(),
            output_dir: self.output.clone(),
            ranges: self.ranges(),
            simple_only: self.simple_only,
            insert_first: self.insert_first,
            ..RunConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub sweep: SweepArgs,

    /// Compact the heap and reset counters every 10th tick
    #[arg(long)]
    pub force_gc: bool,

    /// Workers yield their time slice after every operation
    #[arg(long = "yield")]
    pub yield_between_ops: bool,

    /// Observation window length in ticks
    #[arg(long, default_value_t = 60)]
    pub window: u32,

    /// Warm-up before the first workload, in seconds
    #[arg(long, default_value_t = 40)]
    pub warmup_first: u64,

    /// Warm-up before every later workload, in seconds
    #[arg(long, default_value_t = 15)]
    pub warmup: u64,

    /// Pause between workloads, in seconds
    #[arg(long, default_value_t = 5)]
    pub cooldown: u64,

    /// Wait for in-flight operations after stopping workers, in milliseconds
    #[arg(long, default_value_t = 500)]
    pub grace_ms: u64,

    /// Tick length in milliseconds
    #[arg(long, default_value_t = 1000, hide = true)]
    pub tick_ms: u64,

    /// Directory for the SQLite database file
    #[arg(long, default_value = "sqlite")]
    pub sqlite_dir: PathBuf,

    /// PostgreSQL URL (`{host}` is replaced with --host)
    #[arg(
        long,
        env = "POOLSWEEP_POSTGRES_URL",
        hide_env_values = true,
        default_value = "postgres://postgres:postgres@{host}/demo"
    )]
    pub postgres_url: String,

    /// MySQL URL (`{host}` is replaced with --host)
    #[arg(
        long,
        env = "POOLSWEEP_MYSQL_URL",
        hide_env_values = true,
        default_value = "mysql://root:123@{host}:3306/demo"
    )]
    pub mysql_url: String,

    /// Seconds to wait for a pooled connection before counting a failure
    #[arg(long, default_value_t = 1)]
    pub acquire_timeout: u64,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl RunArgs {
    pub fn config(&self) -> Result<RunConfig> {
        if self.tick_ms == 0 {
            anyhow::bail!("--tick-ms must be positive");
        }
        let tick = Duration::from_millis(self.tick_ms);
        Ok(RunConfig {
            force_heap_compaction: self.force_gc,
            yield_between_ops: self.yield_between_ops,
            observation_ticks: self.window,
            tick,
            first_warmup: Duration::from_secs(self.warmup_first),
            warmup: Duration::from_secs(self.warmup),
            cooldown: Duration::from_secs(self.cooldown),
            drain_grace: Duration::from_millis(self.grace_ms),
            show_progress: !self.no_progress,
            ..self.sweep.base_config()
        })
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            sqlite_dir: self.sqlite_dir.clone(),
            postgres_url: self.postgres_url.clone(),
            mysql_url: self.mysql_url.clone(),
            acquire_timeout: Duration::from_secs(self.acquire_timeout),
        }
    }
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub sweep: SweepArgs,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
