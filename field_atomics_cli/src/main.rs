// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use clap::{Parser as ClapParser, Subcommand, ValueEnum};
use cliclack::{intro, log, outro, set_theme};
use field_atomics::{Backoff, Dispatcher, Ordering, RetryPolicy, ScalarKind};
use field_atomics_cli::{
    BenchTheme, Contention, HarnessConfig, Palette, PathSelection, affine_sequence,
    install_stop_handler, run_harness,
};
use tracing_subscriber::EnvFilter;

/// Contention harness for atomic field updates
#[derive(Debug, ClapParser)] // requires `derive` feature
#[command(name = "fieldbench")]
#[command(about = "Contention harness for atomic field updates", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Hammers cells from a thread pool and checks that no update was lost
    Run {
        #[arg(short, long, default_value_t = 4)]
        threads: usize,
        /// Operations per thread and trial
        #[arg(short, long, default_value_t = 250_000)]
        ops: u64,
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        operand: i128,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        initial: i128,
        #[arg(short, long, value_enum, default_value_t = Contention::High)]
        contention: Contention,
        #[arg(short, long, value_enum, default_value_t = PathSelection::Both)]
        path: PathSelection,
        #[arg(long, value_enum, default_value_t = OrderingArg::AcqRel)]
        ordering: OrderingArg,
        #[arg(long, default_value_t = 10)]
        trials: u32,
        #[arg(short, long, value_enum, default_value_t = WidthArg::I64)]
        width: WidthArg,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Give up on a CAS-path update after this many failed attempts
        #[arg(long)]
        retry_cap: Option<u32>,
        /// Spin up to 2^S times between failed attempts
        #[arg(long)]
        backoff_shift: Option<u32>,
    },

    /// Applies x -> x * mul + add through the CAS loop and prints each value
    Affine {
        #[arg(long, default_value_t = 100, allow_negative_numbers = true)]
        initial: i64,
        #[arg(long, default_value_t = 2, allow_negative_numbers = true)]
        mul: i64,
        #[arg(long, default_value_t = 3, allow_negative_numbers = true)]
        add: i64,
        #[arg(long, default_value_t = 3)]
        steps: usize,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OrderingArg {
    AcqRel,
    SeqCst,
}

impl From<OrderingArg> for Ordering {
    fn from(arg: OrderingArg) -> Self {
        match arg {
            OrderingArg::AcqRel => Ordering::AcqRel,
            OrderingArg::SeqCst => Ordering::SeqCst,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum WidthArg {
    I32,
    I64,
    U32,
    U64,
}

impl From<WidthArg> for ScalarKind {
    fn from(arg: WidthArg) -> Self {
        match arg {
            WidthArg::I32 => ScalarKind::I32,
            WidthArg::I64 => ScalarKind::I64,
            WidthArg::U32 => ScalarKind::U32,
            WidthArg::U64 => ScalarKind::U64,
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();
    init_tracing(args.verbose);
    set_theme(BenchTheme::new(Palette::default()));

    match args.command {
        Command::Run {
            threads,
            ops,
            operand,
            initial,
            contention,
            path,
            ordering,
            trials,
            width,
            json,
            retry_cap,
            backoff_shift,
        } => {
            let mut retry = RetryPolicy::UNBOUNDED;
            if let Some(cap) = retry_cap {
                retry = retry.with_max_retries(cap);
            }
            if let Some(max_shift) = backoff_shift {
                retry = retry.with_backoff(Backoff::Spin {
                    max_shift: max_shift.min(Backoff::MAX_SHIFT),
                });
            }
            let config = HarnessConfig {
                threads,
                ops_per_thread: ops,
                operand,
                initial,
                contention,
                paths: path,
                ordering: ordering.into(),
                trials,
                width: width.into(),
                retry,
            };

            let stop = install_stop_handler()?;
            let report = run_harness(&config, &stop)?;
            if json {
                println!("{}", report.to_json()?);
            } else {
                report.print(&Palette::default())?;
            }
            if !report.is_verified() {
                std::process::exit(1);
            }
        }
        Command::Affine {
            initial,
            mul,
            add,
            steps,
        } => {
            intro(format!("x -> x * {mul} + {add}"))?;
            let values = affine_sequence(
                &Dispatcher::new(),
                initial,
                mul,
                add,
                steps,
                Ordering::AcqRel,
            )?;
            for (step, value) in values.iter().enumerate() {
                log::step(format!("{step}: {value}"))?;
            }
            outro(format!("{steps} steps"))?;
        }
    }
    Ok(())
}
