// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use bank_sim_rs::{
    Simulation, SimulationConfig, SimulationReport, WithdrawOutcome, WorkerRole,
};
use clap::Parser;
use csv::Writer;
use std::io::Write;
use std::process;
use std::time::Duration;

/// Bank Sim - concurrent ledger simulation
///
/// Spawns equal populations of deposit, transfer, and withdraw worker
/// threads against a shared set of accounts and prints the final balances
/// and per-worker totals once every thread has finished.
#[derive(Parser, Debug)]
#[command(name = "bank-sim-rs")]
#[command(about = "Runs a concurrent bank ledger simulation", long_about = None)]
struct Args {
    /// Worker threads per role (3x this many threads in total)
    #[arg(short = 't', long, default_value_t = 5)]
    threads: usize,

    /// Number of accounts in the bank
    #[arg(short = 'a', long, default_value_t = 10)]
    accounts: usize,

    /// Operations per deposit/transfer worker
    #[arg(short = 'i', long, default_value_t = 100)]
    iterations: u32,

    /// Simulated processing delay in microseconds (0 disables)
    #[arg(short = 'd', long, default_value_t = 10, value_name = "MICROS")]
    delay: u64,

    /// Fixed RNG seed for reproducible per-worker draws
    #[arg(long)]
    seed: Option<u64>,

    /// Narrate every operation to stdout
    #[arg(short, long)]
    verbose: bool,

    /// Write the final balances as CSV instead of the text report
    #[arg(long)]
    csv: bool,
}

impl Args {
    fn to_config(&self) -> SimulationConfig {
        SimulationConfig {
            workers_per_role: self.threads,
            accounts: self.accounts,
            iterations: self.iterations,
            step_delay: Duration::from_micros(self.delay),
            seed: self.seed,
            verbose: self.verbose,
        }
    }
}

fn main() {
    let args = Args::parse();

    let simulation = match Simulation::new(args.to_config()) {
        Ok(simulation) => simulation,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    let report = match simulation.run() {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Simulation failed: {}", e);
            process::exit(1);
        }
    };

    if args.csv {
        if let Err(e) = write_balances(&report, std::io::stdout()) {
            eprintln!("Error writing output: {}", e);
            process::exit(1);
        }
    } else {
        print_report(&report);
    }
}

/// Write the final account balances as CSV.
///
/// # CSV Format
///
/// Columns: `account, balance`
///
/// # Example
///
/// ```csv
/// account,balance
/// 0,125
/// 1,0
/// ```
///
/// # Errors
///
/// Returns a CSV error if writing fails.
fn write_balances<W: Write>(report: &SimulationReport, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for row in report.balance_rows() {
        wtr.serialize(row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Print the final balances and per-worker totals, one section per role.
fn print_report(report: &SimulationReport) {
    println!("\nNet deposits by worker");
    for record in report.workers_in_role(WorkerRole::Deposit) {
        println!("{}: {}", record.id, record.net_total);
    }
    println!("Total: {}", report.total_deposited());

    println!("\nNet transfers by worker");
    for record in report.workers_in_role(WorkerRole::Transfer) {
        println!("{}: {}", record.id, record.net_total);
    }
    println!("Total: {}", report.total_transferred());

    println!("\nAccount balances");
    for (account, balance) in report.balances().iter().enumerate() {
        println!("{}: {}", account, balance);
    }
    println!("Total: {}", report.bank_total());

    println!("\nWithdrawals by worker");
    for record in report.workers_in_role(WorkerRole::Withdraw) {
        match record.outcome {
            Some(WithdrawOutcome::Abandoned) => {
                println!("{}: {} (abandoned)", record.id, record.net_total)
            }
            _ => println!("{}: {}", record.id, record.net_total),
        }
    }
    println!("Total: {}", report.total_withdrawn());
}
