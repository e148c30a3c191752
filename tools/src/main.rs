//! scenario-runner: headless driver for the scenario tail analysis.
//!
//! Usage:
//!   scenario-runner --input-dir outputs --export-dir final
//!   scenario-runner --config analysis.json --winner-fraction 0.2
//!   scenario-runner --step cte80 --ranking-file final/scenarios_ranking.csv

use anyhow::Result;
use scenario_core::{
    artifact::format_float,
    config::AnalysisConfig,
    error::PipelineError,
    pipeline,
    ranking::Ranking,
    tail::YearlyTailExpectation,
};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    All,
    Rank,
    Cte0,
    Cte80,
}

impl Step {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "all"   => Some(Step::All),
            "rank"  => Some(Step::Rank),
            "cte0"  => Some(Step::Cte0),
            "cte80" => Some(Step::Cte80),
            _ => None,
        }
    }
}

const PREVIEW_ROWS: usize = 10;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config = build_config(&args)?;
    let step_raw = string_arg(&args, "--step").unwrap_or("all");
    let step = Step::parse(step_raw)
        .ok_or_else(|| anyhow::anyhow!("unknown --step '{step_raw}' (expected all, rank, cte0 or cte80)"))?;
    let ranking_file = string_arg(&args, "--ranking-file")
        .map(PathBuf::from)
        .unwrap_or_else(|| config.ranking_path());

    println!("Scenario tail analysis: scenario-runner");
    println!("  input_dir:       {}", config.input_dir.display());
    println!("  export_dir:      {}", config.export_dir.display());
    println!("  winner_fraction: {}", config.winner_fraction);
    println!("  step:            {step_raw}");
    println!();

    let outcome = match step {
        Step::All => pipeline::run_all(&config).map(|run| {
            print_ranking(&run.ranking);
            print_tail("CTE0 (all scenarios)", &run.cte0);
            print_tail("CTE80 (winner scenarios)", &run.cte80);
            print_warnings(&run.summary.warnings);
            println!();
            println!("Generated files:");
            for path in [
                config.ranking_path(),
                config.cte0_path(),
                config.cte80_path(),
                config.summary_path(),
            ] {
                println!("  - {}", path.display());
            }
        }),
        Step::Rank => pipeline::run_ranking(&config).map(|ranking| print_ranking(&ranking)),
        Step::Cte0 => pipeline::run_cte0(&config).map(|rows| print_tail("CTE0 (all scenarios)", &rows)),
        Step::Cte80 => pipeline::run_cte80(&config, &ranking_file)
            .map(|rows| print_tail("CTE80 (winner scenarios)", &rows)),
    };

    if let Err(e) = outcome {
        report_failure(&e);
        std::process::exit(1);
    }
    Ok(())
}

fn build_config(args: &[String]) -> Result<AnalysisConfig> {
    let mut config = match string_arg(args, "--config") {
        Some(path) => AnalysisConfig::load(Path::new(path))?,
        None => AnalysisConfig::default(),
    };
    if let Some(dir) = string_arg(args, "--input-dir") {
        config.input_dir = PathBuf::from(dir);
    }
    if let Some(dir) = string_arg(args, "--export-dir") {
        config.export_dir = PathBuf::from(dir);
    }
    if let Some(fraction) = parse_arg::<f64>(args, "--winner-fraction")? {
        config.winner_fraction = fraction;
    }
    config.validate()?;
    Ok(config)
}

fn report_failure(e: &PipelineError) {
    log::error!("{e}");
    eprintln!("error: {e}");
    eprintln!("  stage: {}", e.stage);
}

fn print_ranking(ranking: &Ranking) {
    let winners: Vec<String> = ranking.winners().iter().map(ToString::to_string).collect();
    println!("=== RANKING (most negative to most positive) ===");
    println!("  scenarios:        {}", ranking.entries.len());
    println!("  winner threshold: {} scenario(s)", ranking.winner_count());
    println!("  winners:          {}", winners.join(", "));
    for entry in &ranking.entries {
        println!(
            "  {:>5}  scenario {:<8} total {:>20}  {}",
            entry.rank,
            entry.scenario_id,
            format_float(entry.total),
            if entry.is_winner { "winner" } else { "" }
        );
    }
    println!();
}

fn print_tail(title: &str, rows: &[YearlyTailExpectation]) {
    println!("=== {title} ===");
    if let (Some(first), Some(last)) = (rows.first(), rows.last()) {
        println!("  years: {} ({} - {})", rows.len(), first.year, last.year);
    }
    let print_row = |row: &YearlyTailExpectation| {
        println!(
            "  {}  db {:>20}  mb {:>20}  (n={})",
            row.year,
            format_float(row.mean_db_topup),
            format_float(row.mean_mb_topup),
            row.contributors
        );
    };
    if rows.len() <= PREVIEW_ROWS * 2 {
        rows.iter().for_each(print_row);
    } else {
        rows[..PREVIEW_ROWS].iter().for_each(print_row);
        println!("  ...");
        rows[rows.len() - PREVIEW_ROWS..].iter().for_each(print_row);
    }
    println!();
}

fn print_warnings(warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    println!("=== WARNINGS ({}) ===", warnings.len());
    for warning in warnings {
        println!("  {warning}");
    }
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str) -> Result<Option<T>> {
    string_arg(args, flag)
        .map(|raw| {
            raw.parse()
                .map_err(|_| anyhow::anyhow!("invalid value '{raw}' for {flag}"))
        })
        .transpose()
}
