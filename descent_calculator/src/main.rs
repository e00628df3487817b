//! # descent-calc
//!
//! Evaluates arithmetic expressions given as arguments, read from a file, or
//! read line by line from stdin. `--config` points at a TOML file with
//! `[tokenizer]`, `[parser]` and `[logging]` sections; command-line flags
//! override it.

use clap::Parser;
use descent_calculator::report::{self, EvaluationReport};
use descent_calculator::{log_bridge, Calculator};
use descent_engine::config::{ConfigError, LoggingPreferences, RuntimeConfig};
use descent_engine::logging::{self, LogLevel};
use descent_engine::pipeline::get_pipeline_info;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "descent-calc")]
#[command(about = "Evaluate arithmetic expressions with error recovery")]
#[command(version)]
struct Args {
    /// Expressions to evaluate; stdin is read when none are given
    #[arg(value_name = "EXPR")]
    expressions: Vec<String>,

    /// Read expressions from a file, one per line
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Runtime preferences file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print one JSON report per expression
    #[arg(long)]
    json: bool,

    /// Fail unless the tokenizer can use first-character dispatch
    #[arg(long)]
    strict: bool,

    /// Disable parser error recovery
    #[arg(long)]
    no_recovery: bool,

    /// Maximum lookahead depth for grammar analysis
    #[arg(long, value_name = "K")]
    lookahead: Option<usize>,

    /// Worker threads (defaults to the number of CPUs)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Print engine limits and the calculator's decision tables, then exit
    #[arg(long)]
    info: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let runtime = match load_runtime_config(&args) {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };
    init_logging(args.verbose, &runtime.logging);

    let calculator = match build_calculator(&args, runtime) {
        Ok(calculator) => calculator,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    if args.info {
        print_info(&calculator);
        return;
    }

    let inputs = match collect_inputs(&args) {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("Error: failed to read input: {}", e);
            process::exit(2);
        }
    };

    let jobs = args.jobs.unwrap_or_else(num_cpus::get);
    log::debug!("Evaluating {} expressions on {} threads", inputs.len(), jobs);

    let reports = report::evaluate_all(&calculator, &inputs, jobs);
    for report in &reports {
        print_report(report, args.json);
    }

    if !reports.iter().all(EvaluationReport::is_clean) {
        process::exit(1);
    }
}

fn load_runtime_config(args: &Args) -> Result<RuntimeConfig, ConfigError> {
    match &args.config {
        Some(path) => RuntimeConfig::load(path),
        None => Ok(RuntimeConfig::default()),
    }
}

fn init_logging(verbose: bool, preferences: &LoggingPreferences) {
    let (filter, engine_level) = if verbose {
        (log::LevelFilter::Debug, LogLevel::Debug)
    } else {
        (log::LevelFilter::Warn, LogLevel::Warning)
    };
    env_logger::Builder::new().filter_level(filter).parse_default_env().init();

    if let Err(e) = logging::config::init_runtime_preferences(preferences.clone()) {
        log::warn!("[{}] {}", e.error_code(), e);
    }

    // Engine sinks named in the config replace the bridge to `log`
    let installed = if preferences.enable_console_logging || preferences.use_structured_logging {
        logging::init_global_logging()
    } else {
        log_bridge::install(engine_level)
    };
    if let Err(e) = installed {
        log::warn!("[{}] Engine logging unavailable: {}", e.error_code(), e);
    }
}

fn build_calculator(args: &Args, mut runtime: RuntimeConfig) -> Result<Calculator, descent_calculator::CalculatorError> {
    if args.strict {
        runtime.tokenizer.ensure_optimizations = true;
    }
    if args.no_recovery {
        runtime.parser.recovery_enabled = false;
    }
    if let Some(k) = args.lookahead {
        runtime.parser.max_lookahead = k;
    }
    Calculator::from_config(&runtime)
}

fn collect_inputs(args: &Args) -> io::Result<Vec<String>> {
    let mut inputs = args.expressions.clone();
    if let Some(path) = &args.file {
        inputs.extend(report::read_expressions(path)?);
    }
    if inputs.is_empty() {
        for line in io::stdin().lock().lines() {
            let line = line?;
            if !line.trim().is_empty() {
                inputs.push(line.trim().to_string());
            }
        }
    }
    Ok(inputs)
}

fn print_report(report: &EvaluationReport, json: bool) {
    if json {
        match serde_json::to_string(report) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("Error: failed to serialize report: {}", e),
        }
    } else {
        print!("{}", report.to_text());
    }
}

fn print_info(calculator: &Calculator) {
    println!("{}", get_pipeline_info().report());
    println!("{}", logging::get_system_diagnostics());
    println!(
        "Tokenizer: {}",
        if calculator.engine().tokenizer().is_optimized() {
            "first-character dispatch"
        } else {
            "ordered scan"
        }
    );
    if let Some(analysis) = calculator.engine().analysis() {
        match analysis.decision_tables_json() {
            Ok(tables) => println!("{}", tables),
            Err(e) => eprintln!("Error: failed to serialize decision tables: {}", e),
        }
    }
}
