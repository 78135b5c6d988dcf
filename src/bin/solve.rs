//! CLI wrapper: run one analysis from a JSON project file.
//!
//! ```text
//! solve --analysis <id> --project <file.json> [--deadline <sec>]
//! ```
//!
//! Exit codes: 0 ok, 2 missing model, 3 singular system, 4 timeout,
//! 5 internal error.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use framesolve::error::EngineError;
use framesolve::runner::{self, RunControl};
use framesolve::store::JsonProjectStore;

struct Args {
    analysis: String,
    project: PathBuf,
    deadline: Option<Duration>,
}

fn parse_args() -> Result<Args> {
    let mut analysis = None;
    let mut project = None;
    let mut deadline = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--analysis" => {
                analysis = Some(args.next().context("--analysis needs a value")?);
            }
            "--project" => {
                project = Some(PathBuf::from(args.next().context("--project needs a value")?));
            }
            "--deadline" => {
                let seconds: f64 = args
                    .next()
                    .context("--deadline needs a value")?
                    .parse()
                    .context("--deadline must be a number of seconds")?;
                deadline = Some(Duration::from_secs_f64(seconds));
            }
            "--help" | "-h" => {
                println!("usage: solve --analysis <id> --project <file.json> [--deadline <sec>]");
                std::process::exit(0);
            }
            other => bail!("unknown argument '{other}'"),
        }
    }

    Ok(Args {
        analysis: analysis.context("--analysis is required")?,
        project: project.context("--project is required")?,
        deadline,
    })
}

fn exit_code_for(error: &EngineError) -> u8 {
    match error {
        EngineError::ModelMissing { .. } | EngineError::ModelInconsistent(_) => 2,
        EngineError::Singular => 3,
        EngineError::Timeout => 4,
        _ => 5,
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::from(5);
        }
    };

    let store = match JsonProjectStore::open(&args.project) {
        Ok(store) => store,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::from(exit_code_for(&error));
        }
    };

    let control = match args.deadline {
        Some(timeout) => RunControl::with_deadline(timeout),
        None => RunControl::new(),
    };

    match runner::run_with_control(&store, &args.analysis, &control) {
        Ok(outcome) => {
            println!(
                "analysis '{}' complete: {} node, {} element, {} modal records -> {}",
                outcome.analysis_id,
                outcome.node_results,
                outcome.element_results,
                outcome.modal_results,
                store.results_path().display()
            );
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(exit_code_for(&error))
        }
    }
}
