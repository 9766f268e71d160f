// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `foam-relax`: load a foam document, run one solver, write the result.
//!
//! ```text
//! foam-relax <foam.json> [--dual <dual.json>] [--mode planarize|soft|perp]
//!            [--steps N] [--tolerance X] [--output <out.json>]
//! ```
//!
//! Defaults come from the `FOAM_*` environment variables. Log verbosity is
//! controlled by `RUST_LOG`.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use foamframe::{connect_duals, Foam, NeverCancel, RelaxStatus, SolverConfig};

const USAGE: &str = "usage: foam-relax <foam.json> [--dual <dual.json>] \
    [--mode planarize|soft|perp] [--steps N] [--tolerance X] [--output <out.json>]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Planarize,
    Soft,
    Perp,
}

#[derive(Debug)]
struct Args {
    input: PathBuf,
    dual: Option<PathBuf>,
    mode: Mode,
    steps: Option<usize>,
    tolerance: Option<f64>,
    output: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut input = None;
    let mut dual = None;
    let mut mode = Mode::Planarize;
    let mut steps = None;
    let mut tolerance = None;
    let mut output = None;

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| args.next().with_context(|| format!("{flag} needs a value"));
        match arg.as_str() {
            "--dual" => dual = Some(PathBuf::from(value("--dual")?)),
            "--output" | "-o" => output = Some(PathBuf::from(value("--output")?)),
            "--steps" => steps = Some(value("--steps")?.parse().context("invalid --steps")?),
            "--tolerance" => {
                tolerance = Some(value("--tolerance")?.parse().context("invalid --tolerance")?)
            }
            "--mode" => {
                mode = match value("--mode")?.as_str() {
                    "planarize" => Mode::Planarize,
                    "soft" => Mode::Soft,
                    "perp" => Mode::Perp,
                    other => bail!("unknown mode '{other}'"),
                }
            }
            flag if flag.starts_with('-') => bail!("unknown option '{flag}'"),
            path => {
                if input.replace(PathBuf::from(path)).is_some() {
                    bail!("only one input foam can be given");
                }
            }
        }
    }

    Ok(Args {
        input: input.context(USAGE)?,
        dual,
        mode,
        steps,
        tolerance,
        output,
    })
}

fn load(path: &PathBuf) -> Result<Foam> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Foam::from_json(&text).with_context(|| format!("loading {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info,foamframe=info".into()))
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    let config = SolverConfig::from_env();
    let max_steps = args.steps.unwrap_or(config.max_steps);

    let mut foam = load(&args.input)?;
    let mut dual = args.dual.as_ref().map(load).transpose()?;
    if let Some(dual) = dual.as_mut() {
        connect_duals(&mut foam, dual).context("linking dual foams")?;
    }

    tracing::info!(
        foam = %foam.id,
        cells = foam.cell_count(),
        faces = foam.face_count(),
        edges = foam.edge_count(),
        vertices = foam.vertex_count(),
        mode = ?args.mode,
        max_steps,
        "Loaded foam"
    );

    let report = match args.mode {
        Mode::Planarize => foam.planarize(
            max_steps,
            args.tolerance.unwrap_or(config.max_deviation),
            &NeverCancel,
        )?,
        Mode::Soft => foam.planarize_soft(
            max_steps,
            args.tolerance.unwrap_or(config.max_deviation),
            &NeverCancel,
        )?,
        Mode::Perp => {
            let dual = dual.as_ref().context("--mode perp needs --dual")?;
            foam.perp_soft(
                dual,
                max_steps,
                args.tolerance.unwrap_or(config.max_deviation_angle),
                &NeverCancel,
            )?
        }
    };

    if report.status != RelaxStatus::Converged {
        tracing::warn!(
            status = ?report.status,
            iterations = report.iterations,
            deviation = report.max_deviation,
            "Foam did not converge"
        );
    }

    let json = foam.to_json()?;
    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?
        }
        None => println!("{json}"),
    }
    Ok(())
}
