//! Text control surface for the ROI.
//!
//! One command per line, as produced by an input surface (mouse handler,
//! stdin, a socket):
//!
//! ```text
//! begin <x> <y>
//! update <x> <y>
//! end <x> <y>
//! clear
//! quit
//! ```

use anyhow::{anyhow, Result};

use crate::roi::{Point, RoiManager};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoiCommand {
    Begin(Point),
    Update(Point),
    End(Point),
    Clear,
    Quit,
}

/// What the caller should do after applying a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlFlow {
    Continue,
    Quit,
}

impl RoiCommand {
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let verb = parts
            .next()
            .ok_or_else(|| anyhow!("empty command"))?
            .to_ascii_lowercase();
        let args: Vec<&str> = parts.collect();

        let command = match verb.as_str() {
            "begin" | "b" => RoiCommand::Begin(parse_point(&verb, &args)?),
            "update" | "u" => RoiCommand::Update(parse_point(&verb, &args)?),
            "end" | "e" => RoiCommand::End(parse_point(&verb, &args)?),
            "clear" | "c" => no_args(&verb, &args, RoiCommand::Clear)?,
            "quit" | "q" => no_args(&verb, &args, RoiCommand::Quit)?,
            other => return Err(anyhow!("unknown command '{}'", other)),
        };
        Ok(command)
    }

    /// Apply the command to the ROI manager.
    pub fn apply(self, roi: &RoiManager) -> ControlFlow {
        match self {
            RoiCommand::Begin(point) => roi.begin_drag(point),
            RoiCommand::Update(point) => {
                if let Some(preview) = roi.update_drag(point) {
                    log::debug!("roi preview: {}", preview);
                }
            }
            RoiCommand::End(point) => {
                roi.end_drag(point);
            }
            RoiCommand::Clear => roi.clear(),
            RoiCommand::Quit => return ControlFlow::Quit,
        }
        ControlFlow::Continue
    }
}

fn parse_point(verb: &str, args: &[&str]) -> Result<Point> {
    let [x, y] = args else {
        return Err(anyhow!("'{}' expects two coordinates: {} <x> <y>", verb, verb));
    };
    let x: i32 = x
        .parse()
        .map_err(|_| anyhow!("'{}': x must be an integer, got '{}'", verb, x))?;
    let y: i32 = y
        .parse()
        .map_err(|_| anyhow!("'{}': y must be an integer, got '{}'", verb, y))?;
    Ok(Point::new(x, y))
}

fn no_args(verb: &str, args: &[&str], command: RoiCommand) -> Result<RoiCommand> {
    if !args.is_empty() {
        return Err(anyhow!("'{}' takes no arguments", verb));
    }
    Ok(command)
}
