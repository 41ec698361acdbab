//! Line-oriented front end: reads commands, drives a [`Session`], prints feedback.

use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use thiserror::Error;

use super::Session;
use crate::editor::{Feature, FeatureKey, FeatureStyle};
use crate::geometry::{Coordinate, Extent};
use crate::map::{Interaction, MapSurface};
use crate::state::ToolKind;
use crate::AppResult;

/// Extra time granted on top of the request timeout before a command stops waiting.
const SETTLE_MARGIN: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Tool(ToolKind),
    Rectangle(Coordinate, Coordinate),
    Polygon(Vec<Coordinate>),
    Move { key: u64, dx: f64, dy: f64 },
    Hover(Coordinate),
    Click(Coordinate),
    Accept,
    Reject,
    List,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command `{0}`; try `help`")]
    Unknown(String),
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("`{0}` is not a number")]
    NotANumber(String),
    #[error("no shape #{0}")]
    UnknownShape(u64),
    #[error("`{command}` expects {expected}")]
    Arity {
        command: &'static str,
        expected: &'static str,
    },
}

pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match head {
        "tool" => match args.as_slice() {
            [label] => Command::Tool(
                ToolKind::from_label(label)
                    .ok_or_else(|| CommandError::UnknownTool((*label).to_string()))?,
            ),
            _ => return Err(arity("tool", "a tool name")),
        },
        "rect" => match numbers(&args)?.as_slice() {
            [x1, y1, x2, y2] => Command::Rectangle(Coordinate::new(*x1, *y1), Coordinate::new(*x2, *y2)),
            _ => return Err(arity("rect", "four numbers: x1 y1 x2 y2")),
        },
        "poly" => {
            let values = numbers(&args)?;
            if values.len() < 6 || values.len() % 2 != 0 {
                return Err(arity("poly", "at least three x y pairs"));
            }
            Command::Polygon(
                values
                    .chunks_exact(2)
                    .map(|pair| Coordinate::new(pair[0], pair[1]))
                    .collect(),
            )
        }
        "move" => match args.as_slice() {
            [key, dx, dy] => Command::Move {
                key: key
                    .trim_start_matches('#')
                    .parse()
                    .map_err(|_| CommandError::NotANumber((*key).to_string()))?,
                dx: number(dx)?,
                dy: number(dy)?,
            },
            _ => return Err(arity("move", "a shape key and dx dy")),
        },
        "hover" => Command::Hover(point("hover", &args)?),
        "click" => Command::Click(point("click", &args)?),
        "yes" | "y" => Command::Accept,
        "no" | "n" => Command::Reject,
        "list" | "ls" => Command::List,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn arity(command: &'static str, expected: &'static str) -> CommandError {
    CommandError::Arity { command, expected }
}

fn number(value: &str) -> Result<f64, CommandError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
        .ok_or_else(|| CommandError::NotANumber(value.to_string()))
}

fn numbers(values: &[&str]) -> Result<Vec<f64>, CommandError> {
    values.iter().map(|value| number(value)).collect()
}

fn point(command: &'static str, args: &[&str]) -> Result<Coordinate, CommandError> {
    match numbers(args)?.as_slice() {
        [x, y] => Ok(Coordinate::new(*x, *y)),
        _ => Err(arity(command, "two numbers: x y")),
    }
}

const HELP: &str = "\
commands:
  tool <rectangle|polygon|edit|clear|clear-all>   press a tool button
  rect x1 y1 x2 y2                                finish a rectangle draw
  poly x1 y1 x2 y2 x3 y3 ...                      finish a polygon draw
  move <key> dx dy                                drag a shape (edit tool)
  hover x y | click x y                           pointer over / click on the map (clear tool)
  yes | no                                        answer the open prompt
  list | status | help | quit";

/// Text rendering of the map surface.
#[derive(Debug, Default)]
pub struct ConsoleMap {
    interaction: Option<Interaction>,
    rendered: Vec<String>,
}

impl ConsoleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interaction(&self) -> Option<Interaction> {
        self.interaction
    }

    pub fn rendered(&self) -> &[String] {
        &self.rendered
    }
}

impl MapSurface for ConsoleMap {
    fn add_interaction(&mut self, interaction: Interaction) {
        if let Some(previous) = self.interaction.replace(interaction) {
            tracing::warn!(?previous, ?interaction, "interaction replaced without removal");
        }
    }

    fn remove_interaction(&mut self, interaction: Interaction) {
        if self.interaction == Some(interaction) {
            self.interaction = None;
        }
    }

    fn fit_to_extent(&mut self, extent: Extent, padding: u32) {
        tracing::info!(?extent, padding, "view fitted to imagery");
    }

    fn render(&mut self, features: &[Feature], hovered: Option<FeatureKey>) {
        self.rendered = features
            .iter()
            .map(|feature| render_feature(feature, hovered))
            .collect();
    }
}

fn render_feature(feature: &Feature, hovered: Option<FeatureKey>) -> String {
    let marker = match feature.style(hovered) {
        FeatureStyle::Normal => ' ',
        FeatureStyle::Hovered => '>',
        FeatureStyle::Unsaved => '*',
    };
    let id = feature.id.as_ref().map_or("unsaved", |id| id.as_str());
    let extent = feature.ring.extent();
    format!(
        "{marker} {} {} {id} [{:.1} {:.1} {:.1} {:.1}]",
        feature.key,
        feature.kind.label(),
        extent.min_x,
        extent.min_y,
        extent.max_x,
        extent.max_y
    )
}

/// Feeds commands from `input` to the session until EOF or `quit`.
pub fn run<R, W>(session: &mut Session<ConsoleMap>, input: R, mut output: W) -> std::io::Result<()>
where
    R: BufRead,
    W: Write,
{
    let settle_timeout = session.config().request_timeout() + SETTLE_MARGIN;
    writeln!(output, "{} shapes loaded; type `help` for commands", session.live().len())?;
    let mut last_toast = None;

    for line in input.lines() {
        let line = line?;
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                writeln!(output, "error: {err}")?;
                continue;
            }
        };
        tracing::debug!(?command, "console command");

        match command {
            Command::Quit => break,
            Command::Help => writeln!(output, "{HELP}")?,
            Command::List => {
                for line in session.map().rendered() {
                    writeln!(output, "{line}")?;
                }
            }
            Command::Status => writeln!(
                output,
                "{}{}",
                session.coordinator(),
                if session.is_saving() { ", saving" } else { "" }
            )?,
            command => {
                if let Err(err) = execute(session, command) {
                    writeln!(output, "error: {err}")?;
                }
            }
        }

        session.settle(settle_timeout);
        session.tick(Instant::now());
        let toast = session
            .notifier()
            .toast()
            .map(|toast| (toast.kind, toast.text.clone()));
        if toast != last_toast {
            if let Some((kind, text)) = &toast {
                writeln!(output, "[{}] {text}", kind.label())?;
            }
            last_toast = toast;
        }
        if let Some(prompt) = session.notifier().pending_confirm() {
            writeln!(output, "? {} (yes/no)", prompt.text)?;
        }
        output.flush()?;
    }
    Ok(())
}

fn execute(session: &mut Session<ConsoleMap>, command: Command) -> AppResult<()> {
    match command {
        Command::Tool(tool) => {
            session.request_tool(tool)?;
        }
        Command::Rectangle(start, end) => {
            session.draw_rectangle(start, end)?;
        }
        Command::Polygon(vertices) => {
            session.draw_polygon(&vertices)?;
        }
        Command::Move { key, dx, dy } => {
            let key = session
                .live()
                .features()
                .iter()
                .map(|feature| feature.key)
                .find(|candidate| candidate.get() == key)
                .ok_or(CommandError::UnknownShape(key))?;
            session.translate_feature(key, dx, dy)?;
        }
        Command::Hover(point) => {
            session.hover(point);
        }
        Command::Click(point) => {
            session.click(point)?;
        }
        Command::Accept => {
            session.accept()?;
        }
        Command::Reject => {
            session.reject()?;
        }
        Command::List | Command::Status | Command::Help | Command::Quit => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;
    use crate::api::ShapeRecord;
    use crate::app::Dispatch;
    use crate::config::AppConfig;
    use crate::editor::ShapeId;
    use crate::editor::ShapeKind;
    use crate::geometry::Ring;
    use std::sync::Arc;

    #[test]
    fn parses_tool_and_draw_commands() {
        assert_eq!(
            parse_command("tool clear-all").unwrap(),
            Some(Command::Tool(ToolKind::ClearAll))
        );
        assert_eq!(
            parse_command("rect 0 0 10 5").unwrap(),
            Some(Command::Rectangle(
                Coordinate::new(0.0, 0.0),
                Coordinate::new(10.0, 5.0)
            ))
        );
        assert_eq!(
            parse_command("  poly 0 0 4 0 2 3 ").unwrap(),
            Some(Command::Polygon(vec![
                Coordinate::new(0.0, 0.0),
                Coordinate::new(4.0, 0.0),
                Coordinate::new(2.0, 3.0),
            ]))
        );
        assert_eq!(
            parse_command("move #3 1.5 -2").unwrap(),
            Some(Command::Move {
                key: 3,
                dx: 1.5,
                dy: -2.0
            })
        );
        assert_eq!(parse_command("").unwrap(), None);
    }

    #[test]
    fn rejects_malformed_commands() {
        assert_eq!(
            parse_command("tool lasso"),
            Err(CommandError::UnknownTool("lasso".to_string()))
        );
        assert_eq!(
            parse_command("rect 0 0 nan 1"),
            Err(CommandError::NotANumber("nan".to_string()))
        );
        assert!(matches!(
            parse_command("poly 0 0 1 1"),
            Err(CommandError::Arity { command: "poly", .. })
        ));
        assert!(matches!(
            parse_command("click 1"),
            Err(CommandError::Arity { command: "click", .. })
        ));
        assert_eq!(
            parse_command("undo"),
            Err(CommandError::Unknown("undo".to_string()))
        );
    }

    #[test]
    fn scripted_session_draws_and_lists_shapes() {
        let ring = Ring::rectangle(Coordinate::new(0.0, 0.0), Coordinate::new(10.0, 10.0)).unwrap();
        let api = Arc::new(MockApi::with_shapes(vec![ShapeRecord::new(
            ShapeId::new("1"),
            ShapeKind::Rectangle,
            &ring,
        )]));
        let mut session = Session::new(
            AppConfig::default(),
            ConsoleMap::new(),
            api.clone(),
            Dispatch::Inline,
        );
        session.mount(api.as_ref());

        let script = "tool polygon\npoly 20 20 30 20 25 28\nlist\nbogus\nquit\nlist\n";
        let mut output = Vec::new();
        run(&mut session, script.as_bytes(), &mut output).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.starts_with("1 shapes loaded"));
        assert!(output.contains("[success] Polygon saved"));
        assert!(output.contains("shape-1"));
        assert!(output.contains("error: unknown command `bogus`"));
        assert_eq!(session.live().len(), 2);
        assert_eq!(session.map().interaction(), None);
        assert_eq!(session.map().rendered().len(), 2);
    }

    #[test]
    fn failed_commands_report_their_error_and_keep_going() {
        let api = Arc::new(MockApi::new());
        let mut session = Session::new(
            AppConfig::default(),
            ConsoleMap::new(),
            api.clone(),
            Dispatch::Inline,
        );
        session.mount(api.as_ref());

        let script = "rect 0 0 5 5\nmove 99 1 1\nyes\ntool rectangle\nrect 0 0 5 5\n";
        let mut output = Vec::new();
        run(&mut session, script.as_bytes(), &mut output).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.contains("error: Rectangle tool is not active"));
        assert!(output.contains("error: no shape #99"));
        assert!(output.contains("error: no confirmation prompt is pending"));
        assert_eq!(session.live().len(), 1);
    }
}
