//! Go Text Protocol front end.
//!
//! GTP v2 over stdin/stdout: responses are `=` (ok) or `?` (error)
//! followed by the echoed command id, the payload, and a blank line.
//! Protocol responses are the only stdout traffic; everything else
//! goes through the logger.
//!
//! Besides the standard commands a `debug` command exposes the
//! engine's internals: position setup, neighborhood codes, tactical
//! reading, move generators, pattern matches and single playouts.

use std::io::{BufRead, Write};
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use itertools::Itertools;

use crate::constants::*;
use crate::engine::Engine;
use crate::largepat::LargeBoard;
use crate::mcts::{best_child, tree_search, Tree};
use crate::playout::{gen_capture_moves, gen_pat3_moves, last_moves_neighbors, mcplayout};
use crate::position::{
    env8, parse_coord, pass_move, play_move, render, str_coord, Point, Position,
};
use crate::sets::PointList;
use crate::tactics::fix_atari;

const KNOWN_COMMANDS: &[&str] = &[
    "boardsize",
    "clear_board",
    "cputime",
    "debug",
    "genmove",
    "help",
    "known_command",
    "komi",
    "list_commands",
    "name",
    "play",
    "protocol_version",
    "quit",
    "showboard",
    "version",
];

pub struct Gtp {
    engine: Engine,
    pos: Position,
    owner: Box<[i32; BOARDSIZE]>,
    n_sims: usize,
    started: Instant,
}

impl Gtp {
    pub fn new(engine: Engine, n_sims: usize) -> Self {
        Gtp {
            engine,
            pos: Position::new(),
            owner: Box::new([0; BOARDSIZE]),
            n_sims,
            started: Instant::now(),
        }
    }

    /// Serve commands until EOF or `quit`.
    pub fn run(&mut self) -> Result<()> {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        for line in stdin.lock().lines() {
            let line = line.context("reading GTP input")?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (id, rest) = split_id(line);
            let mut words = rest.split_whitespace();
            let Some(command) = words.next() else {
                continue;
            };
            let command = command.to_lowercase();
            let args: Vec<&str> = words.collect();

            let (prefix, payload) = match self.execute(&command, &args) {
                Ok(msg) => ('=', msg),
                Err(err) => {
                    log::warn!("command {command} failed: {err:#}");
                    ('?', format!("{err:#}"))
                }
            };
            writeln!(stdout, "{prefix}{id} {payload}\n").context("writing GTP reply")?;
            stdout.flush()?;

            if command == "quit" {
                break;
            }
        }
        Ok(())
    }

    fn execute(&mut self, command: &str, args: &[&str]) -> Result<String> {
        match command {
            "name" => Ok("tenuki".into()),
            "version" => Ok(env!("CARGO_PKG_VERSION").into()),
            "protocol_version" => Ok("2".into()),
            "list_commands" | "help" => Ok(KNOWN_COMMANDS.join("\n")),
            "known_command" => {
                let cmd = args.first().ok_or_else(|| anyhow!("missing argument"))?;
                Ok(KNOWN_COMMANDS.contains(&cmd.to_lowercase().as_str()).to_string())
            }
            "quit" => Ok(String::new()),
            "boardsize" => {
                let size: usize = args
                    .first()
                    .ok_or_else(|| anyhow!("missing argument"))?
                    .parse()
                    .context("invalid size")?;
                if size == N {
                    Ok(String::new())
                } else {
                    bail!("unacceptable size, this build plays {N}x{N}")
                }
            }
            "clear_board" => {
                self.pos.clear();
                self.owner.fill(0);
                Ok(String::new())
            }
            "komi" => {
                let komi: f32 = args
                    .first()
                    .ok_or_else(|| anyhow!("missing argument"))?
                    .parse()
                    .context("invalid komi")?;
                self.pos.komi = komi;
                Ok(String::new())
            }
            "play" => {
                let vertex = args.get(1).ok_or_else(|| anyhow!("missing arguments"))?;
                let pt = parse_coord(vertex).ok_or_else(|| anyhow!("invalid coordinate"))?;
                play_move(&mut self.engine, &mut self.pos, pt)
                    .map_err(|e| anyhow!("{e}"))?;
                log::debug!("\n{}", render(&self.pos, None));
                Ok(String::new())
            }
            "genmove" => {
                if args.is_empty() {
                    bail!("missing argument");
                }
                self.owner.fill(0);
                let mut tree = Tree::new(&self.pos);
                let mv = tree_search(
                    &mut self.engine,
                    &mut tree,
                    self.n_sims,
                    &mut self.owner,
                    true,
                );
                let reply = match mv {
                    RESIGN_MOVE => "resign".to_owned(),
                    PASS_MOVE => {
                        pass_move(&mut self.pos);
                        "pass".to_owned()
                    }
                    pt => {
                        play_move(&mut self.engine, &mut self.pos, pt)
                            .map_err(|e| anyhow!("search chose an illegal move: {e}"))?;
                        str_coord(pt)
                    }
                };
                if let Some(best) = best_child(&tree, 0) {
                    log::info!(
                        "genmove {} winrate {:.3} ({} nodes)",
                        reply,
                        tree.node(best).winrate(),
                        tree.len()
                    );
                }
                log::debug!("\n{}", render(&self.pos, Some((&*self.owner, self.n_sims))));
                Ok(reply)
            }
            "showboard" => Ok(format!(
                "\n{}",
                render(&self.pos, Some((&*self.owner, self.n_sims)))
            )),
            "cputime" => Ok(format!("{:.3}", self.started.elapsed().as_secs_f64())),
            "debug" => self.debug(args),
            _ => bail!("unknown command: {command}"),
        }
    }

    fn debug(&mut self, args: &[&str]) -> Result<String> {
        let sub = args.first().ok_or_else(|| anyhow!("missing subcommand"))?;
        match *sub {
            "setpos" => {
                for vertex in &args[1..] {
                    let pt =
                        parse_coord(vertex).ok_or_else(|| anyhow!("invalid coordinate {vertex}"))?;
                    play_move(&mut self.engine, &mut self.pos, pt).map_err(|e| anyhow!("{e}"))?;
                }
                Ok(String::new())
            }
            "savepos" => {
                let path = args.get(1).ok_or_else(|| anyhow!("missing file name"))?;
                std::fs::write(path, render(&self.pos, None))
                    .with_context(|| format!("writing {path}"))?;
                Ok(String::new())
            }
            "env8" => {
                let pt = self.vertex_arg(args)?;
                let key = env8(&self.pos, pt);
                Ok(format!(
                    "{key:#06x} pat3 {}",
                    self.engine.pat3.matches(key)
                ))
            }
            "fix_atari" => {
                let pt = self.vertex_arg(args)?;
                if self.pos.color[pt] != TO_PLAY && self.pos.color[pt] != OPPONENT {
                    bail!("no stone at {}", str_coord(pt));
                }
                let status = fix_atari(&mut self.engine, &self.pos, pt, false, true, false);
                Ok(format!(
                    "{} {}",
                    status.in_atari as u8,
                    status.moves.iter().map(|&m| str_coord(m)).join(" ")
                ))
            }
            "gen_playout" => {
                let kind = args.get(1).ok_or_else(|| anyhow!("missing generator"))?;
                let local = last_moves_neighbors(&mut self.engine, &self.pos);
                let mut moves = PointList::new();
                match *kind {
                    "capture" => {
                        let mut sizes = Vec::new();
                        gen_capture_moves(
                            &mut self.engine,
                            &self.pos,
                            local.as_slice(),
                            1.0,
                            false,
                            &mut moves,
                            &mut sizes,
                        );
                    }
                    "pat3" => {
                        gen_pat3_moves(&mut self.engine, &self.pos, local.as_slice(), 1.0, &mut moves)
                    }
                    other => bail!("unknown generator {other}"),
                }
                Ok(moves.iter().map(|&m| str_coord(m)).join(" "))
            }
            "match_pat" => {
                let pt = self.vertex_arg(args)?;
                let board = LargeBoard::from_position(&self.pos);
                let matches = self.engine.large.matching_ids(&board, pt);
                if matches.is_empty() {
                    Ok("-".into())
                } else {
                    Ok(matches
                        .iter()
                        .map(|(ring, id)| format!("{ring}:{id}"))
                        .join(" "))
                }
            }
            "playout" => {
                let mut scratch = self.pos.clone();
                let mut amaf = Box::new([0i8; BOARDSIZE]);
                let score = mcplayout(
                    &mut self.engine,
                    &mut scratch,
                    &mut amaf,
                    Some(&mut *self.owner),
                    true,
                );
                Ok(format!("score {score:.1} after {} plies", scratch.n))
            }
            other => bail!("unknown debug subcommand: {other}"),
        }
    }

    fn vertex_arg(&self, args: &[&str]) -> Result<Point> {
        let vertex = args.get(1).ok_or_else(|| anyhow!("missing vertex"))?;
        let pt = parse_coord(vertex).ok_or_else(|| anyhow!("invalid coordinate {vertex}"))?;
        if pt == PASS_MOVE {
            bail!("need a board vertex");
        }
        Ok(pt)
    }
}

/// Split the optional numeric command id off a GTP line.
fn split_id(line: &str) -> (String, &str) {
    let digits = line.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits > 0 && line.as_bytes().get(digits).is_none_or(|b| b.is_ascii_whitespace()) {
        (line[..digits].to_owned(), line[digits..].trim_start())
    } else {
        (String::new(), line)
    }
}
