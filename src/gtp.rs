//! GTP (Go Text Protocol) front end.
//!
//! Implements the core protocol: command ids, `#` comments, `=`/`?`
//! responses followed by a blank line. The engine owns one board and one
//! search instance; `genmove` both searches and plays the chosen move.

use std::io::{BufRead, Write};
use std::sync::Arc;

use crate::board::Board;
use crate::constants::N;
use crate::hash::Zobrist;
use crate::mcts::{Uct, UctConfig};
use crate::playout::HeuristicPolicy;
use crate::vertex::{Player, Vertex};

const COMMANDS: &[&str] = &[
    "protocol_version",
    "name",
    "version",
    "known_command",
    "list_commands",
    "quit",
    "boardsize",
    "clear_board",
    "komi",
    "play",
    "genmove",
    "undo",
    "showboard",
    "final_score",
];

pub struct GtpEngine {
    board: Board,
    uct: Uct<HeuristicPolicy>,
}

impl GtpEngine {
    pub fn new(config: UctConfig) -> GtpEngine {
        let zobrist = Arc::new(Zobrist::new(config.seed));
        GtpEngine {
            board: Board::new(zobrist),
            uct: Uct::new(config),
        }
    }

    /// Read commands from `input` until EOF or `quit`, writing one
    /// response per command to `output`.
    pub fn run(&mut self, input: impl BufRead, mut output: impl Write) -> anyhow::Result<()> {
        for line in input.lines() {
            let line = line?;
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let (id, cmd, args) = parse_line(line);
            let (ok, msg) = self.execute(cmd, &args);
            let marker = if ok { '=' } else { '?' };
            match id {
                Some(id) => writeln!(output, "{marker}{id} {msg}\n"),
                None => writeln!(output, "{marker} {msg}\n"),
            }?;
            output.flush()?;
            if ok && cmd == "quit" {
                break;
            }
        }
        Ok(())
    }

    /// Dispatch one command; `(true, response)` on success, `(false,
    /// message)` on failure, per the protocol.
    pub fn execute(&mut self, cmd: &str, args: &[&str]) -> (bool, String) {
        match cmd {
            "protocol_version" => (true, "2".into()),
            "name" => (true, "tengen".into()),
            "version" => (true, env!("CARGO_PKG_VERSION").into()),
            "known_command" => {
                let known = args.first().is_some_and(|c| COMMANDS.contains(c));
                (true, known.to_string())
            }
            "list_commands" => (true, COMMANDS.join("\n")),
            "quit" => (true, String::new()),
            "boardsize" => match args.first().and_then(|a| a.parse::<usize>().ok()) {
                Some(size) if size == N => (true, String::new()),
                Some(_) => (false, "unacceptable size".into()),
                None => (false, "syntax error".into()),
            },
            "clear_board" => {
                // clear resets komi to the default; GTP keeps it
                let komi = self.board.komi();
                self.board.clear();
                self.board.set_komi(komi);
                (true, String::new())
            }
            "komi" => match args.first().and_then(|a| a.parse::<f32>().ok()) {
                // GTP komi favors White, the internal score is
                // Black-positive
                Some(komi) => {
                    self.board.set_komi(-komi);
                    (true, String::new())
                }
                None => (false, "syntax error".into()),
            },
            "play" => self.cmd_play(args),
            "genmove" => self.cmd_genmove(args),
            "undo" => {
                if self.board.undo() {
                    (true, String::new())
                } else {
                    (false, "cannot undo".into())
                }
            }
            "showboard" => (true, format!("\n{}", self.board)),
            "final_score" => {
                let score = self.board.tt_score();
                if score > 0 {
                    (true, format!("B+{:.1}", score as f32 - 0.5))
                } else {
                    (true, format!("W+{:.1}", 0.5 - score as f32))
                }
            }
            _ => (false, "unknown command".into()),
        }
    }

    fn cmd_play(&mut self, args: &[&str]) -> (bool, String) {
        let (Some(pl), Some(v)) = (
            args.first().and_then(|s| Player::from_gtp(s)),
            args.get(1).and_then(|s| Vertex::from_gtp(s)),
        ) else {
            return (false, "syntax error".into());
        };
        if v == Vertex::RESIGN {
            return (false, "illegal move".into());
        }
        if self.board.try_play(pl, v) {
            (true, String::new())
        } else {
            (false, "illegal move".into())
        }
    }

    fn cmd_genmove(&mut self, args: &[&str]) -> (bool, String) {
        let Some(pl) = args.first().and_then(|s| Player::from_gtp(s)) else {
            return (false, "syntax error".into());
        };
        let v = self.uct.genmove(&self.board, pl);
        eprint!("{}", self.uct.root_summary());
        if v == Vertex::RESIGN {
            return (true, "resign".into());
        }
        if !self.board.try_play(pl, v) {
            // the searched move should always be playable; pass if not
            self.board.try_play(pl, Vertex::PASS);
            return (true, "pass".into());
        }
        (true, v.to_gtp())
    }
}

/// Split a command line into (optional id, command, args).
fn parse_line(line: &str) -> (Option<u32>, &str, Vec<&str>) {
    let mut parts = line.split_whitespace();
    let first = parts.next().unwrap_or("");
    if let Ok(id) = first.parse::<u32>() {
        let cmd = parts.next().unwrap_or("");
        (Some(id), cmd, parts.collect())
    } else {
        (None, first, parts.collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> GtpEngine {
        GtpEngine::new(UctConfig {
            playout_cnt: 60,
            mature_threshold: 5.0,
            max_nodes: 10_000,
            seed: 1,
            ..Default::default()
        })
    }

    fn run_script(script: &str) -> String {
        let mut out = Vec::new();
        engine().run(script.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn protocol_basics() {
        let out = run_script("1 protocol_version\n2 name\nquit\n");
        assert!(out.starts_with("=1 2\n\n"));
        assert!(out.contains("=2 tengen\n\n"));
        assert!(out.contains("= \n\n")); // quit
    }

    #[test]
    fn comments_and_ids_are_parsed() {
        let (id, cmd, args) = parse_line("42 play b D4");
        assert_eq!(id, Some(42));
        assert_eq!(cmd, "play");
        assert_eq!(args, vec!["b", "D4"]);
        let (id, cmd, _) = parse_line("clear_board");
        assert_eq!(id, None);
        assert_eq!(cmd, "clear_board");
    }

    #[test]
    fn play_and_illegal_play() {
        let mut e = engine();
        assert_eq!(e.execute("play", &["b", "D4"]), (true, String::new()));
        let (ok, msg) = e.execute("play", &["w", "D4"]);
        assert!(!ok);
        assert_eq!(msg, "illegal move");
        let (ok, _) = e.execute("play", &["w", "Z99"]);
        assert!(!ok);
    }

    #[test]
    fn boardsize_accepts_only_compiled_size() {
        let mut e = engine();
        assert!(e.execute("boardsize", &[&N.to_string()]).0);
        assert!(!e.execute("boardsize", &["19"]).0);
    }

    #[test]
    fn komi_sign_convention() {
        let mut e = engine();
        e.execute("komi", &["6.5"]);
        let (ok, msg) = e.execute("final_score", &[]);
        assert!(ok);
        // empty board: white wins by exactly the komi
        assert_eq!(msg, "W+6.5");
    }

    #[test]
    fn clear_board_keeps_komi() {
        let mut e = engine();
        e.execute("komi", &["0.5"]);
        e.execute("play", &["b", "E5"]);
        e.execute("clear_board", &[]);
        let (_, msg) = e.execute("final_score", &[]);
        assert_eq!(msg, "W+0.5");
        let (ok, _) = e.execute("undo", &[]);
        assert!(!ok); // history gone after clear
    }

    #[test]
    fn genmove_plays_its_move() {
        let mut e = engine();
        let (ok, msg) = e.execute("genmove", &["b"]);
        assert!(ok);
        let v = Vertex::from_gtp(&msg).unwrap();
        assert!(v == Vertex::PASS || !e.board.try_play(Player::Black, v));
        // the vertex genmove reported is now occupied (or was a pass)
    }
}
