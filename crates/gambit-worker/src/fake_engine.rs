//! Scripted UCI engine for tests.
//!
//! Speaks just enough UCI over an in-memory duplex stream to exercise the
//! driver and the handlers. Positions are synthetic: starting from the
//! standard FEN, every applied move appends ` +<move>`, so the reply to
//! `d` is a deterministic function of the move history. Single-variation
//! searches score a position by the number of moves applied to it.
//!
//! A few magic positions change behavior: [`FakeEngine::MATED`] has no
//! legal moves, [`FakeEngine::HANGS`] never answers `go`, and
//! [`FakeEngine::CRASHES`] closes the stream on the next query.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use gambit_types::START_FEN;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

use crate::uci::UciEngine;

/// Multi-variation script: principal variation and score per rank.
const VARIATIONS: [(&str, i32); 3] = [("e2e4 e7e5 g1f3", 31), ("d2d4 d7d5", 24), ("c2c4", 12)];

/// A fake engine. Clones share the command log.
#[derive(Debug, Clone, Default)]
pub struct FakeEngine {
    commands: Arc<Mutex<Vec<String>>>,
}

impl FakeEngine {
    /// Checkmated position: searches report `mate 0` at depth 0 only.
    pub const MATED: &'static str = "mated";
    /// Position on which `go` is never answered.
    pub const HANGS: &'static str = "hangs";
    /// Position on which the engine closes its output.
    pub const CRASHES: &'static str = "crashes";

    /// Start serving a new conversation and return the driver for it.
    pub fn connect(&self, reply_timeout: Duration) -> UciEngine {
        let (driver_side, engine_side) = tokio::io::duplex(65_536);
        let (output, input) = tokio::io::split(driver_side);
        tokio::spawn(self.clone().serve(engine_side));
        UciEngine::from_io(output, input, reply_timeout)
    }

    /// Every command received so far, across all conversations.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().map(|c| c.clone()).unwrap_or_default()
    }

    async fn serve(self, stream: DuplexStream) {
        let (read, mut write) = tokio::io::split(stream);
        let mut lines = BufReader::new(read).lines();
        let mut fen = START_FEN.to_owned();
        let mut multipv: usize = 1;

        while let Ok(Some(command)) = lines.next_line().await {
            if let Ok(mut log) = self.commands.lock() {
                log.push(command.clone());
            }

            let replies: Vec<String> = match command.as_str() {
                "uci" => vec!["id name FakeFish".to_owned(), "uciok".to_owned()],
                "isready" => vec!["readyok".to_owned()],
                "quit" => return,
                query if fen == Self::CRASHES && !query.starts_with("position") => return,
                "d" => vec![
                    " +---+---+---+---+---+---+---+---+".to_owned(),
                    format!("Fen: {fen}"),
                    "Key: 8F8F01D4562F59FB".to_owned(),
                    "Checkers: ".to_owned(),
                ],
                "position startpos" => {
                    START_FEN.clone_into(&mut fen);
                    Vec::new()
                }
                other => {
                    if let Some(value) = other.strip_prefix("setoption name MultiPV value ") {
                        multipv = value.parse().unwrap_or(1);
                    } else if let Some(rest) = other.strip_prefix("position fen ") {
                        fen = match rest.rsplit_once(" moves ") {
                            Some((base, mv)) => format!("{base} +{mv}"),
                            None => rest.to_owned(),
                        };
                    }
                    other
                        .strip_prefix("go depth ")
                        .map(|depth| search(&fen, depth, multipv))
                        .unwrap_or_default()
                }
            };

            for reply in replies {
                if write.write_all(format!("{reply}\n").as_bytes()).await.is_err() {
                    return;
                }
            }
        }
    }
}

fn search(fen: &str, depth: &str, multipv: usize) -> Vec<String> {
    if fen == FakeEngine::HANGS {
        return Vec::new();
    }
    if fen == FakeEngine::MATED {
        return vec!["info depth 0 score mate 0".to_owned(), "bestmove (none)".to_owned()];
    }

    let mut out = vec![
        "info string NNUE evaluation enabled".to_owned(),
        "info depth 1 seldepth 1 multipv 1 score cp 3 nodes 20 pv a2a3".to_owned(),
        format!("info depth {depth} seldepth {depth} multipv 1 score cp 999 upperbound nodes 400 pv a2a3"),
    ];
    if multipv > 1 {
        for (rank, (pv, score)) in (1_u8..).zip(VARIATIONS.iter().take(multipv)) {
            out.push(format!(
                "info depth {depth} seldepth {depth} multipv {rank} score cp {score} nodes 1000 pv {pv}"
            ));
        }
    } else {
        let applied = fen.matches(" +").count();
        out.push(format!(
            "info depth {depth} seldepth {depth} multipv 1 score cp {applied} nodes 1000 pv h2h3"
        ));
    }
    out.push(format!("info depth {depth} currmove e2e4 currmovenumber 1"));
    out.push("bestmove e2e4 ponder e7e5".to_owned());
    out
}
