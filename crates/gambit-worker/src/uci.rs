//! UCI engine driver.
//!
//! [`UciEngine`] owns one engine conversation. Commands are written one
//! line at a time; replies are read line by line until the operation's
//! terminal marker shows up. Exactly one operation is in flight at a time,
//! which the `&mut self` receivers enforce.
//!
//! Every wait carries a deadline. A missed deadline, a closed output
//! stream or a structurally wrong reply surfaces as an [`EngineError`],
//! after which the conversation should be discarded.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, Command};
use tokio::time::Instant;

use crate::error::EngineError;
use crate::report::{self, SearchReport};

type EngineReader = Box<dyn AsyncRead + Send + Unpin>;
type EngineWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A live UCI engine conversation.
pub struct UciEngine {
    input: EngineWriter,
    output: Lines<BufReader<EngineReader>>,
    reply_timeout: Duration,
    child: Option<Child>,
}

impl std::fmt::Debug for UciEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UciEngine")
            .field("reply_timeout", &self.reply_timeout)
            .field("pid", &self.child.as_ref().and_then(Child::id))
            .finish_non_exhaustive()
    }
}

impl UciEngine {
    /// Spawn the engine at `path` and complete the UCI handshake.
    ///
    /// The subprocess is killed when the returned engine is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Spawn`] if the process cannot be started, or
    /// any handshake error.
    pub async fn spawn(path: &str, threads: u16, reply_timeout: Duration) -> Result<Self, EngineError> {
        let spawn_error = |source| EngineError::Spawn {
            path: path.to_owned(),
            source,
        };
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(spawn_error(std::io::Error::other("engine pipes unavailable")));
        };
        tracing::info!(path, pid = child.id(), "Engine spawned");

        let mut engine = Self::from_io(stdout, stdin, reply_timeout);
        engine.child = Some(child);
        engine.handshake(threads).await?;
        Ok(engine)
    }

    /// Drive an engine over arbitrary streams. No handshake is performed.
    pub fn from_io<R, W>(output: R, input: W, reply_timeout: Duration) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let output: EngineReader = Box::new(output);
        Self {
            input: Box::new(input),
            output: BufReader::new(output).lines(),
            reply_timeout,
            child: None,
        }
    }

    /// `uci` / `uciok`, set the thread count, then wait until ready.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the engine does not acknowledge.
    pub async fn handshake(&mut self, threads: u16) -> Result<(), EngineError> {
        self.send("uci").await?;
        self.read_until("uciok", |line| report::is_uciok(line).then_some(()))
            .await?;
        self.set_option("Threads", threads).await?;
        self.ready().await
    }

    /// Block until the engine has processed every command sent so far.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if `readyok` does not arrive.
    pub async fn ready(&mut self) -> Result<(), EngineError> {
        self.send("isready").await?;
        self.read_until("readyok", |line| report::is_readyok(line).then_some(()))
            .await
    }

    /// Write one command line.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Io`] if the pipe is closed.
    pub async fn send(&mut self, command: &str) -> Result<(), EngineError> {
        tracing::debug!(command, "engine <<");
        self.input.write_all(command.as_bytes()).await?;
        self.input.write_all(b"\n").await?;
        self.input.flush().await?;
        Ok(())
    }

    /// `setoption name <name> value <value>`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Io`] if the pipe is closed.
    pub async fn set_option(&mut self, name: &str, value: impl std::fmt::Display) -> Result<(), EngineError> {
        self.send(&format!("setoption name {name} value {value}")).await
    }

    /// Reset the board to the standard initial position.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Io`] if the pipe is closed.
    pub async fn set_startpos(&mut self) -> Result<(), EngineError> {
        self.send("position startpos").await
    }

    /// Set the board to `fen`, optionally followed by one move.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Io`] if the pipe is closed.
    pub async fn set_position(&mut self, fen: &str, then: Option<&str>) -> Result<(), EngineError> {
        match then {
            Some(mv) => self.send(&format!("position fen {fen} moves {mv}")).await,
            None => self.send(&format!("position fen {fen}")).await,
        }
    }

    /// Ask the engine to display its board and return the reported FEN.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if no `Fen:` line arrives.
    pub async fn current_fen(&mut self) -> Result<String, EngineError> {
        self.send("d").await?;
        let fen = self
            .read_until("Fen line", |line| report::parse_fen(line).map(str::to_owned))
            .await?;
        tracing::debug!(fen = %fen, "engine >>");
        Ok(fen)
    }

    /// Search the current position to `depth` with `multipv` variations.
    ///
    /// Output is drained up to `bestmove`. For every variation the first
    /// exact report at the target depth wins; variations that never reach
    /// it (terminal positions, shallow mates) fall back to their last
    /// exact report. Bound-only reports are skipped. Variations come back
    /// ordered by index; a position with fewer legal moves than `multipv`
    /// yields fewer variations.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if `bestmove` does not arrive.
    pub async fn search(&mut self, depth: u32, multipv: u8) -> Result<Vec<SearchReport>, EngineError> {
        self.send(&format!("go depth {depth}")).await?;

        let mut at_depth: BTreeMap<u8, SearchReport> = BTreeMap::new();
        let mut latest: BTreeMap<u8, SearchReport> = BTreeMap::new();
        self.read_until("bestmove", |line| {
            if report::is_bestmove(line) {
                return Some(());
            }
            if let Some(report) = report::parse_info(line) {
                if report.bound || report.multipv == 0 || report.multipv > multipv {
                    return None;
                }
                if report.depth == depth && !at_depth.contains_key(&report.multipv) {
                    tracing::debug!(line, "engine >>");
                    at_depth.insert(report.multipv, report.clone());
                }
                latest.insert(report.multipv, report);
            }
            None
        })
        .await?;

        Ok(latest
            .into_iter()
            .map(|(index, last)| at_depth.remove(&index).unwrap_or(last))
            .collect())
    }

    /// Ask the engine to quit and reap the subprocess.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.send("quit").await {
            tracing::debug!(error = %e, "Engine already gone");
        }
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                tracing::warn!(error = %e, "Failed to kill engine");
            }
        }
    }

    /// Read lines until `matcher` accepts one, within the reply timeout.
    async fn read_until<T>(
        &mut self,
        expected: &'static str,
        mut matcher: impl FnMut(&str) -> Option<T>,
    ) -> Result<T, EngineError> {
        let deadline = Instant::now()
            .checked_add(self.reply_timeout)
            .unwrap_or_else(Instant::now);

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let line = match tokio::time::timeout(remaining, self.output.next_line()).await {
                Ok(Ok(Some(line))) => line,
                Ok(Ok(None)) => return Err(EngineError::Exited { expected }),
                Ok(Err(e)) => return Err(EngineError::Io(e)),
                Err(_) => {
                    return Err(EngineError::ReplyTimeout {
                        expected,
                        waited: self.reply_timeout,
                    });
                }
            };
            tracing::trace!(line = %line, "engine >>");
            if let Some(found) = matcher(&line) {
                return Ok(found);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing, clippy::panic)]
mod tests {
    use gambit_types::Score;

    use super::*;
    use crate::fake_engine::FakeEngine;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn handshake_and_display() {
        let mut engine = FakeEngine::default().connect(TIMEOUT);
        assert!(engine.handshake(4).await.is_ok());

        assert!(engine.set_startpos().await.is_ok());
        let fen = engine.current_fen().await.ok();
        assert_eq!(fen.as_deref(), Some(gambit_types::START_FEN));
    }

    #[tokio::test]
    async fn search_picks_exact_reports_at_target_depth() {
        let mut engine = FakeEngine::default().connect(TIMEOUT);
        assert!(engine.set_option("MultiPV", 3).await.is_ok());
        assert!(engine.set_startpos().await.is_ok());

        let Ok(lines) = engine.search(20, 3).await else {
            panic!("search failed");
        };
        assert_eq!(lines.len(), 3);
        // The fake reports a bound at rank 1 first; it must be skipped.
        assert_eq!(lines[0].score, Score::centipawns(31));
        assert_eq!(lines[0].pv, ["e2e4", "e7e5", "g1f3"]);
        assert_eq!(lines[1].multipv, 2);
        assert_eq!(lines[2].multipv, 3);
        assert!(lines.iter().all(|l| l.depth == 20));
    }

    #[tokio::test]
    async fn terminal_position_falls_back_to_last_report() {
        let mut engine = FakeEngine::default().connect(TIMEOUT);
        assert!(engine.set_position(FakeEngine::MATED, None).await.is_ok());

        let Ok(lines) = engine.search(20, 1).await else {
            panic!("search failed");
        };
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].score, Score::mate(0));
        assert!(lines[0].pv.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_engine_times_out() {
        let mut engine = FakeEngine::default().connect(Duration::from_millis(50));
        assert!(engine.set_position(FakeEngine::HANGS, None).await.is_ok());

        let result = engine.search(20, 1).await;
        assert!(matches!(
            result,
            Err(EngineError::ReplyTimeout { expected: "bestmove", .. })
        ));
    }

    #[tokio::test]
    async fn dead_engine_is_reported() {
        let mut engine = FakeEngine::default().connect(TIMEOUT);
        assert!(engine.set_position(FakeEngine::CRASHES, None).await.is_ok());

        let result = engine.current_fen().await;
        assert!(matches!(result, Err(EngineError::Exited { .. })));
    }
}
