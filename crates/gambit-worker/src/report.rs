//! Parsing of the engine's line-oriented output.
//!
//! Only three shapes matter to the worker:
//!
//! - `Fen: <fen>` from the `d` display command,
//! - `info depth N ... multipv K score cp|mate V ... pv m1 m2 ...` search reports,
//! - `bestmove ...`, which terminates a search.
//!
//! Everything else the engine prints is ignored.

use gambit_types::{Score, ScoreUnit};

/// One scored `info` report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchReport {
    /// Search depth the report belongs to.
    pub depth: u32,
    /// 1-based variation index (1 when the engine omits it).
    pub multipv: u8,
    /// Evaluation from the side to move.
    pub score: Score,
    /// Whether the score is only a bound.
    pub bound: bool,
    /// Principal variation in long notation.
    pub pv: Vec<String>,
}

/// Extract the FEN from a board display line.
pub fn parse_fen(line: &str) -> Option<&str> {
    let fen = line.trim_start().strip_prefix("Fen:")?.trim();
    (!fen.is_empty()).then_some(fen)
}

/// Whether `line` ends a search.
pub fn is_bestmove(line: &str) -> bool {
    line.split_whitespace().next() == Some("bestmove")
}

/// Whether `line` acknowledges the `uci` command.
pub fn is_uciok(line: &str) -> bool {
    line.trim() == "uciok"
}

/// Whether `line` acknowledges the `isready` command.
pub fn is_readyok(line: &str) -> bool {
    line.trim() == "readyok"
}

/// Parse a scored `info` report. Reports without a depth or a score
/// (`currmove`, `string`, hash-full updates) yield `None`.
pub fn parse_info(line: &str) -> Option<SearchReport> {
    let mut tokens = line.split_whitespace();
    if tokens.next()? != "info" {
        return None;
    }

    let mut depth = None;
    let mut multipv = 1;
    let mut score = None;
    let mut bound = false;
    let mut pv = Vec::new();

    while let Some(token) = tokens.next() {
        match token {
            "depth" => depth = Some(tokens.next()?.parse().ok()?),
            "multipv" => multipv = tokens.next()?.parse().ok()?,
            "score" => {
                let unit = ScoreUnit::from_token(tokens.next()?)?;
                let value = tokens.next()?.parse().ok()?;
                score = Some(Score { unit, value });
            }
            "lowerbound" | "upperbound" => bound = true,
            "pv" => {
                pv = tokens.by_ref().map(str::to_owned).collect();
            }
            // Free text runs to the end of the line.
            "string" => return None,
            _ => {}
        }
    }

    Some(SearchReport {
        depth: depth?,
        multipv,
        score: score?,
        bound,
        pv,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fen_line_from_display() {
        assert_eq!(
            parse_fen("Fen: rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
            Some("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
        );
        assert_eq!(parse_fen("Key: 8F8F01D4562F59FB"), None);
        assert_eq!(parse_fen("Fen:"), None);
    }

    #[test]
    fn full_multipv_report() {
        let line = "info depth 20 seldepth 27 multipv 2 score cp -31 nodes 2841922 \
                    nps 1421000 hashfull 701 tbhits 0 time 2000 pv e7e5 g1f3 b8c6";
        assert_eq!(
            parse_info(line),
            Some(SearchReport {
                depth: 20,
                multipv: 2,
                score: Score::centipawns(-31),
                bound: false,
                pv: vec!["e7e5".to_owned(), "g1f3".to_owned(), "b8c6".to_owned()],
            })
        );
    }

    #[test]
    fn mate_score_without_multipv() {
        let report = parse_info("info depth 12 seldepth 4 score mate -2 nodes 900 pv h5f7");
        assert_eq!(report.as_ref().map(|r| r.score), Some(Score::mate(-2)));
        assert_eq!(report.map(|r| r.multipv), Some(1));
    }

    #[test]
    fn terminal_report_has_no_pv() {
        let report = parse_info("info depth 0 score mate 0");
        assert_eq!(report.as_ref().map(|r| r.depth), Some(0));
        assert_eq!(report.map(|r| r.pv), Some(Vec::new()));
    }

    #[test]
    fn bounds_are_flagged() {
        let report = parse_info("info depth 20 seldepth 25 multipv 1 score cp 44 lowerbound nodes 1 pv e2e4");
        assert_eq!(report.map(|r| r.bound), Some(true));
    }

    #[test]
    fn unscored_lines_are_ignored() {
        assert_eq!(parse_info("info depth 3 currmove e2e4 currmovenumber 1"), None);
        assert_eq!(parse_info("info string NNUE evaluation using nn-1111.nnue"), None);
        assert_eq!(parse_info("bestmove e2e4 ponder e7e5"), None);
        assert_eq!(parse_info("info depth x score cp 1"), None);
    }

    #[test]
    fn terminators() {
        assert!(is_bestmove("bestmove e2e4 ponder e7e5"));
        assert!(is_bestmove("bestmove (none)"));
        assert!(!is_bestmove("info depth 1 pv bestmove"));
        assert!(is_uciok("uciok"));
        assert!(is_readyok("readyok\r"));
    }
}
