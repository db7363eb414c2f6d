//! Long-to-standard move notation.
//!
//! The engine and the queues only speak long algebraic notation (`e2e4`,
//! `e7e8q`). Clients want standard notation (`e4`, `e8=Q+`), which needs a
//! board to disambiguate, so moves are replayed on a scratch position.

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess};

/// Errors raised while converting notation.
#[derive(Debug, thiserror::Error)]
pub enum NotationError {
    /// The FEN could not be parsed or does not describe a legal position.
    #[error("invalid FEN {fen:?}: {reason}")]
    InvalidFen {
        /// The offending FEN.
        fen: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// A move is not syntactically valid long notation.
    #[error("invalid move {lan:?} at index {index}: {reason}")]
    InvalidMove {
        /// The offending move.
        lan: String,
        /// Index in the move list.
        index: usize,
        /// Parser diagnostic.
        reason: String,
    },

    /// A move is well-formed but illegal on the board it is played on.
    #[error("illegal move {lan:?} at index {index}: {reason}")]
    IllegalMove {
        /// The offending move.
        lan: String,
        /// Index in the move list.
        index: usize,
        /// Legality diagnostic.
        reason: String,
    },
}

/// Parse a FEN into a playable position.
///
/// # Errors
///
/// Returns [`NotationError::InvalidFen`] if the FEN is malformed or the
/// position it describes is not legal.
pub fn position_from_fen(fen: &str) -> Result<Chess, NotationError> {
    let invalid = |reason: String| NotationError::InvalidFen {
        fen: fen.to_owned(),
        reason,
    };
    let parsed = fen.parse::<Fen>().map_err(|e| invalid(e.to_string()))?;
    parsed
        .into_position(CastlingMode::Standard)
        .map_err(|e| invalid(e.to_string()))
}

/// Convert moves in long notation to standard notation, replaying them
/// from `fen`.
///
/// # Errors
///
/// Returns [`NotationError`] if the FEN is invalid or any move is
/// malformed or illegal in sequence.
pub fn lan_to_san<S: AsRef<str>>(fen: &str, lans: &[S]) -> Result<Vec<String>, NotationError> {
    replay(position_from_fen(fen)?, lans)
}

/// Convert moves in long notation to standard notation, replaying them
/// from the standard initial position.
///
/// # Errors
///
/// Returns [`NotationError`] if any move is malformed or illegal in
/// sequence.
pub fn lan_to_san_from_start<S: AsRef<str>>(lans: &[S]) -> Result<Vec<String>, NotationError> {
    replay(Chess::default(), lans)
}

fn replay<S: AsRef<str>>(mut position: Chess, lans: &[S]) -> Result<Vec<String>, NotationError> {
    let mut sans = Vec::with_capacity(lans.len());

    for (index, lan) in lans.iter().enumerate() {
        let lan = lan.as_ref();
        let uci = lan
            .parse::<UciMove>()
            .map_err(|e| NotationError::InvalidMove {
                lan: lan.to_owned(),
                index,
                reason: e.to_string(),
            })?;
        let m = uci
            .to_move(&position)
            .map_err(|e| NotationError::IllegalMove {
                lan: lan.to_owned(),
                index,
                reason: e.to_string(),
            })?;
        sans.push(SanPlus::from_move_and_play_unchecked(&mut position, &m).to_string());
    }

    Ok(sans)
}

#[cfg(test)]
mod tests {
    use gambit_types::START_FEN;

    use super::*;

    #[test]
    fn opening_moves_convert() {
        let sans = lan_to_san_from_start(&["e2e4", "e7e5", "g1f3", "b8c6", "f1b5"]);
        assert_eq!(
            sans.ok(),
            Some(vec![
                "e4".to_owned(),
                "e5".to_owned(),
                "Nf3".to_owned(),
                "Nc6".to_owned(),
                "Bb5".to_owned(),
            ])
        );
    }

    #[test]
    fn replays_from_given_fen() {
        let fen = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2";
        let sans = lan_to_san(fen, &["g1f3", "b8c6"]);
        assert_eq!(sans.ok(), Some(vec!["Nf3".to_owned(), "Nc6".to_owned()]));
    }

    #[test]
    fn check_and_mate_suffixes_are_kept() {
        // Fool's mate.
        let sans = lan_to_san(START_FEN, &["f2f3", "e7e5", "g2g4", "d8h4"]);
        assert_eq!(
            sans.ok().and_then(|s| s.last().cloned()),
            Some("Qh4#".to_owned())
        );
    }

    #[test]
    fn castling_converts() {
        let fen = "r3k2r/pppqbppp/2np1n2/4p1B1/2B1P1b1/2NP1N2/PPPQ1PPP/R3K2R w KQkq - 6 8";
        let sans = lan_to_san(fen, &["e1g1", "e8c8"]);
        assert_eq!(sans.ok(), Some(vec!["O-O".to_owned(), "O-O-O".to_owned()]));
    }

    #[test]
    fn promotion_converts() {
        let fen = "8/4P3/8/8/8/8/k7/7K w - - 0 1";
        let sans = lan_to_san(fen, &["e7e8q"]);
        assert_eq!(sans.ok(), Some(vec!["e8=Q".to_owned()]));
    }

    #[test]
    fn illegal_move_reports_index() {
        let result = lan_to_san_from_start(&["e2e4", "e2e4"]);
        assert!(matches!(
            result,
            Err(NotationError::IllegalMove { index: 1, .. })
        ));
    }

    #[test]
    fn garbage_move_is_invalid() {
        let result = lan_to_san_from_start(&["castle"]);
        assert!(matches!(result, Err(NotationError::InvalidMove { index: 0, .. })));
    }

    #[test]
    fn garbage_fen_is_rejected() {
        let result = lan_to_san("not a fen", &["e2e4"]);
        assert!(matches!(result, Err(NotationError::InvalidFen { .. })));
    }

    #[test]
    fn empty_list_is_empty() {
        assert_eq!(lan_to_san(START_FEN, &[] as &[&str]).ok(), Some(Vec::new()));
    }
}
