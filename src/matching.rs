//! Track normalization and fuzzy match scoring.
//!
//! Scores are computed on normalized copies of the title and the joined
//! artist names; stored [`Track`] fields are never touched. Each side is
//! compared with the bigram Dice coefficient from `strsim`, and the combined
//! score weighs the title at 0.6 and the artists at 0.4.

use serde::{Deserialize, Serialize};
use strsim::sorensen_dice;

use crate::models::{Artist, Candidate, Track};

/// Weight of the title similarity in the combined score.
pub const NAME_WEIGHT: f64 = 0.6;

/// Weight of the artist similarity in the combined score.
pub const ARTIST_WEIGHT: f64 = 0.4;

/// Canonicalize free text for comparison.
///
/// Lower-cases, drops everything that is not an ASCII word character
/// (`[A-Za-z0-9_]`) or whitespace, collapses whitespace runs and trims.
/// Accented letters are dropped, not folded: `"Beyoncé"` becomes `"beyonc"`.
/// Idempotent.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let kept: String = lowered
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized form of an artist list, joined by a single space in order.
pub fn normalize_artists(artists: &[Artist]) -> String {
    normalize(
        &artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(" "),
    )
}

/// Similarity between a source track and a destination candidate, in [0, 1].
pub fn score(source: &Track, candidate: &Candidate) -> f64 {
    let name_score = sorensen_dice(&normalize(&source.name), &normalize(&candidate.name));
    let artist_score = sorensen_dice(
        &normalize_artists(&source.artists),
        &normalize_artists(&candidate.artists),
    );

    (NAME_WEIGHT * name_score + ARTIST_WEIGHT * artist_score).clamp(0.0, 1.0)
}

/// How to pick among several acceptable candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidatePolicy {
    /// Take the first candidate, in search order, that meets the threshold.
    #[default]
    FirstAcceptable,
    /// Score every candidate and take the highest one that meets the threshold.
    /// Ties go to the earlier candidate.
    BestScore,
}

/// Pick a candidate for `source` under `policy`, returning it with its score.
pub fn select_candidate<'a>(
    source: &Track,
    candidates: &'a [Candidate],
    threshold: f64,
    policy: CandidatePolicy,
) -> Option<(&'a Candidate, f64)> {
    let mut scored = candidates.iter().map(|c| (c, score(source, c)));

    match policy {
        CandidatePolicy::FirstAcceptable => scored.find(|(_, s)| *s >= threshold),
        CandidatePolicy::BestScore => scored
            .filter(|(_, s)| *s >= threshold)
            .fold(None, |best: Option<(&Candidate, f64)>, (c, s)| match best {
                Some((_, best_score)) if best_score >= s => best,
                _ => Some((c, s)),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(reference: &str, name: &str, artist: &str) -> Candidate {
        Candidate::new(reference, name, artist)
    }

    #[test]
    fn test_normalize_strips_case_and_punctuation() {
        assert_eq!(normalize("Hello, World!"), normalize("hello world"));
        assert_eq!(normalize("  Don't   Stop\tMe Now "), "dont stop me now");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in ["Hello, World!", "AC/DC — Back In Black", "  Beyoncé  ", "", "___"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_normalize_drops_non_ascii_letters() {
        assert_eq!(normalize("Beyoncé"), "beyonc");
        assert_eq!(normalize("Sigur Rós - Hoppípolla"), "sigur rs hoppplla");
        assert_eq!(normalize("snake_case"), "snake_case");
    }

    #[test]
    fn test_score_is_symmetric() {
        let pairs = [
            ("Night", "Nacht", "Band", "Bands"),
            ("Let It Be", "Let It Bleed", "The Beatles", "The Rolling Stones"),
        ];
        for (a_name, b_name, a_artist, b_artist) in pairs {
            let a = Track::new("a", a_name).with_artist(a_artist);
            let b = Track::new("b", b_name).with_artist(b_artist);
            let forward = score(&a, &candidate("b", b_name, b_artist));
            let backward = score(&b, &candidate("a", a_name, a_artist));
            assert!((forward - backward).abs() < 1e-12);
        }
    }

    #[test]
    fn test_whitespace_does_not_count_toward_bigrams() {
        // "thebeatles" has 9 bigrams, "beatles" 6, sharing 6.
        let track = Track::new("1", "The Beatles").with_artist("x");
        let s = score(&track, &candidate("c", "Beatles", "x"));
        assert!((s - (0.6 * 0.8 + 0.4)).abs() < 1e-9);
    }

    #[test]
    fn test_score_bounds() {
        let track = Track::new("1", "Yesterday").with_artist("The Beatles");
        assert_eq!(score(&track, &candidate("x", "yesterday", "the beatles!")), 1.0);
        assert_eq!(score(&track, &candidate("y", "Qwz", "Kpf")), 0.0);

        let partial = score(&track, &candidate("z", "Yesterday", "Beatles"));
        assert!(partial > 0.0 && partial < 1.0);
        assert!((partial - (0.6 + 0.4 * 0.8)).abs() < 1e-9);
    }

    #[test]
    fn test_score_joins_artists_in_order() {
        let track = Track::new("1", "Under Pressure")
            .with_artist("Queen")
            .with_artist("David Bowie");
        let cand = Candidate {
            artists: vec![Artist::new("Queen"), Artist::new("David Bowie")],
            ..candidate("x", "Under Pressure", "")
        };
        assert_eq!(score(&track, &cand), 1.0);
    }

    #[test]
    fn test_first_acceptable_takes_earliest() {
        let track = Track::new("1", "Yesterday").with_artist("The Beatles");
        let candidates = vec![
            candidate("a", "Yesterday", "Beatles"),
            candidate("b", "Yesterday", "The Beatles"),
        ];

        let (picked, _) =
            select_candidate(&track, &candidates, 0.8, CandidatePolicy::FirstAcceptable).unwrap();
        assert_eq!(picked.reference.as_str(), "a");

        let (best, best_score) =
            select_candidate(&track, &candidates, 0.8, CandidatePolicy::BestScore).unwrap();
        assert_eq!(best.reference.as_str(), "b");
        assert_eq!(best_score, 1.0);
    }

    #[test]
    fn test_select_none_below_threshold() {
        let track = Track::new("1", "Yesterday").with_artist("The Beatles");
        let candidates = vec![candidate("a", "Tomorrow", "Someone Else")];
        assert!(select_candidate(&track, &candidates, 0.8, CandidatePolicy::FirstAcceptable).is_none());
        assert!(select_candidate(&track, &[], 0.0, CandidatePolicy::BestScore).is_none());
    }
}
