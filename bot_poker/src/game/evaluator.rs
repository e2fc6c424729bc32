//! Best-five hand evaluation.
//!
//! The evaluator is stateless and safe to call from any worker. Given a
//! seat's hole cards plus the community cards it scores every 5-card subset
//! and keeps the maximum, so callers never need to pick the subset
//! themselves.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::entities::{Card, Suit, VALUE_ACE, Value};

#[derive(Debug, Error, Eq, PartialEq)]
pub enum EvaluatorError {
    #[error("not enough cards to evaluate: need 5, got {got}")]
    NotEnoughCards { got: usize },
}

/// Hand categories from weakest to strongest. Deriving `Ord` on the
/// declaration order gives the standard poker ranking.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum HandCategory {
    HighCard,
    OnePair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
    RoyalFlush,
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::HighCard => "high card",
            Self::OnePair => "one pair",
            Self::TwoPair => "two pair",
            Self::ThreeOfAKind => "three of a kind",
            Self::Straight => "straight",
            Self::Flush => "flush",
            Self::FullHouse => "full house",
            Self::FourOfAKind => "four of a kind",
            Self::StraightFlush => "straight flush",
            Self::RoyalFlush => "royal flush",
        };
        write!(f, "{repr}")
    }
}

/// A fully ordered hand strength: category first, then tiebreak values in
/// significance order (pairs before kickers, high pair before low pair).
/// `a > b` iff hand `a` wins; equal ranks split.
#[derive(Clone, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct HandRank {
    pub category: HandCategory,
    pub tiebreak: Vec<Value>,
}

impl fmt::Display for HandRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.category)
    }
}

/// Evaluate the best 5-card hand from hole plus community cards.
///
/// # Errors
///
/// Fails with [`EvaluatorError::NotEnoughCards`] when fewer than 5 cards
/// are supplied in total.
pub fn evaluate(hole: &[Card], community: &[Card]) -> Result<HandRank, EvaluatorError> {
    let cards: Vec<Card> = hole.iter().chain(community.iter()).copied().collect();
    if cards.len() < 5 {
        return Err(EvaluatorError::NotEnoughCards { got: cards.len() });
    }
    let mut best: Option<HandRank> = None;
    let mut combo = [0usize; 5];
    for_each_combination(cards.len(), &mut combo, 0, 0, &mut |idxs| {
        let five = [
            cards[idxs[0]],
            cards[idxs[1]],
            cards[idxs[2]],
            cards[idxs[3]],
            cards[idxs[4]],
        ];
        let rank = rank_five(&five);
        if best.as_ref().is_none_or(|b| rank > *b) {
            best = Some(rank);
        }
    });
    // len >= 5 guarantees at least one combination was visited
    Ok(best.expect("at least one 5-card subset"))
}

/// Visit every `C(n, 5)` index combination.
fn for_each_combination(
    n: usize,
    combo: &mut [usize; 5],
    depth: usize,
    start: usize,
    visit: &mut impl FnMut(&[usize; 5]),
) {
    if depth == 5 {
        visit(combo);
        return;
    }
    for i in start..n {
        combo[depth] = i;
        for_each_combination(n, combo, depth + 1, i + 1, visit);
    }
}

/// Score exactly five cards.
#[must_use]
pub fn rank_five(cards: &[Card; 5]) -> HandRank {
    let mut values: Vec<Value> = cards.iter().map(|c| c.0).collect();
    values.sort_unstable_by(|a, b| b.cmp(a));

    let is_flush = cards.iter().all(|c| c.1 == cards[0].1);
    let straight_top = straight_top(&values);

    if let Some(top) = straight_top
        && is_flush
    {
        return if top == VALUE_ACE {
            HandRank {
                category: HandCategory::RoyalFlush,
                tiebreak: vec![],
            }
        } else {
            HandRank {
                category: HandCategory::StraightFlush,
                tiebreak: vec![top],
            }
        };
    }

    // Group values by multiplicity: highest count first, ties broken by
    // value, so the groups read off in significance order.
    let mut groups: Vec<(usize, Value)> = Vec::with_capacity(5);
    for &v in &values {
        match groups.iter_mut().find(|(_, gv)| *gv == v) {
            Some((count, _)) => *count += 1,
            None => groups.push((1, v)),
        }
    }
    groups.sort_unstable_by(|a, b| b.cmp(a));
    let shape: Vec<usize> = groups.iter().map(|(count, _)| *count).collect();
    let ordered: Vec<Value> = groups.iter().map(|(_, v)| *v).collect();

    match shape.as_slice() {
        [4, 1] => HandRank {
            category: HandCategory::FourOfAKind,
            tiebreak: ordered,
        },
        [3, 2] => HandRank {
            category: HandCategory::FullHouse,
            tiebreak: ordered,
        },
        [3, 1, 1] => HandRank {
            category: HandCategory::ThreeOfAKind,
            tiebreak: ordered,
        },
        [2, 2, 1] => HandRank {
            category: HandCategory::TwoPair,
            tiebreak: ordered,
        },
        [2, 1, 1, 1] => HandRank {
            category: HandCategory::OnePair,
            tiebreak: ordered,
        },
        _ => {
            if is_flush {
                HandRank {
                    category: HandCategory::Flush,
                    tiebreak: values,
                }
            } else if let Some(top) = straight_top {
                HandRank {
                    category: HandCategory::Straight,
                    tiebreak: vec![top],
                }
            } else {
                HandRank {
                    category: HandCategory::HighCard,
                    tiebreak: values,
                }
            }
        }
    }
}

/// Top rank of a straight formed by `values` (sorted descending), if any.
/// The wheel A-2-3-4-5 counts the ace low and tops out at 5.
fn straight_top(values: &[Value]) -> Option<Value> {
    let mut distinct = values.to_vec();
    distinct.dedup();
    if distinct.len() != 5 {
        return None;
    }
    if distinct[0] - distinct[4] == 4 {
        return Some(distinct[0]);
    }
    if distinct == [14, 5, 4, 3, 2] {
        return Some(5);
    }
    None
}

/// Convenience for pretty card lists in logs.
#[must_use]
pub fn describe(cards: &[Card]) -> String {
    cards
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(value: Value, suit: Suit) -> Card {
        Card(value, suit)
    }

    #[test]
    fn royal_flush_tops_everything() {
        let royal = rank_five(&[
            c(14, Suit::Spade),
            c(13, Suit::Spade),
            c(12, Suit::Spade),
            c(11, Suit::Spade),
            c(10, Suit::Spade),
        ]);
        assert_eq!(royal.category, HandCategory::RoyalFlush);

        let quads = rank_five(&[
            c(14, Suit::Club),
            c(14, Suit::Diamond),
            c(14, Suit::Heart),
            c(14, Suit::Spade),
            c(13, Suit::Club),
        ]);
        assert!(royal > quads);
    }

    #[test]
    fn wheel_is_a_five_high_straight() {
        let wheel = rank_five(&[
            c(14, Suit::Club),
            c(2, Suit::Diamond),
            c(3, Suit::Heart),
            c(4, Suit::Spade),
            c(5, Suit::Club),
        ]);
        assert_eq!(wheel.category, HandCategory::Straight);
        assert_eq!(wheel.tiebreak, vec![5]);

        let six_high = rank_five(&[
            c(2, Suit::Club),
            c(3, Suit::Diamond),
            c(4, Suit::Heart),
            c(5, Suit::Spade),
            c(6, Suit::Club),
        ]);
        assert!(six_high > wheel);

        let trips = rank_five(&[
            c(14, Suit::Club),
            c(14, Suit::Diamond),
            c(14, Suit::Heart),
            c(9, Suit::Spade),
            c(5, Suit::Club),
        ]);
        assert!(wheel > trips);
    }

    #[test]
    fn ace_high_straight_is_not_royal_without_flush() {
        let broadway = rank_five(&[
            c(14, Suit::Club),
            c(13, Suit::Diamond),
            c(12, Suit::Heart),
            c(11, Suit::Spade),
            c(10, Suit::Club),
        ]);
        assert_eq!(broadway.category, HandCategory::Straight);
        assert_eq!(broadway.tiebreak, vec![14]);
    }

    #[test]
    fn kickers_break_pair_ties() {
        let aces_king = rank_five(&[
            c(14, Suit::Club),
            c(14, Suit::Diamond),
            c(13, Suit::Heart),
            c(7, Suit::Spade),
            c(3, Suit::Club),
        ]);
        let aces_queen = rank_five(&[
            c(14, Suit::Heart),
            c(14, Suit::Spade),
            c(12, Suit::Heart),
            c(7, Suit::Club),
            c(3, Suit::Diamond),
        ]);
        assert!(aces_king > aces_queen);
    }

    #[test]
    fn two_pair_orders_high_pair_first() {
        let kings_twos = rank_five(&[
            c(13, Suit::Club),
            c(13, Suit::Diamond),
            c(2, Suit::Heart),
            c(2, Suit::Spade),
            c(7, Suit::Club),
        ]);
        let queens_jacks = rank_five(&[
            c(12, Suit::Club),
            c(12, Suit::Diamond),
            c(11, Suit::Heart),
            c(11, Suit::Spade),
            c(14, Suit::Club),
        ]);
        assert!(kings_twos > queens_jacks);
    }

    #[test]
    fn full_house_compares_trips_before_pair() {
        let nines_full = rank_five(&[
            c(9, Suit::Club),
            c(9, Suit::Diamond),
            c(9, Suit::Heart),
            c(2, Suit::Spade),
            c(2, Suit::Club),
        ]);
        let eights_full = rank_five(&[
            c(8, Suit::Club),
            c(8, Suit::Diamond),
            c(8, Suit::Heart),
            c(14, Suit::Spade),
            c(14, Suit::Club),
        ]);
        assert!(nines_full > eights_full);
    }

    #[test]
    fn identical_ranks_tie() {
        let a = rank_five(&[
            c(10, Suit::Club),
            c(10, Suit::Diamond),
            c(8, Suit::Heart),
            c(6, Suit::Spade),
            c(4, Suit::Club),
        ]);
        let b = rank_five(&[
            c(10, Suit::Heart),
            c(10, Suit::Spade),
            c(8, Suit::Club),
            c(6, Suit::Diamond),
            c(4, Suit::Spade),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    fn evaluate_picks_best_subset_of_seven() {
        // Board has a flush, hole cards upgrade it to a straight flush.
        let hole = [c(9, Suit::Heart), c(8, Suit::Heart)];
        let community = [
            c(7, Suit::Heart),
            c(6, Suit::Heart),
            c(5, Suit::Heart),
            c(14, Suit::Spade),
            c(14, Suit::Club),
        ];
        let rank = evaluate(&hole, &community).unwrap();
        assert_eq!(rank.category, HandCategory::StraightFlush);
        assert_eq!(rank.tiebreak, vec![9]);
    }

    #[test]
    fn evaluate_requires_five_cards() {
        let hole = [c(9, Suit::Heart), c(8, Suit::Heart)];
        let community = [c(7, Suit::Heart), c(6, Suit::Heart)];
        let err = evaluate(&hole, &community).unwrap_err();
        assert_eq!(err, EvaluatorError::NotEnoughCards { got: 4 });
    }

    #[test]
    fn evaluate_works_with_exactly_five() {
        let hole = [c(2, Suit::Club), c(3, Suit::Diamond)];
        let community = [c(9, Suit::Heart), c(9, Suit::Spade), c(13, Suit::Club)];
        let rank = evaluate(&hole, &community).unwrap();
        assert_eq!(rank.category, HandCategory::OnePair);
        assert_eq!(rank.tiebreak, vec![9, 13, 3, 2]);
    }
}
