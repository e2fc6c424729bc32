//! Per-hand chip tracking and side-pot construction.
//!
//! One `PotManager` is owned by exactly one engine. During a betting round
//! it keeps a running main pot; at showdown the layered layout is rebuilt
//! from each seat's total contribution, which is the authoritative record.

use std::collections::HashMap;

use super::entities::{Chips, Player, PlayerId, Pot};
use super::evaluator::HandRank;

/// Chips handed to one player out of one pot layer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PotAward {
    pub player_id: PlayerId,
    pub amount: Chips,
    pub pot_index: usize,
}

#[derive(Debug)]
pub struct PotManager {
    pots: Vec<Pot>,
    contributions: HashMap<PlayerId, Chips>,
}

impl Default for PotManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PotManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pots: vec![Pot {
                amount: 0,
                eligible: Vec::new(),
                is_side: false,
            }],
            contributions: HashMap::new(),
        }
    }

    /// Clear all contributions and start over with a single empty main pot.
    pub fn reset(&mut self) {
        self.pots.clear();
        self.pots.push(Pot {
            amount: 0,
            eligible: Vec::new(),
            is_side: false,
        });
        self.contributions.clear();
    }

    /// Record chips a player just committed. The running amount lands in
    /// the main pot; layering happens in [`Self::create_side_pots`].
    pub fn add_bet(&mut self, player_id: PlayerId, amount: Chips) {
        *self.contributions.entry(player_id).or_default() += amount;
        let main = &mut self.pots[0];
        main.amount += amount;
        if !main.eligible.contains(&player_id) {
            main.eligible.push(player_id);
        }
    }

    #[must_use]
    pub fn pots(&self) -> &[Pot] {
        &self.pots
    }

    #[must_use]
    pub fn total(&self) -> Chips {
        self.pots.iter().map(|p| p.amount).sum()
    }

    #[must_use]
    pub fn contribution(&self, player_id: PlayerId) -> Chips {
        self.contributions.get(&player_id).copied().unwrap_or(0)
    }

    /// Rebuild the pot list from every seat's `total_bet_this_hand`.
    ///
    /// Each distinct positive contribution level forms one layer: the layer
    /// at level `L` collects `L - L_prev` chips from every seat that put in
    /// at least `L`, folded seats included. Only non-folded seats are
    /// eligible to win a layer. Index 0 is the main pot.
    pub fn create_side_pots(&mut self, seats: &[Player]) {
        let mut levels: Vec<Chips> = seats
            .iter()
            .map(|p| p.total_bet_this_hand)
            .filter(|&total| total > 0)
            .collect();
        levels.sort_unstable();
        levels.dedup();

        self.pots.clear();
        if levels.is_empty() {
            self.pots.push(Pot {
                amount: 0,
                eligible: Vec::new(),
                is_side: false,
            });
            return;
        }

        let mut previous = 0;
        for (i, &level) in levels.iter().enumerate() {
            let slice = level - previous;
            let amount = slice
                * seats
                    .iter()
                    .filter(|p| p.total_bet_this_hand >= level)
                    .count() as Chips;
            let eligible: Vec<PlayerId> = seats
                .iter()
                .filter(|p| !p.is_folded && p.total_bet_this_hand >= level)
                .map(|p| p.id)
                .collect();
            self.pots.push(Pot {
                amount,
                eligible,
                is_side: i > 0,
            });
            previous = level;
        }
    }

    /// Award every pot, lowest layer first.
    ///
    /// In each layer the eligible seats holding the strictly best rank
    /// split the chips by integer division; the leftover goes to the tied
    /// winner sitting farthest clockwise from the dealer. Layers whose
    /// eligible seats have no ranking (everyone else folded before
    /// showdown) go to their lone eligible seat, or are split evenly.
    #[must_use]
    pub fn distribute_pots(
        &self,
        rankings: &HashMap<PlayerId, HandRank>,
        clockwise_distance: &HashMap<PlayerId, usize>,
    ) -> Vec<PotAward> {
        let mut awards = Vec::new();
        for (pot_index, pot) in self.pots.iter().enumerate() {
            if pot.amount == 0 || pot.eligible.is_empty() {
                continue;
            }

            let best = pot
                .eligible
                .iter()
                .filter_map(|id| rankings.get(id))
                .max()
                .cloned();
            let winners: Vec<PlayerId> = match best {
                Some(best) => pot
                    .eligible
                    .iter()
                    .filter(|id| rankings.get(id) == Some(&best))
                    .copied()
                    .collect(),
                // No evaluations for this layer: uncontested or split.
                None => pot.eligible.clone(),
            };

            let share = pot.amount / winners.len() as Chips;
            let remainder = pot.amount % winners.len() as Chips;
            let odd_chip_winner = winners
                .iter()
                .max_by_key(|id| clockwise_distance.get(id).copied().unwrap_or(0))
                .copied();
            for &winner in &winners {
                let mut amount = share;
                if remainder > 0 && Some(winner) == odd_chip_winner {
                    amount += remainder;
                }
                if amount > 0 {
                    awards.push(PotAward {
                        player_id: winner,
                        amount,
                        pot_index,
                    });
                }
            }
        }
        awards
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Player;
    use crate::game::evaluator::HandCategory;
    use uuid::Uuid;

    fn seat(total: Chips, folded: bool) -> Player {
        let mut player = Player::new(Uuid::new_v4(), "seat", 1_000);
        player.total_bet_this_hand = total;
        player.is_folded = folded;
        player
    }

    fn rank(category: HandCategory, tiebreak: Vec<u8>) -> HandRank {
        HandRank {
            category,
            tiebreak,
        }
    }

    #[test]
    fn add_bet_accumulates_in_main_pot() {
        let mut pot = PotManager::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        pot.add_bet(a, 50);
        pot.add_bet(b, 100);
        pot.add_bet(a, 50);
        assert_eq!(pot.total(), 200);
        assert_eq!(pot.contribution(a), 100);
        assert_eq!(pot.pots()[0].eligible.len(), 2);
    }

    #[test]
    fn reset_leaves_single_empty_main_pot() {
        let mut pot = PotManager::new();
        pot.add_bet(Uuid::new_v4(), 75);
        pot.reset();
        assert_eq!(pot.pots().len(), 1);
        assert_eq!(pot.total(), 0);
        assert!(!pot.pots()[0].is_side);
    }

    #[test]
    fn single_level_forms_one_main_pot() {
        let seats = vec![seat(100, false), seat(100, false), seat(100, false)];
        let mut pot = PotManager::new();
        pot.create_side_pots(&seats);
        assert_eq!(pot.pots().len(), 1);
        assert_eq!(pot.pots()[0].amount, 300);
        assert_eq!(pot.pots()[0].eligible.len(), 3);
    }

    #[test]
    fn short_all_in_forms_main_and_side() {
        // 50 all-in against two 200 stacks: main 150, side 300.
        let seats = vec![seat(50, false), seat(200, false), seat(200, false)];
        let mut pot = PotManager::new();
        pot.create_side_pots(&seats);
        let pots = pot.pots();
        assert_eq!(pots.len(), 2);
        assert_eq!(pots[0].amount, 150);
        assert_eq!(pots[0].eligible.len(), 3);
        assert!(!pots[0].is_side);
        assert_eq!(pots[1].amount, 300);
        assert_eq!(pots[1].eligible.len(), 2);
        assert!(pots[1].is_side);
        assert_eq!(pot.total(), 450);
    }

    #[test]
    fn three_all_in_levels_form_three_pots() {
        // 25 / 75 / 150 / 150: main 100, side 150, side 150.
        let seats = vec![
            seat(25, false),
            seat(75, false),
            seat(150, false),
            seat(150, false),
        ];
        let mut pot = PotManager::new();
        pot.create_side_pots(&seats);
        let amounts: Vec<Chips> = pot.pots().iter().map(|p| p.amount).collect();
        assert_eq!(amounts, vec![100, 150, 150]);
        assert_eq!(pot.total(), 400);
    }

    #[test]
    fn folded_chips_stay_in_but_folder_is_never_eligible() {
        let folder = seat(50, true);
        let folder_id = folder.id;
        let seats = vec![folder, seat(100, false), seat(100, false)];
        let mut pot = PotManager::new();
        pot.create_side_pots(&seats);
        assert_eq!(pot.total(), 250);
        for layer in pot.pots() {
            assert!(!layer.eligible.contains(&folder_id));
        }
    }

    #[test]
    fn pot_sum_matches_contribution_sum() {
        let seats = vec![
            seat(13, false),
            seat(999, true),
            seat(450, false),
            seat(450, false),
            seat(0, false),
        ];
        let mut pot = PotManager::new();
        pot.create_side_pots(&seats);
        let total: Chips = seats.iter().map(|p| p.total_bet_this_hand).sum();
        assert_eq!(pot.total(), total);
    }

    #[test]
    fn best_rank_takes_each_layer() {
        let short = seat(50, false);
        let mid = seat(200, false);
        let big = seat(200, false);
        let (short_id, mid_id, big_id) = (short.id, mid.id, big.id);
        let seats = vec![short, mid, big];
        let mut pot = PotManager::new();
        pot.create_side_pots(&seats);

        let mut rankings = HashMap::new();
        rankings.insert(short_id, rank(HandCategory::Flush, vec![14, 9, 7, 4, 2]));
        rankings.insert(mid_id, rank(HandCategory::OnePair, vec![13, 9, 7, 4]));
        rankings.insert(big_id, rank(HandCategory::TwoPair, vec![9, 7, 14]));

        let distances = HashMap::from([(short_id, 1), (mid_id, 2), (big_id, 0)]);
        let awards = pot.distribute_pots(&rankings, &distances);

        // Short stack wins only the main layer; best remaining hand takes
        // the side pot.
        let short_total: Chips = awards
            .iter()
            .filter(|a| a.player_id == short_id)
            .map(|a| a.amount)
            .sum();
        let big_total: Chips = awards
            .iter()
            .filter(|a| a.player_id == big_id)
            .map(|a| a.amount)
            .sum();
        assert_eq!(short_total, 150);
        assert_eq!(big_total, 300);
    }

    #[test]
    fn tied_winners_split_with_odd_chip_to_worst_position() {
        let a = seat(101, false);
        let b = seat(101, false);
        let (a_id, b_id) = (a.id, b.id);
        let seats = vec![a, b];
        let mut pot = PotManager::new();
        pot.create_side_pots(&seats);

        let same = rank(HandCategory::Straight, vec![9]);
        let rankings = HashMap::from([(a_id, same.clone()), (b_id, same)]);
        // b sits farther clockwise from the dealer, so b takes the odd chip.
        let distances = HashMap::from([(a_id, 1), (b_id, 2)]);
        let awards = pot.distribute_pots(&rankings, &distances);

        let a_total: Chips = awards
            .iter()
            .filter(|aw| aw.player_id == a_id)
            .map(|aw| aw.amount)
            .sum();
        let b_total: Chips = awards
            .iter()
            .filter(|aw| aw.player_id == b_id)
            .map(|aw| aw.amount)
            .sum();
        assert_eq!(a_total, 101);
        assert_eq!(b_total, 101);
        let distributed: Chips = awards.iter().map(|aw| aw.amount).sum();
        assert_eq!(distributed, 202);
    }

    #[test]
    fn uncontested_layer_goes_to_lone_eligible_seat() {
        // Bettor pushed 100, caller folded after 40.
        let bettor = seat(100, false);
        let bettor_id = bettor.id;
        let seats = vec![bettor, seat(40, true)];
        let mut pot = PotManager::new();
        pot.create_side_pots(&seats);

        let awards = pot.distribute_pots(&HashMap::new(), &HashMap::new());
        let total: Chips = awards
            .iter()
            .filter(|a| a.player_id == bettor_id)
            .map(|a| a.amount)
            .sum();
        assert_eq!(total, 140);
    }
}
