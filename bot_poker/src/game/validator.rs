//! Action validation and betting effects.
//!
//! Validation is a pure function over the game state: nothing here mutates
//! anything unless the action already passed. The checks run in a fixed
//! hierarchy (unknown player, wrong turn, seat unable to act, and only
//! then the action-specific amount rules), so clients always see the most
//! fundamental failure first.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::{Action, Chips, Player, PlayerAction, PlayerId, SeatIndex};
use super::state::GameState;

#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum ActionError {
    #[error("player not found")]
    PlayerNotFound,
    #[error("not player's turn to act")]
    NotPlayersTurn,
    #[error("player cannot act")]
    PlayerCannotAct,
    #[error("cannot check when there is a bet")]
    CheckWithOutstandingBet,
    #[error("cannot call when there is no bet")]
    CallWithoutBet,
    #[error("call amount must be {expected}")]
    CallAmountMismatch { expected: Chips },
    #[error("not enough chips to call")]
    NotEnoughChipsToCall,
    #[error("cannot bet when there is already a bet")]
    BetOverExistingBet,
    #[error("cannot bet after betting has occurred this round")]
    BetAfterBetting,
    #[error("bet must be at least {min}")]
    BetBelowMinimum { min: Chips },
    #[error("not enough chips to bet")]
    NotEnoughChipsToBet,
    #[error("cannot raise when there is no bet")]
    RaiseWithoutBet,
    #[error("cannot raise: action has not been re-opened")]
    RaiseNotReopened,
    #[error("raise must be at least {min}")]
    RaiseBelowMinimum { min: Chips },
    #[error("cannot raise more than {max}")]
    RaiseAboveMaximum { max: Chips },
    #[error("player has no chips to go all-in")]
    NoChipsToGoAllIn,
    #[error("player is already all-in")]
    AlreadyAllIn,
    #[error("invalid action type")]
    InvalidActionType,
}

/// An action choice presented to a bot, with the amounts that make it
/// legal.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PossibleAction {
    Fold,
    Check,
    Call { amount: Chips },
    Bet { min: Chips, max: Chips },
    Raise { min: Chips, max: Chips },
    AllIn { amount: Chips },
}

/// What one applied action did to the table, for event emission.
#[derive(Clone, Debug)]
pub struct AppliedAction {
    pub player_id: PlayerId,
    pub action: Action,
    /// Chips moved from the stack into the pot by this action.
    pub committed: Chips,
    /// Whether the bet-to-match went up.
    pub aggressive: bool,
    pub went_all_in: bool,
}

/// Whether any voluntary bet, raise, or all-in already happened this round.
/// Blind posts are not voluntary and do not count.
fn betting_occurred(state: &GameState) -> bool {
    state
        .actions_this_round
        .iter()
        .any(|pa| matches!(pa.action, Action::Bet(_) | Action::Raise(_) | Action::AllIn))
}

/// Whether raising is open to this player. A seat that already acted this
/// round may only respond to a complete raise; an incomplete all-in raise
/// does not re-open the action.
fn raise_open_for(player: &Player) -> bool {
    !player.has_acted
}

/// Validate an action against the current state without applying it.
pub fn validate(state: &GameState, player_id: PlayerId, action: &Action) -> Result<(), ActionError> {
    let player = state.player(player_id).ok_or(ActionError::PlayerNotFound)?;
    if state.current_player_to_act != Some(player_id) {
        return Err(ActionError::NotPlayersTurn);
    }
    if player.is_folded || player.is_all_in || player.chip_stack == 0 {
        return Err(ActionError::PlayerCannotAct);
    }

    let call = state.call_amount(player);
    match *action {
        Action::Fold => Ok(()),
        Action::Check => {
            if call > 0 {
                return Err(ActionError::CheckWithOutstandingBet);
            }
            Ok(())
        }
        Action::Call(amount) => {
            if state.current_bet == 0 {
                return Err(ActionError::CallWithoutBet);
            }
            if let Some(amount) = amount
                && amount != call
            {
                return Err(ActionError::CallAmountMismatch { expected: call });
            }
            if player.chip_stack < call {
                return Err(ActionError::NotEnoughChipsToCall);
            }
            Ok(())
        }
        Action::Bet(amount) => {
            if state.current_bet > 0 {
                return Err(ActionError::BetOverExistingBet);
            }
            if betting_occurred(state) {
                return Err(ActionError::BetAfterBetting);
            }
            if amount < state.blinds.big {
                return Err(ActionError::BetBelowMinimum {
                    min: state.blinds.big,
                });
            }
            if amount > player.chip_stack {
                return Err(ActionError::NotEnoughChipsToBet);
            }
            Ok(())
        }
        Action::Raise(amount) => {
            if state.current_bet == 0 {
                return Err(ActionError::RaiseWithoutBet);
            }
            if !raise_open_for(player) {
                return Err(ActionError::RaiseNotReopened);
            }
            let min = state.current_bet + state.minimum_raise;
            let max = player.chip_stack + player.current_bet;
            if amount > max {
                return Err(ActionError::RaiseAboveMaximum { max });
            }
            // A raise short of the minimum is legal only as an all-in.
            if amount < min && amount != max {
                return Err(ActionError::RaiseBelowMinimum { min });
            }
            Ok(())
        }
        Action::AllIn => {
            if player.is_all_in {
                return Err(ActionError::AlreadyAllIn);
            }
            if player.chip_stack == 0 {
                return Err(ActionError::NoChipsToGoAllIn);
            }
            Ok(())
        }
    }
}

/// The set of actions the player could legally take right now. Empty when
/// the basic hierarchy (turn, seat able to act) fails.
#[must_use]
pub fn possible_actions(state: &GameState, player_id: PlayerId) -> Vec<PossibleAction> {
    let Some(player) = state.player(player_id) else {
        return Vec::new();
    };
    if state.current_player_to_act != Some(player_id)
        || player.is_folded
        || player.is_all_in
        || player.chip_stack == 0
    {
        return Vec::new();
    }

    let mut actions = vec![PossibleAction::Fold];
    let call = state.call_amount(player);

    if call == 0 {
        actions.push(PossibleAction::Check);
    } else if player.chip_stack >= call {
        actions.push(PossibleAction::Call { amount: call });
    }

    if state.current_bet == 0 {
        if !betting_occurred(state) && player.chip_stack >= state.blinds.big {
            actions.push(PossibleAction::Bet {
                min: state.blinds.big,
                max: player.chip_stack,
            });
        }
    } else if raise_open_for(player) {
        let max = player.chip_stack + player.current_bet;
        if max > state.current_bet {
            let min = (state.current_bet + state.minimum_raise).min(max);
            actions.push(PossibleAction::Raise { min, max });
        }
    }

    actions.push(PossibleAction::AllIn {
        amount: player.chip_stack,
    });
    actions
}

/// Default action on timeout: check when checking is free, fold otherwise.
#[must_use]
pub fn force_action(state: &GameState, player_id: PlayerId) -> Action {
    match state.player(player_id) {
        Some(player) if state.call_amount(player) == 0 => Action::Check,
        _ => Action::Fold,
    }
}

/// Apply a validated action. All effects land together; callers must have
/// run [`validate`] first.
pub fn apply_action(
    state: &mut GameState,
    player_id: PlayerId,
    action: Action,
) -> Result<AppliedAction, ActionError> {
    let seat = state.seat_of(player_id).ok_or(ActionError::PlayerNotFound)?;
    let call = state.call_amount(&state.seats[seat]);

    let mut committed = 0;
    let mut new_total = None;
    match action {
        Action::Fold => {
            state.seats[seat].is_folded = true;
        }
        Action::Check => {}
        Action::Call(_) => {
            committed = state.seats[seat].commit(call);
        }
        Action::Bet(amount) => {
            committed = state.seats[seat].commit(amount);
            new_total = Some(state.seats[seat].current_bet);
        }
        Action::Raise(to) => {
            let player = &mut state.seats[seat];
            let delta = to - player.current_bet;
            committed = player.commit(delta);
            new_total = Some(player.current_bet);
        }
        Action::AllIn => {
            let player = &mut state.seats[seat];
            committed = player.commit(player.chip_stack);
            if player.current_bet > state.current_bet {
                new_total = Some(player.current_bet);
            }
        }
    }

    let mut aggressive = false;
    if let Some(total) = new_total
        && total > state.current_bet
    {
        aggressive = true;
        apply_aggression(state, seat, total);
    }

    state.seats[seat].has_acted = true;
    let went_all_in = state.seats[seat].is_all_in;
    state
        .actions_this_round
        .push(PlayerAction::new(player_id, action));

    Ok(AppliedAction {
        player_id,
        action,
        committed,
        aggressive,
        went_all_in,
    })
}

/// Raise the bet-to-match. A complete raise re-opens the action for every
/// other live seat and resets the minimum-raise tracking; an incomplete
/// all-in raise does neither.
fn apply_aggression(state: &mut GameState, actor: SeatIndex, new_total: Chips) {
    let raise_size = new_total - state.current_bet;
    let complete = new_total >= state.current_bet + state.minimum_raise;
    state.current_bet = new_total;

    let actor_id = state.seats[actor].id;
    state.last_aggressor = Some(actor_id);
    state.round_aggressor = Some(actor_id);

    if complete {
        state.minimum_raise = raise_size;
        state.last_raise_amount = raise_size;
        for (idx, player) in state.seats.iter_mut().enumerate() {
            if idx != actor && player.can_act() {
                player.has_acted = false;
            }
        }
    }
}

/// Post a blind for the seat. Short stacks post what they have and go
/// all-in. Posting never sets `has_acted`, so the big blind keeps the
/// option to act.
pub fn post_blind(state: &mut GameState, seat: SeatIndex, amount: Chips) -> Chips {
    let committed = state.seats[seat].commit(amount);
    if state.seats[seat].current_bet > state.current_bet {
        state.current_bet = state.seats[seat].current_bet;
    }
    committed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{Blinds, Card, GamePhase, Suit};
    use uuid::Uuid;

    fn dealt(stack: Chips) -> Player {
        let mut p = Player::new(Uuid::new_v4(), "p", stack);
        p.hole_cards = Some([Card(14, Suit::Spade), Card(2, Suit::Club)]);
        p
    }

    /// Three dealt seats, blinds 5/10 posted by seats 1 and 2, seat 0 to
    /// act first.
    fn preflop_state() -> GameState {
        let mut state = GameState::new(Blinds { small: 5, big: 10 });
        state.seats = vec![dealt(1_000), dealt(1_000), dealt(1_000)];
        state.dealer_index = 0;
        state.small_blind_index = 1;
        state.big_blind_index = 2;
        state.phase = GamePhase::PreFlop;
        post_blind(&mut state, 1, 5);
        post_blind(&mut state, 2, 10);
        state.blinds_posted = true;
        state.current_player_to_act = Some(state.seats[0].id);
        state
    }

    #[test]
    fn unknown_player_fails_first() {
        let state = preflop_state();
        let err = validate(&state, Uuid::new_v4(), &Action::Fold).unwrap_err();
        assert_eq!(err, ActionError::PlayerNotFound);
    }

    #[test]
    fn out_of_turn_fails_before_action_rules() {
        let state = preflop_state();
        let sb = state.seats[1].id;
        // Checking would also be illegal for the small blind, but the turn
        // check has to come first.
        let err = validate(&state, sb, &Action::Check).unwrap_err();
        assert_eq!(err, ActionError::NotPlayersTurn);
    }

    #[test]
    fn folded_seat_cannot_act() {
        let mut state = preflop_state();
        let utg = state.seats[0].id;
        state.seats[0].is_folded = true;
        let err = validate(&state, utg, &Action::Fold).unwrap_err();
        assert_eq!(err, ActionError::PlayerCannotAct);
    }

    #[test]
    fn check_requires_no_outstanding_bet() {
        let state = preflop_state();
        let utg = state.seats[0].id;
        let err = validate(&state, utg, &Action::Check).unwrap_err();
        assert_eq!(err, ActionError::CheckWithOutstandingBet);
    }

    #[test]
    fn call_amount_must_be_exact_when_supplied() {
        let state = preflop_state();
        let utg = state.seats[0].id;
        assert!(validate(&state, utg, &Action::Call(None)).is_ok());
        assert!(validate(&state, utg, &Action::Call(Some(10))).is_ok());
        let err = validate(&state, utg, &Action::Call(Some(7))).unwrap_err();
        assert_eq!(err, ActionError::CallAmountMismatch { expected: 10 });
    }

    #[test]
    fn short_stack_cannot_flat_call() {
        let mut state = preflop_state();
        let utg = state.seats[0].id;
        state.seats[0].chip_stack = 4;
        let err = validate(&state, utg, &Action::Call(None)).unwrap_err();
        assert_eq!(err, ActionError::NotEnoughChipsToCall);
        // The all-in escape hatch stays open.
        assert!(validate(&state, utg, &Action::AllIn).is_ok());
    }

    #[test]
    fn bet_is_illegal_against_an_existing_bet() {
        let state = preflop_state();
        let utg = state.seats[0].id;
        let err = validate(&state, utg, &Action::Bet(50)).unwrap_err();
        assert_eq!(err, ActionError::BetOverExistingBet);
    }

    fn postflop_state() -> GameState {
        let mut state = preflop_state();
        state.reset_for_round();
        state.phase = GamePhase::Flop;
        state.current_player_to_act = Some(state.seats[1].id);
        state
    }

    #[test]
    fn opening_bet_bounds() {
        let mut state = postflop_state();
        let sb = state.seats[1].id;
        assert!(validate(&state, sb, &Action::Bet(10)).is_ok());
        let err = validate(&state, sb, &Action::Bet(9)).unwrap_err();
        assert_eq!(err, ActionError::BetBelowMinimum { min: 10 });
        state.seats[1].chip_stack = 100;
        let err = validate(&state, sb, &Action::Bet(101)).unwrap_err();
        assert_eq!(err, ActionError::NotEnoughChipsToBet);
        assert!(validate(&state, sb, &Action::Bet(100)).is_ok());
    }

    #[test]
    fn raise_requires_an_existing_bet() {
        let state = postflop_state();
        let sb = state.seats[1].id;
        let err = validate(&state, sb, &Action::Raise(40)).unwrap_err();
        assert_eq!(err, ActionError::RaiseWithoutBet);
    }

    #[test]
    fn raise_bounds_and_all_in_exception() {
        let mut state = preflop_state();
        let utg = state.seats[0].id;
        // current bet 10, minimum raise 10: raises must reach 20.
        assert!(validate(&state, utg, &Action::Raise(20)).is_ok());
        let err = validate(&state, utg, &Action::Raise(19)).unwrap_err();
        assert_eq!(err, ActionError::RaiseBelowMinimum { min: 20 });
        let err = validate(&state, utg, &Action::Raise(1_001)).unwrap_err();
        assert_eq!(err, ActionError::RaiseAboveMaximum { max: 1_000 });
        // A short all-in raise below the minimum is allowed when it is the
        // whole stack.
        state.seats[0].chip_stack = 15;
        assert!(validate(&state, utg, &Action::Raise(15)).is_ok());
    }

    #[test]
    fn call_contributes_exactly_the_call_amount() {
        let mut state = preflop_state();
        let utg = state.seats[0].id;
        let applied = apply_action(&mut state, utg, Action::Call(None)).unwrap();
        assert_eq!(applied.committed, 10);
        assert!(!applied.aggressive);
        assert_eq!(state.seats[0].current_bet, 10);
        assert!(state.seats[0].has_acted);
    }

    #[test]
    fn complete_raise_reopens_action_and_updates_minimum() {
        let mut state = preflop_state();
        let utg = state.seats[0].id;
        let sb = state.seats[1].id;
        apply_action(&mut state, utg, Action::Call(None)).unwrap();
        state.current_player_to_act = Some(sb);
        let applied = apply_action(&mut state, sb, Action::Raise(30)).unwrap();
        assert!(applied.aggressive);
        assert_eq!(state.current_bet, 30);
        assert_eq!(state.minimum_raise, 20);
        assert_eq!(state.last_raise_amount, 20);
        assert_eq!(state.last_aggressor, Some(sb));
        // The caller gets to respond again.
        assert!(!state.seats[0].has_acted);
    }

    #[test]
    fn incomplete_all_in_raise_does_not_reopen_action() {
        // UTG raises to 30, button calls, small blind jams for 40 total:
        // a 10-chip raise short of the 20 minimum.
        let mut state = GameState::new(Blinds { small: 5, big: 10 });
        state.seats = vec![dealt(1_000), dealt(1_000), dealt(40), dealt(1_000)];
        state.dealer_index = 1;
        state.small_blind_index = 2;
        state.big_blind_index = 3;
        state.phase = GamePhase::PreFlop;
        post_blind(&mut state, 2, 5);
        post_blind(&mut state, 3, 10);
        state.blinds_posted = true;

        let utg = state.seats[0].id;
        let button = state.seats[1].id;
        let sb = state.seats[2].id;

        state.current_player_to_act = Some(utg);
        apply_action(&mut state, utg, Action::Raise(30)).unwrap();
        state.current_player_to_act = Some(button);
        apply_action(&mut state, button, Action::Call(None)).unwrap();
        state.current_player_to_act = Some(sb);
        let applied = apply_action(&mut state, sb, Action::AllIn).unwrap();

        assert!(applied.aggressive);
        assert!(applied.went_all_in);
        assert_eq!(state.current_bet, 40);
        // The incomplete jam neither re-opens the action nor moves the
        // minimum raise.
        assert_eq!(state.minimum_raise, 20);
        assert_eq!(state.last_raise_amount, 20);
        assert!(state.seats[0].has_acted);
        assert!(state.seats[1].has_acted);

        // When the button gets another look it may call or fold, never
        // raise.
        state.current_player_to_act = Some(button);
        let options = possible_actions(&state, button);
        assert!(options.contains(&PossibleAction::Fold));
        assert!(options.contains(&PossibleAction::Call { amount: 10 }));
        assert!(
            !options
                .iter()
                .any(|a| matches!(a, PossibleAction::Raise { .. }))
        );
        let err = validate(&state, button, &Action::Raise(60)).unwrap_err();
        assert_eq!(err, ActionError::RaiseNotReopened);
    }

    #[test]
    fn min_raise_tracks_last_complete_raise_size() {
        // UTG to 30, button to 70 (a 40 raise): the next raise must reach
        // 110.
        let mut state = GameState::new(Blinds { small: 5, big: 10 });
        state.seats = vec![dealt(1_000), dealt(1_000), dealt(1_000), dealt(1_000)];
        state.dealer_index = 1;
        state.small_blind_index = 2;
        state.big_blind_index = 3;
        state.phase = GamePhase::PreFlop;
        post_blind(&mut state, 2, 5);
        post_blind(&mut state, 3, 10);
        state.blinds_posted = true;

        let utg = state.seats[0].id;
        let button = state.seats[1].id;
        let sb = state.seats[2].id;

        state.current_player_to_act = Some(utg);
        apply_action(&mut state, utg, Action::Raise(30)).unwrap();
        state.current_player_to_act = Some(button);
        apply_action(&mut state, button, Action::Raise(70)).unwrap();

        assert_eq!(state.minimum_raise, 40);
        state.current_player_to_act = Some(sb);
        let err = validate(&state, sb, &Action::Raise(100)).unwrap_err();
        assert_eq!(err, ActionError::RaiseBelowMinimum { min: 110 });
        assert!(validate(&state, sb, &Action::Raise(110)).is_ok());
    }

    #[test]
    fn short_blind_posts_stack_and_goes_all_in() {
        let mut state = GameState::new(Blinds { small: 5, big: 10 });
        state.seats = vec![dealt(3), dealt(7)];
        state.dealer_index = 0;
        state.small_blind_index = 0;
        state.big_blind_index = 1;
        state.phase = GamePhase::PreFlop;

        assert_eq!(post_blind(&mut state, 0, 5), 3);
        assert_eq!(post_blind(&mut state, 1, 10), 7);
        assert!(state.seats[0].is_all_in);
        assert!(state.seats[1].is_all_in);
        assert_eq!(state.seats[0].current_bet, 3);
        assert_eq!(state.seats[1].current_bet, 7);
        assert_eq!(state.current_bet, 7);
        // Posting is not acting.
        assert!(!state.seats[0].has_acted);
        assert!(!state.seats[1].has_acted);
    }

    #[test]
    fn force_action_checks_when_free_folds_otherwise() {
        let mut state = preflop_state();
        let utg = state.seats[0].id;
        let bb = state.seats[2].id;
        assert_eq!(force_action(&state, utg), Action::Fold);
        // The big blind already has the bet matched.
        state.current_player_to_act = Some(bb);
        assert_eq!(force_action(&state, bb), Action::Check);
    }

    #[test]
    fn possible_actions_empty_when_out_of_turn() {
        let state = preflop_state();
        let sb = state.seats[1].id;
        assert!(possible_actions(&state, sb).is_empty());
    }

    #[test]
    fn possible_actions_preflop_open() {
        let state = preflop_state();
        let utg = state.seats[0].id;
        let options = possible_actions(&state, utg);
        assert!(options.contains(&PossibleAction::Fold));
        assert!(options.contains(&PossibleAction::Call { amount: 10 }));
        assert!(options.contains(&PossibleAction::Raise { min: 20, max: 1_000 }));
        assert!(options.contains(&PossibleAction::AllIn { amount: 1_000 }));
        assert!(!options.contains(&PossibleAction::Check));
    }

    #[test]
    fn possible_actions_when_checking_is_free() {
        let mut state = postflop_state();
        let sb = state.seats[1].id;
        state.current_player_to_act = Some(sb);
        let options = possible_actions(&state, sb);
        assert!(options.contains(&PossibleAction::Check));
        assert!(options.contains(&PossibleAction::Bet { min: 10, max: 995 }));
        assert!(
            !options
                .iter()
                .any(|a| matches!(a, PossibleAction::Call { .. }))
        );
    }
}
