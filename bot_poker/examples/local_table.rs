//! Play one hand on a local table and print the event stream.
//!
//! Run with: `cargo run -p bot_poker --example local_table`

use bot_poker::game::{
    Action, GameConfig, GameEngine, PlayerAction, PossibleAction, ShuffledDeck,
};
use tokio::sync::mpsc;
use uuid::Uuid;

fn main() {
    let mut engine = GameEngine::new(
        Uuid::new_v4(),
        GameConfig::default(),
        Box::new(ShuffledDeck::new_shuffled()),
    );
    let (tx, mut rx) = mpsc::unbounded_channel();
    engine.on_event(tx);

    for (name, stack) in [("marvin", 1_000), ("trillian", 1_000), ("zaphod", 600)] {
        engine.add_player(Uuid::new_v4(), name, stack).unwrap();
    }
    engine.start_hand().unwrap();

    // Everyone plays the passive line: check when free, call otherwise.
    while engine.is_game_running() {
        let actor = engine.current_player_to_act().expect("someone must act");
        let options = engine.get_possible_actions(actor).unwrap();
        let action = if options.contains(&PossibleAction::Check) {
            Action::Check
        } else {
            Action::Call(None)
        };
        engine
            .process_action(PlayerAction::new(actor, action))
            .unwrap();
    }

    while let Ok(event) = rx.try_recv() {
        println!(
            "#{:<3} {:<18} hand {} ({})",
            event.sequence_id,
            format!("{:?}", event.kind),
            event.hand_number,
            event.phase
        );
    }

    println!("\nfinal stacks:");
    for seat in engine.get_game_state().seats {
        println!("  {:<10} {}", seat.name, seat.chip_stack);
    }
}
