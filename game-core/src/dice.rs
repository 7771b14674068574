use game_types::{DICE_COUNT, Dice};
use rand::Rng;

/// Rerolls every die not listed in `held`. Out-of-range positions are ignored.
pub fn roll_dice<R: Rng>(current: Dice, held: &[usize], rng: &mut R) -> Dice {
    let mut keep = [false; DICE_COUNT];
    for &index in held {
        if let Some(slot) = keep.get_mut(index) {
            *slot = true;
        }
    }

    let mut next = current;
    for (die, kept) in next.iter_mut().zip(keep) {
        if !kept {
            *die = rng.random_range(1..=6);
        }
    }
    next
}
