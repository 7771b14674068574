use game_types::{
    Category, FinalScore, GameError, PlayerId, ServerEvent, UPPER_BONUS, UPPER_BONUS_THRESHOLD,
};
use std::collections::BTreeMap;

/// One player's scores. A category is taken once it has an entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scorecard {
    scores: BTreeMap<Category, i32>,
    total: i32,
}

impl Scorecard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, category: Category, score: i32) -> Result<(), GameError> {
        if self.scores.contains_key(&category) {
            return Err(GameError::CategoryTaken { category });
        }
        // Non-negative scores keep every partial sum below the total.
        let total = Some(score)
            .filter(|s| *s >= 0)
            .and_then(|s| self.total.checked_add(s))
            .ok_or(GameError::InvalidScore { score })?;
        self.scores.insert(category, score);
        self.total = total;
        Ok(())
    }

    pub fn is_taken(&self, category: Category) -> bool {
        self.scores.contains_key(&category)
    }

    pub fn is_complete(&self) -> bool {
        Category::ALL.iter().all(|c| self.scores.contains_key(c))
    }

    pub fn scores(&self) -> &BTreeMap<Category, i32> {
        &self.scores
    }

    pub fn total(&self) -> i32 {
        self.total
    }

    pub fn upper_sum(&self) -> i32 {
        self.scores
            .iter()
            .filter(|(category, _)| category.is_upper())
            .map(|(_, score)| score)
            .sum()
    }

    pub fn upper_bonus(&self) -> i32 {
        if self.upper_sum() >= UPPER_BONUS_THRESHOLD {
            UPPER_BONUS
        } else {
            0
        }
    }

    pub fn final_score(&self, name: &str) -> FinalScore {
        let upper_bonus = self.upper_bonus();
        FinalScore {
            name: name.to_string(),
            base_score: self.total,
            upper_bonus,
            final_score: self.total.saturating_add(upper_bonus),
        }
    }

    pub fn clear(&mut self) {
        self.scores.clear();
        self.total = 0;
    }
}

/// Builds the `GAME_END` event for the given players, listed in turn order.
///
/// Every player sharing the top final score is named in the winner line;
/// more than one makes the game a draw. Returns `None` for an empty table.
pub fn tally<'a, I>(players: I) -> Option<ServerEvent>
where
    I: IntoIterator<Item = (&'a PlayerId, &'a str, &'a Scorecard)>,
{
    let mut final_scores = BTreeMap::new();
    let mut leaders: Vec<(&PlayerId, &str)> = Vec::new();
    let mut best = i32::MIN;

    for (player_id, name, scorecard) in players {
        let result = scorecard.final_score(name);

        if result.final_score > best {
            best = result.final_score;
            leaders.clear();
        }
        if result.final_score == best {
            leaders.push((player_id, name));
        }

        final_scores.insert(player_id.clone(), result);
    }

    let (winner_id, first_name) = *leaders.first()?;
    let is_draw = leaders.len() > 1;
    let winner_name = if is_draw {
        let names: Vec<&str> = leaders.iter().map(|(_, name)| *name).collect();
        format!("{} (TIE!)", names.join(" & "))
    } else {
        first_name.to_string()
    };

    Some(ServerEvent::GameEnd {
        final_scores,
        winner_id: winner_id.clone(),
        winner_name,
        is_draw,
    })
}
