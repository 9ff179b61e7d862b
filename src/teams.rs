//! Team formation and per-round slot assignment
//!
//! Players are split into small teams when the game starts. Every round each
//! team receives its own copy of the round's scenario, and the scenario's
//! slots are dealt out to the team's players round-robin. A player only ever
//! works on one slot at a time: their active slot is the first one in their
//! list that has no image yet.

use itertools::Itertools;

use crate::{
    scenario::{Image, Scenario},
    session::PlayerId,
};

/// Splits players into teams
///
/// When there are at most `max_team_size` players everybody plays alone, in
/// the order given. Otherwise the players are shuffled and paired up; an
/// odd player out joins the first pair, so teams have two or three members.
///
/// # Arguments
///
/// * `players` - Distinct player ids
/// * `max_team_size` - Threshold below which everybody plays alone (at least 3)
/// * `rng` - Random source for the shuffle
pub fn form_teams(
    players: &[PlayerId],
    max_team_size: usize,
    rng: &mut fastrand::Rng,
) -> Vec<Vec<PlayerId>> {
    if players.len() <= max_team_size {
        return players.iter().map(|&player| vec![player]).collect_vec();
    }

    let mut pool = players.to_vec();
    rng.shuffle(&mut pool);

    let mut teams = Vec::with_capacity(pool.len() / 2);
    while pool.len() >= 2 {
        let first = pool.pop();
        let second = pool.pop();
        teams.push(first.into_iter().chain(second).collect_vec());
    }

    if let (Some(leftover), Some(first_team)) = (pool.pop(), teams.first_mut()) {
        first_team.push(leftover);
    }

    teams
}

/// A player's assignments for the current round
#[derive(Debug, Clone)]
pub struct Player {
    id: PlayerId,
    slots: Vec<usize>,
}

impl Player {
    fn new(id: PlayerId) -> Self {
        Self {
            id,
            slots: Vec::new(),
        }
    }

    /// The player's platform identity
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Indices into the team scenario's slots, in assignment order
    pub fn slots(&self) -> &[usize] {
        &self.slots
    }

    /// The first assigned slot that has no image yet
    pub fn active_slot(&self, scenario: &Scenario) -> Option<usize> {
        self.slots
            .iter()
            .copied()
            .find(|&index| scenario.slots().get(index).is_some_and(|slot| !slot.is_filled()))
    }
}

/// A prompt that has to be delivered to a player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Who receives the prompt
    pub player: PlayerId,
    /// The prompt text
    pub prompt: String,
}

/// Outcome of filling a player's active slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fill {
    /// The player had nothing pending; nothing changed
    NothingPending,
    /// The slot was filled and the player has another slot to work on
    Next(Instruction),
    /// The slot was filled and it was the player's last one this round
    Done,
}

/// A team and its copy of the current round's scenario
#[derive(Debug, Clone)]
pub struct Team {
    name: String,
    players: Vec<Player>,
    scenario: Scenario,
}

impl Team {
    /// Creates a team with no slots assigned yet
    pub fn new(name: String, members: &[PlayerId], scenario: Scenario) -> Self {
        Self {
            name,
            players: members.iter().copied().map(Player::new).collect_vec(),
            scenario,
        }
    }

    /// The team's display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in formation order
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// The team's scenario for the current round
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Whether `player` is a member
    pub fn contains(&self, player: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == player)
    }

    /// Whether every slot of the team's scenario has an image
    pub fn is_complete(&self) -> bool {
        self.scenario.is_complete()
    }

    /// The slot `player` is currently asked to fill
    pub fn active_slot(&self, player: PlayerId) -> Option<usize> {
        self.players
            .iter()
            .find(|p| p.id == player)
            .and_then(|p| p.active_slot(&self.scenario))
    }

    /// Deals the scenario's slots to the players in a random order
    ///
    /// # Returns
    ///
    /// The first prompt of every player who received a slot, to be delivered
    /// immediately.
    pub fn assign_slots(&mut self, rng: &mut fastrand::Rng) -> Vec<Instruction> {
        let mut order = (0..self.scenario.slots().len()).collect_vec();
        rng.shuffle(&mut order);
        self.assign_slots_in_order(order)
    }

    /// Deals slots round-robin in the given order
    pub(crate) fn assign_slots_in_order(&mut self, order: Vec<usize>) -> Vec<Instruction> {
        let mut instructions = Vec::new();

        for (slot, player) in order
            .into_iter()
            .zip((0..self.players.len()).cycle())
        {
            let player = &mut self.players[player];
            if player.slots.is_empty() {
                instructions.push(Instruction {
                    player: player.id,
                    prompt: self.scenario.slots()[slot].prompt().to_owned(),
                });
            }
            player.slots.push(slot);
        }

        instructions
    }

    /// Stores `image` in the player's active slot
    ///
    /// Nothing changes when the player has no active slot.
    pub fn fill(&mut self, player: PlayerId, image: Image) -> Fill {
        let Some(slot) = self.active_slot(player) else {
            return Fill::NothingPending;
        };

        if let Some(slot) = self.scenario.slot_mut(slot) {
            slot.fill(image);
        }

        match self.active_slot(player) {
            Some(next) => Fill::Next(Instruction {
                player,
                prompt: self.scenario.slots()[next].prompt().to_owned(),
            }),
            None => Fill::Done,
        }
    }

    /// Drops all assignments and installs the next round's scenario
    pub fn reset(&mut self, scenario: Scenario) {
        for player in &mut self.players {
            player.slots.clear();
        }
        self.scenario = scenario;
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::testing::scenario;

    fn ids(count: i64) -> Vec<PlayerId> {
        (1..=count).map(PlayerId::from).collect_vec()
    }

    #[test]
    fn test_small_groups_play_alone() {
        let mut rng = fastrand::Rng::with_seed(1);
        for count in 1..=3 {
            let players = ids(count);
            let teams = form_teams(&players, 3, &mut rng);
            assert_eq!(teams.len(), players.len());
            assert!(teams.iter().all(|team| team.len() == 1));
            assert_eq!(teams.concat(), players);
        }
    }

    #[test]
    fn test_larger_groups_form_pairs_and_one_triple() {
        let mut rng = fastrand::Rng::with_seed(2);
        for count in 4..=25 {
            let players = ids(count);
            let teams = form_teams(&players, 3, &mut rng);

            assert!(teams.iter().all(|team| team.len() == 2 || team.len() == 3));
            assert_eq!(teams.iter().map(Vec::len).sum::<usize>(), players.len());
            assert_eq!(teams.len(), players.len() / 2);

            let triples = teams.iter().filter(|team| team.len() == 3).count();
            assert_eq!(triples, players.len() % 2);
            if triples == 1 {
                assert_eq!(teams[0].len(), 3);
            }

            let unique: HashSet<_> = teams.iter().flatten().collect();
            assert_eq!(unique.len(), players.len());
        }
    }

    #[test]
    fn test_five_players_split_two_and_three() {
        let mut rng = fastrand::Rng::with_seed(3);
        let teams = form_teams(&ids(5), 3, &mut rng);
        let mut sizes = teams.iter().map(Vec::len).collect_vec();
        sizes.sort_unstable();
        assert_eq!(sizes, [2, 3]);
    }

    #[test]
    fn test_larger_threshold_keeps_singletons() {
        let mut rng = fastrand::Rng::with_seed(4);
        let teams = form_teams(&ids(5), 5, &mut rng);
        assert_eq!(teams.len(), 5);
    }

    #[test]
    fn test_round_robin_assignment() {
        let p1 = PlayerId::from(1);
        let p2 = PlayerId::from(2);
        let mut team = Team::new("Otters".to_owned(), &[p1, p2], scenario(&["s0", "s1", "s2"]));

        let instructions = team.assign_slots_in_order(vec![0, 1, 2]);

        assert_eq!(
            instructions,
            [
                Instruction {
                    player: p1,
                    prompt: "s0".to_owned()
                },
                Instruction {
                    player: p2,
                    prompt: "s1".to_owned()
                },
            ]
        );
        assert_eq!(team.players()[0].slots(), [0, 2]);
        assert_eq!(team.players()[1].slots(), [1]);

        assert_eq!(
            team.fill(p1, Image::from(vec![1])),
            Fill::Next(Instruction {
                player: p1,
                prompt: "s2".to_owned()
            })
        );
        assert_eq!(team.active_slot(p1), Some(2));
        assert_eq!(team.active_slot(p2), Some(1));
    }

    #[test]
    fn test_shuffled_assignment_covers_every_slot_once() {
        let members = ids(3);
        let mut team = Team::new("Owls".to_owned(), &members, scenario(&["a", "b", "c", "d"]));
        let mut rng = fastrand::Rng::with_seed(5);

        let instructions = team.assign_slots(&mut rng);
        assert_eq!(instructions.len(), 3);

        let mut assigned = team
            .players()
            .iter()
            .flat_map(|p| p.slots().iter().copied())
            .collect_vec();
        assigned.sort_unstable();
        assert_eq!(assigned, [0, 1, 2, 3]);

        let counts = team.players().iter().map(|p| p.slots().len()).collect_vec();
        assert_eq!(counts, [2, 1, 1]);
    }

    #[test]
    fn test_more_players_than_slots() {
        let members = ids(3);
        let mut team = Team::new("Bats".to_owned(), &members, scenario(&["only"]));

        let instructions = team.assign_slots_in_order(vec![0]);
        assert_eq!(instructions.len(), 1);
        assert_eq!(team.active_slot(members[1]), None);
        assert_eq!(team.fill(members[1], Image::from(vec![1])), Fill::NothingPending);
        assert!(!team.is_complete());
    }

    #[test]
    fn test_fill_until_done_then_nothing_pending() {
        let p1 = PlayerId::from(1);
        let mut team = Team::new("Solo".to_owned(), &[p1], scenario(&["a", "b"]));
        team.assign_slots_in_order(vec![1, 0]);

        assert!(matches!(team.fill(p1, Image::from(vec![1])), Fill::Next(_)));
        assert_eq!(team.fill(p1, Image::from(vec![2])), Fill::Done);
        assert!(team.is_complete());

        assert_eq!(team.fill(p1, Image::from(vec![3])), Fill::NothingPending);
        assert_eq!(team.scenario().slots()[1].submitted(), Some(&Image::from(vec![1])));
        assert_eq!(team.scenario().slots()[0].submitted(), Some(&Image::from(vec![2])));
    }

    #[test]
    fn test_fill_for_stranger_is_ignored() {
        let mut team = Team::new("Solo".to_owned(), &[PlayerId::from(1)], scenario(&["a"]));
        team.assign_slots_in_order(vec![0]);

        assert!(!team.contains(PlayerId::from(9)));
        assert_eq!(team.fill(PlayerId::from(9), Image::from(vec![1])), Fill::NothingPending);
        assert_eq!(team.scenario().unfilled_count(), 1);
    }

    #[test]
    fn test_reset_clears_assignments() {
        let p1 = PlayerId::from(1);
        let mut team = Team::new("Solo".to_owned(), &[p1], scenario(&["a"]));
        team.assign_slots_in_order(vec![0]);
        team.fill(p1, Image::from(vec![1]));
        assert!(team.is_complete());

        team.reset(scenario(&["b", "c"]));
        assert!(team.players()[0].slots().is_empty());
        assert!(!team.is_complete());
        assert_eq!(team.active_slot(p1), None);
    }
}
