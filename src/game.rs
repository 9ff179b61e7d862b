//! Core game logic and state management
//!
//! This module contains the game session state machine: players join a
//! forming game, the creator starts it, teams are formed and every round
//! each player is handed prompts for the slots of their team's picture.
//! Once every slot of every team is filled the pictures are revealed and
//! the next round begins, until the configured number of rounds is done.

use std::{collections::HashMap, fmt::Debug};

use enum_map::Enum;
use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use web_time::{Duration, SystemTime};

use crate::{
    TruncatedVec,
    catalog::{Catalog, Selection},
    compose::Composer,
    constants,
    game_id::GameId,
    names::{NameStyle, Names},
    reveal,
    scenario::{Image, Scenario, Variant},
    session::{ChatId, MessageId, Participant, PlayerId, Target, Transport},
    teams::{self, Fill, Instruction, Team},
};

const MIN_REVEAL_PAUSE: u64 = 0;
const MAX_REVEAL_PAUSE: u64 = constants::game::MAX_REVEAL_PAUSE;

/// Validates that a duration falls within the given bounds in seconds
fn validate_duration<const MIN_SECONDS: u64, const MAX_SECONDS: u64>(
    val: &Duration,
    _ctx: &(),
) -> garde::Result {
    if (MIN_SECONDS..=MAX_SECONDS).contains(&val.as_secs()) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "outside of bounds [{MIN_SECONDS},{MAX_SECONDS}]",
        )))
    }
}

/// Configuration of a game
#[serde_with::serde_as]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Options {
    /// Number of rounds played
    #[garde(range(min = constants::game::MIN_ROUNDS, max = constants::game::MAX_ROUNDS))]
    pub rounds: usize,
    /// Up to this many players everybody plays alone; beyond it players
    /// are paired up
    #[garde(range(min = constants::teams::MIN_TEAM_SIZE, max = constants::teams::MAX_TEAM_SIZE))]
    pub max_team_size: usize,
    /// How scenarios are drawn from the catalog
    #[garde(skip)]
    pub selection: Selection,
    /// How the prompt variant of each round is chosen
    #[garde(skip)]
    pub variant: Variant,
    /// Pause between two revealed pictures
    #[garde(custom(validate_duration::<MIN_REVEAL_PAUSE, MAX_REVEAL_PAUSE>))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub reveal_pause: Duration,
    /// Style of generated team names
    #[garde(dive)]
    pub team_names: NameStyle,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            rounds: constants::game::DEFAULT_ROUNDS,
            max_team_size: constants::teams::DEFAULT_TEAM_SIZE,
            selection: Selection::default(),
            variant: Variant::default(),
            reveal_pause: Duration::from_secs(constants::game::DEFAULT_REVEAL_PAUSE),
            team_names: NameStyle::default(),
        }
    }
}

/// Errors reported back to whoever triggered an event
///
/// None of these leave a game in a different state than before the event.
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The player already joined this game
    #[error("player already in game")]
    DuplicateJoin,
    /// Joining or starting a game that is already running
    #[error("game has already started, wait for the next one")]
    GameAlreadyStarted,
    /// Somebody other than the creator tried to start the game
    #[error("only the game creator can start the game")]
    Forbidden,
    /// No game exists for the chat or player
    #[error("no active game, create one with /new")]
    NoActiveSession,
    /// The sender has no slot in the running game
    #[error("you are not playing in this game")]
    NoActiveSlot,
    /// An image was submitted before the game started
    #[error("game has not started yet")]
    NotStarted,
    /// The game is complete
    #[error("game is complete, start a new game with /new")]
    GameFinished,
    /// The game reached its player limit
    #[error("maximum number of players reached")]
    GameFull,
    /// The chat already has an unfinished game
    #[error("a game is already running in this chat")]
    GameInProgress,
    /// The player is taking part in another unfinished game
    #[error("you are already playing in another game")]
    AlreadyPlaying,
    /// The game could not be accessed
    #[error("game is unavailable")]
    Unavailable,
}

/// Result of an accepted image submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Submission {
    /// The player's next prompt has been sent to them
    InstructionSent,
    /// The player has nothing more to do this round
    PlayerDone,
}

/// A team as listed on the status board
#[derive(Debug, Clone, Serialize)]
pub struct TeamListing {
    /// Team name
    pub name: String,
    /// Display names of the members
    pub players: Vec<String>,
}

/// Messages the game sends through the [`Transport`]
///
/// `Display` renders the plain text shown to users.
#[derive(Debug, Clone, Serialize)]
pub enum Message {
    /// Status board while players are joining
    Lobby {
        /// Game id
        game: GameId,
        /// Display name of the creator
        creator: String,
        /// Display names of everybody who joined
        players: TruncatedVec<String>,
    },
    /// Status board once teams are formed
    Teams {
        /// Game id
        game: GameId,
        /// The teams in order
        teams: Vec<TeamListing>,
    },
    /// A prompt for a player's active slot
    Instruction {
        /// What to send a picture of
        prompt: String,
    },
    /// Private notice that the round a player took part in has ended
    RoundFinished {
        /// Zero-based round index
        round: usize,
    },
    /// Announcement preceding the revealed pictures
    RevealStart {
        /// Zero-based round index
        round: usize,
    },
    /// Caption of a team's composed picture
    TeamSubmission {
        /// Team name
        team: String,
    },
    /// Sent once every picture of the round has been shown
    AllRevealed,
    /// A new round has begun
    NextRound {
        /// Zero-based round index
        round: usize,
        /// Total number of rounds
        rounds: usize,
    },
    /// The game is over
    Complete,
}

impl Message {
    /// Converts the message to a JSON string
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lobby {
                game,
                creator,
                players,
            } => {
                writeln!(f, "New game {game} created!")?;
                writeln!(f)?;
                writeln!(f, "Waiting for players to /join...")?;
                writeln!(f)?;
                writeln!(f, "Players:")?;
                for name in players.items() {
                    writeln!(f, "{name}")?;
                }
                let hidden = players.exact_count().saturating_sub(players.items().len());
                if hidden > 0 {
                    writeln!(f, "...and {hidden} more")?;
                }
                writeln!(f)?;
                writeln!(f, "{} players joined!", players.exact_count())?;
                writeln!(f)?;
                writeln!(f, "Commands:")?;
                writeln!(f, "/join - join game")?;
                write!(f, "/start - start game ({creator} only)")
            }
            Self::Teams { game, teams } => {
                writeln!(f, "Game {game} started!")?;
                writeln!(f)?;
                write!(f, "Teams:")?;
                for team in teams {
                    writeln!(f)?;
                    writeln!(f)?;
                    write!(f, "{}", team.name)?;
                    for player in &team.players {
                        write!(f, "\n- {player}")?;
                    }
                }
                Ok(())
            }
            Self::Instruction { prompt } => write!(f, "Send a picture of {prompt}"),
            Self::RoundFinished { round } => {
                write!(f, "Round {} finished! Results are in the group chat.", round + 1)
            }
            Self::RevealStart { round } => write!(f, "Round {} is done! Here are the results:", round + 1),
            Self::TeamSubmission { team } => write!(f, "Submission from {team}"),
            Self::AllRevealed => write!(f, "All submissions revealed!"),
            Self::NextRound { round, rounds } => {
                write!(f, "Round {} of {rounds} started! Check your private messages.", round + 1)
            }
            Self::Complete => write!(f, "Game is complete! Start a new game with /new"),
        }
    }
}

/// Discriminant of [`State`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum Phase {
    /// Players are joining
    Forming,
    /// Rounds are being played
    Active,
    /// All rounds have been played
    Finished,
}

/// Round bookkeeping of a running game
#[derive(Debug, Clone)]
pub struct Rounds {
    scenarios: Vec<Scenario>,
    index: usize,
    teams: Vec<Team>,
    player_to_team: HashMap<PlayerId, usize>,
}

impl Rounds {
    /// Zero-based index of the round being played
    pub fn index(&self) -> usize {
        self.index
    }

    /// Total number of rounds
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Whether there are no rounds at all (never true for a running game)
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// The scenario templates, one per round
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Teams in formation order
    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    /// The team a player belongs to
    pub fn team_of(&self, player: PlayerId) -> Option<&Team> {
        self.player_to_team
            .get(&player)
            .and_then(|&index| self.teams.get(index))
    }

    /// Whether every slot of every team is filled
    pub fn is_complete(&self) -> bool {
        self.teams.iter().all(Team::is_complete)
    }

    /// Moves to the next round and deals its slots
    ///
    /// # Returns
    ///
    /// The first prompts of the new round, or `None` if the last round has
    /// been played.
    fn advance(&mut self, rng: &mut fastrand::Rng) -> Option<Vec<Instruction>> {
        self.index += 1;
        let scenario = self.scenarios.get(self.index)?;

        Some(
            self.teams
                .iter_mut()
                .flat_map(|team| {
                    team.reset(scenario.clone());
                    team.assign_slots(rng)
                })
                .collect_vec(),
        )
    }
}

/// The lifecycle state of a game
#[derive(Debug, Clone)]
pub enum State {
    /// Players are joining
    Forming,
    /// Rounds are being played
    Active(Box<Rounds>),
    /// All rounds have been played
    Finished {
        /// Number of rounds that were played
        rounds: usize,
    },
}

impl State {
    /// The discriminant of this state
    pub fn phase(&self) -> Phase {
        match self {
            Self::Forming => Phase::Forming,
            Self::Active(_) => Phase::Active,
            Self::Finished { .. } => Phase::Finished,
        }
    }
}

/// A game session in one group chat
pub struct Game {
    id: GameId,
    chat: ChatId,
    creator: PlayerId,
    options: Options,
    names: Names,
    players: Vec<PlayerId>,
    board: Option<MessageId>,
    state: State,
    rng: fastrand::Rng,
    last_activity: SystemTime,
}

impl Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("id", &self.id)
            .field("chat", &self.chat)
            .field("phase", &self.state.phase())
            .finish_non_exhaustive()
    }
}

// Accessors
impl Game {
    /// The game's id
    pub fn id(&self) -> GameId {
        self.id
    }

    /// The chat the game was created in; reveals are posted there
    pub fn chat(&self) -> ChatId {
        self.chat
    }

    /// The player allowed to start the game
    pub fn creator(&self) -> PlayerId {
        self.creator
    }

    /// The game's configuration
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The current lifecycle state
    pub fn state(&self) -> &State {
        &self.state
    }

    /// The current lifecycle phase
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Players in join order
    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    /// Whether `player` has joined
    pub fn is_member(&self, player: PlayerId) -> bool {
        self.players.contains(&player)
    }

    /// Round bookkeeping, while the game is running
    pub fn rounds(&self) -> Option<&Rounds> {
        match &self.state {
            State::Active(rounds) => Some(rounds),
            _ => None,
        }
    }

    /// Zero-based index of the round being played, while running
    pub fn round_index(&self) -> Option<usize> {
        self.rounds().map(Rounds::index)
    }

    /// When the game last accepted an event
    pub fn last_activity(&self) -> SystemTime {
        self.last_activity
    }

    fn touch(&mut self) {
        self.last_activity = SystemTime::now();
    }

    fn board_message(&self) -> Message {
        match &self.state {
            State::Forming => Message::Lobby {
                game: self.id,
                creator: self.names.get_name(self.creator),
                players: TruncatedVec::new(
                    self.players
                        .iter()
                        .map(|&player| self.names.get_name(player))
                        .sorted(),
                    constants::names::LOBBY_LIMIT,
                    self.players.len(),
                ),
            },
            State::Active(rounds) => Message::Teams {
                game: self.id,
                teams: rounds
                    .teams
                    .iter()
                    .map(|team| TeamListing {
                        name: team.name().to_owned(),
                        players: team
                            .players()
                            .iter()
                            .map(|player| self.names.get_name(player.id()))
                            .collect_vec(),
                    })
                    .collect_vec(),
            },
            State::Finished { .. } => Message::Complete,
        }
    }

    /// Edits the status board, posting it first if it does not exist yet
    fn refresh_board<T: Transport>(&mut self, transport: &T) {
        let message = self.board_message();
        match self.board {
            Some(message_id) => transport.edit_message(self.chat.into(), message_id, &message),
            None => self.board = transport.send_message(self.chat.into(), &message),
        }
    }
}

impl Game {
    /// Creates a forming game with its creator as the first player
    ///
    /// # Arguments
    ///
    /// * `id` - Identifier, unique among live games
    /// * `chat` - The group chat the game belongs to
    /// * `creator` - The player who created the game and may start it
    /// * `options` - Game configuration
    /// * `rng` - Random source for teams, scenarios and slot order
    pub fn new(
        id: GameId,
        chat: ChatId,
        creator: &Participant,
        options: Options,
        rng: fastrand::Rng,
    ) -> Self {
        let mut names = Names::default();
        names.set_name(creator.id, &creator.name);

        Self {
            id,
            chat,
            creator: creator.id,
            options,
            names,
            players: vec![creator.id],
            board: None,
            state: State::Forming,
            rng,
            last_activity: SystemTime::now(),
        }
    }

    /// Posts the status board to the game's chat
    pub fn open<T: Transport>(&mut self, transport: &T) {
        tracing::info!(game = %self.id, chat = %self.chat, creator = %self.creator, "game created");
        self.refresh_board(transport);
    }

    /// Adds a player to a forming game
    ///
    /// # Returns
    ///
    /// The number of players after joining
    ///
    /// # Errors
    ///
    /// * `Error::GameFinished` / `Error::GameAlreadyStarted` - Not forming
    /// * `Error::DuplicateJoin` - The player already joined
    /// * `Error::GameFull` - The player limit is reached
    pub fn join<T: Transport>(
        &mut self,
        participant: &Participant,
        transport: &T,
    ) -> Result<usize, Error> {
        match self.state {
            State::Forming => {}
            State::Active(_) => return Err(Error::GameAlreadyStarted),
            State::Finished { .. } => return Err(Error::GameFinished),
        }

        if self.is_member(participant.id) {
            return Err(Error::DuplicateJoin);
        }

        if self.players.len() >= constants::game::MAX_PLAYER_COUNT {
            return Err(Error::GameFull);
        }

        self.players.push(participant.id);
        self.names.set_name(participant.id, &participant.name);
        self.touch();

        tracing::info!(game = %self.id, player = %participant.id, count = self.players.len(), "player joined");

        self.refresh_board(transport);

        Ok(self.players.len())
    }

    /// Starts the game: forms teams, picks the scenarios and deals the
    /// first round's slots
    ///
    /// # Errors
    ///
    /// * `Error::GameFinished` / `Error::GameAlreadyStarted` - Not forming
    /// * `Error::Forbidden` - `requester` is not the creator
    pub fn start<T: Transport>(
        &mut self,
        requester: PlayerId,
        catalog: &Catalog,
        transport: &T,
    ) -> Result<(), Error> {
        match self.state {
            State::Forming => {}
            State::Active(_) => return Err(Error::GameAlreadyStarted),
            State::Finished { .. } => return Err(Error::GameFinished),
        }

        if requester != self.creator {
            return Err(Error::Forbidden);
        }

        self.touch();

        let scenarios = catalog.instantiate_rounds(
            self.options.rounds,
            self.options.selection,
            self.options.variant,
            &mut self.rng,
        );

        let Some(first) = scenarios.first().cloned() else {
            self.finish(0, transport);
            return Ok(());
        };

        let groups = teams::form_teams(&self.players, self.options.max_team_size, &mut self.rng);
        let mut generated = self.options.team_names.team_names(groups.len()).into_iter();

        let mut teams = groups
            .iter()
            .map(|members| {
                let name = match members.as_slice() {
                    [solo] => self.names.get_name(*solo),
                    _ => generated.next().unwrap_or_default(),
                };
                Team::new(name, members, first.clone())
            })
            .collect_vec();

        let player_to_team = groups
            .iter()
            .enumerate()
            .flat_map(|(index, members)| members.iter().map(move |&player| (player, index)))
            .collect();

        let instructions = teams
            .iter_mut()
            .flat_map(|team| team.assign_slots(&mut self.rng))
            .collect_vec();

        tracing::info!(
            game = %self.id,
            players = self.players.len(),
            teams = teams.len(),
            rounds = scenarios.len(),
            "game started"
        );

        self.state = State::Active(Box::new(Rounds {
            scenarios,
            index: 0,
            teams,
            player_to_team,
        }));

        self.refresh_board(transport);
        send_instructions(&instructions, transport);

        Ok(())
    }

    /// Handles an image sent by a player
    ///
    /// The image fills the player's active slot. When that completes every
    /// team's picture, the round is revealed and the next one begins before
    /// this method returns.
    ///
    /// # Errors
    ///
    /// * `Error::NotStarted` - The game is still forming
    /// * `Error::GameFinished` - The game is over
    /// * `Error::NoActiveSlot` - The player is not on any team
    pub fn submit_image<C: Composer, T: Transport>(
        &mut self,
        player: PlayerId,
        image: Image,
        composer: &C,
        transport: &T,
    ) -> Result<Submission, Error> {
        let rounds = match &mut self.state {
            State::Forming => return Err(Error::NotStarted),
            State::Finished { .. } => return Err(Error::GameFinished),
            State::Active(rounds) => rounds,
        };

        let Some(&team) = rounds.player_to_team.get(&player) else {
            return Err(Error::NoActiveSlot);
        };

        let submission = match rounds.teams[team].fill(player, image) {
            Fill::NothingPending => return Ok(Submission::PlayerDone),
            Fill::Next(instruction) => {
                send_instructions(std::slice::from_ref(&instruction), transport);
                Submission::InstructionSent
            }
            Fill::Done => Submission::PlayerDone,
        };

        self.last_activity = SystemTime::now();

        tracing::debug!(game = %self.id, %player, round = rounds.index, ?submission, "image submitted");

        if !rounds.is_complete() {
            return Ok(submission);
        }

        reveal::reveal_round(
            self.chat,
            rounds.index,
            &rounds.teams,
            composer,
            transport,
            self.options.reveal_pause,
        );

        match rounds.advance(&mut self.rng) {
            Some(instructions) => {
                tracing::info!(game = %self.id, round = rounds.index, "next round started");
                send_instructions(&instructions, transport);
                transport.send_message(
                    self.chat.into(),
                    &Message::NextRound {
                        round: rounds.index,
                        rounds: rounds.len(),
                    },
                );
            }
            None => {
                let played = rounds.len();
                self.finish(played, transport);
            }
        }

        Ok(submission)
    }

    fn finish<T: Transport>(&mut self, rounds: usize, transport: &T) {
        self.state = State::Finished { rounds };
        tracing::info!(game = %self.id, rounds, "game finished");
        transport.send_message(self.chat.into(), &Message::Complete);
    }
}

fn send_instructions<T: Transport>(instructions: &[Instruction], transport: &T) {
    for instruction in instructions {
        transport.send_message(
            Target::Player(instruction.player),
            &Message::Instruction {
                prompt: instruction.prompt.clone(),
            },
        );
    }
}
