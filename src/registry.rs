//! Routing of chat events to running games
//!
//! The registry owns every live [`Game`] and the lookup tables that map a
//! group chat or a player to the game they belong to. Each game sits behind
//! its own lock, so events for one game are handled one at a time while
//! different games run in parallel.

use std::{
    hash::Hash,
    sync::{Arc, Mutex, MutexGuard, TryLockError},
};

use dashmap::{DashMap, mapref::entry::Entry};
use enum_map::EnumMap;
use garde::Validate;
use itertools::Itertools;
use serde::Serialize;
use web_time::{Duration, SystemTime};

use crate::{
    catalog::Catalog,
    compose::Composer,
    game::{Error, Game, Options, Phase, Submission},
    game_id::GameId,
    scenario::Image,
    session::{ChatId, Participant, PlayerId, Transport},
};

/// An inbound event from the chat platform
#[derive(Debug, Clone)]
pub enum Event {
    /// Create a game in a chat
    Create {
        /// The group chat
        chat: ChatId,
        /// Who asked for the game
        creator: Participant,
    },
    /// Join the game running in a chat
    Join {
        /// The group chat
        chat: ChatId,
        /// Who is joining
        player: Participant,
    },
    /// Start the game running in a chat
    Start {
        /// The group chat
        chat: ChatId,
        /// Who asked to start
        requester: PlayerId,
    },
    /// An image sent privately by a player
    Submit {
        /// The sender
        player: PlayerId,
        /// The received image
        image: Image,
    },
}

/// Successful outcome of an [`Event`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Reply {
    /// A game was created
    Created(GameId),
    /// The player joined; carries the new player count
    Joined(usize),
    /// The game was started
    Started,
    /// The image was accepted
    Submitted(Submission),
}

type SharedGame = Arc<Mutex<Game>>;

/// Id draws before giving up on finding a free one
const MAX_ID_ATTEMPTS: usize = 64;

/// The set of live games and their routes
#[derive(Debug)]
pub struct Registry {
    catalog: Arc<Catalog>,
    options: Options,
    games: DashMap<GameId, SharedGame>,
    chats: DashMap<ChatId, GameId>,
    players: DashMap<PlayerId, GameId>,
    rng: Mutex<fastrand::Rng>,
}

fn lock(game: &Mutex<Game>) -> Result<MutexGuard<'_, Game>, Error> {
    game.lock().map_err(|_| Error::Unavailable)
}

/// Restores the route of `key` to `previous` if it still points at `id`
fn release<K: Eq + Hash>(
    routes: &DashMap<K, GameId>,
    key: K,
    id: GameId,
    previous: Option<GameId>,
) {
    if let Entry::Occupied(mut entry) = routes.entry(key) {
        if *entry.get() == id {
            match previous {
                Some(previous) => {
                    entry.insert(previous);
                }
                None => {
                    entry.remove();
                }
            }
        }
    }
}

impl Registry {
    /// Creates an empty registry whose games use `options`
    ///
    /// # Errors
    ///
    /// Returns the validation report if `options` are out of bounds.
    pub fn new(catalog: Catalog, options: Options) -> Result<Self, garde::Report> {
        Self::with_rng(catalog, options, fastrand::Rng::new())
    }

    /// Like [`Registry::new`] with an explicit random source, from which
    /// every game's own random source is seeded
    ///
    /// # Errors
    ///
    /// Returns the validation report if `options` are out of bounds.
    pub fn with_rng(
        catalog: Catalog,
        options: Options,
        rng: fastrand::Rng,
    ) -> Result<Self, garde::Report> {
        options.validate()?;

        Ok(Self {
            catalog: Arc::new(catalog),
            options,
            games: DashMap::new(),
            chats: DashMap::new(),
            players: DashMap::new(),
            rng: Mutex::new(rng),
        })
    }

    /// The scenario catalog games draw from
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Options applied to new games
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Number of games held, finished ones included until pruned
    pub fn len(&self) -> usize {
        self.games.len()
    }

    /// Whether no games are held
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// The game with the given id
    pub fn game(&self, id: GameId) -> Option<SharedGame> {
        self.games.get(&id).map(|game| Arc::clone(game.value()))
    }

    /// The id of the game last created in `chat`
    pub fn game_for_chat(&self, chat: ChatId) -> Option<GameId> {
        self.chats.get(&chat).map(|id| *id)
    }

    /// The id of the game `player` last joined
    pub fn game_for_player(&self, player: PlayerId) -> Option<GameId> {
        self.players.get(&player).map(|id| *id)
    }

    /// Whether the game exists and has not finished
    ///
    /// A game busy with another event counts as live.
    fn is_live(&self, id: GameId) -> Result<bool, Error> {
        let Some(game) = self.game(id) else {
            return Ok(false);
        };

        match game.try_lock() {
            Ok(game) => Ok(game.phase() != Phase::Finished),
            Err(TryLockError::WouldBlock) => Ok(true),
            Err(TryLockError::Poisoned(_)) => Err(Error::Unavailable),
        }
    }

    /// Points `key` at `id` unless it routes to another unfinished game
    ///
    /// The route is only swapped if it did not change since it was checked;
    /// a game never leaves `Finished`, so the check cannot go stale.
    ///
    /// # Returns
    ///
    /// The previous route, for [`release`]
    fn claim<K: Eq + Hash + Copy>(
        &self,
        routes: &DashMap<K, GameId>,
        key: K,
        id: GameId,
        taken: Error,
    ) -> Result<Option<GameId>, Error> {
        loop {
            let current = routes.get(&key).map(|route| *route);

            if let Some(other) = current {
                if other != id && self.is_live(other)? {
                    return Err(taken);
                }
            }

            match routes.entry(key) {
                Entry::Occupied(mut entry) if Some(*entry.get()) == current => {
                    entry.insert(id);
                    return Ok(current);
                }
                Entry::Vacant(entry) if current.is_none() => {
                    entry.insert(id);
                    return Ok(None);
                }
                _ => {}
            }
        }
    }

    /// Inserts a fresh game under an unused id
    fn insert_game(
        &self,
        chat: ChatId,
        creator: &Participant,
    ) -> Result<(GameId, SharedGame), Error> {
        let mut rng = self.rng.lock().map_err(|_| Error::Unavailable)?;

        for _ in 0..MAX_ID_ATTEMPTS {
            let id = GameId::generate(&mut rng);
            if let Entry::Vacant(entry) = self.games.entry(id) {
                let game = Arc::new(Mutex::new(Game::new(
                    id,
                    chat,
                    creator,
                    self.options,
                    fastrand::Rng::with_seed(rng.u64(..)),
                )));
                entry.insert(Arc::clone(&game));
                return Ok((id, game));
            }
        }

        tracing::warn!(games = self.games.len(), "no free game id");
        Err(Error::Unavailable)
    }

    /// Creates a game in `chat` and posts its status board
    ///
    /// # Errors
    ///
    /// * `Error::GameInProgress` - The chat has an unfinished game
    /// * `Error::AlreadyPlaying` - The creator is in another unfinished game
    /// * `Error::Unavailable` - No free game id, or a lock was poisoned
    pub fn create<T: Transport>(
        &self,
        chat: ChatId,
        creator: &Participant,
        transport: &T,
    ) -> Result<GameId, Error> {
        let (id, game) = self.insert_game(chat, creator)?;

        let previous_chat = match self.claim(&self.chats, chat, id, Error::GameInProgress) {
            Ok(previous) => previous,
            Err(error) => {
                self.games.remove(&id);
                return Err(error);
            }
        };

        if let Err(error) = self.claim(&self.players, creator.id, id, Error::AlreadyPlaying) {
            release(&self.chats, chat, id, previous_chat);
            self.games.remove(&id);
            return Err(error);
        }

        lock(&game)?.open(transport);

        Ok(id)
    }

    /// Adds a player to the game running in `chat`
    ///
    /// # Returns
    ///
    /// The number of players after joining
    ///
    /// # Errors
    ///
    /// * `Error::NoActiveSession` - The chat has no game
    /// * `Error::AlreadyPlaying` - The player is in another unfinished game
    /// * Any error of [`Game::join`]
    pub fn join<T: Transport>(
        &self,
        chat: ChatId,
        participant: &Participant,
        transport: &T,
    ) -> Result<usize, Error> {
        let (id, game) = self.route_chat(chat)?;

        let previous = self.claim(&self.players, participant.id, id, Error::AlreadyPlaying)?;

        let joined = lock(&game).and_then(|mut game| game.join(participant, transport));
        if joined.is_err() {
            release(&self.players, participant.id, id, previous);
        }

        joined
    }

    /// Starts the game running in `chat`
    ///
    /// # Errors
    ///
    /// * `Error::NoActiveSession` - The chat has no game
    /// * Any error of [`Game::start`]
    pub fn start<T: Transport>(
        &self,
        chat: ChatId,
        requester: PlayerId,
        transport: &T,
    ) -> Result<(), Error> {
        let (_, game) = self.route_chat(chat)?;
        lock(&game)?.start(requester, &self.catalog, transport)
    }

    /// Hands an image to the game the player is in
    ///
    /// # Errors
    ///
    /// * `Error::NoActiveSession` - The player is in no game
    /// * Any error of [`Game::submit_image`]
    pub fn submit_image<C: Composer, T: Transport>(
        &self,
        player: PlayerId,
        image: Image,
        composer: &C,
        transport: &T,
    ) -> Result<Submission, Error> {
        let game = self
            .game_for_player(player)
            .and_then(|id| self.game(id))
            .ok_or(Error::NoActiveSession)?;

        lock(&game)?.submit_image(player, image, composer, transport)
    }

    /// Dispatches an event to the matching operation
    ///
    /// # Errors
    ///
    /// Whatever the dispatched operation returns.
    pub fn handle<C: Composer, T: Transport>(
        &self,
        event: Event,
        composer: &C,
        transport: &T,
    ) -> Result<Reply, Error> {
        match event {
            Event::Create { chat, creator } => {
                self.create(chat, &creator, transport).map(Reply::Created)
            }
            Event::Join { chat, player } => {
                self.join(chat, &player, transport).map(Reply::Joined)
            }
            Event::Start { chat, requester } => {
                self.start(chat, requester, transport).map(|()| Reply::Started)
            }
            Event::Submit { player, image } => self
                .submit_image(player, image, composer, transport)
                .map(Reply::Submitted),
        }
    }

    fn route_chat(&self, chat: ChatId) -> Result<(GameId, SharedGame), Error> {
        self.game_for_chat(chat)
            .and_then(|id| self.game(id).map(|game| (id, game)))
            .ok_or(Error::NoActiveSession)
    }

    fn snapshot(&self) -> Vec<(GameId, SharedGame)> {
        self.games
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect_vec()
    }

    /// Counts the held games per phase
    ///
    /// Games whose lock is poisoned are not counted.
    pub fn census(&self) -> EnumMap<Phase, usize> {
        let mut census = EnumMap::default();
        for (_, game) in self.snapshot() {
            if let Ok(game) = game.lock() {
                census[game.phase()] += 1;
            }
        }
        census
    }

    fn prune_where(&self, mut condition: impl FnMut(&Game) -> bool) -> usize {
        let doomed = self
            .snapshot()
            .into_iter()
            .filter(|(_, game)| game.lock().map_or(true, |game| condition(&*game)))
            .map(|(id, _)| id)
            .collect_vec();

        if doomed.is_empty() {
            return 0;
        }

        for id in &doomed {
            self.games.remove(id);
        }
        self.chats.retain(|_, id| !doomed.contains(id));
        self.players.retain(|_, id| !doomed.contains(id));

        tracing::info!(pruned = doomed.len(), remaining = self.games.len(), "pruned games");

        doomed.len()
    }

    /// Drops finished games and their routes
    ///
    /// Games whose lock is poisoned are dropped as well.
    ///
    /// # Returns
    ///
    /// The number of games dropped
    pub fn prune_finished(&self) -> usize {
        self.prune_where(|game| game.phase() == Phase::Finished)
    }

    /// Drops games, finished or not, that saw no accepted event for at
    /// least `max_idle`
    ///
    /// # Returns
    ///
    /// The number of games dropped
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        let now = SystemTime::now();
        self.prune_where(|game| {
            now.duration_since(game.last_activity())
                .unwrap_or_default()
                >= max_idle
        })
    }
}
