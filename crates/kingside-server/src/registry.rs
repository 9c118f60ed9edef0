//! Central session registry.
//!
//! One registry task owns every player record, game session, and the lobby.
//! Connections, tickers, and the accept loop talk to it exclusively through
//! the command mailbox, so all state mutation is serialized on this task and
//! games never need interior locking.

use std::collections::HashMap;

use rand::thread_rng;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use kingside_protocol::{
    decode_client_message, ClientMessage, GameId, GameMode, LobbyGame, PlayerId, ServerMessage,
    TimeControl, TimeControlName,
};

use crate::config::ServerConfig;
use crate::errors::SessionError;
use crate::game::{spawn_ticker, GameSession, GameStatus, TickOutcome};
use crate::lobby::Lobby;

/// Sender half of a connection's outbound queue.
pub type OutboundSender = mpsc::UnboundedSender<ServerMessage>;

/// Mailbox commands. Everything that mutates registry state arrives here.
pub enum Command {
    /// A new connection; the reply carries its assigned player id.
    Connect {
        out: OutboundSender,
        reply: oneshot::Sender<PlayerId>,
    },
    /// A raw text frame from a connection.
    Inbound { player: PlayerId, raw: String },
    /// The connection closed or failed.
    Disconnect { player: PlayerId },
    /// Periodic tick from a game's clock ticker task.
    ClockTick { game: GameId },
}

struct PlayerRecord {
    name: Option<String>,
    out: OutboundSender,
    /// The game this player is seated in, if any.
    game: Option<GameId>,
}

pub struct Registry {
    config: ServerConfig,
    players: HashMap<PlayerId, PlayerRecord>,
    games: HashMap<GameId, GameSession>,
    lobby: Lobby,
    /// Handed to clock tickers so their ticks land in this mailbox.
    commands: mpsc::UnboundedSender<Command>,
}

impl Registry {
    /// Build the registry and its mailbox. The receiver goes to [`run`];
    /// clones of the sender go to connections.
    pub fn new(
        config: ServerConfig,
    ) -> (
        Self,
        mpsc::UnboundedSender<Command>,
        mpsc::UnboundedReceiver<Command>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let registry = Self {
            config,
            players: HashMap::new(),
            games: HashMap::new(),
            lobby: Lobby::default(),
            commands: tx.clone(),
        };
        (registry, tx, rx)
    }

    /// Drain the mailbox until every sender is gone.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            self.handle(command);
        }
    }

    /// Apply one command. Synchronous: the registry never awaits while
    /// holding state.
    pub fn handle(&mut self, command: Command) {
        match command {
            Command::Connect { out, reply } => {
                let id = self.connect(out);
                let _ = reply.send(id);
            }
            Command::Inbound { player, raw } => self.handle_inbound(player, &raw),
            Command::Disconnect { player } => self.disconnect(player),
            Command::ClockTick { game } => self.handle_clock_tick(game),
        }
    }

    fn connect(&mut self, out: OutboundSender) -> PlayerId {
        let id = PlayerId::new();
        self.players.insert(
            id,
            PlayerRecord {
                name: None,
                out,
                game: None,
            },
        );
        info!(player = %id, "player connected");
        id
    }

    fn handle_inbound(&mut self, player: PlayerId, raw: &str) {
        if !self.players.contains_key(&player) {
            debug!(player = %player, "frame from unknown player dropped");
            return;
        }

        let message = match decode_client_message(raw) {
            Ok(message) => message,
            Err(err) => {
                debug!(player = %player, error = %err, "undecodable frame");
                self.send_error(player, err.into());
                return;
            }
        };

        let result = match message {
            ClientMessage::Register { name } => {
                self.register(player, name);
                Ok(())
            }
            ClientMessage::GetWaitingGames {} => {
                self.send_lobby_view(player);
                Ok(())
            }
            ClientMessage::CreateGame { mode, time_control } => {
                self.create_game(player, mode, time_control)
            }
            ClientMessage::JoinGame { game_id } => self.join_game(player, game_id),
            ClientMessage::MakeMove {
                game_id, from, to, ..
            } => self.make_move(player, game_id, &from, &to),
            ClientMessage::OfferDraw { game_id } => self.offer_draw(player, game_id),
            ClientMessage::AcceptDraw { game_id } => self.accept_draw(player, game_id),
            ClientMessage::DeclineDraw { game_id } => self.decline_draw(player, game_id),
            ClientMessage::Resign { game_id } => self.resign(player, game_id),
        };

        if let Err(err) = result {
            self.send_error(player, err);
        }
    }

    fn register(&mut self, player: PlayerId, name: String) {
        if let Some(record) = self.players.get_mut(&player) {
            info!(player = %player, name = %name, "player registered");
            record.name = Some(name);
        }
    }

    fn create_game(
        &mut self,
        player: PlayerId,
        mode: GameMode,
        time_control: TimeControl,
    ) -> Result<(), SessionError> {
        let Some(record) = self.players.get_mut(&player) else {
            return Ok(());
        };

        let id = GameId::new();
        let (session, seat) =
            GameSession::new(id, player, mode, &time_control, &mut thread_rng());
        let created = ServerMessage::GameCreated {
            game_id: id,
            color: seat,
            position: session.rules.position(),
            time_control: session.clock.pair(),
        };

        record.game = Some(id);
        self.games.insert(id, session);
        self.lobby.add_waiting(id);

        info!(game = %id, player = %player, ?mode, "game created");
        self.send(player, created);
        self.broadcast_lobby();
        Ok(())
    }

    fn join_game(&mut self, player: PlayerId, game_id: GameId) -> Result<(), SessionError> {
        let session = self.games.get_mut(&game_id).ok_or(SessionError::GameNotFound)?;
        if session.status != GameStatus::Waiting {
            return Err(SessionError::GameUnavailable);
        }
        if session.seat_of(player).is_some() {
            return Err(SessionError::JoinOwnGame);
        }
        if session.open_seat().is_none() {
            return Err(SessionError::GameFull);
        }

        let host = session.seated_player();
        let seat = session.start(player);
        session.clock_task = Some(spawn_ticker(
            game_id,
            &self.config.clock,
            self.commands.clone(),
        ));
        let position = session.rules.position();
        let clocks = session.clock.pair();

        self.lobby.remove_waiting(game_id);
        if let Some(record) = self.players.get_mut(&player) {
            record.game = Some(game_id);
        }

        let joiner_name = self.name_of(player);
        let host_name = host.and_then(|h| self.name_of(h));

        self.send(
            player,
            ServerMessage::GameJoined {
                game_id,
                color: seat,
                position,
                opponent: host_name,
                time_control: clocks,
            },
        );
        if let Some(host) = host {
            self.send(
                host,
                ServerMessage::OpponentJoined {
                    opponent: joiner_name,
                    time_control: clocks,
                },
            );
        }

        info!(game = %game_id, player = %player, seat = %seat, "game started");
        self.broadcast_lobby();
        Ok(())
    }

    fn make_move(
        &mut self,
        player: PlayerId,
        game_id: GameId,
        from: &str,
        to: &str,
    ) -> Result<(), SessionError> {
        let session = self.games.get_mut(&game_id).ok_or(SessionError::GameNotFound)?;
        if session.status != GameStatus::Playing {
            return Err(SessionError::GameNotFound);
        }
        let seat = session.seat_of(player).ok_or(SessionError::GameNotFound)?;
        if seat != session.rules.side_to_move() {
            return Err(SessionError::NotYourTurn);
        }

        let applied = session
            .rules
            .try_move(from, to)
            .map_err(|_| SessionError::InvalidMove)?;
        session.clock.on_move(seat);

        // A move by the non-offering side supersedes the pending offer.
        if matches!(session.draw_offer, Some(offerer) if offerer != seat) {
            session.clear_draw_offer();
        }

        let terminal = session.rules.terminal();
        let message = ServerMessage::MoveMade {
            mv: kingside_protocol::MoveDesc {
                from: applied.from.clone(),
                to: applied.to.clone(),
                piece: applied.piece,
                color: applied.color,
            },
            position: session.rules.position(),
            time_left: session.clock.pair(),
            next_turn: session.rules.side_to_move(),
            stats: self.lobby.record_move(&applied),
        };
        let seats = [session.white, session.black];

        for occupant in seats.into_iter().flatten() {
            self.send(occupant, message.clone());
        }

        if let Some(terminal) = terminal {
            self.end_game(game_id, terminal.result_string());
        }
        Ok(())
    }

    fn offer_draw(&mut self, player: PlayerId, game_id: GameId) -> Result<(), SessionError> {
        let session = self.games.get_mut(&game_id).ok_or(SessionError::GameNotFound)?;
        if session.status != GameStatus::Playing {
            return Err(SessionError::GameNotFound);
        }
        let seat = session.seat_of(player).ok_or(SessionError::GameNotFound)?;
        let opponent = session
            .occupant(seat.opposite())
            .ok_or(SessionError::OpponentNotFound)?;

        session.offer_draw(seat);
        info!(game = %game_id, player = %player, "draw offered");
        self.send(opponent, ServerMessage::DrawOffered {});
        Ok(())
    }

    fn accept_draw(&mut self, player: PlayerId, game_id: GameId) -> Result<(), SessionError> {
        let session = self.games.get(&game_id).ok_or(SessionError::GameNotFound)?;
        if session.status != GameStatus::Playing {
            return Err(SessionError::GameNotFound);
        }
        let seat = session.seat_of(player).ok_or(SessionError::GameNotFound)?;
        if !session.can_answer_draw(seat) {
            return Err(SessionError::NoValidDrawOffer);
        }

        self.end_game(game_id, "Draw by agreement".into());
        Ok(())
    }

    fn decline_draw(&mut self, player: PlayerId, game_id: GameId) -> Result<(), SessionError> {
        let session = self.games.get_mut(&game_id).ok_or(SessionError::GameNotFound)?;
        if session.status != GameStatus::Playing {
            return Err(SessionError::GameNotFound);
        }
        let seat = session.seat_of(player).ok_or(SessionError::GameNotFound)?;
        if !session.can_answer_draw(seat) {
            return Err(SessionError::NoValidDrawOffer);
        }

        session.clear_draw_offer();
        let opponent = session.occupant(seat.opposite());
        info!(game = %game_id, player = %player, "draw declined");
        if let Some(opponent) = opponent {
            self.send(opponent, ServerMessage::DrawDeclined {});
        }
        Ok(())
    }

    fn resign(&mut self, player: PlayerId, game_id: GameId) -> Result<(), SessionError> {
        let session = self.games.get(&game_id).ok_or(SessionError::GameNotFound)?;
        if session.status != GameStatus::Playing {
            return Err(SessionError::GameNotFound);
        }
        let seat = session.seat_of(player).ok_or(SessionError::GameNotFound)?;

        self.end_game(game_id, format!("{} wins by resignation", seat.opposite()));
        Ok(())
    }

    fn handle_clock_tick(&mut self, game_id: GameId) {
        let Some(session) = self.games.get_mut(&game_id) else {
            return;
        };
        if session.status != GameStatus::Playing {
            return;
        }

        let side = session.rules.side_to_move();
        if session.clock.tick(side, &self.config.clock) == TickOutcome::Expired {
            self.end_game(game_id, format!("{} wins on time", side.opposite()));
        }
    }

    /// Terminal transition: notify both seats, unbind them, drop the game.
    /// Safe to call more than once per game.
    fn end_game(&mut self, game_id: GameId, result: String) {
        let Some(session) = self.games.get_mut(&game_id) else {
            return;
        };
        if !session.end() {
            return;
        }
        let seats = [session.white, session.black];

        info!(game = %game_id, result = %result, "game ended");
        for occupant in seats.into_iter().flatten() {
            self.send(occupant, ServerMessage::GameOver {
                result: result.clone(),
            });
            if let Some(record) = self.players.get_mut(&occupant) {
                record.game = None;
            }
        }

        self.lobby.remove_waiting(game_id);
        self.games.remove(&game_id);
    }

    fn disconnect(&mut self, player: PlayerId) {
        let Some(record) = self.players.remove(&player) else {
            return;
        };
        info!(player = %player, "player disconnected");

        if let Some(game_id) = record.game {
            match self.games.get(&game_id).map(|s| s.status) {
                Some(GameStatus::Waiting) => {
                    // An unjoined game vanishes without ceremony.
                    self.lobby.remove_waiting(game_id);
                    self.games.remove(&game_id);
                }
                Some(GameStatus::Playing) => {
                    let seat = self
                        .games
                        .get(&game_id)
                        .and_then(|s| s.seat_of(player));
                    if let Some(seat) = seat {
                        self.end_game(game_id, format!("{} wins by disconnection", seat.opposite()));
                    }
                }
                _ => {}
            }
        }

        self.broadcast_lobby();
    }

    /// Current lobby view: waiting games in creation order plus the
    /// process-wide counters.
    fn lobby_view(&self) -> ServerMessage {
        let games: Vec<LobbyGame> = self
            .lobby
            .waiting_ids()
            .filter_map(|id| {
                let session = self.games.get(&id)?;
                let host_name = session.seated_player().and_then(|host| self.name_of(host));
                Some(LobbyGame {
                    id,
                    host_name,
                    mode: session.mode,
                    time_control: TimeControlName::from_seconds(
                        session.clock.white,
                        session.clock.increment,
                    ),
                })
            })
            .collect();
        ServerMessage::WaitingGames {
            games,
            global_stats: self.lobby.stats(),
        }
    }

    fn send_lobby_view(&mut self, player: PlayerId) {
        let view = self.lobby_view();
        self.send(player, view);
    }

    /// Push the lobby view to every player not seated in a game.
    fn broadcast_lobby(&mut self) {
        let view = self.lobby_view();
        for record in self.players.values().filter(|r| r.game.is_none()) {
            let _ = record.out.send(view.clone());
        }
    }

    fn name_of(&self, player: PlayerId) -> Option<String> {
        self.players.get(&player).and_then(|r| r.name.clone())
    }

    fn send(&self, player: PlayerId, message: ServerMessage) {
        if let Some(record) = self.players.get(&player) {
            // A dead connection just drops the message; Disconnect follows.
            let _ = record.out.send(message);
        }
    }

    fn send_error(&self, player: PlayerId, err: SessionError) {
        self.send(player, err.to_message());
    }
}
