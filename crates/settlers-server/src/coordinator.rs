//! Per-match coordinator.
//!
//! One coordinator task runs per started session. It owns the session's
//! inbound mailbox, the board and the development deck, and walks the match
//! through its phases:
//!
//! 1. Announce: `startgui`, the board and the turn order to everyone.
//! 2. Setup: each player places a settlement and a road, once in turn order
//!    and once in reverse (snake draft).
//! 3. Initial resources: each player publishes two updates.
//! 4. Turn loop: dice, then either the discard/robber sequence on a 7 or
//!    resource distribution, then the free-build loop until `end`.
//! 5. A declared winner is announced, followed by `quit` to everyone.
//!
//! The only await point is the inbound mailbox. A `quit` from any player is
//! honored wherever the coordinator is waiting and ends the match at once.
//!
//! The coordinator enforces who may speak and which messages fit the
//! current step. Game-rule legality (costs, placement, points) is left to
//! the clients.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use settlers_core::{
    BoardLayout, ClientMessage, DevelopmentDeck, DiscardResponse, GameUpdate, PlayerColor,
    ResourceBundle, ServerMessage, UpdateKind,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::mailbox::InboxReceiver;
use crate::registry::SessionRegistry;
use crate::session::{MatchStart, Player, Session, SessionPhase};

/// Source of dice rolls for a match.
pub trait DiceRoller: Send {
    /// Roll two dice, each in 1..=6
    fn roll(&mut self) -> (u8, u8);
}

/// Two fair, independent dice.
#[derive(Debug)]
pub struct RandomDice(StdRng);

impl RandomDice {
    pub fn new() -> Self {
        Self(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl Default for RandomDice {
    fn default() -> Self {
        Self::new()
    }
}

impl DiceRoller for RandomDice {
    fn roll(&mut self) -> (u8, u8) {
        (self.0.gen_range(1..=6), self.0.gen_range(1..=6))
    }
}

/// How a match ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// A player declared victory
    Won { name: String },
    /// A player quit
    Quit { by: PlayerColor },
    /// The inbound mailbox closed underneath the coordinator
    Aborted,
}

/// Why the coordinator stopped before the match was won.
#[derive(Debug)]
enum Halt {
    /// Player at this index quit
    Quit(usize),
    /// Every inbox sender is gone
    Closed,
}

/// What happened at the end of a turn.
enum TurnEnd {
    Next,
    GameOver(String),
}

/// The match state machine for one session.
pub struct Coordinator {
    session: Arc<Session>,
    registry: Arc<SessionRegistry>,
    inbox: InboxReceiver,
    /// Seated players, ordered by seat
    players: Vec<Player>,
    /// Indices into `players`, in turn order
    order: Vec<usize>,
    board: BoardLayout,
    deck: DevelopmentDeck,
    dice: Box<dyn DiceRoller>,
}

impl Coordinator {
    /// Build a coordinator with a random turn order.
    pub fn new(
        session: Arc<Session>,
        registry: Arc<SessionRegistry>,
        start: MatchStart,
        dice: Box<dyn DiceRoller>,
    ) -> Self {
        let mut order: Vec<usize> = (0..start.players.len()).collect();
        order.shuffle(&mut rand::thread_rng());

        Self {
            session,
            registry,
            inbox: start.inbox,
            players: start.players,
            order,
            board: start.board,
            deck: start.deck,
            dice,
        }
    }

    /// Colors in turn order
    pub fn turn_order(&self) -> Vec<PlayerColor> {
        self.order.iter().map(|&i| self.players[i].color).collect()
    }

    /// Run the match on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        let span = info_span!("match", code = %self.session.code());
        tokio::spawn(
            async move {
                let outcome = self.run().await;
                info!(?outcome, "Match finished");
            }
            .instrument(span),
        )
    }

    /// Drive the match to its end, then tear the session down.
    pub async fn run(mut self) -> MatchOutcome {
        let outcome = match self.play().await {
            Ok(name) => {
                self.broadcast(ServerMessage::Quit { by: None });
                MatchOutcome::Won { name }
            }
            Err(Halt::Quit(idx)) => {
                let color = self.players[idx].color;
                info!(color = %color, name = %self.players[idx].name, "Player quit");
                self.broadcast_except(idx, ServerMessage::Quit { by: Some(color) });
                MatchOutcome::Quit { by: color }
            }
            Err(Halt::Closed) => {
                error!("Inbound mailbox closed, aborting match");
                self.broadcast(ServerMessage::Quit { by: None });
                MatchOutcome::Aborted
            }
        };

        self.session.set_phase(SessionPhase::GameOver).await;
        self.registry.remove(self.session.code()).await;
        outcome
    }

    async fn play(&mut self) -> Result<String, Halt> {
        self.broadcast(ServerMessage::StartGui);
        self.broadcast(ServerMessage::Board(self.board.clone()));
        self.broadcast(ServerMessage::TurnOrder(self.turn_order()));

        let forward = self.order.clone();
        let backward: Vec<usize> = forward.iter().rev().copied().collect();
        info!("Setup, forward round");
        self.setup_round(&forward).await?;
        info!("Setup, backward round");
        self.setup_round(&backward).await?;
        self.gather_initial_resources().await?;

        self.session.set_phase(SessionPhase::TurnLoop).await;
        let mut turn = 0;
        loop {
            let current = self.order[turn];
            if let TurnEnd::GameOver(name) = self.play_turn(current).await? {
                return Ok(name);
            }
            turn = (turn + 1) % self.order.len();
        }
    }

    async fn setup_round(&mut self, order: &[usize]) -> Result<(), Halt> {
        for &idx in order {
            self.send(idx, ServerMessage::PlaceSettlement);
            self.relay_next(idx, Some(UpdateKind::Settlement)).await?;
            self.relay_next(idx, None).await?;

            self.send(idx, ServerMessage::PlaceRoad);
            self.relay_next(idx, Some(UpdateKind::Road)).await?;
            self.relay_next(idx, None).await?;
        }
        Ok(())
    }

    async fn gather_initial_resources(&mut self) -> Result<(), Halt> {
        for idx in self.order.clone() {
            self.send(idx, ServerMessage::GatherStart);
            self.relay_next(idx, None).await?;
            self.relay_next(idx, None).await?;
        }
        Ok(())
    }

    async fn play_turn(&mut self, current: usize) -> Result<TurnEnd, Halt> {
        let color = self.players[current].color;
        debug!(color = %color, "Turn begins");
        self.send(current, ServerMessage::Turn);
        self.broadcast_except(current, ServerMessage::NotTurn { current: color });

        let (first, second) = self.dice.roll();
        self.broadcast(ServerMessage::Dice { first, second });

        if first + second == 7 {
            self.collect_discards().await?;
            self.send(current, ServerMessage::RobberPrompt);
            self.relay_next(current, Some(UpdateKind::Robber)).await?;
        } else {
            // Resource delta, then derived state, per player
            for idx in self.order.clone() {
                self.relay_next(idx, None).await?;
                self.relay_next(idx, None).await?;
            }
        }

        self.free_build(current).await
    }

    /// Wait for exactly one discard answer from every player.
    async fn collect_discards(&mut self) -> Result<(), Halt> {
        self.broadcast(ServerMessage::DiscardRequest);

        let mut pending = vec![true; self.players.len()];
        let mut remaining = self.players.len();
        while remaining > 0 {
            let (idx, msg) = self.next().await?;
            match msg {
                ClientMessage::Discard(response) if pending[idx] => {
                    pending[idx] = false;
                    remaining -= 1;
                    if let DiscardResponse::Cards(cards) = response {
                        if !cards.is_empty() {
                            let color = self.players[idx].color;
                            self.broadcast_except(idx, ServerMessage::Discarded { color, cards });
                        }
                    }
                }
                ClientMessage::Discard(_) => self.reject(idx, "discard already received"),
                other => self.reject(idx, format!("waiting for discards, got {other}")),
            }
        }
        Ok(())
    }

    async fn free_build(&mut self, current: usize) -> Result<TurnEnd, Halt> {
        loop {
            match self.next_from(current).await? {
                ClientMessage::EndTurn => {
                    self.relay_next(current, None).await?;
                    return Ok(TurnEnd::Next);
                }
                ClientMessage::DeclareWinner { name } => {
                    info!(name = %name, "Winner declared");
                    self.session.set_winner(name.clone()).await;
                    self.broadcast(ServerMessage::Winner { name: name.clone() });
                    return Ok(TurnEnd::GameOver(name));
                }
                ClientMessage::OfferTrade { offer, ask } => {
                    self.run_trade(current, offer, ask).await?;
                }
                ClientMessage::Steal { target } => {
                    self.resolve_steal(current, target).await?;
                }
                ClientMessage::DrawDevCard => match self.deck.draw() {
                    Ok(card) => {
                        debug!(remaining = self.deck.remaining(), "Development card drawn");
                        self.send(current, ServerMessage::DevCard(card));
                    }
                    Err(e) => self.reject(current, e),
                },
                ClientMessage::Update(update) => self.relay(current, update),
                other => self.reject(current, format!("unexpected message: {other}")),
            }
        }
    }

    async fn run_trade(
        &mut self,
        offerer: usize,
        offer: ResourceBundle,
        ask: ResourceBundle,
    ) -> Result<(), Halt> {
        if offer.is_empty() || ask.is_empty() {
            self.reject(offerer, "trade needs something offered and something asked");
            return Ok(());
        }

        let from = self.players[offerer].color;
        self.broadcast_except(
            offerer,
            ServerMessage::TradeOffered {
                from,
                offer: offer.clone(),
                ask: ask.clone(),
            },
        );

        // One reply from every other player
        let mut pending = vec![true; self.players.len()];
        pending[offerer] = false;
        let mut remaining = self.players.len() - 1;
        let mut accepters = Vec::new();
        while remaining > 0 {
            let (idx, msg) = self.next().await?;
            match msg {
                ClientMessage::TradeReply { accept } if pending[idx] => {
                    pending[idx] = false;
                    remaining -= 1;
                    if accept {
                        accepters.push(self.players[idx].color);
                    }
                }
                _ if idx == offerer => self.reject(idx, "waiting for trade replies"),
                _ if pending[idx] => self.reject(idx, "trade reply expected"),
                _ => self.reject(idx, "trade reply already received"),
            }
        }

        debug!(from = %from, accepters = ?accepters, "Trade replies collected");
        self.send(
            offerer,
            ServerMessage::TradeReplies {
                accepters: accepters.clone(),
            },
        );
        if accepters.is_empty() {
            self.broadcast_except(offerer, ServerMessage::TradeCancelled { from });
            return Ok(());
        }

        loop {
            match self.next_from(offerer).await? {
                ClientMessage::TradeWith { color } if accepters.contains(&color) => {
                    info!(from = %from, to = %color, "Trade executed");
                    self.broadcast(ServerMessage::Trade {
                        from,
                        to: color,
                        offer,
                        ask,
                    });
                    return Ok(());
                }
                ClientMessage::TradeCancel => {
                    self.broadcast(ServerMessage::TradeCancelled { from });
                    return Ok(());
                }
                ClientMessage::TradeWith { color } => {
                    self.reject(offerer, format!("{color} did not accept the trade"));
                }
                other => self.reject(offerer, format!("waiting for trade choice, got {other}")),
            }
        }
    }

    async fn resolve_steal(&mut self, thief: usize, target: PlayerColor) -> Result<(), Halt> {
        let Some(victim) = self.players.iter().position(|p| p.color == target) else {
            self.reject(thief, format!("no player is {target}"));
            return Ok(());
        };
        if victim == thief {
            self.reject(thief, "cannot steal from yourself");
            return Ok(());
        }

        let thief_color = self.players[thief].color;
        self.send(victim, ServerMessage::StealRequest { thief: thief_color });

        let card = loop {
            match self.next_from(victim).await? {
                ClientMessage::Reveal { card } => break card,
                other => self.reject(victim, format!("waiting for stolen card, got {other}")),
            }
        };

        self.send(
            thief,
            ServerMessage::StolenCard {
                victim: target,
                card,
            },
        );
        let lost = ServerMessage::CardLost {
            victim: target,
            thief: thief_color,
        };
        for (idx, player) in self.players.iter().enumerate() {
            if idx != thief && idx != victim {
                player.send(lost.clone());
            }
        }
        Ok(())
    }

    /// Receive the next update from `idx` and relay it to everyone else.
    async fn relay_next(&mut self, idx: usize, kind: Option<UpdateKind>) -> Result<(), Halt> {
        loop {
            match self.next_from(idx).await? {
                ClientMessage::Update(update) if kind.map_or(true, |k| update.kind == k) => {
                    self.relay(idx, update);
                    return Ok(());
                }
                other => {
                    let wanted = kind.map_or("an", |k| k.tag());
                    self.reject(idx, format!("expected {wanted} update, got {other}"));
                }
            }
        }
    }

    /// Next message from `expected`. Anyone else is told whose turn it is.
    async fn next_from(&mut self, expected: usize) -> Result<ClientMessage, Halt> {
        loop {
            let (idx, msg) = self.next().await?;
            if idx == expected {
                return Ok(msg);
            }
            let current = self.players[expected].color;
            warn!(color = %self.players[idx].color, waiting_on = %current, "Out-of-turn message");
            self.send(idx, ServerMessage::NotTurn { current });
        }
    }

    /// Next message from any seated player. `quit` halts the match.
    async fn next(&mut self) -> Result<(usize, ClientMessage), Halt> {
        loop {
            let envelope = self.inbox.receive().await.ok_or(Halt::Closed)?;
            let Some(idx) = self.index_of(envelope.from) else {
                warn!(token = %envelope.from, "Message from unknown player");
                continue;
            };
            if envelope.message.is_quit() {
                return Err(Halt::Quit(idx));
            }
            return Ok((idx, envelope.message));
        }
    }

    fn index_of(&self, token: Uuid) -> Option<usize> {
        self.players.iter().position(|p| p.token == token)
    }

    fn relay(&self, from: usize, update: GameUpdate) {
        let color = self.players[from].color;
        debug!(from = %color, update = %update, "Relay");
        self.broadcast_except(from, ServerMessage::Relay { from: color, update });
    }

    fn reject(&self, idx: usize, reason: impl std::fmt::Display) {
        warn!(color = %self.players[idx].color, reason = %reason, "Message rejected");
        self.send(idx, ServerMessage::rejected(reason));
    }

    fn send(&self, idx: usize, msg: ServerMessage) {
        self.players[idx].send(msg);
    }

    fn broadcast(&self, msg: ServerMessage) {
        for player in &self.players {
            player.send(msg.clone());
        }
    }

    fn broadcast_except(&self, except: usize, msg: ServerMessage) {
        for (idx, player) in self.players.iter().enumerate() {
            if idx != except {
                player.send(msg.clone());
            }
        }
    }
}
