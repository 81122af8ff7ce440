//! Match protocol messages and their flat-string wire form.
//!
//! A wire message is a tag, one delimiter (`|` or `,`) and a payload:
//! `board|<numbers>|<tiles>|<ports>`, `steal,red`, `dice,3,4`.
//!
//! [`ClientMessage`] is what players post to the coordinator. Parsing is
//! strict: every tag the coordinator interprets is validated, and only the
//! [`UpdateKind`] allow-list is accepted as an opaque pass-through.
//! [`ServerMessage`] is what the coordinator delivers to players.

use crate::board::{BoardLayout, Resource};
use crate::deck::DevelopmentCard;
use crate::player::{PlayerColor, ResourceBundle};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Empty message")]
    Empty,

    #[error("Unknown tag: {0}")]
    UnknownTag(String),

    #[error("Malformed {tag} message: {reason}")]
    Malformed { tag: String, reason: String },
}

impl ProtocolError {
    fn malformed(tag: &str, reason: impl Into<String>) -> Self {
        ProtocolError::Malformed {
            tag: tag.to_string(),
            reason: reason.into(),
        }
    }
}

/// Game-state updates the coordinator relays without interpreting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    /// Settlement placed
    Settlement,
    /// Road placed
    Road,
    /// Settlement upgraded to a city
    City,
    /// Resource delta after a roll, trade or build
    Resources,
    /// Derived player state (points, hand size, ...)
    State,
    /// Development card played
    DevPlay,
    /// Robber moved
    Robber,
    /// Table talk
    Chat,
}

impl UpdateKind {
    pub const ALL: [UpdateKind; 8] = [
        UpdateKind::Settlement,
        UpdateKind::Road,
        UpdateKind::City,
        UpdateKind::Resources,
        UpdateKind::State,
        UpdateKind::DevPlay,
        UpdateKind::Robber,
        UpdateKind::Chat,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            UpdateKind::Settlement => "set",
            UpdateKind::Road => "road",
            UpdateKind::City => "city",
            UpdateKind::Resources => "res",
            UpdateKind::State => "state",
            UpdateKind::DevPlay => "play",
            UpdateKind::Robber => "robber",
            UpdateKind::Chat => "chat",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        UpdateKind::ALL.into_iter().find(|k| k.tag() == tag)
    }
}

/// An opaque game-state update, relayed verbatim to the other players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameUpdate {
    pub kind: UpdateKind,
    pub payload: String,
}

impl GameUpdate {
    pub fn new(kind: UpdateKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }
}

impl fmt::Display for GameUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.payload.is_empty() {
            f.write_str(self.kind.tag())
        } else {
            write!(f, "{}|{}", self.kind.tag(), self.payload)
        }
    }
}

/// Answer to a discard request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscardResponse {
    /// Hand is small enough, nothing discarded
    NotNeeded,
    /// Cards put back to the bank
    Cards(ResourceBundle),
}

/// Messages a player posts to its session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Opaque game-state update
    Update(GameUpdate),
    /// End the current turn
    EndTurn,
    /// Claim victory
    DeclareWinner { name: String },
    /// Offer a trade to every other player
    OfferTrade {
        offer: ResourceBundle,
        ask: ResourceBundle,
    },
    /// Accept or deny the open trade offer
    TradeReply { accept: bool },
    /// Offerer picks one accepter
    TradeWith { color: PlayerColor },
    /// Offerer withdraws the offer
    TradeCancel,
    /// Steal from the player with this color
    Steal { target: PlayerColor },
    /// Card given up to a thief, `None` if the hand was empty
    Reveal { card: Option<Resource> },
    /// Buy a development card
    DrawDevCard,
    /// Answer to a discard request
    Discard(DiscardResponse),
    /// Lobby only: tell everyone the host is about to start
    PreStart,
    /// Leave the match, ending it for everyone
    Quit,
}

impl ClientMessage {
    pub fn update(kind: UpdateKind, payload: impl Into<String>) -> Self {
        ClientMessage::Update(GameUpdate::new(kind, payload))
    }

    pub fn is_quit(&self) -> bool {
        matches!(self, ClientMessage::Quit)
    }
}

/// Split a wire string into its tag and optional payload.
fn split_tag(s: &str) -> (&str, Option<&str>) {
    match s.find(|c: char| c == '|' || c == ',') {
        Some(idx) => (&s[..idx], Some(&s[idx + 1..])),
        None => (s, None),
    }
}

fn require<'a>(tag: &str, payload: Option<&'a str>) -> Result<&'a str, ProtocolError> {
    match payload {
        Some(p) if !p.is_empty() => Ok(p),
        _ => Err(ProtocolError::malformed(tag, "missing payload")),
    }
}

fn bare(tag: &str, payload: Option<&str>) -> Result<(), ProtocolError> {
    match payload {
        None | Some("") => Ok(()),
        Some(_) => Err(ProtocolError::malformed(tag, "unexpected payload")),
    }
}

fn parse_field<T: FromStr>(tag: &str, value: &str) -> Result<T, ProtocolError>
where
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| ProtocolError::malformed(tag, e.to_string()))
}

impl FromStr for ClientMessage {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ProtocolError::Empty);
        }

        let (tag, payload) = split_tag(s);
        if let Some(kind) = UpdateKind::from_tag(tag) {
            return Ok(ClientMessage::update(kind, payload.unwrap_or_default()));
        }

        let msg = match tag {
            "end" => {
                bare(tag, payload)?;
                ClientMessage::EndTurn
            }
            "winner" => ClientMessage::DeclareWinner {
                name: require(tag, payload)?.to_string(),
            },
            "tradeoffer" => {
                let (offer, ask) = require(tag, payload)?
                    .split_once(',')
                    .ok_or_else(|| ProtocolError::malformed(tag, "expected <offer>,<ask>"))?;
                ClientMessage::OfferTrade {
                    offer: parse_field(tag, offer)?,
                    ask: parse_field(tag, ask)?,
                }
            }
            "tradereply" => match require(tag, payload)? {
                "accept" => ClientMessage::TradeReply { accept: true },
                "deny" => ClientMessage::TradeReply { accept: false },
                other => {
                    return Err(ProtocolError::malformed(
                        tag,
                        format!("expected accept or deny, got {other:?}"),
                    ))
                }
            },
            "tradewith" => ClientMessage::TradeWith {
                color: parse_field(tag, require(tag, payload)?)?,
            },
            "tradecancel" => {
                bare(tag, payload)?;
                ClientMessage::TradeCancel
            }
            "steal" => ClientMessage::Steal {
                target: parse_field(tag, require(tag, payload)?)?,
            },
            "stolen" => match require(tag, payload)? {
                "none" => ClientMessage::Reveal { card: None },
                card => ClientMessage::Reveal {
                    card: Some(parse_field(tag, card)?),
                },
            },
            "dev" => {
                bare(tag, payload)?;
                ClientMessage::DrawDevCard
            }
            "discard" => match require(tag, payload)? {
                "none" => ClientMessage::Discard(DiscardResponse::NotNeeded),
                cards => ClientMessage::Discard(DiscardResponse::Cards(parse_field(tag, cards)?)),
            },
            "prestart" => {
                bare(tag, payload)?;
                ClientMessage::PreStart
            }
            "quit" => ClientMessage::Quit,
            other => return Err(ProtocolError::UnknownTag(other.to_string())),
        };
        Ok(msg)
    }
}

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientMessage::Update(update) => update.fmt(f),
            ClientMessage::EndTurn => f.write_str("end"),
            ClientMessage::DeclareWinner { name } => write!(f, "winner,{name}"),
            ClientMessage::OfferTrade { offer, ask } => write!(f, "tradeoffer|{offer},{ask}"),
            ClientMessage::TradeReply { accept: true } => f.write_str("tradereply|accept"),
            ClientMessage::TradeReply { accept: false } => f.write_str("tradereply|deny"),
            ClientMessage::TradeWith { color } => write!(f, "tradewith|{color}"),
            ClientMessage::TradeCancel => f.write_str("tradecancel"),
            ClientMessage::Steal { target } => write!(f, "steal,{target}"),
            ClientMessage::Reveal { card } => write!(f, "stolen|{}", card_name(card)),
            ClientMessage::DrawDevCard => f.write_str("dev"),
            ClientMessage::Discard(DiscardResponse::NotNeeded) => f.write_str("discard|none"),
            ClientMessage::Discard(DiscardResponse::Cards(cards)) => write!(f, "discard|{cards}"),
            ClientMessage::PreStart => f.write_str("prestart"),
            ClientMessage::Quit => f.write_str("quit"),
        }
    }
}

/// Messages the coordinator (or the lobby) delivers to a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Another player joined the lobby
    Enemy { name: String, color: PlayerColor },
    /// Another player left the lobby
    EnemyLeave { name: String, color: PlayerColor },
    /// The match is about to start, stop listening for lobby changes
    CloseListen,
    /// The host left and the lobby is closed
    LobbyClosed,
    /// The match is starting, switch to the game view
    StartGui,
    /// The board dealt for this session
    Board(BoardLayout),
    /// Turn order, by color
    TurnOrder(Vec<PlayerColor>),
    /// Your turn to place an initial settlement
    PlaceSettlement,
    /// Your turn to place an initial road
    PlaceRoad,
    /// Collect your starting resources
    GatherStart,
    /// Another player's game-state update, verbatim
    Relay {
        from: PlayerColor,
        update: GameUpdate,
    },
    /// Your turn has begun
    Turn,
    /// Someone else is acting
    NotTurn { current: PlayerColor },
    /// Dice result for the current turn
    Dice { first: u8, second: u8 },
    /// A 7 was rolled, answer with a discard
    DiscardRequest,
    /// A player discarded cards
    Discarded {
        color: PlayerColor,
        cards: ResourceBundle,
    },
    /// Move the robber
    RobberPrompt,
    /// A trade was offered to you
    TradeOffered {
        from: PlayerColor,
        offer: ResourceBundle,
        ask: ResourceBundle,
    },
    /// Players who accepted your offer
    TradeReplies { accepters: Vec<PlayerColor> },
    /// A trade was executed
    Trade {
        from: PlayerColor,
        to: PlayerColor,
        offer: ResourceBundle,
        ask: ResourceBundle,
    },
    /// A trade offer was withdrawn
    TradeCancelled { from: PlayerColor },
    /// You are being robbed, reveal a card
    StealRequest { thief: PlayerColor },
    /// The card you stole
    StolenCard {
        victim: PlayerColor,
        card: Option<Resource>,
    },
    /// Someone lost a card to a thief
    CardLost {
        victim: PlayerColor,
        thief: PlayerColor,
    },
    /// The development card you drew
    DevCard(DevelopmentCard),
    /// The match is won
    Winner { name: String },
    /// The match ended, `by` is the quitting player if there was one
    Quit { by: Option<PlayerColor> },
    /// Your last message was refused
    Rejected { reason: String },
}

impl ServerMessage {
    pub fn rejected(reason: impl fmt::Display) -> Self {
        ServerMessage::Rejected {
            reason: reason.to_string(),
        }
    }
}

fn csv<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn card_name(card: &Option<Resource>) -> &'static str {
    card.map_or("none", |r| r.as_str())
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Enemy { name, color } => write!(f, "enemy|{name},{color}"),
            ServerMessage::EnemyLeave { name, color } => write!(f, "enemyleave|{name},{color}"),
            ServerMessage::CloseListen => f.write_str("closelisten"),
            ServerMessage::LobbyClosed => f.write_str("leave"),
            ServerMessage::StartGui => f.write_str("startgui"),
            ServerMessage::Board(board) => write!(
                f,
                "board|{}|{}|{}",
                csv(board.numbers()),
                csv(board.tiles()),
                csv(board.ports())
            ),
            ServerMessage::TurnOrder(colors) => write!(f, "turnorder|{}", csv(colors)),
            ServerMessage::PlaceSettlement => f.write_str("start"),
            ServerMessage::PlaceRoad => f.write_str("startroad"),
            ServerMessage::GatherStart => f.write_str("getstart"),
            ServerMessage::Relay { update, .. } => update.fmt(f),
            ServerMessage::Turn => f.write_str("turn"),
            ServerMessage::NotTurn { current } => write!(f, "notturn|{current}"),
            ServerMessage::Dice { first, second } => write!(f, "dice,{first},{second}"),
            ServerMessage::DiscardRequest => f.write_str("discard"),
            ServerMessage::Discarded { color, cards } => write!(f, "discard|{color},{cards}"),
            ServerMessage::RobberPrompt => f.write_str("robber"),
            ServerMessage::TradeOffered { from, offer, ask } => {
                write!(f, "tradeoffer|{from},{offer},{ask}")
            }
            ServerMessage::TradeReplies { accepters } => {
                write!(f, "tradereplies|{}", csv(accepters))
            }
            ServerMessage::Trade {
                from,
                to,
                offer,
                ask,
            } => write!(f, "trade|{from},{to},{offer},{ask}"),
            ServerMessage::TradeCancelled { from } => write!(f, "tradecancel|{from}"),
            ServerMessage::StealRequest { thief } => write!(f, "steal|{thief}"),
            ServerMessage::StolenCard { victim, card } => {
                write!(f, "stolen|{victim},{}", card_name(card))
            }
            ServerMessage::CardLost { victim, thief } => write!(f, "lostcard|{victim},{thief}"),
            ServerMessage::DevCard(card) => write!(f, "dev|{card}"),
            ServerMessage::Winner { name } => write!(f, "winner,{name}"),
            ServerMessage::Quit { by: None } => f.write_str("quit"),
            ServerMessage::Quit { by: Some(color) } => write!(f, "quit|{color}"),
            ServerMessage::Rejected { reason } => write!(f, "error|{reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(s: &str) -> Result<ClientMessage, ProtocolError> {
        s.parse()
    }

    #[test]
    fn test_parse_steal_with_either_delimiter() {
        let expected = ClientMessage::Steal {
            target: PlayerColor::Blue,
        };
        assert_eq!(parse("steal,blue").unwrap(), expected);
        assert_eq!(parse("steal|blue").unwrap(), expected);
    }

    #[test]
    fn test_parse_updates_keep_payload_verbatim() {
        let msg = parse("set|12,3|red").unwrap();
        assert_eq!(msg, ClientMessage::update(UpdateKind::Settlement, "12,3|red"));
        assert_eq!(msg.to_string(), "set|12,3|red");

        assert_eq!(parse("state").unwrap(), ClientMessage::update(UpdateKind::State, ""));
    }

    #[test]
    fn test_parse_trade_offer() {
        let msg = parse("tradeoffer|wheat:2,ore:1").unwrap();
        assert_eq!(
            msg,
            ClientMessage::OfferTrade {
                offer: ResourceBundle::single(Resource::Wheat, 2),
                ask: ResourceBundle::single(Resource::Ore, 1),
            }
        );
        assert!(parse("tradeoffer|wheat:2").is_err());
    }

    #[test]
    fn test_parse_winner_keeps_commas_in_name() {
        assert_eq!(
            parse("winner,Alice, the Bold").unwrap(),
            ClientMessage::DeclareWinner {
                name: "Alice, the Bold".into()
            }
        );
    }

    #[test]
    fn test_parse_discard() {
        assert_eq!(
            parse("discard|none").unwrap(),
            ClientMessage::Discard(DiscardResponse::NotNeeded)
        );
        assert_eq!(
            parse("discard|brick:2+wood:2").unwrap().to_string(),
            "discard|brick:2+wood:2"
        );
        assert!(parse("discard").is_err());
    }

    #[test]
    fn test_oversized_counts_are_malformed() {
        assert!(matches!(
            parse("tradeoffer|wheat:4294967295+wheat:1,brick:1"),
            Err(ProtocolError::Malformed { .. })
        ));
        assert!(matches!(
            parse("discard|ore:99999999999"),
            Err(ProtocolError::Malformed { .. })
        ));
    }

    #[test]
    fn test_lobby_messages() {
        assert_eq!(parse("prestart").unwrap(), ClientMessage::PreStart);
        assert!(parse("prestart|now").is_err());
        assert_eq!(ServerMessage::CloseListen.to_string(), "closelisten");
        assert_eq!(ServerMessage::LobbyClosed.to_string(), "leave");
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        assert_eq!(
            parse("teleport|3"),
            Err(ProtocolError::UnknownTag("teleport".into()))
        );
        assert_eq!(parse("   "), Err(ProtocolError::Empty));
    }

    #[test]
    fn test_bare_tags_refuse_payload() {
        assert_eq!(parse("end").unwrap(), ClientMessage::EndTurn);
        assert!(matches!(
            parse("end|now"),
            Err(ProtocolError::Malformed { .. })
        ));
        assert!(matches!(
            parse("tradewith|purple"),
            Err(ProtocolError::Malformed { .. })
        ));
    }

    #[test]
    fn test_server_message_wire_form() {
        assert_eq!(
            ServerMessage::Dice { first: 3, second: 4 }.to_string(),
            "dice,3,4"
        );
        assert_eq!(
            ServerMessage::TurnOrder(vec![PlayerColor::Blue, PlayerColor::Red]).to_string(),
            "turnorder|blue,red"
        );
        assert_eq!(
            ServerMessage::Quit {
                by: Some(PlayerColor::White)
            }
            .to_string(),
            "quit|white"
        );
        assert_eq!(
            ServerMessage::TradeReplies { accepters: vec![] }.to_string(),
            "tradereplies|"
        );
    }

    #[test]
    fn test_relay_is_verbatim() {
        let update = GameUpdate::new(UpdateKind::Road, "4,5");
        let relay = ServerMessage::Relay {
            from: PlayerColor::Orange,
            update: update.clone(),
        };
        assert_eq!(relay.to_string(), ClientMessage::Update(update).to_string());
    }

    #[test]
    fn test_board_wire_form() {
        let board = BoardLayout::random();
        let wire = ServerMessage::Board(board.clone()).to_string();
        let groups: Vec<&str> = wire.split('|').collect();
        assert_eq!(groups[0], "board");
        assert_eq!(groups[1].split(',').count(), board.numbers().len());
        assert_eq!(groups[2].split(',').count(), board.tiles().len());
        assert_eq!(groups[3].split(',').count(), board.ports().len());
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(ServerMessage::NotTurn {
            current: PlayerColor::Red,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "NotTurn", "payload": {"current": "red"}})
        );
    }
}
