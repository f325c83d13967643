//! Byte-exact packet encodings (spec §6).

use crate::error::ProtocolError;
use crate::protocol::codec::{BitReader, BitWriter};

// ---------------------------------------------------------------------------
// Drag-drop location encoding (shared by item-move and item-swap)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemLocation {
    Equipped = 0,
    Bag = 1,
    Bank = 2,
    Trade = 3,
}

impl ItemLocation {
    fn from_tag(tag: u8) -> Result<Self, ProtocolError> {
        match tag {
            0 => Ok(ItemLocation::Equipped),
            1 => Ok(ItemLocation::Bag),
            2 => Ok(ItemLocation::Bank),
            3 => Ok(ItemLocation::Trade),
            other => Err(ProtocolError::MalformedField(
                "location_tag",
                format!("unknown location tag {other}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemDragDrop {
    pub location: ItemLocation,
    pub slot: u8,
}

impl ItemDragDrop {
    fn encode(&self) -> u64 {
        ((self.location as u64) << 8) | self.slot as u64
    }

    fn decode(raw: u64) -> Result<Self, ProtocolError> {
        let slot = (raw & 0xFF) as u8;
        let tag = ((raw >> 8) & 0xFF) as u8;
        Ok(Self {
            location: ItemLocation::from_tag(tag)?,
            slot,
        })
    }
}

// ---------------------------------------------------------------------------
// ServerItemMove / ServerItemSwap
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ServerItemMove {
    pub item_guid: u64,
    pub drag_drop: ItemDragDrop,
}

impl ServerItemMove {
    pub fn encode(&self, w: &mut BitWriter) {
        w.write_u64(self.item_guid);
        w.write_u64(self.drag_drop.encode());
    }

    pub fn decode(r: &mut BitReader) -> Result<Self, ProtocolError> {
        let item_guid = r.read_u64("item_guid")?;
        let drag_drop = ItemDragDrop::decode(r.read_u64("drag_drop")?)?;
        Ok(Self { item_guid, drag_drop })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerItemSwap {
    pub first: (u64, ItemDragDrop),
    pub second: (u64, ItemDragDrop),
}

impl ServerItemSwap {
    pub fn encode(&self, w: &mut BitWriter) {
        w.write_u64(self.first.0);
        w.write_u64(self.first.1.encode());
        w.write_u64(self.second.0);
        w.write_u64(self.second.1.encode());
    }

    pub fn decode(r: &mut BitReader) -> Result<Self, ProtocolError> {
        let first_guid = r.read_u64("first_guid")?;
        let first_drag = ItemDragDrop::decode(r.read_u64("first_drag_drop")?)?;
        let second_guid = r.read_u64("second_guid")?;
        let second_drag = ItemDragDrop::decode(r.read_u64("second_drag_drop")?)?;
        Ok(Self {
            first: (first_guid, first_drag),
            second: (second_guid, second_drag),
        })
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatChannel {
    Say = 0,
    Yell = 1,
    Whisper = 2,
    System = 3,
    Emote = 4,
    Party = 5,
    Zone = 7,
}

impl ChatChannel {
    fn from_u32(v: u32) -> Result<Self, ProtocolError> {
        match v {
            0 => Ok(ChatChannel::Say),
            1 => Ok(ChatChannel::Yell),
            2 => Ok(ChatChannel::Whisper),
            3 => Ok(ChatChannel::System),
            4 => Ok(ChatChannel::Emote),
            5 => Ok(ChatChannel::Party),
            7 => Ok(ChatChannel::Zone),
            other => Err(ProtocolError::MalformedField("channel", format!("unknown channel {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerChat {
    pub channel: ChatChannel,
    pub sender_guid: u64,
    pub sender_name: String,
    pub message: String,
}

impl ServerChat {
    pub fn encode(&self, w: &mut BitWriter) -> Result<(), ProtocolError> {
        w.write_u32(self.channel as u32);
        w.write_u64(self.sender_guid);
        w.write_wide_string(&self.sender_name)?;
        w.write_wide_string(&self.message)?;
        Ok(())
    }

    pub fn decode(r: &mut BitReader) -> Result<Self, ProtocolError> {
        let channel = ChatChannel::from_u32(r.read_u32("channel")?)?;
        let sender_guid = r.read_u64("sender_guid")?;
        let sender_name = r.read_wide_string("sender_name")?;
        let message = r.read_wide_string("message")?;
        Ok(Self {
            channel,
            sender_guid,
            sender_name,
            message,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientChat {
    pub channel: ChatChannel,
    /// Empty for non-whisper channels.
    pub target: String,
    pub message: String,
}

impl ClientChat {
    pub fn encode(&self, w: &mut BitWriter) -> Result<(), ProtocolError> {
        w.write_u32(self.channel as u32);
        w.write_wide_string(&self.target)?;
        w.write_wide_string(&self.message)?;
        Ok(())
    }

    pub fn decode(r: &mut BitReader) -> Result<Self, ProtocolError> {
        let channel = ChatChannel::from_u32(r.read_u32("channel")?)?;
        let target = r.read_wide_string("target")?;
        let message = r.read_wide_string("message")?;
        Ok(Self { channel, target, message })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatResult {
    Success = 0,
    PlayerNotFound = 1,
    PlayerOffline = 2,
    Muted = 3,
    ChannelUnavailable = 4,
    MessageTooLong = 5,
    RateLimited = 6,
}

impl ChatResult {
    fn from_u32(v: u32) -> Result<Self, ProtocolError> {
        match v {
            0 => Ok(ChatResult::Success),
            1 => Ok(ChatResult::PlayerNotFound),
            2 => Ok(ChatResult::PlayerOffline),
            3 => Ok(ChatResult::Muted),
            4 => Ok(ChatResult::ChannelUnavailable),
            5 => Ok(ChatResult::MessageTooLong),
            6 => Ok(ChatResult::RateLimited),
            other => Err(ProtocolError::MalformedField("result", format!("unknown result {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerChatResult {
    pub result: ChatResult,
    pub channel: ChatChannel,
}

impl ServerChatResult {
    pub fn encode(&self, w: &mut BitWriter) {
        w.write_u32(self.result as u32);
        w.write_u32(self.channel as u32);
    }

    pub fn decode(r: &mut BitReader) -> Result<Self, ProtocolError> {
        let result = ChatResult::from_u32(r.read_u32("result")?)?;
        let channel = ChatChannel::from_u32(r.read_u32("channel")?)?;
        Ok(Self { result, channel })
    }
}

// ---------------------------------------------------------------------------
// Quests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ServerQuestAdd {
    pub quest_id: u32,
    pub objective_targets: Vec<u16>,
}

impl ServerQuestAdd {
    pub fn encode(&self, w: &mut BitWriter) -> Result<(), ProtocolError> {
        if self.objective_targets.len() > u8::MAX as usize {
            return Err(ProtocolError::MalformedField(
                "objective_count",
                "too many objectives".into(),
            ));
        }
        w.write_u32(self.quest_id);
        w.write_u8(self.objective_targets.len() as u8);
        for target in &self.objective_targets {
            w.write_u16(*target);
        }
        Ok(())
    }

    pub fn decode(r: &mut BitReader) -> Result<Self, ProtocolError> {
        let quest_id = r.read_u32("quest_id")?;
        let count = r.read_u8("objective_count")?;
        let mut objective_targets = Vec::with_capacity(count as usize);
        for _ in 0..count {
            objective_targets.push(r.read_u16("target")?);
        }
        Ok(Self { quest_id, objective_targets })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestState {
    Accepted = 0,
    Complete = 1,
    Failed = 2,
}

impl QuestState {
    fn from_u8(v: u8) -> Result<Self, ProtocolError> {
        match v {
            0 => Ok(QuestState::Accepted),
            1 => Ok(QuestState::Complete),
            2 => Ok(QuestState::Failed),
            other => Err(ProtocolError::MalformedField("state", format!("unknown quest state {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerQuestUpdate {
    pub quest_id: u32,
    pub state: QuestState,
    pub objective_index: u8,
    pub current: u16,
}

impl ServerQuestUpdate {
    pub fn encode(&self, w: &mut BitWriter) {
        w.write_u32(self.quest_id);
        w.write_u8(self.state as u8);
        w.write_u8(self.objective_index);
        w.write_u16(self.current);
    }

    pub fn decode(r: &mut BitReader) -> Result<Self, ProtocolError> {
        let quest_id = r.read_u32("quest_id")?;
        let state = QuestState::from_u8(r.read_u8("state")?)?;
        let objective_index = r.read_u8("objective_index")?;
        let current = r.read_u16("current")?;
        Ok(Self { quest_id, state, objective_index, current })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestRemoveReason {
    Abandoned = 0,
    Completed = 1,
    Failed = 2,
}

impl QuestRemoveReason {
    fn from_u8(v: u8) -> Result<Self, ProtocolError> {
        match v {
            0 => Ok(QuestRemoveReason::Abandoned),
            1 => Ok(QuestRemoveReason::Completed),
            2 => Ok(QuestRemoveReason::Failed),
            other => Err(ProtocolError::MalformedField("reason", format!("unknown reason {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerQuestRemove {
    pub quest_id: u32,
    pub reason: QuestRemoveReason,
}

impl ServerQuestRemove {
    pub fn encode(&self, w: &mut BitWriter) {
        w.write_u32(self.quest_id);
        w.write_u8(self.reason as u8);
    }

    pub fn decode(r: &mut BitReader) -> Result<Self, ProtocolError> {
        let quest_id = r.read_u32("quest_id")?;
        let reason = QuestRemoveReason::from_u8(r.read_u8("reason")?)?;
        Ok(Self { quest_id, reason })
    }
}

// ---------------------------------------------------------------------------
// Telegraph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ServerTelegraph {
    pub caster: u64,
    pub spell: u32,
    pub shape: u8,
    pub position: (f32, f32, f32),
    pub rotation: f32,
    pub duration_ms: u32,
    pub color: u8,
    /// Shape-specific trailing parameters, already in wire order.
    pub shape_params: Vec<f32>,
}

impl ServerTelegraph {
    pub fn encode(&self, w: &mut BitWriter) {
        w.write_u64(self.caster);
        w.write_u32(self.spell);
        w.write_u8(self.shape);
        w.write_f32(self.position.0);
        w.write_f32(self.position.1);
        w.write_f32(self.position.2);
        w.write_f32(self.rotation);
        w.write_u32(self.duration_ms);
        w.write_u8(self.color);
        for param in &self.shape_params {
            w.write_f32(*param);
        }
    }

    /// `shape_param_count` comes from a shape-to-parameter-count lookup the
    /// caller owns (shape definitions live in the content catalog, not in
    /// the wire codec).
    pub fn decode(r: &mut BitReader, shape_param_count: usize) -> Result<Self, ProtocolError> {
        let caster = r.read_u64("caster")?;
        let spell = r.read_u32("spell")?;
        let shape = r.read_u8("shape")?;
        let position = (
            r.read_f32("position.x")?,
            r.read_f32("position.y")?,
            r.read_f32("position.z")?,
        );
        let rotation = r.read_f32("rotation")?;
        let duration_ms = r.read_u32("duration_ms")?;
        let color = r.read_u8("color")?;
        let mut shape_params = Vec::with_capacity(shape_param_count);
        for _ in 0..shape_param_count {
            shape_params.push(r.read_f32("shape_param")?);
        }
        Ok(Self {
            caster,
            spell,
            shape,
            position,
            rotation,
            duration_ms,
            color,
            shape_params,
        })
    }
}

// ---------------------------------------------------------------------------
// Item visual update
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemVisualEntry {
    pub slot: u8,
    pub display_id: u16,
    pub colour_set: u16,
    pub dye_data: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerItemVisualUpdate {
    pub player_guid: u32,
    pub entries: Vec<ItemVisualEntry>,
}

impl ServerItemVisualUpdate {
    pub fn encode(&self, w: &mut BitWriter) -> Result<(), ProtocolError> {
        if self.entries.len() > u8::MAX as usize {
            return Err(ProtocolError::MalformedField("count", "too many entries".into()));
        }
        w.write_u32(self.player_guid);
        w.write_u8(self.entries.len() as u8);
        for entry in &self.entries {
            w.write_bits(entry.slot as u32, 7);
            w.write_bits(entry.display_id as u32, 15);
            w.write_bits(entry.colour_set as u32, 14);
            w.write_bits(entry.dye_data as u32, 32);
        }
        Ok(())
    }

    pub fn decode(r: &mut BitReader) -> Result<Self, ProtocolError> {
        let player_guid = r.read_u32("player_guid")?;
        let count = r.read_u8("count")?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let slot = r.read_bits(7, "slot")? as u8;
            let display_id = r.read_bits(15, "display_id")? as u16;
            let colour_set = r.read_bits(14, "colour_set")? as u16;
            let dye_data = r.read_bits(32, "dye_data")? as i32;
            entries.push(ItemVisualEntry {
                slot,
                display_id,
                colour_set,
                dye_data,
            });
        }
        Ok(Self { player_guid, entries })
    }
}

// ---------------------------------------------------------------------------
// Buffs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerBuffApply {
    pub target: u64,
    pub caster: u64,
    pub buff_id: u32,
    pub spell_id: u32,
    pub buff_type: u8,
    pub amount: i32,
    pub duration: u32,
    pub is_debuff: bool,
}

impl ServerBuffApply {
    pub fn encode(&self, w: &mut BitWriter) {
        w.write_u64(self.target);
        w.write_u64(self.caster);
        w.write_u32(self.buff_id);
        w.write_u32(self.spell_id);
        w.write_u8(self.buff_type);
        w.write_i32(self.amount);
        w.write_u32(self.duration);
        w.write_u8(self.is_debuff as u8);
    }

    pub fn decode(r: &mut BitReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            target: r.read_u64("target")?,
            caster: r.read_u64("caster")?,
            buff_id: r.read_u32("buff_id")?,
            spell_id: r.read_u32("spell_id")?,
            buff_type: r.read_u8("buff_type")?,
            amount: r.read_i32("amount")?,
            duration: r.read_u32("duration")?,
            is_debuff: r.read_u8("is_debuff")? != 0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerBuffRemove {
    pub target: u64,
    pub buff_id: u32,
    pub reason: u8,
}

impl ServerBuffRemove {
    pub fn encode(&self, w: &mut BitWriter) {
        w.write_u64(self.target);
        w.write_u32(self.buff_id);
        w.write_u8(self.reason);
    }

    pub fn decode(r: &mut BitReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            target: r.read_u64("target")?,
            buff_id: r.read_u32("buff_id")?,
            reason: r.read_u8("reason")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Player death
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathType {
    Combat = 0,
    Fall = 1,
    Drown = 2,
    Environment = 3,
}

impl DeathType {
    fn from_u32(v: u32) -> Result<Self, ProtocolError> {
        match v {
            0 => Ok(DeathType::Combat),
            1 => Ok(DeathType::Fall),
            2 => Ok(DeathType::Drown),
            3 => Ok(DeathType::Environment),
            other => Err(ProtocolError::MalformedField("death_type", format!("unknown death type {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerPlayerDeath {
    pub player: u64,
    /// 0 if environmental.
    pub killer: u64,
    pub death_type: DeathType,
}

impl ServerPlayerDeath {
    pub fn encode(&self, w: &mut BitWriter) {
        w.write_u64(self.player);
        w.write_u64(self.killer);
        w.write_u32(self.death_type as u32);
    }

    pub fn decode(r: &mut BitReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            player: r.read_u64("player")?,
            killer: r.read_u64("killer")?,
            death_type: DeathType::from_u32(r.read_u32("death_type")?)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_item_move_round_trips_location_and_slot() {
        let packet = ServerItemMove {
            item_guid: 0xDEAD_BEEF,
            drag_drop: ItemDragDrop {
                location: ItemLocation::Bag,
                slot: 12,
            },
        };
        let mut w = BitWriter::new();
        packet.encode(&mut w);
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        assert_eq!(ServerItemMove::decode(&mut r).unwrap(), packet);
    }

    #[test]
    fn drag_drop_matches_location_tag_shift_eight_formula() {
        let dd = ItemDragDrop {
            location: ItemLocation::Trade,
            slot: 3,
        };
        assert_eq!(dd.encode(), (3u64 << 8) | 3);
    }

    #[test]
    fn server_chat_round_trips_wide_strings() {
        let packet = ServerChat {
            channel: ChatChannel::Party,
            sender_guid: 77,
            sender_name: "Rance".to_string(),
            message: "incoming on west flank".to_string(),
        };
        let mut w = BitWriter::new();
        packet.encode(&mut w).unwrap();
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        assert_eq!(ServerChat::decode(&mut r).unwrap(), packet);
    }

    #[test]
    fn item_visual_update_round_trips_bit_packed_entries() {
        let packet = ServerItemVisualUpdate {
            player_guid: 5,
            entries: vec![
                ItemVisualEntry {
                    slot: 2,
                    display_id: 4096,
                    colour_set: 9001,
                    dye_data: -1,
                },
                ItemVisualEntry {
                    slot: 127,
                    display_id: 0,
                    colour_set: 0,
                    dye_data: 123456,
                },
            ],
        };
        let mut w = BitWriter::new();
        packet.encode(&mut w).unwrap();
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        assert_eq!(ServerItemVisualUpdate::decode(&mut r).unwrap(), packet);
    }

    #[test]
    fn server_player_death_environmental_killer_is_zero() {
        let packet = ServerPlayerDeath {
            player: 1,
            killer: 0,
            death_type: DeathType::Fall,
        };
        let mut w = BitWriter::new();
        packet.encode(&mut w);
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        assert_eq!(ServerPlayerDeath::decode(&mut r).unwrap(), packet);
    }
}
