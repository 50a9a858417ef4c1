//! Protocolo binário MXTP (variante de pose em quaternions).
//!
//! Todo datagrama começa com o mesmo header de 24 bytes:
//!
//! ```text
//! ┌──────────┬────────┬────────────┬────────┬───────┬──────────┬──────┬──────┬───────┬────────┬──────────┬──────────┐
//! │ "MXTP"(4)│ Tipo(2)│ Sample(4)  │ 0x80(1)│ Itens │ Tempo(4) │ Char │ Body │ Props │ Fingers│ Reserv(2)│ Payload  │
//! │          │ ASCII  │ u32 BE     │        │ (1)   │ i32 BE   │ (1)  │ (1)  │ (1)   │ (1)    │ 00 00    │ size(2)  │
//! └──────────┴────────┴────────────┴────────┴───────┴──────────┴──────┴──────┴───────┴────────┴──────────┴──────────┘
//! ```
//!
//! - Pose `"02"`: seguido de 32 bytes por segmento (índice u32, posição 3×f32,
//!   rotação 4×f32), tudo big-endian.
//! - Timecode `"25"`: payload size fixo `0x000c`, mais 4 bytes zero e o texto
//!   ASCII `HH:MM:SS.mmm`. Os bytes finais são reproduzidos exatamente como o
//!   receptor os espera.
//!
//! A serialização usa bincode com inteiros de tamanho fixo em big-endian, o que
//! dá exatamente o layout acima a partir das structs serde.

use crate::segments::{SegmentGroup, SegmentTable};
use crate::types::{PoseSegment, QuaternionPose};
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefixo mágico "MXTP".
pub const MAGIC: [u8; 4] = [0x4d, 0x58, 0x54, 0x50];

/// Marcador de datagrama único (sem fragmentação).
pub const DATAGRAM_SINGLE: u8 = 0x80;

/// Tamanho do header comum.
pub const HEADER_SIZE: usize = 24;

/// Tamanho de cada segmento no payload de pose.
pub const SEGMENT_RECORD_SIZE: usize = 32;

/// Tamanho do texto `HH:MM:SS.mmm`.
pub const TIMECODE_TEXT_LEN: usize = 12;

/// Bytes zero após o header do timecode.
const TIMECODE_TAIL: [u8; 4] = [0x00; 4];

/// Tamanho total de um datagrama de timecode.
pub const TIMECODE_PACKET_LEN: usize = HEADER_SIZE + TIMECODE_TAIL.len() + TIMECODE_TEXT_LEN;

/// Erros do protocolo.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Segmento desconhecido na tabela {group:?}: {id}")]
    UnknownSegment { group: SegmentGroup, id: String },

    #[error("Segmentos demais para um datagrama: {0}")]
    TooManySegments(usize),

    #[error("Pacote muito curto ({0} bytes, mínimo {HEADER_SIZE})")]
    TooShort(usize),

    #[error("Prefixo mágico inválido: {0:02X?} (esperado \"MXTP\")")]
    InvalidMagic([u8; 4]),

    #[error("Erro de serialização: {0}")]
    Serialize(String),

    #[error("Erro de deserialização: {0}")]
    Deserialize(String),
}

// ──────────────────────────────────────────────
// Tipos de mensagem
// ──────────────────────────────────────────────

/// Tipos de mensagem MXTP (código de dois dígitos ASCII).
///
/// Só `PoseQuaternion` e `TimeCode` são emitidos por este sistema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    PoseEuler,
    PoseQuaternion,
    PosePositionOnly,
    PoseUnityLegacy,
    CharacterMetaData,
    CharacterScale,
    TimeCode,
}

impl MessageType {
    pub const ALL: [MessageType; 7] = [
        MessageType::PoseEuler,
        MessageType::PoseQuaternion,
        MessageType::PosePositionOnly,
        MessageType::PoseUnityLegacy,
        MessageType::CharacterMetaData,
        MessageType::CharacterScale,
        MessageType::TimeCode,
    ];

    pub fn code(self) -> [u8; 2] {
        match self {
            MessageType::PoseEuler => *b"01",
            MessageType::PoseQuaternion => *b"02",
            MessageType::PosePositionOnly => *b"03",
            MessageType::PoseUnityLegacy => *b"05",
            MessageType::CharacterMetaData => *b"12",
            MessageType::CharacterScale => *b"13",
            MessageType::TimeCode => *b"25",
        }
    }

    pub fn from_code(code: [u8; 2]) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b] = self.code();
        write!(f, "{}{}", a as char, b as char)
    }
}

// ──────────────────────────────────────────────
// Layout no fio
// ──────────────────────────────────────────────

/// Header comum de 24 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatagramHeader {
    pub magic: [u8; 4],
    pub message_type: [u8; 2],
    pub sample_counter: u32,
    pub datagram_counter: u8,
    pub item_count: u8,
    pub time_code: i32,
    pub character_id: u8,
    pub body_segment_count: u8,
    pub prop_count: u8,
    pub finger_segment_count: u8,
    pub reserved: [u8; 2],
    pub payload_size: u16,
}

impl DatagramHeader {
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_code(self.message_type)
    }
}

/// Registro de 32 bytes de um segmento.
#[derive(Debug, Serialize)]
struct SegmentRecord {
    wire_index: u32,
    position: [f32; 3],
    rotation: [f32; 4],
}

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_big_endian()
        .with_fixint_encoding()
}

fn write_wire<T: Serialize>(out: &mut Vec<u8>, value: &T) -> Result<(), ProtocolError> {
    wire_options()
        .serialize_into(out, value)
        .map_err(|e| ProtocolError::Serialize(e.to_string()))
}

fn records_for(
    table: &SegmentTable,
    group: SegmentGroup,
    segments: &[PoseSegment],
) -> Result<Vec<SegmentRecord>, ProtocolError> {
    segments
        .iter()
        .map(|seg| {
            let wire_index =
                table
                    .wire_index(group, &seg.id)
                    .ok_or_else(|| ProtocolError::UnknownSegment {
                        group,
                        id: seg.id.clone(),
                    })?;
            Ok(SegmentRecord {
                wire_index,
                position: seg.position,
                rotation: seg.rotation,
            })
        })
        .collect()
}

fn count_u8(n: usize) -> Result<u8, ProtocolError> {
    u8::try_from(n).map_err(|_| ProtocolError::TooManySegments(n))
}

// ──────────────────────────────────────────────
// Encoders
// ──────────────────────────────────────────────

/// Codifica uma mensagem de pose em quaternions (tipo `"02"`).
///
/// Todos os índices são resolvidos antes de escrever qualquer byte: um
/// segmento desconhecido nunca produz um pacote parcial.
pub fn encode_quaternion_pose(
    sample_counter: u32,
    pose: &QuaternionPose<'_>,
) -> Result<Vec<u8>, ProtocolError> {
    let table = SegmentTable::global();
    let mut records = records_for(table, SegmentGroup::Body, pose.body)?;
    records.extend(records_for(table, SegmentGroup::Finger, pose.fingers)?);

    let total = records.len();
    let payload_size = u16::try_from(total * SEGMENT_RECORD_SIZE)
        .map_err(|_| ProtocolError::TooManySegments(total))?;

    let header = DatagramHeader {
        magic: MAGIC,
        message_type: MessageType::PoseQuaternion.code(),
        sample_counter,
        datagram_counter: DATAGRAM_SINGLE,
        item_count: count_u8(total)?,
        time_code: pose.time_code_ms,
        character_id: pose.character_id,
        body_segment_count: count_u8(pose.body.len())?,
        prop_count: 0,
        finger_segment_count: count_u8(pose.fingers.len())?,
        reserved: [0x00; 2],
        payload_size,
    };

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload_size as usize);
    write_wire(&mut frame, &header)?;
    for record in &records {
        write_wire(&mut frame, record)?;
    }

    Ok(frame)
}

/// Codifica uma mensagem de timecode (tipo `"25"`).
pub fn encode_timecode(sample_counter: u32, time_code_ms: i32) -> Result<Vec<u8>, ProtocolError> {
    let header = DatagramHeader {
        magic: MAGIC,
        message_type: MessageType::TimeCode.code(),
        sample_counter,
        datagram_counter: DATAGRAM_SINGLE,
        item_count: 0,
        time_code: time_code_ms,
        character_id: 0,
        body_segment_count: 0,
        prop_count: 0,
        finger_segment_count: 0,
        reserved: [0x00; 2],
        payload_size: TIMECODE_TEXT_LEN as u16,
    };

    let mut frame = Vec::with_capacity(TIMECODE_PACKET_LEN);
    write_wire(&mut frame, &header)?;
    frame.extend_from_slice(&TIMECODE_TAIL);
    frame.extend_from_slice(format_timecode(time_code_ms.max(0).unsigned_abs()).as_bytes());

    Ok(frame)
}

/// Formata milissegundos como `HH:MM:SS.mmm`.
///
/// O corte é puramente posicional sobre o valor com 9 dígitos
/// (`3661234` → `"00:36:61.234"`); não é um relógio válido.
pub fn format_timecode(ms: u32) -> String {
    let digits = format!("{:09}", ms % 1_000_000_000);
    format!(
        "{}:{}:{}.{}",
        &digits[0..2],
        &digits[2..4],
        &digits[4..6],
        &digits[6..9]
    )
}

// ──────────────────────────────────────────────
// Decoder (diagnóstico)
// ──────────────────────────────────────────────

/// Decodifica o header comum de um datagrama recebido.
pub fn decode_header(data: &[u8]) -> Result<DatagramHeader, ProtocolError> {
    if data.len() < HEADER_SIZE {
        return Err(ProtocolError::TooShort(data.len()));
    }

    let magic = [data[0], data[1], data[2], data[3]];
    if magic != MAGIC {
        return Err(ProtocolError::InvalidMagic(magic));
    }

    wire_options()
        .allow_trailing_bytes()
        .deserialize(&data[..HEADER_SIZE])
        .map_err(|e| ProtocolError::Deserialize(e.to_string()))
}

/// Texto `HH:MM:SS.mmm` de um datagrama de timecode, se houver.
pub fn timecode_text(data: &[u8]) -> Option<&str> {
    let header = decode_header(data).ok()?;
    if header.message_type() != Some(MessageType::TimeCode) {
        return None;
    }
    let start = HEADER_SIZE + TIMECODE_TAIL.len();
    let text = data.get(start..start + TIMECODE_TEXT_LEN)?;
    std::str::from_utf8(text).ok()
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
