//! Tabelas de segmentos do protocolo MXTP.
//!
//! A posição de um segmento na tabela define o seu índice no fio
//! (`wire index`). Corpo e dedos têm enumerações separadas: um segmento
//! de dedo é indexado contra [`FINGER_SEGMENTS`], nunca contra o corpo.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Número fixo de segmentos do corpo.
pub const BODY_SEGMENT_COUNT: usize = 23;

/// Número de segmentos de dedos (20 por mão).
pub const FINGER_SEGMENT_COUNT: usize = 40;

/// Segmento raiz – o único que transmite posição.
pub const ROOT_SEGMENT: &str = "Pelvis";

/// Segmentos do corpo na ordem do protocolo.
pub const BODY_SEGMENTS: [&str; BODY_SEGMENT_COUNT] = [
    "Pelvis",
    "L5",
    "L3",
    "T12",
    "T8",
    "Neck",
    "Head",
    "Right Shoulder",
    "Right Upper Arm",
    "Right Forearm",
    "Right Hand",
    "Left Shoulder",
    "Left Upper Arm",
    "Left Forearm",
    "Left Hand",
    "Right Upper Leg",
    "Right Lower Leg",
    "Right Foot",
    "Right Toe",
    "Left Upper Leg",
    "Left Lower Leg",
    "Left Foot",
    "Left Toe",
];

/// Segmentos dos dedos na ordem do protocolo (mão esquerda, depois direita).
pub const FINGER_SEGMENTS: [&str; FINGER_SEGMENT_COUNT] = [
    "Left Carpus",
    "Left First Metacarpal",
    "Left First Proximal Phalange",
    "Left First Distal Phalange",
    "Left Second Metacarpal",
    "Left Second Proximal Phalange",
    "Left Second Middle Phalange",
    "Left Second Distal Phalange",
    "Left Third Metacarpal",
    "Left Third Proximal Phalange",
    "Left Third Middle Phalange",
    "Left Third Distal Phalange",
    "Left Fourth Metacarpal",
    "Left Fourth Proximal Phalange",
    "Left Fourth Middle Phalange",
    "Left Fourth Distal Phalange",
    "Left Fifth Metacarpal",
    "Left Fifth Proximal Phalange",
    "Left Fifth Middle Phalange",
    "Left Fifth Distal Phalange",
    "Right Carpus",
    "Right First Metacarpal",
    "Right First Proximal Phalange",
    "Right First Distal Phalange",
    "Right Second Metacarpal",
    "Right Second Proximal Phalange",
    "Right Second Middle Phalange",
    "Right Second Distal Phalange",
    "Right Third Metacarpal",
    "Right Third Proximal Phalange",
    "Right Third Middle Phalange",
    "Right Third Distal Phalange",
    "Right Fourth Metacarpal",
    "Right Fourth Proximal Phalange",
    "Right Fourth Middle Phalange",
    "Right Fourth Distal Phalange",
    "Right Fifth Metacarpal",
    "Right Fifth Proximal Phalange",
    "Right Fifth Middle Phalange",
    "Right Fifth Distal Phalange",
];

/// Grupo de segmentos (cada grupo tem sua própria enumeração).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentGroup {
    Body,
    Finger,
}

impl SegmentGroup {
    /// Enumeração ordenada do grupo.
    pub fn names(self) -> &'static [&'static str] {
        match self {
            SegmentGroup::Body => &BODY_SEGMENTS,
            SegmentGroup::Finger => &FINGER_SEGMENTS,
        }
    }
}

/// Tabela nome → índice pré-computada, construída uma única vez.
#[derive(Debug)]
pub struct SegmentTable {
    body: HashMap<&'static str, u32>,
    finger: HashMap<&'static str, u32>,
}

static TABLE: LazyLock<SegmentTable> = LazyLock::new(SegmentTable::build);

impl SegmentTable {
    fn build() -> Self {
        let index = |names: &[&'static str]| {
            names
                .iter()
                .enumerate()
                .map(|(i, name)| (*name, i as u32))
                .collect::<HashMap<_, _>>()
        };
        Self {
            body: index(&BODY_SEGMENTS),
            finger: index(&FINGER_SEGMENTS),
        }
    }

    /// Tabela global compartilhada.
    pub fn global() -> &'static SegmentTable {
        &TABLE
    }

    /// Índice no fio de `name` dentro da enumeração de `group`.
    pub fn wire_index(&self, group: SegmentGroup, name: &str) -> Option<u32> {
        match group {
            SegmentGroup::Body => self.body.get(name).copied(),
            SegmentGroup::Finger => self.finger.get(name).copied(),
        }
    }

    /// Em qual grupo o segmento está, se estiver em algum.
    pub fn group_of(&self, name: &str) -> Option<SegmentGroup> {
        if self.body.contains_key(name) {
            Some(SegmentGroup::Body)
        } else if self.finger.contains_key(name) {
            Some(SegmentGroup::Finger)
        } else {
            None
        }
    }
}

/// Atalho para [`SegmentTable::wire_index`] na tabela global.
pub fn wire_index(group: SegmentGroup, name: &str) -> Option<u32> {
    SegmentTable::global().wire_index(group, name)
}
