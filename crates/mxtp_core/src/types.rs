//! Definição de tipos/structs de pose.
//!
//! Um [`Frame`] é a sequência ordenada de amostras de um tick, já na
//! convenção do receptor (ver [`crate::pose`]).

use crate::segments::BODY_SEGMENT_COUNT;
use serde::{Deserialize, Serialize};

// ──────────────────────────────────────────────
// Segmento
// ──────────────────────────────────────────────

/// Amostra de pose de um segmento, pronta para o fio.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PoseSegment {
    /// Nome canônico do segmento (ex: "Right Forearm")
    pub id: String,
    /// Posição (x, y, z) – zero para todo segmento exceto a raiz
    pub position: [f32; 3],
    /// Rotação na ordem do fio: (w, -z, x, -y)
    pub rotation: [f32; 4],
}

// ──────────────────────────────────────────────
// Frame
// ──────────────────────────────────────────────

/// Frame completo: uma amostra por segmento mapeado, na ordem das tabelas.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Frame {
    pub segments: Vec<PoseSegment>,
}

impl Frame {
    pub fn new(segments: Vec<PoseSegment>) -> Self {
        Self { segments }
    }

    fn split_point(&self) -> usize {
        BODY_SEGMENT_COUNT.min(self.segments.len())
    }

    /// Fatia do corpo: `[0, 23)`.
    pub fn body(&self) -> &[PoseSegment] {
        &self.segments[..self.split_point()]
    }

    /// Fatia dos dedos: `[23, fim)`.
    pub fn fingers(&self) -> &[PoseSegment] {
        &self.segments[self.split_point()..]
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

// ──────────────────────────────────────────────
// Payload de pose (mensagem "02")
// ──────────────────────────────────────────────

/// Conteúdo de uma mensagem de pose em quaternions.
#[derive(Debug, Clone, Copy)]
pub struct QuaternionPose<'a> {
    /// Timecode em milissegundos
    pub time_code_ms: i32,
    /// Identificador do personagem (constante na sessão)
    pub character_id: u8,
    pub body: &'a [PoseSegment],
    pub fingers: &'a [PoseSegment],
}

impl<'a> QuaternionPose<'a> {
    /// Monta o payload a partir de um frame, particionando corpo/dedos.
    pub fn from_frame(frame: &'a Frame, time_code_ms: i32, character_id: u8) -> Self {
        Self {
            time_code_ms,
            character_id,
            body: frame.body(),
            fingers: frame.fingers(),
        }
    }

    pub fn segment_count(&self) -> usize {
        self.body.len() + self.fingers.len()
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
