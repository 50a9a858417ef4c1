//! Interface com o motor de animação externo.
//!
//! O núcleo nunca lê arquivos de animação nem percorre hierarquias de
//! ossos: ele só pede ao motor para avançar o tempo e lê transformações em
//! espaço de mundo.

use glam::{Quat, Vec3};
use std::collections::HashMap;

/// Identificador de osso: posição na lista de [`AnimationEngine::bone_names`].
pub type BoneId = usize;

/// Transformação de um osso em espaço de mundo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldTransform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for WorldTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Motor de animação que alimenta o streaming.
pub trait AnimationEngine {
    /// Animação carregada e pronta para amostragem.
    fn is_ready(&self) -> bool;

    /// Avança o relógio da animação.
    fn advance(&mut self, delta_secs: f32);

    /// Nomes de todos os ossos; o índice na lista é o [`BoneId`].
    fn bone_names(&self) -> Vec<String>;

    /// Transformação atual de um osso, `None` se o osso sumiu.
    fn world_transform(&self, bone: BoneId) -> Option<WorldTransform>;
}

/// Índice nome → [`BoneId`] montado uma vez por sessão.
#[derive(Debug, Clone, Default)]
pub struct BoneIndex {
    by_name: HashMap<String, BoneId>,
}

impl BoneIndex {
    pub fn build<E: AnimationEngine + ?Sized>(engine: &E) -> Self {
        let by_name = engine
            .bone_names()
            .into_iter()
            .enumerate()
            .map(|(id, name)| (name, id))
            .collect();
        Self { by_name }
    }

    pub fn get(&self, name: &str) -> Option<BoneId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
