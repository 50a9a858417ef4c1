//! Motor de animação procedural – ciclo de caminhada sintético.
//!
//! Não lê nenhum asset: cria um osso para cada entrada do mapeamento
//! (`prefix + sufixo`) e anima por palavra-chave do nome:
//! - `Hips` — sobe/desce duas vezes por ciclo
//! - `UpLeg`/`Leg` — balanço no eixo X, pernas em oposição
//! - `Arm`/`ForeArm` — balanço contrário às pernas
//! - `Spine` — torção leve no eixo Y
//!
//! Ossos sem palavra-chave ficam parados na pose de repouso.

use glam::{Quat, Vec3};
use mxtp_core::engine::{AnimationEngine, BoneId, WorldTransform};
use mxtp_core::mapping::BoneMapping;
use std::f32::consts::TAU;
use tracing::debug;

/// Altura do quadril em repouso (cm).
const HIPS_HEIGHT: f32 = 95.0;
/// Amplitude do sobe/desce do quadril (cm).
const HIPS_BOB: f32 = 2.5;

#[derive(Debug, Clone)]
struct Bone {
    name: String,
    rest_position: Vec3,
    axis: Vec3,
    /// Amplitude (rad)
    amplitude: f32,
    /// Fase (rad)
    phase: f32,
    root: bool,
}

/// Rig procedural que implementa [`AnimationEngine`].
#[derive(Debug, Clone)]
pub struct ProceduralRig {
    bones: Vec<Bone>,
    /// Tempo de animação (s)
    time: f32,
    /// Ciclos de passo por segundo
    cycle_hz: f32,
}

impl ProceduralRig {
    /// Cria um osso por entrada do mapeamento.
    pub fn for_mapping(mapping: &BoneMapping, cycle_hz: f32) -> Self {
        let mut names: Vec<String> = mapping
            .bones
            .values()
            .map(|suffix| format!("{}{}", mapping.prefix, suffix))
            .collect();
        names.sort();
        names.dedup();

        let bones: Vec<Bone> = names
            .into_iter()
            .map(|name| bone_for(&mapping.prefix, name))
            .collect();
        debug!("Rig procedural: {} ossos", bones.len());

        Self {
            bones,
            time: 0.0,
            cycle_hz,
        }
    }

    pub fn time(&self) -> f32 {
        self.time
    }
}

fn bone_for(prefix: &str, name: String) -> Bone {
    let suffix = name.strip_prefix(prefix).unwrap_or(&name);
    let left = suffix.starts_with("Left");
    let side = if left { 1.0 } else { -1.0 };

    let root = suffix == "Hips";

    let (rest_position, axis, amplitude, phase) = if root {
        (Vec3::new(0.0, HIPS_HEIGHT, 0.0), Vec3::Y, 0.05, 0.0)
    } else if suffix.contains("UpLeg") {
        (Vec3::new(side * 10.0, 90.0, 0.0), Vec3::X, 0.45, phase_for(left))
    } else if suffix.contains("Leg") {
        (Vec3::new(side * 10.0, 50.0, 0.0), Vec3::X, 0.35, phase_for(left) + 0.6)
    } else if suffix.contains("ForeArm") {
        (Vec3::new(side * 45.0, 140.0, 0.0), Vec3::X, 0.2, phase_for(!left) + 0.3)
    } else if suffix.contains("Arm") {
        (Vec3::new(side * 20.0, 145.0, 0.0), Vec3::X, 0.3, phase_for(!left))
    } else if suffix.contains("Spine") {
        (Vec3::new(0.0, 110.0, 0.0), Vec3::Y, 0.06, 0.0)
    } else {
        (Vec3::new(0.0, 120.0, 0.0), Vec3::Y, 0.0, 0.0)
    };

    Bone {
        name,
        rest_position,
        axis,
        amplitude,
        phase,
        root,
    }
}

/// Esquerda e direita em oposição de fase.
fn phase_for(left: bool) -> f32 {
    if left { 0.0 } else { TAU / 2.0 }
}

impl AnimationEngine for ProceduralRig {
    fn is_ready(&self) -> bool {
        !self.bones.is_empty()
    }

    fn advance(&mut self, delta_secs: f32) {
        self.time += delta_secs;
    }

    fn bone_names(&self) -> Vec<String> {
        self.bones.iter().map(|b| b.name.clone()).collect()
    }

    fn world_transform(&self, bone: BoneId) -> Option<WorldTransform> {
        let bone = self.bones.get(bone)?;
        let cycle = TAU * self.cycle_hz * self.time;
        let angle = bone.amplitude * (cycle + bone.phase).sin();

        let mut position = bone.rest_position;
        if bone.root {
            position.y += HIPS_BOB * (2.0 * cycle).sin();
        }

        Some(WorldTransform {
            position,
            rotation: Quat::from_axis_angle(bone.axis, angle),
        })
    }
}
