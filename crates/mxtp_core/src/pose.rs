//! Calibração e conversão de pose.
//!
//! Fluxo por sessão:
//! 1. [`Rig::resolve`] – casa o mapeamento com os ossos do motor (uma vez)
//! 2. [`ReferencePose::capture`] – guarda a rotação de referência (T-pose)
//! 3. [`FrameSampler::sample`] – a cada tick lê o motor e converte para o fio
//!
//! Convenção do receptor: espelha o sistema de coordenadas de origem
//! (nega y e z da rotação), expressa a rotação relativa à referência e
//! remapeia os eixos para `(w, -z, x, -y)`. Só a raiz transmite posição,
//! como `(z, x, y) / world_scale`; os demais segmentos vão com `(0, 0, 0)`.

use crate::engine::{AnimationEngine, BoneId, BoneIndex, WorldTransform};
use crate::mapping::BoneMapping;
use crate::segments::{ROOT_SEGMENT, SegmentGroup, SegmentTable};
use crate::types::{Frame, PoseSegment};
use glam::{Quat, Vec3};
use tracing::{debug, info};

/// Erros de calibração/amostragem.
#[derive(Debug, thiserror::Error)]
pub enum PoseError {
    #[error("Osso \"{bone}\" não encontrado para o segmento {segment}")]
    MissingBone { segment: String, bone: String },

    #[error("Segmento desconhecido no mapeamento: {0}")]
    UnknownSegment(String),

    #[error("Segmento do corpo sem mapeamento: {0}")]
    UnmappedBodySegment(&'static str),
}

/// Espelhamento do sistema de coordenadas de origem.
pub fn mirror(rotation: Quat) -> Quat {
    Quat::from_xyzw(rotation.x, -rotation.y, -rotation.z, rotation.w)
}

// ──────────────────────────────────────────────
// Rig
// ──────────────────────────────────────────────

/// Segmento mapeado para um osso do motor.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedSegment {
    pub name: &'static str,
    pub group: SegmentGroup,
    pub bone_name: String,
    pub bone: BoneId,
}

impl MappedSegment {
    pub fn is_root(&self) -> bool {
        self.name == ROOT_SEGMENT
    }

    fn missing_bone(&self) -> PoseError {
        PoseError::MissingBone {
            segment: self.name.into(),
            bone: self.bone_name.clone(),
        }
    }
}

/// Segmentos mapeados na ordem das tabelas (corpo, depois dedos).
#[derive(Debug, Clone)]
pub struct Rig {
    segments: Vec<MappedSegment>,
}

impl Rig {
    /// Resolve o mapeamento contra os ossos do motor.
    ///
    /// O corpo inteiro precisa estar mapeado: o datagrama reserva as 23
    /// primeiras posições para ele. Dedos são opcionais.
    pub fn resolve<E: AnimationEngine + ?Sized>(
        mapping: &BoneMapping,
        engine: &E,
    ) -> Result<Self, PoseError> {
        let table = SegmentTable::global();
        if let Some(unknown) = mapping.bones.keys().find(|k| table.group_of(k).is_none()) {
            return Err(PoseError::UnknownSegment(unknown.clone()));
        }

        let index = BoneIndex::build(engine);
        let mut segments = Vec::with_capacity(mapping.bones.len());

        for group in [SegmentGroup::Body, SegmentGroup::Finger] {
            for &name in group.names() {
                let Some(bone_name) = mapping.bone_name(name) else {
                    if group == SegmentGroup::Body {
                        return Err(PoseError::UnmappedBodySegment(name));
                    }
                    continue;
                };
                let Some(bone) = index.get(&bone_name) else {
                    return Err(PoseError::MissingBone {
                        segment: name.into(),
                        bone: bone_name,
                    });
                };
                segments.push(MappedSegment {
                    name,
                    group,
                    bone_name,
                    bone,
                });
            }
        }

        debug!(
            "Rig resolvido: {} segmentos ({} ossos no motor)",
            segments.len(),
            index.len()
        );
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[MappedSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn finger_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| s.group == SegmentGroup::Finger)
            .count()
    }
}

// ──────────────────────────────────────────────
// Pose de referência
// ──────────────────────────────────────────────

/// Rotações de referência (já espelhadas), capturadas uma única vez.
#[derive(Debug, Clone)]
pub struct ReferencePose {
    rotations: Vec<(&'static str, Quat)>,
}

impl ReferencePose {
    /// Captura a rotação atual de cada segmento do rig.
    pub fn capture<E: AnimationEngine + ?Sized>(rig: &Rig, engine: &E) -> Result<Self, PoseError> {
        let rotations = rig
            .segments()
            .iter()
            .map(|seg| {
                engine
                    .world_transform(seg.bone)
                    .map(|t| (seg.name, mirror(t.rotation)))
                    .ok_or_else(|| seg.missing_bone())
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!("Pose de referência capturada ({} segmentos)", rotations.len());
        Ok(Self { rotations })
    }

    pub fn get(&self, segment: &str) -> Option<Quat> {
        self.rotations
            .iter()
            .find(|(name, _)| *name == segment)
            .map(|(_, q)| *q)
    }

    pub fn len(&self) -> usize {
        self.rotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rotations.is_empty()
    }

    fn at(&self, slot: usize) -> Quat {
        self.rotations[slot].1
    }
}

// ──────────────────────────────────────────────
// Conversão de coordenadas
// ──────────────────────────────────────────────

/// Converte transformações de mundo para a convenção do receptor.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateConverter {
    /// Divisor de unidades (ex: 100 para cm → m)
    pub world_scale: f32,
}

impl CoordinateConverter {
    pub fn new(world_scale: f32) -> Self {
        Self { world_scale }
    }

    /// `current ∘ inverse(reference)`, com `current` ainda não espelhado.
    pub fn relative_rotation(&self, current: Quat, reference: Quat) -> Quat {
        mirror(current) * reference.inverse()
    }

    /// Ordem dos componentes no fio: `(w, -z, x, -y)`.
    pub fn wire_rotation(rotation: Quat) -> [f32; 4] {
        [rotation.w, -rotation.z, rotation.x, -rotation.y]
    }

    /// Posição da raiz: `(z, x, y) / world_scale`.
    pub fn root_position(&self, position: Vec3) -> [f32; 3] {
        [
            position.z / self.world_scale,
            position.x / self.world_scale,
            position.y / self.world_scale,
        ]
    }

    pub fn convert(
        &self,
        segment: &MappedSegment,
        transform: &WorldTransform,
        reference: Quat,
    ) -> PoseSegment {
        let rotation = self.relative_rotation(transform.rotation, reference);
        let position = if segment.is_root() {
            self.root_position(transform.position)
        } else {
            [0.0; 3]
        };

        PoseSegment {
            id: segment.name.to_string(),
            position,
            rotation: Self::wire_rotation(rotation),
        }
    }
}

// ──────────────────────────────────────────────
// Amostragem
// ──────────────────────────────────────────────

/// Rig calibrado: lê o motor e produz frames prontos para o encoder.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    rig: Rig,
    reference: ReferencePose,
    converter: CoordinateConverter,
}

impl FrameSampler {
    /// Resolve o rig e captura a pose de referência no estado atual do motor.
    pub fn calibrate<E: AnimationEngine + ?Sized>(
        mapping: &BoneMapping,
        engine: &E,
        world_scale: f32,
    ) -> Result<Self, PoseError> {
        let rig = Rig::resolve(mapping, engine)?;
        let reference = ReferencePose::capture(&rig, engine)?;
        Ok(Self {
            rig,
            reference,
            converter: CoordinateConverter::new(world_scale),
        })
    }

    pub fn rig(&self) -> &Rig {
        &self.rig
    }

    pub fn reference(&self) -> &ReferencePose {
        &self.reference
    }

    /// Amostra o frame atual. Um osso ausente aborta o frame inteiro.
    pub fn sample<E: AnimationEngine + ?Sized>(&self, engine: &E) -> Result<Frame, PoseError> {
        let segments = self
            .rig
            .segments()
            .iter()
            .enumerate()
            .map(|(slot, seg)| {
                let transform = engine
                    .world_transform(seg.bone)
                    .ok_or_else(|| seg.missing_bone())?;
                Ok(self
                    .converter
                    .convert(seg, &transform, self.reference.at(slot)))
            })
            .collect::<Result<Vec<_>, PoseError>>()?;

        Ok(Frame::new(segments))
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedEngine;

    const EPS: f32 = 1e-5;

    fn assert_identity(rotation: [f32; 4]) {
        assert!((rotation[0] - 1.0).abs() < EPS, "w = {}", rotation[0]);
        for c in &rotation[1..] {
            assert!(c.abs() < EPS, "componente {c}");
        }
    }

    #[test]
    fn mirror_negates_y_and_z() {
        let q = Quat::from_xyzw(0.1, 0.2, 0.3, 0.9);
        let m = mirror(q);
        assert_eq!((m.x, m.y, m.z, m.w), (0.1, -0.2, -0.3, 0.9));
    }

    #[test]
    fn same_rotation_as_reference_is_identity() {
        let converter = CoordinateConverter::new(100.0);
        let r = Quat::from_euler(glam::EulerRot::XYZ, 0.4, -1.1, 2.3);
        let rel = converter.relative_rotation(r, mirror(r));
        assert_identity(CoordinateConverter::wire_rotation(rel));
    }

    #[test]
    fn wire_rotation_remaps_axes() {
        let q = Quat::from_xyzw(0.1, 0.2, 0.3, 0.9);
        assert_eq!(CoordinateConverter::wire_rotation(q), [0.9, -0.3, 0.1, -0.2]);
    }

    #[test]
    fn root_position_is_permuted_and_scaled() {
        let converter = CoordinateConverter::new(100.0);
        let p = converter.root_position(Vec3::new(1.0, 2.0, 3.0));
        assert!((p[0] - 0.03).abs() < EPS);
        assert!((p[1] - 0.01).abs() < EPS);
        assert!((p[2] - 0.02).abs() < EPS);
    }

    #[test]
    fn only_root_carries_position() {
        let mut engine = ScriptedEngine::mixamo();
        let sampler = FrameSampler::calibrate(&BoneMapping::mixamo(), &engine, 100.0).unwrap();

        engine.set_position("mixamorigHips", Vec3::new(1.0, 2.0, 3.0));
        engine.set_position("mixamorigHead", Vec3::new(10.0, 170.0, 5.0));
        let frame = sampler.sample(&engine).unwrap();

        let pelvis = &frame.segments[0];
        assert_eq!(pelvis.id, "Pelvis");
        assert!((pelvis.position[0] - 0.03).abs() < EPS);
        assert!((pelvis.position[1] - 0.01).abs() < EPS);
        assert!((pelvis.position[2] - 0.02).abs() < EPS);

        let head = frame.segments.iter().find(|s| s.id == "Head").unwrap();
        assert_eq!(head.position, [0.0; 3]);
    }

    #[test]
    fn unchanged_engine_samples_identity() {
        let mut engine = ScriptedEngine::mixamo();
        engine.set_rotation(
            "mixamorigLeftArm",
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
        );
        let sampler = FrameSampler::calibrate(&BoneMapping::mixamo(), &engine, 100.0).unwrap();
        let frame = sampler.sample(&engine).unwrap();
        for seg in &frame.segments {
            assert_identity(seg.rotation);
        }
    }

    #[test]
    fn rotation_is_relative_to_reference() {
        let mut engine = ScriptedEngine::mixamo();
        let sampler = FrameSampler::calibrate(&BoneMapping::mixamo(), &engine, 100.0).unwrap();

        let turn = Quat::from_rotation_x(0.5);
        engine.set_rotation("mixamorigHead", turn);
        let frame = sampler.sample(&engine).unwrap();
        let head = frame.segments.iter().find(|s| s.id == "Head").unwrap();

        let expected = CoordinateConverter::wire_rotation(mirror(turn));
        for (a, b) in head.rotation.iter().zip(expected) {
            assert!((a - b).abs() < EPS);
        }
    }

    #[test]
    fn frame_follows_table_order() {
        let engine = ScriptedEngine::mixamo();
        let sampler = FrameSampler::calibrate(&BoneMapping::mixamo(), &engine, 100.0).unwrap();
        let frame = sampler.sample(&engine).unwrap();
        let ids: Vec<&str> = frame.segments.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, crate::segments::BODY_SEGMENTS.to_vec());
        assert_eq!(sampler.reference().len(), 23);
        assert!(sampler.reference().get("Pelvis").is_some());
    }

    #[test]
    fn fingers_follow_body() {
        let mut mapping = BoneMapping::mixamo();
        mapping
            .bones
            .insert("Right Carpus".into(), "RightHandCarpus".into());
        mapping
            .bones
            .insert("Left Carpus".into(), "LeftHandCarpus".into());
        let mut engine = ScriptedEngine::mixamo();
        engine.add_bone("mixamorigRightHandCarpus");
        engine.add_bone("mixamorigLeftHandCarpus");

        let rig = Rig::resolve(&mapping, &engine).unwrap();
        assert_eq!(rig.len(), 25);
        assert_eq!(rig.finger_count(), 2);
        assert_eq!(rig.segments()[23].name, "Left Carpus");
        assert_eq!(rig.segments()[24].name, "Right Carpus");
    }

    #[test]
    fn missing_bone_aborts_calibration() {
        let mut engine = ScriptedEngine::mixamo();
        engine.remove_bone("mixamorigLeftFoot");
        let err = FrameSampler::calibrate(&BoneMapping::mixamo(), &engine, 100.0).unwrap_err();
        assert!(matches!(
            err,
            PoseError::MissingBone { ref segment, ref bone }
                if segment == "Left Foot" && bone == "mixamorigLeftFoot"
        ));
    }

    #[test]
    fn missing_bone_aborts_sample() {
        let mut engine = ScriptedEngine::mixamo();
        let sampler = FrameSampler::calibrate(&BoneMapping::mixamo(), &engine, 100.0).unwrap();
        engine.hide("mixamorigHead");
        assert!(matches!(
            sampler.sample(&engine),
            Err(PoseError::MissingBone { .. })
        ));
    }

    #[test]
    fn mapping_must_cover_body() {
        let engine = ScriptedEngine::mixamo();
        let mut mapping = BoneMapping::mixamo();
        mapping.bones.remove("Neck");
        assert!(matches!(
            Rig::resolve(&mapping, &engine),
            Err(PoseError::UnmappedBodySegment("Neck"))
        ));
    }

    #[test]
    fn mapping_with_unknown_segment_is_rejected() {
        let engine = ScriptedEngine::mixamo();
        let mut mapping = BoneMapping::mixamo();
        mapping.bones.insert("Tail".into(), "Tail".into());
        assert!(matches!(
            Rig::resolve(&mapping, &engine),
            Err(PoseError::UnknownSegment(ref s)) if s == "Tail"
        ));
    }
}
