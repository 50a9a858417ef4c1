//! Mapeamento segmento canônico → osso do rig de origem.
//!
//! Nome completo do osso = `prefix + sufixo`. Pode ser definido na seção
//! `[mapping]` do `config.toml`; o padrão é o preset `mixamo`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tabela de mapeamento de ossos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoneMapping {
    /// Prefixo comum dos nomes de osso (ex: "mixamorig")
    pub prefix: String,
    /// Segmento canônico → sufixo do osso
    pub bones: BTreeMap<String, String>,
}

impl Default for BoneMapping {
    fn default() -> Self {
        Self::mixamo()
    }
}

impl BoneMapping {
    /// Preset para rigs exportados pelo Mixamo.
    ///
    /// L5/T12 compartilham ossos com os vizinhos; o receptor não os usa.
    pub fn mixamo() -> Self {
        let bones = [
            ("Pelvis", "Hips"),
            ("L5", "Spine"),
            ("L3", "Spine1"),
            ("T12", "Spine2"),
            ("T8", "Spine2"),
            ("Neck", "Neck"),
            ("Head", "Head"),
            ("Right Shoulder", "RightShoulder"),
            ("Right Upper Arm", "RightArm"),
            ("Right Forearm", "RightForeArm"),
            ("Right Hand", "RightHand"),
            ("Left Shoulder", "LeftShoulder"),
            ("Left Upper Arm", "LeftArm"),
            ("Left Forearm", "LeftForeArm"),
            ("Left Hand", "LeftHand"),
            ("Right Upper Leg", "RightUpLeg"),
            ("Right Lower Leg", "RightLeg"),
            ("Right Foot", "RightFoot"),
            ("Right Toe", "RightToeBase"),
            ("Left Upper Leg", "LeftUpLeg"),
            ("Left Lower Leg", "LeftLeg"),
            ("Left Foot", "LeftFoot"),
            ("Left Toe", "LeftToeBase"),
        ]
        .into_iter()
        .map(|(segment, bone)| (segment.to_string(), bone.to_string()))
        .collect();

        Self {
            prefix: "mixamorig".into(),
            bones,
        }
    }

    /// Busca um preset pelo nome.
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "mixamo" => Some(Self::mixamo()),
            _ => None,
        }
    }

    /// Nome completo do osso mapeado para `segment`.
    pub fn bone_name(&self, segment: &str) -> Option<String> {
        self.bones
            .get(segment)
            .map(|suffix| format!("{}{}", self.prefix, suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::BODY_SEGMENTS;

    #[test]
    fn mixamo_covers_whole_body() {
        let mapping = BoneMapping::mixamo();
        for segment in BODY_SEGMENTS {
            assert!(mapping.bones.contains_key(segment), "faltando {segment}");
        }
        assert_eq!(mapping.bone_name("Pelvis").as_deref(), Some("mixamorigHips"));
        assert_eq!(mapping.bone_name("Tail"), None);
    }

    #[test]
    fn preset_lookup() {
        assert_eq!(BoneMapping::preset("Mixamo"), Some(BoneMapping::mixamo()));
        assert!(BoneMapping::preset("bvh").is_none());
    }

    #[test]
    fn mapping_from_toml() {
        let src = r#"
prefix = "rig:"
[bones]
Pelvis = "root"
"Right Hand" = "hand_r"
"#;
        let mapping: BoneMapping = toml::from_str(src).unwrap();
        assert_eq!(mapping.bones.len(), 2);
        assert_eq!(mapping.bone_name("Right Hand").as_deref(), Some("rig:hand_r"));
    }
}
