//! Dublês de teste: motor roteirizado e transporte que grava datagramas.

use crate::engine::{AnimationEngine, BoneId, WorldTransform};
use crate::mapping::BoneMapping;
use crate::transport::Transport;
use glam::{Quat, Vec3};
use std::collections::HashSet;
use std::io;

/// Motor de animação com transformações definidas pelo teste.
pub(crate) struct ScriptedEngine {
    names: Vec<String>,
    transforms: Vec<WorldTransform>,
    hidden: HashSet<BoneId>,
    pub ready: bool,
    pub clock: f32,
    pub advances: usize,
}

impl ScriptedEngine {
    /// Rig com todos os ossos do preset mixamo, em pose identidade.
    pub fn mixamo() -> Self {
        let mapping = BoneMapping::mixamo();
        let mut names: Vec<String> = mapping
            .bones
            .values()
            .map(|suffix| format!("{}{}", mapping.prefix, suffix))
            .collect();
        names.sort();
        names.dedup();

        let mut engine = Self {
            names: Vec::new(),
            transforms: Vec::new(),
            hidden: HashSet::new(),
            ready: true,
            clock: 0.0,
            advances: 0,
        };
        for name in names {
            engine.add_bone(&name);
        }
        engine
    }

    fn id(&self, name: &str) -> BoneId {
        self.names
            .iter()
            .position(|n| n == name)
            .unwrap_or_else(|| panic!("osso inexistente: {name}"))
    }

    pub fn add_bone(&mut self, name: &str) {
        self.names.push(name.to_string());
        self.transforms.push(WorldTransform::default());
    }

    pub fn remove_bone(&mut self, name: &str) {
        let id = self.id(name);
        self.names.remove(id);
        self.transforms.remove(id);
    }

    /// Mantém o nome, mas deixa de fornecer a transformação.
    pub fn hide(&mut self, name: &str) {
        let id = self.id(name);
        self.hidden.insert(id);
    }

    pub fn set_position(&mut self, name: &str, position: Vec3) {
        let id = self.id(name);
        self.transforms[id].position = position;
    }

    pub fn set_rotation(&mut self, name: &str, rotation: Quat) {
        let id = self.id(name);
        self.transforms[id].rotation = rotation;
    }
}

impl AnimationEngine for ScriptedEngine {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn advance(&mut self, delta_secs: f32) {
        self.clock += delta_secs;
        self.advances += 1;
    }

    fn bone_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn world_transform(&self, bone: BoneId) -> Option<WorldTransform> {
        if self.hidden.contains(&bone) {
            return None;
        }
        self.transforms.get(bone).copied()
    }
}

/// Transporte em memória; pode falhar envios de um tipo de mensagem.
#[derive(Default)]
pub(crate) struct RecordingTransport {
    pub sent: Vec<Vec<u8>>,
    /// Código de tipo (ex: `*b"02"`) cujos envios devem falhar
    pub fail_type: Option<[u8; 2]>,
}

impl Transport for RecordingTransport {
    fn send(&mut self, datagram: &[u8]) -> io::Result<usize> {
        if self.fail_type.is_some_and(|code| datagram.get(4..6) == Some(&code[..])) {
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "buffer cheio"));
        }
        self.sent.push(datagram.to_vec());
        Ok(datagram.len())
    }
}
