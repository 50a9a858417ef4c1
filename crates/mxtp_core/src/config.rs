//! Configuração unificada via TOML.
//!
//! Um único `config.toml` ao lado do executável, com seções `[streamer]`,
//! `[capture]` e `[mapping]`. Campos ausentes usam o valor padrão.

use crate::mapping::BoneMapping;
use crate::segments::{BODY_SEGMENTS, SegmentTable};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Configuração do Streamer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamerConfig {
    /// Modo de envio: "broadcast" ou "unicast"
    pub mode: String,
    /// IP/host de destino (plugin do receptor)
    pub dest_ip: String,
    /// Porta UDP
    pub port: u16,
    /// IP local para bind (vazio = auto)
    pub bind_ip: String,
    /// Frames por segundo do streaming
    pub fps: f64,
    /// Divisor de unidades de posição (ex: cm → m)
    pub world_scale: f32,
    /// Identificador do personagem
    pub character_id: u8,
    /// Folga subtraída do período de cada tick (ms)
    pub tick_slack_ms: f64,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            mode: "unicast".into(),
            dest_ip: "127.0.0.1".into(),
            port: 9763,
            bind_ip: String::new(),
            fps: 60.0,
            world_scale: 100.0,
            character_id: 0,
            tick_slack_ms: 1.0,
        }
    }
}

impl StreamerConfig {
    /// Passo de tempo da animação por tick (s).
    pub fn delta_time(&self) -> f64 {
        1.0 / self.fps
    }

    /// Período efetivo do tick: `1/fps` menos a folga.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(self.delta_time())
            .saturating_sub(Duration::from_secs_f64(self.tick_slack_ms.max(0.0) / 1000.0))
    }
}

/// Configuração da ferramenta de captura.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Porta UDP para escutar
    pub port: u16,
    /// IP local para bind (vazio = todas as interfaces)
    pub bind_ip: String,
    /// IP do streamer (vazio = aceita qualquer origem)
    pub sender_ip: String,
    /// Arquivo onde os datagramas são anexados
    pub output_path: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            port: 9763,
            bind_ip: String::new(),
            sender_ip: String::new(),
            output_path: "udp_capture.txt".into(),
        }
    }
}

/// Configuração raiz do aplicativo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub streamer: StreamerConfig,
    pub capture: CaptureConfig,
    pub mapping: BoneMapping,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content).map_err(|e| e.to_string())?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let streamer = &self.streamer;

        if streamer.port == 0 {
            errors.push("Porta do streamer não pode ser 0".into());
        }
        if !(1.0..=240.0).contains(&streamer.fps) {
            errors.push(format!("FPS inválido: {} (1–240)", streamer.fps));
        } else if streamer.tick_slack_ms < 0.0
            || streamer.tick_slack_ms >= streamer.delta_time() * 1000.0
        {
            errors.push(format!(
                "Folga do tick inválida: {} ms (deve ser menor que o período)",
                streamer.tick_slack_ms
            ));
        }
        if !(streamer.world_scale.is_finite() && streamer.world_scale > 0.0) {
            errors.push(format!("world_scale inválido: {}", streamer.world_scale));
        }
        if self.capture.port == 0 {
            errors.push("Porta da captura não pode ser 0".into());
        }
        if self.capture.output_path.is_empty() {
            errors.push("Arquivo de saída da captura não definido".into());
        }

        let table = SegmentTable::global();
        for segment in self.mapping.bones.keys() {
            if table.group_of(segment).is_none() {
                errors.push(format!("Segmento desconhecido no mapeamento: {segment}"));
            }
        }
        for segment in BODY_SEGMENTS {
            if !self.mapping.bones.contains_key(segment) {
                errors.push(format!("Segmento do corpo sem mapeamento: {segment}"));
            }
        }

        errors
    }
}
