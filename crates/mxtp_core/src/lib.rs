//! # MXTP Core
//!
//! Crate compartilhada com o protocolo binário MXTP (pose em quaternions),
//! a calibração/conversão de pose e o loop de streaming em cadência fixa.
//!
//! ## Módulos
//! - [`segments`] – Tabelas ordenadas de segmentos (corpo e dedos)
//! - [`types`] – Amostras de pose e frames
//! - [`protocol`] – Encoder dos datagramas de pose e timecode
//! - [`engine`] – Interface com o motor de animação externo
//! - [`mapping`] – Mapeamento segmento → osso do rig
//! - [`pose`] – Pose de referência e conversão de coordenadas
//! - [`transport`] – Envio UDP sem garantia de entrega
//! - [`streamer`] – Loop de streaming
//! - [`config`] – Configuração unificada via TOML

pub mod segments;
pub mod types;
pub mod protocol;
pub mod engine;
pub mod mapping;
pub mod pose;
pub mod transport;
pub mod streamer;
pub mod config;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports convenientes
pub use config::{AppConfig, CaptureConfig, StreamerConfig};
pub use engine::{AnimationEngine, BoneId, WorldTransform};
pub use mapping::BoneMapping;
pub use protocol::{encode_quaternion_pose, encode_timecode, decode_header, MAGIC};
pub use streamer::{StreamError, StreamOptions, StreamingLoop, TickOutcome};
pub use transport::{Transport, UdpTransport};
