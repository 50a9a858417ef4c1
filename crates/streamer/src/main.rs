//! # MXTP Streamer
//!
//! Transmite frames de pose esquelética para um receptor de motion capture
//! (plugin de game engine) via UDP, no protocolo MXTP de quaternions.
//!
//! A animação vem de um rig procedural construído a partir da seção
//! `[mapping]` do `config.toml`. `Ctrl-C` encerra o loop.
//!
//! ## Uso
//! ```bash
//! mxtp_streamer                 # config.toml ao lado do executável
//! mxtp_streamer meu_config.toml # caminho explícito
//! ```

mod procedural_rig;

use mxtp_core::config::AppConfig;
use mxtp_core::streamer::{StreamOptions, StreamingLoop};
use mxtp_core::transport::UdpTransport;
use procedural_rig::ProceduralRig;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

/// Ciclos de passo por segundo do rig procedural.
const WALK_CYCLE_HZ: f32 = 0.8;

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── Carregar config ──
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(AppConfig::default_path);
    let config = AppConfig::load(&config_path);

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("Config inválida: {e}");
        }
        return ExitCode::FAILURE;
    }

    let streamer_cfg = &config.streamer;

    // ── Socket UDP ──
    let transport = match UdpTransport::open(streamer_cfg) {
        Ok(t) => t,
        Err(e) => {
            error!("Falha ao criar socket UDP: {e}");
            return ExitCode::FAILURE;
        }
    };
    let dest_addr = transport.dest();

    // ── Motor de animação ──
    let rig = ProceduralRig::for_mapping(&config.mapping, WALK_CYCLE_HZ);
    info!("Rig procedural inicializado");

    // ── Cancelamento ──
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Sinal de parada recebido");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Não foi possível instalar handler de Ctrl-C: {e}");
    }

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   ⚡ MXTP STREAMER – ATIVO");
    println!("══════════════════════════════════════════════");
    println!("  Destino:     {dest_addr}");
    println!("  FPS:         {:.1}", streamer_cfg.fps);
    println!("  World scale: {}", streamer_cfg.world_scale);
    println!("  Personagem:  {}", streamer_cfg.character_id);
    println!("  Segmentos:   {}", config.mapping.bones.len());
    println!("══════════════════════════════════════════════");
    println!();

    // ── Loop principal ──
    let options = StreamOptions::from(streamer_cfg);
    let mut stream = StreamingLoop::new(rig, transport, config.mapping.clone(), options);

    match stream.run(&running) {
        Ok(()) => {
            let session = stream.session();
            info!(
                "Encerrado: {} frames ({:.1}s de animação), {} poses, {} falhas de envio",
                session.frame_index,
                stream.engine().time(),
                session.sample_counter,
                session.failed_sends
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Falha na inicialização do streaming: {e}");
            ExitCode::FAILURE
        }
    }
}
