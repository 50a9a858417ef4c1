//! # MXTP Capture
//!
//! Ferramenta de diagnóstico do protocolo: escuta a porta UDP do receptor
//! e anexa cada datagrama recebido, com timestamp, a um arquivo de texto.
//! Não faz parte do contrato de streaming.
//!
//! `Ctrl-C` encerra a captura.

mod capture_log;
mod net_thread;

use capture_log::CaptureLog;
use mxtp_core::config::AppConfig;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── Config ──
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(AppConfig::default_path);
    let config = AppConfig::load(&config_path);

    if !config_path.exists() {
        let _ = config.save(&config_path);
    }

    let capture_cfg = config.capture;
    let output_path = Path::new(&capture_cfg.output_path);

    let mut log = match CaptureLog::open(output_path) {
        Ok(log) => log,
        Err(e) => {
            error!("Falha ao abrir {}: {e}", output_path.display());
            return ExitCode::FAILURE;
        }
    };

    // ── Cancelamento ──
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Não foi possível instalar handler de Ctrl-C: {e}");
    }

    // ── Thread de rede ──
    let rx = match net_thread::spawn_capture_thread(
        capture_cfg.bind_ip.clone(),
        capture_cfg.port,
        capture_cfg.sender_ip.clone(),
        running.clone(),
    ) {
        Ok(rx) => rx,
        Err(e) => {
            error!("Falha ao criar thread de rede: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!("Gravando datagramas em {}", output_path.display());

    // ── Loop de escrita ──
    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(Duration::from_secs(1)) {
            Ok(msg) => {
                debug!("{} bytes de {}", msg.bytes.len(), msg.source_addr);
                if let Err(e) = log.append(&msg) {
                    error!("Erro ao gravar captura: {e}");
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }
    }

    info!("Captura encerrada: {} datagramas gravados", log.entries());
    ExitCode::SUCCESS
}
