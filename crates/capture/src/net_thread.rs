//! Thread de rede que escuta UDP e repassa datagramas brutos via channel.

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender, bounded};
use std::net::UdpSocket;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Datagrama recebido, com carimbo de tempo da chegada.
#[derive(Debug, Clone)]
pub struct CapturedDatagram {
    pub received_at: DateTime<Utc>,
    pub source_addr: String,
    pub bytes: Vec<u8>,
}

/// Inicia a thread de rede. Retorna o receiver do channel.
pub fn spawn_capture_thread(
    bind_ip: String,
    port: u16,
    sender_ip_filter: String,
    running: Arc<AtomicBool>,
) -> std::io::Result<Receiver<CapturedDatagram>> {
    let (tx, rx) = bounded::<CapturedDatagram>(256);

    std::thread::Builder::new()
        .name("udp-capture".into())
        .spawn(move || {
            capture_loop(&tx, &bind_ip, port, &sender_ip_filter, &running);
        })?;

    Ok(rx)
}

fn capture_loop(
    tx: &Sender<CapturedDatagram>,
    bind_ip: &str,
    port: u16,
    sender_ip_filter: &str,
    running: &AtomicBool,
) {
    let bind_ip = if bind_ip.is_empty() { "0.0.0.0" } else { bind_ip };

    while running.load(Ordering::SeqCst) {
        match UdpSocket::bind(format!("{bind_ip}:{port}")) {
            Ok(sock) => {
                sock.set_read_timeout(Some(Duration::from_secs(1))).ok();

                let mode = if sender_ip_filter.is_empty() {
                    "qualquer origem"
                } else {
                    sender_ip_filter
                };
                info!("Captura escutando em {bind_ip}:{port} – Origem: {mode}");

                let mut buf = [0u8; 65536];
                while running.load(Ordering::SeqCst) {
                    match sock.recv_from(&mut buf) {
                        Ok((size, addr)) => {
                            let source = addr.ip().to_string();

                            // Filtro de IP se configurado
                            if !sender_ip_filter.is_empty() && source != sender_ip_filter {
                                debug!("Ignorando pacote de {source} (esperado: {sender_ip_filter})");
                                continue;
                            }

                            let msg = CapturedDatagram {
                                received_at: Utc::now(),
                                source_addr: addr.to_string(),
                                bytes: buf[..size].to_vec(),
                            };
                            // Non-blocking send: se o writer está lento, descarta
                            if tx.try_send(msg).is_err() {
                                warn!("Channel cheio, descartando datagrama de {source}");
                            }
                        }
                        Err(ref e)
                            if e.kind() == std::io::ErrorKind::TimedOut
                                || e.kind() == std::io::ErrorKind::WouldBlock =>
                        {
                            // Timeout normal, volta a checar a flag
                        }
                        Err(e) => {
                            warn!("Erro ao receber UDP: {e}");
                        }
                    }
                }
            }
            Err(e) => {
                error!("Falha ao bind porta {port}: {e}. Tentando novamente em 2s...");
                std::thread::sleep(Duration::from_secs(2));
            }
        }
    }

    debug!("Thread de captura encerrada");
}
