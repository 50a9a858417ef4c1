//! Envio de datagramas sem garantia de entrega.
//!
//! Sem ACK, sem retry, sem backpressure: o socket UDP fica em modo
//! não-bloqueante e qualquer falha volta como `io::Error` para o loop
//! contabilizar.

use crate::config::StreamerConfig;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use tracing::info;

/// Destino de datagramas do streaming.
pub trait Transport {
    /// Envia um datagrama inteiro; retorna os bytes enviados.
    fn send(&mut self, datagram: &[u8]) -> io::Result<usize>;
}

/// Transporte UDP (unicast ou broadcast).
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    dest: SocketAddr,
}

impl UdpTransport {
    /// Abre o socket conforme a configuração do streamer.
    pub fn open(cfg: &StreamerConfig) -> io::Result<Self> {
        let dest = (cfg.dest_ip.as_str(), cfg.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    format!("destino sem endereço: {}:{}", cfg.dest_ip, cfg.port),
                )
            })?;

        let bind = if cfg.bind_ip.is_empty() {
            "0.0.0.0:0".to_string()
        } else {
            format!("{}:0", cfg.bind_ip)
        };
        let socket = UdpSocket::bind(bind)?;

        if cfg.mode == "broadcast" || cfg.dest_ip == "255.255.255.255" {
            socket.set_broadcast(true)?;
            info!("Modo BROADCAST ativado");
        } else {
            info!("Modo UNICAST → {dest}");
        }
        socket.set_nonblocking(true)?;

        Ok(Self { socket, dest })
    }

    pub fn dest(&self) -> SocketAddr {
        self.dest
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, datagram: &[u8]) -> io::Result<usize> {
        self.socket.send_to(datagram, self.dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn delivers_datagram_to_unicast_destination() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let cfg = StreamerConfig {
            mode: "unicast".into(),
            dest_ip: "127.0.0.1".into(),
            port: listener.local_addr().unwrap().port(),
            bind_ip: "127.0.0.1".into(),
            ..Default::default()
        };

        let mut transport = UdpTransport::open(&cfg).unwrap();
        assert_eq!(transport.dest(), listener.local_addr().unwrap());
        assert_eq!(transport.send(b"MXTP25").unwrap(), 6);

        let mut buf = [0u8; 64];
        let (n, _) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"MXTP25");
    }
}
