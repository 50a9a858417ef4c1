//! Arquivo de captura: uma linha por datagrama.
//!
//! Formato: `<timestamp RFC 3339> <origem> [<resumo>] <texto>` onde o resumo
//! vem do header MXTP e o texto é o datagrama como UTF-8 com perdas
//! (caracteres de controle viram `.`, para manter uma linha por datagrama).

use crate::net_thread::CapturedDatagram;
use chrono::SecondsFormat;
use mxtp_core::protocol::{self, MessageType};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Writer que anexa entradas ao arquivo de captura.
pub struct CaptureLog {
    writer: BufWriter<File>,
    entries: u64,
}

impl CaptureLog {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            entries: 0,
        })
    }

    /// Anexa um datagrama e faz flush (a captura pode ser morta a qualquer momento).
    pub fn append(&mut self, msg: &CapturedDatagram) -> io::Result<()> {
        writeln!(self.writer, "{}", format_entry(msg))?;
        self.writer.flush()?;
        self.entries += 1;
        Ok(())
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }
}

/// Resumo do header MXTP de um datagrama.
pub fn summarize(bytes: &[u8]) -> String {
    match protocol::decode_header(bytes) {
        Ok(header) => match header.message_type() {
            Some(MessageType::TimeCode) => format!(
                "MXTP 25 #{} {}",
                header.sample_counter,
                protocol::timecode_text(bytes).unwrap_or("?")
            ),
            Some(MessageType::PoseQuaternion) => format!(
                "MXTP 02 #{} t={}ms char={} body={} fingers={} payload={}",
                header.sample_counter,
                header.time_code,
                header.character_id,
                header.body_segment_count,
                header.finger_segment_count,
                header.payload_size
            ),
            Some(other) => format!("MXTP {other} #{}", header.sample_counter),
            None => format!(
                "MXTP tipo desconhecido {:02X?} #{}",
                header.message_type, header.sample_counter
            ),
        },
        Err(e) => format!("inválido: {e}"),
    }
}

pub fn format_entry(msg: &CapturedDatagram) -> String {
    let text: String = String::from_utf8_lossy(&msg.bytes)
        .chars()
        .map(|c| if c.is_control() { '.' } else { c })
        .collect();
    format!(
        "{} {} [{}] {}",
        msg.received_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        msg.source_addr,
        summarize(&msg.bytes),
        text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn datagram(bytes: Vec<u8>) -> CapturedDatagram {
        CapturedDatagram {
            received_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            source_addr: "127.0.0.1:50000".into(),
            bytes,
        }
    }

    #[test]
    fn timecode_entry_is_single_line() {
        let bytes = protocol::encode_timecode(7, 3_661_234).unwrap();
        let entry = format_entry(&datagram(bytes));
        assert!(entry.starts_with("2024-05-01T12:30:00.000Z 127.0.0.1:50000 [MXTP 25 #7 00:36:61.234] MXTP25"));
        assert!(entry.ends_with("00:36:61.234"));
        assert!(!entry.contains('\n'));
    }

    #[test]
    fn garbage_is_reported_as_invalid() {
        assert!(summarize(b"hello").starts_with("inválido"));
        assert!(summarize(&[0u8; 30]).starts_with("inválido"));
    }

    #[test]
    fn appends_to_file() {
        let path = std::env::temp_dir().join(format!("mxtp_capture_{}.txt", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let mut log = CaptureLog::open(&path).unwrap();
        log.append(&datagram(protocol::encode_timecode(0, 0).unwrap()))
            .unwrap();
        log.append(&datagram(b"ping".to_vec())).unwrap();
        assert_eq!(log.entries(), 2);
        drop(log);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.lines().nth(1).unwrap().ends_with("ping"));
        let _ = std::fs::remove_file(&path);
    }
}
