//! Loop de streaming em cadência fixa.
//!
//! Máquina de estados: `Uninitialized` → `Streaming` (quando o motor está
//! pronto e a pose de referência foi capturada). Não há estado terminal; o
//! loop roda até a flag de execução ser baixada.
//!
//! Cada tick, em ordem:
//! 1. `timecode_ms = floor(frame_index * delta_time * 1000)`
//! 2. amostra o frame (um osso ausente aborta o tick antes de qualquer envio)
//! 3. envia o datagrama de timecode
//! 4. envia o datagrama de pose; `sample_counter` só sobe se o envio deu certo
//! 5. incrementa `frame_index` e avança o relógio do motor
//!
//! Motor "não pronto" = tick vazio: nada é enviado, nenhum contador muda.

use crate::config::StreamerConfig;
use crate::engine::AnimationEngine;
use crate::mapping::BoneMapping;
use crate::pose::{FrameSampler, PoseError};
use crate::protocol::{self, ProtocolError};
use crate::transport::Transport;
use crate::types::QuaternionPose;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Erros do streaming.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error(transparent)]
    Pose(#[from] PoseError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Parâmetros fixos da sessão.
#[derive(Debug, Clone, Copy)]
pub struct StreamOptions {
    /// Passo de tempo por tick (s)
    pub delta_time: f64,
    /// Período real entre ticks
    pub tick_period: Duration,
    pub world_scale: f32,
    pub character_id: u8,
}

impl From<&StreamerConfig> for StreamOptions {
    fn from(cfg: &StreamerConfig) -> Self {
        Self {
            delta_time: cfg.delta_time(),
            tick_period: cfg.tick_period(),
            world_scale: cfg.world_scale,
            character_id: cfg.character_id,
        }
    }
}

/// Estado mutável da sessão, exclusivo do loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Poses enviadas com sucesso
    pub sample_counter: u32,
    /// Ticks efetivamente processados
    pub frame_index: u64,
    pub character_id: u8,
    /// Datagramas entregues ao transporte
    pub datagrams_sent: u64,
    /// Datagramas cujo envio falhou
    pub failed_sends: u64,
}

/// Estado da máquina de streaming.
#[derive(Debug, Clone)]
pub enum StreamState {
    Uninitialized,
    Streaming(FrameSampler),
}

/// Resultado de um tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Motor não pronto; nada aconteceu.
    Skipped,
    Streamed {
        time_code_ms: i32,
        timecode_sent: bool,
        pose_sent: bool,
    },
}

/// Driver de streaming: motor → encoder → transporte.
pub struct StreamingLoop<E, T> {
    engine: E,
    transport: T,
    mapping: BoneMapping,
    options: StreamOptions,
    state: StreamState,
    session: SessionState,
}

impl<E: AnimationEngine, T: Transport> StreamingLoop<E, T> {
    pub fn new(engine: E, transport: T, mapping: BoneMapping, options: StreamOptions) -> Self {
        Self {
            engine,
            transport,
            mapping,
            options,
            state: StreamState::Uninitialized,
            session: SessionState {
                character_id: options.character_id,
                ..Default::default()
            },
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.state, StreamState::Streaming(_))
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Captura a pose de referência se o motor estiver pronto.
    ///
    /// Retorna `Ok(false)` enquanto o motor não estiver pronto. Depois de
    /// capturada, a referência nunca muda.
    pub fn initialize(&mut self) -> Result<bool, StreamError> {
        if self.is_streaming() {
            return Ok(true);
        }
        if !self.engine.is_ready() {
            return Ok(false);
        }

        let sampler =
            FrameSampler::calibrate(&self.mapping, &self.engine, self.options.world_scale)?;
        info!(
            "Streaming iniciado: {} segmentos ({} dedos)",
            sampler.rig().len(),
            sampler.rig().finger_count()
        );
        self.state = StreamState::Streaming(sampler);
        Ok(true)
    }

    /// Timecode do frame atual em milissegundos.
    pub fn current_time_code_ms(&self) -> i32 {
        (self.session.frame_index as f64 * self.options.delta_time * 1000.0).floor() as i32
    }

    /// Executa um tick completo.
    pub fn tick(&mut self) -> Result<TickOutcome, StreamError> {
        if !self.engine.is_ready() {
            trace!("Motor não pronto, tick ignorado");
            return Ok(TickOutcome::Skipped);
        }
        self.initialize()?;
        let StreamState::Streaming(sampler) = &self.state else {
            return Ok(TickOutcome::Skipped);
        };

        let time_code_ms = self.current_time_code_ms();
        let frame = sampler.sample(&self.engine)?;
        let pose = QuaternionPose::from_frame(&frame, time_code_ms, self.session.character_id);

        // Os dois pacotes são codificados antes de qualquer envio
        let timecode = protocol::encode_timecode(self.session.sample_counter, time_code_ms)?;
        let pose_packet = protocol::encode_quaternion_pose(self.session.sample_counter, &pose)?;

        let timecode_sent = self.send("timecode", &timecode);
        let pose_sent = self.send("pose", &pose_packet);
        if pose_sent {
            self.session.sample_counter = self.session.sample_counter.wrapping_add(1);
        }

        self.session.frame_index += 1;
        self.engine.advance(self.options.delta_time as f32);

        Ok(TickOutcome::Streamed {
            time_code_ms,
            timecode_sent,
            pose_sent,
        })
    }

    fn send(&mut self, kind: &str, datagram: &[u8]) -> bool {
        match self.transport.send(datagram) {
            Ok(sent) => {
                self.session.datagrams_sent += 1;
                trace!("→ {kind}: {sent} bytes");
                true
            }
            Err(e) => {
                self.session.failed_sends += 1;
                warn!("Erro ao enviar {kind}: {e}");
                false
            }
        }
    }

    /// Roda o loop até `running` ficar `false`.
    ///
    /// Falhas de inicialização são fatais; falhas de um tick em streaming
    /// são registradas e o loop segue para o próximo tick.
    pub fn run(&mut self, running: &AtomicBool) -> Result<(), StreamError> {
        let period = self.options.tick_period;
        let report_every = (1.0 / self.options.delta_time).round().max(1.0) as u64;

        while running.load(Ordering::SeqCst) {
            let cycle_start = Instant::now();

            match self.tick() {
                Ok(TickOutcome::Skipped) => {}
                Ok(TickOutcome::Streamed { time_code_ms, .. }) => {
                    if self.session.frame_index % report_every == 0 {
                        info!(
                            "{} | frame {} | {} poses | {} falhas de envio",
                            protocol::format_timecode(time_code_ms.max(0).unsigned_abs()),
                            self.session.frame_index,
                            self.session.sample_counter,
                            self.session.failed_sends
                        );
                    }
                }
                Err(e) if !self.is_streaming() => return Err(e),
                Err(e) => warn!("Tick abortado: {e}"),
            }

            // Dormir pelo tempo restante do período
            let elapsed = cycle_start.elapsed();
            if elapsed < period {
                std::thread::sleep(period - elapsed);
            }
        }

        debug!("Loop de streaming encerrado: {:?}", self.session);
        Ok(())
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{MessageType, decode_header, timecode_text};
    use crate::test_support::{RecordingTransport, ScriptedEngine};
    use std::sync::Arc;

    fn options(fps: f64) -> StreamOptions {
        StreamOptions {
            delta_time: 1.0 / fps,
            tick_period: Duration::from_millis(1),
            world_scale: 100.0,
            character_id: 4,
        }
    }

    fn streaming_loop(
        engine: ScriptedEngine,
        fps: f64,
    ) -> StreamingLoop<ScriptedEngine, RecordingTransport> {
        StreamingLoop::new(
            engine,
            RecordingTransport::default(),
            BoneMapping::mixamo(),
            options(fps),
        )
    }

    #[test]
    fn starts_uninitialized() {
        let stream = streaming_loop(ScriptedEngine::mixamo(), 60.0);
        assert!(!stream.is_streaming());
        assert!(matches!(stream.state(), StreamState::Uninitialized));
        assert_eq!(stream.session().character_id, 4);
    }

    #[test]
    fn tick_sends_timecode_then_pose() {
        let mut stream = streaming_loop(ScriptedEngine::mixamo(), 8.0);
        let outcome = stream.tick().unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Streamed {
                time_code_ms: 0,
                timecode_sent: true,
                pose_sent: true
            }
        );
        assert!(stream.is_streaming());

        let sent = &stream.transport().sent;
        assert_eq!(sent.len(), 2);
        let tc = decode_header(&sent[0]).unwrap();
        let pose = decode_header(&sent[1]).unwrap();
        assert_eq!(tc.message_type(), Some(MessageType::TimeCode));
        assert_eq!(pose.message_type(), Some(MessageType::PoseQuaternion));
        assert_eq!(tc.sample_counter, 0);
        assert_eq!(pose.sample_counter, 0);
        assert_eq!(pose.character_id, 4);
        assert_eq!(pose.body_segment_count, 23);
        assert_eq!(sent[1].len(), 24 + 23 * 32);
    }

    #[test]
    fn counters_and_timecode_advance_per_tick() {
        let mut stream = streaming_loop(ScriptedEngine::mixamo(), 8.0);
        for _ in 0..3 {
            stream.tick().unwrap();
        }
        assert_eq!(stream.session().sample_counter, 3);
        assert_eq!(stream.session().frame_index, 3);
        assert_eq!(stream.engine().advances, 3);
        assert!((stream.engine().clock - 0.375).abs() < 1e-6);

        let sent = &stream.transport().sent;
        assert_eq!(timecode_text(&sent[2]), Some("00:00:00.125"));
        assert_eq!(timecode_text(&sent[4]), Some("00:00:00.250"));
        assert_eq!(decode_header(&sent[5]).unwrap().time_code, 250);
        assert_eq!(decode_header(&sent[5]).unwrap().sample_counter, 2);
        assert_eq!(stream.current_time_code_ms(), 375);
    }

    #[test]
    fn not_ready_engine_skips_tick() {
        let mut engine = ScriptedEngine::mixamo();
        engine.ready = false;
        let mut stream = streaming_loop(engine, 60.0);

        assert_eq!(stream.tick().unwrap(), TickOutcome::Skipped);
        assert_eq!(stream.tick().unwrap(), TickOutcome::Skipped);
        assert!(!stream.is_streaming());
        assert!(stream.transport().sent.is_empty());
        assert_eq!(stream.session(), &SessionState {
            character_id: 4,
            ..Default::default()
        });
        assert_eq!(stream.engine().advances, 0);
    }

    #[test]
    fn engine_dropping_out_mid_stream_skips_ticks() {
        let mut stream = streaming_loop(ScriptedEngine::mixamo(), 8.0);
        stream.tick().unwrap();
        let before = stream.session().clone();

        stream.engine.ready = false;
        assert_eq!(stream.tick().unwrap(), TickOutcome::Skipped);
        assert_eq!(stream.session(), &before);
        assert_eq!(stream.transport().sent.len(), 2);

        stream.engine.ready = true;
        stream.tick().unwrap();
        assert_eq!(stream.session().sample_counter, 2);
        assert_eq!(stream.session().frame_index, 2);
    }

    #[test]
    fn failed_pose_send_does_not_count_sample() {
        let mut stream = streaming_loop(ScriptedEngine::mixamo(), 8.0);
        stream.transport.fail_type = Some(*b"02");

        let outcome = stream.tick().unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Streamed {
                time_code_ms: 0,
                timecode_sent: true,
                pose_sent: false
            }
        );
        assert_eq!(stream.session().sample_counter, 0);
        assert_eq!(stream.session().failed_sends, 1);
        assert_eq!(stream.session().frame_index, 1);

        stream.transport.fail_type = None;
        stream.tick().unwrap();
        assert_eq!(stream.session().sample_counter, 1);
    }

    #[test]
    fn failed_timecode_send_still_counts_pose() {
        let mut stream = streaming_loop(ScriptedEngine::mixamo(), 8.0);
        stream.transport.fail_type = Some(*b"25");
        stream.tick().unwrap();
        stream.tick().unwrap();
        assert_eq!(stream.session().sample_counter, 2);
        assert_eq!(stream.session().failed_sends, 2);
        assert_eq!(stream.transport().sent.len(), 2);
    }

    #[test]
    fn missing_bone_at_startup_is_fatal() {
        let mut engine = ScriptedEngine::mixamo();
        engine.remove_bone("mixamorigNeck");
        let mut stream = streaming_loop(engine, 60.0);
        let running = AtomicBool::new(true);
        assert!(matches!(
            stream.run(&running),
            Err(StreamError::Pose(PoseError::MissingBone { .. }))
        ));
        assert!(stream.transport().sent.is_empty());
    }

    #[test]
    fn missing_bone_mid_stream_aborts_only_that_tick() {
        let mut stream = streaming_loop(ScriptedEngine::mixamo(), 8.0);
        stream.tick().unwrap();

        stream.engine.hide("mixamorigHead");
        assert!(matches!(
            stream.tick(),
            Err(StreamError::Pose(PoseError::MissingBone { .. }))
        ));
        assert_eq!(stream.transport().sent.len(), 2);
        assert_eq!(stream.session().frame_index, 1);
        assert_eq!(stream.session().sample_counter, 1);
        assert!(stream.is_streaming());
    }

    #[test]
    fn reference_is_captured_once() {
        let mut stream = streaming_loop(ScriptedEngine::mixamo(), 8.0);
        stream.tick().unwrap();
        stream
            .engine
            .set_rotation("mixamorigHead", glam::Quat::from_rotation_y(1.0));
        stream.tick().unwrap();

        let StreamState::Streaming(sampler) = stream.state() else {
            panic!("deveria estar em streaming");
        };
        let reference = sampler.reference().get("Head").unwrap();
        assert!((reference.w - 1.0).abs() < 1e-6);
    }

    #[test]
    fn run_stops_when_flag_is_lowered() {
        let mut stream = streaming_loop(ScriptedEngine::mixamo(), 8.0);
        let running = Arc::new(AtomicBool::new(false));
        stream.run(&running).unwrap();
        assert_eq!(stream.session().frame_index, 0);
    }
}
