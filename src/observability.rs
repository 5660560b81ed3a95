//! Counters and moments for the handshake, the connection and reassembly.
//!
//! Register them with a [`Collector`] through [`register_biometrics`];
//! [`TracingEmitter`] writes readings out as `tracing` events.

use std::time::{SystemTime, UNIX_EPOCH};

use biometrics::{Collector, Counter, Emitter, Gauge, Histogram, Moments, Sensor};

pub(crate) static HANDSHAKES: Counter = Counter::new("ppxity.handshake.attempts");
pub(crate) static HANDSHAKE_ERRORS: Counter = Counter::new("ppxity.handshake.errors");
pub(crate) static HANDSHAKE_DURATION: Moments =
    Moments::new("ppxity.handshake.duration_seconds");

pub(crate) static FRAMES_SENT: Counter = Counter::new("ppxity.connection.frames_sent");
pub(crate) static FRAMES_RECEIVED: Counter = Counter::new("ppxity.connection.frames_received");
pub(crate) static PINGS: Counter = Counter::new("ppxity.connection.pings");
pub(crate) static FRAGMENTS_DELIVERED: Counter =
    Counter::new("ppxity.connection.fragments_delivered");
pub(crate) static FRAMES_DISCARDED: Counter = Counter::new("ppxity.connection.frames_discarded");
pub(crate) static READER_ERRORS: Counter = Counter::new("ppxity.connection.reader_errors");

pub(crate) static CONTINUATIONS: Counter = Counter::new("ppxity.reassembly.continuations");
pub(crate) static RECEIVE_TIMEOUTS: Counter = Counter::new("ppxity.reassembly.timeouts");
pub(crate) static RESPONSE_DURATION: Moments =
    Moments::new("ppxity.reassembly.response_duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: &Collector) {
    collector.register_counter(&HANDSHAKES);
    collector.register_counter(&HANDSHAKE_ERRORS);
    collector.register_moments(&HANDSHAKE_DURATION);

    collector.register_counter(&FRAMES_SENT);
    collector.register_counter(&FRAMES_RECEIVED);
    collector.register_counter(&PINGS);
    collector.register_counter(&FRAGMENTS_DELIVERED);
    collector.register_counter(&FRAMES_DISCARDED);
    collector.register_counter(&READER_ERRORS);

    collector.register_counter(&CONTINUATIONS);
    collector.register_counter(&RECEIVE_TIMEOUTS);
    collector.register_moments(&RESPONSE_DURATION);
}

/// Emits every reading as a debug-level `tracing` event.
#[derive(Debug, Default)]
pub struct TracingEmitter;

impl Emitter for TracingEmitter {
    type Error = std::convert::Infallible;

    fn emit_counter(&mut self, counter: &Counter, now_millis: u64) -> Result<(), Self::Error> {
        tracing::debug!(sensor = counter.label(), now_millis, value = counter.read(), "counter");
        Ok(())
    }

    fn emit_gauge(&mut self, gauge: &Gauge, now_millis: u64) -> Result<(), Self::Error> {
        tracing::debug!(sensor = gauge.label(), now_millis, value = gauge.read(), "gauge");
        Ok(())
    }

    fn emit_moments(&mut self, moments: &Moments, now_millis: u64) -> Result<(), Self::Error> {
        let label = moments.label();
        let moments = moments.read();
        tracing::debug!(
            sensor = label,
            now_millis,
            n = moments.n,
            mean = moments.mean(),
            "moments"
        );
        Ok(())
    }

    fn emit_histogram(
        &mut self,
        histogram: &Histogram,
        now_millis: u64,
    ) -> Result<(), Self::Error> {
        tracing::debug!(sensor = histogram.label(), now_millis, "histogram");
        Ok(())
    }
}

/// Emit every sensor registered with `collector` through `emitter`.
pub fn emit_biometrics<EM: Emitter>(collector: &Collector, emitter: &mut EM) -> Result<(), EM::Error>
where
    EM::Error: std::fmt::Debug,
{
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    collector.emit(emitter, now)
}
