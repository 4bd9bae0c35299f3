//! Log output setup for triadd.
//!
//! Every formatted line passes through [`redact_pii`] before it reaches the
//! underlying writer, so e-mail addresses and token-like strings that end
//! up in a log field (error messages, request ids chosen by callers) are
//! masked at the sink.

use std::io::{self, Write};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

use crate::guardrails::redact_pii;
use crate::{Result, TriadError};

/// Wraps a [`MakeWriter`] so each writer it hands out redacts its input.
#[derive(Debug, Clone)]
pub struct RedactingMakeWriter<M> {
    inner: M,
}

impl<M> RedactingMakeWriter<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<'a, M> MakeWriter<'a> for RedactingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = RedactingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: self.inner.make_writer(),
        }
    }
}

/// Writer that redacts PII from each buffer it receives.
///
/// The fmt layer hands over one complete event per write, so patterns never
/// straddle two calls.
#[derive(Debug)]
pub struct RedactingWriter<W> {
    inner: W,
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        self.inner.write_all(redact_pii(&text).as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Install the global subscriber: `RUST_LOG` filter (default `info`),
/// JSON or human-readable lines, redacted, on stdout.
pub fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let writer = RedactingMakeWriter::new(io::stdout);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| TriadError::Configuration(format!("failed to initialise logging: {e}")))
}
