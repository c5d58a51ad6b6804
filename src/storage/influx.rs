//! Batched InfluxDB 2.x implementation of [`PointWriter`]
//!
//! The async `influxdb2` client is driven from a dedicated writer thread
//! running a current-thread tokio runtime, so the rest of the pipeline stays
//! synchronous. Points accumulate into batches that are written when full,
//! when a flush is requested, or when the flush interval elapses with a
//! partial batch. Failed writes are reported on the error stream and the
//! batch is dropped; durability beyond that is the backend's concern.
//!
//! The command queue between the pipeline and the writer thread is bounded
//! (`StorageConfig::queue_capacity`). `enqueue` never blocks: a point that
//! meets a full queue is dropped and the drop is reported on the error
//! stream, so a stalled backend cannot grow the process without limit.

use crate::config::StorageConfig;
use crate::error::{PollError, Result};
use crate::storage::{PointWriter, WriteFailure};
use crate::types::Point;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use futures::stream;
use influxdb2::models::DataPoint;
use influxdb2::Client;
use std::thread::JoinHandle;
use std::sync::Mutex;
use tokio::runtime::Runtime;

enum WriterCommand {
    Point(Point),
    Flush,
    Health(Sender<Result<String>>),
}

/// Asynchronous buffered writer against an InfluxDB 2.x backend
pub struct InfluxWriter {
    tx: Mutex<Option<Sender<WriterCommand>>>,
    err_tx: Mutex<Option<Sender<WriteFailure>>>,
    err_rx: Receiver<WriteFailure>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl InfluxWriter {
    /// Spawn the writer thread for the configured backend.
    ///
    /// The connection itself is lazy; reachability is only observed through
    /// [`PointWriter::health_check`] and write failures.
    pub fn connect(config: &StorageConfig) -> Result<Self> {
        let (tx, rx) = bounded(config.queue_capacity.max(1));
        let (err_tx, err_rx) = unbounded();
        let cfg = config.clone();

        let thread_err_tx = err_tx.clone();
        let handle = std::thread::Builder::new()
            .name("influx-writer".to_string())
            .spawn(move || writer_loop(cfg, rx, thread_err_tx))?;

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            err_tx: Mutex::new(Some(err_tx)),
            err_rx,
            handle: Mutex::new(Some(handle)),
        })
    }

    fn send(&self, command: WriterCommand) {
        if let Ok(guard) = self.tx.lock() {
            if let Some(tx) = guard.as_ref() {
                let _ = tx.send(command);
            }
        }
    }

    fn report_drop(&self, points: usize) {
        if let Ok(guard) = self.err_tx.lock() {
            if let Some(err_tx) = guard.as_ref() {
                let _ = err_tx.send(WriteFailure {
                    message: "writer queue full, point dropped".to_string(),
                    points,
                });
            }
        }
    }
}

impl PointWriter for InfluxWriter {
    fn enqueue(&self, point: Point) {
        // never block the sink on a stalled backend
        let result = {
            let guard = match self.tx.lock() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            match guard.as_ref() {
                Some(tx) => tx.try_send(WriterCommand::Point(point)),
                None => return,
            }
        };
        if let Err(TrySendError::Full(_)) = result {
            self.report_drop(1);
        }
    }

    fn flush(&self) {
        self.send(WriterCommand::Flush);
    }

    fn errors(&self) -> Receiver<WriteFailure> {
        self.err_rx.clone()
    }

    fn health_check(&self) -> Result<String> {
        let (reply_tx, reply_rx) = bounded(1);
        {
            let guard = self
                .tx
                .lock()
                .map_err(|_| PollError::Storage("writer lock poisoned".to_string()))?;
            let tx = guard
                .as_ref()
                .ok_or_else(|| PollError::Storage("writer closed".to_string()))?;
            tx.send(WriterCommand::Health(reply_tx))
                .map_err(|_| PollError::Storage("writer thread gone".to_string()))?;
        }
        reply_rx
            .recv()
            .map_err(|_| PollError::Storage("no health reply".to_string()))?
    }

    fn close(&self) {
        // dropping the command sender tells the writer thread to drain and exit
        if let Ok(mut guard) = self.tx.lock() {
            guard.take();
        }
        if let Ok(mut guard) = self.handle.lock() {
            if let Some(handle) = guard.take() {
                if handle.join().is_err() {
                    tracing::error!("Influx writer thread panicked");
                }
            }
        }
        // the thread has drained; disconnect the error stream so the
        // observer can exit
        if let Ok(mut guard) = self.err_tx.lock() {
            guard.take();
        }
    }
}

impl Drop for InfluxWriter {
    fn drop(&mut self) {
        self.close();
    }
}

fn writer_loop(config: StorageConfig, rx: Receiver<WriterCommand>, err_tx: Sender<WriteFailure>) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start storage runtime: {}", e);
            return;
        }
    };
    let client = Client::new(
        config.url.clone(),
        config.org.clone(),
        config.token.clone(),
    );
    let flush_interval = config.flush_interval();
    let mut batch: Vec<DataPoint> = Vec::with_capacity(config.batch_size);

    loop {
        match rx.recv_timeout(flush_interval) {
            Ok(WriterCommand::Point(point)) => {
                match to_data_point(&point) {
                    Ok(dp) => batch.push(dp),
                    Err(e) => {
                        let _ = err_tx.send(WriteFailure {
                            message: format!("invalid point: {}", e),
                            points: 1,
                        });
                    }
                }
                if batch.len() >= config.batch_size {
                    write_batch(&runtime, &client, &config.bucket, &mut batch, &err_tx);
                }
            }
            Ok(WriterCommand::Flush) => {
                write_batch(&runtime, &client, &config.bucket, &mut batch, &err_tx);
            }
            Ok(WriterCommand::Health(reply)) => {
                let status = runtime.block_on(client.health());
                let _ = reply.send(match status {
                    Ok(health) => Ok(format!("{:?}", health.status)),
                    Err(e) => Err(PollError::Health(e.to_string())),
                });
            }
            Err(RecvTimeoutError::Timeout) => {
                write_batch(&runtime, &client, &config.bucket, &mut batch, &err_tx);
            }
            Err(RecvTimeoutError::Disconnected) => {
                // final drain before the error stream disconnects
                write_batch(&runtime, &client, &config.bucket, &mut batch, &err_tx);
                break;
            }
        }
    }
}

fn write_batch(
    runtime: &Runtime,
    client: &Client,
    bucket: &str,
    batch: &mut Vec<DataPoint>,
    err_tx: &Sender<WriteFailure>,
) {
    if batch.is_empty() {
        return;
    }
    let points = std::mem::take(batch);
    let count = points.len();
    if let Err(e) = runtime.block_on(client.write(bucket, stream::iter(points))) {
        tracing::error!("Write of {} points failed: {}", count, e);
        let _ = err_tx.send(WriteFailure {
            message: e.to_string(),
            points: count,
        });
    } else {
        tracing::trace!("Wrote {} points", count);
    }
}

fn to_data_point(
    point: &Point,
) -> std::result::Result<DataPoint, influxdb2::models::data_point::DataPointError> {
    let mut builder = DataPoint::builder(point.measurement.as_ref());
    for (key, value) in point.tags.iter() {
        builder = builder.tag(key.as_str(), value.as_str());
    }
    for (name, value) in &point.fields {
        builder = builder.field(name.as_ref(), *value);
    }
    builder = builder.timestamp(point.timestamp.timestamp_nanos_opt().unwrap_or_default());
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PointTemplate, Sample};
    use chrono::Utc;

    #[test]
    fn test_point_converts_to_data_point() {
        let template = PointTemplate::new(
            "experiment",
            vec![("location".to_string(), "tianjin".to_string())],
            2,
        );
        let sample = Sample {
            captured_at: Utc::now(),
            registers: vec![5, -5],
        };
        let point = template.point(&sample, 1);
        assert!(to_data_point(&point).is_ok());
    }

    fn test_point(seq: u64) -> Point {
        let template = PointTemplate::new("experiment", Vec::new(), 1);
        let sample = Sample {
            captured_at: Utc::now(),
            registers: vec![1],
        };
        template.point(&sample, seq)
    }

    #[test]
    fn test_full_queue_drops_point_onto_error_stream() {
        let (tx, command_rx) = bounded(1);
        let (err_tx, err_rx) = unbounded();
        let writer = InfluxWriter {
            tx: Mutex::new(Some(tx)),
            err_tx: Mutex::new(Some(err_tx)),
            err_rx: err_rx.clone(),
            handle: Mutex::new(None),
        };

        writer.enqueue(test_point(1)); // fills the queue
        writer.enqueue(test_point(2)); // must be dropped, not block

        let failure = err_rx.try_recv().expect("drop must be reported");
        assert_eq!(failure.points, 1);
        assert!(failure.message.contains("queue full"));
        // only the first point made it into the queue
        assert_eq!(command_rx.len(), 1);
    }

    #[test]
    fn test_health_check_after_close_is_a_storage_error() {
        let writer = InfluxWriter::connect(&StorageConfig::default()).expect("spawn writer");
        writer.close();
        assert!(matches!(writer.health_check(), Err(PollError::Storage(_))));
    }
}
