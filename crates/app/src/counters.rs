use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// The hardware-counter collaborator.
///
/// The applications treat the sampler as opaque: it is armed around the
/// timed computation and asked to persist what it measured. A perf-backed
/// implementation is provided by the host; the engine ships only the
/// wall-clock [`NullCounters`].
pub trait CounterSampler {
    fn reset(&mut self);

    fn start(&mut self);

    fn stop(&mut self);

    /// Writes an elapsed-time line (`"<ns>ns"`) followed by a single
    /// comma-separated line of counter values.
    fn read_to_file(&mut self, path: &Path) -> io::Result<()>;
}

/// A sampler that measures wall-clock time only. Each configured event
/// reads as zero.
pub struct NullCounters {
    events: String,
    started: Option<Instant>,
    elapsed: Duration,
}

impl NullCounters {
    pub fn new(events: &str) -> Self {
        Self {
            events: events.to_string(),
            started: None,
            elapsed: Duration::ZERO,
        }
    }
}

impl CounterSampler for NullCounters {
    fn reset(&mut self) {
        self.started = None;
        self.elapsed = Duration::ZERO;
    }

    fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    fn stop(&mut self) {
        if let Some(started) = self.started.take() {
            self.elapsed += started.elapsed();
        }
    }

    fn read_to_file(&mut self, path: &Path) -> io::Result<()> {
        let mut file = File::create(path)?;
        writeln!(file, "{}ns", self.elapsed.as_nanos())?;

        let values = self
            .events
            .split(',')
            .map(|_| "0")
            .collect::<Vec<_>>()
            .join(",");
        writeln!(file, "{values}")
    }
}

/// The results file name: `result_<app>_<input>_<events>`, with commas in
/// the event list replaced by dashes.
pub fn result_path(app: &str, input_file_name: &str, events: &str) -> PathBuf {
    PathBuf::from(format!(
        "result_{}_{}_{}",
        app,
        input_file_name,
        events.replace(',', "-")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_path_replaces_commas() {
        let path = result_path("BFS", "road.adj", "cycles:u,instructions:u");
        assert_eq!(
            path,
            PathBuf::from("result_BFS_road.adj_cycles:u-instructions:u")
        );
    }

    #[test]
    fn null_counters_write_elapsed_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result");

        let mut counters = NullCounters::new("cycles:u,instructions:u");
        counters.reset();
        counters.start();
        counters.stop();
        counters.read_to_file(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert!(lines.next().unwrap().ends_with("ns"));
        assert_eq!(lines.next().unwrap(), "0,0");
    }
}
