//! Replay of recorded decoder states
//!
//! Each non-empty line of the input is one JSON-encoded [`ReceiverState`],
//! for example:
//!
//! ```text
//! {"date":"2024-05-17","time":"12:30:05","latitude":40.0,"longitude":-3.0,"altitude_m":650.0}
//! ```

use crate::position::{GpsError, GpsReceiver, GpsResult, ReceiverState};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// GPS receiver fed from a JSON-lines recording, one record per poll
pub struct ReplayGpsReceiver<B: BufRead> {
    input: B,
    current: ReceiverState,
    records: u64,
    exhausted: bool,
}

impl ReplayGpsReceiver<BufReader<File>> {
    pub fn from_file<P: AsRef<Path>>(path: P) -> GpsResult<Self> {
        let file = File::open(path.as_ref()).map_err(|e| GpsError::Link {
            details: format!("opening replay '{}': {}", path.as_ref().display(), e),
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<B: BufRead> ReplayGpsReceiver<B> {
    pub fn new(input: B) -> Self {
        Self {
            input,
            current: ReceiverState::default(),
            records: 0,
            exhausted: false,
        }
    }

    /// Whether the recording has been fully consumed
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn records_read(&self) -> u64 {
        self.records
    }
}

impl<B: BufRead> GpsReceiver for ReplayGpsReceiver<B> {
    fn process_pending(&mut self) -> GpsResult<bool> {
        if self.exhausted {
            return Ok(false);
        }

        let mut line = String::new();
        loop {
            line.clear();
            let read = self.input.read_line(&mut line).map_err(|e| GpsError::Link {
                details: e.to_string(),
            })?;

            if read == 0 {
                self.exhausted = true;
                return Ok(false);
            }

            if !line.trim().is_empty() {
                break;
            }
        }

        self.records += 1;
        let state: ReceiverState =
            serde_json::from_str(line.trim()).map_err(|e| GpsError::Decode {
                record: self.records,
                details: e.to_string(),
            })?;

        self.current = state;
        Ok(true)
    }

    fn state(&self) -> &ReceiverState {
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_replays_lines_in_order() {
        let input = "\
{\"date\":\"2024-05-17\",\"time\":\"12:30:05\",\"latitude\":40.0,\"longitude\":-3.0,\"altitude_m\":650.0}

{\"latitude\":40.01,\"longitude\":-3.0}
";
        let mut receiver = ReplayGpsReceiver::new(Cursor::new(input));

        assert!(receiver.process_pending().unwrap());
        assert!(receiver.state().date.is_some());
        assert_eq!(receiver.state().altitude_m, 650.0);

        // Blank line skipped; missing fields default
        assert!(receiver.process_pending().unwrap());
        assert!(receiver.state().date.is_none());
        assert_eq!(receiver.state().latitude, 40.01);

        assert!(!receiver.process_pending().unwrap());
        assert!(receiver.is_exhausted());
        assert_eq!(receiver.records_read(), 2);
    }

    #[test]
    fn test_bad_record_reported() {
        let mut receiver = ReplayGpsReceiver::new(Cursor::new("not json\n"));
        assert!(matches!(
            receiver.process_pending(),
            Err(GpsError::Decode { record: 1, .. })
        ));
    }
}
