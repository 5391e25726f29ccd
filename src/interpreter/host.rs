use std::io::Write;

use chrono::{DateTime, Local};
use rand::Rng;

/// The interpreter's nondeterministic leaves: random numbers, wall-clock
/// time, and the blocking line read behind the `input` library. Tests
/// substitute a scripted implementation.
pub trait Host {
    /// Uniform in [0, 1).
    fn random(&mut self) -> f64;

    fn now(&self) -> DateTime<Local>;

    /// Shows `message` and blocks until a line is available. No timeout and
    /// no cancellation; end-of-stream yields an empty line.
    fn read_line(&mut self, message: &str) -> std::io::Result<String>;
}

#[derive(Default)]
pub struct SystemHost;

impl Host for SystemHost {
    fn random(&mut self) -> f64 {
        rand::thread_rng().gen()
    }

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn read_line(&mut self, message: &str) -> std::io::Result<String> {
        print!("{}", message);
        std::io::stdout().flush()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}
