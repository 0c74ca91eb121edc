use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde_json::json;

pub fn write_progress(path: &Path, current: usize, total: usize, phase: &str, status: &str) {
    let json = json!({
        "current": current,
        "total": total,
        "phase": phase,
        "status": status,
    });
    let _ = fs::write(path, json.to_string());
}

/// Console percentage line, mirrored to a JSON file when one is configured
#[derive(Debug)]
pub struct Progress {
    total: usize,
    current: usize,
    file: Option<PathBuf>,
}

impl Progress {
    pub fn new(total: usize, file: Option<PathBuf>) -> Self {
        Progress {
            total,
            current: 0,
            file,
        }
    }

    pub fn percent(&self) -> usize {
        if self.total == 0 {
            return 100;
        }
        100 * self.current / self.total
    }

    /// Counts one finished entity. The console line is refreshed every
    /// other entity.
    pub fn advance(&mut self) {
        self.current += 1;
        if self.current % 2 != 0 {
            return;
        }

        print!("\r[{:3}%]", self.percent());
        let _ = io::stdout().flush();

        if let Some(path) = &self.file {
            write_progress(path, self.current, self.total, "sprites", "running");
        }
    }

    pub fn finish(&mut self) {
        println!("\r[{:3}%]", self.percent());
        if let Some(path) = &self.file {
            write_progress(path, self.current, self.total, "sprites", "done");
        }
    }
}
