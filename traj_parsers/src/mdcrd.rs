//! AMBER ASCII trajectory (mdcrd) reader.
//!
//! After a title line every frame is `3 * n_atoms` values written as `%8.3f`,
//! ten per line, optionally followed by a line holding the three box lengths.
//! The file does not store the atom count, so it comes from the topology.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use shared::{
    AnalysisError,
    Result,
    log,
};

use crate::{
    Frame,
    TrajectoryReader,
    open_text,
};


const FIELD_WIDTH: usize = 8;


/// Split a line into its fixed-width fields, ignoring trailing blanks.
fn fields(line: &str) -> Vec<&str> {
    let line = line.trim_end();
    let mut ret = vec![];
    let mut pos = 0;
    while pos < line.len() {
        let end = (pos + FIELD_WIDTH).min(line.len());
        let field = line.get(pos .. end).unwrap_or("").trim();
        if !field.is_empty() {
            ret.push(field);
        }
        pos = end;
    }
    ret
}


pub struct MdcrdReader {
    path: PathBuf,
    reader: Box<dyn BufRead + Send>,
    n_atoms: usize,
    lineno: usize,
    title: String,
    /// Unknown until the first frame has been read.
    has_box: Option<bool>,
    pending: Option<String>,
}


impl MdcrdReader {
    pub fn open<P>(path: P, n_atoms: usize) -> Result<Self>
    where P: AsRef<Path> {
        let path = path.as_ref();
        if n_atoms == 0 {
            return Err(AnalysisError::format(path, "cannot read an mdcrd file for a topology without atoms").into());
        }

        let mut reader = open_text(path)?;
        let mut title = String::new();
        if reader.read_line(&mut title)? == 0 {
            return Err(AnalysisError::format(path, "empty file").into());
        }

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            n_atoms,
            lineno: 1,
            title: title.trim().to_string(),
            has_box: None,
            pending: None,
        })
    }

    pub fn title(&self) -> &str { &self.title }

    /// Whether frames carry a box line, known once the first frame is read.
    pub fn has_box(&self) -> Option<bool> { self.has_box }


    /// Next non-blank line, `None` at the end of the file.
    fn next_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.pending.take() {
            return Ok(Some(line));
        }
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.lineno += 1;
            if !line.trim().is_empty() {
                return Ok(Some(line));
            }
        }
    }


    fn parse_line(&self, line: &str, values: &mut Vec<f64>) -> Result<()> {
        for field in fields(line) {
            let v = field.parse::<f64>()
                .map_err(|_| AnalysisError::format(&self.path,
                    format!("line {}: invalid coordinate '{}'", self.lineno, field)))?;
            values.push(v);
        }
        Ok(())
    }
}


impl TrajectoryReader for MdcrdReader {
    fn n_atoms(&self) -> usize { self.n_atoms }
    fn n_frames_hint(&self) -> Option<usize> { None }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let nvalues = 3 * self.n_atoms;
        let mut values = Vec::with_capacity(nvalues);

        while values.len() < nvalues {
            let line = match self.next_line()? {
                Some(line) => line,
                None if values.is_empty() => return Ok(None),
                None => return Err(AnalysisError::format(&self.path, format!(
                    "file ends inside a frame after {} of {} values", values.len(), nvalues
                )).into()),
            };
            self.parse_line(&line, &mut values)?;
        }

        if values.len() != nvalues {
            return Err(AnalysisError::format(&self.path, format!(
                "line {}: frame holds {} values, expected {} for {} atoms",
                self.lineno, values.len(), nvalues, self.n_atoms
            )).into());
        }

        match self.has_box {
            Some(true) => { self.next_line()?; },
            Some(false) => {},
            None => {
                // a three-value line right after the first frame can only be a box,
                // unless a single atom makes frames three values long too
                let next = self.next_line()?;
                let is_box = next.as_deref()
                    .map(|l| fields(l).len() == 3 && nvalues != 3)
                    .unwrap_or(false);
                self.has_box = Some(is_box);
                log::debug!("Frames of {:?} {} a box line.", self.path, if is_box { "carry" } else { "do not carry" });
                if !is_box {
                    self.pending = next;
                }
            },
        }

        let coords = values.chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        Ok(Some(Frame { coords, time: None }))
    }
}
