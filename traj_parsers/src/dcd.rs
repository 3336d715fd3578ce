//! CHARMM/NAMD/X-PLOR DCD trajectory reader.
//!
//! DCD is a sequence of Fortran unformatted records, each wrapped in 4-byte
//! length markers. Either byte order is accepted; it is detected from the
//! first marker which must be 84. Coordinates are kept in Angstrom.
//!
//! CHARMM files store the timestep as `f32` in control word 9, X-PLOR files
//! as `f64` spanning control words 9 and 10.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use shared::{
    AnalysisError,
    Context,
    Result,
    log,
};

use crate::{Frame, TrajectoryReader};


/// One AKMA time unit in ps.
pub const AKMA_TO_PS: f64 = 0.0488882129;


#[derive(Clone, Debug)]
pub struct DcdHeader {
    /// Number of complete frames found in the file.
    pub n_frames: usize,
    pub n_atoms: usize,
    /// Integration step of the first frame.
    pub start_step: i32,
    /// Integration steps between two frames.
    pub save_interval: i32,
    /// Integration timestep in AKMA units.
    pub delta: f64,
    pub has_unit_cell: bool,
    pub is_charmm: bool,
    pub is_big_endian: bool,
    pub titles: Vec<String>,
    /// Length of one coordinate axis record, `4 * n_atoms`.
    pub axis_size: i32,
    pub first_frame_offset: u64,
    pub frame_size: u64,
}


impl DcdHeader {
    /// Simulation time of frame `iframe` in ps, if the header carries a timestep.
    pub fn frame_time(&self, iframe: usize) -> Option<f64> {
        if self.delta == 0.0 {
            return None;
        }
        let step = self.start_step as f64 + iframe as f64 * self.save_interval as f64;
        Some(step * self.delta * AKMA_TO_PS)
    }
}


fn read_i32<R: Read>(r: &mut R, big_endian: bool) -> io::Result<i32> {
    if big_endian { r.read_i32::<BigEndian>() } else { r.read_i32::<LittleEndian>() }
}


fn read_f32_into<R: Read>(r: &mut R, big_endian: bool, dst: &mut [f32]) -> io::Result<()> {
    if big_endian { r.read_f32_into::<BigEndian>(dst) } else { r.read_f32_into::<LittleEndian>(dst) }
}


fn read_f64_into<R: Read>(r: &mut R, big_endian: bool, dst: &mut [f64]) -> io::Result<()> {
    if big_endian { r.read_f64_into::<BigEndian>(dst) } else { r.read_f64_into::<LittleEndian>(dst) }
}


/// Read a record marker and check that it matches `expected`.
fn expect_marker<R: Read>(r: &mut R, big_endian: bool, expected: i32, path: &Path, what: &str) -> Result<()> {
    let marker = read_i32(r, big_endian)?;
    if marker != expected {
        return Err(AnalysisError::format(path,
            format!("bad record marker for {}: expected {}, found {}", what, expected, marker)).into());
    }
    Ok(())
}


fn read_header<R: Read + Seek>(r: &mut R, path: &Path) -> Result<DcdHeader> {
    let mut first = [0u8; 4];
    r.read_exact(&mut first)?;
    let is_big_endian = if i32::from_le_bytes(first) == 84 {
        false
    } else if i32::from_be_bytes(first) == 84 {
        true
    } else {
        return Err(AnalysisError::format(path, "first record is not 84 bytes long, not a DCD file").into());
    };
    let be = is_big_endian;

    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if &magic != b"CORD" {
        return Err(AnalysisError::format(path, format!("invalid DCD magic {:?}", magic)).into());
    }

    let mut raw = [0u8; 80];
    r.read_exact(&mut raw)?;
    expect_marker(r, be, 84, path, "header")?;

    let mut icntrl = [0i32; 20];
    if be {
        BigEndian::read_i32_into(&raw, &mut icntrl);
    } else {
        LittleEndian::read_i32_into(&raw, &mut icntrl);
    }

    let is_charmm = icntrl[19] != 0;
    let n_fixed = icntrl[8];
    if n_fixed != 0 {
        return Err(AnalysisError::format(path,
            format!("DCD files with {} fixed atoms are not supported", n_fixed)).into());
    }
    if is_charmm && icntrl[11] != 0 {
        return Err(AnalysisError::format(path, "DCD files with 4D coordinates are not supported").into());
    }
    let has_unit_cell = is_charmm && icntrl[10] != 0;
    let delta = match (is_charmm, be) {
        (true,  true)  => BigEndian::read_f32(&raw[36 .. 40]) as f64,
        (true,  false) => LittleEndian::read_f32(&raw[36 .. 40]) as f64,
        (false, true)  => BigEndian::read_f64(&raw[36 .. 44]),
        (false, false) => LittleEndian::read_f64(&raw[36 .. 44]),
    };

    // title record
    let title_size = read_i32(r, be)?;
    if title_size < 4 || (title_size - 4) % 80 != 0 {
        return Err(AnalysisError::format(path, format!("invalid title record size {}", title_size)).into());
    }
    let n_titles = read_i32(r, be)?;
    let expected_size = n_titles.checked_mul(80).and_then(|n| n.checked_add(4));
    if n_titles < 0 || expected_size != Some(title_size) {
        return Err(AnalysisError::format(path, format!("title record declares {} titles in {} bytes", n_titles, title_size)).into());
    }
    let mut titles = Vec::with_capacity(n_titles as usize);
    for _ in 0 .. n_titles {
        let mut buf = [0u8; 80];
        r.read_exact(&mut buf)?;
        titles.push(String::from_utf8_lossy(&buf).trim_end_matches(['\0', ' ']).to_string());
    }
    expect_marker(r, be, title_size, path, "titles")?;

    // atom count record
    expect_marker(r, be, 4, path, "atom count")?;
    let n_atoms = read_i32(r, be)?;
    let axis_size = match n_atoms.checked_mul(4) {
        Some(size) if n_atoms > 0 => size,
        _ => return Err(AnalysisError::format(path, format!("invalid number of atoms {}", n_atoms)).into()),
    };
    let n_atoms = n_atoms as usize;
    expect_marker(r, be, 4, path, "atom count")?;

    let first_frame_offset = r.stream_position()?;
    let coord_record = 8 + 4 * n_atoms as u64;
    let frame_size = 3 * coord_record + if has_unit_cell { 8 + 48 } else { 0 };

    let file_len = r.seek(SeekFrom::End(0))?;
    r.seek(SeekFrom::Start(first_frame_offset))?;
    let payload = file_len.saturating_sub(first_frame_offset);
    let n_frames = (payload / frame_size) as usize;

    if payload % frame_size != 0 {
        log::warn!("DCD file {:?} ends with an incomplete frame, which is ignored.", path);
    }
    if icntrl[0] > 0 && icntrl[0] as usize != n_frames {
        log::debug!("DCD header of {:?} declares {} frames, found {}.", path, icntrl[0], n_frames);
    }

    Ok(DcdHeader {
        n_frames,
        n_atoms,
        start_step: icntrl[1],
        save_interval: icntrl[2],
        delta,
        has_unit_cell,
        is_charmm,
        is_big_endian,
        titles,
        axis_size,
        first_frame_offset,
        frame_size,
    })
}


#[derive(Debug)]
pub struct DcdReader {
    path: PathBuf,
    reader: BufReader<File>,
    header: DcdHeader,
    current_frame: usize,
    buffer: Vec<f32>,
}


impl DcdReader {
    pub fn open<P>(path: P) -> Result<Self>
    where P: AsRef<Path> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open DCD file {:?}", path))?;
        let mut reader = BufReader::new(file);
        let header = read_header(&mut reader, path)
            .with_context(|| format!("Failed to read DCD header of {:?}", path))?;

        Ok(Self {
            path: path.to_path_buf(),
            buffer: vec![0.0; header.n_atoms],
            reader,
            header,
            current_frame: 0,
        })
    }

    pub fn header(&self) -> &DcdHeader { &self.header }


    fn read_axis(&mut self, coords: &mut [[f64; 3]], axis: usize) -> Result<()> {
        let be = self.header.is_big_endian;
        let size = self.header.axis_size;
        let what = ["x", "y", "z"][axis];

        expect_marker(&mut self.reader, be, size, &self.path, what)?;
        read_f32_into(&mut self.reader, be, &mut self.buffer)?;
        expect_marker(&mut self.reader, be, size, &self.path, what)?;

        for (c, &v) in coords.iter_mut().zip(self.buffer.iter()) {
            c[axis] = v as f64;
        }
        Ok(())
    }
}


impl TrajectoryReader for DcdReader {
    fn n_atoms(&self) -> usize { self.header.n_atoms }
    fn n_frames_hint(&self) -> Option<usize> { Some(self.header.n_frames) }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        if self.current_frame >= self.header.n_frames {
            return Ok(None);
        }

        let be = self.header.is_big_endian;
        if self.header.has_unit_cell {
            let mut cell = [0f64; 6];
            expect_marker(&mut self.reader, be, 48, &self.path, "unit cell")?;
            read_f64_into(&mut self.reader, be, &mut cell)?;
            expect_marker(&mut self.reader, be, 48, &self.path, "unit cell")?;
        }

        let mut coords = vec![[0f64; 3]; self.header.n_atoms];
        for axis in 0 .. 3 {
            self.read_axis(&mut coords, axis)?;
        }

        let time = self.header.frame_time(self.current_frame);
        self.current_frame += 1;
        Ok(Some(Frame { coords, time }))
    }

    fn skip_frame(&mut self) -> Result<bool> {
        if self.current_frame >= self.header.n_frames {
            return Ok(false);
        }
        self.reader.seek_relative(self.header.frame_size as i64)?;
        self.current_frame += 1;
        Ok(true)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::fs;
    use tempfile::tempdir;

    fn record<B: ByteOrder>(out: &mut Vec<u8>, payload: &[u8]) {
        out.write_i32::<B>(payload.len() as i32).unwrap();
        out.extend_from_slice(payload);
        out.write_i32::<B>(payload.len() as i32).unwrap();
    }

    /// Serialize a DCD file, CHARMM-flavoured unless `xplor` is set.
    fn dcd_bytes<B: ByteOrder>(frames: &[Vec<[f32; 3]>], with_cell: bool, delta: f64, xplor: bool) -> Vec<u8> {
        let n_atoms = frames[0].len();
        let mut out = vec![];

        let mut header = b"CORD".to_vec();
        let mut icntrl = [0i32; 20];
        icntrl[0] = frames.len() as i32;
        icntrl[1] = 100;
        icntrl[2] = 50;
        if xplor {
            let mut buf = [0u8; 8];
            B::write_f64(&mut buf, delta);
            icntrl[9] = B::read_i32(&buf[0 .. 4]);
            icntrl[10] = B::read_i32(&buf[4 .. 8]);
        } else {
            icntrl[9] = (delta as f32).to_bits() as i32;
            icntrl[10] = with_cell as i32;
            icntrl[19] = 24;
        }
        for v in icntrl {
            header.write_i32::<B>(v).unwrap();
        }
        record::<B>(&mut out, &header);

        let mut titles = vec![];
        titles.write_i32::<B>(1).unwrap();
        let mut title = b"REMARKS written by the test suite".to_vec();
        title.resize(80, b' ');
        titles.extend_from_slice(&title);
        record::<B>(&mut out, &titles);

        let mut natom = vec![];
        natom.write_i32::<B>(n_atoms as i32).unwrap();
        record::<B>(&mut out, &natom);

        for frame in frames {
            if with_cell {
                let mut cell = vec![];
                for v in [30.0, 90.0, 30.0, 90.0, 90.0, 30.0] {
                    cell.write_f64::<B>(v).unwrap();
                }
                record::<B>(&mut out, &cell);
            }
            for axis in 0 .. 3 {
                let mut buf = vec![];
                for xyz in frame {
                    buf.write_f32::<B>(xyz[axis]).unwrap();
                }
                record::<B>(&mut out, &buf);
            }
        }
        out
    }

    fn sample_frames(nframes: usize, natoms: usize) -> Vec<Vec<[f32; 3]>> {
        (0 .. nframes)
            .map(|f| (0 .. natoms).map(|a| [a as f32, f as f32 * 0.5, -(a as f32) - f as f32]).collect())
            .collect()
    }


    #[test]
    fn test_read_little_endian_with_cell() {
        let dir = tempdir().unwrap();
        let fname = dir.path().join("traj.dcd");
        fs::write(&fname, dcd_bytes::<LittleEndian>(&sample_frames(4, 5), true, 0.5, false)).unwrap();

        let mut dcd = DcdReader::open(&fname).unwrap();
        assert_eq!(dcd.n_atoms(), 5);
        assert_eq!(dcd.n_frames_hint(), Some(4));
        assert!(dcd.header().has_unit_cell);
        assert!(!dcd.header().is_big_endian);
        assert_eq!(dcd.header().titles, vec!["REMARKS written by the test suite".to_string()]);

        let mut n = 0;
        while let Some(frame) = dcd.read_frame().unwrap() {
            assert_eq!(frame.coords[2], [2.0, n as f64 * 0.5, -2.0 - n as f64]);
            let expect = (100.0 + 50.0 * n as f64) * 0.5 * AKMA_TO_PS;
            assert!((frame.time.unwrap() - expect).abs() < 1E-9);
            n += 1;
        }
        assert_eq!(n, 4);
    }


    #[test]
    fn test_read_big_endian_and_skip() {
        let dir = tempdir().unwrap();
        let fname = dir.path().join("traj_be.dcd");
        fs::write(&fname, dcd_bytes::<BigEndian>(&sample_frames(5, 3), false, 0.0, false)).unwrap();

        let mut dcd = DcdReader::open(&fname).unwrap();
        assert!(dcd.header().is_big_endian);
        assert!(dcd.skip_frame().unwrap());
        assert!(dcd.skip_frame().unwrap());

        let frame = dcd.read_frame().unwrap().unwrap();
        assert_eq!(frame.coords[1], [1.0, 1.0, -3.0]);
        assert_eq!(frame.time, None);

        assert!(dcd.skip_frame().unwrap());
        let frame = dcd.read_frame().unwrap().unwrap();
        assert_eq!(frame.coords[0], [0.0, 2.0, -4.0]);
        assert!(!dcd.skip_frame().unwrap());
        assert!(dcd.read_frame().unwrap().is_none());
    }


    #[test]
    fn test_xplor_double_timestep() {
        let dir = tempdir().unwrap();
        // one femtosecond in AKMA units, not representable as f32
        let delta = 0.020454828;
        for (name, bytes) in [
            ("xplor_le.dcd", dcd_bytes::<LittleEndian>(&sample_frames(3, 2), false, delta, true)),
            ("xplor_be.dcd", dcd_bytes::<BigEndian>(&sample_frames(3, 2), false, delta, true)),
        ] {
            let fname = dir.path().join(name);
            fs::write(&fname, bytes).unwrap();

            let mut dcd = DcdReader::open(&fname).unwrap();
            assert!(!dcd.header().is_charmm);
            assert!(!dcd.header().has_unit_cell);
            assert_eq!(dcd.header().delta, delta);

            let mut n = 0;
            while let Some(frame) = dcd.read_frame().unwrap() {
                let expect = (100.0 + 50.0 * n as f64) * delta * AKMA_TO_PS;
                assert!((frame.time.unwrap() - expect).abs() < 1E-12, "{}: frame {}", name, n);
                n += 1;
            }
            assert_eq!(n, 3);
        }
    }


    #[test]
    fn test_oversized_header_counts() {
        let dir = tempdir().unwrap();
        let fname = dir.path().join("huge.dcd");
        let good = dcd_bytes::<LittleEndian>(&sample_frames(2, 3), false, 1.0, false);

        // 4 + 268435457 * 80 wraps around to the declared 84 bytes in i32
        let mut bytes = good.clone();
        bytes[96 .. 100].copy_from_slice(&268435457i32.to_le_bytes());
        fs::write(&fname, bytes).unwrap();
        let err = DcdReader::open(&fname).unwrap_err();
        assert!(matches!(err.downcast_ref::<AnalysisError>(), Some(AnalysisError::Format { .. })));

        // 4 * n_atoms does not fit in a record marker
        let mut bytes = good;
        bytes[188 .. 192].copy_from_slice(&(1i32 << 30).to_le_bytes());
        fs::write(&fname, bytes).unwrap();
        let err = DcdReader::open(&fname).unwrap_err();
        assert!(matches!(err.downcast_ref::<AnalysisError>(), Some(AnalysisError::Format { .. })));
    }


    #[test]
    fn test_truncated_frame_ignored() {
        let dir = tempdir().unwrap();
        let fname = dir.path().join("truncated.dcd");
        let mut bytes = dcd_bytes::<LittleEndian>(&sample_frames(3, 4), false, 1.0, false);
        bytes.truncate(bytes.len() - 10);
        fs::write(&fname, bytes).unwrap();

        let dcd = DcdReader::open(&fname).unwrap();
        assert_eq!(dcd.header().n_frames, 2);
    }


    #[test]
    fn test_not_a_dcd() {
        let dir = tempdir().unwrap();
        let fname = dir.path().join("garbage.dcd");
        fs::write(&fname, b"this is certainly not a dcd file").unwrap();

        let err = DcdReader::open(&fname).unwrap_err();
        assert!(matches!(err.downcast_ref::<AnalysisError>(), Some(AnalysisError::Format { .. })));
    }
}
