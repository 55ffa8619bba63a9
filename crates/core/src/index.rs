use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::IndexError;

// Row i of the index file must always describe record i of the metadata
// file; both are rewritten together by every ingestion run.
pub const INDEX_FILE_NAME: &str = "index.bin";
pub const META_FILE_NAME: &str = "chunks.json";

const MAGIC: &[u8; 8] = b"FLATIPV1";

#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self, IndexError> {
        let dim = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * dim);

        for (row, vector) in rows.iter().enumerate() {
            if vector.len() != dim {
                return Err(IndexError::NonUniformRows {
                    row,
                    expected: dim,
                    got: vector.len(),
                });
            }
            data.extend_from_slice(vector);
        }

        Ok(Self { dim, data })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Exact top-k rows by inner product, highest first. With normalized
    // vectors this is cosine similarity.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        if query.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                expected: self.dim,
                got: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(row, vector)| {
                let score = vector
                    .iter()
                    .zip(query.iter())
                    .map(|(a, b)| a * b)
                    .sum::<f32>();
                (row, score)
            })
            .collect();

        scored.sort_by(|left, right| right.1.total_cmp(&left.1));
        scored.truncate(k);
        Ok(scored)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), IndexError> {
        let mut writer = BufWriter::new(File::create(path)?);

        writer.write_all(MAGIC)?;
        writer.write_all(&(self.dim as u32).to_le_bytes())?;
        writer.write_all(&(self.len() as u32).to_le_bytes())?;
        for value in &self.data {
            writer.write_all(&value.to_le_bytes())?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self, IndexError> {
        let mut reader = BufReader::new(File::open(path)?);

        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(IndexError::BadHeader(format!(
                "unrecognized magic in {}",
                path.display()
            )));
        }

        let mut word = [0u8; 4];
        reader.read_exact(&mut word)?;
        let dim = u32::from_le_bytes(word) as usize;
        reader.read_exact(&mut word)?;
        let rows = u32::from_le_bytes(word) as usize;

        // Header counts come straight from the file; the multiply must
        // not be allowed to overflow.
        let expected = rows
            .checked_mul(dim)
            .and_then(|values| values.checked_mul(4))
            .ok_or_else(|| {
                IndexError::BadHeader(format!(
                    "implausible header in {} ({} rows of dim {})",
                    path.display(),
                    rows,
                    dim,
                ))
            })?;

        let mut payload = Vec::new();
        reader.read_to_end(&mut payload)?;
        if payload.len() != expected {
            return Err(IndexError::BadHeader(format!(
                "payload of {} holds {} bytes, expected {} ({} rows of dim {})",
                path.display(),
                payload.len(),
                expected,
                rows,
                dim,
            )));
        }

        let data = payload
            .chunks_exact(4)
            .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            .collect();

        Ok(Self { dim, data })
    }
}

// Zero vectors stay zero.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}
