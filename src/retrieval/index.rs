use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::Path;

/// Nearest-neighbor search over fixed-length embeddings.
///
/// Returns `(row, distance)` pairs ordered by ascending distance. Rows may
/// contain negative sentinels when a backend cannot fill `top_k` results;
/// callers must skip those.
pub trait VectorIndex: Send + Sync {
    fn dimension(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn search(&self, query: &[f32], top_k: usize) -> Vec<(i64, f32)>;
}

/// In-process flat index: brute-force squared-L2 scan over all rows.
///
/// Adequate for a knowledge base of a few thousand chunks; anything larger
/// belongs behind a dedicated vector database implementing [`VectorIndex`].
pub struct FlatVectorIndex {
    dim: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatVectorIndex {
    pub fn from_vectors(dim: usize, vectors: Vec<Vec<f32>>) -> Self {
        debug_assert!(vectors.iter().all(|v| v.len() == dim));
        Self { dim, vectors }
    }

    /// Load the index from its binary file: u32 dimension, u32 row count,
    /// then `count * dim` little-endian f32 values.
    pub fn load(path: &Path) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        if bytes.len() < 8 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "index file truncated",
            ));
        }

        let dim = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        let count = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        // Header values are untrusted; a corrupt file must not overflow the
        // size computation.
        let expected = count
            .checked_mul(dim)
            .and_then(|n| n.checked_mul(4))
            .and_then(|n| n.checked_add(8))
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidData, "index header overflows file size")
            })?;
        if dim == 0 || bytes.len() != expected {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "index file size mismatch: expected {} bytes, got {}",
                    expected,
                    bytes.len()
                ),
            ));
        }

        let mut vectors = Vec::with_capacity(count);
        let mut offset = 8;
        for _ in 0..count {
            let mut row = Vec::with_capacity(dim);
            for _ in 0..dim {
                row.push(f32::from_le_bytes([
                    bytes[offset],
                    bytes[offset + 1],
                    bytes[offset + 2],
                    bytes[offset + 3],
                ]));
                offset += 4;
            }
            vectors.push(row);
        }

        Ok(Self { dim, vectors })
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let mut bytes = Vec::with_capacity(8 + self.vectors.len() * self.dim * 4);
        bytes.extend_from_slice(&(self.dim as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.vectors.len() as u32).to_le_bytes());
        for row in &self.vectors {
            for value in row {
                bytes.extend_from_slice(&value.to_le_bytes());
            }
        }
        fs::write(path, bytes)
    }

    fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
    }
}

impl VectorIndex for FlatVectorIndex {
    fn dimension(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn search(&self, query: &[f32], top_k: usize) -> Vec<(i64, f32)> {
        if query.len() != self.dim || top_k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(i64, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(row, vector)| (row as i64, Self::squared_l2(query, vector)))
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);
        scored
    }
}
