//! Diffusion matrix used by every PoW variant.
//!
//! The pipeline only relies on the [`MatrixContext`] contract. `HeavyMatrix`
//! is the reference implementation: a full-rank 64x64 matrix of 4-bit
//! values drawn from xoshiro256++ seeded by the pre-PoW hash.

use crate::core::types::Hash256;
use crate::crypto::HeavyHashWriter;

/// A diffusion transform derived once per pre-PoW hash.
pub trait MatrixContext: Sized {
    /// Deterministically derive the matrix for a pre-PoW hash.
    fn from_pre_pow_hash(hash: &Hash256) -> Self;

    /// Diffusion transform of the original variant.
    fn heavy_hash(&self, hash: &Hash256) -> Hash256;

    /// Transform of the revised variants; the result is re-hashed by the caller.
    fn matrix_multiply(&self, hash: &Hash256) -> Vec<u8>;
}

const DIM: usize = 64;
const RANK_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeavyMatrix([[u16; DIM]; DIM]);

impl HeavyMatrix {
    fn generate(hash: &Hash256) -> Self {
        let mut rng = XoShiRo256PlusPlus::new(hash);
        loop {
            let mat = Self::rand_matrix_no_rank_check(&mut rng);
            if mat.compute_rank() == DIM {
                return mat;
            }
        }
    }

    fn rand_matrix_no_rank_check(rng: &mut XoShiRo256PlusPlus) -> Self {
        let mut mat = [[0u16; DIM]; DIM];
        for row in mat.iter_mut() {
            for chunk in row.chunks_exact_mut(16) {
                let val = rng.next_u64();
                for (shift, cell) in chunk.iter_mut().enumerate() {
                    *cell = ((val >> (4 * shift)) & 0x0F) as u16;
                }
            }
        }
        Self(mat)
    }

    /// Rank over the reals by Gaussian elimination.
    fn compute_rank(&self) -> usize {
        let mut mat: [[f64; DIM]; DIM] = self.0.map(|row| row.map(f64::from));
        let mut rank = 0;
        let mut row_selected = [false; DIM];

        for i in 0..DIM {
            let Some(j) = (0..DIM).find(|&j| !row_selected[j] && mat[j][i].abs() > RANK_EPSILON) else {
                continue;
            };
            rank += 1;
            row_selected[j] = true;

            let pivot = mat[j][i];
            for p in (i + 1)..DIM {
                mat[j][p] /= pivot;
            }
            for k in 0..DIM {
                if k != j && mat[k][i].abs() > RANK_EPSILON {
                    let factor = mat[k][i];
                    for p in (i + 1)..DIM {
                        let delta = mat[j][p] * factor;
                        mat[k][p] -= delta;
                    }
                }
            }
        }
        rank
    }

    /// Nibble-vector product, packed back to 32 bytes and xored with the input.
    fn product(&self, hash: &Hash256) -> Hash256 {
        let mut vec = [0u16; DIM];
        for (i, byte) in hash.iter().enumerate() {
            vec[2 * i] = u16::from(byte >> 4);
            vec[2 * i + 1] = u16::from(byte & 0x0F);
        }

        let mut out = [0u8; 32];
        for (i, out_byte) in out.iter_mut().enumerate() {
            // max 64 * 15 * 15 = 14400, fits in u16
            let sum1: u16 = self.0[2 * i].iter().zip(&vec).map(|(m, v)| m * v).sum();
            let sum2: u16 = self.0[2 * i + 1].iter().zip(&vec).map(|(m, v)| m * v).sum();
            *out_byte = (((sum1 >> 10) << 4) | (sum2 >> 10)) as u8 ^ hash[i];
        }
        out
    }
}

impl MatrixContext for HeavyMatrix {
    fn from_pre_pow_hash(hash: &Hash256) -> Self {
        Self::generate(hash)
    }

    fn heavy_hash(&self, hash: &Hash256) -> Hash256 {
        HeavyHashWriter::hash(&self.product(hash))
    }

    fn matrix_multiply(&self, hash: &Hash256) -> Vec<u8> {
        self.product(hash).to_vec()
    }
}

/// xoshiro256++ seeded with four little-endian words of a hash.
///
/// An all-zero state is a fixed point of the generator, so a zero hash is
/// re-hashed through the heavy-hash writer before seeding.
struct XoShiRo256PlusPlus {
    s0: u64,
    s1: u64,
    s2: u64,
    s3: u64,
}

impl XoShiRo256PlusPlus {
    fn new(hash: &Hash256) -> Self {
        if hash.iter().all(|&b| b == 0) {
            return Self::from_words(&HeavyHashWriter::hash(hash));
        }
        Self::from_words(hash)
    }

    fn from_words(hash: &Hash256) -> Self {
        let word = |i: usize| u64::from_le_bytes(hash[i * 8..(i + 1) * 8].try_into().expect("8-byte slice"));
        Self { s0: word(0), s1: word(1), s2: word(2), s3: word(3) }
    }

    fn next_u64(&mut self) -> u64 {
        let res = self.s0.wrapping_add(self.s3).rotate_left(23).wrapping_add(self.s0);

        let t = self.s1 << 17;
        self.s2 ^= self.s0;
        self.s3 ^= self.s1;
        self.s1 ^= self.s2;
        self.s0 ^= self.s3;

        self.s2 ^= t;
        self.s3 = self.s3.rotate_left(45);

        res
    }
}
