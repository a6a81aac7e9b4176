//! Reader for the MNIST IDX file format.
//!
//! The IDX container is big-endian: a magic number, one u32 per dimension,
//! then the raw payload. Pixels are normalized to `[0, 1]` on load.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::Rng;

use grad_leak_core::{LeakError, Result, Scalar};

/// Magic number of IDX image files.
pub const IMAGE_MAGIC: u32 = 2051;
/// Magic number of IDX label files.
pub const LABEL_MAGIC: u32 = 2049;

/// An MNIST-style dataset with flattened, normalized images.
#[derive(Clone, Debug)]
pub struct MnistData {
    /// Images of shape `(examples, rows * cols)`, pixels in `[0, 1]`.
    pub images: Array2<Scalar>,
    /// Label per example.
    pub labels: Vec<usize>,
    /// Image height in pixels.
    pub rows: usize,
    /// Image width in pixels.
    pub cols: usize,
}

/// A batch drawn from the dataset.
#[derive(Clone, Debug)]
pub struct Batch {
    /// Images of shape `(batch, rows * cols)`.
    pub images: Array2<Scalar>,
    /// Label per example.
    pub labels: Vec<usize>,
}

impl MnistData {
    /// Load the training split from the canonical file names.
    pub fn load_training(dir: &Path) -> Result<Self> {
        Self::from_idx_files(
            &dir.join("train-images-idx3-ubyte"),
            &dir.join("train-labels-idx1-ubyte"),
        )
    }

    /// Load the test split from the canonical file names.
    pub fn load_test(dir: &Path) -> Result<Self> {
        Self::from_idx_files(
            &dir.join("t10k-images-idx3-ubyte"),
            &dir.join("t10k-labels-idx1-ubyte"),
        )
    }

    /// Load a dataset from an IDX image file and an IDX label file.
    pub fn from_idx_files(images_path: &Path, labels_path: &Path) -> Result<Self> {
        let (images, rows, cols) = read_idx_images(images_path)?;
        let labels = read_idx_labels(labels_path)?;
        if images.nrows() != labels.len() {
            return Err(LeakError::dataset(format!(
                "{} images but {} labels",
                images.nrows(),
                labels.len()
            )));
        }
        Ok(Self {
            images,
            labels,
            rows,
            cols,
        })
    }

    /// Number of examples.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Pixels per image.
    pub fn pixels(&self) -> usize {
        self.rows * self.cols
    }

    /// Gather a batch by explicit indices.
    pub fn batch(&self, indices: &[usize]) -> Result<Batch> {
        let mut images = Array2::zeros((indices.len(), self.pixels()));
        let mut labels = Vec::with_capacity(indices.len());
        for (n, &idx) in indices.iter().enumerate() {
            if idx >= self.len() {
                return Err(LeakError::invalid(format!(
                    "index {idx} out of bounds for {} examples",
                    self.len()
                )));
            }
            images.row_mut(n).assign(&self.images.row(idx));
            labels.push(self.labels[idx]);
        }
        Ok(Batch { images, labels })
    }

    /// Draw a shuffled batch without replacement.
    ///
    /// The batch size is truncated to the dataset size.
    pub fn sample_batch<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<Batch> {
        if self.is_empty() {
            return Err(LeakError::dataset("cannot sample from an empty dataset"));
        }
        if batch_size == 0 {
            return Err(LeakError::invalid("batch_size must be positive"));
        }

        let batch_size = batch_size.min(self.len());
        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.shuffle(rng);
        indices.truncate(batch_size);
        self.batch(&indices)
    }
}

fn read_u32_be(file: &mut File) -> Result<u32> {
    let mut buf = [0u8; 4];
    file.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_idx_images(path: &Path) -> Result<(Array2<Scalar>, usize, usize)> {
    let mut file = File::open(path)?;

    let magic = read_u32_be(&mut file)?;
    if magic != IMAGE_MAGIC {
        return Err(LeakError::dataset(format!(
            "bad image magic {magic} in {}",
            path.display()
        )));
    }

    let count = read_u32_be(&mut file)? as usize;
    let rows = read_u32_be(&mut file)? as usize;
    let cols = read_u32_be(&mut file)? as usize;
    if rows == 0 || cols == 0 {
        return Err(LeakError::dataset("image dimensions must be positive"));
    }

    let total = count
        .checked_mul(rows * cols)
        .ok_or_else(|| LeakError::dataset("image payload size overflow"))?;
    let mut raw = vec![0u8; total];
    file.read_exact(&mut raw)
        .map_err(|_| LeakError::dataset(format!("truncated image file {}", path.display())))?;

    let images = Array2::from_shape_vec(
        (count, rows * cols),
        raw.into_iter()
            .map(|pixel| pixel as Scalar / 255.0 as Scalar)
            .collect(),
    )
    .map_err(|e| LeakError::dataset(e.to_string()))?;

    Ok((images, rows, cols))
}

fn read_idx_labels(path: &Path) -> Result<Vec<usize>> {
    let mut file = File::open(path)?;

    let magic = read_u32_be(&mut file)?;
    if magic != LABEL_MAGIC {
        return Err(LeakError::dataset(format!(
            "bad label magic {magic} in {}",
            path.display()
        )));
    }

    let count = read_u32_be(&mut file)? as usize;
    let mut raw = vec![0u8; count];
    file.read_exact(&mut raw)
        .map_err(|_| LeakError::dataset(format!("truncated label file {}", path.display())))?;

    Ok(raw.into_iter().map(|label| label as usize).collect())
}
