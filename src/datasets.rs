//! Dataset loading into flat training rows `[inputs.., targets..]`.
//!
//! - IDX image/label pairs (the MNIST format), plain or gzipped
//! - numeric CSV files whose columns are already in row layout
use anyhow::{anyhow, bail, Context, Result};
use byteorder::{BigEndian, ReadBytesExt};
use csv::ReaderBuilder;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

pub type Rows = Vec<Vec<f64>>;

const IDX_LABELS: i32 = 2049;
const IDX_IMAGES: i32 = 2051;

/// Target values written for the true class (`on`) and every other class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetEncoding {
    pub on: f64,
    pub off: f64,
}

impl Default for TargetEncoding {
    /// 0.9 / 0.1, which a sigmoid output can actually reach.
    fn default() -> Self {
        Self { on: 0.9, off: 0.1 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdxOptions {
    /// Keep only the first `limit` examples.
    pub limit: Option<usize>,
    pub encoding: TargetEncoding,
    /// Pixels are multiplied by this; 1.0 keeps raw 0..=255 values.
    pub pixel_scale: f64,
    pub classes: usize,
}

impl Default for IdxOptions {
    fn default() -> Self {
        Self {
            limit: None,
            encoding: TargetEncoding::default(),
            pixel_scale: 1.0,
            classes: 10,
        }
    }
}

/// Encoded target vector for `label`.
pub fn one_hot(label: usize, num_classes: usize, encoding: TargetEncoding) -> Vec<f64> {
    let mut v = vec![encoding.off; num_classes];
    if label < num_classes {
        v[label] = encoding.on;
    }
    v
}

/// Parsed IDX file
#[derive(Debug)]
struct IdxData {
    sizes: Vec<usize>,
    data: Vec<u8>,
}

impl IdxData {
    fn open(path: &Path) -> Result<Self> {
        let mut raw = Vec::new();
        File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?
            .read_to_end(&mut raw)?;
        // gzip magic
        let contents = if raw.starts_with(&[0x1f, 0x8b]) {
            let mut out = Vec::new();
            GzDecoder::new(raw.as_slice())
                .read_to_end(&mut out)
                .map_err(|e| anyhow!("Gzip read error in {}: {}", path.display(), e))?;
            out
        } else {
            raw
        };
        Self::parse(&contents).with_context(|| format!("Bad IDX file {}", path.display()))
    }

    fn parse(contents: &[u8]) -> Result<Self> {
        let mut r = Cursor::new(contents);
        let magic = r.read_i32::<BigEndian>().context("Read magic")?;
        let dims = match magic {
            IDX_LABELS => 1,
            IDX_IMAGES => 3,
            _ => bail!("Invalid magic: {}", magic),
        };
        let mut sizes = Vec::with_capacity(dims);
        for _ in 0..dims {
            let size = r.read_i32::<BigEndian>()?;
            sizes.push(usize::try_from(size).map_err(|_| anyhow!("Negative dimension {}", size))?);
        }
        let mut data = Vec::new();
        r.read_to_end(&mut data)?;
        let expected = sizes
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| anyhow!("Dimensions {:?} overflow", sizes))?;
        if data.len() < expected {
            bail!("Truncated data: {} bytes, header says {}", data.len(), expected);
        }
        Ok(Self { sizes, data })
    }
}

/// Load an IDX image file and its label file into training rows.
pub fn load_idx_rows(
    images: impl AsRef<Path>,
    labels: impl AsRef<Path>,
    options: &IdxOptions,
) -> Result<Rows> {
    let image_data = IdxData::open(images.as_ref())?;
    let label_data = IdxData::open(labels.as_ref())?;
    idx_rows(&image_data, &label_data, options)
}

fn idx_rows(images: &IdxData, labels: &IdxData, options: &IdxOptions) -> Result<Rows> {
    if images.sizes.len() != 3 || labels.sizes.len() != 1 {
        bail!("Expected an image file and a label file");
    }
    if images.sizes[0] != labels.sizes[0] {
        bail!("{} images but {} labels", images.sizes[0], labels.sizes[0]);
    }
    let count = options.limit.map_or(images.sizes[0], |l| l.min(images.sizes[0]));
    let image_size = images.sizes[1]
        .checked_mul(images.sizes[2])
        .ok_or_else(|| anyhow!("Image size {}x{} overflows", images.sizes[1], images.sizes[2]))?;
    let mut rows = Vec::with_capacity(count.min(labels.data.len()));
    for i in 0..count {
        let pixels = i
            .checked_mul(image_size)
            .and_then(|start| images.data.get(start..start.checked_add(image_size)?))
            .ok_or_else(|| anyhow!("Image {} past the end of the data", i))?;
        let label = *labels
            .data
            .get(i)
            .ok_or_else(|| anyhow!("Label {} past the end of the data", i))? as usize;
        if label >= options.classes {
            bail!("Label {} at {} outside {} classes", label, i, options.classes);
        }
        let mut row: Vec<f64> = pixels.iter().map(|&b| b as f64 * options.pixel_scale).collect();
        row.extend(one_hot(label, options.classes, options.encoding));
        rows.push(row);
    }
    if rows.is_empty() {
        bail!("No IDX data loaded");
    }
    Ok(rows)
}

/// Load a numeric CSV file; every record becomes one row.
pub fn load_csv_rows(path: impl AsRef<Path>, has_headers: bool) -> Result<Rows> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut rdr = ReaderBuilder::new().has_headers(has_headers).from_reader(file);
    let mut rows: Rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| anyhow!("CSV parse error: {}", e))?;
        let row = record
            .iter()
            .map(|s| {
                s.trim()
                    .parse::<f64>()
                    .map_err(|e| anyhow!("Record {}: bad number {:?}: {}", i, s, e))
            })
            .collect::<Result<Vec<f64>>>()?;
        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                bail!("Record {} has {} fields, expected {}", i, row.len(), first.len());
            }
        }
        rows.push(row);
    }
    if rows.is_empty() {
        bail!("No data loaded from {}", path.display());
    }
    Ok(rows)
}
