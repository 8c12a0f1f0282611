use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::DigitsError;

pub const IMAGE_SIDE: usize = 28;
pub const IMAGE_PIXELS: usize = IMAGE_SIDE * IMAGE_SIDE;
/// Zero border added before a random 28x28 window is cut back out.
const CROP_PADDING: usize = 1;
const NORMALIZE_MEAN: f32 = 0.5;
const NORMALIZE_STD: f32 = 0.5;

pub type DigitImage = [[f32; IMAGE_SIDE]; IMAGE_SIDE];

/// Reshape a flat row-major pixel row into a 28x28 image.
pub fn columns_to_image(columns: &[f32]) -> Result<DigitImage, DigitsError> {
    if columns.len() != IMAGE_PIXELS {
        return Err(DigitsError::PixelCount {
            found: columns.len(),
        });
    }
    let mut image = [[0.0f32; IMAGE_SIDE]; IMAGE_SIDE];
    for (row, chunk) in image.iter_mut().zip(columns.chunks_exact(IMAGE_SIDE)) {
        row.copy_from_slice(chunk);
    }
    Ok(image)
}

/// Images with their digit labels.
#[derive(Debug, Clone, Default)]
pub struct LabelledImages {
    pub images: Vec<DigitImage>,
    pub labels: Vec<u8>,
}

impl LabelledImages {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Shuffle and hold out `ceil(len * val_fraction)` rows for validation.
    pub fn split(&self, val_fraction: f64, seed: u64) -> Result<(Self, Self), DigitsError> {
        if !(val_fraction > 0.0 && val_fraction < 1.0) {
            return Err(DigitsError::Settings(format!(
                "val_fraction must be in (0, 1), got {val_fraction}"
            )));
        }
        let n_val = (self.len() as f64 * val_fraction).ceil() as usize;
        if n_val == 0 || n_val >= self.len() {
            return Err(DigitsError::Settings(format!(
                "cannot split {} images with val_fraction {val_fraction}",
                self.len()
            )));
        }
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));
        let (val_idx, train_idx) = order.split_at(n_val);
        Ok((self.select(train_idx), self.select(val_idx)))
    }

    fn select(&self, indices: &[usize]) -> Self {
        Self {
            images: indices.iter().map(|&idx| self.images[idx]).collect(),
            labels: indices.iter().map(|&idx| self.labels[idx]).collect(),
        }
    }
}

/// Read `label,pixel0..pixel783` rows.
pub fn load_labelled(path: &Path) -> Result<LabelledImages, DigitsError> {
    let mut out = LabelledImages::default();
    for_each_row(path, |row, fields| {
        let Some((label, pixels)) = fields.split_first() else {
            return Err(DigitsError::PixelCount { found: 0 });
        };
        let label = match label.trim().parse::<u8>() {
            Ok(digit) if digit < 10 => digit,
            _ => {
                return Err(DigitsError::InvalidLabel {
                    path: path.to_path_buf(),
                    row,
                    value: label.to_string(),
                });
            }
        };
        out.images.push(parse_image(path, row, 1, pixels)?);
        out.labels.push(label);
        Ok(())
    })?;
    Ok(out)
}

/// Read `pixel0..pixel783` rows.
pub fn load_unlabelled(path: &Path) -> Result<Vec<DigitImage>, DigitsError> {
    let mut images = Vec::new();
    for_each_row(path, |row, fields| {
        images.push(parse_image(path, row, 0, fields)?);
        Ok(())
    })?;
    Ok(images)
}

fn for_each_row(
    path: &Path,
    mut visit: impl FnMut(usize, &[&str]) -> Result<(), DigitsError>,
) -> Result<(), DigitsError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| DigitsError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rows = 0usize;
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|source| DigitsError::Read {
            path: path.to_path_buf(),
            row,
            source,
        })?;
        let fields: Vec<&str> = record.iter().collect();
        visit(row, &fields)?;
        rows += 1;
    }
    if rows == 0 {
        return Err(DigitsError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn parse_image(
    path: &Path,
    row: usize,
    first_column: usize,
    fields: &[&str],
) -> Result<DigitImage, DigitsError> {
    let pixels = fields
        .iter()
        .enumerate()
        .map(|(offset, value)| {
            value
                .trim()
                .parse::<f32>()
                .map_err(|_| DigitsError::Parse {
                    path: path.to_path_buf(),
                    row,
                    column: first_column + offset,
                    value: value.to_string(),
                })
        })
        .collect::<Result<Vec<f32>, _>>()?;
    columns_to_image(&pixels)
}

/// Zero-pad by one pixel and cut a random 28x28 window.
pub fn random_crop(image: &DigitImage, rng: &mut StdRng) -> DigitImage {
    let span = 2 * CROP_PADDING + 1;
    let top = rng.random_range(0..span);
    let left = rng.random_range(0..span);
    let mut out = [[0.0f32; IMAGE_SIDE]; IMAGE_SIDE];
    for (r, out_row) in out.iter_mut().enumerate() {
        // Row index inside the padded 30x30 canvas.
        let Some(src_r) = (r + top).checked_sub(CROP_PADDING) else {
            continue;
        };
        if src_r >= IMAGE_SIDE {
            continue;
        }
        for (c, value) in out_row.iter_mut().enumerate() {
            if let Some(src_c) = (c + left).checked_sub(CROP_PADDING) {
                if src_c < IMAGE_SIDE {
                    *value = image[src_r][src_c];
                }
            }
        }
    }
    out
}

pub fn normalize(value: f32) -> f32 {
    (value - NORMALIZE_MEAN) / NORMALIZE_STD
}

/// Flatten a batch into `[n, 1, 28, 28]` order, normalized and optionally cropped.
pub fn batch_pixels<'a>(
    images: impl IntoIterator<Item = &'a DigitImage>,
    mut augment: Option<&mut StdRng>,
) -> Vec<f32> {
    let mut flat = Vec::new();
    for image in images {
        let image = match augment.as_deref_mut() {
            Some(rng) => random_crop(image, rng),
            None => *image,
        };
        flat.extend(image.iter().flatten().map(|&value| normalize(value)));
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn pixel_header() -> String {
        (0..IMAGE_PIXELS)
            .map(|idx| format!("pixel{idx}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn pixel_row(fill: u32) -> String {
        vec![fill.to_string(); IMAGE_PIXELS].join(",")
    }

    #[test]
    fn zeros_become_a_blank_image() {
        let image = columns_to_image(&[0.0; IMAGE_PIXELS]).unwrap();
        assert_eq!(image, [[0.0; IMAGE_SIDE]; IMAGE_SIDE]);
    }

    #[test]
    fn reshapes_row_major() {
        let columns: Vec<f32> = (0..IMAGE_PIXELS).map(|idx| idx as f32).collect();
        let image = columns_to_image(&columns).unwrap();
        assert_eq!(image[0][27], 27.0);
        assert_eq!(image[1][0], 28.0);
        assert_eq!(image[27][27], 783.0);
        assert!(matches!(
            columns_to_image(&columns[..783]),
            Err(DigitsError::PixelCount { found: 783 })
        ));
    }

    #[test]
    fn loads_train_and_test_files() {
        let dir = tempdir().unwrap();
        let train = dir.path().join("train.csv");
        let test = dir.path().join("test.csv");
        fs::write(
            &train,
            format!("label,{}\n3,{}\n7,{}\n", pixel_header(), pixel_row(0), pixel_row(255)),
        )
        .unwrap();
        fs::write(&test, format!("{}\n{}\n", pixel_header(), pixel_row(12))).unwrap();

        let labelled = load_labelled(&train).unwrap();
        assert_eq!(labelled.labels, vec![3, 7]);
        assert_eq!(labelled.images[1][5][5], 255.0);
        let images = load_unlabelled(&test).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0][0][0], 12.0);
    }

    #[test]
    fn rejects_bad_labels() {
        let dir = tempdir().unwrap();
        let train = dir.path().join("train.csv");
        fs::write(&train, format!("label,{}\n12,{}\n", pixel_header(), pixel_row(0))).unwrap();
        assert!(matches!(
            load_labelled(&train),
            Err(DigitsError::InvalidLabel { row: 0, .. })
        ));
    }

    #[test]
    fn split_is_seeded_and_disjoint() {
        let data = LabelledImages {
            images: (0..10)
                .map(|idx| [[idx as f32; IMAGE_SIDE]; IMAGE_SIDE])
                .collect(),
            labels: (0..10).collect(),
        };
        let (train, val) = data.split(0.2, 503).unwrap();
        assert_eq!(train.len(), 8);
        assert_eq!(val.len(), 2);
        let mut all: Vec<u8> = train.labels.iter().chain(&val.labels).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<u8>>());
        let (_, again) = data.split(0.2, 503).unwrap();
        assert_eq!(again.labels, val.labels);
        assert!(data.split(0.0, 503).is_err());
    }

    #[test]
    fn crop_shifts_by_at_most_one_pixel() {
        let mut image = [[0.0f32; IMAGE_SIDE]; IMAGE_SIDE];
        image[10][10] = 1.0;
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..20 {
            let cropped = random_crop(&image, &mut rng);
            let hits: Vec<(usize, usize)> = (0..IMAGE_SIDE)
                .flat_map(|r| (0..IMAGE_SIDE).map(move |c| (r, c)))
                .filter(|&(r, c)| cropped[r][c] == 1.0)
                .collect();
            assert_eq!(hits.len(), 1);
            let (r, c) = hits[0];
            assert!((9..=11).contains(&r) && (9..=11).contains(&c));
        }
    }

    #[test]
    fn normalizes_around_half() {
        assert_eq!(normalize(0.5), 0.0);
        assert_eq!(normalize(0.0), -1.0);
        let flat = batch_pixels([&[[1.0f32; IMAGE_SIDE]; IMAGE_SIDE]], None);
        assert_eq!(flat.len(), IMAGE_PIXELS);
        assert!(flat.iter().all(|&value| value == 1.0));
    }
}
