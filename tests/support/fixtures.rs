use std::fmt::Write as _;
use std::path::Path;

const CHURN_HEADER: &str = "id,CustomerId,Surname,CreditScore,Geography,Gender,Age,Tenure,Balance,NumOfProducts,HasCrCard,IsActiveMember,EstimatedSalary";
const SURNAMES: [&str; 6] = ["Okwudili", "Hsueh", "Genovese", "Chiemenam", "Manna", "Cattaneo"];
const GEOGRAPHIES: [&str; 3] = ["France", "Germany", "Spain"];

/// Churn label for the synthetic row `idx`: older inactive customers leave.
pub fn churn_label(idx: usize) -> u8 {
    let age = 20 + (idx * 7) % 55;
    let active = idx % 3 == 0;
    u8::from(age > 45 && !active)
}

fn churn_row(idx: usize, id: usize) -> String {
    let age = 20 + (idx * 7) % 55;
    let active = u8::from(idx % 3 == 0);
    format!(
        "{},{},{},{},{},{},{}.0,{},{}.0,{},{},{},{}.5",
        id,
        15_600_000 + idx,
        SURNAMES[idx % SURNAMES.len()],
        500 + (idx * 13) % 300,
        GEOGRAPHIES[idx % GEOGRAPHIES.len()],
        if idx % 2 == 0 { "Male" } else { "Female" },
        age,
        idx % 10,
        if idx % 4 == 0 { 0 } else { 20_000 + idx * 1_000 },
        1 + idx % 3,
        (idx / 2) % 2,
        active,
        30_000 + idx * 997,
    )
}

/// Write `train.csv` (with `Exited`) and `test.csv` into `dir`.
pub fn write_churn_csvs(dir: &Path, n_train: usize, n_test: usize) {
    let mut train = format!("{CHURN_HEADER},Exited\n");
    for idx in 0..n_train {
        writeln!(train, "{},{}", churn_row(idx, idx), churn_label(idx)).expect("format row");
    }
    let mut test = format!("{CHURN_HEADER}\n");
    for idx in 0..n_test {
        writeln!(test, "{}", churn_row(idx + 7, 165_034 + idx)).expect("format row");
    }
    std::fs::write(dir.join("train.csv"), train).expect("write train.csv");
    std::fs::write(dir.join("test.csv"), test).expect("write test.csv");
}

fn pixel_header() -> String {
    (0..784)
        .map(|idx| format!("pixel{idx}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// 28x28 image with a bar whose orientation depends on `label` parity.
fn digit_pixels(label: usize) -> String {
    let mut pixels = vec![0u32; 784];
    for k in 4..24 {
        let idx = if label % 2 == 0 { 14 * 28 + k } else { k * 28 + 14 };
        pixels[idx] = 255;
    }
    pixels
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Write labelled `train.csv` and unlabelled `test.csv` digit files into `dir`.
pub fn write_digit_csvs(dir: &Path, n_train: usize, n_test: usize) {
    let mut train = format!("label,{}\n", pixel_header());
    for idx in 0..n_train {
        let label = idx % 10;
        writeln!(train, "{label},{}", digit_pixels(label)).expect("format row");
    }
    let mut test = format!("{}\n", pixel_header());
    for idx in 0..n_test {
        writeln!(test, "{}", digit_pixels(idx)).expect("format row");
    }
    std::fs::write(dir.join("train.csv"), train).expect("write train.csv");
    std::fs::write(dir.join("test.csv"), test).expect("write test.csv");
}
