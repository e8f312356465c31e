use rand::Rng;
use std::fs::File;
use std::io::Error;
use std::path::Path;

pub const STATUSES: [&str; 10] = ["AV", "OS", "PB", "AP", "HB", "AH", "BB", "AB", "WB", "AW"];

pub fn generate_ambulances(path: &Path, count: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["identifier", "capability", "status"])?;
    for i in 1..=count {
        wtr.write_record([format!("BUS-{}", i).as_str(), "B", "AV"])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Random position and status reports for `ambulances` ambulances, one minute
/// apart, starting 2024-01-01.
pub fn generate_updates(path: &Path, ambulances: usize, rows: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    let mut rng = rand::thread_rng();

    wtr.write_record([
        "ambulance",
        "status",
        "latitude",
        "longitude",
        "orientation",
        "timestamp",
    ])?;

    let start = chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
        .map_err(Error::other)?
        .with_timezone(&chrono::Utc);
    for i in 0..rows {
        let ambulance = rng.gen_range(1..=ambulances);
        let status = STATUSES[rng.gen_range(0..STATUSES.len())];
        let latitude: f64 = rng.gen_range(32.4..32.6);
        let longitude: f64 = rng.gen_range(-117.1..-116.9);
        let orientation: f64 = rng.gen_range(0.0..360.0);
        let timestamp = start + chrono::Duration::minutes(i as i64);

        wtr.write_record([
            format!("BUS-{}", ambulance),
            status.to_string(),
            format!("{:.5}", latitude),
            format!("{:.5}", longitude),
            format!("{:.1}", orientation),
            timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
