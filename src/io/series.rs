use anyhow::Context;
use serde::Deserialize;

use crate::model::observed::ObservedSeries;

/// One day of the processed national series. Other columns are ignored.
#[derive(Debug, Deserialize)]
struct DailyRow {
    #[serde(rename = "totale_positivi")]
    infected: f64,
    #[serde(rename = "dimessi_guariti")]
    recovered: f64,
    #[serde(rename = "deceduti")]
    deceased: f64,
    #[serde(rename = "suscettibili")]
    susceptible: f64,
}

/// Load the observed series from a CSV file with columns
/// `totale_positivi,dimessi_guariti,deceduti,suscettibili` (any order, extra columns allowed).
pub fn load_observed_csv(path: &str) -> anyhow::Result<ObservedSeries> {
    let rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open observed series CSV: {}", path))?;
    read_observed(rdr).with_context(|| format!("Failed to parse observed series CSV: {}", path))
}

pub fn read_observed<R: std::io::Read>(mut rdr: csv::Reader<R>) -> anyhow::Result<ObservedSeries> {
    let mut series = ObservedSeries::default();
    for (line, result) in rdr.deserialize::<DailyRow>().enumerate() {
        let row = result.with_context(|| format!("bad row {}", line + 1))?;
        series.susceptible.push(row.susceptible);
        series.infected.push(row.infected);
        series.recovered.push(row.recovered);
        series.deceased.push(row.deceased);
    }
    anyhow::ensure!(!series.is_empty(), "observed series is empty");
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_named_columns_in_any_order() {
        let data = "\
data,deceduti,suscettibili,totale_positivi,dimessi_guariti
2020-02-24,7,59999560,221,1
2020-02-25,10,59999400,311,1
";
        let series = read_observed(csv::Reader::from_reader(data.as_bytes())).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.infected, vec![221.0, 311.0]);
        assert_eq!(series.deceased, vec![7.0, 10.0]);
        assert_eq!(series.susceptible[1], 59_999_400.0);
    }

    #[test]
    fn missing_column_is_an_error() {
        let data = "totale_positivi,deceduti,suscettibili\n1,2,3\n";
        assert!(read_observed(csv::Reader::from_reader(data.as_bytes())).is_err());
    }
}
