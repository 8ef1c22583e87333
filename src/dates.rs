use chrono::{Duration, NaiveDate};

use crate::grid::Cell;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Renders a date-of-birth cell as `dd/mm/yyyy`.
///
/// Text cells are passed through trimmed, absent cells become empty.
pub fn normalize(cell: &Cell) -> String {
    match cell {
        Cell::Absent => String::new(),
        Cell::Text(text) => text.trim().to_string(),
        Cell::Number(serial) => serial_to_date(*serial)
            .map(|date| date.format("%d/%m/%Y").to_string())
            .unwrap_or_else(|| cell.to_text()),
    }
}

/// Calendar day of a serial, with any time-of-day fraction dropped.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let millis = (serial * MILLIS_PER_DAY).floor();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    let offset = Duration::try_milliseconds(millis as i64)?;
    let epoch = serial_epoch()?.and_hms_opt(0, 0, 0)?;
    epoch.checked_add_signed(offset).map(|stamp| stamp.date())
}

/// Day zero of spreadsheet date serials. One day before the nominal
/// 1899-12-31 start so that serials after February 1900 land on the right
/// calendar day despite the phantom 1900-02-29.
fn serial_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(serial: f64) -> String {
        normalize(&Cell::Number(serial))
    }

    #[test]
    fn serial_one_is_last_day_of_1899() {
        assert_eq!(number(1.0), "31/12/1899");
    }

    #[test]
    fn serials_cross_month_and_year_boundaries() {
        assert_eq!(number(45000.0), "15/03/2023");
        assert_eq!(number(45291.0), "31/12/2023");
        assert_eq!(number(45292.0), "01/01/2024");
        assert_eq!(number(45351.0), "29/02/2024");
        assert_eq!(number(45352.0), "01/03/2024");
        assert_eq!(number(61.0), "01/03/1900");
    }

    #[test]
    fn time_of_day_does_not_move_the_date() {
        assert_eq!(number(45000.75), "15/03/2023");
    }

    #[test]
    fn text_and_absent_cells() {
        assert_eq!(normalize(&Cell::Text("  12/05/2003 ".to_string())), "12/05/2003");
        assert_eq!(normalize(&Cell::Absent), "");
    }

    #[test]
    fn unrepresentable_serial_falls_back_to_text() {
        assert_eq!(number(f64::INFINITY), "inf");
    }
}
