//! HTML parser for the station playlist page
//!
//! The page lists recently played tracks as `div.row.data` (older markup:
//! `div.row_data`) blocks with `.datum`, `.cas`, `.interpret` and `.titul`
//! columns, and carries the station name in `h1.radio_nazov`. Date labels
//! are relative ("dnes", "včera") or explicit DD.MM.YYYY and are resolved
//! against the current local date.

use chrono::{Days, NaiveDate};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::ParseError;
use crate::models::{NowPlaying, PlaylistItem};

/// Date format used throughout the playlist (DD.MM.YYYY)
const DATE_FORMAT: &str = "%d.%m.%Y";

/// Playlist page parser with pre-compiled selectors
pub struct PlaylistParser {
    row: Selector,
    date: Selector,
    time: Selector,
    artist: Selector,
    title: Selector,
    station: Selector,
    explicit_date: Regex,
}

impl PlaylistParser {
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            row: Selector::parse("div.row.data, div.row_data").expect("valid row selector"),
            date: Selector::parse(".datum").expect("valid date selector"),
            time: Selector::parse(".cas").expect("valid time selector"),
            artist: Selector::parse(".interpret").expect("valid artist selector"),
            title: Selector::parse(".titul").expect("valid title selector"),
            station: Selector::parse("h1.radio_nazov").expect("valid station selector"),
            explicit_date: Regex::new(r"(\d{2}\.\d{2}\.\d{4})").expect("valid date regex"),
        }
    }

    /// Parse all playlist rows, newest first as they appear on the page
    ///
    /// Rows missing a mandatory column are skipped; a page with no usable
    /// rows at all is an error.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::NoRows` when nothing could be extracted.
    pub fn parse_rows(&self, html: &str, today: NaiveDate) -> Result<Vec<PlaylistItem>, ParseError> {
        let document = Html::parse_document(html);

        let items: Vec<PlaylistItem> = document
            .select(&self.row)
            .filter_map(|row| self.parse_row(row, today).ok())
            .collect();

        if items.is_empty() {
            return Err(ParseError::NoRows);
        }
        Ok(items)
    }

    /// Parse the first (currently playing) row plus the station header
    ///
    /// # Errors
    ///
    /// Returns `ParseError::NoRows` when the page has no playlist row, or
    /// the column error of the first row when it is malformed.
    pub fn parse_now_playing(
        &self,
        html: &str,
        today: NaiveDate,
        default_station: &str,
    ) -> Result<NowPlaying, ParseError> {
        let document = Html::parse_document(html);

        let row = document.select(&self.row).next().ok_or(ParseError::NoRows)?;
        let item = self.parse_row(row, today)?;

        let station = document
            .select(&self.station)
            .next()
            .map(|el| collect_text(el))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| default_station.to_string());

        Ok(NowPlaying {
            station,
            title: item.title,
            artist: item.artist,
            date: item.date,
            time: item.time,
        })
    }

    fn parse_row(&self, row: ElementRef<'_>, today: NaiveDate) -> Result<PlaylistItem, ParseError> {
        let date_label = self
            .select_text(row, &self.date)
            .ok_or(ParseError::MissingColumn("date"))?;
        let time_label = self
            .select_text(row, &self.time)
            .ok_or(ParseError::MissingColumn("time"))?;
        let artist = self
            .select_text(row, &self.artist)
            .ok_or(ParseError::MissingColumn("artist"))?;
        let title = self
            .select_text(row, &self.title)
            .ok_or(ParseError::MissingColumn("title"))?;

        let date = self.resolve_date_label(&date_label, today);

        Ok(PlaylistItem {
            date: date.format(DATE_FORMAT).to_string(),
            time: normalize_time(&time_label)?,
            artist,
            title,
            station: None,
        })
    }

    fn select_text(&self, row: ElementRef<'_>, selector: &Selector) -> Option<String> {
        row.select(selector)
            .next()
            .map(collect_text)
            .filter(|s| !s.is_empty())
    }

    /// Resolve a date label against today's date
    ///
    /// "dnes" = today, "včera"/"vcera" = yesterday, an embedded DD.MM.YYYY
    /// is taken verbatim and anything else falls back to today.
    #[must_use]
    pub fn resolve_date_label(&self, label: &str, today: NaiveDate) -> NaiveDate {
        let normalized = label.trim().to_lowercase();
        if normalized.starts_with("dnes") {
            return today;
        }
        if normalized.starts_with("včera") || normalized.starts_with("vcera") {
            return today.checked_sub_days(Days::new(1)).unwrap_or(today);
        }
        if let Some(m) = self.explicit_date.find(&normalized) {
            if let Ok(date) = NaiveDate::parse_from_str(m.as_str(), DATE_FORMAT) {
                return date;
            }
        }
        today
    }
}

/// Concatenated, whitespace-trimmed text of an element
fn collect_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Normalize a clock label to zero-padded HH:MM
fn normalize_time(label: &str) -> Result<String, ParseError> {
    let trimmed = label.trim();
    let (hh, mm) = trimmed
        .split_once(':')
        .ok_or_else(|| ParseError::InvalidTime(trimmed.to_string()))?;
    let hour: u32 = hh
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidTime(trimmed.to_string()))?;
    let minute: u32 = mm
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidTime(trimmed.to_string()))?;
    if hour > 23 || minute > 59 {
        return Err(ParseError::InvalidTime(trimmed.to_string()));
    }
    Ok(format!("{hour:02}:{minute:02}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <h1 class="radio_nazov">Rádio Melody</h1>
        <div class="row data">
            <span class="datum">dnes</span>
            <span class="cas">10:05</span>
            <span class="interpret">Elán</span>
            <span class="titul">Kaskadér</span>
        </div>
        <div class="row data">
            <span class="datum">včera</span>
            <span class="cas">23:58</span>
            <span class="interpret">Team</span>
            <span class="titul">Severanka</span>
        </div>
        <div class="row data">
            <span class="datum">15.01.2025</span>
            <span class="cas">9:07</span>
            <span class="interpret">Tublatanka</span>
            <span class="titul">Pravda víťazí</span>
        </div>
        </body></html>
    "#;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 20).unwrap()
    }

    #[test]
    fn test_parse_rows() {
        let parser = PlaylistParser::new();
        let items = parser.parse_rows(PAGE, today()).unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].artist, "Elán");
        assert_eq!(items[0].date, "20.01.2025");
        assert_eq!(items[1].date, "19.01.2025");
        assert_eq!(items[2].date, "15.01.2025");
        // single-digit hour is zero padded
        assert_eq!(items[2].time, "09:07");
    }

    #[test]
    fn test_parse_now_playing() {
        let parser = PlaylistParser::new();
        let now = parser.parse_now_playing(PAGE, today(), "Fallback").unwrap();

        assert_eq!(now.station, "Rádio Melody");
        assert_eq!(now.title, "Kaskadér");
        assert_eq!(now.song_key(), "Elán|Kaskadér|20.01.2025|10:05");
    }

    #[test]
    fn test_station_fallback() {
        let parser = PlaylistParser::new();
        let html = r#"<div class="row data">
            <span class="datum">dnes</span><span class="cas">10:05</span>
            <span class="interpret">A</span><span class="titul">B</span>
        </div>"#;
        let now = parser.parse_now_playing(html, today(), "Fallback").unwrap();
        assert_eq!(now.station, "Fallback");
    }

    #[test]
    fn test_empty_page_is_error() {
        let parser = PlaylistParser::new();
        let result = parser.parse_rows("<html><body></body></html>", today());
        assert!(matches!(result, Err(ParseError::NoRows)));
    }

    #[test]
    fn test_malformed_row_is_skipped() {
        let parser = PlaylistParser::new();
        let html = r#"
            <div class="row data"><span class="datum">dnes</span></div>
            <div class="row data">
                <span class="datum">dnes</span><span class="cas">10:05</span>
                <span class="interpret">A</span><span class="titul">B</span>
            </div>
        "#;
        let items = parser.parse_rows(html, today()).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_resolve_date_label() {
        let parser = PlaylistParser::new();
        let t = today();
        assert_eq!(parser.resolve_date_label("Dnes", t), t);
        assert_eq!(
            parser.resolve_date_label("vcera 23:00", t),
            NaiveDate::from_ymd_opt(2025, 1, 19).unwrap()
        );
        assert_eq!(
            parser.resolve_date_label("02.01.2025", t),
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()
        );
        // unknown label falls back to today
        assert_eq!(parser.resolve_date_label("???", t), t);
    }

    #[test]
    fn test_normalize_time_rejects_nonsense() {
        assert!(normalize_time("25:00").is_err());
        assert!(normalize_time("banana").is_err());
        assert_eq!(normalize_time(" 7:5 ").unwrap(), "07:05");
    }
}
