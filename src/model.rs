//! Portfolio document model
//!
//! A [`Snapshot`] is the whole persisted document: sixteen [`Week`] slots,
//! each with metadata and an ordered list of attached PDF [`Activity`]
//! entries. Week numbers are the identity key and never change.

use serde::{Deserialize, Serialize};

use crate::types::{PortfolioError, Result};

/// Number of week slots in every snapshot
pub const WEEK_COUNT: u8 = 16;

/// Remote path of the snapshot document
pub const SNAPSHOT_PATH: &str = "data/snapshot.json";

/// The only media type accepted for attachments
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Root persisted document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub weeks: Vec<Week>,
}

/// One of the sixteen fixed week slots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Week {
    pub number: u8,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

/// A single attached document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Display name (file name without its extension)
    pub name: String,
    /// Original uploaded file name
    pub file_name: String,
    /// Download URL of the stored binary
    pub url: String,
}

impl Week {
    /// Empty week with the given number
    pub fn empty(number: u8) -> Self {
        Self {
            number,
            title: String::new(),
            description: String::new(),
            activities: Vec::new(),
        }
    }

    /// True when the week has no title, description or attachments
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.description.is_empty() && self.activities.is_empty()
    }

    /// Whether an activity already references `file_name`
    pub fn has_file(&self, file_name: &str) -> bool {
        self.activities.iter().any(|a| a.file_name == file_name)
    }
}

impl Activity {
    /// Build an activity from an uploaded file name and its download URL
    pub fn from_upload(file_name: &str, url: impl Into<String>) -> Self {
        Self {
            name: strip_extension(file_name).to_string(),
            file_name: file_name.to_string(),
            url: url.into(),
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::default_weeks()
    }
}

impl Snapshot {
    /// Sixteen empty weeks numbered 1..=16
    pub fn default_weeks() -> Self {
        Self {
            weeks: (1..=WEEK_COUNT).map(Week::empty).collect(),
        }
    }

    /// Decode a snapshot from JSON bytes and normalize it
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_slice(bytes)?;
        Ok(snapshot.normalized())
    }

    /// Pretty-printed JSON, as stored remotely
    pub fn to_pretty_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Repair a decoded document so it holds exactly weeks 1..=16 in order.
    ///
    /// Out-of-range numbers are dropped, duplicates keep their first
    /// occurrence and missing numbers become empty weeks.
    pub fn normalized(self) -> Self {
        let mut slots: Vec<Option<Week>> = vec![None; WEEK_COUNT as usize];
        for week in self.weeks {
            if !(1..=WEEK_COUNT).contains(&week.number) {
                continue;
            }
            let slot = &mut slots[(week.number - 1) as usize];
            if slot.is_none() {
                *slot = Some(week);
            }
        }

        Self {
            weeks: slots
                .into_iter()
                .enumerate()
                .map(|(i, w)| w.unwrap_or_else(|| Week::empty(i as u8 + 1)))
                .collect(),
        }
    }

    /// Check the sixteen-week invariant without repairing
    pub fn is_well_formed(&self) -> bool {
        self.weeks.len() == WEEK_COUNT as usize
            && self
                .weeks
                .iter()
                .enumerate()
                .all(|(i, w)| w.number as usize == i + 1)
    }

    pub fn week(&self, number: u8) -> Result<&Week> {
        self.weeks
            .iter()
            .find(|w| w.number == number)
            .ok_or(PortfolioError::WeekNotFound(number))
    }

    pub fn week_mut(&mut self, number: u8) -> Result<&mut Week> {
        self.weeks
            .iter_mut()
            .find(|w| w.number == number)
            .ok_or(PortfolioError::WeekNotFound(number))
    }

    /// Total number of attached activities across all weeks
    pub fn activity_count(&self) -> usize {
        self.weeks.iter().map(|w| w.activities.len()).sum()
    }
}

/// Remote path of an attachment: `weeks/week-{n}/{file_name}`
pub fn attachment_path(week: u8, file_name: &str) -> String {
    format!("weeks/week-{}/{}", week, file_name)
}

/// Drop the last extension of a file name (`report.pdf` -> `report`).
///
/// Names without a stem before the dot (`.pdf`) are returned unchanged.
pub fn strip_extension(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

/// Whether a declared media type is a PDF (parameters and case ignored)
pub fn is_pdf_media_type(declared: &str) -> bool {
    declared
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case(PDF_MEDIA_TYPE))
        .unwrap_or(false)
}

/// Names to try for an upload: `file_name` itself, then `stem-2.ext`,
/// `stem-3.ext` and so on.
pub fn file_name_candidates(file_name: &str) -> impl Iterator<Item = String> + '_ {
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (file_name, None),
    };

    std::iter::once(file_name.to_string()).chain((2u32..).map(move |n| match ext {
        Some(ext) => format!("{}-{}.{}", stem, n, ext),
        None => format!("{}-{}", stem, n),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_sixteen_ordered_weeks() {
        let snapshot = Snapshot::default_weeks();
        assert_eq!(snapshot.weeks.len(), 16);
        assert!(snapshot.is_well_formed());
        assert!(snapshot.weeks.iter().all(Week::is_empty));
        assert_eq!(snapshot.weeks[0].number, 1);
        assert_eq!(snapshot.weeks[15].number, 16);
    }

    #[test]
    fn test_normalize_repairs_partial_document() {
        let json = br#"{"weeks": [
            {"number": 3, "title": "Joins", "description": "", "activities": []},
            {"number": 3, "title": "duplicate"},
            {"number": 42, "title": "out of range"},
            {"number": 1, "title": "Intro"}
        ]}"#;

        let snapshot = Snapshot::from_json(json).unwrap();
        assert!(snapshot.is_well_formed());
        assert_eq!(snapshot.week(1).unwrap().title, "Intro");
        assert_eq!(snapshot.week(3).unwrap().title, "Joins");
        assert!(snapshot.week(2).unwrap().is_empty());
        assert!(snapshot.week(44).is_err());
    }

    #[test]
    fn test_activity_json_uses_camel_case() {
        let activity = Activity::from_upload("report.pdf", "https://example.test/report.pdf");
        let value = serde_json::to_value(&activity).unwrap();
        assert_eq!(value["fileName"], "report.pdf");
        assert_eq!(value["name"], "report");
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("report.pdf"), "report");
        assert_eq!(strip_extension("backup.tar.gz"), "backup.tar");
        assert_eq!(strip_extension("README"), "README");
        assert_eq!(strip_extension(".pdf"), ".pdf");
    }

    #[test]
    fn test_pdf_media_type() {
        assert!(is_pdf_media_type("application/pdf"));
        assert!(is_pdf_media_type("Application/PDF; charset=binary"));
        assert!(!is_pdf_media_type("text/plain"));
        assert!(!is_pdf_media_type(""));
    }

    #[test]
    fn test_description_only_week_is_not_empty() {
        let mut week = Week::empty(6);
        assert!(week.is_empty());

        week.description = "Reading list only".into();
        assert!(!week.is_empty());
    }

    #[test]
    fn test_file_name_candidates() {
        let names: Vec<_> = file_name_candidates("report.pdf").take(3).collect();
        assert_eq!(names, vec!["report.pdf", "report-2.pdf", "report-3.pdf"]);

        let bare: Vec<_> = file_name_candidates("notes").take(2).collect();
        assert_eq!(bare, vec!["notes", "notes-2"]);
    }

    #[test]
    fn test_attachment_path() {
        assert_eq!(attachment_path(7, "lab.pdf"), "weeks/week-7/lab.pdf");
    }
}
