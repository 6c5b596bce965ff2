use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a student's choice for a course. The empty string is a valid
/// stored value and means the status was never set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChoiceStatus {
    Requested,
    Selected,
    Approved,
    Removed,
    #[serde(rename = "")]
    Unset,
}

impl ChoiceStatus {
    pub const ACTIVE: [ChoiceStatus; 4] = [
        ChoiceStatus::Requested,
        ChoiceStatus::Selected,
        ChoiceStatus::Approved,
        ChoiceStatus::Unset,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChoiceStatus::Requested => "Requested",
            ChoiceStatus::Selected => "Selected",
            ChoiceStatus::Approved => "Approved",
            ChoiceStatus::Removed => "Removed",
            ChoiceStatus::Unset => "",
        }
    }

    pub fn is_active(self) -> bool {
        self != ChoiceStatus::Removed
    }
}

impl fmt::Display for ChoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Requested" => Ok(ChoiceStatus::Requested),
            "Selected" => Ok(ChoiceStatus::Selected),
            "Approved" => Ok(ChoiceStatus::Approved),
            "Removed" => Ok(ChoiceStatus::Removed),
            "" => Ok(ChoiceStatus::Unset),
            other => Err(format!("unknown choice status: {}", other)),
        }
    }
}

impl ToSql for ChoiceStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ChoiceStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        s.parse().map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolYear {
    pub id: i64,
    pub name: String,
    pub sequence_number: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i64,
    pub school_year_id: i64,
    pub name: String,
    pub name_short: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Offering {
    pub id: i64,
    pub school_year_id: i64,
    pub name: String,
    pub description: String,
    pub min_select: i64,
    pub max_select: i64,
    pub sequence_number: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferingInput {
    pub school_year_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub min_select: i64,
    #[serde(default)]
    pub max_select: i64,
    #[serde(default)]
    pub sequence_number: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: i64,
    pub school_year_id: i64,
    pub name: String,
    pub description: String,
    pub min_select: i64,
    pub max_select: i64,
    pub course_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInput {
    pub school_year_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub min_select: i64,
    #[serde(default)]
    pub max_select: i64,
}

/// A block as linked into an offering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferingBlock {
    pub offering_id: i64,
    pub block_id: i64,
    pub name: String,
    pub description: String,
    pub min_select: i64,
    pub max_select: i64,
    pub sequence_number: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockCourse {
    pub block_id: i64,
    pub course_id: i64,
    pub name: String,
    pub name_short: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub id: i64,
    pub school_year_id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub block_id: Option<i64>,
    pub status: ChoiceStatus,
    pub selected_by_id: i64,
    pub timestamp_selected: Option<String>,
    pub notes: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceInput {
    pub school_year_id: i64,
    pub student_id: i64,
    pub course_id: i64,
    #[serde(default)]
    pub block_id: Option<i64>,
    pub status: ChoiceStatus,
    pub selected_by_id: i64,
    #[serde(default)]
    pub timestamp_selected: Option<String>,
    #[serde(default)]
    pub notes: String,
}

/// One student's choice as seen from a course roster.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseChoice {
    pub student_id: i64,
    pub surname: String,
    pub preferred_name: String,
    pub status: ChoiceStatus,
    pub selected_by_id: i64,
    pub timestamp_selected: Option<String>,
    pub selected_surname: String,
    pub selected_preferred_name: String,
    pub offering_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnofferedChoice {
    #[serde(flatten)]
    pub choice: Choice,
    pub course_name: String,
    pub course_name_short: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOffering {
    pub school_year_id: i64,
    pub student_id: i64,
    pub offering_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogInput {
    pub school_year_id: i64,
    pub offering_id: i64,
    pub student_id: i64,
    pub changed_by_id: i64,
    #[serde(default)]
    pub timestamp_changed: Option<String>,
    pub action: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: i64,
    pub school_year_id: i64,
    pub offering_id: i64,
    pub student_id: i64,
    pub changed_by_id: i64,
    pub timestamp_changed: String,
    pub action: String,
    pub school_year_name: String,
    pub offering_name: String,
    pub student_surname: String,
    pub student_preferred_name: String,
    pub changed_surname: String,
    pub changed_preferred_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDetails {
    pub surname: String,
    pub preferred_name: String,
}

/// Pairs each block id with its 1-based position in the given order.
pub fn assign_sequence_numbers(block_ids: &[i64]) -> Vec<(i64, i64)> {
    block_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i as i64 + 1))
        .collect()
}

/// Row offset for a 1-based page. Pages below 2 start at the first row.
pub fn page_offset(page: i64, limit: i64) -> i64 {
    if page > 1 {
        // Past the end of any table; SQLite returns no rows.
        (page - 1).checked_mul(limit).unwrap_or(i64::MAX)
    } else {
        0
    }
}

pub fn now_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
