use serde::{Deserialize, Deserializer};
use std::io::Read;

/// One roster line after trimming; counters default to zero when blank.
#[derive(Debug)]
pub(crate) struct RosterRow {
    pub(crate) line: u64,
    pub(crate) organization: String,
    pub(crate) housing: String,
    pub(crate) space: Option<String>,
    pub(crate) total_vacancies: u32,
    pub(crate) occupied_vacancies: u32,
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<RosterRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();

    for (index, record) in csv_reader.deserialize::<RawRow>().enumerate() {
        let raw = record?;
        rows.push(RosterRow {
            // header is line 1
            line: index as u64 + 2,
            organization: raw.organization.unwrap_or_default(),
            housing: raw.housing.unwrap_or_default(),
            space: raw.space,
            total_vacancies: raw.total_vacancies.unwrap_or(0),
            occupied_vacancies: raw.occupied_vacancies.unwrap_or(0),
        });
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(
        rename = "Organization",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    organization: Option<String>,
    #[serde(rename = "Housing", default, deserialize_with = "empty_string_as_none")]
    housing: Option<String>,
    #[serde(rename = "Space", default, deserialize_with = "empty_string_as_none")]
    space: Option<String>,
    #[serde(
        rename = "Total Vacancies",
        default,
        deserialize_with = "blank_as_none"
    )]
    total_vacancies: Option<u32>,
    #[serde(
        rename = "Occupied Vacancies",
        default,
        deserialize_with = "blank_as_none"
    )]
    occupied_vacancies: Option<u32>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match empty_string_as_none(deserializer)? {
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Lowercase ASCII slug used to derive stable ids from names.
pub(crate) fn slug(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for ch in value.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(ch.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    slug
}
